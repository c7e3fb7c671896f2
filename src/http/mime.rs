//! # Tipos MIME
//! src/http/mime.rs
//!
//! Tabla de extensión → `Content-Type` para servir archivos estáticos.

use std::path::Path;

/// Tipo por defecto cuando la extensión no está en la tabla
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("txt", "text/plain"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("mp4", "video/mp4"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("wasm", "application/wasm"),
];

/// Retorna el tipo MIME para una extensión (sin el punto)
pub fn for_extension(extension: &str) -> &'static str {
    MIME_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// Retorna el tipo MIME según la extensión del archivo
///
/// ```
/// use redunix_httpd::http::mime;
///
/// assert_eq!(mime::for_path("public/index.html"), "text/html");
/// assert_eq!(mime::for_path("data.bin"), "application/octet-stream");
/// ```
pub fn for_path(path: impl AsRef<Path>) -> &'static str {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(for_extension)
        .unwrap_or(DEFAULT_MIME_TYPE)
}
