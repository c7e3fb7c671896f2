//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! API para construir respuestas HTTP/1.1 de forma incremental y
//! convertirlas a bytes para enviar al cliente.
//!
//! ## Formato de una respuesta
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: application/json; charset=utf-8\r\n
//! Content-Length: 12\r\n
//! \r\n
//! {"ok": true}
//! ```
//!
//! Cada vez que se asigna el body se recalcula `Content-Length`. El orden
//! de los headers en la salida es el de iteración del `HashMap`, no el de
//! inserción.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use redunix_httpd::http::{Response, StatusCode};
//!
//! let mut response = Response::new(StatusCode::Created);
//! response.set_json_content(r#"{"id": 7}"#);
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 201 Created\r\n"));
//! ```

use super::{mime, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Versión del protocolo en la status line (fija)
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Representa una respuesta HTTP completa
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Código de estado HTTP (200 por defecto)
    status: StatusCode,

    /// Headers HTTP (Content-Type, Content-Length, etc.)
    /// Usamos HashMap para evitar duplicados
    headers: HashMap<String, String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header (versión builder)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Establece el body (versión builder)
    pub fn with_body(mut self, body: impl AsRef<[u8]>) -> Self {
        self.set_body(body);
        self
    }

    /// Respuesta `text/plain` con el status dado
    pub fn text(status: StatusCode, text: &str) -> Self {
        let mut response = Self::new(status);
        response.set_text_content(text);
        response
    }

    // === Status ===

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Cualquier código >= 400
    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    // === Headers ===

    /// Agrega o reemplaza un header
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Obtiene un header por nombre exacto
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    // === Body ===

    /// Establece el body y recalcula `Content-Length`
    ///
    /// ```
    /// use redunix_httpd::http::Response;
    ///
    /// let mut response = Response::default();
    /// response.set_body("Hello World");
    /// assert_eq!(response.header("Content-Length"), Some("11"));
    /// ```
    pub fn set_body(&mut self, body: impl AsRef<[u8]>) {
        self.body = body.as_ref().to_vec();
        self.update_content_length();
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    fn update_content_length(&mut self) {
        let length = self.body.len().to_string();
        self.set_header("Content-Length", &length);
    }

    // === Atajos de contenido ===

    /// `application/json; charset=utf-8` con el JSON ya serializado
    pub fn set_json_content(&mut self, json: &str) {
        self.set_header("Content-Type", "application/json; charset=utf-8");
        self.set_body(json);
    }

    /// Serializa `value` con serde_json y lo usa como body JSON
    pub fn set_json_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(value)?;
        self.set_json_content(&json);
        Ok(())
    }

    /// `text/html; charset=utf-8`
    pub fn set_html_content(&mut self, html: &str) {
        self.set_header("Content-Type", "text/html; charset=utf-8");
        self.set_body(html);
    }

    /// `text/plain; charset=utf-8`
    pub fn set_text_content(&mut self, text: &str) {
        self.set_header("Content-Type", "text/plain; charset=utf-8");
        self.set_body(text);
    }

    /// Carga un archivo como body con el tipo MIME de su extensión
    ///
    /// Si el archivo no se puede leer la respuesta pasa a ser un 404 de
    /// texto; nunca retorna error.
    pub fn set_file_content(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(content) => {
                self.set_header("Content-Type", mime::for_path(path));
                self.set_body(content);
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "static file not readable");
                self.status = StatusCode::NotFound;
                self.set_text_content("File not found");
            }
        }
    }

    /// Agrega los headers CORS básicos
    pub fn enable_cors(&mut self, origin: &str) {
        self.set_header("Access-Control-Allow-Origin", origin);
        self.set_header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS");
        self.set_header("Access-Control-Allow-Headers", "Content-Type, Authorization");
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    ///
    /// - Status line: `HTTP/1.1 200 OK\r\n`
    /// - Headers: `Header-Name: Value\r\n`
    /// - Línea vacía: `\r\n`
    /// - Body
    ///
    /// No modifica la respuesta; llamarla dos veces da los mismos bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        result.extend_from_slice(format!("{} {}\r\n", HTTP_VERSION, self.status).as_bytes());

        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }

        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}
