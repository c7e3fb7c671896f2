//! # Archivos Estáticos
//! src/router/static_files.rs
//!
//! Un mount asocia un prefijo de path con un directorio. El resto del path
//! después del prefijo se une al directorio; si ese resto tiene un segmento
//! `..` se responde 404 igual que para un archivo inexistente.

use crate::http::{Response, StatusCode};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StaticMount {
    prefix: String,
    dir: PathBuf,
}

impl StaticMount {
    pub fn new(prefix: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.to_string(),
            dir: dir.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Solo coincidencia de prefijo
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Archivo al que apunta `path`, o `None` si el resto intenta salir
    /// del directorio
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let rest = path.strip_prefix(&self.prefix)?;

        let mut file = self.dir.clone();
        for segment in rest.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if segment == ".." {
                return None;
            }
            file.push(segment);
        }

        Some(file)
    }

    /// Llena `response` con el archivo o con un 404 de texto
    pub fn serve(&self, path: &str, response: &mut Response) {
        match self.resolve(path) {
            Some(file) if file.is_file() => response.set_file_content(&file),
            Some(file) => {
                tracing::debug!(path, file = %file.display(), "static file not found");
                not_found(response);
            }
            None => {
                tracing::warn!(path, prefix = %self.prefix, "rejected static path with '..'");
                not_found(response);
            }
        }
    }
}

fn not_found(response: &mut Response) {
    response.set_status(StatusCode::NotFound);
    response.set_text_content("File not found");
}
