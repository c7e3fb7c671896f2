//! # Módulo HTTP
//! src/http/mod.rs
//!
//! Implementa el protocolo HTTP/1.1 desde cero, sin librerías de alto
//! nivel. Incluye:
//!
//! - Parsing tolerante de requests (un request roto se marca inválido)
//! - Construcción incremental de responses
//! - Códigos de estado
//! - Tabla de tipos MIME para archivos estáticos
//!
//! No hay conexiones persistentes, chunked encoding ni pipelining: cada
//! conexión lleva exactamente un request y una respuesta.

pub mod mime;
pub mod request;
pub mod response;
pub mod status;

// Re-exportamos los tipos principales para facilitar su uso
// Esto permite usar `http::Request` en vez de `http::request::Request`
pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
