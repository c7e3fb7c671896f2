//! # Tipos de Error
//! src/error.rs
//!
//! - [`HandlerError`]: lo que retorna un handler o middleware cuando falla.
//!   El router lo atrapa una sola vez y se lo pasa al error handler.
//! - [`ServerError`]: fallas de arranque (bind, listen, TLS, configuración). Son las únicas
//!   que llegan al llamador de `Server::start`.
//! - [`ConfigError`]: validación de la configuración.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::server::tls::TlsError;

/// Resultado de un handler o middleware
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// Error producido mientras se atendía un request
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Falla descrita por el propio handler
    #[error("{0}")]
    Message(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pánico atrapado en la frontera de dispatch
    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn message(msg: impl Into<String>) -> Self {
        HandlerError::Message(msg.into())
    }
}

/// Errores de arranque y de transporte del servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to listen: {0}")]
    Listen(#[source] io::Error),

    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    #[error("server is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Configuración inválida
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("timeout must be > 0 seconds")]
    ZeroTimeout,

    #[error("backlog must be >= 1")]
    ZeroBacklog,

    #[error("max request size must be > 0 bytes")]
    ZeroRequestLimit,

    #[error("--https requires both --cert and --key")]
    MissingTlsFiles,

    #[error("invalid static mount {0:?}, expected PREFIX=DIR")]
    InvalidStaticMount(String),
}
