//! # Transportes
//! src/server/transport.rs
//!
//! Un transporte recibe los bytes crudos de un request y devuelve los bytes
//! de la respuesta. Hay dos:
//!
//! - [`ConnectionHandler`](super::ConnectionHandler): el de sockets, que
//!   además sabe leer y escribir una conexión TCP/TLS.
//! - [`InProcessTransport`]: sin sockets, para embeber el servidor o para
//!   tests. Comparte el mismo router, parser y builder.

use crate::logging::Logger;
use crate::router::Router;
use crate::server::connection::process;
use std::sync::Arc;

pub trait Transport {
    /// Bytes del request completo → bytes de la respuesta serializada.
    /// Un request vacío no produce respuesta.
    fn deliver(&self, raw_request: &[u8]) -> Vec<u8>;
}

/// Transporte síncrono dentro del mismo proceso
#[derive(Clone)]
pub struct InProcessTransport {
    router: Arc<Router>,
    logger: Logger,
}

impl InProcessTransport {
    pub fn new(router: Router, logger: Logger) -> Self {
        Self::shared(Arc::new(router), logger)
    }

    /// Usa un router que ya comparte otro servidor
    pub fn shared(router: Arc<Router>, logger: Logger) -> Self {
        Self { router, logger }
    }
}

impl Transport for InProcessTransport {
    fn deliver(&self, raw_request: &[u8]) -> Vec<u8> {
        if raw_request.is_empty() {
            return Vec::new();
        }
        self.logger
            .in_scope(|| process(&self.router, raw_request).to_bytes())
    }
}
