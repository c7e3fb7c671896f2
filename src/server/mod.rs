//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Todo lo que toca sockets:
//!
//! 1. `listener`: bind, listen y el accept loop
//! 2. `tls`: handshake TLS opcional antes de leer HTTP
//! 3. `connection`: lee, parsea, despacha, escribe y cierra cada conexión
//! 4. `transport`: la misma tubería sin sockets
//! 5. `tcp`: el [`Server`] que une todo con el pool de workers

pub mod connection;
pub mod listener;
pub mod tcp;
pub mod tls;
pub mod transport;

// Re-exportar para facilitar el uso
pub use connection::ConnectionHandler;
pub use listener::{BoundSocket, Listener, StopHandle};
pub use tcp::Server;
pub use tls::{TlsError, TlsTerminator};
pub use transport::{InProcessTransport, Transport};
