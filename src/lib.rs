//! # RedUnix HTTP Server
//! src/lib.rs
//!
//! Servidor HTTP/1.1 concurrente implementado desde el socket hacia arriba:
//! accept loop dedicado, pool fijo de workers, parser y builder propios,
//! router con middleware y TLS opcional con `rustls`.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing de requests y construcción de responses
//! - `router`: Middleware, archivos estáticos y tabla de rutas
//! - `workers`: Pool de threads genérico con cola FIFO
//! - `server`: Listener, TLS, manejo de conexiones y transportes
//! - `config`: Flags CLI y variables de entorno
//! - `logging`: Logger por instancia sobre `tracing`
//! - `error`: Tipos de error
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use redunix_httpd::config::Config;
//! use redunix_httpd::logging::Logger;
//! use redunix_httpd::router::Router;
//! use redunix_httpd::server::Server;
//!
//! let mut router = Router::new();
//! router.get("/health", |_req, res| {
//!     res.set_text_content("OK");
//!     Ok(())
//! });
//!
//! let mut server = Server::new(Config::default(), router, Logger::default());
//! server.start().expect("Error al iniciar servidor");
//! server.wait();
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;
pub mod workers;
