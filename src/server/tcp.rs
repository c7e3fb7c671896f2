//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Une las piezas: un thread dedicado corre el accept loop y cada conexión
//! aceptada se encola en el [`WorkerPool`], donde un worker la atiende
//! completa con un [`ConnectionHandler`].
//!
//! ```text
//! accept-loop ──enqueue──→ [cola FIFO] ──→ worker-N: read → parse → dispatch → write → close
//! ```
//!
//! El servidor es dueño del pool, del router y del logger. No hay estado
//! global: para detenerlo desde un signal handler se usa un [`StopHandle`].

use crate::config::Config;
use crate::error::ServerError;
use crate::logging::Logger;
use crate::router::Router;
use crate::server::connection::ConnectionHandler;
use crate::server::listener::{BoundSocket, StopHandle};
use crate::server::tls::TlsTerminator;
use crate::workers::WorkerPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Servidor HTTP/1.1 con pool de workers y TLS opcional
pub struct Server {
    config: Config,
    router: Arc<Router>,
    logger: Logger,
    tls: Option<TlsTerminator>,
    running: Option<Running>,
}

/// Lo que existe solo mientras el servidor corre
struct Running {
    local_addr: SocketAddr,
    stop: StopHandle,
    accept_thread: JoinHandle<()>,
}

impl Server {
    /// El router queda congelado: a partir de acá solo se lee
    pub fn new(config: Config, router: Router, logger: Logger) -> Self {
        Self {
            config,
            router: Arc::new(router),
            logger,
            tls: None,
            running: None,
        }
    }

    /// Exige un handshake TLS en cada conexión
    pub fn with_tls(mut self, tls: TlsTerminator) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Bind, listen, arranca el pool y lanza el accept loop
    ///
    /// Retorna cuando el socket ya está aceptando conexiones. Cualquier
    /// falla de arranque vuelve como `Err` y no queda nada corriendo.
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.is_running() {
            return Err(ServerError::AlreadyRunning);
        }
        // Un accept loop anterior que ya terminó
        self.stop();

        self.config.validate()?;

        let mut listener = self.logger.in_scope(|| {
            BoundSocket::bind(&self.config.host, self.config.effective_port())
                .and_then(|socket| socket.listen(self.config.backlog))
        })?;
        listener.set_connection_timeout(self.config.timeout());

        let local_addr = listener.local_addr();
        let stop = listener.stop_handle();

        let mut handler = ConnectionHandler::new(Arc::clone(&self.router))
            .with_max_request_bytes(self.config.max_request_bytes);
        if let Some(tls) = &self.tls {
            handler = handler.with_tls(tls.clone());
        }

        let mut pool = WorkerPool::new(self.config.workers, self.logger.clone());
        pool.start();

        let logger = self.logger.clone();
        let accept_thread = thread::Builder::new()
            .name("accept-loop".to_string())
            .spawn(move || {
                let _log_guard = logger.install();

                listener.accept_loop(|stream, _peer| {
                    let handler = handler.clone();
                    if !pool.enqueue(move || handler.run(stream)) {
                        tracing::warn!("worker pool not running, connection dropped");
                    }
                });

                pool.stop();
            })?;

        self.logger.in_scope(|| {
            tracing::info!(
                addr = %local_addr,
                tls = self.tls.is_some(),
                workers = self.config.workers.max(1),
                "server listening"
            );
        });

        self.running = Some(Running {
            local_addr,
            stop,
            accept_thread,
        });
        Ok(())
    }

    /// Dirección real en la que escucha (útil con puerto 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| r.stop.is_running())
    }

    /// Handle para detener el servidor desde otro thread (ej: Ctrl-C)
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.running.as_ref().map(|r| r.stop.clone())
    }

    /// Detiene el accept loop y el pool. Las conexiones en curso terminan;
    /// las que seguían en cola se cierran sin respuesta.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop.stop();
            self.join(running);
        }
    }

    /// Bloquea hasta que alguien detenga el servidor con un [`StopHandle`]
    pub fn wait(&mut self) {
        if let Some(running) = self.running.take() {
            self.join(running);
        }
    }

    fn join(&self, running: Running) {
        if running.accept_thread.join().is_err() {
            self.logger.in_scope(|| tracing::error!("accept thread panicked"));
        }
        self.logger
            .in_scope(|| tracing::info!(addr = %running.local_addr, "server stopped"));
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: 2,
            timeout_secs: 5,
            ..Config::default()
        }
    }

    fn router() -> Router {
        let mut router = Router::new();
        router.get("/ping", |_req, res| {
            res.set_text_content("pong");
            Ok(())
        });
        router
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path).unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).unwrap();
        reply
    }

    #[test]
    fn test_start_and_stop() {
        let mut server = Server::new(test_config(), router(), Logger::disabled());
        assert!(!server.is_running());
        assert!(server.local_addr().is_none());

        server.start().unwrap();
        assert!(server.is_running());
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let reply = get(addr, "/ping");
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(reply.ends_with("pong"));

        server.stop();
        assert!(!server.is_running());
        assert!(TcpStream::connect(addr).is_err());

        server.stop();
    }

    #[test]
    fn test_start_twice_fails() {
        let mut server = Server::new(test_config(), router(), Logger::disabled());
        server.start().unwrap();
        assert!(matches!(server.start(), Err(ServerError::AlreadyRunning)));
    }

    #[test]
    fn test_restart_after_stop() {
        let mut server = Server::new(test_config(), router(), Logger::disabled());
        server.start().unwrap();
        server.stop();

        server.start().unwrap();
        let reply = get(server.local_addr().unwrap(), "/ping");
        assert!(reply.ends_with("pong"));
    }

    #[test]
    fn test_invalid_config_is_startup_error() {
        let mut config = test_config();
        config.timeout_secs = 0;

        let mut server = Server::new(config, router(), Logger::disabled());
        assert!(matches!(server.start(), Err(ServerError::Config(_))));
        assert!(!server.is_running());
    }

    #[test]
    fn test_port_in_use_is_startup_error() {
        let mut first = Server::new(test_config(), router(), Logger::disabled());
        first.start().unwrap();

        let mut config = test_config();
        config.port = first.local_addr().unwrap().port();
        let mut second = Server::new(config, router(), Logger::disabled());

        assert!(matches!(second.start(), Err(ServerError::Bind { .. })));
        assert!(!second.is_running());
    }

    #[test]
    fn test_stop_handle_unblocks_wait() {
        let mut server = Server::new(test_config(), router(), Logger::disabled());
        server.start().unwrap();
        let handle = server.stop_handle().unwrap();

        let stopper = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(50));
            handle.stop();
        });

        server.wait();
        stopper.join().unwrap();
        assert!(!server.is_running());
    }
}
