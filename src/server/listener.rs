//! # Listener TCP
//! src/server/listener.rs
//!
//! Dueño del socket y del accept loop.
//!
//! ```text
//! BoundSocket::bind(host, port) ──listen(backlog)──→ Listener ──accept_loop(handler)
//! ```
//!
//! `listen` consume el socket ya enlazado, así que no hay forma de escuchar
//! sin un bind exitoso. El loop se detiene con un [`StopHandle`]: baja el
//! flag y se conecta al propio listener para despertar el `accept`
//! bloqueado.

use crate::error::ServerError;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pausa tras un error de accept no transitorio (ej: sin descriptores)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Cuánto espera `StopHandle::stop` a que la conexión de despertar entre
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Socket con `SO_REUSEADDR` enlazado a una dirección, todavía sin escuchar
#[derive(Debug)]
pub struct BoundSocket {
    socket: Socket,
    addr: SocketAddr,
}

impl BoundSocket {
    /// Crea el socket, habilita reutilización de dirección y hace bind
    ///
    /// Falla si `host` no resuelve o si la dirección ya está en uso.
    pub fn bind(host: &str, port: u16) -> Result<Self, ServerError> {
        let addr = resolve(host, port)?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket
            .bind(&addr.into())
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self { socket, addr })
    }

    /// Dirección pedida en el bind (el puerto puede ser 0)
    pub fn requested_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Pasa a aceptar conexiones
    pub fn listen(self, backlog: u32) -> Result<Listener, ServerError> {
        let backlog = i32::try_from(backlog).unwrap_or(i32::MAX);
        self.socket.listen(backlog).map_err(ServerError::Listen)?;

        let inner: TcpListener = self.socket.into();
        let local_addr = inner.local_addr()?;

        Ok(Listener {
            inner,
            local_addr,
            running: Arc::new(AtomicBool::new(true)),
            timeout: None,
        })
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ServerError::InvalidAddress(format!("{}:{}", host, port)))
}

/// Socket escuchando, listo para el accept loop
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,

    /// Timeout de lectura/escritura aplicado a cada conexión aceptada
    timeout: Option<Duration>,
}

impl Listener {
    /// Dirección real (con el puerto efímero resuelto)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn set_connection_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout).filter(|t| !t.is_zero());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
            wake_addr: wake_address(self.local_addr),
        }
    }

    /// Acepta una conexión y le aplica los timeouts
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        let (stream, peer) = self.inner.accept().map_err(ServerError::Accept)?;

        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;

        Ok((stream, peer))
    }

    /// Acepta conexiones hasta que se pida detener y entrega cada una a
    /// `handler`
    ///
    /// Una conexión que llega después de la orden de detener se cierra sin
    /// pasar al handler.
    pub fn accept_loop<F>(&self, mut handler: F)
    where
        F: FnMut(TcpStream, SocketAddr),
    {
        tracing::debug!(addr = %self.local_addr, "accept loop started");

        while self.is_running() {
            match self.accept() {
                Ok((stream, peer)) => {
                    if !self.is_running() {
                        drop(stream);
                        break;
                    }
                    tracing::trace!(%peer, "connection accepted");
                    handler(stream, peer);
                }
                Err(_) if !self.is_running() => break,
                Err(ServerError::Accept(e)) if is_transient(&e) => {
                    tracing::debug!(error = %e, "transient accept error");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_BACKOFF);
                }
            }
        }

        tracing::debug!(addr = %self.local_addr, "accept loop stopped");
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Una dirección "cualquiera" no sirve para conectarse; se usa loopback
fn wake_address(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port()),
        IpAddr::V6(ip) if ip.is_unspecified() => SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port()),
        _ => addr,
    }
}

/// Detiene un accept loop desde otro thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl StopHandle {
    /// Baja el flag y despierta el `accept`. Llamarlo más de una vez no
    /// hace nada.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        // Si falla el loop igual sale con la próxima conexión
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT) {
            tracing::debug!(addr = %self.wake_addr, error = %e, "could not wake accept loop");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}
