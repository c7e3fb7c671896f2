//! # Manejo de Conexiones
//! src/server/connection.rs
//!
//! Cada conexión aceptada la atiende un solo worker, de principio a fin:
//!
//! ```text
//! [handshake TLS] → Reading → Parsed | Invalid → Dispatching → Writing → Closed
//! ```
//!
//! - Un buffer vacío pasa directo a `Closed` sin dispatch.
//! - Un request inválido igual se despacha (el router lo manda al
//!   not-found handler).
//! - La respuesta se escribe con un solo `write_all`; no se reintenta.
//! - La conexión se cierra en todos los caminos, incluidos los de error.

use crate::http::{Request, Response};
use crate::router::Router;
use crate::server::tls::{TlsStream, TlsTerminator};
use crate::server::transport::Transport;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Instant;

/// Tamaño de cada lectura del socket
const READ_CHUNK: usize = 8192;

/// Límite por defecto del request completo (headers + body)
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Stream de una conexión, plano o con TLS
enum HttpStream {
    Plain(TcpStream),
    Tls(Box<TlsStream>),
}

impl HttpStream {
    /// Cierre ordenado: `close_notify` en TLS, luego se suelta el socket
    fn close(self) {
        if let HttpStream::Tls(mut tls) = self {
            tls.conn.send_close_notify();
            if let Err(e) = tls.flush() {
                tracing::trace!(error = %e, "close_notify not delivered");
            }
        }
    }
}

impl Read for HttpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            HttpStream::Plain(s) => s.read(buf),
            HttpStream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for HttpStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            HttpStream::Plain(s) => s.write(buf),
            HttpStream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            HttpStream::Plain(s) => s.flush(),
            HttpStream::Tls(s) => s.flush(),
        }
    }
}

/// Orquestador por conexión: leer, parsear, despachar, escribir y cerrar
#[derive(Clone)]
pub struct ConnectionHandler {
    router: Arc<Router>,
    tls: Option<TlsTerminator>,
    max_request_bytes: usize,
}

impl ConnectionHandler {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            tls: None,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }

    /// Exige un handshake TLS antes de leer HTTP
    pub fn with_tls(mut self, tls: TlsTerminator) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_max_request_bytes(mut self, max: usize) -> Self {
        self.max_request_bytes = max.max(1);
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Atiende una conexión completa. Nunca falla: los errores se loguean
    /// y la conexión se cierra.
    pub fn run(&self, tcp: TcpStream) {
        let peer = tcp.peer_addr().ok();

        let mut stream = match &self.tls {
            Some(tls) => match tls.handshake(tcp) {
                Ok(tls_stream) => HttpStream::Tls(Box::new(tls_stream)),
                Err(e) => {
                    tracing::debug!(peer = ?peer, error = %e, "closing connection after failed handshake");
                    return;
                }
            },
            None => HttpStream::Plain(tcp),
        };

        if let Err(e) = self.serve(&mut stream, peer) {
            tracing::debug!(peer = ?peer, error = %e, "connection error");
        }

        stream.close();
    }

    fn serve<S: Read + Write>(&self, stream: &mut S, peer: Option<SocketAddr>) -> io::Result<()> {
        let raw = read_request(stream, self.max_request_bytes)?;

        if raw.is_empty() {
            tracing::trace!(peer = ?peer, "connection closed without data");
            return Ok(());
        }

        let response = self.respond(&raw);
        stream.write_all(&response.to_bytes())?;
        stream.flush()
    }

    /// Parsea y despacha un request crudo ya completo
    pub fn respond(&self, raw: &[u8]) -> Response {
        process(&self.router, raw)
    }
}

impl Transport for ConnectionHandler {
    fn deliver(&self, raw_request: &[u8]) -> Vec<u8> {
        if raw_request.is_empty() {
            return Vec::new();
        }
        self.respond(raw_request).to_bytes()
    }
}

/// Pipeline común a todos los transportes: parse → dispatch, con el log
/// de acceso
pub(crate) fn process(router: &Router, raw: &[u8]) -> Response {
    let start = Instant::now();
    let request = Request::parse(raw);

    if !request.is_valid() {
        tracing::debug!(bytes = raw.len(), "invalid request line");
    }

    let mut response = Response::default();
    router.dispatch(&request, &mut response);

    tracing::info!(
        method = %request.method(),
        path = request.path(),
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request"
    );

    response
}

/// Lee hasta el fin de los headers más el body declarado en
/// `Content-Length`, hasta que el cliente cierre o hasta `max_bytes`
///
/// Un error de lectura sin nada leído se propaga; con datos parciales se
/// devuelve lo que llegó.
pub fn read_request<R: Read>(reader: &mut R, max_bytes: usize) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    let mut expected_len: Option<usize> = None;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if buffer.is_empty() => return Err(e),
            Err(e) => {
                tracing::debug!(error = %e, read = buffer.len(), "read interrupted, using partial request");
                break;
            }
        };
        buffer.extend_from_slice(&chunk[..n]);

        if expected_len.is_none() {
            expected_len = header_end(&buffer).map(|end| end.saturating_add(declared_content_length(&buffer[..end])));
        }

        if expected_len.is_some_and(|len| buffer.len() >= len) {
            break;
        }

        if buffer.len() >= max_bytes {
            tracing::debug!(limit = max_bytes, "request size limit reached");
            break;
        }
    }

    Ok(buffer)
}

/// Posición justo después de la línea en blanco que cierra los headers
fn header_end(buffer: &[u8]) -> Option<usize> {
    let crlf = find(buffer, b"\r\n\r\n").map(|i| i + 4);
    let lf = find(buffer, b"\n\n").map(|i| i + 2);

    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// `Content-Length` de la sección de headers (0 si falta o es inválido)
///
/// Acá el nombre se compara sin distinguir mayúsculas: solo decide cuántos
/// bytes leer del socket.
fn declared_content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}
