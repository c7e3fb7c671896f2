//! Tests de integración para el servidor HTTP
//! tests/integration_test.rs
//!
//! Cada test levanta su propio `Server` en un puerto efímero de 127.0.0.1
//! y le habla con `TcpStream` crudo, así que no hace falta tener nada
//! corriendo antes.

use redunix_httpd::config::Config;
use redunix_httpd::error::HandlerError;
use redunix_httpd::http::StatusCode;
use redunix_httpd::logging::Logger;
use redunix_httpd::router::{Flow, Router};
use redunix_httpd::server::{InProcessTransport, Server, TlsTerminator, Transport};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        workers: 4,
        timeout_secs: 2,
        ..Config::default()
    }
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Router parecido al de la aplicación de demo
fn app_router() -> Router {
    let mut router = Router::new();

    router.use_middleware(|_req, res| {
        res.enable_cors("*");
        Ok(Flow::Continue)
    });
    router.use_middleware(|req, res| {
        if req.path().starts_with("/admin") && req.header("Authorization").is_none() {
            res.set_status(StatusCode::Unauthorized);
            res.set_text_content("missing credentials");
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    });

    router
        .get("/health", |_req, res| {
            res.set_text_content("OK");
            Ok(())
        })
        .get("/api/hello", |req, res| {
            let name = req.query_param("name").unwrap_or("World");
            res.set_json_value(&serde_json::json!({ "message": format!("Hello, {}!", name) }))?;
            Ok(())
        })
        .post("/api/echo", |req, res| {
            res.set_body(req.body());
            Ok(())
        })
        .get("/api/*", |req, res| {
            res.set_text_content(&format!("api catch-all: {}", req.path()));
            Ok(())
        })
        .get("/admin/panel", |_req, res| {
            res.set_text_content("admin");
            Ok(())
        })
        .get("/slow", |_req, res| {
            thread::sleep(Duration::from_millis(200));
            res.set_text_content("slow");
            Ok(())
        })
        .get("/fail", |_req, _res| Err(HandlerError::message("storage offline")))
        .get("/panic", |_req, _res| panic!("handler bug"));

    router
}

fn start(router: Router) -> Server {
    let mut server = Server::new(test_config(), router, Logger::disabled());
    server.start().expect("server should start");
    server
}

/// Helper: envía bytes crudos y retorna la response completa
fn send_raw(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(raw).unwrap();
    stream.flush().unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn send_request(addr: SocketAddr, method: &str, path: &str) -> String {
    send_raw(
        addr,
        format!("{} {} HTTP/1.1\r\nHost: localhost\r\n\r\n", method, path).as_bytes(),
    )
}

/// Helper: extrae el body de una response HTTP
fn extract_body(response: &str) -> &str {
    match response.find("\r\n\r\n") {
        Some(pos) => &response[pos + 4..],
        None => "",
    }
}

fn header<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    let head = &response[..response.find("\r\n\r\n")?];
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(": "))
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)
}

#[test]
fn test_health_endpoint() {
    let server = start(app_router());
    let response = send_request(server.local_addr().unwrap(), "GET", "/health");

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "got: {}", response);
    assert_eq!(extract_body(&response), "OK");
    assert_eq!(header(&response, "Content-Length"), Some("2"));
    assert_eq!(header(&response, "Access-Control-Allow-Origin"), Some("*"));
}

#[test]
fn test_query_params_reach_handler() {
    let server = start(app_router());
    let response = send_request(server.local_addr().unwrap(), "GET", "/api/hello?name=John%20Doe");

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header(&response, "Content-Type"), Some("application/json; charset=utf-8"));

    let body: serde_json::Value = serde_json::from_str(extract_body(&response)).unwrap();
    assert_eq!(body["message"], "Hello, John Doe!");
}

#[test]
fn test_wildcard_route() {
    let server = start(app_router());
    let addr = server.local_addr().unwrap();

    let response = send_request(addr, "GET", "/api/users");
    assert_eq!(extract_body(&response), "api catch-all: /api/users");

    let response = send_request(addr, "GET", "/other");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn test_not_found() {
    let server = start(app_router());
    let response = send_request(server.local_addr().unwrap(), "GET", "/nope");

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(extract_body(&response), "404 Not Found: /nope");
}

#[test]
fn test_invalid_request_gets_not_found() {
    let server = start(app_router());
    let response = send_raw(server.local_addr().unwrap(), b"THIS IS NOT HTTP\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "got: {}", response);
}

#[test]
fn test_empty_connection_gets_no_response() {
    let server = start(app_router());

    let mut stream = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.shutdown(std::net::Shutdown::Write).unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    assert!(response.is_empty());
}

#[test]
fn test_idle_client_is_closed_after_timeout() {
    let config = Config {
        timeout_secs: 1,
        ..test_config()
    };
    let mut server = Server::new(config, app_router(), Logger::disabled());
    server.start().unwrap();

    // Conecta y no manda nada ni cierra su lado
    let mut stream = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    let started = std::time::Instant::now();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();

    assert!(response.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(800));
    assert!(started.elapsed() < Duration::from_secs(8));
}

#[test]
fn test_post_body_split_across_writes() {
    let server = start(app_router());

    let mut stream = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream
        .write_all(b"POST /api/echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 11\r\n\r\nhello")
        .unwrap();
    stream.flush().unwrap();
    thread::sleep(Duration::from_millis(100));
    stream.write_all(b" world").unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(extract_body(&response), "hello world");
}

#[test]
fn test_middleware_stop() {
    let server = start(app_router());
    let addr = server.local_addr().unwrap();

    let response = send_request(addr, "GET", "/admin/panel");
    assert!(response.starts_with("HTTP/1.1 401 Unauthorized\r\n"));
    assert_eq!(extract_body(&response), "missing credentials");

    let response = send_raw(
        addr,
        b"GET /admin/panel HTTP/1.1\r\nAuthorization: Bearer t\r\n\r\n",
    );
    assert_eq!(extract_body(&response), "admin");
}

#[test]
fn test_handler_error_is_500() {
    let server = start(app_router());
    let addr = server.local_addr().unwrap();

    for path in ["/fail", "/panic"] {
        let response = send_request(addr, "GET", path);
        assert!(
            response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"),
            "{} got: {}",
            path,
            response
        );
        assert_eq!(extract_body(&response), "Internal Server Error");
    }

    // El servidor sigue atendiendo
    let response = send_request(addr, "GET", "/health");
    assert_eq!(extract_body(&response), "OK");
}

#[test]
fn test_static_files() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>static</h1>").unwrap();

    let mut router = app_router();
    router.serve_static("/site/", dir.path());
    let server = start(router);
    let addr = server.local_addr().unwrap();

    let response = send_request(addr, "GET", "/site/index.html");
    assert_eq!(header(&response, "Content-Type"), Some("text/html"));
    assert_eq!(extract_body(&response), "<h1>static</h1>");

    let response = send_request(addr, "GET", "/site/missing.html");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(extract_body(&response), "File not found");
}

#[test]
fn test_concurrent_clients() {
    let server = start(app_router());
    let addr = server.local_addr().unwrap();
    let clients = 16;
    let barrier = Arc::new(Barrier::new(clients));

    let handles: Vec<_> = (0..clients)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let response = send_request(addr, "GET", &format!("/api/hello?name=c{}", i));
                let body: serde_json::Value = serde_json::from_str(extract_body(&response)).unwrap();
                assert_eq!(body["message"], format!("Hello, c{}!", i));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_slow_requests_run_in_parallel() {
    let server = start(app_router());
    let addr = server.local_addr().unwrap();
    let started = std::time::Instant::now();

    let handles: Vec<_> = (0..4)
        .map(|_| thread::spawn(move || send_request(addr, "GET", "/slow")))
        .collect();
    for handle in handles {
        assert_eq!(extract_body(&handle.join().unwrap()), "slow");
    }

    // Cuatro workers: no tienen que ir uno detrás de otro (4 × 200ms)
    assert!(started.elapsed() < Duration::from_millis(700), "took {:?}", started.elapsed());
}

#[test]
fn test_stop_refuses_new_connections() {
    let mut server = start(app_router());
    let addr = server.local_addr().unwrap();
    assert!(send_request(addr, "GET", "/health").contains("200 OK"));

    server.stop();
    assert!(!server.is_running());
    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn test_logger_is_per_instance() {
    #[derive(Clone, Default)]
    struct Lines(Arc<std::sync::Mutex<Vec<u8>>>);
    impl Write for Lines {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let lines = Lines::default();
    let writer = lines.clone();
    let logger = Logger::with_writer("info", move || writer.clone());

    let mut server = Server::new(test_config(), app_router(), logger);
    server.start().unwrap();
    send_request(server.local_addr().unwrap(), "GET", "/health");
    server.stop();

    let log = String::from_utf8_lossy(&lines.0.lock().unwrap()).into_owned();
    assert!(log.contains("server listening"));
    assert!(log.contains("path=\"/health\"") || log.contains("path=/health"));
    assert!(log.contains("status=200"));
}

#[test]
fn test_in_process_transport_matches_socket() {
    let transport = InProcessTransport::new(app_router(), Logger::disabled());
    let raw = transport.deliver(b"GET /api/hello?name=Ana HTTP/1.1\r\n\r\n");
    let response = String::from_utf8(raw).unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    let body: serde_json::Value = serde_json::from_str(extract_body(&response)).unwrap();
    assert_eq!(body["message"], "Hello, Ana!");
}

// ==================== TLS ====================

fn start_tls(router: Router) -> Server {
    let tls = TlsTerminator::from_pem_files(fixture("cert.pem"), fixture("key.pem")).unwrap();
    let mut server = Server::new(test_config(), router, Logger::disabled()).with_tls(tls);
    server.start().expect("tls server should start");
    server
}

fn tls_client_config() -> Arc<rustls::ClientConfig> {
    let mut reader = BufReader::new(File::open(fixture("ca.pem")).unwrap());
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        roots.add(cert.unwrap()).unwrap();
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Arc::new(config)
}

#[test]
fn test_tls_request() {
    let server = start_tls(app_router());
    assert!(server.is_tls());

    let tcp = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    tcp.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let name = rustls::pki_types::ServerName::try_from("localhost").unwrap();
    let conn = rustls::ClientConnection::new(tls_client_config(), name).unwrap();
    let mut tls = rustls::StreamOwned::new(conn, tcp);

    tls.write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
    let mut response = Vec::new();
    tls.read_to_end(&mut response).unwrap();

    let response = String::from_utf8(response).unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "got: {}", response);
    assert_eq!(extract_body(&response), "OK");
}

#[test]
fn test_tls_handshake_failure_closes_without_response() {
    let handled = Arc::new(AtomicUsize::new(0));
    let mut router = Router::new();
    let h = Arc::clone(&handled);
    router.route(redunix_httpd::http::Method::OPTIONS, "*", move |_req, res| {
        h.fetch_add(1, Ordering::SeqCst);
        res.set_text_content("should not happen");
        Ok(())
    });

    let server = start_tls(router);

    let mut stream = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();

    // El cierre puede llegar como EOF o como reset
    let mut received = Vec::new();
    let _ = stream.read_to_end(&mut received);
    let response = String::from_utf8_lossy(&received);

    // A lo sumo un alert TLS, nunca una respuesta HTTP
    assert!(!response.contains("HTTP/1.1"), "got: {}", response);
    assert_eq!(handled.load(Ordering::SeqCst), 0);

    // El servidor sigue vivo después del handshake fallido
    assert!(server.is_running());
}
