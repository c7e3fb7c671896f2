//! # RedUnix HTTP Server - Entry Point
//! src/main.rs
//!
//! Arma la aplicación de demo, arranca el servidor y espera Ctrl-C.
//!
//! ```bash
//! cargo run -- --port 8080 --static /assets/=./public
//! curl http://localhost:8080/api/hello?name=Ana
//! ```

use redunix_httpd::config::Config;
use redunix_httpd::error::HandlerResult;
use redunix_httpd::http::{Request, Response, StatusCode};
use redunix_httpd::logging::Logger;
use redunix_httpd::router::{Flow, Router};
use redunix_httpd::server::{Server, TlsTerminator};
use serde::Serialize;
use serde_json::json;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>RedUnix HTTP Server</title></head>
<body>
  <h1>RedUnix HTTP/1.1 Server</h1>
  <ul>
    <li><a href="/api/status">GET /api/status</a></li>
    <li><a href="/api/hello?name=World">GET /api/hello?name=World</a></li>
    <li>POST /api/echo</li>
    <li><a href="/health">GET /health</a></li>
  </ul>
</body>
</html>
"#;

fn main() {
    let config = Config::new();
    let logger = Logger::new(&config.log_level);

    if let Err(e) = config.validate() {
        logger.in_scope(|| tracing::error!(error = %e, "invalid configuration"));
        process::exit(1);
    }
    config.print_summary(&logger);

    let router = build_router(&config);
    let mut server = Server::new(config.clone(), router, logger.clone());

    if config.https {
        match TlsTerminator::from_pem_files(&config.cert, &config.key) {
            Ok(tls) => server = server.with_tls(tls),
            Err(e) => {
                logger.in_scope(|| tracing::error!(error = %e, "failed to load TLS certificate"));
                process::exit(1);
            }
        }
    }

    if let Err(e) = server.start() {
        logger.in_scope(|| tracing::error!(error = %e, "failed to start server"));
        process::exit(1);
    }

    if let Some(stop) = server.stop_handle() {
        let signal_logger = logger.clone();
        let registered = ctrlc::set_handler(move || {
            signal_logger.in_scope(|| tracing::info!("shutdown signal received"));
            stop.stop();
        });

        if let Err(e) = registered {
            logger.in_scope(|| tracing::warn!(error = %e, "could not register signal handler"));
        }
    }

    server.wait();
}

fn build_router(config: &Config) -> Router {
    let mut router = Router::new();

    router
        .use_middleware(|_req, res| {
            res.enable_cors("*");
            Ok(Flow::Continue)
        })
        .use_middleware(|req, _res| {
            tracing::debug!(
                method = %req.method(),
                path = req.path(),
                user_agent = req.header("User-Agent").unwrap_or("-"),
                "incoming request"
            );
            Ok(Flow::Continue)
        });

    router
        .get("/", index)
        .get("/api/status", status)
        .get("/api/hello", hello)
        .post("/api/echo", echo)
        .get("/health", health);

    for (prefix, dir) in &config.static_mounts {
        router.serve_static(prefix, dir.clone());
    }

    router.set_not_found_handler(|req, res| {
        res.set_status(StatusCode::NotFound);
        res.set_json_value(&json!({
            "error": "Not Found",
            "path": req.path(),
        }))?;
        Ok(())
    });

    router
}

fn index(_req: &Request, res: &mut Response) -> HandlerResult {
    res.set_html_content(INDEX_HTML);
    Ok(())
}

/// Cuerpo de `GET /api/status`
#[derive(Serialize)]
struct StatusReport {
    status: &'static str,
    server: &'static str,
    version: &'static str,
    timestamp: u64,
}

fn status(_req: &Request, res: &mut Response) -> HandlerResult {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    res.set_json_value(&StatusReport {
        status: "running",
        server: "RedUnix-HTTP/1.1",
        version: env!("CARGO_PKG_VERSION"),
        timestamp,
    })?;
    Ok(())
}

fn hello(req: &Request, res: &mut Response) -> HandlerResult {
    let name = req.query_param("name").unwrap_or("World");
    res.set_json_value(&json!({ "message": format!("Hello, {}!", name) }))?;
    Ok(())
}

fn echo(req: &Request, res: &mut Response) -> HandlerResult {
    res.set_json_value(&json!({
        "echo": req.body_str(),
        "length": req.body().len(),
        "content_type": req.content_type(),
    }))?;
    Ok(())
}

fn health(_req: &Request, res: &mut Response) -> HandlerResult {
    res.set_text_content("OK");
    Ok(())
}
