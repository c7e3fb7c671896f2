//! # Logging
//! src/logging.rs
//!
//! Logging estructurado con `tracing`, pero sin un logger global de
//! proceso: cada servidor recibe su propio [`Logger`]. El thread del accept
//! loop y cada worker instalan el `Dispatch` del logger como default del
//! thread, así que los macros `tracing::info!` etc. que se ejecutan dentro
//! del pipeline (router, handlers, middleware) terminan en el logger de ese
//! servidor.
//!
//! ```
//! use redunix_httpd::logging::Logger;
//!
//! let logger = Logger::disabled();
//! logger.in_scope(|| tracing::info!("esto no se imprime"));
//! ```

use tracing::dispatcher::{self, DefaultGuard};
use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Nivel usado cuando la directiva recibida no se puede parsear
const FALLBACK_DIRECTIVE: &str = "info";

/// Capacidad de logging de una instancia del servidor
#[derive(Clone, Debug)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Logger a stdout con una directiva estilo `RUST_LOG` (ej: `"debug"`,
    /// `"redunix_httpd=trace,info"`)
    pub fn new(directive: &str) -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(Self::filter(directive))
            .with_thread_names(true)
            .finish();

        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Logger que escribe en `writer` (archivo, buffer en memoria, ...)
    pub fn with_writer<W>(directive: &str, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(Self::filter(directive))
            .with_ansi(false)
            .with_writer(writer)
            .finish();

        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Logger que descarta todo
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    fn filter(directive: &str) -> EnvFilter {
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE))
    }

    /// Ejecuta `f` con este logger como destino de los eventos de tracing
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }

    /// Instala este logger como default del thread actual hasta que se
    /// suelte el guard
    pub fn install(&self) -> DefaultGuard {
        dispatcher::set_default(&self.dispatch)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(FALLBACK_DIRECTIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_in_scope_routes_to_instance() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let logger = Logger::with_writer("info", move || writer.clone());

        logger.in_scope(|| tracing::info!(port = 8080, "listening"));

        let out = buf.contents();
        assert!(out.contains("listening"));
        assert!(out.contains("port=8080"));
    }

    #[test]
    fn test_level_filter() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let logger = Logger::with_writer("warn", move || writer.clone());

        logger.in_scope(|| {
            tracing::info!("hidden");
            tracing::warn!("shown");
        });

        let out = buf.contents();
        assert!(!out.contains("hidden"));
        assert!(out.contains("shown"));
    }

    #[test]
    fn test_two_instances_are_independent() {
        let a = SharedBuf::default();
        let b = SharedBuf::default();
        let (wa, wb) = (a.clone(), b.clone());
        let logger_a = Logger::with_writer("info", move || wa.clone());
        let logger_b = Logger::with_writer("info", move || wb.clone());

        logger_a.in_scope(|| tracing::info!("for-a"));
        logger_b.in_scope(|| tracing::info!("for-b"));

        assert!(a.contents().contains("for-a") && !a.contents().contains("for-b"));
        assert!(b.contents().contains("for-b") && !b.contents().contains("for-a"));
    }

    #[test]
    fn test_install_guard_on_thread() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let logger = Logger::with_writer("debug", move || writer.clone());

        std::thread::spawn(move || {
            let _guard = logger.install();
            tracing::debug!("from worker");
        })
        .join()
        .unwrap();

        assert!(buf.contents().contains("from worker"));
    }
}
