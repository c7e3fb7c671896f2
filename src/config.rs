//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables
//! de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./redunix-httpd --port 3000 \
//!   --workers 8 \
//!   --timeout-secs 10 \
//!   --static /assets/=./public
//! ```
//!
//! ### HTTPS
//! ```bash
//! ./redunix-httpd --https --cert ./certs/server.crt --key ./certs/server.key
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 RUST_LOG=debug ./redunix-httpd
//! ```

use crate::error::ConfigError;
use crate::logging::Logger;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Puerto por defecto en HTTP
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Puerto que se usa con `--https` si no se eligió otro
pub const DEFAULT_HTTPS_PORT: u16 = 8443;

fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// `PREFIX=DIR` → (prefijo, directorio)
fn parse_static_mount(value: &str) -> Result<(String, PathBuf), ConfigError> {
    match value.split_once('=') {
        Some((prefix, dir)) if !prefix.is_empty() && !dir.is_empty() => {
            Ok((prefix.to_string(), PathBuf::from(dir)))
        }
        _ => Err(ConfigError::InvalidStaticMount(value.to_string())),
    }
}

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "redunix-httpd")]
#[command(about = "Servidor HTTP/1.1 concurrente con pool de workers y TLS opcional")]
#[command(version)]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Puerto en el que escucha (0 = puerto efímero)
    #[arg(short, long, default_value_t = DEFAULT_HTTP_PORT, env = "HTTP_PORT")]
    pub port: u16,

    /// Conexiones pendientes que acepta el kernel antes del accept
    #[arg(long, default_value_t = 128, env = "HTTP_BACKLOG")]
    pub backlog: u32,

    // === Workers ===
    /// Threads del pool (por defecto uno por CPU)
    #[arg(short, long, default_value_t = default_workers(), env = "HTTP_WORKERS")]
    pub workers: usize,

    /// Timeout de lectura/escritura por conexión, en segundos
    #[arg(long = "timeout-secs", default_value_t = 30, env = "HTTP_TIMEOUT")]
    pub timeout_secs: u64,

    /// Máximo de conexiones (solo informativo, no se aplica)
    #[arg(long = "max-connections", default_value_t = 100, env = "HTTP_MAX_CONNECTIONS")]
    pub max_connections: usize,

    /// Tamaño máximo de un request (headers + body) en bytes
    #[arg(long = "max-request-bytes", default_value_t = 1024 * 1024, env = "HTTP_MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    // === TLS ===
    /// Habilita HTTPS
    #[arg(long, env = "HTTP_HTTPS")]
    pub https: bool,

    /// Certificado PEM (cadena completa)
    #[arg(long, default_value = "./certs/server.crt", env = "HTTP_CERT")]
    pub cert: PathBuf,

    /// Llave privada PEM
    #[arg(long, default_value = "./certs/server.key", env = "HTTP_KEY")]
    pub key: PathBuf,

    // === Contenido ===
    /// Directorio servido bajo un prefijo, `PREFIX=DIR` (se puede repetir)
    #[arg(long = "static", value_name = "PREFIX=DIR", value_parser = parse_static_mount)]
    pub static_mounts: Vec<(String, PathBuf)>,

    /// Directiva de logging (ej: `info`, `debug`, `redunix_httpd=trace`)
    #[arg(long = "log-level", default_value = "info", env = "RUST_LOG")]
    pub log_level: String,
}

impl Config {
    /// Crea la configuración parseando argumentos CLI y variables de entorno
    pub fn new() -> Self {
        Config::parse()
    }

    /// Puerto real: 8443 si se pidió HTTPS y el puerto quedó en 8080
    pub fn effective_port(&self) -> u16 {
        if self.https && self.port == DEFAULT_HTTP_PORT {
            DEFAULT_HTTPS_PORT
        } else {
            self.port
        }
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use redunix_httpd::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.effective_port())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.backlog == 0 {
            return Err(ConfigError::ZeroBacklog);
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::ZeroRequestLimit);
        }
        if self.https && (self.cert.as_os_str().is_empty() || self.key.as_os_str().is_empty()) {
            return Err(ConfigError::MissingTlsFiles);
        }

        Ok(())
    }

    /// Escribe un resumen de la configuración en el logger
    pub fn print_summary(&self, logger: &Logger) {
        logger.in_scope(|| {
            tracing::info!("RedUnix HTTP/1.1 server configuration");
            tracing::info!(
                address = %self.address(),
                scheme = if self.https { "https" } else { "http" },
                backlog = self.backlog,
                "network"
            );
            tracing::info!(
                workers = self.workers,
                timeout_secs = self.timeout_secs,
                max_connections = self.max_connections,
                max_request_bytes = self.max_request_bytes,
                "workers"
            );
            if self.https {
                tracing::info!(cert = %self.cert.display(), key = %self.key.display(), "tls");
            }
            for (prefix, dir) in &self.static_mounts {
                tracing::info!(prefix = %prefix, dir = %dir.display(), "static mount");
            }
        });
    }
}

impl Default for Config {
    /// Configuración por defecto (mismos valores que los flags)
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_HTTP_PORT,
            backlog: 128,
            workers: default_workers(),
            timeout_secs: 30,
            max_connections: 100,
            max_request_bytes: 1024 * 1024,
            https: false,
            cert: PathBuf::from("./certs/server.crt"),
            key: PathBuf::from("./certs/server.key"),
            static_mounts: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}
