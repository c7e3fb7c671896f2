//! # Terminación TLS
//! src/server/tls.rs
//!
//! Adaptador delgado sobre `rustls`. Carga un certificado y una llave PEM
//! en un `ServerConfig` reutilizable y hace el handshake completo sobre cada
//! conexión aceptada antes de que se lea un solo byte HTTP.
//!
//! Si el handshake falla la conexión se cierra sin respuesta y no se
//! reintenta.

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use std::fs::File;
use std::io::{self, BufReader};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Conexión TCP con TLS ya negociado
pub type TlsStream = StreamOwned<ServerConnection, TcpStream>;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read certificate file {}: {source}", .path.display())]
    ReadCertificate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no certificates found in {}", .0.display())]
    NoCertificates(PathBuf),

    #[error("failed to read private key file {}: {source}", .path.display())]
    ReadKey {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no private key found in {}", .0.display())]
    NoPrivateKey(PathBuf),

    #[error("invalid TLS configuration: {0}")]
    Config(#[from] rustls::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),
}

/// Contexto TLS del lado servidor, compartido por todas las conexiones
#[derive(Clone)]
pub struct TlsTerminator {
    config: Arc<ServerConfig>,
}

impl TlsTerminator {
    /// Carga la cadena de certificados y la llave privada desde archivos PEM
    pub fn from_pem_files(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self, TlsError> {
        let certs = load_certs(cert_path.as_ref())?;
        let key = load_private_key(key_path.as_ref())?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        Ok(Self::from_config(Arc::new(config)))
    }

    /// Usa un `ServerConfig` armado por el llamador
    pub fn from_config(config: Arc<ServerConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Arc<ServerConfig> {
        &self.config
    }

    /// Negocia TLS sobre `tcp` hasta terminar el handshake
    ///
    /// Los timeouts del socket ya tienen que estar puestos; un cliente que
    /// no habla TLS o que se queda callado termina en error.
    pub fn handshake(&self, mut tcp: TcpStream) -> Result<TlsStream, TlsError> {
        let mut conn = ServerConnection::new(Arc::clone(&self.config))?;

        while conn.is_handshaking() {
            let (read, written) = conn.complete_io(&mut tcp).map_err(TlsError::Handshake)?;

            // Socket bloqueante: (0, 0) solo pasa si el cliente cerró
            if read == 0 && written == 0 && conn.is_handshaking() {
                return Err(TlsError::Handshake(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed during handshake",
                )));
            }
        }

        Ok(StreamOwned::new(conn, tcp))
    }
}

impl std::fmt::Debug for TlsTerminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsTerminator").finish_non_exhaustive()
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let read_error = |source| TlsError::ReadCertificate {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = BufReader::new(File::open(path).map_err(read_error)?);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let read_error = |source| TlsError::ReadKey {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = BufReader::new(File::open(path).map_err(read_error)?);
    rustls_pemfile::private_key(&mut reader)
        .map_err(read_error)?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}
