//! TLS context construction for the main listener.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;
use crate::error::ServerError;

/// Builds the acceptor used to wrap every accepted connection.
///
/// Both certificate and key must be configured; either missing is fatal.
pub fn acceptor(cfg: &TlsConfig) -> Result<TlsAcceptor, ServerError> {
    let (Some(cert_path), Some(key_path)) = (cfg.cert.as_deref(), cfg.key.as_deref()) else {
        return Err(ServerError::MissingTlsMaterial);
    };

    let versions: &[&'static rustls::SupportedProtocolVersion] = match cfg.min_version.as_str() {
        "1.2" => &[&rustls::version::TLS13, &rustls::version::TLS12],
        "1.3" => &[&rustls::version::TLS13],
        other => return Err(ServerError::TlsVersion(other.to_string())),
    };

    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_protocol_versions(versions)?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    tracing::info!(cert = %cert_path.display(), min_version = %cfg.min_version, "TLS enabled");
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn open(path: &Path) -> Result<BufReader<File>, ServerError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ServerError::TlsFile {
            path: path.to_path_buf(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    certs(&mut open(path)?)
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|source| ServerError::TlsFile {
            path: path.to_path_buf(),
            source,
        })
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, ServerError> {
    private_key(&mut open(path)?)
        .map_err(|source| ServerError::TlsFile {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| ServerError::NoPrivateKey(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_fatal() {
        let cfg = TlsConfig {
            enabled: true,
            cert: Some("cert.pem".into()),
            ..TlsConfig::default()
        };
        assert!(matches!(acceptor(&cfg), Err(ServerError::MissingTlsMaterial)));
    }

    #[test]
    fn unknown_min_version_is_rejected() {
        let cfg = TlsConfig {
            enabled: true,
            cert: Some("cert.pem".into()),
            key: Some("key.pem".into()),
            min_version: "1.1".to_string(),
            ..TlsConfig::default()
        };
        assert!(matches!(acceptor(&cfg), Err(ServerError::TlsVersion(_))));
    }

    #[test]
    fn unreadable_cert_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TlsConfig {
            enabled: true,
            cert: Some(dir.path().join("missing-cert.pem")),
            key: Some(dir.path().join("missing-key.pem")),
            ..TlsConfig::default()
        };
        assert!(matches!(acceptor(&cfg), Err(ServerError::TlsFile { .. })));
    }

    #[test]
    fn key_file_without_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "").unwrap();
        std::fs::write(&key, "not a pem file\n").unwrap();

        let cfg = TlsConfig {
            enabled: true,
            cert: Some(cert),
            key: Some(key),
            ..TlsConfig::default()
        };
        assert!(matches!(acceptor(&cfg), Err(ServerError::NoPrivateKey(_))));
    }
}
