//! Fatal startup errors.
//!
//! Anything in here aborts startup before the server listens. Failures that
//! happen later (accept, handshake, a single watch registration) are logged
//! where they occur and never surface as a `ServerError`.

use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid listen address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("TLS enabled but certificate or key not provided")]
    MissingTlsMaterial,

    #[error("failed to read TLS file {path}: {source}")]
    TlsFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no private key found in {0}")]
    NoPrivateKey(PathBuf),

    #[error("invalid TLS configuration: {0}")]
    Tls(#[from] rustls::Error),

    #[error("unsupported minimum TLS version {0:?} (expected \"1.2\" or \"1.3\")")]
    TlsVersion(String),

    #[error("watch directory {0} does not exist")]
    WatchRoot(PathBuf),

    #[error("failed to start file watcher: {0}")]
    Watcher(#[from] notify::Error),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

/// A fixed-capacity table refused an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{table} capacity of {capacity} exceeded")]
pub struct CapacityExceeded {
    pub table: &'static str,
    pub capacity: usize,
}
