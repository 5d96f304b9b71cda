use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Server configuration.
///
/// Loaded from an optional YAML file, then `LISTEN` from the environment,
/// then whatever the command line overrides. Every field has a default, so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address of the main listener (e.g. "0.0.0.0:8080")
    pub listen_addr: String,
    /// Log every request with its raw header block
    pub verbose: bool,
    /// Root for static files; HTML pages are loaded from `<public_dir>/html`
    pub public_dir: PathBuf,
    /// Upper bound for handshake, read and write of one connection
    pub request_timeout_secs: Option<u64>,
    pub dev: DevConfig,
    pub tls: TlsConfig,
    pub streams: StreamConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DevConfig {
    /// Enables the file watcher and the streamed dev page
    pub enabled: bool,
    pub watch_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    /// Lowest protocol version accepted: "1.2" or "1.3"
    pub min_version: String,
    /// Plaintext listener that answers every connection with a 301
    pub redirect_addr: String,
    /// Host name written into the redirect `Location`
    pub redirect_host: String,
}

/// Limits for connections left open after a streamed response.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub max_open: usize,
    pub idle_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            verbose: false,
            public_dir: PathBuf::from("./public"),
            request_timeout_secs: Some(10),
            dev: DevConfig::default(),
            tls: TlsConfig::default(),
            streams: StreamConfig::default(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            watch_dir: PathBuf::from("./public"),
        }
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert: None,
            key: None,
            min_version: "1.2".to_string(),
            redirect_addr: "0.0.0.0:8080".to_string(),
            redirect_host: "localhost".to_string(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_open: 16,
            idle_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads the configuration file if one is given, then applies `LISTEN`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        // serde_yaml rejects an empty document instead of defaulting it.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Directory the HTML page handlers load from.
    pub fn html_dir(&self) -> PathBuf {
        self.public_dir.join("html")
    }
}

impl StreamConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
