use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use livehttp::config::Config;
use livehttp::handlers::html;
use livehttp::server::{Router, Shutdown, run};

/// Serve a content directory, reloading the browser on change in dev mode.
#[derive(Debug, Parser)]
#[command(name = "livehttp", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    listen: Option<String>,

    /// Enable hot reload and the streamed dev page
    #[arg(long)]
    dev: bool,

    /// Directory watched in dev mode
    #[arg(long)]
    watch_dir: Option<PathBuf>,

    /// Static file root; pages load from <public-dir>/html
    #[arg(long)]
    public_dir: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Serve HTTPS
    #[arg(long)]
    tls: bool,

    /// PEM certificate chain
    #[arg(long)]
    cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long)]
    key: Option<PathBuf>,

    /// Lowest accepted TLS version: 1.2 or 1.3
    #[arg(long)]
    tls_min_version: Option<String>,

    /// Plaintext address redirecting to HTTPS
    #[arg(long)]
    redirect_addr: Option<String>,
}

impl Cli {
    fn apply(self, cfg: &mut Config) {
        if let Some(listen) = self.listen {
            cfg.listen_addr = listen;
        }
        if let Some(public_dir) = self.public_dir {
            cfg.public_dir = public_dir;
        }
        cfg.verbose |= self.verbose;

        cfg.dev.enabled |= self.dev;
        if let Some(watch_dir) = self.watch_dir {
            cfg.dev.watch_dir = watch_dir;
        }

        cfg.tls.enabled |= self.tls;
        if self.cert.is_some() {
            cfg.tls.cert = self.cert;
        }
        if self.key.is_some() {
            cfg.tls.key = self.key;
        }
        if let Some(version) = self.tls_min_version {
            cfg.tls.min_version = version;
        }
        if let Some(addr) = self.redirect_addr {
            cfg.tls.redirect_addr = addr;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::load(cli.config.as_deref())?;
    cli.apply(&mut cfg);

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(if cfg.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let mut router = Router::new();
    router
        .dev_page("/", html::page(cfg.html_dir(), "index.html"))
        .use_static_files(cfg.public_dir.clone());

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    run(cfg, router, shutdown).await
}
