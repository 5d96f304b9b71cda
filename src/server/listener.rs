use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::error::ServerError;
use crate::http::connection::{BoxedIo, Connection, Outcome, ServeContext};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::reload::{DevReload, HotReloadState, ReloadReceiver, ReloadWatcher};
use crate::server::redirect;
use crate::server::router::Router;
use crate::server::shutdown::Shutdown;
use crate::server::streams::StreamPark;
use crate::server::tls;

/// Longest the loop sleeps with nothing to do before logging a liveness tick.
pub const LIVENESS_INTERVAL: Duration = Duration::from_secs(1);

/// A configured server with its route table, not yet listening.
pub struct Server {
    config: Config,
    router: Router,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self::with_router(config, Router::new())
    }

    pub fn with_router(config: Config, router: Router) -> Self {
        Self { config, router }
    }

    pub fn route<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        self.router.route(method, path, handler);
        self
    }

    /// Builds the TLS context when enabled, then binds the listen address.
    ///
    /// TLS problems are reported before anything binds, so a misconfigured
    /// server never listens.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let tls = if self.config.tls.enabled {
            Some(tls::acceptor(&self.config.tls)?)
        } else {
            None
        };

        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.listen_addr.clone(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(BoundServer {
            config: self.config,
            router: self.router,
            listener,
            tls,
        })
    }
}

/// A server whose listener is bound and ready to accept.
pub struct BoundServer {
    config: Config,
    router: Router,
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
}

impl BoundServer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the event loop until `shutdown` fires, then tears down in order:
    /// the listener, the file watcher, the redirect listener, and any parked
    /// streamed connections.
    pub async fn run(self, shutdown: Shutdown) -> anyhow::Result<()> {
        let BoundServer {
            config,
            router,
            listener,
            tls,
        } = self;

        let local_addr = listener.local_addr()?;
        let scheme = if tls.is_some() { "https" } else { "http" };
        info!("Server is listening on {scheme}://localhost:{}", local_addr.port());

        let redirect = if tls.is_some() {
            redirect::start(
                &config.tls.redirect_addr,
                &config.tls.redirect_host,
                local_addr,
                shutdown.clone(),
            )
            .await
        } else {
            None
        };

        let (reload_state, mut reload_rx, watcher) = start_dev_reload(&config);

        let ctx = ServeContext {
            router: &router,
            dev_mode: config.dev.enabled,
            reload: reload_state.as_deref(),
        };
        let timeout = config.request_timeout();
        let mut streams = StreamPark::new(&config.streams, shutdown.clone());

        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait() => {
                    info!("shutdown requested, stopping event loop");
                    break;
                }

                accepted = listener.accept() => {
                    // A reload that became ready alongside the connection is
                    // handled in the same cycle.
                    if let Some(rx) = reload_rx.as_mut() {
                        let markers = rx.drain();
                        if markers > 0 {
                            info!(markers, "reload signal received");
                        }
                    }

                    match accepted {
                        Ok((socket, peer)) => {
                            if let Some(stream) = serve(socket, peer, tls.as_ref(), ctx, timeout).await {
                                streams.park(stream, peer).await;
                            }
                        }
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }

                wake = next_reload(&mut reload_rx) => match wake {
                    Some(markers) => info!(markers, "reload signal received"),
                    None => {
                        debug!("reload channel closed");
                        reload_rx = None;
                    }
                },

                _ = tokio::time::sleep(LIVENESS_INTERVAL) => {
                    trace!(open_streams = streams.open(), "event loop idle");
                }
            }
        }

        drop(listener);

        if let Some(mut watcher) = watcher {
            if let Err(e) = tokio::task::spawn_blocking(move || watcher.shutdown()).await {
                error!(error = %e, "file watcher shutdown failed");
            }
        }

        if let Some(handle) = redirect {
            if let Err(e) = handle.await {
                error!(error = %e, "redirect listener task failed");
            }
        }

        streams.close_all().await;
        info!("server stopped");
        Ok(())
    }
}

/// Binds and runs `router` under `config` until `shutdown` fires.
pub async fn run(config: Config, router: Router, shutdown: Shutdown) -> anyhow::Result<()> {
    Server::with_router(config, router).bind().await?.run(shutdown).await
}

type DevParts = (
    Option<std::sync::Arc<HotReloadState>>,
    Option<ReloadReceiver>,
    Option<ReloadWatcher>,
);

/// Starts hot reload when dev mode is on. Failure leaves the server running
/// without it.
fn start_dev_reload(config: &Config) -> DevParts {
    if !config.dev.enabled {
        return (None, None, None);
    }

    match DevReload::start(&config.dev.watch_dir) {
        Ok(DevReload {
            state,
            receiver,
            watcher,
        }) => {
            info!(dir = %config.dev.watch_dir.display(), "hot reload enabled");
            (Some(state), Some(receiver), Some(watcher))
        }
        Err(e) => {
            error!(error = %e, "hot reload unavailable");
            (None, None, None)
        }
    }
}

/// Resolves with the next reload wake, or never when hot reload is off.
async fn next_reload(rx: &mut Option<ReloadReceiver>) -> Option<usize> {
    match rx {
        Some(rx) => rx.wait().await,
        None => std::future::pending().await,
    }
}

/// Services one accepted socket inline. Returns the stream when the
/// response was streamed and the connection must stay open.
async fn serve(
    socket: TcpStream,
    peer: SocketAddr,
    tls: Option<&TlsAcceptor>,
    ctx: ServeContext<'_>,
    timeout: Option<Duration>,
) -> Option<BoxedIo> {
    debug!(%peer, "accepted connection");

    let work = async {
        let stream: BoxedIo = match tls {
            Some(acceptor) => match acceptor.accept(socket).await {
                Ok(stream) => Box::new(stream),
                Err(e) => {
                    warn!(%peer, error = %e, "TLS handshake failed");
                    return Ok(Outcome::Aborted);
                }
            },
            None => Box::new(socket),
        };
        Connection::new(stream).run(ctx).await
    };

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%peer, timeout_secs = limit.as_secs(), "connection timed out");
                return None;
            }
        },
        None => work.await,
    };

    match result {
        Ok(Outcome::Closed) => None,
        Ok(Outcome::Streamed(stream)) => Some(stream),
        Ok(Outcome::Aborted) => {
            debug!(%peer, "connection closed without a request");
            None
        }
        Err(e) => {
            warn!(%peer, error = %e, "connection error");
            None
        }
    }
}
