//! Connections left open after a streamed response.
//!
//! The event loop does not close a streamed connection. Instead it parks it
//! here, bounded by a fixed number of permits. A parked connection ends when
//! the peer disconnects, after an idle period with no inbound bytes, or at
//! shutdown. Anything the peer sends while parked is discarded.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::StreamConfig;
use crate::http::connection::BoxedIo;
use crate::server::shutdown::Shutdown;

pub struct StreamPark {
    permits: Arc<Semaphore>,
    max_open: usize,
    idle: Duration,
    tasks: JoinSet<()>,
    shutdown: Shutdown,
}

impl StreamPark {
    pub fn new(cfg: &StreamConfig, shutdown: Shutdown) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(cfg.max_open)),
            max_open: cfg.max_open,
            idle: cfg.idle_timeout(),
            tasks: JoinSet::new(),
            shutdown,
        }
    }

    /// Number of streamed connections currently held open.
    pub fn open(&self) -> usize {
        self.max_open - self.permits.available_permits()
    }

    /// Holds `stream` open, or closes it right away when every permit is in
    /// use. Returns whether the stream was parked.
    pub async fn park(&mut self, mut stream: BoxedIo, peer: SocketAddr) -> bool {
        while self.tasks.try_join_next().is_some() {}

        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            warn!(%peer, max_open = self.max_open, "too many open streamed connections, closing");
            let _ = stream.shutdown().await;
            return false;
        };

        let idle = self.idle;
        let shutdown = self.shutdown.clone();
        self.tasks.spawn(async move {
            let _permit = permit;
            hold(stream, idle, shutdown).await;
            debug!(%peer, "streamed connection closed");
        });
        true
    }

    /// Closes every parked connection and waits for their tasks.
    pub async fn close_all(&mut self) {
        self.tasks.shutdown().await;
    }
}

async fn hold(mut stream: BoxedIo, idle: Duration, shutdown: Shutdown) {
    let mut discard = [0u8; 512];

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            read = tokio::time::timeout(idle, stream.read(&mut discard)) => match read {
                Ok(Ok(0)) | Ok(Err(_)) => break,
                Ok(Ok(_)) => continue,
                Err(_) => {
                    debug!(idle_secs = idle.as_secs(), "streamed connection idle, closing");
                    break;
                }
            },
        }
    }

    let _ = stream.shutdown().await;
}
