//! Hot reload for dev mode.
//!
//! A dedicated thread watches the content directory. When a change survives
//! the temp-file filter and the one-second debounce, the thread records the
//! time in [`HotReloadState`] and writes a marker into the coalescing
//! [`signal`] channel, which wakes the event loop. Responses produced within
//! two seconds of the change carry the [`RELOAD_HEADER`].

use std::path::Path;
use std::sync::Arc;

pub mod debounce;
pub mod filter;
pub mod signal;
pub mod state;
pub mod table;
pub mod watcher;

pub use signal::{ReloadReceiver, ReloadSender};
pub use state::{HotReloadState, RELOAD_HEADER, now_millis};
pub use watcher::ReloadWatcher;

use crate::error::ServerError;

/// Everything the event loop holds while dev mode is active.
pub struct DevReload {
    pub state: Arc<HotReloadState>,
    pub receiver: ReloadReceiver,
    pub watcher: ReloadWatcher,
}

impl DevReload {
    /// Creates the shared state and signal channel and starts watching `root`.
    pub fn start(root: &Path) -> Result<Self, ServerError> {
        let state = Arc::new(HotReloadState::new());
        let (sender, receiver) = signal::channel();
        let watcher = ReloadWatcher::spawn(root, Arc::clone(&state), sender)?;
        Ok(Self {
            state,
            receiver,
            watcher,
        })
    }
}
