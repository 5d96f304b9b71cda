//! The file watcher thread.
//!
//! ```text
//! notify callback → std mpsc → watcher thread ─┬→ register new directories
//!                                              └→ filter → debounce → mark_changed + signal
//! ```
//!
//! Directories are registered one by one (non-recursive watches) so the watch
//! table mirrors exactly what is covered, and so the hidden/denylist
//! predicate applies at every level, including directories created later.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use crate::error::ServerError;
use crate::reload::debounce::Debounce;
use crate::reload::filter::{is_skipped_dir, is_temp_file};
use crate::reload::signal::ReloadSender;
use crate::reload::state::{HotReloadState, now_millis};

/// Upper bound on how long the watcher goes without checking for shutdown.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Registers a single, non-recursive directory watch.
pub trait WatchBackend {
    fn add_watch(&mut self, dir: &Path) -> notify::Result<()>;
}

impl WatchBackend for RecommendedWatcher {
    fn add_watch(&mut self, dir: &Path) -> notify::Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Moved,
}

/// One filesystem change, reduced to what the watcher acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub is_dir: bool,
}

impl FsChange {
    /// Splits a notify event into per-path changes.
    ///
    /// Metadata-only and access events carry no content change and are
    /// dropped here.
    pub fn from_event(event: &Event) -> Vec<FsChange> {
        let (kind, is_dir) = match event.kind {
            EventKind::Create(CreateKind::Folder) => (ChangeKind::Created, Some(true)),
            EventKind::Create(CreateKind::File) => (ChangeKind::Created, Some(false)),
            EventKind::Create(_) => (ChangeKind::Created, None),
            EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
            EventKind::Modify(ModifyKind::Name(_)) => (ChangeKind::Moved, None),
            EventKind::Modify(_) => (ChangeKind::Modified, None),
            EventKind::Remove(RemoveKind::Folder) => (ChangeKind::Removed, Some(true)),
            EventKind::Remove(_) => (ChangeKind::Removed, Some(false)),
            _ => return Vec::new(),
        };

        event
            .paths
            .iter()
            .map(|path| FsChange {
                path: path.clone(),
                kind,
                is_dir: is_dir.unwrap_or_else(|| path.is_dir()),
            })
            .collect()
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Owns the watch backend and keeps the shared watch table in step with it.
///
/// The table records every directory ever registered and is never pruned.
/// `live` holds the directories the backend is watching right now; a
/// directory that disappears leaves it, so a directory recreated at the same
/// path gets a fresh backend watch.
pub struct WatchRegistry<B> {
    backend: B,
    state: Arc<HotReloadState>,
    live: HashSet<PathBuf>,
}

impl<B: WatchBackend> WatchRegistry<B> {
    pub fn new(backend: B, state: Arc<HotReloadState>) -> Self {
        Self {
            backend,
            state,
            live: HashSet::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_watched(&self, dir: &Path) -> bool {
        self.live.contains(dir)
    }

    /// Watches one directory. Returns whether it is covered afterwards.
    ///
    /// A directory not yet in the table is dropped once the table is full; a
    /// backend failure is logged and leaves that directory uncovered.
    pub fn register_watch(&mut self, dir: &Path) -> bool {
        if self.live.contains(dir) {
            return true;
        }

        let mut table = self.state.table();
        let known = table.contains(dir);
        if !known && table.is_full() {
            debug!(dir = %dir.display(), capacity = table.capacity(), "watch table full, dropping registration");
            return false;
        }

        if let Err(e) = self.backend.add_watch(dir) {
            error!(dir = %dir.display(), error = %e, "failed to add watch");
            return false;
        }

        if known {
            debug!(dir = %dir.display(), "re-added watch");
        } else {
            match table.try_insert(dir) {
                Ok(id) => debug!(dir = %dir.display(), id = id.0, "added watch"),
                Err(e) => {
                    debug!(dir = %dir.display(), "{e}");
                    return false;
                }
            }
        }

        self.live.insert(dir.to_path_buf());
        true
    }

    /// Drops live watches at or below `path` once it no longer exists.
    pub fn forget(&mut self, path: &Path) {
        let before = self.live.len();
        self.live.retain(|dir| !dir.starts_with(path));
        if self.live.len() != before {
            debug!(dir = %path.display(), dropped = before - self.live.len(), "directory gone, watch released");
        }
    }

    /// Watches `root` and every subdirectory below it, skipping hidden and
    /// denylisted directories. Symlinked directories are not followed.
    pub fn register_recursive(&mut self, root: &Path) {
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            if !self.register_watch(&dir) && self.state.table().is_full() {
                debug!(dir = %dir.display(), "watch table full, not descending");
                continue;
            }

            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    error!(dir = %dir.display(), error = %e, "failed to open directory");
                    continue;
                }
            };

            for entry in entries.flatten() {
                let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
                if !is_dir || is_skipped_dir(&entry.file_name().to_string_lossy()) {
                    continue;
                }
                pending.push(entry.path());
            }
        }
    }
}

/// Turns filesystem changes into watch registrations and reload signals.
pub struct ChangeProcessor<B> {
    registry: WatchRegistry<B>,
    debounce: Debounce,
    state: Arc<HotReloadState>,
    signal: ReloadSender,
}

impl<B: WatchBackend> ChangeProcessor<B> {
    pub fn new(registry: WatchRegistry<B>, signal: ReloadSender) -> Self {
        let state = Arc::clone(&registry.state);
        Self {
            registry,
            debounce: Debounce::new(),
            state,
            signal,
        }
    }

    pub fn registry(&self) -> &WatchRegistry<B> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WatchRegistry<B> {
        &mut self.registry
    }

    /// Handles one change observed at `now_ms`. Returns whether it was
    /// accepted as a reload.
    pub fn process(&mut self, change: &FsChange, now_ms: u64) -> bool {
        let name = change.name();

        let gone = match change.kind {
            ChangeKind::Removed => true,
            ChangeKind::Moved => !change.path.exists(),
            _ => false,
        };
        if gone {
            self.registry.forget(&change.path);
        }

        let new_dir = change.is_dir && matches!(change.kind, ChangeKind::Created | ChangeKind::Moved);
        if new_dir && !is_temp_file(&name) && !is_skipped_dir(&name) {
            let parent_watched = change
                .path
                .parent()
                .is_some_and(|parent| self.registry.is_watched(parent));
            if parent_watched {
                self.registry.register_recursive(&change.path);
            }
        }

        if is_temp_file(&name) || !self.debounce.try_accept(now_ms) {
            return false;
        }

        info!(file = %name, kind = ?change.kind, "file change detected, reload pending");
        self.state.mark_changed(now_ms);
        if !self.signal.notify() {
            debug!("reload signal has no receiver");
        }
        true
    }

    /// Handles one batch read from the event source. Returns whether any
    /// change in it was accepted.
    pub fn process_batch(&mut self, changes: &[FsChange], now_ms: u64) -> bool {
        let mut accepted = false;
        for change in changes {
            accepted |= self.process(change, now_ms);
        }
        accepted
    }
}

/// Handle to the running watcher thread.
///
/// Shutting down sets the shared flag and joins the thread; the thread then
/// drops the notify watcher and the signal sender, closing both channels.
/// Dropping the handle shuts it down too.
pub struct ReloadWatcher {
    state: Arc<HotReloadState>,
    handle: Option<JoinHandle<()>>,
}

impl ReloadWatcher {
    pub fn spawn(
        root: &Path,
        state: Arc<HotReloadState>,
        signal: ReloadSender,
    ) -> Result<Self, ServerError> {
        if !root.is_dir() {
            return Err(ServerError::WatchRoot(root.to_path_buf()));
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;

        let root = root.to_path_buf();
        let thread_state = Arc::clone(&state);
        let handle = std::thread::Builder::new()
            .name("reload-watcher".to_string())
            .spawn(move || run(root, watcher, rx, thread_state, signal))
            .map_err(|source| ServerError::Spawn {
                name: "reload-watcher",
                source,
            })?;

        Ok(Self {
            state,
            handle: Some(handle),
        })
    }

    /// Stops the watcher and waits for its thread. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.state.signal_shutdown() {
            info!("shutting down hot reload");
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("file watcher thread panicked");
        }
    }
}

impl Drop for ReloadWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    root: PathBuf,
    watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    state: Arc<HotReloadState>,
    signal: ReloadSender,
) {
    info!(dir = %root.display(), "starting file watcher");

    let mut processor = ChangeProcessor::new(WatchRegistry::new(watcher, Arc::clone(&state)), signal);
    processor.registry_mut().register_recursive(&root);
    info!(watches = state.watch_count(), "file watcher started");

    while !state.is_shutdown() {
        let first = match events.recv_timeout(POLL_TIMEOUT) {
            Ok(res) => res,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("file event source closed");
                break;
            }
        };

        // Everything already queued forms one batch, as a single read would.
        let mut changes = Vec::new();
        collect(first, &mut changes);
        while let Ok(res) = events.try_recv() {
            collect(res, &mut changes);
        }

        processor.process_batch(&changes, now_millis());
    }

    info!("file watcher shutting down");
}

fn collect(res: notify::Result<Event>, changes: &mut Vec<FsChange>) {
    match res {
        Ok(event) => changes.extend(FsChange::from_event(&event)),
        Err(e) => warn!(error = %e, "file watch error"),
    }
}
