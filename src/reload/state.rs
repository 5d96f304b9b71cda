use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, MutexGuard};

use crate::reload::table::WatchTable;

/// Non-standard response header telling the page script to reload.
pub const RELOAD_HEADER: &str = "X-Reload";

/// How long after an accepted change responses carry the reload hint.
pub const HINT_WINDOW_MS: u64 = 2000;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// State shared between the watcher thread and the event loop.
///
/// Exists only while dev mode is active. The watcher is the single writer of
/// the change timestamp; the loop only reads it.
#[derive(Debug, Default)]
pub struct HotReloadState {
    table: Mutex<WatchTable>,
    shutdown: AtomicBool,
    /// 0 means no change accepted yet
    last_change_ms: AtomicU64,
}

impl HotReloadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: WatchTable) -> Self {
        Self {
            table: Mutex::new(table),
            ..Self::default()
        }
    }

    pub fn table(&self) -> MutexGuard<'_, WatchTable> {
        self.table.lock()
    }

    pub fn watch_count(&self) -> usize {
        self.table.lock().len()
    }

    /// Records an accepted change. Never moves the timestamp backwards.
    pub fn mark_changed(&self, now_ms: u64) {
        self.last_change_ms.fetch_max(now_ms, Ordering::AcqRel);
    }

    pub fn last_change_ms(&self) -> Option<u64> {
        match self.last_change_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(ms),
        }
    }

    /// Whether a response produced at `now_ms` carries the reload hint.
    pub fn reload_hint_at(&self, now_ms: u64) -> bool {
        self.last_change_ms()
            .is_some_and(|last| now_ms.saturating_sub(last) <= HINT_WINDOW_MS)
    }

    /// Requests watcher shutdown. Returns `true` for the first caller only.
    pub fn signal_shutdown(&self) -> bool {
        !self.shutdown.swap(true, Ordering::AcqRel)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hint_before_any_change() {
        let state = HotReloadState::new();
        assert!(!state.reload_hint_at(now_millis()));
    }

    #[test]
    fn hint_window_is_inclusive() {
        let state = HotReloadState::new();
        state.mark_changed(50_000);
        assert!(state.reload_hint_at(50_000));
        assert!(state.reload_hint_at(52_000));
        assert!(!state.reload_hint_at(52_001));
    }

    #[test]
    fn timestamp_is_monotonic() {
        let state = HotReloadState::new();
        state.mark_changed(9_000);
        state.mark_changed(4_000);
        assert_eq!(state.last_change_ms(), Some(9_000));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let state = HotReloadState::new();
        assert!(state.signal_shutdown());
        assert!(!state.signal_shutdown());
        assert!(state.is_shutdown());
    }
}
