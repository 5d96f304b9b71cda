use std::path::{Path, PathBuf};

use crate::error::CapacityExceeded;

/// Maximum number of watched directories.
pub const MAX_WATCHES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// A registered directory. Entries are never removed, even after the
/// directory itself is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub id: WatchId,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct WatchTable {
    entries: Vec<WatchEntry>,
    capacity: usize,
}

impl Default for WatchTable {
    fn default() -> Self {
        Self::with_capacity(MAX_WATCHES)
    }
}

impl WatchTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn try_insert(&mut self, path: &Path) -> Result<WatchId, CapacityExceeded> {
        if self.is_full() {
            return Err(CapacityExceeded {
                table: "watch",
                capacity: self.capacity,
            });
        }
        let id = WatchId(self.entries.len() as u64 + 1);
        self.entries.push(WatchEntry {
            id,
            path: path.to_path_buf(),
        });
        Ok(id)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    pub fn path_of(&self, id: WatchId) -> Option<&Path> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.path.as_path())
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
