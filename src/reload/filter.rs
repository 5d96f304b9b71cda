//! Name predicates for the watcher.

/// Directories never watched, in addition to hidden ones.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "build", "dist"];

/// Editor and tool artifacts that must never trigger a reload.
///
/// Covers hidden names, backup markers (`~`, `#`), and names containing
/// `.swp`, `.tmp` or `.bak` anywhere (`index.html.swp`, `a.tmp.1`).
pub fn is_temp_file(name: &str) -> bool {
    name.is_empty()
        || name.starts_with('.')
        || name.contains('~')
        || name.contains('#')
        || name.contains(".swp")
        || name.contains(".tmp")
        || name.contains(".bak")
}

/// Directories excluded from recursive registration.
pub fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}
