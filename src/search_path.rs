//! Module search path published to the Python interpreter.
//!
//! The interpreter's import path is process-wide shared state. depkit keeps
//! it as a single registry, seeded from the host's `PYTHONPATH`, and exports
//! it as `PYTHONPATH` to every interpreter it spawns. All mutation goes
//! through this module: extra directories are appended once, the script
//! staging directory is prepended so staged modules shadow same-named ones.
//!
//! Removing a directory from disk does not retract its entry here.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use crate::error::{DepkitError, Result};

/// Environment variable the interpreter reads extra import roots from.
pub const PYTHONPATH: &str = "PYTHONPATH";

/// Shared, lockable handle to a search path.
pub type SharedSearchPath = Arc<Mutex<ModuleSearchPath>>;

static GLOBAL: LazyLock<SharedSearchPath> =
    LazyLock::new(|| Arc::new(Mutex::new(ModuleSearchPath::from_process_env())));

/// Handle to the process-wide search path.
pub fn global() -> SharedSearchPath {
    Arc::clone(&GLOBAL)
}

/// Lock a shared search path, recovering from a poisoned lock.
pub fn lock(shared: &SharedSearchPath) -> MutexGuard<'_, ModuleSearchPath> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ordered, duplicate-free list of import roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSearchPath {
    entries: Vec<PathBuf>,
}

impl ModuleSearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `PYTHONPATH`-style value, skipping empty segments.
    pub fn from_env_value(value: &OsStr) -> Self {
        let mut path = Self::new();
        for entry in std::env::split_paths(value) {
            if !entry.as_os_str().is_empty() {
                path.append(entry);
            }
        }
        path
    }

    /// Build from this process's `PYTHONPATH`.
    pub fn from_process_env() -> Self {
        std::env::var_os(PYTHONPATH)
            .map(|value| Self::from_env_value(&value))
            .unwrap_or_default()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry == path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `path` unless already present. Returns whether it was added.
    pub fn append(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.entries.push(path);
        true
    }

    /// Move or insert `path` to the front.
    pub fn prepend(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.entries.retain(|entry| *entry != path);
        self.entries.insert(0, path);
    }

    /// Render as a `PYTHONPATH` value.
    ///
    /// Returns `None` when an entry contains the platform path separator
    /// and so cannot be represented.
    pub fn to_env_value(&self) -> Option<OsString> {
        std::env::join_paths(&self.entries).ok()
    }

    /// Export this path as `PYTHONPATH` on a command about to be spawned.
    pub fn apply(&self, cmd: &mut Command) {
        match self.to_env_value() {
            Some(value) => {
                cmd.env(PYTHONPATH, value);
            }
            None => tracing::warn!("Search path contains an unrepresentable entry; not exported"),
        }
    }
}

/// Append each existing directory in `dirs` to `search_path`, once.
///
/// Paths are canonicalized first, so `lib` and `lib/../lib` are one entry.
/// Missing paths and paths that cannot be resolved are logged and skipped.
/// Returns the entries actually added.
pub fn publish_extra_paths(search_path: &SharedSearchPath, dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut added = Vec::new();
    let mut path = lock(search_path);

    for dir in dirs {
        let absolute = match std::fs::canonicalize(dir) {
            Ok(absolute) => absolute,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Path does not exist: {}", dir.display());
                continue;
            }
            Err(e) => {
                tracing::warn!("Failed to add path {}: {}", dir.display(), e);
                continue;
            }
        };
        if path.append(&absolute) {
            tracing::debug!("Added {} to Python path", absolute.display());
            added.push(absolute);
        }
    }

    added
}

/// Put the script staging directory first on `search_path`.
pub fn publish_staging_dir(search_path: &SharedSearchPath, dir: &Path) {
    lock(search_path).prepend(dir);
    tracing::debug!("Prepended {} to Python path", dir.display());
}

/// Fail unless every path in `dirs` exists and is a directory.
pub fn verify_paths(dirs: &[PathBuf]) -> Result<()> {
    for dir in dirs {
        let message = match std::fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => continue,
            Ok(_) => "Path is not a directory".to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => "Path does not exist".to_string(),
            Err(e) => e.to_string(),
        };
        return Err(DepkitError::InvalidPath {
            path: dir.clone(),
            message,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shared() -> SharedSearchPath {
        Arc::new(Mutex::new(ModuleSearchPath::new()))
    }

    #[test]
    fn append_is_duplicate_free() {
        let mut path = ModuleSearchPath::new();
        assert!(path.append("/a"));
        assert!(path.append("/b"));
        assert!(!path.append("/a"));
        assert_eq!(path.entries(), &[PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn prepend_moves_existing_entry_to_front() {
        let mut path = ModuleSearchPath::new();
        path.append("/a");
        path.append("/b");
        path.prepend("/b");
        assert_eq!(path.entries(), &[PathBuf::from("/b"), PathBuf::from("/a")]);
    }

    #[test]
    fn env_value_round_trips() {
        let mut path = ModuleSearchPath::new();
        path.append("/one");
        path.append("/two");
        let value = path.to_env_value().unwrap();
        assert_eq!(ModuleSearchPath::from_env_value(&value), path);
    }

    #[test]
    fn from_env_value_skips_empty_segments() {
        let value = std::env::join_paths(["/x", "", "/y"]).unwrap();
        let path = ModuleSearchPath::from_env_value(&value);
        assert_eq!(path.entries().len(), 2);
    }

    #[test]
    fn publish_appends_existing_dirs_once() {
        let temp = TempDir::new().unwrap();
        let search_path = shared();
        let dir = temp.path().to_path_buf();

        let added = publish_extra_paths(&search_path, &[dir.clone(), dir.clone()]);
        assert_eq!(added.len(), 1);

        let again = publish_extra_paths(&search_path, &[dir]);
        assert!(again.is_empty());
        assert_eq!(lock(&search_path).entries().len(), 1);
    }

    #[test]
    fn publish_skips_missing_dirs_and_continues() {
        let temp = TempDir::new().unwrap();
        let search_path = shared();
        let missing = temp.path().join("missing");
        let present = temp.path().join("present");
        std::fs::create_dir(&present).unwrap();

        let added = publish_extra_paths(&search_path, &[missing, present.clone()]);
        assert_eq!(added, vec![std::fs::canonicalize(&present).unwrap()]);
    }

    #[test]
    fn publish_collapses_parent_components() {
        let temp = TempDir::new().unwrap();
        let search_path = shared();
        let lib = temp.path().join("lib");
        std::fs::create_dir(&lib).unwrap();
        let roundabout = lib.join("..").join("lib");

        let added = publish_extra_paths(&search_path, &[lib, roundabout]);
        assert_eq!(added.len(), 1);
        assert_eq!(lock(&search_path).entries().len(), 1);
    }

    #[test]
    fn publish_resolves_relative_paths() {
        let search_path = shared();
        let added = publish_extra_paths(&search_path, &[PathBuf::from(".")]);
        assert_eq!(added.len(), 1);
        assert!(added[0].is_absolute());
    }

    #[test]
    fn staging_dir_goes_first() {
        let search_path = shared();
        lock(&search_path).append("/extra");
        publish_staging_dir(&search_path, Path::new("/staging"));
        assert_eq!(lock(&search_path).entries()[0], PathBuf::from("/staging"));
    }

    #[test]
    fn verify_paths_rejects_missing_and_files() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.py");
        std::fs::write(&file, "").unwrap();

        assert!(verify_paths(&[temp.path().to_path_buf()]).is_ok());

        let err = verify_paths(&[temp.path().join("gone")]).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let err = verify_paths(&[file]).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
        assert!(err.is_dependency_error());
    }

    #[cfg(unix)]
    #[test]
    fn apply_exports_pythonpath() {
        let mut path = ModuleSearchPath::new();
        path.append("/staged");
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("printf %s \"$PYTHONPATH\"");
        path.apply(&mut cmd);
        let output = cmd.output().unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "/staged");
    }
}
