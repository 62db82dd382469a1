//! Executable lookup and installer selection.
//!
//! Tools are resolved by walking the executable search path directly rather
//! than shelling out to `which`, whose behavior varies across systems.
//!
//! # Example
//!
//! ```no_run
//! use depkit::environment::probe::{parse_system_path, select_installer};
//! use std::path::Path;
//!
//! let installer = select_installer(true, false, Path::new("python3"), &parse_system_path());
//! println!("installing with: {}", installer);
//! ```

use std::path::{Path, PathBuf};

use crate::shell::ProgramLine;

/// Name of the fast installer binary.
pub const FAST_INSTALLER: &str = "uv";

/// Set by uv inside environments it manages.
const UV_ENV_VAR: &str = "UV_VIRTUAL_ENV";

/// Check whether a file has executable permission bits set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// On Windows, executability is determined by file extension, not permission bits.
#[cfg(not(unix))]
pub fn is_executable(_path: &Path) -> bool {
    true
}

/// Resolve a tool's binary path by iterating over PATH entries.
///
/// Returns the first match that exists and is executable. On Windows the
/// `.exe` suffix is tried as well.
pub fn resolve_tool_path(tool: &str, path_entries: &[PathBuf]) -> Option<PathBuf> {
    for dir in path_entries {
        let candidate = dir.join(tool);
        if candidate.is_file() && is_executable(&candidate) {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", tool));
            if exe.is_file() {
                return Some(exe);
            }
        }
    }
    None
}

/// Parse the system PATH environment variable into a list of directories.
pub fn parse_system_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default()
}

/// Whether the fast installer is in play: either we run inside an
/// environment it manages, or it can be found on `path_entries`.
pub fn detect_uv<F>(env_fn: &F, path_entries: &[PathBuf]) -> bool
where
    F: Fn(&str) -> Result<String, std::env::VarError> + ?Sized,
{
    env_fn(UV_ENV_VAR).is_ok() || resolve_tool_path(FAST_INSTALLER, path_entries).is_some()
}

/// Pick the base installer command.
///
/// Returns `uv pip` when uv is preferred or detected and resolvable on
/// `path_entries`, otherwise `<python> -m pip`. Logs a warning when uv was
/// explicitly preferred but could not be found.
pub fn select_installer(
    prefer_uv: bool,
    is_uv: bool,
    python: &Path,
    path_entries: &[PathBuf],
) -> ProgramLine {
    if prefer_uv || is_uv {
        if let Some(uv) = resolve_tool_path(FAST_INSTALLER, path_entries) {
            return ProgramLine::new(uv).arg("pip");
        }
        if prefer_uv {
            tracing::warn!("uv requested but not found, falling back to pip");
        }
    }

    ProgramLine::new(python).args(["-m", "pip"])
}
