//! Isolated-environment detection and the environment snapshot.
//!
//! Isolation is decided from environment variables and the interpreter's
//! on-disk layout only; nothing here spawns a process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::interpreter::PythonRuntime;
use super::probe::detect_uv;

/// Variables that indicate an isolated environment, checked in order.
const ISOLATION_VARS: &[&str] = &["VIRTUAL_ENV", "CONDA_PREFIX", "UV_VIRTUAL_ENV"];

/// Variables reported as ambient indicators in [`EnvironmentInfo`].
const INDICATOR_VARS: &[&str] = &[
    "VIRTUAL_ENV",
    "CONDA_PREFIX",
    "CONDA_DEFAULT_ENV",
    "UV_VIRTUAL_ENV",
    "PYENV_VERSION",
];

/// Marker file written at the root of every PEP 405 virtual environment.
const PYVENV_CFG: &str = "pyvenv.cfg";

/// How isolation was established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Isolation {
    /// An environment variable names the active environment.
    EnvVar { name: String, value: String },
    /// The interpreter lives inside a directory holding `pyvenv.cfg`.
    VenvLayout { root: PathBuf },
}

/// Detect whether `python` runs inside an isolated environment.
pub fn detect_isolation<F>(env_fn: &F, python: &Path) -> Option<Isolation>
where
    F: Fn(&str) -> Result<String, std::env::VarError> + ?Sized,
{
    for &name in ISOLATION_VARS {
        if let Ok(value) = env_fn(name) {
            if !value.is_empty() {
                return Some(Isolation::EnvVar {
                    name: name.to_string(),
                    value,
                });
            }
        }
    }

    // <root>/bin/python or <root>/Scripts/python.exe
    let root = python.parent()?.parent()?;
    if root.join(PYVENV_CFG).is_file() {
        return Some(Isolation::VenvLayout {
            root: root.to_path_buf(),
        });
    }
    None
}

/// Whether `python` runs inside an isolated environment.
pub fn in_virtualenv<F>(env_fn: &F, python: &Path) -> bool
where
    F: Fn(&str) -> Result<String, std::env::VarError> + ?Sized,
{
    detect_isolation(env_fn, python).is_some()
}

/// Collect the ambient environment indicators that are set.
pub fn indicators<F>(env_fn: &F) -> BTreeMap<String, String>
where
    F: Fn(&str) -> Result<String, std::env::VarError> + ?Sized,
{
    INDICATOR_VARS
        .iter()
        .filter_map(|&name| env_fn(name).ok().map(|value| (name.to_string(), value)))
        .collect()
}

/// Read-only snapshot of the Python environment, recomputed per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentInfo {
    /// Interpreter version, when the interpreter could be queried.
    pub python_version: Option<String>,
    /// Interpreter executable.
    pub python_path: PathBuf,
    pub is_isolated: bool,
    /// Whether the fast installer was detected.
    pub is_uv: bool,
    /// Configured package index URL.
    pub index_url: Option<String>,
    /// Ambient environment variables such as `VIRTUAL_ENV`.
    pub indicators: BTreeMap<String, String>,
}

impl EnvironmentInfo {
    /// Take a fresh snapshot.
    pub fn collect<F>(
        runtime: &dyn PythonRuntime,
        env_fn: &F,
        path_entries: &[PathBuf],
        index_url: Option<&str>,
    ) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError> + ?Sized,
    {
        let python = runtime.executable();
        Self {
            python_version: runtime.info().ok().map(|info| info.version),
            python_path: python.to_path_buf(),
            is_isolated: in_virtualenv(env_fn, python),
            is_uv: detect_uv(env_fn, path_entries),
            index_url: index_url.map(String::from),
            indicators: indicators(env_fn),
        }
    }
}
