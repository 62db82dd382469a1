//! Python environment inspection.
//!
//! - [`detection`] - Isolated-environment detection and [`EnvironmentInfo`]
//! - [`interpreter`] - The [`PythonRuntime`] seam and [`SystemPython`]
//! - [`probe`] - Executable lookup and installer selection

pub mod detection;
pub mod interpreter;
pub mod probe;

use std::sync::Arc;

pub use detection::{detect_isolation, in_virtualenv, EnvironmentInfo, Isolation};
pub use interpreter::{InterpreterInfo, PythonRuntime, SystemPython};
pub use probe::{detect_uv, parse_system_path, resolve_tool_path, select_installer};

/// Environment variable lookup, injectable for tests.
pub type EnvLookup = Arc<dyn Fn(&str) -> Result<String, std::env::VarError> + Send + Sync>;

/// Lookup backed by this process's environment.
pub fn process_env() -> EnvLookup {
    Arc::new(|key: &str| std::env::var(key))
}
