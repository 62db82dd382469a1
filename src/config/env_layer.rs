//! Environment variable overrides.
//!
//! Applied on top of the config file and beneath command-line flags.
//!
//! | Variable | Field |
//! |---|---|
//! | `DEPKIT_PREFER_UV` | `prefer_uv` |
//! | `DEPKIT_FORCE_INSTALL` | `force_install` |
//! | `DEPKIT_INDEX_URL`, then `PIP_INDEX_URL` | `pip_index_url` |
//! | `DEPKIT_PYTHON` | `python` |

use std::path::PathBuf;

use crate::config::schema::ManagerConfig;

pub const PREFER_UV_VAR: &str = "DEPKIT_PREFER_UV";
pub const FORCE_INSTALL_VAR: &str = "DEPKIT_FORCE_INSTALL";
pub const INDEX_URL_VAR: &str = "DEPKIT_INDEX_URL";
pub const PIP_INDEX_URL_VAR: &str = "PIP_INDEX_URL";
pub const PYTHON_VAR: &str = "DEPKIT_PYTHON";

/// `1`, `true`, `yes` or `on`, ignoring case.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Apply environment overrides to `config`.
///
/// Flags are only ever switched on. Unset or empty variables leave the
/// config untouched.
pub fn apply_env_overrides<F>(config: &mut ManagerConfig, env_fn: &F)
where
    F: Fn(&str) -> Result<String, std::env::VarError> + ?Sized,
{
    let set = |key: &str| env_fn(key).ok().filter(|v| !v.trim().is_empty());

    if set(PREFER_UV_VAR).is_some_and(|v| is_truthy(&v)) {
        config.prefer_uv = true;
    }
    if set(FORCE_INSTALL_VAR).is_some_and(|v| is_truthy(&v)) {
        config.force_install = true;
    }
    if let Some(url) = set(INDEX_URL_VAR).or_else(|| set(PIP_INDEX_URL_VAR)) {
        config.pip_index_url = Some(url);
    }
    if let Some(python) = set(PYTHON_VAR) {
        config.python = Some(PathBuf::from(python));
    }
}
