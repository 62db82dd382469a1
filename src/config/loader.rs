//! Configuration file discovery and loading.

use crate::config::schema::ManagerConfig;
use crate::error::{DepkitError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Project config file names, in lookup order.
const CONFIG_CANDIDATES: &[&str] = &["depkit.yml", ".depkit/config.yml"];

/// Find the config file for a project root, if any.
pub fn discover_config(project_root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| project_root.join(name))
        .find(|path| path.is_file())
}

/// Load a single config file.
///
/// Relative script and extra paths are resolved against the file's
/// directory (the project root for `.depkit/config.yml`).
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParse` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<ManagerConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DepkitError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            DepkitError::Io(e)
        }
    })?;

    let mut config = parse_config(&content, path)?;
    if let Some(base) = config_base(path) {
        config.resolve_paths(&base);
    }
    Ok(config)
}

/// Parse YAML content into a [`ManagerConfig`].
///
/// `source_path` is used for error reporting only. An empty document
/// yields the defaults.
pub fn parse_config(content: &str, source_path: &Path) -> Result<ManagerConfig> {
    if content.trim().is_empty() {
        return Ok(ManagerConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| DepkitError::ConfigParse {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load config with optional path override.
///
/// An explicit path must exist. Otherwise the project root is searched and
/// the defaults are used when no file is found.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<ManagerConfig> {
    if let Some(path) = config_override {
        return load_config_file(path);
    }
    match discover_config(project_root) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            load_config_file(&path)
        }
        None => Ok(ManagerConfig::default()),
    }
}

fn config_base(path: &Path) -> Option<PathBuf> {
    let dir = path.parent()?;
    let dir = if dir.file_name().is_some_and(|name| name == ".depkit") {
        dir.parent()?
    } else {
        dir
    };
    Some(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discovers_root_file_first() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".depkit")).unwrap();
        fs::write(temp.path().join(".depkit/config.yml"), "prefer_uv: true").unwrap();
        assert_eq!(
            discover_config(temp.path()),
            Some(temp.path().join(".depkit/config.yml"))
        );

        fs::write(temp.path().join("depkit.yml"), "").unwrap();
        assert_eq!(discover_config(temp.path()), Some(temp.path().join("depkit.yml")));
    }

    #[test]
    fn missing_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_config(temp.path(), None).unwrap(), ManagerConfig::default());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.yml");
        let err = load_config(temp.path(), Some(&path)).unwrap_err();
        assert!(matches!(err, DepkitError::ConfigNotFound { .. }));
    }

    #[test]
    fn invalid_yaml_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("depkit.yml");
        fs::write(&path, "requirements: [unclosed").unwrap();
        let err = load_config_file(&path).unwrap_err();
        match err {
            DepkitError::ConfigParse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn paths_resolve_against_project_root() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".depkit")).unwrap();
        fs::write(
            temp.path().join(".depkit/config.yml"),
            "scripts: [tools/job.py]\nextra_paths: [lib]\n",
        )
        .unwrap();

        let config = load_config(temp.path(), None).unwrap();
        assert_eq!(config.scripts, vec![temp.path().join("tools/job.py")]);
        assert_eq!(config.extra_paths, vec![temp.path().join("lib")]);
    }
}
