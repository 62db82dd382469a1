//! Configuration schema for `depkit.yml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for one [`DependencyManager`](crate::manager::DependencyManager).
///
/// Every field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Requirement specifiers installed regardless of scripts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,

    /// Scripts to stage as importable modules.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<PathBuf>,

    /// Directories appended to the module search path and scanned for
    /// script dependencies.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_paths: Vec<PathBuf>,

    /// Install with uv when it is available.
    #[serde(skip_serializing_if = "is_false")]
    pub prefer_uv: bool,

    /// Package index passed to the installer as `--index-url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pip_index_url: Option<String>,

    /// Allow installing outside an isolated environment.
    #[serde(skip_serializing_if = "is_false")]
    pub force_install: bool,

    /// Interpreter to use instead of the discovered one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<PathBuf>,
}

impl ManagerConfig {
    /// Config with explicit requirements and defaults otherwise.
    pub fn with_requirements<I, S>(requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requirements: requirements.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Resolve relative script and extra paths against `base`.
    pub fn resolve_paths(&mut self, base: &std::path::Path) {
        for path in self.scripts.iter_mut().chain(self.extra_paths.iter_mut()) {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}
