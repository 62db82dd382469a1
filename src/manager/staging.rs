//! Script staging.
//!
//! Each declared script is copied into a private temporary directory under
//! a module name derived from its file stem, so it can be imported by that
//! name. The [`ModuleMap`] refuses duplicate names.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::environment::PythonRuntime;
use crate::error::{DepkitError, Result};
use crate::metadata::{check_python_version, parse_script_metadata, PythonVersion};
use crate::requirements::{RequirementSet, RequirementSource};
use crate::search_path::{publish_staging_dir, SharedSearchPath};

/// Prefix of the staging directory name.
const STAGING_PREFIX: &str = "depkit_scripts_";

/// Extension used when a script has none.
const DEFAULT_EXTENSION: &str = "py";

/// A script copied into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedModule {
    /// The script as declared.
    pub source: PathBuf,
    /// Its copy inside the staging directory.
    pub staged: PathBuf,
}

/// Outcome of staging a single script.
enum Staged {
    /// Copied; carries the declared dependencies.
    Module(Vec<String>),
    /// The script file does not exist.
    Missing,
}

/// Module name to staged script. Names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMap {
    modules: BTreeMap<String, StagedModule>,
}

impl ModuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with a collision error if `name` is taken.
    pub fn check_available(&self, name: &str, source: &Path) -> Result<()> {
        match self.modules.get(name) {
            Some(existing) => Err(DepkitError::ModuleCollision {
                name: name.to_string(),
                path: source.to_path_buf(),
                existing: existing.source.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Add a module.
    ///
    /// # Errors
    ///
    /// Returns [`DepkitError::ModuleCollision`] if `name` is already mapped.
    pub fn insert(&mut self, name: impl Into<String>, module: StagedModule) -> Result<()> {
        let name = name.into();
        self.check_available(&name, &module.source)?;
        self.modules.insert(name, module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&StagedModule> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Module names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StagedModule)> {
        self.modules.iter().map(|(name, module)| (name.as_str(), module))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn clear(&mut self) {
        self.modules.clear();
    }
}

/// Owner of the staging directory and its [`ModuleMap`].
#[derive(Debug)]
pub struct ScriptStaging {
    dir: Option<TempDir>,
    modules: ModuleMap,
}

impl ScriptStaging {
    /// Create the (empty) staging directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?;
        tracing::debug!("Created staging directory {}", dir.path().display());
        Ok(Self {
            dir: Some(dir),
            modules: ModuleMap::new(),
        })
    }

    /// The staging directory, until [`remove`](Self::remove) is called.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    pub fn modules(&self) -> &ModuleMap {
        &self.modules
    }

    /// Stage every script, folding their dependencies into `requirements`.
    ///
    /// Missing scripts and scripts that fail to read, parse or validate are
    /// logged and skipped. A module name collision or an unmet
    /// `requires-python` aborts staging. `running` is the interpreter
    /// version, if known; constrained scripts are skipped without it.
    ///
    /// When anything was staged the directory is put first on
    /// `search_path`.
    pub fn stage_all(
        &mut self,
        scripts: &[PathBuf],
        runtime: &dyn PythonRuntime,
        running: Option<&PythonVersion>,
        requirements: &mut RequirementSet,
        search_path: &SharedSearchPath,
    ) -> Result<()> {
        let dir = match &self.dir {
            Some(dir) => dir.path().to_path_buf(),
            None => {
                return Err(DepkitError::InvalidState {
                    operation: "stage scripts".to_string(),
                    state: "staging directory removed".to_string(),
                })
            }
        };

        for script in scripts {
            tracing::debug!("Processing script: {}", script.display());
            match self.stage_one(script, &dir, runtime, running) {
                Ok(Staged::Module(dependencies)) => {
                    if !dependencies.is_empty() {
                        tracing::debug!("Found dependencies: {:?}", dependencies);
                    }
                    requirements.extend(dependencies, RequirementSource::Script(script.clone()));
                }
                Ok(Staged::Missing) => {
                    tracing::warn!("Script not found: {}", script.display());
                }
                Err(e @ (DepkitError::ModuleCollision { .. } | DepkitError::PythonVersion { .. })) => {
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Failed to process script {}: {}", script.display(), e);
                }
            }
        }

        if !self.modules.is_empty() {
            publish_staging_dir(search_path, &dir);
        }
        Ok(())
    }

    /// Stage one script and return its declared dependencies.
    fn stage_one(
        &mut self,
        script: &Path,
        dir: &Path,
        runtime: &dyn PythonRuntime,
        running: Option<&PythonVersion>,
    ) -> Result<Staged> {
        let bytes = match fs::read(script) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Staged::Missing),
            Err(e) => return Err(e.into()),
        };
        let content = String::from_utf8_lossy(&bytes);

        let metadata = parse_script_metadata(&content)?;
        runtime.check_syntax(&content, script)?;

        if let Some(constraint) = &metadata.requires_python {
            tracing::debug!("Found Python constraint: {}", constraint);
            let running = running.ok_or_else(|| {
                DepkitError::script(format!(
                    "Cannot check requires-python {} for {}: interpreter version unknown",
                    constraint,
                    script.display()
                ))
            })?;
            check_python_version(constraint, script, running)?;
        }

        let name = script
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                DepkitError::script(format!("Cannot derive a module name from {}", script.display()))
            })?;
        self.modules.check_available(name, script)?;

        let extension = script
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(DEFAULT_EXTENSION);
        let staged = dir.join(format!("{}.{}", name, extension));
        fs::write(&staged, &bytes)?;

        self.modules.insert(
            name,
            StagedModule {
                source: script.to_path_buf(),
                staged,
            },
        )?;
        Ok(Staged::Module(metadata.dependencies))
    }

    /// Delete the staging directory and forget staged modules.
    ///
    /// Safe to call repeatedly. Removal failures are logged.
    pub fn remove(&mut self) {
        self.modules.clear();
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => tracing::debug!("Removed staging directory {}", path.display()),
                Err(e) => tracing::warn!("Failed to remove staging directory {}: {}", path.display(), e),
            }
        }
    }
}
