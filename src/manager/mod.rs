//! Dependency manager.
//!
//! [`DependencyManager`] ties the pieces together: it stages scripts,
//! aggregates their requirements with explicit and discovered ones,
//! installs what is missing, and publishes extra directories on the module
//! search path. A failed setup always removes the staging directory before
//! the error is returned.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized -> InProgress -> Ready -> TornDown
//!                             \-> Failed
//! ```
//!
//! `Failed` and `TornDown` are terminal; build a new manager to retry.
//!
//! # Example
//!
//! ```no_run
//! use depkit::config::ManagerConfig;
//! use depkit::manager::DependencyManager;
//!
//! let config = ManagerConfig::with_requirements(["rich"]);
//! let mut manager = DependencyManager::new(config)?;
//! manager.scoped(|m| {
//!     println!("installed: {:?}", m.installed_requirements());
//!     Ok(())
//! })?;
//! # Ok::<(), depkit::DepkitError>(())
//! ```

pub mod staging;

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::config::ManagerConfig;
use crate::environment::{
    detect_uv, in_virtualenv, parse_system_path, process_env, select_installer, EnvLookup,
    EnvironmentInfo, PythonRuntime, SystemPython,
};
use crate::error::{DepkitError, Result};
use crate::requirements::{
    missing_requirements, scan_directory, Installer, RequirementSet, RequirementSource,
    SitePackages,
};
use crate::search_path::{self, lock, publish_extra_paths, verify_paths, SharedSearchPath};

pub use staging::{ModuleMap, ScriptStaging, StagedModule};

/// Where a manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    Uninitialized,
    InProgress,
    Ready,
    Failed,
    TornDown,
}

impl fmt::Display for SetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SetupState::Uninitialized => "uninitialized",
            SetupState::InProgress => "setting up",
            SetupState::Ready => "ready",
            SetupState::Failed => "failed",
            SetupState::TornDown => "torn down",
        };
        f.write_str(s)
    }
}

/// Builder for [`DependencyManager`] with injectable collaborators.
pub struct ManagerBuilder {
    config: ManagerConfig,
    runtime: Option<Arc<dyn PythonRuntime>>,
    search_path: Option<SharedSearchPath>,
    env: Option<EnvLookup>,
    path_entries: Option<Vec<PathBuf>>,
    installer: Option<Installer>,
}

impl ManagerBuilder {
    /// Interpreter to use instead of the discovered one.
    pub fn runtime(mut self, runtime: Arc<dyn PythonRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Search path to publish to instead of the process-wide one.
    pub fn search_path(mut self, search_path: SharedSearchPath) -> Self {
        self.search_path = Some(search_path);
        self
    }

    /// Environment variable lookup (for testing).
    pub fn env_lookup(mut self, env: EnvLookup) -> Self {
        self.env = Some(env);
        self
    }

    /// Directories searched for executables instead of `PATH`.
    pub fn path_entries(mut self, entries: Vec<PathBuf>) -> Self {
        self.path_entries = Some(entries);
        self
    }

    /// Installer to use instead of the selected pip or uv command.
    pub fn installer(mut self, installer: Installer) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Validate isolation and create the staging directory.
    ///
    /// # Errors
    ///
    /// Returns [`DepkitError::NotIsolated`] outside an isolated environment
    /// unless `force_install` is set. Nothing is created in that case.
    pub fn build(self) -> Result<DependencyManager> {
        let env = self.env.unwrap_or_else(process_env);
        let path_entries = self.path_entries.unwrap_or_else(parse_system_path);
        let runtime: Arc<dyn PythonRuntime> = match self.runtime {
            Some(runtime) => runtime,
            None => Arc::new(SystemPython::discover(
                self.config.python.as_deref(),
                &*env,
                &path_entries,
            )),
        };

        if !self.config.force_install && !in_virtualenv(&*env, runtime.executable()) {
            return Err(DepkitError::NotIsolated);
        }

        let is_uv = detect_uv(&*env, &path_entries);
        let staging = ScriptStaging::new()?;

        Ok(DependencyManager {
            config: self.config,
            runtime,
            search_path: self.search_path.unwrap_or_else(search_path::global),
            env,
            path_entries,
            installer: self.installer,
            is_uv,
            staging,
            requirements: RequirementSet::new(),
            installed: BTreeSet::new(),
            state: SetupState::Uninitialized,
        })
    }
}

/// Installs and exposes the dependencies of a set of scripts.
pub struct DependencyManager {
    config: ManagerConfig,
    runtime: Arc<dyn PythonRuntime>,
    search_path: SharedSearchPath,
    env: EnvLookup,
    path_entries: Vec<PathBuf>,
    installer: Option<Installer>,
    is_uv: bool,
    staging: ScriptStaging,
    requirements: RequirementSet,
    installed: BTreeSet<String>,
    state: SetupState,
}

impl DependencyManager {
    /// Manager using the discovered interpreter and the process search path.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: ManagerConfig) -> ManagerBuilder {
        ManagerBuilder {
            config,
            runtime: None,
            search_path: None,
            env: None,
            path_entries: None,
            installer: None,
        }
    }

    /// Stage scripts, install missing requirements and publish extra paths.
    ///
    /// On failure the staging directory is removed, the manager moves to
    /// [`SetupState::Failed`] and the error is returned as a dependency
    /// error.
    pub fn setup(&mut self) -> Result<()> {
        if self.state != SetupState::Uninitialized {
            return Err(DepkitError::InvalidState {
                operation: "set up".to_string(),
                state: self.state.to_string(),
            });
        }

        self.state = SetupState::InProgress;
        match self.run_setup() {
            Ok(()) => {
                self.state = SetupState::Ready;
                Ok(())
            }
            Err(e) => {
                self.staging.remove();
                self.state = SetupState::Failed;
                Err(e.into_dependency_error())
            }
        }
    }

    fn run_setup(&mut self) -> Result<()> {
        let info = match self.runtime.info() {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!(
                    "Could not query interpreter {}: {}",
                    self.runtime.executable().display(),
                    e
                );
                None
            }
        };
        let running = info.as_ref().and_then(|info| info.python_version().ok());

        let mut requirements = RequirementSet::new();
        requirements.extend(self.config.requirements.iter().cloned(), RequirementSource::Explicit);

        self.staging.stage_all(
            &self.config.scripts,
            self.runtime.as_ref(),
            running.as_ref(),
            &mut requirements,
            &self.search_path,
        )?;

        for path in &self.config.extra_paths {
            if !path.is_dir() {
                continue;
            }
            let discovered = scan_directory(path);
            if !discovered.is_empty() {
                tracing::debug!(
                    "Found dependencies in {}: {:?}",
                    path.display(),
                    discovered.sorted()
                );
                requirements.merge(discovered);
            }
        }

        let sorted = requirements.sorted();
        self.installed.extend(sorted.iter().cloned());
        self.requirements = requirements;

        let site = info
            .map(|info| SitePackages::new(info.distribution_roots()))
            .unwrap_or_default();
        let missing = missing_requirements(sorted.iter().map(String::as_str), &site);
        if !missing.is_empty() {
            tracing::info!("Installing missing requirements: {}", missing.join(", "));
            self.installer().install(&missing)?;
            tracing::info!("Successfully installed: {}", missing.join(", "));
        }

        publish_extra_paths(&self.search_path, &self.config.extra_paths);

        if !self.config.extra_paths.is_empty() {
            tracing::debug!("Verifying paths: {:?}", self.config.extra_paths);
            verify_paths(&self.config.extra_paths)?;
        }
        Ok(())
    }

    /// [`setup`](Self::setup) for async callers.
    ///
    /// Runs the same blocking sequence; it does not yield while the
    /// installer runs.
    pub async fn setup_async(&mut self) -> Result<()> {
        self.setup()
    }

    /// Remove the staging directory. Safe to call at any time.
    pub fn teardown(&mut self) {
        self.staging.remove();
        if self.state != SetupState::Failed {
            self.state = SetupState::TornDown;
        }
    }

    /// Alias for [`setup`](Self::setup).
    pub fn install(&mut self) -> Result<()> {
        self.setup()
    }

    /// Alias for [`teardown`](Self::teardown).
    pub fn uninstall(&mut self) {
        self.teardown()
    }

    /// Set up and return a guard that tears down when dropped.
    pub fn enter(&mut self) -> Result<ManagerGuard<'_>> {
        self.setup()?;
        Ok(ManagerGuard { manager: self })
    }

    /// Run `f` between setup and teardown. Teardown runs on every exit path.
    pub fn scoped<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut DependencyManager) -> Result<T>,
    {
        let mut guard = self.enter()?;
        f(&mut *guard)
    }

    /// Fail unless the leading module of `import_path` was staged.
    pub fn verify_import_path(&self, import_path: &str) -> Result<()> {
        let module = leading_module(import_path);
        if self.staging.modules().contains(module) {
            return Ok(());
        }
        let available: Vec<&str> = self.staging.modules().names().collect();
        Err(DepkitError::ImportPath {
            import_path: import_path.to_string(),
            message: format!(
                "references unknown module. Available modules: {}",
                available.join(", ")
            ),
        })
    }

    /// Fail unless the leading module of `import_path` imports with the
    /// published search path.
    pub fn ensure_importable(&self, import_path: &str) -> Result<()> {
        let module = leading_module(import_path);
        let snapshot = lock(&self.search_path).clone();
        match self.runtime.can_import(module, &snapshot) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => tracing::debug!("Import check for {} failed: {}", module, e),
        }

        let installed: Vec<String> = self
            .runtime
            .info()
            .and_then(|info| SitePackages::new(info.distribution_roots()).distributions())
            .map(|names| names.into_iter().collect())
            .unwrap_or_default();
        Err(DepkitError::ImportPath {
            import_path: import_path.to_string(),
            message: format!(
                "cannot be imported: module '{}' not found. Make sure it's included in \
                 requirements or the module path is in extra_paths. Currently installed \
                 packages: {}",
                module,
                installed.join(", ")
            ),
        })
    }

    /// Every requirement tracked by setup, sorted.
    pub fn installed_requirements(&self) -> Vec<String> {
        self.installed.iter().cloned().collect()
    }

    /// Aggregated requirements with provenance.
    pub fn requirements(&self) -> &RequirementSet {
        &self.requirements
    }

    pub fn module_map(&self) -> &ModuleMap {
        self.staging.modules()
    }

    /// Snapshot of the module search path.
    pub fn python_paths(&self) -> Vec<PathBuf> {
        lock(&self.search_path).entries().to_vec()
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub fn staging_dir(&self) -> Option<&Path> {
        self.staging.path()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn runtime(&self) -> &dyn PythonRuntime {
        self.runtime.as_ref()
    }

    /// Current environment snapshot. Queries the interpreter each call.
    pub fn environment_info(&self) -> EnvironmentInfo {
        EnvironmentInfo::collect(
            self.runtime.as_ref(),
            &*self.env,
            &self.path_entries,
            self.config.pip_index_url.as_deref(),
        )
    }

    /// Command running `script` with the interpreter and search path.
    pub fn command(&self, script: &Path) -> Command {
        let mut cmd = Command::new(self.runtime.executable());
        cmd.arg(script);
        lock(&self.search_path).apply(&mut cmd);
        cmd
    }

    fn installer(&self) -> Installer {
        match &self.installer {
            Some(installer) => installer.clone(),
            None => Installer::new(select_installer(
                self.config.prefer_uv,
                self.is_uv,
                self.runtime.executable(),
                &self.path_entries,
            ))
            .with_index_url(self.config.pip_index_url.clone()),
        }
    }
}

impl fmt::Display for DependencyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DependencyManager(prefer_uv={}, requirements={:?}, extra_paths={:?})",
            self.config.prefer_uv, self.config.requirements, self.config.extra_paths
        )
    }
}

impl fmt::Debug for DependencyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyManager")
            .field("config", &self.config)
            .field("python", &self.runtime.executable())
            .field("is_uv", &self.is_uv)
            .field("staging", &self.staging)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Tears the manager down when dropped.
pub struct ManagerGuard<'a> {
    manager: &'a mut DependencyManager,
}

impl Deref for ManagerGuard<'_> {
    type Target = DependencyManager;

    fn deref(&self) -> &DependencyManager {
        self.manager
    }
}

impl DerefMut for ManagerGuard<'_> {
    fn deref_mut(&mut self) -> &mut DependencyManager {
        self.manager
    }
}

impl Drop for ManagerGuard<'_> {
    fn drop(&mut self) {
        self.manager.teardown();
    }
}

fn leading_module(import_path: &str) -> &str {
    import_path.split('.').next().unwrap_or(import_path)
}
