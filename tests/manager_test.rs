//! Dependency manager lifecycle tests.
//!
//! The interpreter is faked and the installer is a shell script that
//! records its arguments, so nothing is installed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use depkit::config::ManagerConfig;
use depkit::environment::{EnvLookup, InterpreterInfo, PythonRuntime};
use depkit::requirements::{Installer, RequirementSource};
use depkit::search_path::{ModuleSearchPath, SharedSearchPath};
use depkit::shell::ProgramLine;
use depkit::{DependencyManager, DepkitError, SetupState};
use tempfile::TempDir;

struct FakePython {
    site: PathBuf,
}

impl PythonRuntime for FakePython {
    fn executable(&self) -> &Path {
        Path::new("/venv/bin/python")
    }

    fn info(&self) -> depkit::Result<InterpreterInfo> {
        Ok(InterpreterInfo {
            version: "3.11.4".into(),
            full_version: "3.11.4 (fake)".into(),
            executable: PathBuf::from("/venv/bin/python"),
            prefix: PathBuf::from("/venv"),
            base_prefix: PathBuf::from("/usr"),
            site_packages: vec![self.site.clone()],
            sys_path: Vec::new(),
        })
    }

    fn check_syntax(&self, source: &str, origin: &Path) -> depkit::Result<()> {
        if source.contains("def (") {
            return Err(DepkitError::script(format!(
                "Invalid Python script {}: invalid syntax",
                origin.display()
            )));
        }
        Ok(())
    }

    fn can_import(&self, _module: &str, _search_path: &ModuleSearchPath) -> depkit::Result<bool> {
        Ok(false)
    }
}

struct Fixture {
    temp: TempDir,
    search_path: SharedSearchPath,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("site-packages")).unwrap();
        Self {
            temp,
            search_path: Arc::new(Mutex::new(ModuleSearchPath::new())),
        }
    }

    fn path(&self) -> &Path {
        self.temp.path()
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn isolated_env() -> EnvLookup {
        Arc::new(|key: &str| match key {
            "VIRTUAL_ENV" => Ok("/venv".to_string()),
            _ => Err(std::env::VarError::NotPresent),
        })
    }

    fn manager(&self, config: ManagerConfig, installer: Installer) -> DependencyManager {
        DependencyManager::builder(config)
            .runtime(Arc::new(FakePython {
                site: self.path().join("site-packages"),
            }))
            .search_path(self.search_path.clone())
            .env_lookup(Self::isolated_env())
            .path_entries(Vec::new())
            .installer(installer)
            .build()
            .unwrap()
    }

    #[cfg(unix)]
    fn recording_installer(&self) -> (Installer, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let log = self.path().join("installer.log");
        let script = self.write(
            "bin/fake-pip",
            &format!(
                "#!/bin/sh\nfor arg in \"$@\"; do echo \"$arg\" >> '{}'; done\n",
                log.display()
            ),
        );
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        (Installer::new(ProgramLine::new(script)), log)
    }
}

const RICH_SCRIPT: &str = "# /// script\n# dependencies = [\"rich\"]\n# ///\nimport rich\n";

#[cfg(unix)]
#[test]
fn setup_installs_explicit_and_script_requirements() {
    let fx = Fixture::new();
    let script = fx.write("tools/report.py", RICH_SCRIPT);
    let (installer, log) = fx.recording_installer();
    let config = ManagerConfig {
        requirements: vec!["requests".into()],
        scripts: vec![script.clone()],
        ..Default::default()
    };
    let mut manager = fx.manager(config, installer);

    manager.setup().unwrap();

    assert_eq!(manager.state(), SetupState::Ready);
    assert_eq!(fs::read_to_string(&log).unwrap(), "install\nrequests\nrich\n");
    assert_eq!(manager.installed_requirements(), vec!["requests", "rich"]);

    let sources: Vec<_> = manager.requirements().sources("rich").unwrap().iter().collect();
    assert_eq!(sources, vec![&RequirementSource::Script(script.clone())]);

    let staged = manager.module_map().get("report").unwrap();
    assert_eq!(staged.source, script);
    assert!(staged.staged.exists());

    let staging = manager.staging_dir().unwrap().to_path_buf();
    assert_eq!(manager.python_paths().first(), Some(&staging));

    manager.teardown();
    assert!(!staging.exists());
    assert!(manager.module_map().is_empty());
}

#[cfg(unix)]
#[test]
fn one_package_reaches_the_installer_once() {
    let fx = Fixture::new();
    let script = fx.write(
        "pinned.py",
        "# /// script\n# dependencies = [\"rich>=13\", \"Rich\"]\n# ///\n",
    );
    let (installer, log) = fx.recording_installer();
    let config = ManagerConfig {
        requirements: vec!["rich".into()],
        scripts: vec![script.clone()],
        ..Default::default()
    };
    let mut manager = fx.manager(config, installer);

    manager.setup().unwrap();

    assert_eq!(fs::read_to_string(&log).unwrap(), "install\nrich\n");
    assert_eq!(manager.installed_requirements(), vec!["rich"]);
    let sources = manager.requirements().sources("rich").unwrap();
    assert!(sources.contains(&RequirementSource::Explicit));
    assert!(sources.contains(&RequirementSource::Script(script)));
}

#[cfg(unix)]
#[test]
fn installer_failure_removes_staging_dir() {
    use std::os::unix::fs::PermissionsExt;

    let fx = Fixture::new();
    let script = fx.write("job.py", RICH_SCRIPT);
    let failing = fx.write("bin/broken-pip", "#!/bin/sh\necho 'no matching distribution' >&2\nexit 1\n");
    fs::set_permissions(&failing, fs::Permissions::from_mode(0o755)).unwrap();
    let config = ManagerConfig {
        scripts: vec![script],
        ..Default::default()
    };
    let mut manager = fx.manager(config, Installer::new(ProgramLine::new(failing)));
    let staging = manager.staging_dir().unwrap().to_path_buf();

    let err = manager.setup().unwrap_err();

    assert!(matches!(err, DepkitError::InstallFailed { .. }));
    assert!(err.to_string().contains("no matching distribution"));
    assert_eq!(manager.state(), SetupState::Failed);
    assert!(!staging.exists());
}

#[test]
fn colliding_module_names_abort_setup() {
    let fx = Fixture::new();
    let first = fx.write("a/tool.py", "print('a')\n");
    let second = fx.write("b/tool.py", "print('b')\n");
    let config = ManagerConfig {
        scripts: vec![first.clone(), second.clone()],
        ..Default::default()
    };
    let mut manager = fx.manager(config, Installer::new(ProgramLine::new("true")));
    let staging = manager.staging_dir().unwrap().to_path_buf();

    let err = manager.setup().unwrap_err();
    let msg = err.to_string();

    assert!(matches!(err, DepkitError::ModuleCollision { .. }));
    assert!(msg.contains(&*first.to_string_lossy()));
    assert!(msg.contains(&*second.to_string_lossy()));
    assert!(!staging.exists());
}

#[test]
fn unsatisfied_requires_python_aborts_setup() {
    let fx = Fixture::new();
    let script = fx.write(
        "future.py",
        "# /// script\n# requires-python = \">=99.0\"\n# ///\n",
    );
    let config = ManagerConfig {
        scripts: vec![script],
        ..Default::default()
    };
    let mut manager = fx.manager(config, Installer::new(ProgramLine::new("true")));

    let err = manager.setup().unwrap_err();

    assert!(matches!(err, DepkitError::PythonVersion { .. }));
    assert!(err.to_string().contains(">=99.0"));
    assert!(err.to_string().contains("3.11.4"));
}

#[test]
fn invalid_scripts_are_skipped() {
    let fx = Fixture::new();
    let good = fx.write("good.py", "print('ok')\n");
    let bad = fx.write("bad.py", "def (:\n");
    let missing = fx.path().join("missing.py");
    let config = ManagerConfig {
        scripts: vec![good, bad, missing],
        ..Default::default()
    };
    let mut manager = fx.manager(config, Installer::new(ProgramLine::new("true")));

    manager.setup().unwrap();

    let names: Vec<&str> = manager.module_map().names().collect();
    assert_eq!(names, vec!["good"]);
}

#[test]
fn extra_paths_are_scanned_and_published() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.path().join("site-packages/attrs-23.2.0.dist-info")).unwrap();
    let lib = fx.path().join("lib");
    fx.write("lib/helpers.py", "# Dependencies:\n# attrs\n");
    fx.write("lib/broken.py", "# /// script\n# dependencies = [\n# ///\n");
    let config = ManagerConfig {
        extra_paths: vec![lib.clone()],
        ..Default::default()
    };
    let mut manager = fx.manager(config, Installer::new(ProgramLine::new("/not/a/pip")));

    manager.setup().unwrap();

    assert_eq!(manager.installed_requirements(), vec!["attrs"]);
    assert!(manager.python_paths().contains(&fs::canonicalize(&lib).unwrap()));
}

#[test]
fn missing_extra_path_fails_after_publishing() {
    let fx = Fixture::new();
    let gone = fx.path().join("gone");
    let config = ManagerConfig {
        extra_paths: vec![gone.clone()],
        ..Default::default()
    };
    let mut manager = fx.manager(config, Installer::new(ProgramLine::new("true")));

    let err = manager.setup().unwrap_err();

    assert!(matches!(err, DepkitError::InvalidPath { .. }));
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn verify_import_path_names_available_modules() {
    let fx = Fixture::new();
    let script = fx.write("pipeline.py", "def main(): pass\n");
    let config = ManagerConfig {
        scripts: vec![script],
        ..Default::default()
    };
    let mut manager = fx.manager(config, Installer::new(ProgramLine::new("true")));
    manager.setup().unwrap();

    manager.verify_import_path("pipeline.main").unwrap();
    let err = manager.verify_import_path("other.main").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Import path 'other.main' references unknown module. Available modules: pipeline"
    );
}

#[test]
fn scoped_tears_down_when_closure_fails() {
    let fx = Fixture::new();
    let script = fx.write("job.py", "print('x')\n");
    let config = ManagerConfig {
        scripts: vec![script],
        ..Default::default()
    };
    let mut manager = fx.manager(config, Installer::new(ProgramLine::new("true")));
    let staging = manager.staging_dir().unwrap().to_path_buf();

    let result: depkit::Result<()> = manager.scoped(|m| {
        assert!(m.module_map().contains("job"));
        Err(DepkitError::script("caller failed"))
    });

    assert!(result.is_err());
    assert_eq!(manager.state(), SetupState::TornDown);
    assert!(!staging.exists());
}

#[tokio::test]
async fn setup_async_matches_setup() {
    let fx = Fixture::new();
    let script = fx.write("task.py", "print('x')\n");
    let config = ManagerConfig {
        scripts: vec![script],
        ..Default::default()
    };
    let mut manager = fx.manager(config, Installer::new(ProgramLine::new("true")));

    manager.setup_async().await.unwrap();

    assert_eq!(manager.state(), SetupState::Ready);
    assert!(manager.module_map().contains("task"));
    manager.teardown();
}
