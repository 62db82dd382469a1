//! Python interpreter access.
//!
//! [`PythonRuntime`] is the seam for everything that needs the interpreter
//! itself: version and site directories, syntax checking of scripts, and
//! import checks. [`SystemPython`] talks to a real executable; tests supply
//! their own implementation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::environment::probe::resolve_tool_path;
use crate::error::{DepkitError, Result};
use crate::metadata::PythonVersion;
use crate::search_path::{ModuleSearchPath, PYTHONPATH};
use crate::shell::{self, CommandOptions, ProgramLine};

/// Prints a JSON snapshot of the interpreter.
const INFO_SNIPPET: &str = r#"
import json, os, site, sys, sysconfig
roots = []
for key in ("purelib", "platlib"):
    p = sysconfig.get_paths().get(key)
    if p and p not in roots:
        roots.append(p)
try:
    for p in site.getsitepackages():
        if p not in roots:
            roots.append(p)
except Exception:
    pass
print(json.dumps({
    "version": "%d.%d.%d" % tuple(sys.version_info[:3]),
    "full_version": sys.version,
    "executable": sys.executable,
    "prefix": sys.prefix,
    "base_prefix": getattr(sys, "base_prefix", sys.prefix),
    "site_packages": roots,
    "sys_path": [p for p in sys.path if p and os.path.isdir(p)],
}))
"#;

/// Parses source read from stdin; argv[1] names it in error messages.
const SYNTAX_SNIPPET: &str = "import ast, sys; ast.parse(sys.stdin.read(), sys.argv[1])";

/// Imports the module named by argv[1].
const IMPORT_SNIPPET: &str = "import importlib, sys; importlib.import_module(sys.argv[1])";

/// Snapshot reported by the interpreter. Never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterInfo {
    /// `major.minor.micro`.
    pub version: String,
    /// Full `sys.version` string.
    pub full_version: String,
    pub executable: PathBuf,
    pub prefix: PathBuf,
    pub base_prefix: PathBuf,
    /// Directories packages are installed into.
    #[serde(default)]
    pub site_packages: Vec<PathBuf>,
    /// Existing directories on the interpreter's own `sys.path`.
    #[serde(default)]
    pub sys_path: Vec<PathBuf>,
}

impl InterpreterInfo {
    pub fn python_version(&self) -> Result<PythonVersion> {
        self.version.parse()
    }

    /// Directories that may hold distribution metadata, site dirs first.
    pub fn distribution_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.site_packages.clone();
        for entry in &self.sys_path {
            if !roots.contains(entry) {
                roots.push(entry.clone());
            }
        }
        roots
    }
}

/// Access to a Python interpreter.
pub trait PythonRuntime: Send + Sync {
    /// Path of the interpreter executable.
    fn executable(&self) -> &Path;

    /// Query version and site directories.
    fn info(&self) -> Result<InterpreterInfo>;

    /// Fail with a script error unless `source` parses.
    fn check_syntax(&self, source: &str, origin: &Path) -> Result<()>;

    /// Whether `module` imports with `search_path` exported.
    fn can_import(&self, module: &str, search_path: &ModuleSearchPath) -> Result<bool>;
}

/// A Python executable on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPython {
    executable: PathBuf,
}

impl SystemPython {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Resolve the interpreter to use.
    ///
    /// An explicit path wins, then the active virtual environment's
    /// interpreter, then `python3`/`python` on `path_entries`.
    pub fn discover<F>(explicit: Option<&Path>, env_fn: &F, path_entries: &[PathBuf]) -> Self
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError> + ?Sized,
    {
        if let Some(path) = explicit {
            return Self::new(path);
        }

        if let Ok(venv) = env_fn("VIRTUAL_ENV") {
            if let Some(python) = venv_interpreter(Path::new(&venv)) {
                return Self::new(python);
            }
        }

        ["python3", "python"]
            .iter()
            .find_map(|name| resolve_tool_path(name, path_entries))
            .map(Self::new)
            .unwrap_or_else(|| Self::new("python3"))
    }

    fn snippet(&self, code: &str) -> ProgramLine {
        ProgramLine::new(&self.executable).arg("-c").arg(code)
    }
}

impl PythonRuntime for SystemPython {
    fn executable(&self) -> &Path {
        &self.executable
    }

    fn info(&self) -> Result<InterpreterInfo> {
        let result = shell::run(&self.snippet(INFO_SNIPPET), &CommandOptions::default())?;
        if !result.success {
            return Err(anyhow::anyhow!(
                "Failed to query interpreter {}: {}",
                self.executable.display(),
                result.stderr.trim()
            )
            .into());
        }
        serde_json::from_str(result.stdout.trim()).map_err(|e| {
            anyhow::anyhow!(
                "Unexpected interpreter report from {}: {}",
                self.executable.display(),
                e
            )
            .into()
        })
    }

    fn check_syntax(&self, source: &str, origin: &Path) -> Result<()> {
        let line = self
            .snippet(SYNTAX_SNIPPET)
            .arg(origin.as_os_str().to_os_string());
        let options = CommandOptions {
            stdin: Some(source.to_string()),
            ..Default::default()
        };
        let result = shell::run(&line, &options)?;
        if result.success {
            return Ok(());
        }

        let reason = result
            .stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("syntax error")
            .trim()
            .to_string();
        Err(DepkitError::script(format!(
            "Invalid Python script {}: {}",
            origin.display(),
            reason
        )))
    }

    fn can_import(&self, module: &str, search_path: &ModuleSearchPath) -> Result<bool> {
        let mut options = CommandOptions::default();
        if let Some(value) = search_path.to_env_value() {
            options.env.insert(PYTHONPATH.to_string(), value);
        }
        let result = shell::run(&self.snippet(IMPORT_SNIPPET).arg(module), &options)?;
        Ok(result.success)
    }
}

/// Interpreter inside a virtual environment directory, if present.
pub fn venv_interpreter(venv: &Path) -> Option<PathBuf> {
    [
        venv.join("bin").join("python"),
        venv.join("bin").join("python3"),
        venv.join("Scripts").join("python.exe"),
    ]
    .into_iter()
    .find(|candidate| candidate.exists())
}
