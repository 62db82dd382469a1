//! Package installation through pip or uv.
//!
//! The installer is an opaque external command. It is invoked once with
//! every missing requirement; a partial failure is reported as a single
//! error and nothing is rolled back.

use std::ffi::OsString;

use crate::error::{DepkitError, Result};
use crate::shell::{self, CommandOptions, ProgramLine};

/// A package installer invocation: base command plus options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installer {
    base: ProgramLine,
    index_url: Option<String>,
}

impl Installer {
    /// `base` is the command before `install`, such as `uv pip`.
    pub fn new(base: ProgramLine) -> Self {
        Self {
            base,
            index_url: None,
        }
    }

    pub fn with_index_url(mut self, url: Option<String>) -> Self {
        self.index_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Full command line for installing `requirements`.
    pub fn command_line(&self, requirements: &[String]) -> ProgramLine {
        let mut line = self.base.clone().arg("install");
        if let Some(url) = &self.index_url {
            line = line.arg("--index-url").arg(url);
        }
        line.args(requirements.iter().map(OsString::from))
    }

    /// Install `requirements`, doing nothing when the list is empty.
    ///
    /// # Errors
    ///
    /// Returns [`DepkitError::InstallFailed`] if the installer cannot be
    /// started or exits non-zero; the latter carries its stderr.
    pub fn install(&self, requirements: &[String]) -> Result<()> {
        if requirements.is_empty() {
            return Ok(());
        }

        let line = self.command_line(requirements);
        let result = match shell::run(&line, &CommandOptions::default()) {
            Ok(result) => result,
            Err(e) => {
                return Err(DepkitError::InstallFailed {
                    command: line.to_string(),
                    message: format!("could not run installer: {}", e),
                    stderr: String::new(),
                })
            }
        };

        if !result.success {
            let status = result
                .exit_code
                .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {}", c));
            return Err(DepkitError::InstallFailed {
                command: line.to_string(),
                message: status,
                stderr: result.stderr.trim().to_string(),
            });
        }

        tracing::debug!("Package install output:\n{}", result.stdout);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reqs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn command_line_places_index_url_before_requirements() {
        let installer = Installer::new(ProgramLine::new("uv").arg("pip"))
            .with_index_url(Some("https://pypi.example/simple".into()));
        let line = installer.command_line(&reqs(&["requests", "rich"]));
        assert_eq!(
            line.to_string(),
            "uv pip install --index-url https://pypi.example/simple requests rich"
        );
    }

    #[test]
    fn blank_index_url_is_ignored() {
        let installer = Installer::new(ProgramLine::new("pip")).with_index_url(Some(" ".into()));
        let line = installer.command_line(&reqs(&["rich"]));
        assert_eq!(line.to_string(), "pip install rich");
    }

    #[test]
    fn empty_install_never_runs_the_installer() {
        let installer = Installer::new(ProgramLine::new("/definitely/not/pip"));
        assert!(installer.install(&[]).is_ok());
    }

    #[test]
    fn unlaunchable_installer_is_a_dependency_error() {
        let installer = Installer::new(ProgramLine::new("/definitely/not/pip"));
        let err = installer.install(&reqs(&["rich"])).unwrap_err();
        assert!(err.is_dependency_error());
        assert!(matches!(err, DepkitError::InstallFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_surfaces_stderr() {
        let installer = Installer::new(
            ProgramLine::new("sh")
                .arg("-c")
                .arg("echo 'No matching distribution found for nope' >&2; exit 1")
                .arg("installer"),
        );
        let err = installer.install(&reqs(&["nope"])).unwrap_err();
        match err {
            DepkitError::InstallFailed { stderr, message, .. } => {
                assert!(stderr.contains("No matching distribution"));
                assert_eq!(message, "exit code 1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn successful_install_passes_requirements_as_argv() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = temp.path().join("argv");
        let installer = Installer::new(
            ProgramLine::new("sh")
                .arg("-c")
                .arg(format!("printf '%s\\n' \"$@\" > '{}'", log.display()))
                .arg("installer"),
        );

        installer.install(&reqs(&["requests<3", "rich"])).unwrap();

        let argv = std::fs::read_to_string(&log).unwrap();
        assert_eq!(argv, "install\nrequests<3\nrich\n");
    }
}
