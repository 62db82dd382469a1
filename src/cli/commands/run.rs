//! Run command implementation.
//!
//! The `depkit run` command installs a script's dependencies, runs it with
//! the interpreter and tears everything down again.

use std::path::PathBuf;

use crate::cli::args::RunArgs;
use crate::config::ManagerConfig;
use crate::error::Result;
use crate::manager::DependencyManager;

use super::dispatcher::{Command, CommandResult};

/// The run command implementation.
pub struct RunCommand {
    config: ManagerConfig,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(config: ManagerConfig, args: RunArgs) -> Self {
        Self { config, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    /// Config with the script, `--with` and `--path` folded in.
    pub fn manager_config(&self) -> Result<ManagerConfig> {
        let mut config = self.config.clone();
        let script = self.script()?;
        if !config.scripts.contains(&script) {
            config.scripts.push(script);
        }
        config.requirements.extend(self.args.with.iter().cloned());
        config.extra_paths.extend(self.args.paths.iter().cloned());
        Ok(config)
    }

    fn script(&self) -> Result<PathBuf> {
        Ok(std::path::absolute(&self.args.script)?)
    }
}

impl Command for RunCommand {
    fn execute(&self, _out: &mut dyn std::io::Write) -> Result<CommandResult> {
        let script = self.script()?;
        let mut manager = DependencyManager::new(self.manager_config()?)?;

        let exit_code = manager.scoped(|m| {
            tracing::debug!("Running {}", script.display());
            let status = m.command(&script).args(&self.args.args).status()?;
            Ok(status.code().unwrap_or(1))
        })?;

        Ok(CommandResult::from_exit_code(exit_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn folds_cli_inputs_into_config() {
        let args = RunArgs {
            script: PathBuf::from("/work/job.py"),
            with: vec!["rich".into()],
            paths: vec![PathBuf::from("/work/lib")],
            args: Vec::new(),
        };
        let base = ManagerConfig::with_requirements(["requests"]);
        let config = RunCommand::new(base, args).manager_config().unwrap();

        assert_eq!(config.scripts, vec![PathBuf::from("/work/job.py")]);
        assert_eq!(config.requirements, vec!["requests", "rich"]);
        assert_eq!(config.extra_paths, vec![PathBuf::from("/work/lib")]);
    }

    #[test]
    fn configured_script_is_not_staged_twice() {
        let args = RunArgs {
            script: PathBuf::from("/work/job.py"),
            with: Vec::new(),
            paths: Vec::new(),
            args: Vec::new(),
        };
        let base = ManagerConfig {
            scripts: vec![PathBuf::from("/work/job.py")],
            ..Default::default()
        };
        let config = RunCommand::new(base, args).manager_config().unwrap();
        assert_eq!(config.scripts.len(), 1);
    }

    #[test]
    fn relative_script_becomes_absolute() {
        let args = RunArgs {
            script: PathBuf::from("job.py"),
            with: Vec::new(),
            paths: Vec::new(),
            args: Vec::new(),
        };
        let config = RunCommand::new(ManagerConfig::default(), args)
            .manager_config()
            .unwrap();
        assert!(config.scripts[0].is_absolute());
        assert!(config.scripts[0].ends_with(Path::new("job.py")));
    }
}
