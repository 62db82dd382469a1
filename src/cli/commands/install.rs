//! Install command implementation.
//!
//! The `depkit install` command performs a full setup, reports the tracked
//! requirements and tears down.

use std::io::Write;

use crate::cli::args::InstallArgs;
use crate::config::ManagerConfig;
use crate::error::Result;
use crate::manager::DependencyManager;

use super::dispatcher::{Command, CommandResult};

/// The install command implementation.
pub struct InstallCommand {
    config: ManagerConfig,
    args: InstallArgs,
}

impl InstallCommand {
    /// Create a new install command.
    pub fn new(config: ManagerConfig, args: InstallArgs) -> Self {
        Self { config, args }
    }

    /// Config with `--with`, `--script` and `--path` folded in.
    pub fn manager_config(&self) -> Result<ManagerConfig> {
        let mut config = self.config.clone();
        config.requirements.extend(self.args.with.iter().cloned());
        for script in &self.args.scripts {
            config.scripts.push(std::path::absolute(script)?);
        }
        config.extra_paths.extend(self.args.paths.iter().cloned());
        Ok(config)
    }
}

impl Command for InstallCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let mut manager = DependencyManager::new(self.manager_config()?)?;

        manager.scoped(|m| {
            let installed = m.installed_requirements();
            if installed.is_empty() {
                writeln!(out, "No requirements declared")?;
            }
            for requirement in installed {
                writeln!(out, "{}", requirement)?;
            }
            for (name, module) in m.module_map().iter() {
                tracing::debug!("Staged {} from {}", name, module.source.display());
            }
            Ok(())
        })?;

        Ok(CommandResult::success())
    }
}
