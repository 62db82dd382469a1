//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::config::{apply_env_overrides, load_config, ManagerConfig};
use crate::error::Result;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command, writing user-facing output to `out`.
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Result mirroring a child process exit code.
    pub fn from_exit_code(exit_code: i32) -> Self {
        Self {
            success: exit_code == 0,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Config file, then environment overrides, then command-line flags.
    pub fn resolve_config<F>(&self, cli: &Cli, env_fn: &F) -> Result<ManagerConfig>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError> + ?Sized,
    {
        let mut config = load_config(&self.project_root, cli.config.as_deref())?;
        apply_env_overrides(&mut config, env_fn);

        if cli.prefer_uv {
            config.prefer_uv = true;
        }
        if cli.force_install {
            config.force_install = true;
        }
        if let Some(url) = &cli.index_url {
            config.pip_index_url = Some(url.clone());
        }
        if let Some(python) = &cli.python {
            config.python = Some(python.clone());
        }
        Ok(config)
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, out: &mut dyn Write) -> Result<CommandResult> {
        let config = self.resolve_config(cli, &|key: &str| std::env::var(key))?;
        tracing::debug!("Resolved config: {:?}", config);

        match &cli.command {
            Commands::Run(args) => super::run::RunCommand::new(config, args.clone()).execute(out),
            Commands::Install(args) => {
                super::install::InstallCommand::new(config, args.clone()).execute(out)
            }
            Commands::Deps(args) => super::deps::DepsCommand::new(args.clone()).execute(out),
            Commands::Env(args) => super::env::EnvCommand::new(config, args.clone()).execute(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> std::result::Result<String, std::env::VarError> {
        Err(std::env::VarError::NotPresent)
    }

    #[test]
    fn command_result_success() {
        let result = CommandResult::success();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn command_result_from_exit_code() {
        let result = CommandResult::from_exit_code(3);
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
    }

    #[test]
    fn flags_override_file_and_env() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("depkit.yml"),
            "pip_index_url: https://file.example/simple\nrequirements: [rich]\n",
        )
        .unwrap();
        let env = |key: &str| match key {
            "DEPKIT_INDEX_URL" => Ok("https://env.example/simple".to_string()),
            _ => Err(std::env::VarError::NotPresent),
        };
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());

        let cli = Cli::parse_from(["depkit", "env"]);
        let config = dispatcher.resolve_config(&cli, &env).unwrap();
        assert_eq!(config.pip_index_url.as_deref(), Some("https://env.example/simple"));
        assert_eq!(config.requirements, vec!["rich"]);

        let cli = Cli::parse_from(["depkit", "--index-url", "https://flag.example/simple", "env"]);
        let config = dispatcher.resolve_config(&cli, &env).unwrap();
        assert_eq!(config.pip_index_url.as_deref(), Some("https://flag.example/simple"));
    }

    #[test]
    fn boolean_flags_switch_on() {
        let temp = TempDir::new().unwrap();
        let dispatcher = CommandDispatcher::new(temp.path().to_path_buf());
        let cli = Cli::parse_from(["depkit", "--prefer-uv", "--force-install", "env"]);
        let config = dispatcher.resolve_config(&cli, &no_env).unwrap();
        assert!(config.prefer_uv);
        assert!(config.force_install);
    }
}
