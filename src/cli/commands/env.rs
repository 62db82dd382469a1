//! Env command implementation.
//!
//! The `depkit env` command prints the environment snapshot. It does not
//! require an isolated environment.

use std::io::Write;

use crate::cli::args::EnvArgs;
use crate::config::ManagerConfig;
use crate::environment::{parse_system_path, EnvironmentInfo, SystemPython};
use crate::error::Result;

use super::dispatcher::{Command, CommandResult};

/// The env command implementation.
pub struct EnvCommand {
    config: ManagerConfig,
    args: EnvArgs,
}

impl EnvCommand {
    /// Create a new env command.
    pub fn new(config: ManagerConfig, args: EnvArgs) -> Self {
        Self { config, args }
    }
}

/// Render a snapshot as `key: value` lines.
pub fn format_info(info: &EnvironmentInfo) -> String {
    let mut lines = vec![
        format!(
            "python_version: {}",
            info.python_version.as_deref().unwrap_or("unknown")
        ),
        format!("python_path: {}", info.python_path.display()),
        format!("is_isolated: {}", info.is_isolated),
        format!("is_uv: {}", info.is_uv),
        format!("index_url: {}", info.index_url.as_deref().unwrap_or("-")),
    ];
    for (name, value) in &info.indicators {
        lines.push(format!("{}: {}", name, value));
    }
    lines.join("\n")
}

impl Command for EnvCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let env_fn = |key: &str| std::env::var(key);
        let path_entries = parse_system_path();
        let python = SystemPython::discover(self.config.python.as_deref(), &env_fn, &path_entries);
        let info = EnvironmentInfo::collect(
            &python,
            &env_fn,
            &path_entries,
            self.config.pip_index_url.as_deref(),
        );

        if self.args.json {
            let json = serde_json::to_string_pretty(&info).map_err(anyhow::Error::from)?;
            writeln!(out, "{}", json)?;
        } else {
            writeln!(out, "{}", format_info(&info))?;
        }
        Ok(CommandResult::success())
    }
}
