//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// depkit - Install and expose the dependencies of standalone Python scripts.
#[derive(Debug, Parser)]
#[command(name = "depkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides depkit.yml discovery)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Install with uv when available
    #[arg(long, global = true)]
    pub prefer_uv: bool,

    /// Package index URL passed to the installer
    #[arg(long, global = true, value_name = "URL")]
    pub index_url: Option<String>,

    /// Allow installing outside a virtual environment
    #[arg(long, global = true)]
    pub force_install: bool,

    /// Python interpreter to use
    #[arg(long, global = true, value_name = "PATH")]
    pub python: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install a script's dependencies and run it
    Run(RunArgs),

    /// Install configured and declared dependencies
    Install(InstallArgs),

    /// List dependencies declared by scripts and directories
    Deps(DepsArgs),

    /// Show the Python environment
    Env(EnvArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Script to run
    pub script: PathBuf,

    /// Additional requirement (repeatable)
    #[arg(long = "with", value_name = "REQ")]
    pub with: Vec<String>,

    /// Extra directory for the module search path (repeatable)
    #[arg(long = "path", value_name = "DIR")]
    pub paths: Vec<PathBuf>,

    /// Arguments passed to the script
    #[arg(last = true)]
    pub args: Vec<OsString>,
}

/// Arguments for the `install` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct InstallArgs {
    /// Additional requirement (repeatable)
    #[arg(long = "with", value_name = "REQ")]
    pub with: Vec<String>,

    /// Script whose dependencies to install (repeatable)
    #[arg(long = "script", value_name = "FILE")]
    pub scripts: Vec<PathBuf>,

    /// Extra directory to scan and publish (repeatable)
    #[arg(long = "path", value_name = "DIR")]
    pub paths: Vec<PathBuf>,
}

/// Arguments for the `deps` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct DepsArgs {
    /// Scripts or directories to inspect
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output as JSON, with the source of each requirement
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `env` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct EnvArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_trailing_args() {
        let cli = Cli::try_parse_from([
            "depkit", "--prefer-uv", "run", "job.py", "--with", "rich", "--", "--flag", "x",
        ])
        .unwrap();
        assert!(cli.prefer_uv);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.script, PathBuf::from("job.py"));
                assert_eq!(args.with, vec!["rich"]);
                assert_eq!(args.args, vec![OsString::from("--flag"), OsString::from("x")]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["depkit", "env", "--json", "--force-install"]).unwrap();
        assert!(cli.force_install);
        assert!(matches!(cli.command, Commands::Env(EnvArgs { json: true })));
    }

    #[test]
    fn deps_requires_a_path() {
        assert!(Cli::try_parse_from(["depkit", "deps"]).is_err());
    }
}
