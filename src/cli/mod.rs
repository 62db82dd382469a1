//! Command-line interface for depkit.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, DepsArgs, EnvArgs, InstallArgs, RunArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
