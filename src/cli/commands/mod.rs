//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands write
//! their results to the given writer; diagnostics go through `tracing`.

pub mod deps;
pub mod dispatcher;
pub mod env;
pub mod install;
pub mod run;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
