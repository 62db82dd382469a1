//! External program execution.

pub mod command;

pub use command::{run, CommandOptions, CommandResult, ProgramLine};
