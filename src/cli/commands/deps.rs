//! Deps command implementation.
//!
//! The `depkit deps` command lists declared requirements without
//! installing anything. Files are parsed directly; directories are scanned.

use std::io::Write;
use std::path::PathBuf;

use crate::cli::args::DepsArgs;
use crate::error::Result;
use crate::requirements::{aggregate, RequirementSet};

use super::dispatcher::{Command, CommandResult};

/// The deps command implementation.
pub struct DepsCommand {
    args: DepsArgs,
}

impl DepsCommand {
    /// Create a new deps command.
    pub fn new(args: DepsArgs) -> Self {
        Self { args }
    }

    /// Aggregate requirements from the given paths.
    pub fn collect(&self) -> RequirementSet {
        let (dirs, files): (Vec<PathBuf>, Vec<PathBuf>) =
            self.args.paths.iter().cloned().partition(|p| p.is_dir());
        for missing in files.iter().filter(|p| !p.exists()) {
            tracing::warn!("Path does not exist: {}", missing.display());
        }
        aggregate(&[], &files, &dirs)
    }
}

impl Command for DepsCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let requirements = self.collect();

        if self.args.json {
            let json = serde_json::to_string_pretty(&requirements).map_err(anyhow::Error::from)?;
            writeln!(out, "{}", json)?;
        } else {
            for requirement in requirements.iter() {
                writeln!(out, "{}", requirement)?;
            }
        }

        Ok(CommandResult::success())
    }
}
