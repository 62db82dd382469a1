//! External program execution with captured output.
//!
//! Programs are spawned directly from an argv list, never through a shell,
//! so requirement specifiers like `requests<3` reach the installer intact.

use crate::error::Result;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Result of executing a program.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Whether the program succeeded (exit code 0).
    pub success: bool,
}

/// Options for program execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Environment variables (merged with the inherited environment).
    pub env: HashMap<String, OsString>,

    /// Text written to the program's stdin.
    pub stdin: Option<String>,
}

/// An argv-style command line: program plus leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLine {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ProgramLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ProgramLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Run a program to completion, capturing stdout and stderr.
///
/// Blocks until the program exits; no timeout is applied.
///
/// # Errors
///
/// Returns an IO error if the program cannot be spawned (e.g. not found).
/// A non-zero exit is not an error; inspect [`CommandResult::success`].
pub fn run(line: &ProgramLine, options: &CommandOptions) -> Result<CommandResult> {
    let mut cmd = Command::new(&line.program);
    cmd.args(&line.args);

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(if options.stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    tracing::debug!("Running: {}", line);
    let mut child = cmd.spawn()?;

    if let (Some(input), Some(mut stdin)) = (&options.stdin, child.stdin.take()) {
        if let Err(e) = stdin.write_all(input.as_bytes()) {
            drop(stdin);
            if e.kind() != io::ErrorKind::BrokenPipe {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
            // The program exited or closed stdin early; its exit status decides.
            tracing::debug!("{} did not read all of its input", line.program.display());
        }
    }

    let output = child.wait_with_output()?;

    Ok(CommandResult {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
    })
}
