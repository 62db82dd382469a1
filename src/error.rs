//! Error types for depkit operations.
//!
//! This module defines [`DepkitError`], the error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Dependency errors (environment, collisions, version constraints,
//!   installer failures) abort a setup and are always reported after the
//!   staging directory has been removed.
//! - Script errors describe malformed script content or metadata. During
//!   staging they are logged and the offending script is skipped.
//! - Import-path errors are raised only when a caller asks for a module
//!   that was never staged or cannot be imported.
//! - `anyhow::Error` (via `DepkitError::Other`) covers unexpected failures.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for depkit operations.
#[derive(Debug, Error)]
pub enum DepkitError {
    /// Refusing to install into an interpreter that is not isolated.
    #[error(
        "Not running in a virtual environment. Installing packages globally \
         is not recommended. Use force_install to override."
    )]
    NotIsolated,

    /// An extra search path is missing or not a directory.
    #[error("Invalid path {path}: {message}")]
    InvalidPath { path: PathBuf, message: String },

    /// Two scripts derive the same module name.
    #[error("Duplicate module name '{name}' from {path}. Already used by {existing}")]
    ModuleCollision {
        name: String,
        path: PathBuf,
        existing: PathBuf,
    },

    /// The interpreter does not satisfy a script's `requires-python`.
    #[error("Script {script} requires Python {constraint}, but running {running}")]
    PythonVersion {
        script: PathBuf,
        constraint: String,
        running: String,
    },

    /// The package installer exited non-zero or could not be launched.
    #[error("Failed to install requirements with `{command}`: {message}\nOutput: {stderr}")]
    InstallFailed {
        command: String,
        message: String,
        stderr: String,
    },

    /// Operation not allowed in the manager's current lifecycle state.
    #[error("Cannot {operation} while {state}")]
    InvalidState { operation: String, state: String },

    /// A non-dependency failure raised while setting up.
    #[error("Dependency setup failed: {source}")]
    SetupFailed {
        #[source]
        source: Box<DepkitError>,
    },

    /// Script content or inline metadata is malformed.
    #[error("{message}")]
    Script { message: String },

    /// An import path does not resolve to an available module.
    #[error("Import path '{import_path}' {message}")]
    ImportPath {
        import_path: String,
        message: String,
    },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Broad classification of a [`DepkitError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Dependency,
    Script,
    ImportPath,
    Config,
    Io,
    Other,
}

impl DepkitError {
    /// Shorthand for a script error.
    pub fn script(message: impl Into<String>) -> Self {
        DepkitError::Script {
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DepkitError::NotIsolated
            | DepkitError::InvalidPath { .. }
            | DepkitError::ModuleCollision { .. }
            | DepkitError::PythonVersion { .. }
            | DepkitError::InstallFailed { .. }
            | DepkitError::InvalidState { .. }
            | DepkitError::SetupFailed { .. } => ErrorKind::Dependency,
            DepkitError::Script { .. } => ErrorKind::Script,
            DepkitError::ImportPath { .. } => ErrorKind::ImportPath,
            DepkitError::ConfigNotFound { .. } | DepkitError::ConfigParse { .. } => {
                ErrorKind::Config
            }
            DepkitError::Io(_) => ErrorKind::Io,
            DepkitError::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether this is an installation/dependency failure.
    pub fn is_dependency_error(&self) -> bool {
        self.kind() == ErrorKind::Dependency
    }

    /// Wrap anything that is not already a dependency error.
    pub fn into_dependency_error(self) -> Self {
        if self.is_dependency_error() {
            self
        } else {
            DepkitError::SetupFailed {
                source: Box::new(self),
            }
        }
    }
}

/// Result type alias for depkit operations.
pub type Result<T> = std::result::Result<T, DepkitError>;
