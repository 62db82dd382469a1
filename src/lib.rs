//! depkit - Dependency management for standalone Python scripts.
//!
//! Scripts declare what they need in an inline metadata block; depkit
//! collects those declarations, installs whatever is missing with pip or
//! uv, stages the scripts as importable modules and publishes extra
//! directories on the interpreter's module search path.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading and environment overrides
//! - [`environment`] - Interpreter access, isolation and installer detection
//! - [`error`] - Error types and result aliases
//! - [`manager`] - Setup and teardown orchestration, script staging
//! - [`metadata`] - Inline script metadata and `requires-python` checks
//! - [`requirements`] - Requirement aggregation, checking and installation
//! - [`search_path`] - The module search path handed to the interpreter
//! - [`shell`] - External program execution
//!
//! # Example
//!
//! ```
//! use depkit::metadata::parse_script_metadata;
//!
//! let script = "# /// script\n# dependencies = [\"rich\"]\n# requires-python = \">=3.9\"\n# ///\n";
//! let meta = parse_script_metadata(script).unwrap();
//! assert_eq!(meta.dependencies, vec!["rich"]);
//! assert_eq!(meta.requires_python.as_deref(), Some(">=3.9"));
//! ```
//!
//! For the full setup lifecycle, see [`manager::DependencyManager`].

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod requirements;
pub mod search_path;
pub mod shell;

pub use config::ManagerConfig;
pub use error::{DepkitError, ErrorKind, Result};
pub use manager::{DependencyManager, SetupState};
