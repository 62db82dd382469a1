//! Configuration loading for depkit.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Environment variable overrides in [`env_layer`]
//!
//! # Example
//!
//! ```
//! use depkit::config::load_config;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! fs::write(temp.path().join("depkit.yml"), "requirements: [rich]").unwrap();
//!
//! let config = load_config(temp.path(), None).unwrap();
//! assert_eq!(config.requirements, vec!["rich".to_string()]);
//! ```
//!
//! # Configuration File Locations
//!
//! The first of these found in the project root is used:
//! 1. `depkit.yml`
//! 2. `.depkit/config.yml`
//!
//! Environment overrides are applied next, then command-line flags.

pub mod env_layer;
pub mod loader;
pub mod schema;

pub use env_layer::{apply_env_overrides, is_truthy};
pub use loader::{discover_config, load_config, load_config_file, parse_config};
pub use schema::ManagerConfig;
