//! Requirement aggregation, satisfiability checks and installation.
//!
//! # Modules
//!
//! - [`aggregator`] - Merge explicit, script and discovered requirements
//! - [`checker`] - Decide which requirements are already installed
//! - [`installer`] - Run pip or uv for the missing subset

pub mod aggregator;
pub mod checker;
pub mod installer;

pub use aggregator::{aggregate, collect_file_dependencies, scan_directory, RequirementSet, RequirementSource};
pub use checker::{bare_name, missing_requirements, SitePackages};
pub use installer::Installer;
