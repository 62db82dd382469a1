//! Inline script metadata.
//!
//! Scripts declare their own dependencies in a structured comment block
//! (`# /// script` ... `# ///`) whose body is TOML. Older scripts may use an
//! informal `# Dependencies:` comment list instead.
//!
//! - [`parser`] - Block extraction and TOML decoding
//! - [`version`] - `requires-python` specifiers and interpreter versions

pub mod parser;
pub mod version;

pub use parser::{informal_dependencies, parse_dependencies, parse_script_metadata, ScriptMetadata};
pub use version::{check_python_version, PythonVersion, VersionSpecifier, VersionSpecifiers};
