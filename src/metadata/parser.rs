//! Inline script metadata parsing.
//!
//! Recognizes the fenced metadata block used by standalone scripts:
//!
//! ```text
//! # /// script
//! # dependencies = [
//! #   "requests<3",
//! #   "rich",
//! # ]
//! # requires-python = ">=3.11"
//! # ///
//! ```
//!
//! Only blocks of type `script` are honored. When no such block exists the
//! legacy informal format is used:
//!
//! ```text
//! # Dependencies:
//! # requests>=2.28.0
//! # pandas~=2.0.0
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DepkitError, Result};

/// Fenced metadata block: `# /// <type>`, comment body lines, `# ///`.
static BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^# /// (?P<type>[a-zA-Z0-9-]+)$\s(?P<content>(?:^#(?: .*)?$\s)+)^# ///$")
        .expect("BLOCK_REGEX must compile")
});

/// Block type carrying script metadata.
const SCRIPT_BLOCK: &str = "script";

/// Line that opens an informal dependency list.
const INFORMAL_MARKER: &str = "# Dependencies:";

/// Parsed metadata for one script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptMetadata {
    /// Requirement specifiers in declaration order.
    pub dependencies: Vec<String>,
    /// `requires-python` constraint, if declared.
    pub requires_python: Option<String>,
}

impl ScriptMetadata {
    /// Whether the script declared nothing.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.requires_python.is_none()
    }
}

/// Parse a script's metadata block, falling back to the informal format.
///
/// # Errors
///
/// Returns a script error if there is more than one `script` block, the
/// block body is not valid TOML, `dependencies` is not a list of strings,
/// or `requires-python` is not a string.
pub fn parse_script_metadata(content: &str) -> Result<ScriptMetadata> {
    let normalized;
    let content = if content.contains("\r\n") {
        normalized = content.replace("\r\n", "\n");
        normalized.as_str()
    } else {
        content
    };

    let mut blocks = BLOCK_REGEX
        .captures_iter(content)
        .filter(|caps| &caps["type"] == SCRIPT_BLOCK);

    let Some(block) = blocks.next() else {
        return Ok(ScriptMetadata {
            dependencies: informal_dependencies(content).map(String::from).collect(),
            requires_python: None,
        });
    };

    if blocks.next().is_some() {
        return Err(DepkitError::script("Multiple script metadata blocks found"));
    }

    let document = extract_toml(&block["content"]);
    let table: toml::Table = toml::from_str(&document)
        .map_err(|e| DepkitError::script(format!("Invalid TOML in script metadata: {}", e)))?;

    let dependencies = match table.get("dependencies") {
        None => Vec::new(),
        Some(toml::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                toml::Value::String(s) => Ok(s.clone()),
                other => Err(DepkitError::script(format!(
                    "dependencies must be a list of strings, found {}",
                    other.type_str()
                ))),
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(DepkitError::script("dependencies must be a list")),
    };

    let requires_python = match table.get("requires-python") {
        None => None,
        Some(toml::Value::String(s)) => {
            tracing::debug!("Script requires Python {}", s);
            Some(s.clone())
        }
        Some(_) => return Err(DepkitError::script("requires-python must be a string")),
    };

    Ok(ScriptMetadata {
        dependencies,
        requires_python,
    })
}

/// Parse only the dependency list of a script.
pub fn parse_dependencies(content: &str) -> Result<Vec<String>> {
    parse_script_metadata(content).map(|meta| meta.dependencies)
}

/// Strip the comment prefix from each body line.
fn extract_toml(content: &str) -> String {
    content
        .split_inclusive('\n')
        .map(|line| line.strip_prefix("# ").unwrap_or_else(|| &line[1..]))
        .collect()
}

/// Lazily yield requirements from the informal `# Dependencies:` format.
///
/// A marker line opens a block; each following comment line yields one
/// trimmed requirement; a blank line closes the block. The first line of
/// code ends the scan entirely.
pub fn informal_dependencies(content: &str) -> InformalDependencies<'_> {
    InformalDependencies {
        lines: content.lines(),
        in_block: false,
    }
}

/// Iterator returned by [`informal_dependencies`].
#[derive(Debug, Clone)]
pub struct InformalDependencies<'a> {
    lines: std::str::Lines<'a>,
    in_block: bool,
}

impl<'a> Iterator for InformalDependencies<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        for line in self.lines.by_ref() {
            let stripped = line.trim();
            if !stripped.is_empty() && !stripped.starts_with('#') {
                // Code starts here; nothing after it counts.
                self.lines = "".lines();
                return None;
            }
            if stripped == INFORMAL_MARKER {
                self.in_block = true;
                continue;
            }
            if self.in_block && stripped.starts_with('#') {
                let requirement = stripped.trim_start_matches('#').trim();
                if !requirement.is_empty() {
                    return Some(requirement);
                }
            } else {
                self.in_block = false;
            }
        }
        None
    }
}
