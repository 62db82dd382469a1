//! Installed-distribution lookup.
//!
//! Decides which requirements are already satisfied by looking for
//! distribution metadata directories (`*.dist-info`, `*.egg-info`) in the
//! interpreter's site directories. Only the presence of the package is
//! checked; version constraints are left to the installer.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

const METADATA_SUFFIXES: &[&str] = &[".dist-info", ".egg-info"];

/// Operators split off a specifier to recover its package name.
const NAME_SEPARATORS: &[&str] = &[">=", "==", "<"];

/// Package name of a requirement specifier.
///
/// `requests>=2.28` and `requests==2.31` give `requests`. Specifiers using
/// other syntax keep their tail and will not match an installed name.
pub fn bare_name(requirement: &str) -> &str {
    NAME_SEPARATORS
        .iter()
        .fold(requirement, |name, sep| name.split(sep).next().unwrap_or(name))
        .trim()
}

/// Normalize a distribution name: lowercase, runs of `-_.` become `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_dash = true;
            continue;
        }
        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.extend(c.to_lowercase());
    }
    out
}

/// Distribution name encoded in a metadata directory name, if it is one.
fn distribution_name(entry: &str) -> Option<&str> {
    let stem = METADATA_SUFFIXES
        .iter()
        .find_map(|suffix| entry.strip_suffix(suffix))?;
    // name-version[-pyX.Y]; names never contain '-' after wheel escaping
    Some(stem.split('-').next().unwrap_or(stem))
}

/// The set of site directories an interpreter installs into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitePackages {
    roots: Vec<PathBuf>,
}

impl SitePackages {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Normalized names of every installed distribution.
    ///
    /// Roots that do not exist are skipped.
    pub fn distributions(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for root in &self.roots {
            for name in read_root(root)? {
                names.insert(name);
            }
        }
        Ok(names)
    }

    /// Whether a distribution called `name` is installed.
    pub fn has_distribution(&self, name: &str) -> Result<bool> {
        let wanted = normalize_name(name);
        if wanted.is_empty() {
            return Ok(false);
        }
        for root in &self.roots {
            if read_root(root)?.iter().any(|found| *found == wanted) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn read_root(root: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        if let Some(name) = file_name.to_str().and_then(distribution_name) {
            names.push(normalize_name(name));
        }
    }
    Ok(names)
}

/// Requirements whose package is not installed, in input order.
///
/// A failed lookup counts as missing.
pub fn missing_requirements<'a, I>(requirements: I, site: &SitePackages) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    requirements
        .into_iter()
        .filter(|requirement| match site.has_distribution(bare_name(requirement)) {
            Ok(installed) => !installed,
            Err(e) => {
                tracing::warn!("Error checking requirement {}: {}", requirement, e);
                true
            }
        })
        .map(String::from)
        .collect()
}
