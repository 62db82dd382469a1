//! Requirement aggregation across explicit lists, scripts and directories.
//!
//! Every requirement remembers where it came from. Directory scans are
//! best-effort: a file that cannot be read or parsed is logged at debug
//! level and the scan moves on.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use walkdir::{DirEntry, WalkDir};

use crate::error::Result;
use crate::metadata::parse_dependencies;

use super::checker::{bare_name, normalize_name};

/// Directory names holding installed third-party packages.
const PACKAGE_DIR_MARKERS: &[&str] = &["site-packages", "dist-packages"];

/// Extension of scanned source files.
const SOURCE_EXTENSION: &str = "py";

/// Where a requirement was declared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum RequirementSource {
    /// Passed in directly by the caller.
    Explicit,
    /// Declared by a staged script.
    Script(PathBuf),
    /// Found while scanning an extra directory.
    Discovered(PathBuf),
}

impl fmt::Display for RequirementSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementSource::Explicit => f.write_str("explicit"),
            RequirementSource::Script(path) => write!(f, "script {}", path.display()),
            RequirementSource::Discovered(path) => write!(f, "discovered in {}", path.display()),
        }
    }
}

/// Requirements with their provenance, one entry per package.
///
/// Packages are identified by their normalized name, so `rich`, `Rich` and
/// `rich>=13` are the same entry. The first specifier declared for a
/// package is the one kept; later ones only add provenance. Iteration is in
/// lexicographic order of the kept specifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    entries: BTreeMap<String, RequirementEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RequirementEntry {
    specifier: String,
    sources: BTreeSet<RequirementSource>,
}

/// Normalized package name a specifier belongs to.
///
/// Falls back to the whole specifier when no name can be read from it,
/// e.g. for local paths.
fn package_key(requirement: &str) -> String {
    let name = bare_name(requirement);
    let end = name
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(name.len());
    let key = normalize_name(&name[..end]);
    if key.is_empty() {
        requirement.to_string()
    } else {
        key
    }
}

impl RequirementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one requirement. Blank specifiers are ignored.
    pub fn insert(&mut self, requirement: impl Into<String>, source: RequirementSource) {
        let requirement = requirement.into();
        let requirement = requirement.trim();
        if requirement.is_empty() {
            return;
        }
        let sources = BTreeSet::from([source]);
        self.insert_entry(
            package_key(requirement),
            RequirementEntry {
                specifier: requirement.to_string(),
                sources,
            },
        );
    }

    fn insert_entry(&mut self, key: String, entry: RequirementEntry) {
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                let kept = slot.get_mut();
                if kept.specifier != entry.specifier {
                    tracing::debug!(
                        "Keeping requirement {}, ignoring {}",
                        kept.specifier,
                        entry.specifier
                    );
                }
                kept.sources.extend(entry.sources);
            }
        }
    }

    /// Add several requirements sharing one source.
    pub fn extend<I, S>(&mut self, requirements: I, source: RequirementSource)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for requirement in requirements {
            self.insert(requirement, source.clone());
        }
    }

    /// Fold another set into this one, keeping all provenance.
    ///
    /// Specifiers already in `self` win over those in `other`.
    pub fn merge(&mut self, other: RequirementSet) {
        for (key, entry) in other.entries {
            self.insert_entry(key, entry);
        }
    }

    /// Requirement specifiers, sorted.
    pub fn sorted(&self) -> Vec<String> {
        self.iter().map(String::from).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let mut specifiers: Vec<&str> = self
            .entries
            .values()
            .map(|entry| entry.specifier.as_str())
            .collect();
        specifiers.sort_unstable();
        specifiers.into_iter()
    }

    /// Where the package named by `requirement` was declared.
    pub fn sources(&self, requirement: &str) -> Option<&BTreeSet<RequirementSource>> {
        self.entries
            .get(&package_key(requirement.trim()))
            .map(|entry| &entry.sources)
    }

    /// Specifier kept for the package named by `requirement`.
    pub fn specifier(&self, requirement: &str) -> Option<&str> {
        self.entries
            .get(&package_key(requirement.trim()))
            .map(|entry| entry.specifier.as_str())
    }

    pub fn contains(&self, requirement: &str) -> bool {
        self.entries.contains_key(&package_key(requirement.trim()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialized as a map from specifier to sources, sorted by specifier.
impl Serialize for RequirementSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut entries: Vec<&RequirementEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.specifier.cmp(&b.specifier));

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for entry in entries {
            map.serialize_entry(&entry.specifier, &entry.sources)?;
        }
        map.end()
    }
}

/// Read one file and parse its declared dependencies.
///
/// Undecodable bytes are replaced rather than rejected.
pub fn collect_file_dependencies(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    parse_dependencies(&String::from_utf8_lossy(&bytes))
}

fn is_package_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| PACKAGE_DIR_MARKERS.contains(&name))
}

fn is_source_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry.path().extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION)
}

/// Recursively collect dependencies declared by source files under `dir`.
///
/// Returns an empty set when `dir` is not a directory or lies inside a
/// package installation directory.
pub fn scan_directory(dir: &Path) -> RequirementSet {
    let mut found = RequirementSet::new();

    if !dir.is_dir() {
        return found;
    }
    if dir
        .components()
        .any(|c| PACKAGE_DIR_MARKERS.iter().any(|m| c.as_os_str() == *m))
    {
        tracing::debug!("Skipping package directory {}", dir.display());
        return found;
    }

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_package_dir(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Failed to read directory entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if !is_source_file(&entry) {
            continue;
        }

        match collect_file_dependencies(entry.path()) {
            Ok(deps) => found.extend(deps, RequirementSource::Discovered(entry.path().to_path_buf())),
            Err(e) => tracing::debug!("Failed to parse {}: {}", entry.path().display(), e),
        }
    }

    found
}

/// Union of explicit requirements, script dependencies and directory scans.
///
/// Unreadable or malformed scripts contribute nothing; non-directory extra
/// paths are ignored.
pub fn aggregate(explicit: &[String], scripts: &[PathBuf], extra_paths: &[PathBuf]) -> RequirementSet {
    let mut set = RequirementSet::new();
    set.extend(explicit.iter().cloned(), RequirementSource::Explicit);

    for script in scripts {
        match collect_file_dependencies(script) {
            Ok(deps) => set.extend(deps, RequirementSource::Script(script.clone())),
            Err(e) => tracing::debug!("Failed to parse {}: {}", script.display(), e),
        }
    }

    for path in extra_paths {
        let discovered = scan_directory(path);
        if !discovered.is_empty() {
            tracing::debug!("Found dependencies in {}: {:?}", path.display(), discovered.sorted());
            set.merge(discovered);
        }
    }

    set
}
