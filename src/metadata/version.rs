//! Interpreter versions and `requires-python` specifiers.
//!
//! Supports the comparison operators scripts use in practice: `==`, `!=`,
//! `<`, `<=`, `>`, `>=`, `~=` and `===`, plus trailing `.*` wildcards on
//! `==` and `!=`. Clauses are comma-separated and must all hold.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DepkitError, Result};

static SPECIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<op>~=|===|==|!=|<=|>=|<|>)\s*(?P<release>[0-9]+(?:\.[0-9]+)*)(?P<wildcard>\.\*)?$")
        .expect("SPECIFIER_REGEX must compile")
});

/// A running interpreter's version (`sys.version_info[:3]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl PythonVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    fn release(&self) -> [u64; 3] {
        [self.major, self.minor, self.patch]
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for PythonVersion {
    type Err = DepkitError;

    /// Parses `3`, `3.12` or `3.12.1`; a trailing pre-release tag on the
    /// last component (`3.13.0rc1`) is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('.').map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().ok()
        });

        let invalid = || DepkitError::script(format!("Invalid Python version '{}'", s));
        let major = parts.next().flatten().ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(part) => part.ok_or_else(invalid)?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(part) => part.ok_or_else(invalid)?,
            None => 0,
        };
        Ok(Self::new(major, minor, patch))
    }
}

/// Comparison operator of a single specifier clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Compatible,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Arbitrary,
}

impl Operator {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "~=" => Operator::Compatible,
            "==" => Operator::Equal,
            "!=" => Operator::NotEqual,
            "<=" => Operator::LessEqual,
            ">=" => Operator::GreaterEqual,
            "<" => Operator::Less,
            ">" => Operator::Greater,
            "===" => Operator::Arbitrary,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Operator::Compatible => "~=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Arbitrary => "===",
        }
    }
}

/// One clause, e.g. `>=3.11` or `==3.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpecifier {
    operator: Operator,
    release: Vec<u64>,
    wildcard: bool,
}

impl VersionSpecifier {
    /// Whether `version` satisfies this clause.
    pub fn contains(&self, version: &PythonVersion) -> bool {
        let actual = version.release();
        match self.operator {
            Operator::Equal if self.wildcard => prefix_matches(&actual, &self.release),
            Operator::NotEqual if self.wildcard => !prefix_matches(&actual, &self.release),
            Operator::Equal | Operator::Arbitrary => compare(&actual, &self.release).is_eq(),
            Operator::NotEqual => compare(&actual, &self.release).is_ne(),
            Operator::Less => compare(&actual, &self.release).is_lt(),
            Operator::LessEqual => compare(&actual, &self.release).is_le(),
            Operator::Greater => compare(&actual, &self.release).is_gt(),
            Operator::GreaterEqual => compare(&actual, &self.release).is_ge(),
            Operator::Compatible => {
                let prefix = &self.release[..self.release.len() - 1];
                compare(&actual, &self.release).is_ge() && prefix_matches(&actual, prefix)
            }
        }
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        write!(f, "{}{}", self.operator.as_str(), release.join("."))?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

impl FromStr for VersionSpecifier {
    type Err = DepkitError;

    fn from_str(s: &str) -> Result<Self> {
        let clause = s.trim();
        let invalid = |reason: &str| {
            DepkitError::script(format!("Invalid version specifier '{}': {}", clause, reason))
        };

        let caps = SPECIFIER_REGEX
            .captures(clause)
            .ok_or_else(|| invalid("expected <operator><version>"))?;
        let operator = Operator::parse(&caps["op"]).ok_or_else(|| invalid("unknown operator"))?;
        let release = caps["release"]
            .split('.')
            .map(|n| n.parse::<u64>().map_err(|_| invalid("version component too large")))
            .collect::<Result<Vec<_>>>()?;
        let wildcard = caps.name("wildcard").is_some();

        if wildcard && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(invalid("wildcards are only allowed with == and !="));
        }
        if operator == Operator::Compatible && release.len() < 2 {
            return Err(invalid("~= needs at least two version components"));
        }

        Ok(Self {
            operator,
            release,
            wildcard,
        })
    }
}

/// A comma-separated conjunction of clauses. Empty means "any version".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSpecifiers(Vec<VersionSpecifier>);

impl VersionSpecifiers {
    pub fn contains(&self, version: &PythonVersion) -> bool {
        self.0.iter().all(|clause| clause.contains(version))
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionSpecifier> {
        self.0.iter()
    }
}

impl FromStr for VersionSpecifiers {
    type Err = DepkitError;

    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(VersionSpecifier::from_str)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl fmt::Display for VersionSpecifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&clauses.join(", "))
    }
}

/// Fail unless `running` satisfies the script's `requires-python`.
///
/// # Errors
///
/// Returns a script error if the constraint cannot be parsed, and a
/// `PythonVersion` dependency error if it is not met.
pub fn check_python_version(constraint: &str, script: &Path, running: &PythonVersion) -> Result<()> {
    let specifiers: VersionSpecifiers = constraint.parse()?;
    if specifiers.contains(running) {
        Ok(())
    } else {
        Err(DepkitError::PythonVersion {
            script: script.to_path_buf(),
            constraint: constraint.to_string(),
            running: running.to_string(),
        })
    }
}

/// Compare release tuples, padding the shorter one with zeros.
fn compare(actual: &[u64], wanted: &[u64]) -> std::cmp::Ordering {
    let len = actual.len().max(wanted.len());
    let at = |v: &[u64], i: usize| v.get(i).copied().unwrap_or(0);
    (0..len)
        .map(|i| at(actual, i).cmp(&at(wanted, i)))
        .find(|ord| ord.is_ne())
        .unwrap_or(std::cmp::Ordering::Equal)
}

fn prefix_matches(actual: &[u64], prefix: &[u64]) -> bool {
    prefix
        .iter()
        .enumerate()
        .all(|(i, wanted)| actual.get(i).copied().unwrap_or(0) == *wanted)
}
