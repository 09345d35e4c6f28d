//! Semantic version types with npm range semantics.
//!
//! Provides Version and VersionReq types. A VersionReq is parsed the way npm
//! parses ranges: `||` separated alternatives, each a space separated set of
//! comparators, with caret, tilde, x-range and hyphen sugar desugared into
//! plain `<`, `<=`, `>`, `>=` and `=` comparators.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version requirement (^1.0.0, ~2.3.0, >=1.0.0 <2.0.0, 1.x || 2.x)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    raw: String,
    sets: Vec<Vec<Comparator>>,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

/// Comparison operator for desugared version requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,     // =1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
}

/// Operator as written in a range, before desugaring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Eq,
    Caret,
    Tilde,
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

/// Partial version for ranges (x-ranges leave components out)
#[derive(Debug, Clone, PartialEq, Eq)]
struct PartialVersion {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    prerelease: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid prerelease identifier: {prerelease}")]
    InvalidPrerelease { prerelease: String },

    #[error("Invalid build metadata: {build}")]
    InvalidBuild { build: String },
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// The lowest version of a release (`major.minor.patch-0`)
    fn floor(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            prerelease: Some("0".to_string()),
            ..Self::new(major, minor, patch)
        }
    }

    /// Check if this version satisfies a version requirement
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn same_release(&self, other: &Self) -> bool {
        (self.major, self.minor, self.patch) == (other.major, other.minor, other.patch)
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less, // prerelease < normal
                (None, Some(_)) => Ordering::Greater, // normal > prerelease
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

/// Compare dot separated prerelease identifiers: numeric identifiers compare
/// numerically and sort before alphanumeric ones.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let trimmed = input.strip_prefix('=').unwrap_or(input).trim_start();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        // Split on '+' for build metadata
        let (version_part, build) = match trimmed.split_once('+') {
            Some((_, b)) if b.is_empty() => {
                return Err(VersionError::InvalidBuild {
                    build: b.to_string(),
                })
            },
            Some((v, b)) => (v, Some(b.to_string())),
            None => (trimmed, None),
        };

        // Split on '-' for prerelease
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((_, p)) if p.is_empty() => {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: p.to_string(),
                })
            },
            Some((c, p)) => (c, Some(p.to_string())),
            None => (version_part, None),
        };

        // Parse major.minor.patch
        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        Ok(Version {
            major: parse_number(parts[0])?,
            minor: parse_number(parts[1])?,
            patch: parse_number(parts[2])?,
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

impl VersionReq {
    /// Parse a version requirement string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        let sets = raw
            .split("||")
            .map(|alternative| parse_comparator_set(alternative.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VersionReq {
            raw: raw.to_string(),
            sets,
        })
    }

    /// The requirement as it was written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set_matches(set, version))
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A prerelease only matches a set that names a prerelease of the same
/// `major.minor.patch`.
fn set_matches(set: &[Comparator], version: &Version) -> bool {
    if !set.iter().all(|comparator| comparator.matches(version)) {
        return false;
    }
    if !version.is_prerelease() {
        return true;
    }
    set.iter().any(|comparator| {
        comparator.version.is_prerelease() && comparator.version.same_release(version)
    })
}

fn parse_comparator_set(input: &str) -> Result<Vec<Comparator>, VersionError> {
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return Ok(vec![Comparator::any()]);
    }
    if tokens.len() == 3 && tokens[1] == "-" {
        return parse_hyphen(&tokens[0], &tokens[2]);
    }

    let mut comparators = Vec::new();
    for token in &tokens {
        comparators.extend(desugar(token)?);
    }
    Ok(comparators)
}

/// Split on whitespace, gluing a lone operator (`>= 1.2.3`) to its operand.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending: Option<&str> = None;
    for word in input.split_whitespace() {
        match pending.take() {
            Some(op) => tokens.push(format!("{}{}", op, word)),
            None if is_operator(word) => pending = Some(word),
            None => tokens.push(word.to_string()),
        }
    }
    if let Some(op) = pending {
        tokens.push(op.to_string());
    }
    tokens
}

fn is_operator(word: &str) -> bool {
    matches!(word, ">" | ">=" | "<" | "<=" | "=" | "^" | "~" | "~>")
}

fn split_operator(token: &str) -> (RangeOp, &str) {
    const PREFIXES: [(&str, RangeOp); 8] = [
        (">=", RangeOp::GreaterEq),
        ("<=", RangeOp::LessEq),
        ("~>", RangeOp::Tilde),
        (">", RangeOp::Greater),
        ("<", RangeOp::Less),
        ("=", RangeOp::Eq),
        ("^", RangeOp::Caret),
        ("~", RangeOp::Tilde),
    ];

    for (prefix, op) in PREFIXES {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest);
        }
    }
    (RangeOp::Eq, token)
}

fn desugar(token: &str) -> Result<Vec<Comparator>, VersionError> {
    let (op, rest) = split_operator(token);
    let partial = PartialVersion::parse(rest)?;
    let full = || Comparator::new(Op::GreaterEq, partial.to_version());

    let comparators = match op {
        RangeOp::Eq => match (partial.major, partial.minor, partial.patch) {
            (None, _, _) => vec![Comparator::any()],
            (Some(ma), None, _) => vec![gte(ma, 0, 0), lt_floor(ma + 1, 0, 0)],
            (Some(ma), Some(mi), None) => vec![gte(ma, mi, 0), lt_floor(ma, mi + 1, 0)],
            _ => vec![Comparator::new(Op::Exact, partial.to_version())],
        },
        RangeOp::Caret => match (partial.major, partial.minor, partial.patch) {
            (None, _, _) => vec![Comparator::any()],
            (Some(ma), None, _) => vec![gte(ma, 0, 0), lt_floor(ma + 1, 0, 0)],
            (Some(0), Some(mi), None) => vec![gte(0, mi, 0), lt_floor(0, mi + 1, 0)],
            (Some(ma), Some(mi), None) => vec![gte(ma, mi, 0), lt_floor(ma + 1, 0, 0)],
            (Some(0), Some(0), Some(pa)) => vec![full(), lt_floor(0, 0, pa + 1)],
            (Some(0), Some(mi), Some(_)) => vec![full(), lt_floor(0, mi + 1, 0)],
            (Some(ma), Some(_), Some(_)) => vec![full(), lt_floor(ma + 1, 0, 0)],
        },
        RangeOp::Tilde => match (partial.major, partial.minor, partial.patch) {
            (None, _, _) => vec![Comparator::any()],
            (Some(ma), None, _) => vec![gte(ma, 0, 0), lt_floor(ma + 1, 0, 0)],
            (Some(ma), Some(mi), None) => vec![gte(ma, mi, 0), lt_floor(ma, mi + 1, 0)],
            (Some(ma), Some(mi), Some(_)) => vec![full(), lt_floor(ma, mi + 1, 0)],
        },
        RangeOp::Greater => match (partial.major, partial.minor, partial.patch) {
            (None, _, _) => vec![Comparator::none()],
            (Some(ma), None, _) => vec![gte(ma + 1, 0, 0)],
            (Some(ma), Some(mi), None) => vec![gte(ma, mi + 1, 0)],
            _ => vec![Comparator::new(Op::Greater, partial.to_version())],
        },
        RangeOp::GreaterEq => match (partial.major, partial.minor, partial.patch) {
            (None, _, _) => vec![Comparator::any()],
            (Some(ma), None, _) => vec![gte(ma, 0, 0)],
            (Some(ma), Some(mi), None) => vec![gte(ma, mi, 0)],
            _ => vec![full()],
        },
        RangeOp::Less => match (partial.major, partial.minor, partial.patch) {
            (None, _, _) => vec![Comparator::none()],
            (Some(ma), None, _) => vec![lt_floor(ma, 0, 0)],
            (Some(ma), Some(mi), None) => vec![lt_floor(ma, mi, 0)],
            _ => vec![Comparator::new(Op::Less, partial.to_version())],
        },
        RangeOp::LessEq => match (partial.major, partial.minor, partial.patch) {
            (None, _, _) => vec![Comparator::any()],
            (Some(ma), None, _) => vec![lt_floor(ma + 1, 0, 0)],
            (Some(ma), Some(mi), None) => vec![lt_floor(ma, mi + 1, 0)],
            _ => vec![Comparator::new(Op::LessEq, partial.to_version())],
        },
    };
    Ok(comparators)
}

fn parse_hyphen(from: &str, to: &str) -> Result<Vec<Comparator>, VersionError> {
    let from = PartialVersion::parse(from)?;
    let to = PartialVersion::parse(to)?;
    let mut comparators = Vec::new();

    match (from.major, from.minor, from.patch) {
        (None, _, _) => {},
        (Some(ma), None, _) => comparators.push(gte(ma, 0, 0)),
        (Some(ma), Some(mi), None) => comparators.push(gte(ma, mi, 0)),
        _ => comparators.push(Comparator::new(Op::GreaterEq, from.to_version())),
    }
    match (to.major, to.minor, to.patch) {
        (None, _, _) => {},
        (Some(ma), None, _) => comparators.push(lt_floor(ma + 1, 0, 0)),
        (Some(ma), Some(mi), None) => comparators.push(lt_floor(ma, mi + 1, 0)),
        _ => comparators.push(Comparator::new(Op::LessEq, to.to_version())),
    }

    if comparators.is_empty() {
        comparators.push(Comparator::any());
    }
    Ok(comparators)
}

/// Largest component npm accepts (`Number.MAX_SAFE_INTEGER`)
pub const MAX_COMPONENT: u64 = 9_007_199_254_740_991;

/// One numeric component; capping it keeps the `+ 1` bounds in range
/// desugaring from overflowing.
fn parse_number(component: &str) -> Result<u64, VersionError> {
    component
        .parse::<u64>()
        .ok()
        .filter(|number| *number <= MAX_COMPONENT)
        .ok_or_else(|| VersionError::InvalidNumber {
            component: component.to_string(),
        })
}

fn gte(major: u64, minor: u64, patch: u64) -> Comparator {
    Comparator::new(Op::GreaterEq, Version::new(major, minor, patch))
}

fn lt_floor(major: u64, minor: u64, patch: u64) -> Comparator {
    Comparator::new(Op::Less, Version::floor(major, minor, patch))
}

impl Comparator {
    /// Create a comparator
    pub fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Matches every release version
    fn any() -> Self {
        gte(0, 0, 0)
    }

    /// Matches nothing
    fn none() -> Self {
        lt_floor(0, 0, 0)
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Exact => version.cmp(&self.version) == Ordering::Equal,
            Op::Greater => version > &self.version,
            Op::GreaterEq => version >= &self.version,
            Op::Less => version < &self.version,
            Op::LessEq => version <= &self.version,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            Op::Exact => "=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
        };
        write!(f, "{}{}", op, self.version)
    }
}

impl PartialVersion {
    fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        let input = input.strip_prefix('v').unwrap_or(input);
        let version_part = input.split_once('+').map_or(input, |(v, _)| v);
        let (core, prerelease) = match version_part.split_once('-') {
            Some((_, p)) if p.is_empty() => {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: p.to_string(),
                })
            },
            Some((c, p)) => (c, Some(p.to_string())),
            None => (version_part, None),
        };

        if core.is_empty() {
            return Ok(Self {
                major: None,
                minor: None,
                patch: None,
                prerelease: None,
            });
        }

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let component = |index: usize| -> Result<Option<u64>, VersionError> {
            match parts.get(index) {
                None => Ok(None),
                Some(part) if matches!(*part, "x" | "X" | "*") => Ok(None),
                Some(part) => parse_number(part).map(Some),
            }
        };

        let major = component(0)?;
        let minor = major.and(component(1)?);
        let patch = minor.and(component(2)?);

        if let Some(prerelease) = &prerelease {
            if patch.is_none() {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: prerelease.clone(),
                });
            }
        }

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
        })
    }

    /// Convert to a full version (filling missing parts with 0)
    fn to_version(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }
}

/// npm's `satisfies`: false whenever either side fails to parse.
pub fn satisfies(version: &str, range: &str) -> bool {
    match (Version::from_str(version), VersionReq::parse(range)) {
        (Ok(version), Ok(req)) => req.matches(&version),
        _ => false,
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn version_round_trip(
            major in 0u64..1000,
            minor in 0u64..1000,
            patch in 0u64..1000,
            prerelease in prop::option::of("[a-zA-Z0-9][a-zA-Z0-9.-]*"),
            build in prop::option::of("[a-zA-Z0-9.-]+")
        ) {
            let original = Version {
                major,
                minor,
                patch,
                prerelease: prerelease.clone(),
                build: build.clone(),
            };

            let serialized = original.to_string();
            let parsed = Version::from_str(&serialized).unwrap();

            prop_assert_eq!(parsed, original);
        }
    }

    proptest! {
        #[test]
        fn version_comparison_transitivity(
            a in (0u64..100, 0u64..100, 0u64..100),
            b in (0u64..100, 0u64..100, 0u64..100),
            c in (0u64..100, 0u64..100, 0u64..100),
        ) {
            let a = Version::new(a.0, a.1, a.2);
            let b = Version::new(b.0, b.1, b.2);
            let c = Version::new(c.0, c.1, c.2);

            if a < b && b < c {
                prop_assert!(a < c, "Transitivity violated: {} < {} < {} but {} >= {}", a, b, c, a, c);
            }
            if a > b && b > c {
                prop_assert!(a > c, "Transitivity violated: {} > {} > {} but {} <= {}", a, b, c, a, c);
            }
        }
    }

    proptest! {
        #[test]
        fn ranges_built_from_a_version_contain_it(
            major in 0u64..50,
            minor in 0u64..50,
            patch in 0u64..50,
        ) {
            let version = Version::new(major, minor, patch);
            for prefix in ["^", "~", ">=", "<=", "="] {
                let range = VersionReq::parse(&format!("{}{}", prefix, version)).unwrap();
                prop_assert!(range.matches(&version), "{}{} should match {}", prefix, version, version);
            }
            let caret = VersionReq::parse(&format!("^{}", version)).unwrap();
            prop_assert!(!caret.matches(&Version::new(major + 1, 0, 0)));
        }
    }
}
