//! Package identities (`name@version`).
//!
//! The same type carries either an exact installed version or a requested
//! range; callers keep track of which one they hold.

use super::{Version, VersionReq};
use crate::error::KinError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dist-tag assumed when a specifier has no version
pub const LATEST_TAG: &str = "latest";

/// A package name paired with an exact version or a version range
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub name: String,
    pub version: String,
}

impl PackageIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Identity with the `latest` dist-tag as version
    pub fn latest(name: impl Into<String>) -> Self {
        Self::new(name, LATEST_TAG)
    }

    /// The version as an exact semantic version, if it is one
    pub fn exact_version(&self) -> Option<Version> {
        self.version.parse().ok()
    }

    /// Check whether the version field is an exact version
    pub fn is_exact(&self) -> bool {
        self.exact_version().is_some()
    }

    /// Check whether the exact version satisfies `range`
    ///
    /// Unparseable versions or ranges never satisfy.
    pub fn satisfies(&self, range: &str) -> bool {
        match (self.exact_version(), VersionReq::parse(range)) {
            (Some(version), Ok(req)) => req.matches(&version),
            _ => false,
        }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl FromStr for PackageIdentity {
    type Err = KinError;

    /// Parse `name`, `name@range`, `@scope/name` or `@scope/name@range`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        let invalid = || KinError::InvalidSpecifier {
            spec: s.to_string(),
        };

        // Skip the scope marker so it is not mistaken for the version separator
        let split = spec
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '@')
            .map(|(index, _)| index);

        let (name, version) = match split {
            Some(index) => (&spec[..index], &spec[index + 1..]),
            None => (spec, ""),
        };

        if name.is_empty() || name == "@" || name.ends_with('/') {
            return Err(invalid());
        }
        if name.starts_with('@') && !name.contains('/') {
            return Err(invalid());
        }

        let version = if version.is_empty() {
            LATEST_TAG
        } else {
            version
        };
        Ok(Self::new(name, version))
    }
}
