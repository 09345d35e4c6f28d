//! Peer compatibility evaluation
//!
//! Partitions a manifest's declared peers against a pool of available
//! package versions. Pure and total: unparseable versions or ranges simply
//! land in `invalid`.

use std::collections::BTreeSet;

use kin_core::{DependencyMap, Manifest, PackageIdentity};

/// Outcome of matching one manifest's peers against a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMatchResult {
    /// The evaluated manifest
    pub package: PackageIdentity,
    /// Declared peer ranges, by name
    pub declared: DependencyMap,
    /// Declared peers with no candidate in the pool, as `name@range`
    pub missing: BTreeSet<PackageIdentity>,
    /// Pool candidates satisfying the declared range
    pub valid: BTreeSet<PackageIdentity>,
    /// Pool candidates violating the declared range
    pub invalid: BTreeSet<PackageIdentity>,
}

/// A peer requirement that is not met
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedPeer {
    pub name: String,
    pub range: String,
    /// Versions present in the pool, none of which satisfy `range`
    pub found: Vec<String>,
}

impl UnsatisfiedPeer {
    pub fn is_missing(&self) -> bool {
        self.found.is_empty()
    }
}

/// Evaluate `manifest`'s peer dependencies against `available`
pub fn match_peers<'a>(
    manifest: &Manifest,
    available: impl IntoIterator<Item = &'a PackageIdentity>,
) -> PeerMatchResult {
    let declared = &manifest.peer_dependencies;
    let mut valid = BTreeSet::new();
    let mut invalid = BTreeSet::new();

    for candidate in available {
        let Some(range) = declared.get(&candidate.name) else {
            continue;
        };
        if candidate.satisfies(range) {
            valid.insert(candidate.clone());
        } else {
            invalid.insert(candidate.clone());
        }
    }

    let missing = declared
        .iter()
        .filter(|(name, _)| {
            !valid.iter().any(|v: &PackageIdentity| &v.name == *name)
                && !invalid.iter().any(|i: &PackageIdentity| &i.name == *name)
        })
        .map(|(name, range)| PackageIdentity::new(name.clone(), range.clone()))
        .collect();

    PeerMatchResult {
        package: manifest.identity(),
        declared: declared.clone(),
        missing,
        valid,
        invalid,
    }
}

impl PeerMatchResult {
    /// Whether exactly `identity` (name and version) is a valid peer
    pub fn has_valid(&self, identity: &PackageIdentity) -> bool {
        self.valid.contains(identity)
    }

    /// Whether every declared peer has a valid candidate.
    ///
    /// With `consider_missing_valid`, a peer absent from the pool counts as
    /// satisfied since it may be installed in the same run. Audits pass false.
    pub fn has_all_peers(&self, consider_missing_valid: bool) -> bool {
        self.declared.keys().all(|name| {
            self.valid.iter().any(|v| &v.name == name)
                || (consider_missing_valid && self.missing.iter().any(|m| &m.name == name))
        })
    }

    /// Declared peers that have no valid candidate, missing ones included
    pub fn unsatisfied(&self) -> Vec<UnsatisfiedPeer> {
        self.declared
            .iter()
            .filter(|(name, _)| !self.valid.iter().any(|v| &v.name == *name))
            .map(|(name, range)| UnsatisfiedPeer {
                name: name.clone(),
                range: range.clone(),
                found: self
                    .invalid
                    .iter()
                    .filter(|i| &i.name == name)
                    .map(|i| i.version.clone())
                    .collect(),
            })
            .collect()
    }
}
