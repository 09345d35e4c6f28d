//! package.json manifests.
//!
//! Manifests are decoded from JSON (local file, registry response or a
//! historical snapshot) and never mutated afterwards.

use super::{DependencyKind, PackageIdentity, Version};
use crate::error::{KinError, KinResult};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Package name to version range
pub type DependencyMap = BTreeMap<String, String>;

/// The subset of package.json the resolver cares about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: DependencyMap,
    #[serde(
        default,
        rename = "devDependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub dev_dependencies: DependencyMap,
    #[serde(
        default,
        rename = "peerDependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub peer_dependencies: DependencyMap,
}

/// Repository information, either `"github:user/repo"` or `{ url, directory }`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Repository {
    Simple(String),
    Detailed {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directory: Option<String>,
    },
}

impl Manifest {
    /// Create a manifest with no dependencies
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            repository: None,
            dependencies: DependencyMap::new(),
            dev_dependencies: DependencyMap::new(),
            peer_dependencies: DependencyMap::new(),
        }
    }

    /// Add a dependency to the given section
    pub fn with_dependency(
        mut self,
        kind: DependencyKind,
        name: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        let section = match kind {
            DependencyKind::Normal => &mut self.dependencies,
            DependencyKind::Dev => &mut self.dev_dependencies,
            DependencyKind::Peer => &mut self.peer_dependencies,
        };
        section.insert(name.into(), range.into());
        self
    }

    /// Shorthand for a peer dependency
    pub fn with_peer(self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.with_dependency(DependencyKind::Peer, name, range)
    }

    /// Set the repository
    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Decode and validate a package.json document
    pub fn from_json(contents: &str) -> KinResult<Self> {
        let malformed = |issue: String| KinError::MalformedManifest {
            contents: contents.to_string(),
            issue,
        };

        let manifest: Manifest =
            serde_json::from_str(contents).map_err(|e| malformed(e.to_string()))?;
        match manifest.validation_issue() {
            Some(issue) => Err(malformed(issue)),
            None => Ok(manifest),
        }
    }

    /// First schema violation, if any
    pub fn validation_issue(&self) -> Option<String> {
        if self.name.is_empty() {
            return Some("name: expected a non-empty string".to_string());
        }
        if self.version.is_empty() {
            return Some("version: expected a non-empty string".to_string());
        }
        for kind in DependencyKind::ALL {
            for (name, range) in self.dependencies_of(kind) {
                if name.is_empty() || range.is_empty() {
                    return Some(format!(
                        "{}[\"{}\"]: expected a non-empty string",
                        kind.field_name(),
                        name
                    ));
                }
            }
        }
        None
    }

    /// Identity of this exact manifest
    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(self.name.clone(), self.version.clone())
    }

    /// The version as a semantic version, if valid
    pub fn parsed_version(&self) -> Option<Version> {
        self.version.parse().ok()
    }

    /// Dependencies declared in one section
    pub fn dependencies_of(&self, kind: DependencyKind) -> &DependencyMap {
        match kind {
            DependencyKind::Normal => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
        }
    }

    /// Declared peer range for `name`
    pub fn peer_range(&self, name: &str) -> Option<&str> {
        self.peer_dependencies.get(name).map(String::as_str)
    }

    /// Union of every section as `name@range`, deduplicated, in declaration order
    pub fn all_declared_dependencies(&self) -> IndexSet<PackageIdentity> {
        DependencyKind::ALL
            .iter()
            .flat_map(|kind| self.dependencies_of(*kind))
            .map(|(name, range)| PackageIdentity::new(name.clone(), range.clone()))
            .collect()
    }
}

impl Repository {
    pub fn url(&self) -> &str {
        match self {
            Repository::Simple(url) => url,
            Repository::Detailed { url, .. } => url,
        }
    }

    pub fn directory(&self) -> Option<&str> {
        match self {
            Repository::Simple(_) => None,
            Repository::Detailed { directory, .. } => directory.as_deref(),
        }
    }
}
