//! Package family description.
//!
//! A family is a root package plus every package sharing its naming prefix,
//! all developed in one canonical source repository.

use super::{Manifest, PackageIdentity};
use crate::utils::is_safe_path;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Naming and source conventions of a package family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Family {
    /// The root package every member peer-depends on
    pub root: String,
    /// Naming prefix shared by members
    pub prefix: String,
    /// `owner/repo` slug of the canonical source repository
    pub repository: String,
    /// Base URL serving raw files of the repository by tag
    pub raw_url: String,
    /// Version prefix marking workspace-local edges
    pub workspace_protocol: String,
}

impl Default for Family {
    fn default() -> Self {
        Self {
            root: "effect".to_string(),
            prefix: "@effect/".to_string(),
            repository: "effect-ts/effect".to_string(),
            raw_url: "https://raw.githubusercontent.com/Effect-TS/effect".to_string(),
            workspace_protocol: "workspace:".to_string(),
        }
    }
}

impl Family {
    pub fn is_root(&self, name: &str) -> bool {
        name == self.root
    }

    /// Prefixed family package, excluding the root itself
    pub fn is_member(&self, name: &str) -> bool {
        !self.is_root(name) && name.starts_with(&self.prefix)
    }

    /// Root or member
    pub fn contains(&self, name: &str) -> bool {
        self.is_root(name) || self.is_member(name)
    }

    pub fn is_workspace_link(&self, range: &str) -> bool {
        range.starts_with(&self.workspace_protocol)
    }

    /// Root package identity at `version`
    pub fn root_identity(&self, version: impl Into<String>) -> PackageIdentity {
        PackageIdentity::new(self.root.clone(), version)
    }

    /// Directory of the package inside the canonical repository.
    ///
    /// Known only when the manifest's repository object points at the
    /// canonical repository and names a safe relative directory.
    pub fn source_directory(&self, manifest: &Manifest) -> Option<String> {
        let repository = manifest.repository.as_ref()?;
        let directory = repository.directory()?;
        let slug = format!("/{}", self.repository.to_lowercase());
        if !repository.url().to_lowercase().contains(&slug) {
            return None;
        }
        let directory = directory.trim_matches('/');
        if directory.is_empty() || !is_safe_path(Path::new(directory)) {
            return None;
        }
        Some(directory.to_string())
    }
}
