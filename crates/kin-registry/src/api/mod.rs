//! npm registry API response types
//!
//! The packument (`GET /{name}`) carries every published version's manifest.
//! Version selection for `list`/`view` is implemented here so the HTTP client
//! and the in-memory registry agree on it.

use std::collections::{BTreeMap, HashMap};

use kin_core::error::KinError;
use kin_core::{DependencyMap, Manifest, Repository, Version, VersionReq};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RegistryResult;

/// Package metadata response from npm registry
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PackageMetadataResponse {
    /// Package name
    #[serde(default)]
    pub name: String,
    /// Dist-tags such as `latest` and `next`
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    /// All versions metadata
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
}

/// Metadata for a specific package version
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VersionMetadata {
    pub version: String,
    /// Either a string or `{ type, url, directory }`; kept loose since
    /// published metadata is not always well formed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Value>,
    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, String>>,
    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: Option<BTreeMap<String, String>>,
    #[serde(rename = "peerDependencies", default)]
    pub peer_dependencies: Option<BTreeMap<String, String>>,
}

impl VersionMetadata {
    /// Convert to a manifest of package `name`
    pub fn to_manifest(&self, name: &str) -> Manifest {
        Manifest {
            name: name.to_string(),
            version: self.version.clone(),
            repository: self.repository.as_ref().and_then(parse_repository),
            dependencies: self.dependencies.clone().unwrap_or_default(),
            dev_dependencies: self.dev_dependencies.clone().unwrap_or_default(),
            peer_dependencies: self.peer_dependencies.clone().unwrap_or_default(),
        }
    }
}

impl From<&Manifest> for VersionMetadata {
    fn from(manifest: &Manifest) -> Self {
        let section = |map: &DependencyMap| (!map.is_empty()).then(|| map.clone());
        Self {
            version: manifest.version.clone(),
            repository: manifest
                .repository
                .as_ref()
                .and_then(|repository| serde_json::to_value(repository).ok()),
            dependencies: section(&manifest.dependencies),
            dev_dependencies: section(&manifest.dev_dependencies),
            peer_dependencies: section(&manifest.peer_dependencies),
        }
    }
}

fn parse_repository(value: &Value) -> Option<Repository> {
    match value {
        Value::String(url) => Some(Repository::Simple(url.clone())),
        Value::Object(fields) => {
            let url = fields.get("url")?.as_str()?.to_string();
            let directory = fields
                .get("directory")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(Repository::Detailed { url, directory })
        },
        _ => None,
    }
}

impl PackageMetadataResponse {
    /// Published versions with a valid semantic version, ascending
    pub fn manifests(&self, name: &str) -> Vec<(Version, Manifest)> {
        let mut manifests: Vec<_> = self
            .versions
            .values()
            .filter_map(|metadata| {
                let version = metadata.version.parse::<Version>().ok()?;
                Some((version, metadata.to_manifest(name)))
            })
            .collect();
        manifests.sort_by(|(a, _), (b, _)| a.cmp(b));
        manifests
    }

    /// Every manifest matching `range`, which may also be a dist-tag
    pub fn list(&self, name: &str, range: &str) -> RegistryResult<Vec<Manifest>> {
        let not_found = || KinError::VersionNotFound {
            name: name.to_string(),
            range: range.to_string(),
        };

        if let Some(tagged) = self.dist_tags.get(range) {
            return self
                .versions
                .get(tagged)
                .map(|metadata| vec![metadata.to_manifest(name)])
                .ok_or_else(not_found);
        }

        let req = VersionReq::parse(range).map_err(|_| not_found())?;
        let matching: Vec<Manifest> = self
            .manifests(name)
            .into_iter()
            .filter(|(version, _)| req.matches(version))
            .map(|(_, manifest)| manifest)
            .collect();

        if matching.is_empty() {
            Err(not_found())
        } else {
            Ok(matching)
        }
    }

    /// The one manifest `spec` resolves to
    pub fn view(&self, name: &str, spec: &str) -> RegistryResult<Manifest> {
        if let Some(metadata) = self.versions.get(spec) {
            return Ok(metadata.to_manifest(name));
        }
        let mut matching = self.list(name, spec)?;
        matching.pop().ok_or_else(|| KinError::VersionNotFound {
            name: name.to_string(),
            range: spec.to_string(),
        })
    }
}
