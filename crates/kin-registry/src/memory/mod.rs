//! In-memory registry and history
//!
//! Backed by the same packument selection as the HTTP client, so tests and
//! benchmarks exercise real range and dist-tag semantics without a network.

use async_trait::async_trait;
use dashmap::DashMap;
use kin_core::error::KinError;
use kin_core::{Manifest, PackageIdentity, Version};

use crate::api::{PackageMetadataResponse, VersionMetadata};
use crate::{ManifestHistory, PackageRegistry, RegistryResult};

/// Registry holding packuments in memory
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    packages: DashMap<String, PackageMetadataResponse>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `manifests`
    pub fn with_manifests(manifests: impl IntoIterator<Item = Manifest>) -> Self {
        let registry = Self::new();
        for manifest in manifests {
            registry.publish(manifest);
        }
        registry
    }

    /// Publish a version, moving `latest` to the highest stable version
    pub fn publish(&self, manifest: Manifest) {
        let mut packument = self.packages.entry(manifest.name.clone()).or_default();
        packument.name = manifest.name.clone();
        packument
            .versions
            .insert(manifest.version.clone(), VersionMetadata::from(&manifest));

        let latest = packument
            .versions
            .keys()
            .filter_map(|v| v.parse::<Version>().ok())
            .filter(|v| !v.is_prerelease())
            .max();
        if let Some(latest) = latest {
            packument
                .dist_tags
                .insert("latest".to_string(), latest.to_string());
        }
    }

    /// Point a dist-tag at a published version
    pub fn tag(&self, name: &str, tag: &str, version: &str) {
        if let Some(mut packument) = self.packages.get_mut(name) {
            packument
                .dist_tags
                .insert(tag.to_string(), version.to_string());
        }
    }

    fn packument(&self, name: &str) -> RegistryResult<PackageMetadataResponse> {
        self.packages
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| KinError::PackageNotFound {
                name: name.to_string(),
            })
    }
}

#[async_trait]
impl PackageRegistry for MemoryRegistry {
    async fn list(&self, spec: &PackageIdentity) -> RegistryResult<Vec<Manifest>> {
        self.packument(&spec.name)?.list(&spec.name, &spec.version)
    }

    async fn view(&self, spec: &PackageIdentity) -> RegistryResult<Manifest> {
        self.packument(&spec.name)?.view(&spec.name, &spec.version)
    }
}

/// History keyed by `(release tag, package name)`
///
/// Packages never recorded for a tag are reported as `NotAFamilyPackage`.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    manifests: DashMap<(PackageIdentity, String), Manifest>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `manifest` as it existed at release `tag`
    pub fn record(&self, tag: &PackageIdentity, manifest: Manifest) {
        self.manifests
            .insert((tag.clone(), manifest.name.clone()), manifest);
    }
}

#[async_trait]
impl ManifestHistory for MemoryHistory {
    async fn fetch_family_manifest(
        &self,
        tag: &PackageIdentity,
        name: &str,
    ) -> RegistryResult<Manifest> {
        self.manifests
            .get(&(tag.clone(), name.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| KinError::NotAFamilyPackage {
                package: name.to_string(),
            })
    }
}
