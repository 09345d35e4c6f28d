//! Registry and source-history collaborators for kin
//!
//! This crate provides the two lookups the resolver depends on: listing and
//! viewing published manifests in an npm registry, and fetching a family
//! package's manifest as it existed in the family's canonical repository at a
//! given release tag. HTTP implementations come with retry logic and caching;
//! in-memory implementations serve tests, benchmarks and offline runs.

pub mod api;
pub mod cache;
pub mod client;
pub mod history;
pub mod memory;

// Re-export main types
pub use api::{PackageMetadataResponse, VersionMetadata};
pub use cache::{CacheEntry, CacheStats, MetadataCache};
pub use client::{AuthConfig, RegistryClient, RetryConfig};
pub use history::MonorepoHistory;
pub use memory::{MemoryHistory, MemoryRegistry};

use async_trait::async_trait;
use kin_core::error::KinError;
use kin_core::{Manifest, PackageIdentity};

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, KinError>;

/// Lookup of published manifests
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Every published manifest of `spec.name` satisfying `spec.version`
    /// (a range or a dist-tag), ascending by version.
    async fn list(&self, spec: &PackageIdentity) -> RegistryResult<Vec<Manifest>>;

    /// The single manifest `spec` resolves to: the exact version, the
    /// dist-tag's version, or the highest version satisfying the range.
    async fn view(&self, spec: &PackageIdentity) -> RegistryResult<Manifest>;
}

/// Lookup of family manifests in the canonical source repository
#[async_trait]
pub trait ManifestHistory: Send + Sync {
    /// The manifest of `name` as it existed at release tag `tag`
    /// (`root@version`). Fails with `NotAFamilyPackage` when `name` is not
    /// developed in the family repository.
    async fn fetch_family_manifest(
        &self,
        tag: &PackageIdentity,
        name: &str,
    ) -> RegistryResult<Manifest>;
}
