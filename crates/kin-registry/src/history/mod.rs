//! Family manifests as published in the canonical monorepo
//!
//! Release tags of the family repository are named after the released package
//! (`@effect/schema@0.64.1`), so the manifest of any sibling at that release
//! lives at `{raw_url}/{tag}/{directory}/package.json`.

use async_trait::async_trait;
use kin_core::error::KinError;
use kin_core::{Family, Manifest, PackageIdentity};
use reqwest::{header, Client, StatusCode};
use tracing::debug;

use crate::{ManifestHistory, PackageRegistry, RegistryResult};

/// Fetches historical manifests from raw repository files
#[derive(Debug, Clone)]
pub struct MonorepoHistory<R> {
    registry: R,
    client: Client,
    family: Family,
}

impl<R: PackageRegistry> MonorepoHistory<R> {
    pub fn new(registry: R, client: Client, family: Family) -> Self {
        Self {
            registry,
            client,
            family,
        }
    }

    fn manifest_url(&self, tag: &PackageIdentity, directory: &str) -> String {
        format!(
            "{}/{}/{}/package.json",
            self.family.raw_url.trim_end_matches('/'),
            tag,
            directory
        )
    }
}

#[async_trait]
impl<R: PackageRegistry> ManifestHistory for MonorepoHistory<R> {
    async fn fetch_family_manifest(
        &self,
        tag: &PackageIdentity,
        name: &str,
    ) -> RegistryResult<Manifest> {
        // The published manifest only tells us where the package lives
        let published = self.registry.view(&PackageIdentity::latest(name)).await?;
        let directory =
            self.family
                .source_directory(&published)
                .ok_or_else(|| KinError::NotAFamilyPackage {
                    package: name.to_string(),
                })?;

        let url = self.manifest_url(tag, &directory);
        debug!("Fetching {} at {} from {}", name, tag, url);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| KinError::network(format!("Failed to fetch {}: {}", url, e), e))?;

        match response.status() {
            StatusCode::OK => {
                let contents = response
                    .text()
                    .await
                    .map_err(|e| KinError::network(format!("Failed to read {}: {}", url, e), e))?;
                Manifest::from_json(&contents)
            },
            StatusCode::NOT_FOUND => Err(KinError::VersionNotFound {
                name: name.to_string(),
                range: tag.to_string(),
            }),
            status => Err(KinError::Network {
                message: format!("{} returned status {}", url, status),
                source: None,
            }),
        }
    }
}
