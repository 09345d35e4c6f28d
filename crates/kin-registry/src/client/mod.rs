//! HTTP client implementation with connection pooling and retry logic

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kin_core::error::KinError;
use kin_core::{Manifest, PackageIdentity};
use reqwest::{header, Client, ClientBuilder, StatusCode};
use tracing::{debug, warn};

use crate::api::PackageMetadataResponse;
use crate::cache::MetadataCache;
use crate::{PackageRegistry, RegistryResult};

pub use kin_core::DEFAULT_REGISTRY;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Authentication configuration for registry access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
}

/// HTTP client for npm registry lookups
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    retry_config: RetryConfig,
    base_url: String,
    cache: Arc<MetadataCache>,
}

impl RegistryClient {
    /// Client for the public registry without authentication
    pub fn new() -> RegistryResult<Self> {
        Self::with_config(DEFAULT_REGISTRY, AuthConfig::default(), RetryConfig::default())
    }

    /// Client for `base_url` with custom authentication and retry policy
    pub fn with_config(
        base_url: impl Into<String>,
        auth: AuthConfig,
        retry_config: RetryConfig,
    ) -> RegistryResult<Self> {
        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .user_agent(concat!("kin/", env!("CARGO_PKG_VERSION")));

        if let Some(value) = authorization_header(&auth) {
            let value = header::HeaderValue::from_str(&value)
                .map_err(|e| KinError::network("Invalid registry credentials".to_string(), e))?;
            let mut headers = header::HeaderMap::new();
            headers.insert(header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|e| KinError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: Arc::new(MetadataCache::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client, shared with other fetchers
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Execute an operation with exponential backoff retry on recoverable errors
    async fn with_retry<F, Fut, T>(&self, what: &str, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) if error.is_recoverable() && attempt < self.retry_config.max_retries => {
                    attempt += 1;
                    warn!(
                        "{} failed ({}), retrying in {:?} [{}/{}]",
                        what, error, delay, attempt, self.retry_config.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                        ),
                        self.retry_config.max_delay,
                    );
                },
                Err(error) => return Err(error),
            }
        }
    }

    /// Fetch the packument of `package_name`, served from cache when fresh
    pub async fn fetch_metadata(&self, package_name: &str) -> RegistryResult<PackageMetadataResponse> {
        if let Some(cached) = self.cache.get(package_name) {
            debug!("Using cached metadata for {}", package_name);
            return Ok(cached);
        }

        let url = format!("{}/{}", self.base_url, encode_package_name(package_name));
        let metadata = self
            .with_retry(package_name, || async {
                let response = self
                    .client
                    .get(&url)
                    .header(header::ACCEPT, "application/json")
                    .send()
                    .await
                    .map_err(|e| KinError::network(format!("Failed to fetch metadata: {}", e), e))?;

                match response.status() {
                    StatusCode::OK => response.json::<PackageMetadataResponse>().await.map_err(|e| {
                        KinError::network(format!("Failed to parse metadata: {}", e), e)
                    }),
                    StatusCode::NOT_FOUND => Err(KinError::PackageNotFound {
                        name: package_name.to_string(),
                    }),
                    status => Err(KinError::Network {
                        message: format!("Registry returned status {}: {}", status, package_name),
                        source: None,
                    }),
                }
            })
            .await?;

        self.cache.insert(package_name, metadata.clone());
        Ok(metadata)
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }
}

#[async_trait]
impl PackageRegistry for RegistryClient {
    async fn list(&self, spec: &PackageIdentity) -> RegistryResult<Vec<Manifest>> {
        self.fetch_metadata(&spec.name)
            .await?
            .list(&spec.name, &spec.version)
    }

    async fn view(&self, spec: &PackageIdentity) -> RegistryResult<Manifest> {
        self.fetch_metadata(&spec.name)
            .await?
            .view(&spec.name, &spec.version)
    }
}

fn authorization_header(auth: &AuthConfig) -> Option<String> {
    use base64::{engine::general_purpose, Engine as _};

    if let Some(token) = &auth.token {
        return Some(format!("Bearer {}", token));
    }
    match (&auth.username, &auth.password) {
        (Some(username), Some(password)) => Some(format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", username, password))
        )),
        _ => None,
    }
}

/// Encode package name for URL (handle scoped packages)
fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        // Scoped package: @org/pkg → @org%2fpkg
        name.replace('/', "%2f")
    } else {
        name.to_string()
    }
}
