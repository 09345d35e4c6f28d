//! Metadata caching with TTL support
//!
//! One resolution asks for the same packument many times (every inner
//! fixpoint run lists all requested packages again), so the client keeps
//! responses for a while.

use crate::api::PackageMetadataResponse;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Default time-to-live of a cached packument
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache entry with TTL
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub metadata: PackageMetadataResponse,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(metadata: PackageMetadataResponse, ttl: Duration) -> Self {
        Self {
            metadata,
            stored_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

/// In-memory packument cache keyed by package name
#[derive(Debug)]
pub struct MetadataCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Get cached metadata if fresh; stale entries are evicted
    pub fn get(&self, package_name: &str) -> Option<PackageMetadataResponse> {
        let fresh = {
            let entry = self.entries.get(package_name)?;
            entry.is_fresh().then(|| entry.metadata.clone())
        };
        if fresh.is_none() {
            self.entries.remove(package_name);
        }
        fresh
    }

    pub fn insert(&self, package_name: impl Into<String>, metadata: PackageMetadataResponse) {
        self.entries
            .insert(package_name.into(), CacheEntry::new(metadata, self.ttl));
    }

    pub fn stats(&self) -> CacheStats {
        let fresh_entries = self.entries.iter().filter(|e| e.is_fresh()).count();
        let total_entries = self.entries.len();
        CacheStats {
            total_entries,
            fresh_entries,
            stale_entries: total_entries - fresh_entries,
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove stale entries, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh());
        before.saturating_sub(self.entries.len())
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
