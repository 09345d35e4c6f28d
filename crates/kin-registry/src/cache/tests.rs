//! Unit tests for the metadata cache

use super::*;
use std::collections::HashMap;

fn packument(name: &str) -> PackageMetadataResponse {
    PackageMetadataResponse {
        name: name.to_string(),
        dist_tags: HashMap::from([("latest".to_string(), "1.0.0".to_string())]),
        versions: HashMap::new(),
    }
}

#[test]
fn test_cache_entry_freshness() {
    let entry = CacheEntry::new(packument("effect"), DEFAULT_TTL);
    assert!(entry.is_fresh());

    let expired = CacheEntry::new(packument("effect"), Duration::ZERO);
    assert!(!expired.is_fresh());
}

#[test]
fn test_insert_and_get() {
    let cache = MetadataCache::new();
    cache.insert("effect", packument("effect"));

    let cached = cache.get("effect").unwrap();
    assert_eq!(cached.name, "effect");
    assert!(cache.get("@effect/schema").is_none());
}

#[test]
fn test_stale_entries_are_evicted_on_get() {
    let cache = MetadataCache::with_ttl(Duration::ZERO);
    cache.insert("effect", packument("effect"));

    assert!(cache.get("effect").is_none());
    assert_eq!(cache.stats().total_entries, 0);
}

#[test]
fn test_stats() {
    let cache = MetadataCache::new();
    assert_eq!(
        cache.stats(),
        CacheStats {
            total_entries: 0,
            fresh_entries: 0,
            stale_entries: 0
        }
    );

    cache.insert("effect", packument("effect"));
    cache.insert("@effect/schema", packument("@effect/schema"));

    let stats = cache.stats();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.fresh_entries, 2);
    assert_eq!(stats.stale_entries, 0);
}

#[test]
fn test_clear() {
    let cache = MetadataCache::new();
    cache.insert("effect", packument("effect"));
    cache.clear();
    assert!(cache.get("effect").is_none());
}

#[test]
fn test_cleanup() {
    let cache = MetadataCache::with_ttl(Duration::ZERO);
    cache.insert("effect", packument("effect"));
    cache.insert("@effect/schema", packument("@effect/schema"));

    assert_eq!(cache.cleanup(), 2);
    assert_eq!(cache.stats().total_entries, 0);
}
