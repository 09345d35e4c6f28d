//! Common utilities for benchmarks

use criterion::Criterion;
use kin_core::{Manifest, PackageIdentity};
use kin_registry::MemoryRegistry;

/// Root package of the synthetic family
pub const ROOT: &str = "effect";

/// Configure criterion for kin benchmarks
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
}

/// Name of the `index`th synthetic family member
pub fn member_name(index: usize) -> String {
    format!("@effect/pkg-{}", index)
}

/// Registry holding a family of `members` packages, each published with
/// `versions_per_major` minor releases for every root major in `1..=majors`.
///
/// Every member peers on the root and on its predecessor within the same
/// major, so selection has to agree across the whole chain.
pub fn family_registry(members: usize, majors: u64, versions_per_major: u64) -> MemoryRegistry {
    let registry = MemoryRegistry::new();
    for major in 1..=majors {
        registry.publish(Manifest::new(ROOT, format!("{}.0.0", major)));
        for index in 0..members {
            for minor in 0..versions_per_major {
                let mut manifest = Manifest::new(member_name(index), format!("{}.{}.0", major, minor))
                    .with_peer(ROOT, format!("^{}.0.0", major));
                if index > 0 {
                    manifest = manifest.with_peer(member_name(index - 1), format!("^{}.0.0", major));
                }
                registry.publish(manifest);
            }
        }
    }
    registry
}

/// Every member of the synthetic family requested at `*`
pub fn request_all(members: usize) -> Vec<PackageIdentity> {
    (0..members)
        .map(|index| PackageIdentity::new(member_name(index), "*"))
        .collect()
}

/// A `package.json` with `count` entries in each dependency section
pub fn package_json(count: usize) -> String {
    let section = |prefix: &str| {
        (0..count)
            .map(|index| (format!("{}-{}", prefix, index), serde_json::json!("^1.2.3")))
            .collect::<serde_json::Map<_, _>>()
    };
    serde_json::json!({
        "name": "bench-app",
        "version": "1.0.0",
        "dependencies": section("dep"),
        "devDependencies": section("dev"),
        "peerDependencies": section("peer"),
    })
    .to_string()
}
