//! Transitive peer graph walker
//!
//! Starting from a set of packages about to be installed, follows the
//! workspace-linked peers and dependencies declared in each package's manifest
//! as it exists in the family repository at the seed's release tag. Linked
//! siblings are collected for installation; every other peer range is reported.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use futures::future::join_all;
use kin_core::error::KinError;
use kin_core::{Family, PackageIdentity};
use kin_registry::ManifestHistory;
use tracing::{debug, warn};

use crate::ResolverResult;

/// Outcome of a walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredPeers {
    /// Family packages to install in addition to the seeds
    pub peers: BTreeSet<PackageIdentity>,
    /// Peer ranges outside the family workspace, last writer wins
    pub other_peers: BTreeMap<String, String>,
    /// Packages that turned out not to live in the family repository
    pub non_family: BTreeSet<String>,
    /// Number of manifests fetched
    pub fetched: usize,
}

/// One unit of work: a package name looked up at a release tag
type WalkEntry = (PackageIdentity, String);

pub struct PeerWalker<'a, H: ?Sized> {
    history: &'a H,
    family: &'a Family,
}

impl<'a, H: ManifestHistory + ?Sized> PeerWalker<'a, H> {
    pub fn new(history: &'a H, family: &'a Family) -> Self {
        Self { history, family }
    }

    /// Walk from `seeds` and return the additional packages they need.
    ///
    /// Each level of the queue is fetched concurrently and processed in queue
    /// order. An entry is enqueued at most once per walk, so cycles terminate.
    pub async fn resolve_required_peers(
        &self,
        seeds: &BTreeSet<PackageIdentity>,
    ) -> ResolverResult<RequiredPeers> {
        let mut result = RequiredPeers::default();
        let mut queued: HashSet<WalkEntry> = HashSet::new();
        let mut visited: HashSet<WalkEntry> = HashSet::new();
        let mut queue: VecDeque<WalkEntry> = VecDeque::new();

        for seed in seeds {
            let entry = (seed.clone(), seed.name.clone());
            if queued.insert(entry.clone()) {
                queue.push_back(entry);
            }
        }

        while !queue.is_empty() {
            let level: Vec<WalkEntry> = queue
                .drain(..)
                .filter(|(_, name)| !self.family.is_root(name))
                .filter(|entry| visited.insert(entry.clone()))
                .collect();

            let fetched = join_all(
                level
                    .iter()
                    .map(|(tag, name)| self.history.fetch_family_manifest(tag, name)),
            )
            .await;

            for ((tag, _), outcome) in level.into_iter().zip(fetched) {
                let manifest = match outcome {
                    Ok(manifest) => manifest,
                    Err(KinError::NotAFamilyPackage { package }) => {
                        warn!(
                            "{} is not part of the {} repository, skipping",
                            package, self.family.repository
                        );
                        result.non_family.insert(package);
                        continue;
                    },
                    Err(e) => return Err(e),
                };
                result.fetched += 1;
                debug!("Walking {} at {}", manifest.identity(), tag);

                let mut linked = Vec::new();
                for (peer, range) in &manifest.peer_dependencies {
                    if self.family.is_workspace_link(range) {
                        linked.push(peer.clone());
                    } else {
                        result.other_peers.insert(peer.clone(), range.clone());
                    }
                }
                linked.extend(
                    manifest
                        .dependencies
                        .iter()
                        .filter(|(_, range)| self.family.is_workspace_link(range))
                        .map(|(dependency, _)| dependency.clone()),
                );

                for sibling in linked {
                    let entry = (tag.clone(), sibling);
                    if queued.insert(entry.clone()) {
                        queue.push_back(entry);
                    }
                }

                result.peers.insert(manifest.identity());
            }
        }

        result.peers.retain(|peer| !seeds.contains(peer));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kin_core::{DependencyKind, Manifest};
    use kin_registry::{MemoryHistory, RegistryResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn id(name: &str, version: &str) -> PackageIdentity {
        PackageIdentity::new(name, version)
    }

    /// Records every lookup made against the wrapped history
    struct Recording {
        inner: MemoryHistory,
        calls: AtomicUsize,
        lookups: Mutex<Vec<WalkEntry>>,
    }

    impl Recording {
        fn new(inner: MemoryHistory) -> Self {
            Self {
                inner,
                calls: AtomicUsize::new(0),
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ManifestHistory for Recording {
        async fn fetch_family_manifest(
            &self,
            tag: &PackageIdentity,
            name: &str,
        ) -> RegistryResult<Manifest> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.lookups.lock().unwrap().push((tag.clone(), name.to_string()));
            self.inner.fetch_family_manifest(tag, name).await
        }
    }

    fn schema_release() -> (PackageIdentity, MemoryHistory) {
        let tag = id("@effect/schema", "0.64.1");
        let history = MemoryHistory::new();
        history.record(
            &tag,
            Manifest::new("@effect/schema", "0.64.1")
                .with_peer("effect", "workspace:^")
                .with_peer("@effect/platform", "workspace:^")
                .with_peer("fast-check", "^3.13.0"),
        );
        history.record(
            &tag,
            Manifest::new("@effect/platform", "0.48.0")
                .with_peer("effect", "workspace:^")
                .with_dependency(DependencyKind::Normal, "@effect/typeclass", "workspace:^")
                .with_dependency(DependencyKind::Normal, "multipasta", "^0.2.0"),
        );
        history.record(
            &tag,
            Manifest::new("@effect/typeclass", "0.23.0").with_peer("fast-check", "^3.15.0"),
        );
        (tag, history)
    }

    #[tokio::test]
    async fn test_collects_linked_peers_and_dependencies() {
        let (tag, history) = schema_release();
        let family = Family::default();
        let walker = PeerWalker::new(&history, &family);

        let result = walker
            .resolve_required_peers(&BTreeSet::from([tag]))
            .await
            .unwrap();

        assert_eq!(
            result.peers,
            BTreeSet::from([id("@effect/platform", "0.48.0"), id("@effect/typeclass", "0.23.0")])
        );
        // typeclass is walked after schema, so its range wins
        assert_eq!(
            result.other_peers,
            BTreeMap::from([("fast-check".to_string(), "^3.15.0".to_string())])
        );
        assert!(result.non_family.is_empty());
        assert_eq!(result.fetched, 3);
    }

    #[tokio::test]
    async fn test_root_is_never_fetched() {
        let (tag, history) = schema_release();
        let recording = Recording::new(history);
        let family = Family::default();

        PeerWalker::new(&recording, &family)
            .resolve_required_peers(&BTreeSet::from([tag]))
            .await
            .unwrap();

        let lookups = recording.lookups.lock().unwrap();
        assert!(lookups.iter().all(|(_, name)| name != "effect"));
    }

    #[tokio::test]
    async fn test_siblings_are_fetched_at_the_seed_tag() {
        let (tag, history) = schema_release();
        let recording = Recording::new(history);
        let family = Family::default();

        PeerWalker::new(&recording, &family)
            .resolve_required_peers(&BTreeSet::from([tag.clone()]))
            .await
            .unwrap();

        let lookups = recording.lookups.lock().unwrap();
        assert_eq!(
            *lookups,
            vec![
                (tag.clone(), "@effect/schema".to_string()),
                (tag.clone(), "@effect/platform".to_string()),
                (tag, "@effect/typeclass".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cycles_terminate_without_refetching() {
        let tag = id("@effect/a", "1.0.0");
        let history = MemoryHistory::new();
        history.record(&tag, Manifest::new("@effect/a", "1.0.0").with_peer("@effect/b", "workspace:^"));
        history.record(&tag, Manifest::new("@effect/b", "1.0.0").with_peer("@effect/a", "workspace:^"));
        let recording = Recording::new(history);
        let family = Family::default();

        let result = PeerWalker::new(&recording, &family)
            .resolve_required_peers(&BTreeSet::from([tag]))
            .await
            .unwrap();

        assert_eq!(recording.calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.peers, BTreeSet::from([id("@effect/b", "1.0.0")]));
    }

    #[tokio::test]
    async fn test_seeds_are_stripped_from_result() {
        let tag_a = id("@effect/a", "1.0.0");
        let tag_b = id("@effect/b", "2.0.0");
        let history = MemoryHistory::new();
        history.record(&tag_a, Manifest::new("@effect/a", "1.0.0").with_peer("@effect/b", "workspace:^"));
        history.record(&tag_a, Manifest::new("@effect/b", "2.0.0"));
        history.record(&tag_b, Manifest::new("@effect/b", "2.0.0"));
        let family = Family::default();

        let result = PeerWalker::new(&history, &family)
            .resolve_required_peers(&BTreeSet::from([tag_a, tag_b]))
            .await
            .unwrap();

        assert!(result.peers.is_empty());
    }

    #[tokio::test]
    async fn test_non_family_packages_are_collected() {
        let tag = id("@effect/a", "1.0.0");
        let history = MemoryHistory::new();
        history.record(
            &tag,
            Manifest::new("@effect/a", "1.0.0").with_peer("@effect/outsider", "workspace:*"),
        );
        let family = Family::default();

        let result = PeerWalker::new(&history, &family)
            .resolve_required_peers(&BTreeSet::from([tag]))
            .await
            .unwrap();

        assert_eq!(result.non_family, BTreeSet::from(["@effect/outsider".to_string()]));
        assert!(result.peers.is_empty());
        assert_eq!(result.fetched, 1);
    }

    struct Failing;

    #[async_trait]
    impl ManifestHistory for Failing {
        async fn fetch_family_manifest(
            &self,
            tag: &PackageIdentity,
            name: &str,
        ) -> RegistryResult<Manifest> {
            Err(KinError::VersionNotFound {
                name: name.to_string(),
                range: tag.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_other_errors_abort_the_walk() {
        let family = Family::default();
        let err = PeerWalker::new(&Failing, &family)
            .resolve_required_peers(&BTreeSet::from([id("@effect/a", "1.0.0")]))
            .await
            .unwrap_err();
        assert!(matches!(err, KinError::VersionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_seed_set() {
        let family = Family::default();
        let result = PeerWalker::new(&Failing, &family)
            .resolve_required_peers(&BTreeSet::new())
            .await
            .unwrap();
        assert_eq!(result, RequiredPeers::default());
    }
}
