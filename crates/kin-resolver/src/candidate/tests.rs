//! Tests for the candidate resolver

use super::*;
use crate::peers::match_peers;
use kin_core::DependencyKind;
use kin_registry::MemoryRegistry;

const ROOT: &str = "effect";

fn id(name: &str, version: &str) -> PackageIdentity {
    PackageIdentity::new(name, version)
}

fn root(version: &str) -> PackageIdentity {
    id(ROOT, version)
}

fn family_package(name: &str, version: &str, root_range: &str) -> Manifest {
    Manifest::new(name, version).with_peer(ROOT, root_range)
}

fn versions(manifests: &[Manifest]) -> Vec<String> {
    manifests.iter().map(|m| m.identity().to_string()).collect()
}

#[tokio::test]
async fn test_selects_version_compatible_with_root() {
    let registry = MemoryRegistry::with_manifests([
        family_package("@effect/a", "1.0.0", "^1.0.0"),
        family_package("@effect/a", "2.0.0", "^2.0.0"),
    ]);
    let family = Family::default();
    let resolver = CandidateResolver::new(&registry, &family);

    let resolution = resolver
        .resolve(&root("2.0.0"), vec![id("@effect/a", "*")], BTreeSet::from([root("2.0.0")]))
        .await
        .unwrap();

    assert_eq!(versions(&resolution.install_set), vec!["@effect/a@2.0.0"]);
    assert!(resolution.missing_peers.is_empty());
    assert!(resolution.installed.contains(&id("@effect/a", "2.0.0")));
    assert_eq!(resolution.rounds, 1);
}

#[tokio::test]
async fn test_prefers_latest_of_compatible_versions() {
    let registry = MemoryRegistry::with_manifests([
        family_package("@effect/a", "2.0.0", "^2.0.0"),
        family_package("@effect/a", "2.1.0", "^2.0.0"),
        family_package("@effect/a", "2.0.5", "^2.0.0"),
    ]);
    let family = Family::default();
    let selection = CandidateResolver::new(&registry, &family)
        .select_consistent_set(&root("2.3.0"), &[id("@effect/a", "*")], &BTreeSet::new())
        .await
        .unwrap();

    assert_eq!(versions(&selection.install_set), vec!["@effect/a@2.1.0"]);
    assert_eq!(selection.stats.passes, 1);
}

#[tokio::test]
async fn test_incompatible_with_root() {
    let registry =
        MemoryRegistry::with_manifests([family_package("@effect/a", "1.0.0", "^1.0.0")]);
    let family = Family::default();
    let err = CandidateResolver::new(&registry, &family)
        .select_consistent_set(&root("2.0.0"), &[id("@effect/a", "latest")], &BTreeSet::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "No version of @effect/a@latest is compatible with effect@2.0.0"
    );
}

#[tokio::test]
async fn test_package_without_root_peer_is_incompatible() {
    let registry = MemoryRegistry::with_manifests([Manifest::new("@effect/a", "1.0.0")]);
    let family = Family::default();
    let err = CandidateResolver::new(&registry, &family)
        .select_consistent_set(&root("2.0.0"), &[id("@effect/a", "*")], &BTreeSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, KinError::IncompatibleWithRoot { .. }));
}

#[tokio::test]
async fn test_registry_errors_propagate() {
    let registry = MemoryRegistry::new();
    let family = Family::default();
    let err = CandidateResolver::new(&registry, &family)
        .select_consistent_set(&root("2.0.0"), &[id("@effect/nope", "*")], &BTreeSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, KinError::PackageNotFound { .. }));
}

#[tokio::test]
async fn test_eliminates_candidates_until_peers_agree() {
    // b@2 does not accept the root, so a@2 (wanting b ^2) has to go
    let registry = MemoryRegistry::with_manifests([
        family_package("@effect/a", "1.0.0", "^2.0.0").with_peer("@effect/b", "^1.0.0"),
        family_package("@effect/a", "2.0.0", "^2.0.0").with_peer("@effect/b", "^2.0.0"),
        family_package("@effect/b", "1.0.0", "^2.0.0"),
        family_package("@effect/b", "2.0.0", "^3.0.0"),
    ]);
    let family = Family::default();
    let selection = CandidateResolver::new(&registry, &family)
        .select_consistent_set(
            &root("2.0.0"),
            &[id("@effect/a", "*"), id("@effect/b", "*")],
            &BTreeSet::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        versions(&selection.install_set),
        vec!["@effect/a@1.0.0", "@effect/b@1.0.0"]
    );
    assert_eq!(selection.stats.passes, 2);
    assert_eq!(selection.stats.pool_sizes, vec![3, 2]);
}

#[tokio::test]
async fn test_no_consistent_candidate() {
    let registry = MemoryRegistry::with_manifests([
        family_package("@effect/a", "1.0.0", "^2.0.0").with_peer("@effect/b", "^2.0.0"),
        family_package("@effect/b", "1.0.0", "^2.0.0"),
    ]);
    let family = Family::default();
    let err = CandidateResolver::new(&registry, &family)
        .select_consistent_set(
            &root("2.0.0"),
            &[id("@effect/a", "*"), id("@effect/b", "*")],
            &BTreeSet::new(),
        )
        .await
        .unwrap_err();

    match err {
        KinError::NoConsistentCandidate { name } => assert_eq!(name, "@effect/a"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_stale_installed_version_of_requested_package_is_ignored() {
    let registry = MemoryRegistry::with_manifests([
        family_package("@effect/a", "1.0.0", "^2.0.0").with_peer("@effect/b", "^2.0.0"),
        family_package("@effect/b", "1.0.0", "^2.0.0"),
    ]);
    let family = Family::default();
    let installed = BTreeSet::from([root("2.0.0"), id("@effect/b", "2.0.0")]);
    let err = CandidateResolver::new(&registry, &family)
        .select_consistent_set(
            &root("2.0.0"),
            &[id("@effect/a", "*"), id("@effect/b", "*")],
            &installed,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KinError::NoConsistentCandidate { .. }));

    // Not requested, the installed version counts
    let selection = CandidateResolver::new(&registry, &family)
        .select_consistent_set(&root("2.0.0"), &[id("@effect/a", "*")], &installed)
        .await
        .unwrap();
    assert_eq!(versions(&selection.install_set), vec!["@effect/a@1.0.0"]);
}

#[tokio::test]
async fn test_missing_peer_is_tolerated_but_fails_audit() {
    let registry = MemoryRegistry::with_manifests([
        family_package("@effect/a", "1.0.0", "^2.0.0").with_peer("fast-check", "^3.0.0"),
        family_package("@effect/a", "1.1.0", "^2.0.0").with_peer("fast-check", "^3.0.0"),
    ]);
    let family = Family::default();
    let installed = BTreeSet::from([root("2.0.0")]);
    let resolution = CandidateResolver::new(&registry, &family)
        .resolve(&root("2.0.0"), vec![id("@effect/a", "1.x")], installed)
        .await
        .unwrap();

    let chosen = &resolution.install_set[0];
    assert_eq!(chosen.identity(), id("@effect/a", "1.1.0"));

    assert_eq!(
        resolution.missing_peers,
        BTreeMap::from([(
            id("@effect/a", "1.1.0"),
            BTreeSet::from([id("fast-check", "^3.0.0")])
        )])
    );

    let result = match_peers(chosen, &resolution.installed);
    assert!(result.missing.contains(&id("fast-check", "^3.0.0")));
    assert!(result.has_all_peers(true));
    assert!(!result.has_all_peers(false));
}

#[tokio::test]
async fn test_outer_fixpoint_pulls_in_family_dependencies() {
    let registry = MemoryRegistry::with_manifests([
        family_package("@effect/a", "1.0.0", "^2.0.0").with_dependency(
            DependencyKind::Normal,
            "@effect/c",
            "^1.0.0",
        ),
        family_package("@effect/c", "1.0.0", "^2.0.0"),
        family_package("@effect/c", "1.5.0", "^2.0.0"),
        family_package("@effect/c", "1.9.0", "^3.0.0"),
    ]);
    let family = Family::default();
    let resolution = CandidateResolver::new(&registry, &family)
        .resolve(&root("2.0.0"), vec![id("@effect/a", "*")], BTreeSet::from([root("2.0.0")]))
        .await
        .unwrap();

    assert_eq!(
        versions(&resolution.install_set),
        vec!["@effect/a@1.0.0", "@effect/c@1.5.0"]
    );
    assert_eq!(
        resolution.requested,
        vec![id("@effect/a", "*"), id("@effect/c", "^1.0.0")]
    );
    assert_eq!(resolution.rounds, 2);
}

#[tokio::test]
async fn test_outer_fixpoint_skips_root_foreign_and_installed() {
    let registry = MemoryRegistry::with_manifests([family_package(
        "@effect/a",
        "1.0.0",
        "^2.0.0",
    )
    .with_dependency(DependencyKind::Normal, ROOT, "^2.0.0")
    .with_dependency(DependencyKind::Normal, "fast-check", "^3.0.0")
    .with_dependency(DependencyKind::Dev, "@effect/installed", "^1.0.0")]);
    let family = Family::default();
    let installed = BTreeSet::from([root("2.0.0"), id("@effect/installed", "1.2.0")]);
    let resolution = CandidateResolver::new(&registry, &family)
        .resolve(&root("2.0.0"), vec![id("@effect/a", "*")], installed)
        .await
        .unwrap();

    assert_eq!(resolution.requested, vec![id("@effect/a", "*")]);
    assert_eq!(resolution.rounds, 1);
}

#[tokio::test]
async fn test_picks_must_agree_with_each_other() {
    // Each newest version is happy with the pool, but not with the other pick
    let registry = MemoryRegistry::with_manifests([
        family_package("@effect/a", "1.0.0", "^2.0.0"),
        family_package("@effect/a", "2.0.0", "^2.0.0").with_peer("@effect/b", "^1.0.0"),
        family_package("@effect/b", "1.0.0", "^2.0.0"),
        family_package("@effect/b", "3.0.0", "^2.0.0").with_peer("@effect/a", "^1.0.0"),
    ]);
    let family = Family::default();
    let requested = [id("@effect/a", "*"), id("@effect/b", "*")];

    let by_request = CandidateResolver::new(&registry, &family)
        .select_consistent_set(&root("2.0.0"), &requested, &BTreeSet::new())
        .await
        .unwrap();
    assert_eq!(
        versions(&by_request.install_set),
        vec!["@effect/a@1.0.0", "@effect/b@3.0.0"]
    );

    let by_version = CandidateResolver::new(&registry, &family)
        .with_order(EvaluationOrder::HighestVersion)
        .select_consistent_set(&root("2.0.0"), &requested, &BTreeSet::new())
        .await
        .unwrap();
    assert_eq!(
        versions(&by_version.install_set),
        vec!["@effect/a@2.0.0", "@effect/b@1.0.0"]
    );
}

#[tokio::test]
async fn test_alternatives_report_exact_requests_resolved_elsewhere() {
    let registry = MemoryRegistry::with_manifests([
        family_package("@effect/a", "1.0.0", "^1.0.0"),
        family_package("@effect/a", "2.0.0", "^2.0.0"),
        family_package("@effect/b", "2.0.0", "^2.0.0"),
    ]);
    let family = Family::default();
    let resolution = CandidateResolver::new(&registry, &family)
        .resolve(
            &root("2.0.0"),
            vec![id("@effect/a", "^2.0.0"), id("@effect/b", "2.0.0")],
            BTreeSet::new(),
        )
        .await
        .unwrap();
    assert!(resolution.alternatives().is_empty());

    let manual = Resolution {
        install_set: vec![family_package("@effect/a", "2.0.0", "^2.0.0")],
        installed: BTreeSet::new(),
        requested: vec![id("@effect/a", "1.0.0")],
        missing_peers: MissingPeers::new(),
        rounds: 1,
        stats: SelectionStats::default(),
    };
    assert_eq!(manual.alternatives(), vec![id("@effect/a", "2.0.0")]);
}

#[test]
fn test_newest_prefers_later_entry_on_tie() {
    let pool = vec![
        Manifest::new("a", "1.0.0"),
        Manifest::new("b", "9.0.0"),
        Manifest::new("a", "1.0.0").with_peer("x", "*"),
    ];
    assert_eq!(newest(&pool, "a"), Some(2));
    assert_eq!(newest(&pool, "b"), Some(1));
    assert_eq!(newest(&pool, "c"), None);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    const NAMES: [&str; 3] = ["@effect/p0", "@effect/p1", "@effect/p2"];

    /// One published version: its patch number, whether it accepts the root,
    /// and optional peer ranges on the other packages
    fn release() -> impl Strategy<Value = (u64, bool, Vec<Option<u64>>)> {
        (
            0u64..4,
            prop::bool::weighted(0.85),
            prop::collection::vec(prop::option::weighted(0.4, 0u64..4), NAMES.len()),
        )
    }

    fn universe() -> impl Strategy<Value = Vec<Manifest>> {
        prop::collection::vec((0..NAMES.len(), release()), 1..12).prop_map(|releases| {
            let mut manifests: Vec<Manifest> = Vec::new();
            for (index, (patch, accepts_root, peers)) in releases {
                let name = NAMES[index];
                let version = format!("1.0.{}", patch);
                if manifests.iter().any(|m| m.name == name && m.version == version) {
                    continue;
                }
                let root_range = if accepts_root { "^2.0.0" } else { "^3.0.0" };
                let mut manifest = family_package(name, &version, root_range);
                for (peer_index, minimum) in peers.into_iter().enumerate() {
                    if peer_index == index {
                        continue;
                    }
                    if let Some(minimum) = minimum {
                        manifest = manifest.with_peer(NAMES[peer_index], format!(">=1.0.{}", minimum));
                    }
                }
                manifests.push(manifest);
            }
            manifests
        })
    }

    fn requested_names(universe: &[Manifest]) -> Vec<PackageIdentity> {
        NAMES
            .iter()
            .filter(|name| universe.iter().any(|m| &m.name == *name))
            .map(|name| id(name, "*"))
            .collect()
    }

    proptest! {
        #[test]
        fn selection_shrinks_monotonically_and_is_sound(universe in universe()) {
            let registry = MemoryRegistry::with_manifests(universe.clone());
            let family = Family::default();
            let resolver = CandidateResolver::new(&registry, &family);
            let requested = requested_names(&universe);
            let installed = BTreeSet::from([root("2.0.0")]);

            let outcome = tokio_test::block_on(
                resolver.select_consistent_set(&root("2.0.0"), &requested, &installed),
            );

            if let Ok(selection) = outcome {
                let sizes = &selection.stats.pool_sizes;
                prop_assert_eq!(sizes.len(), selection.stats.passes);
                for pair in sizes.windows(2) {
                    prop_assert_eq!(pair[1] + 1, pair[0]);
                }
                prop_assert!(selection.stats.passes <= sizes[0]);

                let accepted: Vec<PackageIdentity> = installed
                    .iter()
                    .cloned()
                    .chain(selection.install_set.iter().map(Manifest::identity))
                    .collect();
                for manifest in &selection.install_set {
                    prop_assert!(match_peers(manifest, &accepted).has_all_peers(true));
                }
            }
        }

        #[test]
        fn re_resolving_the_result_is_idempotent(universe in universe()) {
            let registry = MemoryRegistry::with_manifests(universe.clone());
            let family = Family::default();
            let resolver = CandidateResolver::new(&registry, &family);
            let installed = BTreeSet::from([root("2.0.0")]);

            let first = tokio_test::block_on(resolver.select_consistent_set(
                &root("2.0.0"),
                &requested_names(&universe),
                &installed,
            ));

            if let Ok(first) = first {
                let exact: Vec<PackageIdentity> =
                    first.install_set.iter().map(Manifest::identity).collect();
                let second = tokio_test::block_on(
                    resolver.select_consistent_set(&root("2.0.0"), &exact, &installed),
                )
                .unwrap();
                prop_assert_eq!(second.install_set, first.install_set);
                prop_assert_eq!(second.stats.passes, 1);
            }
        }

        #[test]
        fn a_newer_fully_compatible_version_always_wins(
            patches in prop::collection::btree_set(0u64..8, 1..5),
        ) {
            let universe: Vec<Manifest> = patches
                .iter()
                .map(|patch| family_package("@effect/p0", &format!("1.0.{}", patch), "^2.0.0"))
                .collect();
            let registry = MemoryRegistry::with_manifests(universe);
            let family = Family::default();
            let selection = tokio_test::block_on(
                CandidateResolver::new(&registry, &family).select_consistent_set(
                    &root("2.0.0"),
                    &[id("@effect/p0", "*")],
                    &BTreeSet::new(),
                ),
            )
            .unwrap();

            let newest = patches.iter().max().copied().unwrap_or_default();
            prop_assert_eq!(&selection.install_set[0].version, &format!("1.0.{}", newest));
        }
    }
}
