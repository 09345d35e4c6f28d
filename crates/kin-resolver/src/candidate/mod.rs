//! Candidate elimination resolver
//!
//! Two nested fixpoints:
//!
//! - [`CandidateResolver::select_consistent_set`] starts from every version
//!   of every requested package that accepts the root version, then
//!   repeatedly picks the newest remaining version per package and removes
//!   the first pick whose peers are not satisfied by the remaining pool, or
//!   failing that by the other picks. The pool only shrinks, so this
//!   terminates within `|pool|` passes.
//! - [`CandidateResolver::resolve`] re-runs the selection whenever a chosen
//!   package depends on a family package nobody asked for yet.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use futures::future::try_join_all;
use kin_core::error::KinError;
pub use kin_core::EvaluationOrder;
use kin_core::{Family, Manifest, PackageIdentity};
use kin_registry::PackageRegistry;
use tracing::debug;

use crate::peers::match_peers;
use crate::ResolverResult;

/// Observability of one inner fixpoint run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionStats {
    /// Number of passes, the last one being removal-free
    pub passes: usize,
    /// Candidate pool size at the start of each pass
    pub pool_sizes: Vec<usize>,
}

/// Declared peers, as `name@range`, that neither the installation nor the
/// install set provides, keyed by the accepted package declaring them
pub type MissingPeers = BTreeMap<PackageIdentity, BTreeSet<PackageIdentity>>;

/// Result of one inner fixpoint run
#[derive(Debug, Clone)]
pub struct Selection {
    /// One manifest per requested name, in request order
    pub install_set: Vec<Manifest>,
    /// Peers accepted as missing, by declaring package
    pub missing_peers: MissingPeers,
    pub stats: SelectionStats,
}

/// Result of the outer fixpoint
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Accepted manifests of the last selection, in request order
    pub install_set: Vec<Manifest>,
    /// Installed identities with the install set applied
    pub installed: BTreeSet<PackageIdentity>,
    /// Requested packages, including appended family dependencies
    pub requested: Vec<PackageIdentity>,
    /// Peers of the install set that will still be missing afterwards
    pub missing_peers: MissingPeers,
    /// Number of inner fixpoint runs
    pub rounds: usize,
    /// Statistics of the last inner fixpoint run
    pub stats: SelectionStats,
}

impl Resolution {
    /// Identities of the install set
    pub fn identities(&self) -> BTreeSet<PackageIdentity> {
        self.install_set.iter().map(Manifest::identity).collect()
    }

    /// Requests for an exact version that resolved to a different version
    pub fn alternatives(&self) -> Vec<PackageIdentity> {
        self.requested
            .iter()
            .filter(|spec| spec.is_exact())
            .filter_map(|spec| {
                self.install_set
                    .iter()
                    .find(|m| m.name == spec.name && m.version != spec.version)
                    .map(Manifest::identity)
            })
            .collect()
    }
}

/// Picks a mutually peer-compatible version for each requested package
pub struct CandidateResolver<'a, R: ?Sized> {
    registry: &'a R,
    family: &'a Family,
    order: EvaluationOrder,
}

impl<'a, R: PackageRegistry + ?Sized> CandidateResolver<'a, R> {
    pub fn new(registry: &'a R, family: &'a Family) -> Self {
        Self {
            registry,
            family,
            order: EvaluationOrder::default(),
        }
    }

    pub fn with_order(mut self, order: EvaluationOrder) -> Self {
        self.order = order;
        self
    }

    /// Resolve `requested` against the installed `root`, pulling in family
    /// dependencies of the chosen packages until nothing new is appended.
    pub async fn resolve(
        &self,
        root: &PackageIdentity,
        requested: Vec<PackageIdentity>,
        installed: BTreeSet<PackageIdentity>,
    ) -> ResolverResult<Resolution> {
        let mut requested = requested;
        let mut installed = installed;
        let mut rounds = 0;

        loop {
            rounds += 1;
            let selection = self
                .select_consistent_set(root, &requested, &installed)
                .await?;

            let mut appended = false;
            for manifest in &selection.install_set {
                installed.retain(|id| id.name != manifest.name);
                installed.insert(manifest.identity());

                for dependency in manifest.all_declared_dependencies() {
                    if !self.family.is_member(&dependency.name)
                        || requested.iter().any(|r| r.name == dependency.name)
                        || installed.iter().any(|i| i.name == dependency.name)
                    {
                        continue;
                    }
                    debug!(
                        "{} depends on {}, adding it to the request",
                        manifest.identity(),
                        dependency
                    );
                    requested.push(dependency);
                    appended = true;
                }
            }

            if !appended {
                return Ok(Resolution {
                    install_set: selection.install_set,
                    missing_peers: selection.missing_peers,
                    installed,
                    requested,
                    rounds,
                    stats: selection.stats,
                });
            }
        }
    }

    /// Pick one version per requested name such that every pick's peers are
    /// satisfied by `installed` (minus requested names) plus the remaining
    /// candidate pool, preferring newer versions.
    pub async fn select_consistent_set(
        &self,
        root: &PackageIdentity,
        requested: &[PackageIdentity],
        installed: &BTreeSet<PackageIdentity>,
    ) -> ResolverResult<Selection> {
        let names = unique_names(requested);
        let mut pool = self.compatible_candidates(root, requested).await?;

        let installed_peers: Vec<PackageIdentity> = installed
            .iter()
            .filter(|id| !names.contains(&id.name))
            .cloned()
            .collect();

        let mut stats = SelectionStats::default();
        loop {
            stats.passes += 1;
            stats.pool_sizes.push(pool.len());

            let available: Vec<PackageIdentity> = installed_peers
                .iter()
                .cloned()
                .chain(pool.iter().map(Manifest::identity))
                .collect();

            let mut picks = Vec::with_capacity(names.len());
            for name in &names {
                let index = newest(&pool, name).ok_or_else(|| KinError::NoConsistentCandidate {
                    name: name.clone(),
                })?;
                picks.push(index);
            }

            // The pool can over-approximate what ends up installed, so the
            // picks must also hold up against each other
            let chosen: Vec<PackageIdentity> = installed_peers
                .iter()
                .cloned()
                .chain(picks.iter().map(|&index| pool[index].identity()))
                .collect();

            let order = self.evaluation_order(&pool, &picks);
            let rejected = first_unsatisfied(&pool, &order, &available)
                .or_else(|| first_unsatisfied(&pool, &order, &chosen));

            match rejected {
                Some(index) => {
                    pool.remove(index);
                },
                None => {
                    let install_set: Vec<Manifest> =
                        picks.into_iter().map(|index| pool[index].clone()).collect();
                    let missing_peers = unprovided_peers(&install_set, &chosen);
                    return Ok(Selection {
                        install_set,
                        missing_peers,
                        stats,
                    });
                },
            }
        }
    }

    /// Versions of each requested package that accept the root exactly
    async fn compatible_candidates(
        &self,
        root: &PackageIdentity,
        requested: &[PackageIdentity],
    ) -> ResolverResult<Vec<Manifest>> {
        let listed = try_join_all(requested.iter().map(|spec| self.registry.list(spec))).await?;
        let root_only = [root.clone()];

        let mut pool: Vec<Manifest> = Vec::new();
        for (spec, versions) in requested.iter().zip(listed) {
            let compatible: Vec<Manifest> = versions
                .into_iter()
                .filter(|manifest| match_peers(manifest, &root_only).has_valid(root))
                .collect();
            if compatible.is_empty() {
                return Err(KinError::IncompatibleWithRoot {
                    package: spec.to_string(),
                    root: root.to_string(),
                });
            }
            for manifest in compatible {
                if !pool.contains(&manifest) {
                    pool.push(manifest);
                }
            }
        }
        Ok(pool)
    }

    /// Pool indices of the picks, in the order they are checked
    fn evaluation_order(&self, pool: &[Manifest], picks: &[usize]) -> Vec<usize> {
        let mut ordered = picks.to_vec();
        if self.order == EvaluationOrder::HighestVersion {
            // Stable sort keeps request order among equal versions
            ordered.sort_by(|a, b| pool[*b].parsed_version().cmp(&pool[*a].parsed_version()));
        }
        ordered
    }
}

/// First pick, in evaluation order, whose peers `available` does not satisfy
fn first_unsatisfied(
    pool: &[Manifest],
    order: &[usize],
    available: &[PackageIdentity],
) -> Option<usize> {
    order.iter().copied().find(|&index| {
        let picked = &pool[index];
        let satisfied = match_peers(picked, available).has_all_peers(true);
        if !satisfied {
            debug!("{} is not satisfied by peers", picked.identity());
        }
        !satisfied
    })
}

/// Peers of each accepted manifest that `chosen` leaves missing
fn unprovided_peers(install_set: &[Manifest], chosen: &[PackageIdentity]) -> MissingPeers {
    install_set
        .iter()
        .map(|manifest| (manifest.identity(), match_peers(manifest, chosen).missing))
        .filter(|(_, missing)| !missing.is_empty())
        .collect()
}

/// Requested names in first-seen order
fn unique_names(requested: &[PackageIdentity]) -> Vec<String> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|spec| seen.insert(spec.name.as_str()))
        .map(|spec| spec.name.clone())
        .collect()
}

/// Index of the newest remaining version of `name`; later entries win ties
fn newest(pool: &[Manifest], name: &str) -> Option<usize> {
    pool.iter()
        .enumerate()
        .filter(|(_, manifest)| manifest.name == name)
        .max_by(|(a_index, a), (b_index, b)| {
            a.parsed_version()
                .cmp(&b.parsed_version())
                .then(a_index.cmp(b_index))
        })
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests;
