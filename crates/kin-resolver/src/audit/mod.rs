//! Installation audit helpers

use std::collections::BTreeSet;
use std::fmt;

use kin_core::error::KinError;
use kin_core::{Family, Manifest, PackageIdentity};
use kin_registry::PackageRegistry;

use crate::peers::{match_peers, UnsatisfiedPeer};
use crate::ResolverResult;

/// Peers of one installed package that the installation does not satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub package: PackageIdentity,
    pub unsatisfied: Vec<UnsatisfiedPeer>,
}

/// What a package expects of the root package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMismatch {
    pub package: PackageIdentity,
    /// Root name with the declared peer range as version
    pub expected: PackageIdentity,
}

impl fmt::Display for RootMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires {}", self.package, self.expected)
    }
}

/// The single installed version of the family root
pub fn find_installed_root(
    installed: &BTreeSet<PackageIdentity>,
    family: &Family,
) -> ResolverResult<PackageIdentity> {
    let mut roots: Vec<&PackageIdentity> =
        installed.iter().filter(|id| family.is_root(&id.name)).collect();

    match roots.len() {
        0 => Err(KinError::RootPackageNotFound {
            name: family.root.clone(),
        }),
        1 => Ok(roots.remove(0).clone()),
        _ => Err(KinError::MultipleRootVersions {
            name: family.root.clone(),
            versions: roots.iter().map(|id| id.version.clone()).collect(),
        }),
    }
}

/// Installed family members, root excluded
pub fn installed_members(
    installed: &BTreeSet<PackageIdentity>,
    family: &Family,
) -> Vec<PackageIdentity> {
    installed
        .iter()
        .filter(|id| family.is_member(&id.name))
        .cloned()
        .collect()
}

/// Check every manifest's peers against what is installed.
///
/// Missing peers count as failures here, unlike during resolution.
pub fn audit_installation(
    manifests: &[Manifest],
    installed: &BTreeSet<PackageIdentity>,
) -> Vec<AuditEntry> {
    manifests
        .iter()
        .filter_map(|manifest| {
            let result = match_peers(manifest, installed);
            if result.has_all_peers(false) {
                return None;
            }
            Some(AuditEntry {
                package: result.package.clone(),
                unsatisfied: result.unsatisfied(),
            })
        })
        .collect()
}

/// Manifests that declare the family root as a peer
pub fn dependents_requiring_root<'a>(
    manifests: &'a [Manifest],
    family: &Family,
) -> Vec<&'a Manifest> {
    manifests
        .iter()
        .filter(|manifest| manifest.peer_range(&family.root).is_some())
        .collect()
}

/// The root range declared by the version `spec` resolves to, if any
pub async fn root_requirement<R: PackageRegistry + ?Sized>(
    registry: &R,
    family: &Family,
    spec: &PackageIdentity,
) -> ResolverResult<Option<RootMismatch>> {
    let manifest = registry.view(spec).await?;
    Ok(manifest.peer_range(&family.root).map(|range| RootMismatch {
        package: manifest.identity(),
        expected: PackageIdentity::new(family.root.clone(), range),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kin_registry::MemoryRegistry;

    fn id(name: &str, version: &str) -> PackageIdentity {
        PackageIdentity::new(name, version)
    }

    #[test]
    fn test_find_installed_root() {
        let family = Family::default();
        let installed = BTreeSet::from([id("effect", "2.4.1"), id("@effect/schema", "0.64.0")]);
        assert_eq!(find_installed_root(&installed, &family).unwrap(), id("effect", "2.4.1"));
    }

    #[test]
    fn test_root_not_installed() {
        let family = Family::default();
        let err = find_installed_root(&BTreeSet::from([id("left-pad", "1.0.0")]), &family)
            .unwrap_err();
        assert!(matches!(err, KinError::RootPackageNotFound { name } if name == "effect"));
    }

    #[test]
    fn test_multiple_root_versions() {
        let family = Family::default();
        let installed = BTreeSet::from([id("effect", "2.4.1"), id("effect", "3.0.0")]);
        match find_installed_root(&installed, &family).unwrap_err() {
            KinError::MultipleRootVersions { versions, .. } => {
                assert_eq!(versions, vec!["2.4.1".to_string(), "3.0.0".to_string()]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_installed_members_excludes_root_and_strangers() {
        let family = Family::default();
        let installed = BTreeSet::from([
            id("effect", "2.4.1"),
            id("@effect/schema", "0.64.0"),
            id("fast-check", "3.15.0"),
        ]);
        assert_eq!(installed_members(&installed, &family), vec![id("@effect/schema", "0.64.0")]);
    }

    #[test]
    fn test_audit_reports_missing_and_invalid_peers() {
        let manifests = vec![
            Manifest::new("@effect/schema", "0.64.0")
                .with_peer("effect", "^2.4.0")
                .with_peer("fast-check", "^3.13.0"),
            Manifest::new("@effect/platform", "0.48.0").with_peer("effect", "^3.0.0"),
            Manifest::new("@effect/typeclass", "0.23.0").with_peer("effect", "^2.0.0"),
        ];
        let installed = BTreeSet::from([id("effect", "2.4.1")]);

        let report = audit_installation(&manifests, &installed);

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].package, id("@effect/schema", "0.64.0"));
        assert!(report[0].unsatisfied[0].is_missing());
        assert_eq!(report[0].unsatisfied[0].name, "fast-check");
        assert_eq!(report[1].package, id("@effect/platform", "0.48.0"));
        assert_eq!(report[1].unsatisfied[0].found, vec!["2.4.1".to_string()]);
    }

    #[test]
    fn test_dependents_requiring_root() {
        let family = Family::default();
        let manifests = vec![
            Manifest::new("@effect/schema", "0.64.0").with_peer("effect", "^2.4.0"),
            Manifest::new("left-pad", "1.0.0"),
        ];
        let dependents = dependents_requiring_root(&manifests, &family);
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].name, "@effect/schema");
    }

    #[tokio::test]
    async fn test_root_requirement() {
        let family = Family::default();
        let registry = MemoryRegistry::with_manifests([
            Manifest::new("@effect/schema", "0.64.0").with_peer("effect", "^2.4.0"),
            Manifest::new("@effect/schema", "0.66.0").with_peer("effect", "^3.0.0"),
            Manifest::new("left-pad", "1.0.0"),
        ]);

        let mismatch = root_requirement(&registry, &family, &PackageIdentity::latest("@effect/schema"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mismatch.to_string(), "@effect/schema@0.66.0 requires effect@^3.0.0");

        let none = root_requirement(&registry, &family, &PackageIdentity::latest("left-pad"))
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
