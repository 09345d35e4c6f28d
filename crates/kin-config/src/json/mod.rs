//! package.json reading

use std::collections::BTreeSet;
use std::io::ErrorKind;

use camino::Utf8Path;
use kin_core::error::KinError;
use kin_core::{DependencyMap, Manifest, PackageIdentity};

use crate::ConfigResult;

/// Read and decode the manifest at `path`
pub async fn load_manifest(path: &Utf8Path) -> ConfigResult<Manifest> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            KinError::ManifestNotFound {
                path: path.to_string(),
                source: e,
            }
        } else {
            KinError::io(format!("Failed to read {}: {}", path, e), e)
        }
    })?;

    Manifest::from_json(&contents)
}

/// Packages whose name is a key of `dependencies`
pub fn filter_saved_in_deps(
    dependencies: &DependencyMap,
    packages: &BTreeSet<PackageIdentity>,
) -> BTreeSet<PackageIdentity> {
    packages
        .iter()
        .filter(|package| dependencies.contains_key(&package.name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, contents: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::try_from(dir.path().join("package.json")).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_manifest() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            r#"{
                "name": "my-app",
                "version": "1.0.0",
                "dependencies": { "effect": "^2.4.0" },
                "devDependencies": { "@effect/vitest": "0.5.0" }
            }"#,
        );

        let manifest = load_manifest(&path).await.unwrap();
        assert_eq!(manifest.name, "my-app");
        assert_eq!(manifest.dependencies.get("effect").map(String::as_str), Some("^2.4.0"));
        assert!(manifest.peer_dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("package.json")).unwrap();
        let err = load_manifest(&path).await.unwrap_err();
        assert!(matches!(err, KinError::ManifestNotFound { .. }));
    }

    #[tokio::test]
    async fn test_malformed_manifest_keeps_contents() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{ "name": "my-app" }"#);
        match load_manifest(&path).await.unwrap_err() {
            KinError::MalformedManifest { contents, .. } => {
                assert_eq!(contents, r#"{ "name": "my-app" }"#)
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_filter_saved_in_deps() {
        let dependencies = DependencyMap::from([
            ("@effect/schema".to_string(), "^0.64.0".to_string()),
            ("effect".to_string(), "^2.4.0".to_string()),
        ]);
        let packages = BTreeSet::from([
            PackageIdentity::new("@effect/schema", "0.66.0"),
            PackageIdentity::new("@effect/platform", "0.48.0"),
        ]);

        assert_eq!(
            filter_saved_in_deps(&dependencies, &packages),
            BTreeSet::from([PackageIdentity::new("@effect/schema", "0.66.0")])
        );
        assert!(filter_saved_in_deps(&DependencyMap::new(), &packages).is_empty());
    }
}
