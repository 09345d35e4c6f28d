//! Installed package inventory read from node_modules

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use futures::future::join_all;
use kin_config::load_manifest;
use kin_core::error::{KinError, KinResult};
use kin_core::{Manifest, PackageIdentity};
use serde::Deserialize;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

const NODE_MODULES: &str = "node_modules";

/// The two fields needed to identify an installed package
#[derive(Deserialize)]
struct InstalledPackage {
    name: Option<String>,
    version: Option<String>,
}

/// Packages installed below a project's node_modules
pub struct NodeModulesInventory {
    node_modules: Utf8PathBuf,
}

impl NodeModulesInventory {
    pub fn new(project_dir: &Utf8Path) -> Self {
        Self {
            node_modules: project_dir.join(NODE_MODULES),
        }
    }

    /// Every installed `name@version` across the whole tree, nested and
    /// pnpm store copies included. Symlinks are not followed.
    ///
    /// The walk runs on the blocking pool and reflects node_modules at the
    /// time it ran.
    pub async fn list_installed(&self) -> KinResult<BTreeSet<PackageIdentity>> {
        let node_modules = self.node_modules.clone();
        tokio::task::spawn_blocking(move || scan_node_modules(&node_modules))
            .await
            .map_err(|e| {
                let message = format!("Failed to scan {}", self.node_modules);
                KinError::io(message, std::io::Error::other(e))
            })?
    }

    /// Manifest paths of the given packages installed at top level
    pub fn list_paths<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<Utf8PathBuf> {
        names
            .into_iter()
            .map(|name| self.node_modules.join(name).join("package.json"))
            .filter(|path| path.is_file())
            .collect()
    }

    /// Top-level manifests of the given packages; unreadable ones are skipped
    pub async fn read_manifests<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<Manifest> {
        let paths = self.list_paths(names);
        join_all(paths.iter().map(|path| load_manifest(path)))
            .await
            .into_iter()
            .zip(&paths)
            .filter_map(|(outcome, path)| match outcome {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    debug!("Skipping {}: {}", path, e);
                    None
                },
            })
            .collect()
    }

    /// Drop the packages whose top-level installation already has exactly
    /// that identity
    pub async fn exclude_installed_packages(
        &self,
        packages: &BTreeSet<PackageIdentity>,
    ) -> BTreeSet<PackageIdentity> {
        let installed = self
            .read_manifests(packages.iter().map(|p| p.name.as_str()))
            .await;
        packages
            .iter()
            .filter(|package| !installed.iter().any(|m| &m.identity() == *package))
            .cloned()
            .collect()
    }
}

/// Walk `node_modules` and collect the identity of every package manifest
fn scan_node_modules(node_modules: &Utf8Path) -> KinResult<BTreeSet<PackageIdentity>> {
    let mut installed = BTreeSet::new();
    if !node_modules.is_dir() {
        return Ok(installed);
    }

    let walker = WalkDir::new(node_modules)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !entry.file_type().is_dir() || should_descend(entry));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let message = format!("Failed to read {}: {}", node_modules, e);
            KinError::io(message, e.into())
        })?;
        if entry.file_name() != "package.json" || !is_package_manifest(entry.path()) {
            continue;
        }
        if let Some(identity) = read_identity(entry.path()) {
            installed.insert(identity);
        }
    }

    Ok(installed)
}

/// Whether a directory below node_modules can hold package directories
fn should_descend(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || entry.file_name() == NODE_MODULES {
        return true;
    }
    let parent = entry.path().parent();
    let parent_name = parent.and_then(|p| p.file_name()).and_then(|n| n.to_str());
    match parent_name {
        Some(NODE_MODULES) | Some(".pnpm") => true,
        Some(scope) if scope.starts_with('@') => {
            parent.and_then(|p| p.parent()).and_then(|p| p.file_name()) == Some(OsStr::new(NODE_MODULES))
        },
        _ => false,
    }
}

/// `node_modules/<name>/package.json` or `node_modules/@scope/<name>/package.json`
fn is_package_manifest(path: &Path) -> bool {
    let Some(package_dir) = path.parent() else {
        return false;
    };
    let Some(container) = package_dir.parent() else {
        return false;
    };
    let container_name = container.file_name().and_then(|n| n.to_str());
    match container_name {
        Some(NODE_MODULES) => true,
        Some(scope) if scope.starts_with('@') => {
            container.parent().and_then(|p| p.file_name()) == Some(OsStr::new(NODE_MODULES))
        },
        _ => false,
    }
}

fn read_identity(path: &Path) -> Option<PackageIdentity> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<InstalledPackage>(&contents) {
        Ok(InstalledPackage {
            name: Some(name),
            version: Some(version),
        }) if !name.is_empty() && !version.is_empty() => Some(PackageIdentity::new(name, version)),
        _ => {
            debug!("Ignoring {} without a name and version", path.display());
            None
        },
    }
}
