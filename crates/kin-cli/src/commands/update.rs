//! `kin update` command implementation.
//!
//! Moves the root package to a new version and re-resolves every installed
//! family package against it.

use std::collections::BTreeSet;

use kin_config::{filter_saved_in_deps, load_manifest};
use kin_core::error::KinResult;
use kin_core::PackageIdentity;
use kin_resolver::installed_members;

use super::{join, CommandContext};
use crate::package_manager::SaveOptions;

/// Execute the `kin update` command
pub async fn execute(version: String, ctx: &CommandContext) -> KinResult<()> {
    let family = ctx.family();

    ctx.output.info("Reading package.json...");
    let project = load_manifest(&ctx.cwd.join("package.json")).await?;

    let new_root = ctx
        .registry
        .view(&family.root_identity(version))
        .await?
        .identity();
    ctx.output.info(&format!("Checking packages for {}", new_root));

    ctx.output.info("Checking installed packages...");
    let installed = ctx.inventory.list_installed().await?;
    let mut requested: Vec<PackageIdentity> = Vec::new();
    for member in installed_members(&installed, family) {
        if !requested.iter().any(|r| r.name == member.name) {
            requested.push(PackageIdentity::new(member.name, "*"));
        }
    }

    let mut assumed: BTreeSet<PackageIdentity> = installed
        .into_iter()
        .filter(|id| !family.is_root(&id.name))
        .collect();
    assumed.insert(new_root.clone());

    let mut to_install = BTreeSet::from([new_root.clone()]);
    if !requested.is_empty() {
        let names: Vec<&str> = requested.iter().map(|r| r.name.as_str()).collect();
        ctx.output
            .info(&format!("Checking compatibility of {}...", names.join(" ")));
        let resolution = ctx.resolve(&new_root, requested, assumed).await?;
        ctx.report_alternatives(&resolution);
        ctx.report_missing_peers(&resolution);
        to_install.extend(resolution.identities());
    }

    let dev = filter_saved_in_deps(&project.dev_dependencies, &to_install);
    if !dev.is_empty() {
        ctx.output
            .step(&format!("About to install dev dependencies {}", join(&dev)));
        ctx.installer
            .install(&dev, SaveOptions::dev_dependencies())
            .await?;
    }

    let deps = filter_saved_in_deps(&project.dependencies, &to_install);
    if !deps.is_empty() {
        ctx.output
            .step(&format!("About to install dependencies {}", join(&deps)));
        ctx.installer
            .install(&deps, SaveOptions::dependencies())
            .await?;
    }

    ctx.installer.dedupe().await?;
    ctx.output.success(&format!("Updated to {}", new_root));
    Ok(())
}
