//! `kin doctor` command implementation.
//!
//! Audits the installed family packages against the installed inventory,
//! treating missing peers as problems, and suggests the set the resolver
//! would pick instead.

use std::collections::BTreeSet;

use kin_config::load_manifest;
use kin_core::error::KinResult;
use kin_core::{Manifest, PackageIdentity};
use kin_resolver::{
    audit_installation, dependents_requiring_root, find_installed_root, installed_members,
};
use tracing::debug;

use super::{join, CommandContext};

/// Execute the `kin doctor` command
pub async fn execute(ctx: &CommandContext) -> KinResult<()> {
    let family = ctx.family();
    let installed = ctx.inventory.list_installed().await?;
    let root = find_installed_root(&installed, family)?;
    ctx.output.info(&format!("Checking packages for {}", root));

    ctx.output.info("Checking installed packages...");
    let mut names: Vec<String> = Vec::new();
    for member in installed_members(&installed, family) {
        if !names.contains(&member.name) {
            names.push(member.name);
        }
    }
    if names.is_empty() {
        ctx.output
            .info(&format!("No installed {} packages.", family.prefix.trim_end_matches('/')));
        return Ok(());
    }

    let manifests = ctx
        .inventory
        .read_manifests(names.iter().map(String::as_str))
        .await;
    let report = audit_installation(&manifests, &installed);
    for entry in &report {
        for peer in &entry.unsatisfied {
            let problem = if peer.is_missing() {
                "which is not installed".to_string()
            } else {
                format!("found {}", peer.found.join(", "))
            };
            ctx.output.error(&format!(
                "{} requires {}@{}, {}",
                entry.package, peer.name, peer.range, problem
            ));
        }
    }
    if report.is_empty() {
        ctx.output.success("All peer dependencies are satisfied");
    }

    let dependents = project_dependents(ctx).await;
    if !dependents.is_empty() {
        ctx.output.info(&format!(
            "Dependencies requiring {}: {}",
            family.root,
            join(&dependents)
        ));
    }

    ctx.output.info(&format!("Checking compatibility of {}...", names.join(" ")));
    let requested = names
        .into_iter()
        .map(|name| PackageIdentity::new(name, "*"))
        .collect();
    match ctx.resolve(&root, requested, installed).await {
        Ok(resolution) => {
            ctx.output.info(&format!(
                "Compatible packages {}",
                join(&resolution.identities())
            ));
        },
        Err(e) => ctx.output.error(&e.to_string()),
    }

    Ok(())
}

/// Project dependencies whose installed manifest peers on the root
async fn project_dependents(ctx: &CommandContext) -> Vec<PackageIdentity> {
    let project = match load_manifest(&ctx.cwd.join("package.json")).await {
        Ok(project) => project,
        Err(e) => {
            debug!("Skipping dependents: {}", e);
            return Vec::new();
        },
    };
    let names: BTreeSet<String> = project
        .all_declared_dependencies()
        .into_iter()
        .map(|dependency| dependency.name)
        .collect();
    let manifests = ctx
        .inventory
        .read_manifests(names.iter().map(String::as_str))
        .await;
    dependents_requiring_root(&manifests, ctx.family())
        .into_iter()
        .map(Manifest::identity)
        .collect()
}
