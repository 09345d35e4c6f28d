//! `kin install` command implementation.
//!
//! Resolves the requested family packages against the installed root, walks
//! their workspace-linked peers, and hands both sets to the package manager.

use std::collections::BTreeSet;

use kin_core::error::KinResult;
use kin_core::PackageIdentity;
use kin_resolver::{find_installed_root, PeerWalker};

use super::{join, CommandContext};
use crate::package_manager::SaveOptions;

/// Execute the `kin install` command
pub async fn execute(
    packages: Vec<String>,
    opts: SaveOptions,
    exclude_peers: bool,
    ctx: &CommandContext,
) -> KinResult<()> {
    let requested = packages
        .iter()
        .map(|spec| spec.parse::<PackageIdentity>())
        .collect::<KinResult<Vec<_>>>()?;

    let installed = ctx.inventory.list_installed().await?;
    let root = find_installed_root(&installed, ctx.family())?;
    ctx.output.info(&format!("Detected installed {}", root));

    if requested.is_empty() {
        ctx.output.info("Nothing to install");
        return Ok(());
    }

    ctx.output.info("Checking compatibility...");
    let resolution = ctx.resolve(&root, requested, installed).await?;
    let to_install = resolution.identities();

    let mut peers = BTreeSet::new();
    if !exclude_peers {
        ctx.output
            .info(&format!("Resolving {} peer dependencies...", ctx.family().root));
        let walked = PeerWalker::new(ctx.history.as_ref(), ctx.family())
            .resolve_required_peers(&to_install)
            .await?;
        for (name, range) in &walked.other_peers {
            ctx.output
                .info(&format!("{}@{} is expected as a peer", name, range));
        }
        peers = walked.peers;
    }

    ctx.report_alternatives(&resolution);
    ctx.report_missing_peers(&resolution);
    if !peers.is_empty() {
        ctx.output.warn(&format!(
            "Following packages will be added as well {}",
            join(&peers)
        ));
    }

    ctx.install_missing("packages", &to_install, opts).await?;
    ctx.install_missing("peers", &peers, opts).await?;

    ctx.output.success("Done");
    Ok(())
}
