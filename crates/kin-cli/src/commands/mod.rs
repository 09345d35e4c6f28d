//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking a [`CommandContext`], which owns
//! the configuration and every collaborator the command talks to.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use camino::Utf8PathBuf;
use kin_config::{ConfigLoader, KinConfig};
use kin_core::error::{KinError, KinResult};
use kin_core::{Family, PackageIdentity};
use kin_registry::{
    AuthConfig, ManifestHistory, MonorepoHistory, PackageRegistry, RegistryClient, RetryConfig,
};
use kin_resolver::{root_requirement, CandidateResolver, Resolution};
use tracing::{debug, info};

pub mod doctor;
pub mod install;
pub mod update;


use crate::inventory::NodeModulesInventory;
use crate::output::OutputHandler;
use crate::package_manager::{Installer, PackageManager, SaveOptions};
use crate::Commands;

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub config: KinConfig,
    pub output: OutputHandler,
    pub registry: Arc<dyn PackageRegistry>,
    pub history: Arc<dyn ManifestHistory>,
    pub inventory: NodeModulesInventory,
    pub installer: Arc<dyn Installer>,
}

impl CommandContext {
    /// Load configuration for `cwd` (or the current directory) and wire up
    /// the HTTP registry, the family history and the package manager
    pub async fn new(cwd: Option<PathBuf>, overrides: HashMap<String, String>) -> KinResult<Self> {
        let cwd = match cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir()
                .map_err(|e| KinError::io("Failed to get current directory".to_string(), e))?,
        };
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| KinError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("not valid UTF-8: {}", e),
        })?;

        let (config, sources) = ConfigLoader::new(cwd.clone()).load(&overrides).await?;
        debug!("Configuration sources: {:?}", sources);

        let auth = AuthConfig {
            token: config.registry_token.clone(),
            ..AuthConfig::default()
        };
        let client =
            RegistryClient::with_config(config.registry_url.clone(), auth, RetryConfig::default())?;
        let history = MonorepoHistory::new(client.clone(), client.http().clone(), config.family.clone());
        let installer = PackageManager::new(config.package_manager.clone(), cwd.clone());

        Ok(Self {
            inventory: NodeModulesInventory::new(&cwd),
            output: OutputHandler::new(),
            registry: Arc::new(client),
            history: Arc::new(history),
            installer: Arc::new(installer),
            config,
            cwd,
        })
    }

    pub fn family(&self) -> &Family {
        &self.config.family
    }

    pub fn resolver(&self) -> CandidateResolver<'_, dyn PackageRegistry> {
        CandidateResolver::new(self.registry.as_ref(), &self.config.family)
            .with_order(self.config.evaluation_order)
    }

    /// Resolve `requested` against `root`, reporting what each incompatible
    /// package expects of the root before failing
    pub async fn resolve(
        &self,
        root: &PackageIdentity,
        requested: Vec<PackageIdentity>,
        installed: BTreeSet<PackageIdentity>,
    ) -> KinResult<Resolution> {
        match self.resolver().resolve(root, requested, installed).await {
            Ok(resolution) => {
                debug!(
                    "Resolved in {} round(s), last selection took {} pass(es) over pools of {:?}",
                    resolution.rounds, resolution.stats.passes, resolution.stats.pool_sizes
                );
                Ok(resolution)
            },
            Err(e) => {
                if let KinError::IncompatibleWithRoot { package, .. } = &e {
                    self.report_root_requirement(package).await;
                }
                Err(e)
            },
        }
    }

    async fn report_root_requirement(&self, package: &str) {
        let Ok(spec) = package.parse::<PackageIdentity>() else {
            return;
        };
        match root_requirement(self.registry.as_ref(), self.family(), &spec).await {
            Ok(Some(mismatch)) => self.output.error(&mismatch.to_string()),
            Ok(None) => self.output.error(&format!(
                "{} does not declare a peer dependency on {}",
                spec.name,
                self.family().root
            )),
            Err(e) => debug!("Could not look up {}: {}", spec, e),
        }
    }

    /// Warn about exact requests that resolved to another version
    pub fn report_alternatives(&self, resolution: &Resolution) {
        for alternative in resolution.alternatives() {
            self.output.warn(&format!("{} will be used instead", alternative));
        }
    }

    /// Warn about peers the resolution accepted as missing
    pub fn report_missing_peers(&self, resolution: &Resolution) {
        for (package, peers) in &resolution.missing_peers {
            self.output.warn(&format!(
                "{} expects {} as a peer, which is not installed",
                package,
                join(peers)
            ));
        }
    }

    /// Install `packages` unless all of them are already installed
    pub async fn install_missing(
        &self,
        label: &str,
        packages: &BTreeSet<PackageIdentity>,
        opts: SaveOptions,
    ) -> KinResult<()> {
        let missing = self.inventory.exclude_installed_packages(packages).await;
        if missing.is_empty() {
            return Ok(());
        }
        self.output
            .step(&format!("About to install {} {}", label, join(&missing)));
        self.installer.install(&missing, opts).await
    }
}

/// Space separated `name@version` list
pub fn join<'a>(ids: impl IntoIterator<Item = &'a PackageIdentity>) -> String {
    ids.into_iter()
        .map(PackageIdentity::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> KinResult<()> {
    match command {
        Commands::Install {
            packages,
            save,
            save_dev,
            save_peer,
            exclude_peers,
        } => {
            info!("Installing {:?}", packages);
            let opts = SaveOptions {
                save,
                save_dev,
                save_peer,
            };
            install::execute(packages, opts, exclude_peers, ctx).await
        },
        Commands::Update { version } => {
            info!("Updating {} to {}", ctx.family().root, version);
            update::execute(version, ctx).await
        },
        Commands::Doctor => {
            info!("Auditing installed {} packages", ctx.family().root);
            doctor::execute(ctx).await
        },
    }
}
