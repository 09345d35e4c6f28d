//! # kin
//!
//! Keeps a family of npm packages that peer-depend on one root package
//! version-aligned: installs new members at versions compatible with the
//! installed root, moves the root and every member forward together, and
//! audits an existing installation.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kin_core::error::{KinError, KinResult};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod inventory;
mod output;
mod package_manager;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Keep peer-dependent package families version-aligned
#[derive(Parser)]
#[command(name = "kin", version, about = "Keep peer-dependent package families version-aligned")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run as if started in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Registry URL, overriding configuration
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    /// Package manager program, overriding configuration
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub package_manager: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install family packages compatible with the installed root
    Install {
        /// Packages to install, as name or name@range
        #[arg(value_name = "PACKAGE")]
        packages: Vec<String>,
        /// Save into dependencies
        #[arg(long)]
        save: bool,
        /// Save into devDependencies
        #[arg(long)]
        save_dev: bool,
        /// Save into peerDependencies
        #[arg(long)]
        save_peer: bool,
        /// Skip installing workspace-linked peers
        #[arg(long)]
        exclude_peers: bool,
    },
    /// Update the root package and every installed family package
    Update {
        /// Root version or dist-tag to update to
        #[arg(default_value = "latest")]
        version: String,
    },
    /// Audit the installed family packages
    Doctor,
}

impl Cli {
    /// Flags that override configuration, keyed like the config layer expects
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(registry) = &self.registry {
            overrides.insert("registry".to_string(), registry.clone());
        }
        if let Some(program) = &self.package_manager {
            overrides.insert("package-manager".to_string(), program.clone());
        }
        overrides
    }
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting kin v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_cli(cli) {
        eprintln!("{}", ErrorFormatter::new().format_error(&e));
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> KinResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| KinError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let overrides = cli.overrides();
        let ctx = CommandContext::new(cli.cwd, overrides).await?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "kin={level},kin_core={level},kin_config={level},kin_registry={level},kin_resolver={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("kin encountered an unexpected error: {}", panic_info);
        eprintln!("kin crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}
