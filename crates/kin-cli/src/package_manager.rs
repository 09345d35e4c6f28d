//! Package manager subprocess

use std::collections::BTreeSet;
use std::process::Stdio;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use kin_core::error::{KinError, KinResult};
use kin_core::PackageIdentity;
use tokio::process::Command;
use tracing::debug;

/// Which manifest section installed packages are saved into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    pub save: bool,
    pub save_dev: bool,
    pub save_peer: bool,
}

impl SaveOptions {
    pub fn dependencies() -> Self {
        Self {
            save: true,
            ..Self::default()
        }
    }

    pub fn dev_dependencies() -> Self {
        Self {
            save_dev: true,
            ..Self::default()
        }
    }

    /// Flags for `add`; exact versions are saved whenever anything is saved
    pub fn flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.save {
            flags.push("--save");
        }
        if self.save_dev {
            flags.push("--save-dev");
        }
        if self.save_peer {
            flags.push("--save-peer");
        }
        if self.save || self.save_dev || self.save_peer {
            flags.push("--save-exact");
        }
        flags
    }
}

/// Applies an install plan to the project
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, packages: &BTreeSet<PackageIdentity>, opts: SaveOptions) -> KinResult<()>;

    async fn dedupe(&self) -> KinResult<()>;
}

/// Runs `{program} add` and `{program} dedupe` with inherited stdio
pub struct PackageManager {
    program: String,
    cwd: Utf8PathBuf,
}

impl PackageManager {
    pub fn new(program: impl Into<String>, cwd: Utf8PathBuf) -> Self {
        Self {
            program: program.into(),
            cwd,
        }
    }

    /// Arguments of the `add` invocation
    pub fn install_args(packages: &BTreeSet<PackageIdentity>, opts: SaveOptions) -> Vec<String> {
        std::iter::once("add".to_string())
            .chain(packages.iter().map(PackageIdentity::to_string))
            .chain(opts.flags().into_iter().map(str::to_string))
            .collect()
    }

    async fn run(&self, args: Vec<String>) -> KinResult<()> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!("Running {} in {}", command, self.cwd);

        let status = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| KinError::PackageManager {
                command: command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(KinError::PackageManagerExit {
                command,
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

#[async_trait]
impl Installer for PackageManager {
    async fn install(&self, packages: &BTreeSet<PackageIdentity>, opts: SaveOptions) -> KinResult<()> {
        if packages.is_empty() {
            return Ok(());
        }
        self.run(Self::install_args(packages, opts)).await
    }

    async fn dedupe(&self) -> KinResult<()> {
        self.run(vec!["dedupe".to_string()]).await
    }
}
