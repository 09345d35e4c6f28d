//! Configuration layering, fallback logic, and environment overrides
//!
//! Later layers win: built-in defaults, `~/.kin/config.toml`, the nearest
//! `kin.toml` above the working directory, `KIN_*` environment variables,
//! then command line flags.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use kin_core::error::KinError;
use kin_core::Family;
use kin_core::{EvaluationOrder, DEFAULT_REGISTRY};
use tracing::debug;

use crate::toml::{load_from_file, validate_url, KinToml};
use crate::ConfigResult;

/// Project configuration file name
pub const CONFIG_FILE: &str = "kin.toml";

/// Package manager used when none is configured
pub const DEFAULT_PACKAGE_MANAGER: &str = "pnpm";

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct KinConfig {
    pub family: Family,
    pub evaluation_order: EvaluationOrder,
    pub registry_url: String,
    pub registry_token: Option<String>,
    pub package_manager: String,
}

impl Default for KinConfig {
    fn default() -> Self {
        Self {
            family: Family::default(),
            evaluation_order: EvaluationOrder::default(),
            registry_url: DEFAULT_REGISTRY.to_string(),
            registry_token: None,
            package_manager: DEFAULT_PACKAGE_MANAGER.to_string(),
        }
    }
}

/// Where a configuration layer came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Defaults,
    Global(Utf8PathBuf),
    Project(Utf8PathBuf),
    Environment(String),
    CommandLine,
}

/// Finds and loads every configuration layer
pub struct ConfigLoader {
    cwd: Utf8PathBuf,
    home: Option<Utf8PathBuf>,
}

/// Merges configuration layers
pub struct ConfigLayering;

impl ConfigLoader {
    /// Loader rooted at `cwd`, reading the global config from the home directory
    pub fn new(cwd: Utf8PathBuf) -> Self {
        let home = dirs::home_dir().and_then(|home| Utf8PathBuf::try_from(home).ok());
        Self { cwd, home }
    }

    /// Loader with an explicit home directory, or none
    pub fn with_home(cwd: Utf8PathBuf, home: Option<Utf8PathBuf>) -> Self {
        Self { cwd, home }
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Nearest kin.toml in the working directory or its ancestors
    pub fn find_project_config(&self) -> Option<Utf8PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|path| path.is_file())
    }

    pub fn global_config_path(&self) -> Option<Utf8PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(".kin").join("config.toml"))
    }

    /// Load the global config, if present
    pub async fn load_global_config(&self) -> ConfigResult<Option<(KinToml, Utf8PathBuf)>> {
        match self.global_config_path() {
            Some(path) if path.is_file() => Ok(Some((load_from_file(&path).await?, path))),
            _ => Ok(None),
        }
    }

    /// Load the project config, if present
    pub async fn load_project_config(&self) -> ConfigResult<Option<(KinToml, Utf8PathBuf)>> {
        match self.find_project_config() {
            Some(path) => Ok(Some((load_from_file(&path).await?, path))),
            None => Ok(None),
        }
    }

    /// Every layer merged, with the sources that contributed
    pub async fn load(
        &self,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<(KinConfig, Vec<ConfigSource>)> {
        let env_overrides: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with("KIN_"))
            .collect();
        self.load_with_env(&env_overrides, cli_overrides).await
    }

    /// Same as [`ConfigLoader::load`] with explicit environment variables
    pub async fn load_with_env(
        &self,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<(KinConfig, Vec<ConfigSource>)> {
        let mut sources = vec![ConfigSource::Defaults];
        let mut files = Vec::new();

        if let Some((global, path)) = self.load_global_config().await? {
            debug!("Loaded global config from {}", path);
            sources.push(ConfigSource::Global(path));
            files.push(global);
        }
        if let Some((project, path)) = self.load_project_config().await? {
            debug!("Loaded project config from {}", path);
            sources.push(ConfigSource::Project(path));
            files.push(project);
        }

        let config = ConfigLayering::merge_configs(&files, env_overrides, cli_overrides)?;

        let mut env_keys: Vec<&String> = env_overrides
            .keys()
            .filter(|key| ConfigLayering::ENV_KEYS.contains(&key.as_str()))
            .collect();
        env_keys.sort();
        sources.extend(env_keys.into_iter().map(|key| ConfigSource::Environment(key.clone())));
        if !cli_overrides.is_empty() {
            sources.push(ConfigSource::CommandLine);
        }

        Ok((config, sources))
    }
}

impl ConfigLayering {
    /// Environment variables that override configuration
    pub const ENV_KEYS: [&'static str; 6] = [
        "KIN_FAMILY_ROOT",
        "KIN_FAMILY_PREFIX",
        "KIN_REGISTRY_URL",
        "KIN_REGISTRY_TOKEN",
        "KIN_PACKAGE_MANAGER",
        "KIN_EVALUATION_ORDER",
    ];

    /// Merge file layers (lowest priority first) over the defaults, then apply
    /// environment and command line overrides
    pub fn merge_configs(
        files: &[KinToml],
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<KinConfig> {
        let mut merged = KinConfig::default();

        for file in files {
            file.family.apply_to(&mut merged.family);
            if let Some(order) = file.resolver.evaluation_order {
                merged.evaluation_order = order;
            }
            if let Some(url) = &file.registry.url {
                merged.registry_url = url.clone();
            }
            if let Some(token) = &file.registry.token {
                merged.registry_token = Some(token.clone());
            }
            if let Some(program) = &file.package_manager.program {
                merged.package_manager = program.clone();
            }
        }

        Self::apply_env_overrides(&mut merged, env_overrides)?;
        Self::apply_cli_overrides(&mut merged, cli_overrides)?;

        Ok(merged)
    }

    fn apply_env_overrides(
        config: &mut KinConfig,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "KIN_FAMILY_ROOT" => config.family.root = value.clone(),
                "KIN_FAMILY_PREFIX" => config.family.prefix = value.clone(),
                "KIN_REGISTRY_URL" => {
                    validate_url(key, value)?;
                    config.registry_url = value.clone();
                },
                "KIN_REGISTRY_TOKEN" => config.registry_token = Some(value.clone()),
                "KIN_PACKAGE_MANAGER" => config.package_manager = value.clone(),
                "KIN_EVALUATION_ORDER" => config.evaluation_order = value.parse()?,
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }

        Ok(())
    }

    fn apply_cli_overrides(
        config: &mut KinConfig,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "registry" => {
                    validate_url("--registry", value)?;
                    config.registry_url = value.clone();
                },
                "package-manager" => config.package_manager = value.clone(),
                "evaluation-order" => config.evaluation_order = value.parse()?,
                _ => {
                    return Err(KinError::ConfigValidation {
                        field: key.clone(),
                        reason: "unknown command line override".to_string(),
                    });
                },
            }
        }

        Ok(())
    }
}
