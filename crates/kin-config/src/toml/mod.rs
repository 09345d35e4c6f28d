//! kin.toml parsing and validation

use camino::Utf8Path;
use kin_core::error::KinError;
use kin_core::Family;
use kin_core::EvaluationOrder;
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// One kin.toml file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KinToml {
    #[serde(default)]
    pub family: FamilySection,

    #[serde(default)]
    pub resolver: ResolverSection,

    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub package_manager: PackageManagerSection,
}

/// `[family]`: which packages are kept aligned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FamilySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// `owner/repo` slug of the canonical source repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_protocol: Option<String>,
}

/// `[resolver]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_order: Option<EvaluationOrder>,
}

/// `[registry]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer token sent with every registry request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// `[package-manager]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManagerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

impl FamilySection {
    /// Overlay the keys set in this section onto `family`
    pub fn apply_to(&self, family: &mut Family) {
        let fields = [
            (&self.root, &mut family.root),
            (&self.prefix, &mut family.prefix),
            (&self.repository, &mut family.repository),
            (&self.raw_url, &mut family.raw_url),
            (&self.workspace_protocol, &mut family.workspace_protocol),
        ];
        for (value, target) in fields {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
    }
}

/// Parse a kin.toml document
pub fn parse_kin_toml(content: &str) -> ConfigResult<KinToml> {
    let config: KinToml = toml::from_str(content).map_err(|e| {
        let (line, column) = e
            .span()
            .map(|span| line_and_column(content, span.start))
            .unwrap_or((1, 1));
        KinError::TomlParse {
            message: e.message().to_string(),
            line,
            column,
        }
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Serialize back to TOML
pub fn serialize_kin_toml(config: &KinToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| KinError::TomlParse {
        message: format!("TOML serialization error: {}", e),
        line: 0,
        column: 0,
    })
}

/// Reject keys that are present but unusable
pub fn validate_config(config: &KinToml) -> ConfigResult<()> {
    let family = &config.family;
    let required = [
        ("family.root", &family.root),
        ("family.prefix", &family.prefix),
        ("family.repository", &family.repository),
        ("family.raw-url", &family.raw_url),
        ("family.workspace-protocol", &family.workspace_protocol),
        ("registry.url", &config.registry.url),
        ("package-manager.program", &config.package_manager.program),
    ];
    for (field, value) in required {
        if matches!(value, Some(v) if v.trim().is_empty()) {
            return Err(KinError::ConfigValidation {
                field: field.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
    }

    if let (Some(root), Some(prefix)) = (&family.root, &family.prefix) {
        if root.starts_with(prefix.as_str()) {
            return Err(KinError::ConfigValidation {
                field: "family.prefix".to_string(),
                reason: format!("the root package '{}' must not carry the member prefix", root),
            });
        }
    }

    for (field, url) in [("family.raw-url", &family.raw_url), ("registry.url", &config.registry.url)] {
        if let Some(url) = url {
            validate_url(field, url)?;
        }
    }

    if let Some(slug) = &family.repository {
        if slug.split('/').filter(|part| !part.is_empty()).count() != 2 {
            return Err(KinError::ConfigValidation {
                field: "family.repository".to_string(),
                reason: format!("expected 'owner/repo', got '{}'", slug),
            });
        }
    }

    Ok(())
}

pub(crate) fn validate_url(field: &str, url: &str) -> ConfigResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(KinError::ConfigValidation {
            field: field.to_string(),
            reason: format!("'{}' is not an http(s) URL", url),
        })
    }
}

/// Load and parse a kin.toml file
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<KinToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| KinError::io(format!("Failed to read {}: {}", path, e), e))?;

    parse_kin_toml(&content).map_err(|e| match e {
        KinError::TomlParse {
            message,
            line,
            column,
        } => KinError::TomlParse {
            message: format!("in {}: {}", path, message),
            line,
            column,
        },
        other => other,
    })
}

/// 1-based line and column of a byte offset
fn line_and_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map(|tail| tail.chars().count() + 1)
        .unwrap_or(1);
    (line, column)
}
