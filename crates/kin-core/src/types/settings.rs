//! Settings shared by the configuration layer and the crates it configures.

use crate::error::KinError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Public npm registry
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Order in which requested packages are evaluated within one resolver pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationOrder {
    /// Request order
    #[default]
    Requested,
    /// Highest picked version first, ties in request order.
    ///
    /// Versions of different packages carry no shared meaning, so this is
    /// only a heuristic: it tends to settle packages that release often
    /// before the ones that peer on them.
    HighestVersion,
}

impl fmt::Display for EvaluationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationOrder::Requested => f.write_str("requested"),
            EvaluationOrder::HighestVersion => f.write_str("highest-version"),
        }
    }
}

impl FromStr for EvaluationOrder {
    type Err = KinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "requested" => Ok(EvaluationOrder::Requested),
            "highest-version" => Ok(EvaluationOrder::HighestVersion),
            other => Err(KinError::ConfigValidation {
                field: "resolver.evaluation-order".to_string(),
                reason: format!(
                    "expected 'requested' or 'highest-version', got '{}'",
                    other
                ),
            }),
        }
    }
}
