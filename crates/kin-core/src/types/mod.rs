//! Core data types for kin.
//!
//! This module provides the fundamental types used throughout the workspace:
//! - Version types with npm range semantics
//! - Package identities and manifests
//! - Dependency kinds
//! - The package family definition

pub mod dependency;
pub mod family;
pub mod identity;
pub mod manifest;
pub mod settings;
pub mod version;

// Re-export all public types
pub use dependency::DependencyKind;
pub use family::Family;
pub use identity::{PackageIdentity, LATEST_TAG};
pub use manifest::{DependencyMap, Manifest, Repository};
pub use settings::{EvaluationOrder, DEFAULT_REGISTRY};
pub use version::{satisfies, Comparator, Op, Version, VersionError, VersionReq};
