//! # kin-core
//!
//! Core types and utilities shared across all kin crates.
//!
//! This crate provides:
//! - npm-compatible Version and VersionReq types
//! - PackageIdentity and Manifest, the value objects the resolver works on
//! - Family, the description of a package family sharing one root package
//! - Settings shared with the configuration layer (evaluation order, default registry)
//! - KinError enum for unified error handling
//!
//! ## Architecture
//!
//! - `types`: Core data types (Version, Manifest, Family, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Path helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{KinError, KinResult};
pub use types::{
    satisfies, DependencyKind, DependencyMap, EvaluationOrder, Family, Manifest, PackageIdentity,
    Repository, Version, VersionReq, DEFAULT_REGISTRY,
};
