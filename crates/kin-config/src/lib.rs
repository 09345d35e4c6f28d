//! Configuration and local manifest handling for kin
//!
//! This crate parses and validates `kin.toml`, layers it with the global
//! configuration, environment variables and command line flags, and reads the
//! project's `package.json`.

pub mod json;
pub mod merge;
pub mod toml;

// Re-export main types
pub use json::{filter_saved_in_deps, load_manifest};
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, KinConfig};
pub use toml::{FamilySection, KinToml, PackageManagerSection, RegistrySection, ResolverSection};

use kin_core::error::KinError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, KinError>;
