//! Error types and result aliases for Kin operations.
//!
//! Provides a unified error type that covers every failure the resolver and
//! its collaborators can report, with actionable error messages.

use thiserror::Error;

/// Unified error type for all Kin operations
#[derive(Error, Debug)]
pub enum KinError {
    // Manifest errors
    #[error("Encountered an issue parsing the package.json:\n\n{issue}")]
    MalformedManifest { contents: String, issue: String },

    #[error("Invalid package specifier '{spec}'")]
    InvalidSpecifier { spec: String },

    #[error("Could not find package.json at {path}")]
    ManifestNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Config errors
    #[error("Failed to parse kin.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    #[error("Package '{name}' not found in registry")]
    PackageNotFound { name: String },

    #[error("No version of '{name}' matches '{range}'")]
    VersionNotFound { name: String, range: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Resolution errors
    #[error("No version of {package} is compatible with {root}")]
    IncompatibleWithRoot { package: String, root: String },

    #[error("No consistent version of {name} could be found")]
    NoConsistentCandidate { name: String },

    #[error("{package} is not part of the family source tree")]
    NotAFamilyPackage { package: String },

    #[error("{name} is not installed")]
    RootPackageNotFound { name: String },

    #[error("Multiple versions of {name} are installed: {}", versions.join(", "))]
    MultipleRootVersions { name: String, versions: Vec<String> },

    // Installer errors
    #[error("Failed to run '{command}'")]
    PackageManager {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with code {code}")]
    PackageManagerExit { command: String, code: i32 },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Kin operations
pub type KinResult<T> = Result<T, KinError>;

impl KinError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, KinError::Network { .. } | KinError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            KinError::PackageNotFound { .. } => {
                Some("Check the package name spelling or try searching the registry")
            },
            KinError::VersionNotFound { .. } => {
                Some("Check the published versions with 'npm view <package> versions'")
            },
            KinError::Network { .. } => Some("Check your internet connection and try again"),
            KinError::IncompatibleWithRoot { .. } => {
                Some("Run 'kin update' to move the root package to a compatible version")
            },
            KinError::NoConsistentCandidate { .. } => {
                Some("Request fewer packages at once or relax the requested ranges")
            },
            KinError::RootPackageNotFound { .. } => {
                Some("Install the root package first, then retry")
            },
            KinError::MultipleRootVersions { .. } => {
                Some("Deduplicate the root package so only one version is installed")
            },
            KinError::ManifestNotFound { .. } => {
                Some("Run kin from a directory containing package.json or pass --cwd")
            },
            KinError::PackageManager { .. } => {
                Some("Make sure the package manager is installed and on PATH")
            },
            _ => None,
        }
    }
}
