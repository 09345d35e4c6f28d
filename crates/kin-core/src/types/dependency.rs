//! Dependency section kinds.

use serde::{Deserialize, Serialize};

/// Which section of a manifest a dependency is declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// `dependencies`
    Normal,
    /// `devDependencies`
    Dev,
    /// `peerDependencies`, provided by the consumer
    Peer,
}

impl DependencyKind {
    /// Every kind, in manifest order
    pub const ALL: [DependencyKind; 3] = [
        DependencyKind::Normal,
        DependencyKind::Dev,
        DependencyKind::Peer,
    ];

    /// Field name used in package.json
    pub fn field_name(&self) -> &'static str {
        match self {
            DependencyKind::Normal => "dependencies",
            DependencyKind::Dev => "devDependencies",
            DependencyKind::Peer => "peerDependencies",
        }
    }
}
