//! Peer-dependency resolution engine for kin
//!
//! Keeps a family of packages that all peer-depend on one root package
//! mutually compatible. Three pieces:
//!
//! - `peers`: evaluates one manifest's peer requirements against a pool of
//!   available package versions
//! - `candidate`: picks one version per requested package through candidate
//!   elimination, re-running when chosen packages pull in family dependencies
//! - `walker`: walks workspace-linked peers and dependencies in the family's
//!   source history to find additional packages to install
//!
//! `audit` holds the helpers the doctor command builds on.

pub mod audit;
pub mod candidate;
pub mod peers;
pub mod walker;

// Re-export main types
pub use audit::{
    audit_installation, dependents_requiring_root, find_installed_root, installed_members,
    root_requirement, AuditEntry, RootMismatch,
};
pub use candidate::{
    CandidateResolver, EvaluationOrder, MissingPeers, Resolution, Selection, SelectionStats,
};
pub use peers::{match_peers, PeerMatchResult, UnsatisfiedPeer};
pub use walker::{PeerWalker, RequiredPeers};

use kin_core::error::KinError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, KinError>;
