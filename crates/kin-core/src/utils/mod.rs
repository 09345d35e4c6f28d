//! Utility functions and helpers.

pub mod path;

pub use path::is_safe_path;
