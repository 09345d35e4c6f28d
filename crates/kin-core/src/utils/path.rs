//! Path utilities for safe file system operations.
//!
//! Directories taken from registry metadata end up in fetch URLs and local
//! paths, so they are checked for traversal first.

use std::path::{Component, Path};

/// Check if a relative path stays inside its base directory
pub fn is_safe_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => depth += 1,
            _ => return false,
        }
    }

    true
}
