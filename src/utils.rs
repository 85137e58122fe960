//! Utility functions for the directory browser.
//!
//! This module provides:
//! - Display-name collation used to keep sibling directories sorted
//! - A three-way path relation used by navigation
//! - Access-right probing via `libc::access`
//! - Glob-based exclusion pattern parsing

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Component, Path};

/// Compares two display names the way sibling directories are ordered.
///
/// Names are compared case-insensitively first; names that differ only by
/// case fall back to a plain byte comparison so the order stays total.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// How a node's path relates to a navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRelation {
    Unrelated,
    /// The node is a strict ancestor of the target
    Ancestor,
    Exact,
}

/// Classifies `node` against `target` component by component.
///
/// Trailing and repeated separators are ignored. On platforms with
/// case-insensitive filesystems components are compared case-folded.
pub fn path_relation(node: &Path, target: &Path) -> PathRelation {
    let mut node_parts = node.components().filter(|c| *c != Component::CurDir);
    let mut target_parts = target.components().filter(|c| *c != Component::CurDir);

    loop {
        match (node_parts.next(), target_parts.next()) {
            (None, None) => return PathRelation::Exact,
            (None, Some(_)) => return PathRelation::Ancestor,
            (Some(_), None) => return PathRelation::Unrelated,
            (Some(a), Some(b)) => {
                if !component_eq(a.as_os_str(), b.as_os_str()) {
                    return PathRelation::Unrelated;
                }
            }
        }
    }
}

#[cfg(any(target_os = "windows", target_os = "macos"))]
fn component_eq(a: &OsStr, b: &OsStr) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn component_eq(a: &OsStr, b: &OsStr) -> bool {
    a == b
}

/// Returns `(can_read, can_write)` for `path` as seen by the current user.
///
/// A directory is only readable when it can also be traversed, so read
/// access requires both `R_OK` and `X_OK`.
#[cfg(unix)]
pub fn access_rights(path: &Path) -> (bool, bool) {
    use libc::{R_OK, W_OK, X_OK, access};
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = match CString::new(path.as_os_str().as_bytes()) {
        Ok(p) => p,
        Err(_) => return (false, false),
    };

    let can_read = unsafe { access(c_path.as_ptr(), R_OK | X_OK) } == 0;
    let can_write = unsafe { access(c_path.as_ptr(), W_OK) } == 0;
    (can_read, can_write)
}

#[cfg(not(unix))]
pub fn access_rights(path: &Path) -> (bool, bool) {
    match std::fs::metadata(path) {
        Ok(meta) => (true, !meta.permissions().readonly()),
        Err(_) => (false, false),
    }
}

/// Expands exclude patterns into common glob forms:
/// For example, "node_modules" becomes:
///   - `**/node_modules`
///   - `**/node_modules/**`
///     unless the pattern already includes glob symbols or extensions.
pub fn expand_exclude_patterns(patterns: &[String]) -> Vec<String> {
    let mut expanded = Vec::new();

    for pat in patterns {
        let pat = pat.trim();
        if pat.is_empty() {
            continue;
        }
        if pat.contains('*') || pat.contains('[') || pat.ends_with('/') || pat.contains('.') {
            expanded.push(pat.to_string());
        } else {
            expanded.push(format!("**/{}", pat));
            expanded.push(format!("**/{}/**", pat));
        }
    }

    expanded
}

/// Compiles a list of glob patterns into a `GlobSet` matcher,
/// which can be used to test paths efficiently.
pub fn build_exclude_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("Invalid glob pattern: '{}'", pattern))?;
        builder.add(glob);
    }
    builder.build().context("Failed to build glob set")
}
