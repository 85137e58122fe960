//! Error types for the directory browser.

use crate::tree::NodeId;
use std::path::PathBuf;

/// Failure while enumerating a directory.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("cannot read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad entry in {}: {message}", path.display())]
    Entry { path: PathBuf, message: String },

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

impl ScanError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ScanError::ReadDir { path, .. } => path,
            ScanError::Entry { path, .. } => path,
            ScanError::NotADirectory(path) => path,
        }
    }
}

/// Errors surfaced by the [`crate::browser::Browser`] operations.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("node handle {0:?} no longer refers to a directory")]
    StaleHandle(NodeId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start scanner thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BrowserError>;
