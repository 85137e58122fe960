//! Library crate for foldertree
//!
//! A lazily populated directory tree for folder-browser views. Directories are
//! listed by background scanner threads and merged into the tree in small
//! batches by a single owner (the UI actor), so the tree stays responsive
//! while huge or slow directories are being read.
//!
//! # Modules
//!
//! - [`browser`]: The [`Browser`] facade: initialize, expand, collapse,
//!   refresh, select-by-path
//! - [`tree`]: Arena-backed tree model with generational node handles
//! - [`scheduler`]: Work queues and the on-demand scanner thread pool
//! - [`scan`]: Directory scanning and batching
//! - [`merge`]: Applying scan batches to the tree
//! - [`navigate`]: Multi-step navigation to a path
//! - [`fs`]: Filesystem access behind a trait
//! - [`output`]: Terminal and CSV renderers for the materialized tree
//! - [`metrics`]: Engine counters and profiling output

pub mod browser;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod fs;
pub mod logging;
pub mod merge;
pub mod metrics;
pub mod navigate;
pub mod output;
pub mod scan;
pub mod scheduler;
pub mod tree;
pub mod utils;

pub use browser::{Browser, ScanFailure, UiEvent, UiHandle};
pub use cli::Args;
pub use config::BrowserConfig;
pub use data::{ChildDescriptor, EntryKind, FsEntry, Marker, Operation};
pub use error::{BrowserError, ScanError};
pub use fs::{FilesystemProvider, LocalFilesystem};
pub use tree::{DirNode, DirTree, NodeId, NodeState};
