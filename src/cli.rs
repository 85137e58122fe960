//! CLI interface definitions for the `foldertree` application.
//!
//! This module defines command-line arguments using [`clap`] and maps them
//! onto a [`BrowserConfig`] with [`Args::to_config`].
//!
//! # Example
//!
//! ```bash
//! foldertree /srv /home --select /srv/music/Artist2/Disc1 --exclude lost+found --threads 4
//! ```

use crate::config::{BrowserConfig, DEFAULT_BATCH_SIZE};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the `foldertree` directory browser.
///
/// # Examples
///
/// ```rust
/// use foldertree::Args;
/// use clap::Parser;
///
/// let args = Args::parse_from(["foldertree", "/srv", "--show-hidden"]);
/// let config = args.to_config();
/// assert!(config.show_hidden);
/// assert_eq!(config.roots, vec![std::path::PathBuf::from("/srv")]);
/// ```
#[derive(Parser, Debug)]
#[command(name = "foldertree", author = "Sam Green", version, about)]
pub struct Args {
    /// Top-level directories of the tree (defaults to the filesystem root)
    #[arg(value_name = "ROOT")]
    pub roots: Vec<PathBuf>,

    /// Navigate to this directory once the roots are listed
    #[arg(long, value_name = "PATH")]
    pub select: Option<PathBuf>,

    /// Show directories whose names start with a dot
    #[arg(long, default_value_t = false)]
    pub show_hidden: bool,

    /// Limit the number of scanner threads (default: number of CPUs)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Number of directories per published batch
    #[arg(long, value_name = "N", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Exclude directories with matching names (e.g., '.git', 'node_modules')
    #[arg(long, value_name = "PATTERN", num_args = 1.., action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Write the tree to a CSV file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write engine statistics as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub stats: Option<PathBuf>,

    /// Give up waiting for the scanners after this many seconds
    #[arg(long, value_name = "N", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Maps the flags onto a browser configuration. Relative roots are left
    /// as given; the binary makes them absolute before building the browser.
    pub fn to_config(&self) -> BrowserConfig {
        let mut config = BrowserConfig {
            show_hidden: self.show_hidden,
            batch_size: self.batch_size,
            exclude: self.exclude.clone(),
            ..BrowserConfig::default()
        };
        if let Some(threads) = self.threads {
            config.max_threads = threads;
        }
        if !self.roots.is_empty() {
            config.roots = self.roots.clone();
        }
        config
    }
}

/// A single row of CSV output.
#[derive(Debug, serde::Serialize)]
pub struct CsvEntry {
    pub path: String,
    pub state: String,
    pub marker: String,
    pub depth: usize,
}
