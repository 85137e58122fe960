//! Runtime configuration for the directory browser.
//!
//! [`BrowserConfig`] carries the two settings the folder browser reads from
//! the application preferences (`show_hidden`, `max_threads`) plus the tuning
//! knobs of the scanner and merger. The CLI maps its flags onto this struct
//! in [`crate::cli::Args::to_config`].

use crate::error::BrowserError;
use crate::utils::{build_exclude_matcher, expand_exclude_patterns};
use globset::GlobSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of child descriptors a scanner accumulates before publishing a batch.
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Number of descriptors the UI actor merges before yielding.
pub const DEFAULT_MERGE_BUDGET: usize = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Show directories whose names start with a dot
    pub show_hidden: bool,
    /// Upper bound on concurrently running scanner threads
    pub max_threads: usize,
    pub batch_size: usize,
    pub merge_budget: usize,
    /// Top-level directories rebuilt by `Browser::initialize`
    pub roots: Vec<PathBuf>,
    /// Directory names or globs that are never listed
    pub exclude: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            show_hidden: false,
            max_threads: num_cpus::get(),
            batch_size: DEFAULT_BATCH_SIZE,
            merge_budget: DEFAULT_MERGE_BUDGET,
            roots: vec![PathBuf::from("/")],
            exclude: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Checks the configuration and compiles the exclude patterns.
    ///
    /// Zero-valued counts are clamped to one rather than rejected.
    pub fn validate(mut self) -> Result<ValidatedConfig, BrowserError> {
        if self.roots.is_empty() {
            return Err(BrowserError::Config("at least one root is required".into()));
        }
        if let Some(bad) = self.roots.iter().find(|r| !r.is_absolute()) {
            return Err(BrowserError::Config(format!(
                "root '{}' is not an absolute path",
                bad.display()
            )));
        }
        self.max_threads = self.max_threads.max(1);
        self.batch_size = self.batch_size.max(1);
        self.merge_budget = self.merge_budget.max(1);

        let patterns = expand_exclude_patterns(&self.exclude);
        let exclude =
            build_exclude_matcher(&patterns).map_err(|e| BrowserError::Config(format!("{e:#}")))?;

        Ok(ValidatedConfig {
            config: self,
            exclude,
        })
    }
}

/// A [`BrowserConfig`] that passed [`BrowserConfig::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: BrowserConfig,
    pub exclude: GlobSet,
}
