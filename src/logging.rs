//! Tracing subscriber setup for the binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the application. Events go to stderr so they never mix with the tree
//! printed on stdout.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Level used when neither `RUST_LOG` nor `--verbose` says otherwise.
pub const DEFAULT_DIRECTIVE: &str = "warn";

/// Builds the filter: `RUST_LOG` wins, then `--verbose`, then the default.
pub fn build_filter(verbose: bool) -> Result<EnvFilter> {
    let fallback = if verbose { "foldertree=debug" } else { DEFAULT_DIRECTIVE };
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(spec) if !spec.trim().is_empty() => {
            EnvFilter::try_new(&spec).map_err(|e| anyhow!("invalid RUST_LOG '{spec}': {e}"))
        }
        _ => EnvFilter::try_new(fallback).map_err(|e| anyhow!("invalid log directive: {e}")),
    }
}

/// Call once near the start of `main`.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let filter = build_filter(verbose)?;
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_names(true)
                .with_filter(filter),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
