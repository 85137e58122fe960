//! Engine counters and profiling output.
//!
//! This module provides:
//! - [`EngineStats`] - Lock-free counters updated by the scheduler, the
//!   scanner threads and the merger
//! - [`PhaseTimer`] - A wrapper around `Instant` for timing CLI phases
//! - [`print_profile_summary`] - Terminal output for the collected numbers
//! - [`save_stats_json`] - JSON output for scripting integration
//!
//! # Usage
//!
//! ```rust
//! use foldertree::metrics::{EngineStats, PhaseTimer, ProfileData};
//!
//! let stats = EngineStats::default();
//! let timer = PhaseTimer::new("Navigate");
//! stats.batch_filed();
//!
//! let mut profile = ProfileData::new(stats.snapshot());
//! profile.add_phase(timer.finish());
//! assert_eq!(profile.stats.batches_filed, 1);
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared between the UI actor and the scanner threads.
#[derive(Debug, Default)]
pub struct EngineStats {
    workers_spawned: AtomicU64,
    scans_started: AtomicU64,
    batches_filed: AtomicU64,
    batches_discarded: AtomicU64,
    batches_stale: AtomicU64,
    descriptors_merged: AtomicU64,
    merge_passes: AtomicU64,
    scan_failures: AtomicU64,
}

impl EngineStats {
    pub fn worker_spawned(&self) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scan_started(&self) {
        self.scans_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_filed(&self) {
        self.batches_filed.fetch_add(1, Ordering::Relaxed);
    }

    /// A batch was refused because its work had been cancelled.
    pub fn batch_discarded(&self) {
        self.batches_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// A filed batch was dropped by the merger because its node had moved on.
    pub fn batch_stale(&self) {
        self.batches_stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn descriptors_merged(&self, count: usize) {
        self.descriptors_merged
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn merge_pass(&self) {
        self.merge_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scan_failed(&self) {
        self.scan_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            workers_spawned: self.workers_spawned.load(Ordering::Relaxed),
            scans_started: self.scans_started.load(Ordering::Relaxed),
            batches_filed: self.batches_filed.load(Ordering::Relaxed),
            batches_discarded: self.batches_discarded.load(Ordering::Relaxed),
            batches_stale: self.batches_stale.load(Ordering::Relaxed),
            descriptors_merged: self.descriptors_merged.load(Ordering::Relaxed),
            merge_passes: self.merge_passes.load(Ordering::Relaxed),
            scan_failures: self.scan_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub workers_spawned: u64,
    pub scans_started: u64,
    pub batches_filed: u64,
    pub batches_discarded: u64,
    pub batches_stale: u64,
    pub descriptors_merged: u64,
    pub merge_passes: u64,
    pub scan_failures: u64,
}

/// A timer for measuring the duration of a specific phase or operation.
#[derive(Debug, Clone)]
pub struct PhaseTimer {
    /// The name of the phase being timed
    pub name: String,
    /// The start time of the phase
    pub start: Instant,
}

impl PhaseTimer {
    /// Creates a new timer and starts timing the specified phase.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    /// Finishes timing the phase and returns the elapsed duration.
    pub fn finish(self) -> PhaseResult {
        PhaseResult {
            name: self.name,
            duration: self.start.elapsed(),
        }
    }
}

/// The result of a completed phase timing operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    /// The name of the phase that was timed
    pub name: String,
    /// The duration of the phase
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Custom serialization for Duration to make it human-readable in JSON
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Phase timings plus the engine counters of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileData {
    pub phases: Vec<PhaseResult>,
    pub stats: StatsSnapshot,
    /// Nodes materialized in the tree at the end of the run
    pub nodes: usize,
}

impl ProfileData {
    pub fn new(stats: StatsSnapshot) -> Self {
        Self {
            phases: Vec::new(),
            stats,
            nodes: 0,
        }
    }

    pub fn add_phase(&mut self, phase: PhaseResult) {
        self.phases.push(phase);
    }

    /// Gets the total duration of all phases combined.
    pub fn total_duration(&self) -> Duration {
        self.phases.iter().map(|p| p.duration).sum()
    }
}

/// Prints a formatted profile summary to stderr.
///
/// # Example Output
/// ```text
/// Phase timings
///   Initialize        3 ms
///   Navigate        120 ms
/// Scans:            42 (2 failed)
/// Batches:          57 filed, 3 discarded, 1 stale
/// ```
pub fn print_profile_summary(profile: &ProfileData) {
    eprintln!("\nPhase timings");
    for phase in &profile.phases {
        eprintln!("  {:<15} {:>7} ms", phase.name, phase.duration.as_millis());
    }

    let s = &profile.stats;
    eprintln!(
        "Scans:            {} ({} failed) on {} thread(s)",
        s.scans_started, s.scan_failures, s.workers_spawned
    );
    eprintln!(
        "Batches:          {} filed, {} discarded, {} stale",
        s.batches_filed, s.batches_discarded, s.batches_stale
    );
    eprintln!(
        "Merged:           {} rows in {} passes ({} nodes in tree)",
        s.descriptors_merged, s.merge_passes, profile.nodes
    );
    eprintln!();
}

/// Writes the profile as pretty-printed JSON to `path`.
pub fn save_stats_json(path: &Path, profile: &ProfileData) -> Result<()> {
    let stats = serde_json::json!({
        "phases": profile.phases,
        "total_duration_ms": profile.total_duration().as_millis() as u64,
        "engine": profile.stats,
        "nodes": profile.nodes,
    });

    let json = serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write stats to '{}'", path.display()))?;
    Ok(())
}
