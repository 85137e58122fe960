//! Main entry point for the `foldertree` CLI application.
//!
//! `foldertree` builds the lazily populated directory tree used by folder
//! browser views, expands the roots, optionally navigates to a directory, and
//! prints what has been materialized once the background scanners go idle.
//!
//! # Responsibilities
//! - Parses CLI arguments via [`clap`] using the [`Args`] struct
//! - Installs the `tracing` subscriber
//! - Drives the [`Browser`] UI loop with a progress spinner
//! - Handles terminal or CSV output and the optional JSON statistics

use anyhow::{Context, Result};
use clap::Parser;
use foldertree::metrics::{PhaseTimer, ProfileData, print_profile_summary, save_stats_json};
use foldertree::output::{collect_rows, render_csv, render_terminal};
use foldertree::utils::{PathRelation, path_relation};
use foldertree::{Args, Browser, BrowserConfig, logging};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Makes relative roots absolute against the working directory.
fn absolute_roots(config: &mut BrowserConfig) -> Result<()> {
    let roots: Result<Vec<PathBuf>> = config
        .roots
        .iter()
        .map(|r| {
            std::path::absolute(r)
                .with_context(|| format!("Failed to resolve root '{}'", r.display()))
        })
        .collect();
    config.roots = roots?;
    Ok(())
}

/// Runs the UI loop until the scanners go idle or the timeout expires.
fn wait_for_scanners(browser: &mut Browser, timeout: Duration) -> Result<bool> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner} Scanning directories... [{elapsed}] {msg}")
            .context("Failed to set progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let deadline = Instant::now() + timeout;
    let idle = loop {
        if browser.run_until_idle(Duration::from_millis(100)) {
            break true;
        }
        if Instant::now() >= deadline {
            break false;
        }
        let depths = browser.queue_depths();
        pb.set_message(format!(
            "{} queued, {} scanning, {} rows",
            depths.pending,
            depths.in_progress,
            browser.tree().len()
        ));
    };

    if idle {
        pb.finish_with_message("Scan complete ✅");
    } else {
        pb.finish_with_message("Timed out ⏱");
    }
    Ok(idle)
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing(args.verbose)?;

    let mut config = args.to_config();
    absolute_roots(&mut config)?;
    let mut browser =
        Browser::with_local_fs(config).context("Failed to set up the directory browser")?;

    let mut phases = Vec::new();

    let timer = PhaseTimer::new("Initialize");
    browser.initialize().context("Failed to initialize the tree")?;
    for root in browser.tree().roots().to_vec() {
        browser.expand(root).context("Failed to expand root")?;
    }
    phases.push(timer.finish());

    let select = args
        .select
        .as_ref()
        .map(|t| {
            std::path::absolute(t).with_context(|| format!("Failed to resolve '{}'", t.display()))
        })
        .transpose()?;

    let timer = PhaseTimer::new("Navigate");
    if let Some(target) = &select {
        info!(target = %target.display(), "navigating");
        browser.select_dir(target);
    }
    let idle = wait_for_scanners(&mut browser, Duration::from_secs(args.timeout_secs))?;
    phases.push(timer.finish());
    if !idle {
        warn!(timeout_secs = args.timeout_secs, "scanners still busy, printing partial tree");
    }

    for failure in browser.take_failures() {
        eprintln!("cannot read {}: {}", failure.path.display(), failure.message);
    }
    if let Some(target) = &select {
        let reached = browser
            .selected()
            .and_then(|id| browser.full_path(id))
            .is_some_and(|p| path_relation(&p, target) == PathRelation::Exact);
        if !reached {
            eprintln!("Directory not found: {}", target.display());
        }
    }

    let timer = PhaseTimer::new("Render");
    let rows = collect_rows(browser.tree(), browser.selected());
    match &args.output {
        Some(path) => render_csv(&rows, Some(path.as_path()))?,
        None => render_terminal(&rows, &mut std::io::stdout().lock())?,
    }
    phases.push(timer.finish());

    let mut profile = ProfileData::new(browser.stats());
    profile.nodes = browser.tree().len();
    for phase in phases {
        profile.add_phase(phase);
    }
    if args.verbose {
        print_profile_summary(&profile);
    }
    if let Some(path) = &args.stats {
        save_stats_json(path, &profile)?;
        eprintln!("Statistics written to: {}", path.display());
    }

    browser.shutdown();
    Ok(())
}
