//! The folder browser: the UI actor that owns the tree.
//!
//! [`Browser`] is the single writer of the [`DirTree`] and of the navigation
//! state. Scanner threads never touch either; they talk back through the
//! [`UiHandle`] deferred-execution queue, which the browser drains in
//! [`Browser::pump`] or [`Browser::run_until_idle`].
//!
//! # Example
//!
//! ```no_run
//! use foldertree::{Browser, BrowserConfig};
//! use std::time::Duration;
//!
//! let config = BrowserConfig {
//!     roots: vec!["/srv".into()],
//!     ..BrowserConfig::default()
//! };
//! let mut browser = Browser::with_local_fs(config).unwrap();
//! browser.initialize().unwrap();
//! browser.select_dir("/srv/music/Artist2/Disc1");
//! browser.run_until_idle(Duration::from_secs(10));
//! println!("{:?}", browser.selected().and_then(|id| browser.full_path(id)));
//! ```

use crate::config::BrowserConfig;
use crate::data::{ChildDescriptor, Marker, Operation};
use crate::error::{BrowserError, Result};
use crate::fs::{FilesystemProvider, LocalFilesystem};
use crate::merge::apply_batch;
use crate::metrics::{EngineStats, StatsSnapshot};
use crate::navigate::{NavStep, PathNavigator, find_node};
use crate::scan::ScanSettings;
use crate::scheduler::{Batch, QueueDepths, Scheduler};
use crate::tree::{DirTree, NodeId, NodeState};
use crate::utils::{PathRelation, path_relation};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// A directory that could not be listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub node: NodeId,
    pub epoch: u64,
    pub path: PathBuf,
    pub op: Operation,
    /// The directory is one of the configured roots
    pub root: bool,
    pub message: String,
}

/// Messages posted to the UI actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Batches are waiting in the scheduler's UI queue
    MergeReady,
    ScanFailed(ScanFailure),
}

/// Posting side of the UI actor's queue. Events are handled in posting order.
#[derive(Debug, Clone)]
pub struct UiHandle {
    tx: Sender<UiEvent>,
}

impl UiHandle {
    pub fn channel() -> (Self, Receiver<UiEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    pub fn post(&self, event: UiEvent) {
        // The receiver only goes away with the browser itself.
        let _ = self.tx.send(event);
    }
}

pub struct Browser {
    config: BrowserConfig,
    tree: DirTree,
    scheduler: Scheduler,
    ui: UiHandle,
    events: Receiver<UiEvent>,
    navigator: PathNavigator,
    selected: Option<NodeId>,
    failures: Vec<ScanFailure>,
    stats: Arc<EngineStats>,
}

impl Browser {
    /// Creates a browser over `provider`. The tree stays empty until
    /// [`Browser::initialize`] is called.
    ///
    /// # Errors
    /// Returns [`BrowserError::Config`] when the configuration is invalid.
    pub fn new(config: BrowserConfig, provider: Arc<dyn FilesystemProvider>) -> Result<Self> {
        let validated = config.validate()?;
        let config = validated.config;
        let settings = ScanSettings::new(config.show_hidden, config.batch_size, validated.exclude);
        let stats = Arc::new(EngineStats::default());
        let (ui, events) = UiHandle::channel();
        let scheduler = Scheduler::new(
            provider,
            settings,
            config.max_threads,
            ui.clone(),
            Arc::clone(&stats),
        );

        Ok(Self {
            config,
            tree: DirTree::new(),
            scheduler,
            ui,
            events,
            navigator: PathNavigator::new(),
            selected: None,
            failures: Vec::new(),
            stats,
        })
    }

    /// Creates a browser over the local filesystem.
    pub fn with_local_fs(config: BrowserConfig) -> Result<Self> {
        Self::new(config, Arc::new(LocalFilesystem))
    }

    /// Rebuilds the tree from the configured roots.
    ///
    /// All outstanding work is cancelled and the scanner threads are drained
    /// before the old tree is dropped. Every root then gets a subdirectory
    /// check.
    pub fn initialize(&mut self) -> Result<()> {
        self.scheduler.drain();
        while self.events.try_recv().is_ok() {}

        self.tree.clear();
        self.navigator.clear();
        self.selected = None;
        self.failures.clear();

        info!(roots = self.config.roots.len(), "building directory tree");
        for root in self.config.roots.clone() {
            let id = self.tree.insert_root(root.clone());
            let epoch = self.epoch_of(id)?;
            self.scheduler
                .enqueue(id, root, Operation::SubdirCheck, epoch, true)?;
        }
        Ok(())
    }

    /// Requests the full listing of `id`.
    ///
    /// Does nothing when the node is already listed or a listing is on its way.
    pub fn expand(&mut self, id: NodeId) -> Result<()> {
        let node = self.tree.get(id).ok_or(BrowserError::StaleHandle(id))?;
        if node.is_placeholder() || node.state == NodeState::Populated || node.scan_pending {
            return Ok(());
        }
        let epoch = node.epoch;
        let root = node.parent().is_none();
        let path = self.tree.path_of(id).ok_or(BrowserError::StaleHandle(id))?;

        if let Some(node) = self.tree.get_mut(id) {
            node.scan_pending = true;
        }
        trace!(path = %path.display(), "expand");
        if let Err(e) = self.scheduler.enqueue(id, path, Operation::Populate, epoch, root) {
            if let Some(node) = self.tree.get_mut(id) {
                node.scan_pending = false;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Discards the listing of `id`, cancelling any scan at or below it.
    ///
    /// The node keeps a single placeholder child when it had (or may have)
    /// subdirectories, unless it is unreadable.
    pub fn collapse(&mut self, id: NodeId) -> Result<()> {
        let node = self.tree.get(id).ok_or(BrowserError::StaleHandle(id))?;
        if node.state != NodeState::Populated && !node.scan_pending {
            return Ok(());
        }
        let had_children = node.scan_pending || !node.children().is_empty();
        let unreadable = node.marker == Marker::Unreadable;
        let path = self.tree.path_of(id).ok_or(BrowserError::StaleHandle(id))?;

        if self.navigator.abandon_under(&self.tree, id) {
            debug!(path = %path.display(), "navigation abandoned by collapse");
        }
        self.scheduler.cancel_path(&path);

        self.tree.clear_children(id);
        let epoch = self.tree.next_epoch();
        if let Some(node) = self.tree.get_mut(id) {
            node.epoch = epoch;
            node.scan_pending = false;
            if unreadable {
                node.state = NodeState::Childless;
            } else if had_children {
                node.state = NodeState::HasCandidateChildren;
                node.marker = Marker::Closed;
            } else {
                node.state = NodeState::Childless;
                node.marker = Marker::Closed;
            }
        }
        if had_children && !unreadable {
            self.tree.insert_child(id, 0, &ChildDescriptor::placeholder());
        }

        if self.selected.is_some_and(|s| !self.tree.contains(s)) {
            self.selected = Some(id);
        }
        Ok(())
    }

    /// Lists `id` again from scratch, restoring the selection when the
    /// selected directory was below it and still exists.
    pub fn refresh(&mut self, id: NodeId) -> Result<()> {
        let path = self.tree.path_of(id).ok_or(BrowserError::StaleHandle(id))?;
        let reselect = self
            .selected
            .and_then(|s| self.tree.path_of(s))
            .filter(|s| path_relation(&path, s) == PathRelation::Ancestor);

        self.collapse(id)?;
        if let Some(node) = self.tree.get_mut(id) {
            // a failed listing may have marked it unreadable; try again
            if node.marker == Marker::Unreadable {
                node.marker = Marker::Closed;
                node.state = NodeState::HasCandidateChildren;
            }
        }
        self.expand(id)?;
        if let Some(target) = reselect {
            self.select_dir(target);
        }
        Ok(())
    }

    /// Navigates to `path`, expanding the directories on the way as their
    /// listings arrive.
    ///
    /// A new request replaces one that is still in progress. A path that does
    /// not exist, or is hidden by the filters, is abandoned silently and the
    /// current selection is kept.
    pub fn select_dir(&mut self, path: impl AsRef<Path>) {
        if let Some(previous) = self.navigator.target() {
            debug!(previous = %previous.display(), "navigation target superseded");
        }
        let step = self
            .navigator
            .request(&self.tree, path.as_ref().to_path_buf());
        self.apply_nav(step);
    }

    /// Finds the existing row for `path`, without scanning anything.
    pub fn find_node(&self, path: impl AsRef<Path>) -> Option<NodeId> {
        find_node(&self.tree, path.as_ref())
    }

    /// Absolute path of a row; `None` for placeholders and stale handles.
    pub fn full_path(&self, id: NodeId) -> Option<PathBuf> {
        self.tree.path_of(id)
    }

    pub fn tree(&self) -> &DirTree {
        &self.tree
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected.filter(|id| self.tree.contains(*id))
    }

    pub fn navigation_target(&self) -> Option<&Path> {
        self.navigator.target()
    }

    /// Returns the listing failures seen since the last call.
    pub fn take_failures(&mut self) -> Vec<ScanFailure> {
        std::mem::take(&mut self.failures)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn queue_depths(&self) -> QueueDepths {
        self.scheduler.depths()
    }

    /// Handles every event already posted, without blocking.
    ///
    /// Returns the number of events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// True when no work is queued, running, or waiting to be merged.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle() && self.events.is_empty()
    }

    /// Runs the UI loop until the engine is idle or `timeout` elapses.
    ///
    /// Returns `true` if the engine went idle.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.is_idle() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let wait = (deadline - now).min(Duration::from_millis(50));
            match self.events.recv_timeout(wait) {
                Ok(event) => self.handle(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    /// Cancels all work and waits for the scanner threads to exit.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
        self.navigator.clear();
    }

    fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::MergeReady => self.merge_pass(),
            UiEvent::ScanFailed(failure) => self.on_failure(failure),
        }
    }

    /// Merges queued batches until the budget is spent, then yields by
    /// re-posting itself if more are waiting.
    fn merge_pass(&mut self) {
        self.stats.merge_pass();
        let mut budget = self.config.merge_budget;
        while budget > 0 {
            let Some(batch) = self.scheduler.take_ui_batch() else {
                break;
            };
            budget = budget.saturating_sub(batch.children.len().max(1));
            self.merge_batch(batch);
        }
        if self.scheduler.has_ui_batches() {
            self.ui.post(UiEvent::MergeReady);
        }
    }

    fn merge_batch(&mut self, batch: Batch) {
        let Some(outcome) = apply_batch(&mut self.tree, &batch) else {
            self.stats.batch_stale();
            trace!(path = %batch.path.display(), op = batch.op.as_str(), "dropped stale batch");
            return;
        };
        self.stats.descriptors_merged(batch.children.len());
        if outcome.completed {
            debug!(path = %batch.path.display(), rows = self.tree.children_of(batch.node).len(), "listing complete");
        }

        for follow_up in outcome.follow_ups {
            if let Err(e) = self.scheduler.enqueue(
                follow_up.node,
                follow_up.path,
                Operation::SubdirCheck,
                follow_up.epoch,
                false,
            ) {
                warn!(error = %e, "could not queue subdirectory check");
            }
        }

        // a broken listing keeps the rows it produced and is then marked
        if let Some(failure) = batch.failure {
            self.on_failure(failure);
        } else if batch.op.is_interactive() {
            if let Some(step) = self.navigator.on_batch(&self.tree, batch.node) {
                self.apply_nav(step);
            }
        }
    }

    fn on_failure(&mut self, failure: ScanFailure) {
        if failure.root {
            error!(path = %failure.path.display(), error = %failure.message, "cannot read root directory");
        } else if failure.op == Operation::SubdirCheck {
            debug!(path = %failure.path.display(), error = %failure.message, "cannot check directory");
        } else {
            warn!(path = %failure.path.display(), error = %failure.message, "cannot list directory");
        }

        let current = self
            .tree
            .get(failure.node)
            .is_some_and(|n| n.epoch == failure.epoch);
        if current {
            let populated = self
                .tree
                .get(failure.node)
                .is_some_and(|n| n.state == NodeState::Populated);
            if !populated {
                self.tree.clear_children(failure.node);
            }
            if let Some(node) = self.tree.get_mut(failure.node) {
                node.marker = Marker::Unreadable;
                node.scan_pending = false;
                if !populated {
                    node.state = NodeState::Childless;
                }
            }
            if let Some(step) = self.navigator.on_batch(&self.tree, failure.node) {
                self.apply_nav(step);
            }
        }
        self.failures.push(failure);
    }

    fn apply_nav(&mut self, step: NavStep) {
        match step {
            NavStep::Select(id) => {
                self.selected = Some(id);
                if let Some(path) = self.tree.path_of(id) {
                    debug!(path = %path.display(), "navigation reached target");
                }
                if let Err(e) = self.expand(id) {
                    warn!(error = %e, "could not expand selected directory");
                }
            }
            NavStep::Expand(id) => {
                if let Err(e) = self.expand(id) {
                    warn!(error = %e, "navigation stopped");
                    self.navigator.clear();
                }
            }
            NavStep::Wait(_) => {}
            NavStep::Miss => debug!("navigation target not found"),
        }
    }

    fn epoch_of(&self, id: NodeId) -> Result<u64> {
        self.tree
            .get(id)
            .map(|n| n.epoch)
            .ok_or(BrowserError::StaleHandle(id))
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        self.scheduler.shutdown();
    }
}
