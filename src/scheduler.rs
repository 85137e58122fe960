//! Work scheduling between the UI actor and the scanner threads.
//!
//! The [`Scheduler`] owns three queues under one mutex:
//!
//! - **pending**: work items not yet picked up by a worker. `Populate` requests
//!   go to the front, background `SubdirCheck`s to the back.
//! - **in progress**: cancellation flags of the items workers are scanning.
//! - **UI pending**: published batches waiting for the merger. Interactive
//!   batches (`Populate`/`AddSubdir`) are served before `SubdirCheck` batches;
//!   within each class batches keep their publication order.
//!
//! Worker threads are spawned on demand up to `max_threads` and exit as soon
//! as the pending queue is empty, so no worker ever sleeps waiting for work.
//! The condition variable is used only by [`Scheduler::drain`] and
//! [`Scheduler::shutdown`] to wait for the last worker to leave.

use crate::browser::{ScanFailure, UiEvent, UiHandle};
use crate::data::{ChildDescriptor, Operation};
use crate::error::{BrowserError, Result};
use crate::fs::FilesystemProvider;
use crate::metrics::EngineStats;
use crate::scan::{DirectoryScanner, ScanSettings};
use crate::tree::NodeId;
use crate::utils::{PathRelation, collate, path_relation};
use fnv::FnvHashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, trace, warn};

/// One unit of scanning work.
///
/// The node handle is carried as payload only; workers never resolve it.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: u64,
    pub node: NodeId,
    pub path: PathBuf,
    pub op: Operation,
    /// Node epoch at the time the work was requested
    pub epoch: u64,
    /// The node is a top-level directory
    pub root: bool,
    cancelled: Arc<AtomicBool>,
}

impl WorkItem {
    pub fn new(id: u64, node: NodeId, path: PathBuf, op: Operation, epoch: u64, root: bool) -> Self {
        Self {
            id,
            node,
            path,
            op,
            epoch,
            root,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Wraps scan results for this item into a batch for the merger.
    pub fn batch(&self, op: Operation, children: Vec<ChildDescriptor>, last: bool) -> Batch {
        Batch {
            node: self.node,
            path: self.path.clone(),
            op,
            epoch: self.epoch,
            children,
            last,
            failure: None,
        }
    }

    pub fn failure(&self, message: String) -> ScanFailure {
        ScanFailure {
            node: self.node,
            epoch: self.epoch,
            path: self.path.clone(),
            op: self.op,
            root: self.root,
            message,
        }
    }
}

/// A group of child descriptors from one scan pass, merged as a unit.
#[derive(Debug, Clone)]
pub struct Batch {
    pub node: NodeId,
    pub path: PathBuf,
    pub op: Operation,
    pub epoch: u64,
    pub children: Vec<ChildDescriptor>,
    /// No further batches follow for this scan
    pub last: bool,
    /// The listing broke off after these entries. Only set on the last batch,
    /// so the failure is handled after every row the scan did produce.
    pub failure: Option<ScanFailure>,
}

/// Outcome of handing a batch to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Filed,
    /// The work was cancelled; the scanner should stop.
    Discarded,
}

/// Receiver of scanner output.
pub trait BatchSink {
    fn publish(&self, item: &WorkItem, batch: Batch) -> Delivery;
    fn report_failure(&self, item: &WorkItem, failure: ScanFailure);
}

/// Queue sizes at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct QueueDepths {
    pub pending: usize,
    pub in_progress: usize,
    pub ui_pending: usize,
    pub workers: usize,
}

#[derive(Default)]
struct PoolState {
    pending: VecDeque<WorkItem>,
    in_progress: FnvHashMap<u64, WorkItem>,
    ui_interactive: VecDeque<Batch>,
    ui_background: VecDeque<Batch>,
    current_workers: usize,
    shutting_down: bool,
    closed: bool,
    next_id: u64,
    next_worker: u64,
}

impl PoolState {
    fn ui_is_empty(&self) -> bool {
        self.ui_interactive.is_empty() && self.ui_background.is_empty()
    }

    /// Empties the pending queue once no worker is left to drain it. The item
    /// `caller` is dropped since its error goes back to the caller; all other
    /// items are returned.
    fn take_stranded(&mut self, caller: u64) -> Vec<WorkItem> {
        self.pending.drain(..).filter(|item| item.id != caller).collect()
    }

    fn purge_queued(&mut self) {
        self.pending.clear();
        self.ui_interactive.clear();
        self.ui_background.clear();
        for item in self.in_progress.values() {
            item.cancel();
        }
    }
}

struct Shared {
    state: Mutex<PoolState>,
    workers_done: Condvar,
    provider: Arc<dyn FilesystemProvider>,
    settings: ScanSettings,
    max_threads: usize,
    ui: UiHandle,
    stats: Arc<EngineStats>,
}

/// Owner of the work queues and the scanner thread pool.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    pub fn new(
        provider: Arc<dyn FilesystemProvider>,
        settings: ScanSettings,
        max_threads: usize,
        ui: UiHandle,
        stats: Arc<EngineStats>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState::default()),
                workers_done: Condvar::new(),
                provider,
                settings,
                max_threads: max_threads.max(1),
                ui,
                stats,
            }),
        }
    }

    /// Queues a scan of `path` on behalf of `node`.
    ///
    /// A new worker is started when none is running, or when the pending
    /// queue was empty and the pool is below its limit. Otherwise a running
    /// worker reaches the item when it next checks the queue.
    ///
    /// # Errors
    /// Returns [`BrowserError::ThreadSpawn`] when a needed worker thread could
    /// not be started and no other worker is left to pick the item up.
    pub fn enqueue(
        &self,
        node: NodeId,
        path: PathBuf,
        op: Operation,
        epoch: u64,
        root: bool,
    ) -> Result<()> {
        let (item_id, worker_index) = {
            let mut state = self.shared.state.lock();
            if state.shutting_down {
                trace!(path = %path.display(), "ignoring work queued during shutdown");
                return Ok(());
            }

            state.next_id += 1;
            let item_id = state.next_id;
            let item = WorkItem::new(item_id, node, path, op, epoch, root);
            let was_empty = state.pending.is_empty();
            if op == Operation::Populate {
                state.pending.push_front(item);
            } else {
                state.pending.push_back(item);
            }

            let spawn = state.current_workers == 0
                || (was_empty && state.current_workers < self.shared.max_threads);
            if !spawn {
                return Ok(());
            }
            state.current_workers += 1;
            state.next_worker += 1;
            (item_id, state.next_worker)
        };

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name(format!("dir-scan-{worker_index}"))
            .spawn(move || run_worker(shared, worker_index));

        match spawned {
            Ok(_) => {
                self.shared.stats.worker_spawned();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to start scanner thread");
                let orphans = {
                    let mut state = self.shared.state.lock();
                    state.current_workers -= 1;
                    self.shared.workers_done.notify_all();
                    if state.current_workers > 0 {
                        return Ok(());
                    }
                    state.take_stranded(item_id)
                };
                self.shared.abandon(orphans);
                Err(BrowserError::ThreadSpawn(e))
            }
        }
    }

    /// Pops the next batch for the merger, interactive batches first.
    pub fn take_ui_batch(&self) -> Option<Batch> {
        let mut state = self.shared.state.lock();
        state
            .ui_interactive
            .pop_front()
            .or_else(|| state.ui_background.pop_front())
    }

    pub fn has_ui_batches(&self) -> bool {
        !self.shared.state.lock().ui_is_empty()
    }

    /// Cancels all work at or below `path`.
    ///
    /// Queued items and unmerged batches are dropped outright. Items a worker
    /// is scanning are only flagged; the worker discards its own result the
    /// next time it publishes. Never blocks on the workers.
    pub fn cancel_path(&self, path: &Path) {
        let covers = |p: &Path| path_relation(path, p) != PathRelation::Unrelated;

        let mut state = self.shared.state.lock();
        let before = state.pending.len() + state.ui_interactive.len() + state.ui_background.len();
        state.pending.retain(|item| !covers(&item.path));
        state.ui_interactive.retain(|batch| !covers(&batch.path));
        state.ui_background.retain(|batch| !covers(&batch.path));
        let after = state.pending.len() + state.ui_interactive.len() + state.ui_background.len();

        let mut flagged = 0usize;
        for item in state.in_progress.values() {
            if covers(&item.path) {
                item.cancel();
                flagged += 1;
            }
        }
        debug!(
            path = %path.display(),
            dropped = before - after,
            flagged,
            "cancelled work"
        );
    }

    /// Cancels everything and waits for all workers to exit, then accepts
    /// work again.
    pub fn drain(&self) {
        let mut state = self.shared.state.lock();
        state.shutting_down = true;
        state.purge_queued();
        while state.current_workers > 0 {
            self.shared.workers_done.wait(&mut state);
        }
        state.in_progress.clear();
        if !state.closed {
            state.shutting_down = false;
        }
    }

    /// Cancels everything and waits for all workers to exit. Further work is
    /// ignored.
    pub fn shutdown(&self) {
        self.shared.state.lock().closed = true;
        self.drain();
        debug!("scheduler shut down");
    }

    /// True when nothing is queued, being scanned, or waiting to be merged.
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.pending.is_empty() && state.in_progress.is_empty() && state.ui_is_empty()
    }

    pub fn depths(&self) -> QueueDepths {
        let state = self.shared.state.lock();
        QueueDepths {
            pending: state.pending.len(),
            in_progress: state.in_progress.len(),
            ui_pending: state.ui_interactive.len() + state.ui_background.len(),
            workers: state.current_workers,
        }
    }

    pub fn stats(&self) -> &Arc<EngineStats> {
        &self.shared.stats
    }
}

impl Shared {
    /// Fails queued work that will never be scanned. Interactive items are
    /// reported so their nodes leave the scanning state and navigation can
    /// resolve; background checks are simply forgotten.
    fn abandon(&self, items: Vec<WorkItem>) {
        for item in items {
            if item.op.is_interactive() {
                warn!(path = %item.path.display(), "no scanner thread left for queued listing");
                self.report_failure(&item, item.failure("no scanner thread available".to_string()));
            } else {
                trace!(path = %item.path.display(), "dropping queued subdirectory check");
            }
        }
    }
}

impl BatchSink for Shared {
    fn publish(&self, item: &WorkItem, mut batch: Batch) -> Delivery {
        batch
            .children
            .sort_by(|a, b| collate(&a.display_name, &b.display_name));
        let failed = batch.failure.is_some();

        let was_empty = {
            let mut state = self.state.lock();
            if item.is_cancelled() || state.shutting_down {
                self.stats.batch_discarded();
                debug!(path = %item.path.display(), op = item.op.as_str(), "discarded cancelled result");
                return Delivery::Discarded;
            }
            let was_empty = state.ui_is_empty();
            if batch.op.is_interactive() {
                state.ui_interactive.push_back(batch);
            } else {
                state.ui_background.push_back(batch);
            }
            was_empty
        };

        self.stats.batch_filed();
        if failed {
            self.stats.scan_failed();
        }
        if was_empty {
            self.ui.post(UiEvent::MergeReady);
        }
        Delivery::Filed
    }

    fn report_failure(&self, item: &WorkItem, failure: ScanFailure) {
        if item.is_cancelled() {
            return;
        }
        self.stats.scan_failed();
        self.ui.post(UiEvent::ScanFailed(failure));
    }
}

fn run_worker(shared: Arc<Shared>, index: u64) {
    debug!(worker = index, "scanner thread started");
    let scanner = DirectoryScanner::new(shared.provider.as_ref(), &shared.settings);

    loop {
        let item = {
            let mut state = shared.state.lock();
            let next = if state.shutting_down {
                None
            } else {
                state.pending.pop_front()
            };
            match next {
                Some(item) => {
                    state.in_progress.insert(item.id, item.clone());
                    item
                }
                None => {
                    state.current_workers -= 1;
                    shared.workers_done.notify_all();
                    break;
                }
            }
        };

        shared.stats.scan_started();
        scanner.run(&item, shared.as_ref());
        shared.state.lock().in_progress.remove(&item.id);
    }

    debug!(worker = index, "scanner thread exiting");
}
