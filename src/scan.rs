//! Directory scanning for the worker threads.
//!
//! A [`DirectoryScanner`] turns one [`WorkItem`] into one or more [`Batch`]es:
//!
//! - `SubdirCheck` stops at the first visible subdirectory and publishes a
//!   single placeholder descriptor (or an empty batch when there is none).
//! - `Populate` / `AddSubdir` publish a batch every `batch_size` visible
//!   subdirectories, so the UI can merge the first rows of a huge directory
//!   while the listing continues. Every batch after the first is an
//!   `AddSubdir` batch. The final batch is always published, possibly empty,
//!   and carries `last = true`. A listing that breaks off partway carries its
//!   failure on that final batch.
//!
//! Only directories are listed. Hidden entries are skipped unless
//! `show_hidden` is set, and paths matching the exclude globs are never listed.
//! The scanner checks the item's cancellation flag before each entry and
//! stops as soon as a publish is refused.

use crate::data::{ChildDescriptor, EntryKind, FsEntry, Operation};
use crate::error::ScanError;
use crate::fs::{EntryIter, FilesystemProvider};
use crate::scheduler::{BatchSink, Delivery, WorkItem};
use globset::GlobSet;
use std::path::Path;
use tracing::{debug, trace};

/// Filtering and batching parameters shared by all workers.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub show_hidden: bool,
    pub batch_size: usize,
    pub exclude: GlobSet,
}

impl ScanSettings {
    pub fn new(show_hidden: bool, batch_size: usize, exclude: GlobSet) -> Self {
        Self {
            show_hidden,
            batch_size: batch_size.max(1),
            exclude,
        }
    }
}

pub struct DirectoryScanner<'a> {
    provider: &'a dyn FilesystemProvider,
    settings: &'a ScanSettings,
}

impl<'a> DirectoryScanner<'a> {
    pub fn new(provider: &'a dyn FilesystemProvider, settings: &'a ScanSettings) -> Self {
        Self { provider, settings }
    }

    /// Scans `item` to completion, handing every batch to `sink`.
    pub fn run(&self, item: &WorkItem, sink: &dyn BatchSink) {
        if item.is_cancelled() {
            return;
        }
        trace!(path = %item.path.display(), op = item.op.as_str(), "scan started");

        let entries = match self.provider.enumerate(&item.path) {
            Ok(entries) => entries,
            Err(e) => {
                sink.report_failure(item, item.failure(e.to_string()));
                return;
            }
        };

        match item.op {
            Operation::SubdirCheck => self.check_subdirs(item, entries, sink),
            Operation::Populate | Operation::AddSubdir => self.populate(item, entries, sink),
        }
    }

    fn accepts(&self, dir: &Path, entry: &FsEntry) -> bool {
        if entry.kind != EntryKind::Dir {
            return false;
        }
        if entry.is_hidden && !self.settings.show_hidden {
            return false;
        }
        self.settings.exclude.is_empty() || !self.settings.exclude.is_match(dir.join(&entry.name))
    }

    fn check_subdirs(&self, item: &WorkItem, entries: EntryIter<'_>, sink: &dyn BatchSink) {
        let mut found = false;
        for result in entries {
            if item.is_cancelled() {
                return;
            }
            match result {
                Ok(entry) if self.accepts(&item.path, &entry) => {
                    found = true;
                    break;
                }
                Ok(_) => {}
                Err(ScanError::Entry { path, message }) => {
                    trace!(path = %path.display(), %message, "skipping entry");
                }
                Err(e) => {
                    sink.report_failure(item, item.failure(e.to_string()));
                    return;
                }
            }
        }

        let children = if found {
            vec![ChildDescriptor::placeholder()]
        } else {
            Vec::new()
        };
        sink.publish(item, item.batch(Operation::SubdirCheck, children, true));
    }

    fn populate(&self, item: &WorkItem, entries: EntryIter<'_>, sink: &dyn BatchSink) {
        let batch_size = self.settings.batch_size;
        let mut op = item.op;
        let mut batch = Vec::with_capacity(batch_size.min(1024));
        let mut total = 0usize;
        let mut broken = None;

        for result in entries {
            if item.is_cancelled() {
                return;
            }
            match result {
                Ok(entry) => {
                    if !self.accepts(&item.path, &entry) {
                        continue;
                    }
                    batch.push(ChildDescriptor::from_entry(&entry));
                    if batch.len() >= batch_size {
                        total += batch.len();
                        let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size.min(1024)));
                        if sink.publish(item, item.batch(op, full, false)) == Delivery::Discarded {
                            return;
                        }
                        op = Operation::AddSubdir;
                    }
                }
                Err(ScanError::Entry { path, message }) => {
                    debug!(path = %path.display(), %message, "skipping entry");
                }
                Err(e) => {
                    broken = Some(e);
                    break;
                }
            }
        }

        total += batch.len();
        let mut last = item.batch(op, batch, true);
        last.failure = broken.map(|e| item.failure(e.to_string()));
        let failed = last.failure.is_some();
        if sink.publish(item, last) == Delivery::Discarded {
            return;
        }
        if failed {
            debug!(path = %item.path.display(), total, "listing broke off");
        } else {
            trace!(path = %item.path.display(), total, "scan finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::ScanFailure;
    use crate::scheduler::Batch;
    use crate::tree::DirTree;
    use crate::utils::{build_exclude_matcher, expand_exclude_patterns};
    use std::cell::RefCell;
    use std::path::PathBuf;

    struct Listing(Vec<FsEntry>);

    impl FilesystemProvider for Listing {
        fn enumerate(&self, _path: &Path) -> Result<EntryIter<'_>, ScanError> {
            Ok(Box::new(self.0.clone().into_iter().map(Ok)))
        }
    }

    struct Unreadable;

    impl FilesystemProvider for Unreadable {
        fn enumerate(&self, path: &Path) -> Result<EntryIter<'_>, ScanError> {
            Err(ScanError::ReadDir {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        }
    }

    /// Lists `good` directories, then fails the read.
    struct BreaksAfter(usize);

    impl FilesystemProvider for BreaksAfter {
        fn enumerate(&self, path: &Path) -> Result<EntryIter<'_>, ScanError> {
            let broken = ScanError::ReadDir {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::Other),
            };
            let entries = dirs(self.0).into_iter().map(Ok).chain(std::iter::once(Err(broken)));
            Ok(Box::new(entries))
        }
    }

    #[derive(Default)]
    struct Collect {
        batches: RefCell<Vec<Batch>>,
        failures: RefCell<Vec<ScanFailure>>,
        accept: Option<usize>,
    }

    impl BatchSink for Collect {
        fn publish(&self, _item: &WorkItem, batch: Batch) -> Delivery {
            let mut batches = self.batches.borrow_mut();
            if self.accept.is_some_and(|n| batches.len() >= n) {
                return Delivery::Discarded;
            }
            batches.push(batch);
            Delivery::Filed
        }

        fn report_failure(&self, _item: &WorkItem, failure: ScanFailure) {
            self.failures.borrow_mut().push(failure);
        }
    }

    fn item(op: Operation) -> WorkItem {
        let mut tree = DirTree::new();
        let node = tree.insert_root(PathBuf::from("/music"));
        WorkItem::new(1, node, PathBuf::from("/music"), op, 1, true)
    }

    fn dirs(n: usize) -> Vec<FsEntry> {
        (0..n)
            .map(|i| FsEntry::new(format!("dir{i:04}"), EntryKind::Dir))
            .collect()
    }

    fn settings(show_hidden: bool, batch_size: usize) -> ScanSettings {
        ScanSettings::new(show_hidden, batch_size, GlobSet::empty())
    }

    #[test]
    fn test_subdir_check_stops_at_first_dir() {
        let mut entries = vec![FsEntry::new("track01.flac", EntryKind::File)];
        entries.extend(dirs(3));
        let provider = Listing(entries);
        let settings = settings(false, 250);
        let sink = Collect::default();

        DirectoryScanner::new(&provider, &settings).run(&item(Operation::SubdirCheck), &sink);

        let batches = sink.batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].children, vec![ChildDescriptor::placeholder()]);
        assert!(batches[0].last);
    }

    #[test]
    fn test_subdir_check_ignores_hidden_and_files() {
        let provider = Listing(vec![
            FsEntry::new(".thumbnails", EntryKind::Dir),
            FsEntry::new("cover.jpg", EntryKind::File),
        ]);
        let sink = Collect::default();
        let hidden_off = settings(false, 250);
        DirectoryScanner::new(&provider, &hidden_off).run(&item(Operation::SubdirCheck), &sink);
        assert!(sink.batches.borrow()[0].children.is_empty());

        let sink = Collect::default();
        let hidden_on = settings(true, 250);
        DirectoryScanner::new(&provider, &hidden_on).run(&item(Operation::SubdirCheck), &sink);
        assert_eq!(sink.batches.borrow()[0].children.len(), 1);
    }

    #[test]
    fn test_populate_splits_into_batches() {
        let provider = Listing(dirs(600));
        let settings = settings(false, 250);
        let sink = Collect::default();

        DirectoryScanner::new(&provider, &settings).run(&item(Operation::Populate), &sink);

        let batches = sink.batches.borrow();
        let shape: Vec<(Operation, usize, bool)> = batches
            .iter()
            .map(|b| (b.op, b.children.len(), b.last))
            .collect();
        assert_eq!(
            shape,
            vec![
                (Operation::Populate, 250, false),
                (Operation::AddSubdir, 250, false),
                (Operation::AddSubdir, 100, true),
            ]
        );
    }

    #[test]
    fn test_populate_empty_dir_still_signals_completion() {
        let provider = Listing(vec![FsEntry::new("notes.txt", EntryKind::File)]);
        let settings = settings(false, 250);
        let sink = Collect::default();

        DirectoryScanner::new(&provider, &settings).run(&item(Operation::Populate), &sink);

        let batches = sink.batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].op, Operation::Populate);
        assert!(batches[0].children.is_empty());
        assert!(batches[0].last);
    }

    #[test]
    fn test_populate_stops_when_publish_is_refused() {
        let provider = Listing(dirs(1000));
        let settings = settings(false, 100);
        let sink = Collect {
            accept: Some(2),
            ..Collect::default()
        };

        DirectoryScanner::new(&provider, &settings).run(&item(Operation::Populate), &sink);
        assert_eq!(sink.batches.borrow().len(), 2);
    }

    #[test]
    fn test_cancelled_item_publishes_nothing() {
        let provider = Listing(dirs(10));
        let settings = settings(false, 250);
        let sink = Collect::default();
        let item = item(Operation::Populate);
        item.cancel();

        DirectoryScanner::new(&provider, &settings).run(&item, &sink);
        assert!(sink.batches.borrow().is_empty());
    }

    #[test]
    fn test_exclude_patterns_filter_dirs() {
        let provider = Listing(vec![
            FsEntry::new("lost+found", EntryKind::Dir),
            FsEntry::new("Jazz", EntryKind::Dir),
        ]);
        let exclude =
            build_exclude_matcher(&expand_exclude_patterns(&["lost+found".to_string()])).unwrap();
        let settings = ScanSettings::new(false, 250, exclude);
        let sink = Collect::default();

        DirectoryScanner::new(&provider, &settings).run(&item(Operation::Populate), &sink);

        let batches = sink.batches.borrow();
        let names: Vec<&str> = batches[0]
            .children
            .iter()
            .map(|c| c.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Jazz"]);
    }

    #[test]
    fn test_broken_listing_fails_on_its_last_batch() {
        let provider = BreaksAfter(5);
        let settings = settings(false, 2);
        let sink = Collect::default();

        DirectoryScanner::new(&provider, &settings).run(&item(Operation::Populate), &sink);

        let batches = sink.batches.borrow();
        let shape: Vec<(usize, bool, bool)> = batches
            .iter()
            .map(|b| (b.children.len(), b.last, b.failure.is_some()))
            .collect();
        assert_eq!(shape, vec![(2, false, false), (2, false, false), (1, true, true)]);
        assert_eq!(batches[2].failure.as_ref().unwrap().path, PathBuf::from("/music"));
        assert!(sink.failures.borrow().is_empty());
    }

    #[test]
    fn test_enumeration_failure_is_reported() {
        let settings = settings(false, 250);
        let sink = Collect::default();

        DirectoryScanner::new(&Unreadable, &settings).run(&item(Operation::Populate), &sink);

        assert!(sink.batches.borrow().is_empty());
        let failures = sink.failures.borrow();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].root);
        assert_eq!(failures[0].path, PathBuf::from("/music"));
    }
}
