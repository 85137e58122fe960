//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use foldertree::fs::EntryIter;
use foldertree::{EntryKind, FilesystemProvider, FsEntry, ScanError};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// In-memory directory tree with injectable latency.
///
/// Every path added with [`FakeFs::dir`] exists together with its ancestors.
/// Enumerations are logged, can be slowed down per entry, and can be held at
/// a gate until [`FakeFs::open_gate`] is called.
#[derive(Default)]
pub struct FakeFs {
    dirs: HashMap<PathBuf, Vec<FsEntry>>,
    latency: Duration,
    gated: HashSet<PathBuf>,
    broken: HashMap<PathBuf, usize>,
    gate_open: Mutex<bool>,
    gate_cv: Condvar,
    log: Mutex<Vec<PathBuf>>,
}

impl FakeFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `path` and all of its ancestors as directories.
    pub fn dir(mut self, path: &str) -> Self {
        self.add_dir(Path::new(path));
        self
    }

    /// Adds a plain file.
    pub fn file(mut self, path: &str) -> Self {
        let path = Path::new(path);
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            self.add_dir(parent);
            self.push_entry(parent, FsEntry::new(name.to_os_string(), EntryKind::File));
        }
        self
    }

    /// Adds `count` subdirectories named `d0000`, `d0001`, ... below `path`,
    /// listed in reverse order.
    pub fn many(mut self, path: &str, count: usize) -> Self {
        self.add_dir(Path::new(path));
        for i in (0..count).rev() {
            let child = Path::new(path).join(format!("d{i:04}"));
            self.add_dir(&child);
        }
        self
    }

    /// An unreadable directory: listing its parent shows it, listing it fails.
    pub fn unreadable(mut self, path: &str) -> Self {
        let path = Path::new(path);
        self.add_dir(path);
        self.dirs.remove(path);
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(entries) = self.dirs.get_mut(parent) {
                for entry in entries.iter_mut().filter(|e| e.name.as_os_str() == name) {
                    entry.can_read = false;
                }
            }
        }
        self
    }

    /// Listing `path` fails with a read error after `entries` entries.
    pub fn broken_after(mut self, path: &str, entries: usize) -> Self {
        self.broken.insert(PathBuf::from(path), entries);
        self
    }

    /// Sleeps this long before yielding each entry.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Holds enumerations of `path` until the gate is opened.
    pub fn gate(mut self, path: &str) -> Self {
        self.gated.insert(PathBuf::from(path));
        self
    }

    pub fn open_gate(&self) {
        *self.gate_open.lock() = true;
        self.gate_cv.notify_all();
    }

    /// Number of times `path` was enumerated.
    pub fn enumerations(&self, path: &str) -> usize {
        self.log.lock().iter().filter(|p| *p == Path::new(path)).count()
    }

    fn add_dir(&mut self, path: &Path) {
        if self.dirs.contains_key(path) {
            return;
        }
        self.dirs.insert(path.to_path_buf(), Vec::new());
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            self.add_dir(parent);
            self.push_entry(parent, FsEntry::new(name.to_os_string(), EntryKind::Dir));
        }
    }

    fn push_entry(&mut self, parent: &Path, entry: FsEntry) {
        if let Some(entries) = self.dirs.get_mut(parent) {
            entries.push(entry);
        }
    }
}

impl FilesystemProvider for FakeFs {
    fn enumerate(&self, path: &Path) -> Result<EntryIter<'_>, ScanError> {
        self.log.lock().push(path.to_path_buf());

        if self.gated.contains(path) {
            let mut open = self.gate_open.lock();
            while !*open {
                self.gate_cv.wait(&mut open);
            }
        }

        let entries = self.dirs.get(path).ok_or_else(|| ScanError::ReadDir {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        })?;
        let latency = self.latency;
        let listed = entries.iter().cloned().map(move |entry| {
            if !latency.is_zero() {
                std::thread::sleep(latency);
            }
            Ok(entry)
        });
        match self.broken.get(path) {
            Some(&count) => {
                let failure = ScanError::ReadDir {
                    path: path.to_path_buf(),
                    source: std::io::Error::other("input/output error"),
                };
                Ok(Box::new(listed.take(count).chain(std::iter::once(Err(failure)))))
            }
            None => Ok(Box::new(listed)),
        }
    }
}
