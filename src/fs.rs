//! Filesystem access for the scanner threads.
//!
//! [`FilesystemProvider`] is the only way the engine touches the disk. The
//! default [`LocalFilesystem`] lists one directory level with `WalkDir`,
//! resolves symlinks to directories and probes access rights with
//! `libc::access`. Tests substitute in-memory providers.

use crate::data::{EntryKind, FsEntry};
use crate::error::ScanError;
use crate::utils::access_rights;
use std::path::Path;
use walkdir::WalkDir;

/// Iterator over the entries of one directory. Dropping it stops the enumeration.
pub type EntryIter<'a> = Box<dyn Iterator<Item = Result<FsEntry, ScanError>> + Send + 'a>;

/// Blocking directory-entry enumeration.
///
/// Implementations are shared by every scanner thread and must be safe to
/// call concurrently.
pub trait FilesystemProvider: Send + Sync {
    /// Lists the direct entries of `path`.
    ///
    /// # Errors
    /// Returns [`ScanError::ReadDir`] or [`ScanError::NotADirectory`] when the
    /// directory cannot be opened. Per-entry problems are yielded as
    /// [`ScanError::Entry`] items; a [`ScanError::ReadDir`] item means the
    /// listing itself broke off.
    fn enumerate(&self, path: &Path) -> Result<EntryIter<'_>, ScanError>;
}

/// Provider backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    fn to_entry(entry: walkdir::DirEntry) -> Result<FsEntry, ScanError> {
        let file_type = entry.file_type();
        let kind = if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_symlink() {
            // Dangling links are listed as plain entries.
            match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_dir() => EntryKind::Dir,
                _ => EntryKind::Other,
            }
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        let mut fs_entry = FsEntry::new(entry.file_name().to_os_string(), kind);
        if kind == EntryKind::Dir {
            let (can_read, can_write) = access_rights(entry.path());
            fs_entry.can_read = can_read;
            fs_entry.can_write = can_write;
        }
        Ok(fs_entry)
    }
}

impl FilesystemProvider for LocalFilesystem {
    fn enumerate(&self, path: &Path) -> Result<EntryIter<'_>, ScanError> {
        let meta = std::fs::metadata(path).map_err(|source| ScanError::ReadDir {
            path: path.to_path_buf(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(ScanError::NotADirectory(path.to_path_buf()));
        }

        let root = path.to_path_buf();
        let iter = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter()
            .map(move |result| match result {
                Ok(entry) => Self::to_entry(entry),
                // depth 0 is the directory being listed
                Err(err) if err.depth() == 0 => Err(ScanError::ReadDir {
                    path: root.clone(),
                    source: err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory loop")),
                }),
                Err(err) => Err(ScanError::Entry {
                    path: err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
                    message: err.to_string(),
                }),
            });

        Ok(Box::new(iter))
    }
}
