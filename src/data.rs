//! Data structures shared between the scanner threads and the UI actor.
//!
//! Everything in this module is plain, owned data: it can be moved across
//! threads freely and never points into the tree view.

use std::ffi::OsString;

/// What a scan is asked to produce for one directory.
///
/// # Variants
/// * `SubdirCheck` - Only determine whether the directory has visible subdirectories
/// * `AddSubdir` - Merge further children into an already populated directory
/// * `Populate` - Replace the full child set of a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Operation {
    SubdirCheck,
    AddSubdir,
    Populate,
}

impl Operation {
    /// Returns a string representation of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SubdirCheck => "SUBDIR_CHECK",
            Operation::AddSubdir => "ADD_SUBDIR",
            Operation::Populate => "POPULATE",
        }
    }

    /// Interactive operations were triggered by the user and take priority
    /// over background existence checks.
    pub fn is_interactive(&self) -> bool {
        !matches!(self, Operation::SubdirCheck)
    }
}

/// Visual marker shown next to a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Marker {
    Closed,
    Open,
    Unreadable,
}

impl Marker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::Closed => "CLOSED",
            Marker::Open => "OPEN",
            Marker::Unreadable => "UNREADABLE",
        }
    }
}

/// The type of a filesystem entry as reported by a [`crate::fs::FilesystemProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum EntryKind {
    Dir,
    File,
    Other,
}

/// One directory entry as returned by an enumeration.
///
/// # Fields
/// * `name` - Raw on-disk name
/// * `display_name` - Name as shown to the user
/// * `kind` - Entry type (symlinks are resolved by the provider)
/// * `can_read` / `can_write` - Access rights of the current user
/// * `is_hidden` - Whether the platform considers the entry hidden
#[derive(Debug, Clone)]
pub struct FsEntry {
    pub name: OsString,
    pub display_name: String,
    pub kind: EntryKind,
    pub can_read: bool,
    pub can_write: bool,
    pub is_hidden: bool,
}

impl FsEntry {
    /// Builds an entry whose display name is the lossy UTF-8 form of `name`.
    pub fn new(name: impl Into<OsString>, kind: EntryKind) -> Self {
        let name = name.into();
        let display_name = name.to_string_lossy().into_owned();
        let is_hidden = display_name.starts_with('.');
        Self {
            name,
            display_name,
            kind,
            can_read: true,
            can_write: true,
            is_hidden,
        }
    }
}

/// A child row produced by the scanner.
///
/// A descriptor without a raw name is the "loading" placeholder that marks a
/// directory as having visible children before they have been listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDescriptor {
    pub display_name: String,
    pub raw_name: Option<OsString>,
    pub icon: Marker,
}

impl ChildDescriptor {
    pub fn placeholder() -> Self {
        Self {
            display_name: String::new(),
            raw_name: None,
            icon: Marker::Closed,
        }
    }

    pub fn from_entry(entry: &FsEntry) -> Self {
        Self {
            display_name: entry.display_name.clone(),
            raw_name: Some(entry.name.clone()),
            icon: if entry.can_read {
                Marker::Closed
            } else {
                Marker::Unreadable
            },
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.raw_name.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_priority() {
        assert!(Operation::Populate.is_interactive());
        assert!(Operation::AddSubdir.is_interactive());
        assert!(!Operation::SubdirCheck.is_interactive());
        assert_eq!(Operation::Populate.as_str(), "POPULATE");
    }

    #[test]
    fn test_descriptor_from_unreadable_entry() {
        let mut entry = FsEntry::new(".cache", EntryKind::Dir);
        entry.can_read = false;

        let desc = ChildDescriptor::from_entry(&entry);
        assert!(entry.is_hidden);
        assert_eq!(desc.icon, Marker::Unreadable);
        assert_eq!(desc.display_name, ".cache");
        assert!(!desc.is_placeholder());
        assert!(ChildDescriptor::placeholder().is_placeholder());
    }
}
