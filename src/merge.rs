//! Applying scanner batches to the tree.
//!
//! Runs on the UI actor only. [`apply_batch`] is the sole place scan results
//! become rows:
//!
//! - `SubdirCheck` makes sure a directory with visible children shows exactly
//!   one placeholder child, and marks it childless otherwise.
//! - `Populate` overwrites the existing rows position by position and drops
//!   the surplus.
//! - `AddSubdir` merge-inserts into rows that are already visible (and may be
//!   selected), so they are never reordered or recreated.
//!
//! Every new or renamed real child is reported back as a follow-up
//! subdirectory check, keeping the expand affordance one level ahead.

use crate::data::{ChildDescriptor, Marker, Operation};
use crate::scheduler::Batch;
use crate::tree::{DirNode, DirTree, NodeId, NodeState};
use crate::utils::collate;
use std::cmp::Ordering;
use std::path::PathBuf;

/// A subdirectory check the merger wants queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub node: NodeId,
    pub path: PathBuf,
    pub epoch: u64,
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Rows created or overwritten by this batch
    pub touched: Vec<NodeId>,
    pub follow_ups: Vec<FollowUp>,
    /// The batch finished a populate scan
    pub completed: bool,
}

/// Applies `batch` to `tree`.
///
/// Returns `None` when the batch is stale: its node was removed, or its
/// epoch predates the node's current epoch (the node was collapsed or reset
/// after the scan was requested).
pub fn apply_batch(tree: &mut DirTree, batch: &Batch) -> Option<MergeOutcome> {
    let node = tree.get(batch.node)?;
    if node.epoch != batch.epoch || node.is_placeholder() {
        return None;
    }

    let mut outcome = MergeOutcome::default();
    match batch.op {
        Operation::SubdirCheck => merge_subdir_check(tree, batch),
        Operation::Populate => {
            mark_open(tree, batch.node);
            outcome.touched = overwrite_children(tree, batch.node, &batch.children);
        }
        Operation::AddSubdir => {
            mark_open(tree, batch.node);
            outcome.touched = merge_insert(tree, batch.node, &batch.children);
        }
    }

    if batch.last && batch.op.is_interactive() {
        if let Some(node) = tree.get_mut(batch.node) {
            node.scan_pending = false;
        }
        outcome.completed = true;
    }

    for id in &outcome.touched {
        if let Some(follow_up) = follow_up_for(tree, *id) {
            outcome.follow_ups.push(follow_up);
        }
    }
    Some(outcome)
}

fn merge_subdir_check(tree: &mut DirTree, batch: &Batch) {
    let Some(node) = tree.get_mut(batch.node) else {
        return;
    };
    // Expanded while the check was in flight: the populate result wins.
    if node.state == NodeState::Populated || node.scan_pending {
        return;
    }

    if batch.children.is_empty() {
        node.state = NodeState::Childless;
        tree.clear_children(batch.node);
        return;
    }

    node.state = NodeState::HasCandidateChildren;
    if node.marker != Marker::Unreadable {
        node.marker = Marker::Closed;
    }
    if node.children().is_empty() {
        tree.insert_child(batch.node, 0, &ChildDescriptor::placeholder());
    }
}

fn mark_open(tree: &mut DirTree, id: NodeId) {
    if let Some(node) = tree.get_mut(id) {
        node.state = NodeState::Populated;
        node.marker = Marker::Open;
    }
}

fn overwrite_children(tree: &mut DirTree, parent: NodeId, batch: &[ChildDescriptor]) -> Vec<NodeId> {
    let existing = tree.children_of(parent).to_vec();
    let mut touched = Vec::with_capacity(batch.len());

    for (pos, desc) in batch.iter().enumerate() {
        match existing.get(pos) {
            Some(&child) => {
                tree.set_fields(child, desc);
                touched.push(child);
            }
            None => {
                if let Some(child) = tree.insert_child(parent, pos, desc) {
                    touched.push(child);
                }
            }
        }
    }

    tree.truncate_children(parent, batch.len());
    touched
}

fn sorts_before(existing: &DirNode, desc: &ChildDescriptor) -> bool {
    collate(&existing.display_name, &desc.display_name) == Ordering::Less
}

fn merge_insert(tree: &mut DirTree, parent: NodeId, batch: &[ChildDescriptor]) -> Vec<NodeId> {
    let mut touched = Vec::with_capacity(batch.len());
    let mut cursor = 0usize;

    for desc in batch {
        let children = tree.children_of(parent);
        while let Some(node) = children.get(cursor).and_then(|id| tree.get(*id)) {
            if !sorts_before(node, desc) {
                break;
            }
            cursor += 1;
        }

        let duplicate = children
            .get(cursor)
            .and_then(|id| tree.get(*id))
            .is_some_and(|node| node.raw_name == desc.raw_name);
        if duplicate {
            cursor += 1;
            continue;
        }

        if let Some(child) = tree.insert_child(parent, cursor, desc) {
            touched.push(child);
        }
        cursor += 1;
    }

    touched
}

fn follow_up_for(tree: &mut DirTree, id: NodeId) -> Option<FollowUp> {
    let node = tree.get_mut(id)?;
    if node.is_placeholder() || node.state != NodeState::Unknown {
        return None;
    }
    // Unreadable directories cannot be listed; they never get a placeholder.
    if node.marker == Marker::Unreadable {
        node.state = NodeState::Childless;
        return None;
    }
    let epoch = node.epoch;
    Some(FollowUp {
        node: id,
        path: tree.path_of(id)?,
        epoch,
    })
}
