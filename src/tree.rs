//! Arena-backed directory tree owned by the UI actor.
//!
//! Nodes are addressed by [`NodeId`], a generational index. A `NodeId` is a
//! plain pair of integers, so it can ride along with work items on scanner
//! threads as inert payload; only the owner of the [`DirTree`] can resolve it,
//! and a handle to a removed node never resolves again.

use crate::data::{ChildDescriptor, Marker};
use std::ffi::OsString;
use std::path::PathBuf;

/// Opaque handle to a directory row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Where a node is in its lazy-population lifecycle.
///
/// `Unknown` becomes `Childless` or `HasCandidateChildren` once a subdirectory
/// check completes, `HasCandidateChildren` becomes `Populated` on expand, and a
/// collapse returns `Populated` to `HasCandidateChildren` (or `Childless`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum NodeState {
    Unknown,
    Childless,
    HasCandidateChildren,
    Populated,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Unknown => "UNKNOWN",
            NodeState::Childless => "CHILDLESS",
            NodeState::HasCandidateChildren => "HAS_CHILDREN",
            NodeState::Populated => "POPULATED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirNode {
    pub display_name: String,
    /// `None` for the "loading" placeholder row
    pub raw_name: Option<OsString>,
    pub state: NodeState,
    pub marker: Marker,
    /// Bumped whenever the node's children are thrown away
    pub epoch: u64,
    /// A populate scan has been requested and its last batch not yet merged
    pub scan_pending: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl DirNode {
    fn new(desc: &ChildDescriptor, parent: Option<NodeId>, epoch: u64) -> Self {
        Self {
            display_name: desc.display_name.clone(),
            raw_name: desc.raw_name.clone(),
            state: NodeState::Unknown,
            marker: desc.icon,
            epoch,
            scan_pending: false,
            parent,
            children: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.raw_name.is_none()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<DirNode>,
}

#[derive(Debug, Default)]
pub struct DirTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
    next_epoch: u64,
}

impl DirTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh epoch, strictly greater than every epoch handed out before.
    pub fn next_epoch(&mut self) -> u64 {
        self.next_epoch += 1;
        self.next_epoch
    }

    fn alloc(&mut self, node: DirNode) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Adds a top-level directory; `path` becomes the node's raw name.
    pub fn insert_root(&mut self, path: PathBuf) -> NodeId {
        let desc = ChildDescriptor {
            display_name: path.display().to_string(),
            raw_name: Some(path.into_os_string()),
            icon: Marker::Closed,
        };
        let epoch = self.next_epoch();
        let id = self.alloc(DirNode::new(&desc, None, epoch));
        self.roots.push(id);
        id
    }

    /// Inserts a child of `parent` at position `pos` (clamped to the child count).
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        pos: usize,
        desc: &ChildDescriptor,
    ) -> Option<NodeId> {
        self.get(parent)?;
        let epoch = self.next_epoch();
        let id = self.alloc(DirNode::new(desc, Some(parent), epoch));
        let children = &mut self.get_mut(parent)?.children;
        let pos = pos.min(children.len());
        children.insert(pos, id);
        Some(id)
    }

    /// Overwrites the row fields of `id`, resetting it when it now names a
    /// different directory.
    ///
    /// Returns `true` when the node was reset (its previous subtree discarded).
    pub fn set_fields(&mut self, id: NodeId, desc: &ChildDescriptor) -> bool {
        let same = match self.get(id) {
            Some(node) => node.raw_name == desc.raw_name,
            None => return false,
        };
        if same {
            if let Some(node) = self.get_mut(id) {
                node.display_name = desc.display_name.clone();
                if node.state != NodeState::Populated {
                    node.marker = desc.icon;
                }
            }
            return false;
        }

        self.clear_children(id);
        let epoch = self.next_epoch();
        if let Some(node) = self.get_mut(id) {
            let parent = node.parent;
            *node = DirNode::new(desc, parent, epoch);
        }
        true
    }

    pub fn get(&self, id: NodeId) -> Option<&DirNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut DirNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Removes `id` and all of its descendants, invalidating their handles.
    pub fn remove_subtree(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        match node.parent {
            Some(parent) => {
                if let Some(p) = self.get_mut(parent) {
                    p.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        self.release(id);
    }

    /// Removes every child of `id`, keeping `id` itself.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = match self.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            self.release(child);
        }
    }

    /// Removes the last children of `id` until at most `len` remain.
    pub fn truncate_children(&mut self, id: NodeId, len: usize) {
        let excess = match self.get_mut(id) {
            Some(node) if node.children.len() > len => node.children.split_off(len),
            _ => return,
        };
        for child in excess {
            self.release(child);
        }
    }

    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
    }

    /// Drops every node. Handles issued before the call never resolve again.
    pub fn clear(&mut self) {
        let roots = std::mem::take(&mut self.roots);
        for root in roots {
            self.release(root);
        }
    }

    /// Builds the absolute path of `id` from the raw names along its ancestry.
    ///
    /// Placeholders have no path.
    pub fn path_of(&self, id: NodeId) -> Option<PathBuf> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.get(cur)?;
            names.push(node.raw_name.as_ref()?);
            current = node.parent;
        }
        let mut path = PathBuf::new();
        for name in names.iter().rev() {
            path.push(name);
        }
        Some(path)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first walk over the live nodes, yielding `(depth, id)` in display order.
    pub fn walk(&self) -> Vec<(usize, NodeId)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, NodeId)> =
            self.roots.iter().rev().map(|r| (0, *r)).collect();
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            for child in self.children_of(id).iter().rev() {
                stack.push((depth + 1, *child));
            }
        }
        out
    }
}
