//! "Navigate to path" requests that span several asynchronous scans.
//!
//! A request walks the rows that already exist. When it reaches an ancestor
//! of the target that has not been listed yet, the navigator asks for that
//! directory to be expanded and waits; each batch merged for the awaited
//! directory resumes the walk. The request ends when the target row is
//! selected or when no row can lead to it any more.

use crate::data::Marker;
use crate::tree::{DirTree, NodeId, NodeState};
use crate::utils::{PathRelation, path_relation};
use std::path::{Path, PathBuf};

/// Progress of the current navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NavState {
    #[default]
    Idle,
    AwaitingChildrenOf { node: NodeId, target: PathBuf },
}

/// What the browser has to do next for a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStep {
    /// The target row exists: select and expand it.
    Select(NodeId),
    /// The closest existing ancestor must be listed first.
    Expand(NodeId),
    /// The closest ancestor is still being listed.
    Wait(NodeId),
    /// The target does not exist or is filtered out.
    Miss,
}

#[derive(Debug, Default)]
pub struct PathNavigator {
    state: NavState,
}

impl PathNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn target(&self) -> Option<&Path> {
        match &self.state {
            NavState::Idle => None,
            NavState::AwaitingChildrenOf { target, .. } => Some(target.as_path()),
        }
    }

    pub fn clear(&mut self) {
        self.state = NavState::Idle;
    }

    /// Starts navigating to `target`, replacing any request in progress.
    pub fn request(&mut self, tree: &DirTree, target: PathBuf) -> NavStep {
        self.advance(tree, target)
    }

    /// Resumes the request after a batch for `node` was merged.
    ///
    /// Returns `None` when the request is not waiting on `node`.
    pub fn on_batch(&mut self, tree: &DirTree, node: NodeId) -> Option<NavStep> {
        match &self.state {
            NavState::AwaitingChildrenOf { node: awaited, target } if *awaited == node => {
                let target = target.clone();
                Some(self.advance(tree, target))
            }
            _ => None,
        }
    }

    /// Drops the request when `collapsed` is the awaited row or one of its
    /// ancestors. Must run before the collapsed row's children are removed.
    pub fn abandon_under(&mut self, tree: &DirTree, collapsed: NodeId) -> bool {
        let awaited = match &self.state {
            NavState::AwaitingChildrenOf { node, .. } => *node,
            NavState::Idle => return false,
        };
        let mut current = Some(awaited);
        while let Some(id) = current {
            if id == collapsed {
                self.clear();
                return true;
            }
            current = tree.get(id).and_then(|n| n.parent());
        }
        if !tree.contains(awaited) {
            self.clear();
            return true;
        }
        false
    }

    fn advance(&mut self, tree: &DirTree, target: PathBuf) -> NavStep {
        let step = resolve(tree, &target);
        self.state = match step {
            NavStep::Expand(node) | NavStep::Wait(node) => NavState::AwaitingChildrenOf { node, target },
            NavStep::Select(_) | NavStep::Miss => NavState::Idle,
        };
        step
    }
}

/// Walks the materialized rows towards `target`.
fn resolve(tree: &DirTree, target: &Path) -> NavStep {
    let mut level: &[NodeId] = tree.roots();
    let mut parent: Option<NodeId> = None;

    loop {
        let mut ancestor = None;
        for &id in level {
            let Some(path) = tree.path_of(id) else {
                continue;
            };
            match path_relation(&path, target) {
                PathRelation::Exact => return NavStep::Select(id),
                PathRelation::Ancestor => {
                    ancestor = Some(id);
                    break;
                }
                PathRelation::Unrelated => {}
            }
        }

        let Some(id) = ancestor else {
            return match parent.and_then(|p| tree.get(p).map(|n| (p, n.scan_pending))) {
                Some((p, true)) => NavStep::Wait(p),
                _ => NavStep::Miss,
            };
        };
        let Some(node) = tree.get(id) else {
            return NavStep::Miss;
        };

        match node.state {
            NodeState::Populated => {
                level = node.children();
                parent = Some(id);
            }
            NodeState::Childless => return NavStep::Miss,
            _ if node.marker == Marker::Unreadable => return NavStep::Miss,
            _ if node.scan_pending => return NavStep::Wait(id),
            _ => return NavStep::Expand(id),
        }
    }
}

/// Exact-match lookup over the rows that already exist. No side effects.
pub fn find_node(tree: &DirTree, target: &Path) -> Option<NodeId> {
    let mut level: &[NodeId] = tree.roots();
    loop {
        let mut next = None;
        for &id in level {
            let Some(path) = tree.path_of(id) else {
                continue;
            };
            match path_relation(&path, target) {
                PathRelation::Exact => return Some(id),
                PathRelation::Ancestor => {
                    next = Some(id);
                    break;
                }
                PathRelation::Unrelated => {}
            }
        }
        level = tree.children_of(next?);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ChildDescriptor;

    fn dir(name: &str) -> ChildDescriptor {
        ChildDescriptor {
            display_name: name.to_string(),
            raw_name: Some(name.into()),
            icon: Marker::Closed,
        }
    }

    /// /srv/music/{Artist1, Artist2}, with music populated
    fn fixture() -> (DirTree, NodeId, NodeId, NodeId) {
        let mut tree = DirTree::new();
        let root = tree.insert_root(PathBuf::from("/srv"));
        tree.get_mut(root).unwrap().state = NodeState::Populated;
        let music = tree.insert_child(root, 0, &dir("music")).unwrap();
        tree.get_mut(music).unwrap().state = NodeState::Populated;
        let a1 = tree.insert_child(music, 0, &dir("Artist1")).unwrap();
        let a2 = tree.insert_child(music, 1, &dir("Artist2")).unwrap();
        tree.get_mut(a2).unwrap().state = NodeState::HasCandidateChildren;
        (tree, music, a1, a2)
    }

    #[test]
    fn test_exact_match_selects() {
        let (tree, _, a1, _) = fixture();
        let mut nav = PathNavigator::new();
        assert_eq!(
            nav.request(&tree, PathBuf::from("/srv/music/Artist1/")),
            NavStep::Select(a1)
        );
        assert_eq!(nav.state(), &NavState::Idle);
    }

    #[test]
    fn test_unlisted_ancestor_is_expanded_then_resumed() {
        let (mut tree, _, _, a2) = fixture();
        let mut nav = PathNavigator::new();
        let target = PathBuf::from("/srv/music/Artist2/Disc1");

        assert_eq!(nav.request(&tree, target.clone()), NavStep::Expand(a2));
        assert_eq!(nav.target(), Some(target.as_path()));

        // listing in progress: first batch does not contain the target yet
        let node = tree.get_mut(a2).unwrap();
        node.state = NodeState::Populated;
        node.scan_pending = true;
        let disc2 = tree.insert_child(a2, 0, &dir("Disc2")).unwrap();
        assert_eq!(nav.on_batch(&tree, a2), Some(NavStep::Wait(a2)));

        let disc1 = tree.insert_child(a2, 0, &dir("Disc1")).unwrap();
        tree.get_mut(a2).unwrap().scan_pending = false;
        assert_eq!(nav.on_batch(&tree, disc2), None);
        assert_eq!(nav.on_batch(&tree, a2), Some(NavStep::Select(disc1)));
        assert_eq!(nav.target(), None);
    }

    #[test]
    fn test_missing_path_is_abandoned() {
        let (tree, _, _, _) = fixture();
        let mut nav = PathNavigator::new();
        assert_eq!(nav.request(&tree, PathBuf::from("/srv/music/Nobody/Disc1")), NavStep::Miss);
        assert_eq!(nav.request(&tree, PathBuf::from("/elsewhere")), NavStep::Miss);
        assert_eq!(nav.target(), None);
    }

    #[test]
    fn test_childless_ancestor_is_a_dead_end() {
        let (mut tree, _, a1, _) = fixture();
        tree.get_mut(a1).unwrap().state = NodeState::Childless;
        let mut nav = PathNavigator::new();
        assert_eq!(nav.request(&tree, PathBuf::from("/srv/music/Artist1/x")), NavStep::Miss);
    }

    #[test]
    fn test_collapse_abandons_request() {
        let (tree, music, _, a2) = fixture();
        let mut nav = PathNavigator::new();
        nav.request(&tree, PathBuf::from("/srv/music/Artist2/Disc1"));
        assert!(matches!(nav.state(), NavState::AwaitingChildrenOf { node, .. } if *node == a2));

        assert!(nav.abandon_under(&tree, music));
        assert_eq!(nav.target(), None);
    }

    #[test]
    fn test_find_node_is_read_only() {
        let (tree, music, _, _) = fixture();
        assert_eq!(find_node(&tree, Path::new("/srv/music")), Some(music));
        assert_eq!(find_node(&tree, Path::new("/srv/music/Artist2/Disc1")), None);
        assert_eq!(find_node(&tree, Path::new("/other")), None);
    }
}
