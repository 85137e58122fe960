//! Output for the materialized directory tree.
//!
//! The renderers never look at the tree themselves. [`collect_rows`] flattens
//! the rows that exist right now (placeholders excluded) into [`TreeRow`]s in
//! display order, and each formatter turns those rows into text.
//!
//! # Available Formatters
//!
//! - **Terminal**: Indented tree with expansion markers
//! - **CSV**: One record per directory row for scripting

pub mod csv;
pub mod terminal;

use crate::data::Marker;
use crate::tree::{DirNode, DirTree, NodeId, NodeState};
use std::path::PathBuf;

/// CSV output renderer function.
///
/// See [`csv::render`] for full documentation.
pub use csv::render as render_csv;

/// Terminal output renderer function.
///
/// See [`terminal::render`] for full documentation.
pub use terminal::render as render_terminal;

/// One visible directory row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub path: PathBuf,
    pub name: String,
    pub state: NodeState,
    pub marker: Marker,
    pub selected: bool,
}

impl TreeRow {
    /// Expansion marker as drawn in the terminal tree.
    pub fn symbol(&self) -> &'static str {
        match (self.marker, self.state) {
            (Marker::Unreadable, _) => "[!]",
            (_, NodeState::Populated) => "[-]",
            (_, NodeState::Childless) => "[ ]",
            _ => "[+]",
        }
    }
}

/// Flattens the tree into rows, depth first, skipping placeholder rows.
pub fn collect_rows(tree: &DirTree, selected: Option<NodeId>) -> Vec<TreeRow> {
    tree.walk()
        .into_iter()
        .filter_map(|(depth, id)| {
            let node: &DirNode = tree.get(id)?;
            let path = tree.path_of(id)?;
            Some(TreeRow {
                depth,
                path,
                name: node.display_name.clone(),
                state: node.state,
                marker: node.marker,
                selected: selected == Some(id),
            })
        })
        .collect()
}
