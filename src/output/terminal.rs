//! Terminal output formatter for the directory tree.
//!
//! Each row is drawn as `<indent><marker> <name>`, two spaces of indent per
//! level. The selected row is prefixed with `*`. Top-level rows show their
//! full path.

use super::TreeRow;
use anyhow::Result;
use std::io::Write;

/// Renders rows as an indented tree.
///
/// # Arguments
/// * `rows` - Rows in display order, as returned by [`super::collect_rows`]
/// * `out` - Destination, usually stdout
pub fn render<W: Write>(rows: &[TreeRow], out: &mut W) -> Result<()> {
    for row in rows {
        let cursor = if row.selected { '*' } else { ' ' };
        let name = if row.depth == 0 {
            row.path.display().to_string()
        } else {
            row.name.clone()
        };
        writeln!(
            out,
            "{cursor} {:indent$}{} {}",
            "",
            row.symbol(),
            name,
            indent = row.depth * 2
        )?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Marker;
    use crate::tree::NodeState;
    use std::path::PathBuf;

    fn row(depth: usize, path: &str, state: NodeState, marker: Marker, selected: bool) -> TreeRow {
        let path = PathBuf::from(path);
        TreeRow {
            depth,
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            path,
            state,
            marker,
            selected,
        }
    }

    #[test]
    fn test_tree_lines() {
        let rows = vec![
            row(0, "/srv/music", NodeState::Populated, Marker::Open, false),
            row(1, "/srv/music/Artist1", NodeState::HasCandidateChildren, Marker::Closed, false),
            row(1, "/srv/music/Artist2", NodeState::Populated, Marker::Open, false),
            row(2, "/srv/music/Artist2/Disc1", NodeState::Childless, Marker::Closed, true),
            row(1, "/srv/music/private", NodeState::Childless, Marker::Unreadable, false),
        ];

        let mut out = Vec::new();
        render(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "  [-] /srv/music",
                "    [+] Artist1",
                "    [-] Artist2",
                "*     [ ] Disc1",
                "    [!] private",
            ]
        );
    }
}
