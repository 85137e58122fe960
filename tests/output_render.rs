mod common;

use common::FakeFs;
use foldertree::output::{collect_rows, csv, terminal};
use foldertree::{Browser, BrowserConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn browse(select: &str) -> Browser {
    let fake = Arc::new(
        FakeFs::new()
            .dir("/mnt/data/archive/2023")
            .dir("/mnt/data/photos")
            .unreadable("/mnt/data/private"),
    );
    let config = BrowserConfig {
        roots: vec![PathBuf::from("/mnt/data")],
        max_threads: 2,
        ..BrowserConfig::default()
    };
    let mut browser = Browser::new(config, fake).unwrap();
    browser.initialize().unwrap();
    browser.select_dir(select);
    assert!(browser.run_until_idle(Duration::from_secs(20)));
    browser
}

#[test]
fn test_terminal_rendering() {
    let browser = browse("/mnt/data/photos");
    let rows = collect_rows(browser.tree(), browser.selected());

    let mut out = Vec::new();
    terminal::render(&rows, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        vec![
            "  [-] /mnt/data",
            "    [+] archive",
            "*   [-] photos",
            "    [!] private",
        ]
    );
}

#[test]
fn test_csv_rendering() {
    let browser = browse("/mnt/data/archive/2023");
    let rows = collect_rows(browser.tree(), browser.selected());

    let mut out = Vec::new();
    csv::write_rows(&rows, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "path,state,marker,depth");
    assert!(lines.contains(&"/mnt/data,POPULATED,OPEN,0"));
    assert!(lines.contains(&"/mnt/data/archive/2023,POPULATED,OPEN,2"));
    assert!(lines.contains(&"/mnt/data/photos,CHILDLESS,CLOSED,1"));
    assert!(lines.contains(&"/mnt/data/private,CHILDLESS,UNREADABLE,1"));
    assert_eq!(lines.len(), 6);
}

#[test]
fn test_csv_to_file() {
    let browser = browse("/mnt/data");
    let rows = collect_rows(browser.tree(), browser.selected());
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("tree.csv");

    csv::render(&rows, Some(path.as_path())).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("path,state,marker,depth"));
    assert_eq!(written.lines().count(), rows.len() + 1);
}
