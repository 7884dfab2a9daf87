//! Integration tests for loading picked files.

use std::fs;
use std::path::PathBuf;

use crossway_app::{AppError, read_selection};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("crossway-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

#[tokio::test]
async fn read_selection_tests_keeps_pick_order_and_names() {
    let dir = scratch_dir("order");
    let paths: Vec<PathBuf> = ["south.mp4", "north.mov"]
        .iter()
        .map(|name| {
            let path = dir.join(name);
            fs::write(&path, name.as_bytes()).expect("fixture should be writable");
            path
        })
        .collect();

    let selection = read_selection(&paths).await.expect("files should load");
    let names: Vec<_> = selection
        .videos()
        .iter()
        .map(|video| video.file_name().to_string())
        .collect();
    assert_eq!(names, vec!["south.mp4", "north.mov"]);
    assert_eq!(selection.videos()[1].bytes(), b"north.mov");

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn read_selection_tests_reports_missing_file() {
    let missing = scratch_dir("missing").join("absent.mp4");
    let error = read_selection(&[missing.clone()])
        .await
        .expect_err("missing file should fail");
    assert!(matches!(error, AppError::ReadVideo { path, .. } if path == missing));
}
