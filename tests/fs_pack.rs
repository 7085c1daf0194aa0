// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! End-to-end pack handling on the local filesystem

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use packlens::history::History;
use packlens::pack::metadata::{locate_metadata_file, update_metadata_file, PackField, PackMetadata};
use packlens::pack::rename::{rename_file, undo_last};
use packlens::pack::{DiagnosticKind, PackWalker};
use packlens::source::FsSource;
use packlens::AppConfig;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_pack() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write(root, "TAGS.md", "medieval, pixel art\n");
    write(
        root,
        "pack.json",
        r#"{
  "tag": "castle",
  "prices": [{ "value": "299", "name": "default" }],
  "longDescription": "Walls and towers.",
  "sellerId": "s1",
  "sellerStripeAccountId": "acct"
}"#,
    );
    write(root, "previewImages/cover.png", "c");
    write(root, "walls/TAGS.md", "building");
    write(root, "walls/tiled_brick_01.png", "b1");
    write(root, "walls/tiled_brick_02.png", "b2");
    write(root, "walls/tower.png", "t");
    write(root, "guards/guard_walk_01.png", "g1");
    write(root, "guards/guard_walk_02.png", "g2");
    write(root, "sfx/gate.wav", "w");
    dir
}

fn walker() -> PackWalker<FsSource> {
    PackWalker::new(Arc::new(FsSource::new()), &AppConfig::default())
}

#[tokio::test]
async fn walks_a_complete_pack() {
    let dir = sample_pack();
    let report = walker().walk(dir.path()).await.unwrap();

    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(report.root.tags, vec!["medieval", "pixel art"]);
    assert_eq!(report.preview_images.len(), 1);
    assert_eq!(report.counts.tiled, 2);
    assert_eq!(report.counts.static_object, 1);
    assert_eq!(report.counts.animated_multiple, 2);
    assert_eq!(report.counts.sound, 1);

    let brick = report.groups.iter().find(|g| g.key == "brick").unwrap();
    assert_eq!(brick.files.len(), 2);
    assert_eq!(
        report.tags_for_group(brick),
        vec!["medieval", "pixel art", "building"]
    );
    assert_eq!(
        report.root_metadata().unwrap().content["tag"],
        "castle"
    );
}

#[tokio::test]
async fn reports_missing_reserved_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "tree.png", "t");

    let report = walker().walk(dir.path()).await.unwrap();
    assert_eq!(report.warnings().count(), 3);
    assert!(report
        .diagnostics
        .iter()
        .all(|d| d.kind == DiagnosticKind::MissingRequiredFile));
}

#[tokio::test]
async fn rename_fixes_a_naming_error() {
    let dir = sample_pack();
    write(dir.path(), "guards/guard_walk_left_01.png", "g");
    let history = History::new(dir.path().join("history.jsonl"));

    let before = walker().walk(dir.path()).await.unwrap();
    assert_eq!(before.errors().count(), 1);

    rename_file(
        &FsSource::new(),
        &dir.path().join("guards/guard_walk_left_01.png"),
        "guard_walkleft_01.png",
        None,
        Some(&history),
    )
    .await
    .unwrap();

    let after = walker().walk(dir.path()).await.unwrap();
    assert_eq!(after.errors().count(), 0);
    let guard = after.groups.iter().find(|g| g.key == "guard").unwrap();
    assert_eq!(guard.files.len(), 3);

    let undone = undo_last(&FsSource::new(), &history).await.unwrap().unwrap();
    assert!(undone.original_path.exists());
    assert!(history.get_undoable().unwrap().is_empty());
}

#[tokio::test]
async fn metadata_edit_round_trip() {
    let dir = sample_pack();
    let source = FsSource::new();
    let file = locate_metadata_file(&source, dir.path(), "pack.json").await.unwrap();

    update_metadata_file(&source, &file, PackField::LongDescription, "Walls, towers and gates.\n\n")
        .await
        .unwrap();

    let text = fs::read_to_string(&file).unwrap();
    let info = PackMetadata::parse(&text).unwrap().info();
    assert_eq!(info.long_description.as_deref(), Some("Walls, towers and gates."));
    assert_eq!(info.tag.as_deref(), Some("castle"));
    assert_eq!(info.price.as_deref(), Some("299"));
    assert_eq!(info.seller_id.as_deref(), Some("s1"));

    // The walker sees the new content
    let report = walker().walk(dir.path()).await.unwrap();
    assert_eq!(
        report.root_metadata().unwrap().content["longDescription"],
        "Walls, towers and gates."
    );
}

#[tokio::test]
async fn malformed_metadata_does_not_stop_the_walk() {
    let dir = sample_pack();
    write(dir.path(), "pack.json", "{ \"tag\": ");

    let report = walker().walk(dir.path()).await.unwrap();
    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::MalformedMetadata);
    assert!(report.root_metadata().is_none());
    assert!(report.groups.iter().any(|g| g.key == "tower"));
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_back_to_root_is_not_followed() {
    let dir = sample_pack();
    std::os::unix::fs::symlink(dir.path(), dir.path().join("guards/loop")).unwrap();

    let report = walker().walk(dir.path()).await.unwrap();
    let guards: Vec<_> = report.groups.iter().filter(|g| g.key == "guard").collect();
    assert_eq!(guards.len(), 1);
    assert_eq!(report.root.folder_count(), 5);
    assert!(report.root.find_child("guards").unwrap().find_child("loop").is_none());
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_file_is_read_and_dangling_link_skipped() {
    let dir = sample_pack();
    std::os::unix::fs::symlink(
        dir.path().join("walls/tower.png"),
        dir.path().join("walls/keep.png"),
    )
    .unwrap();
    std::os::unix::fs::symlink(dir.path().join("gone.png"), dir.path().join("walls/ghost.png")).unwrap();

    let report = walker().walk(dir.path()).await.unwrap();
    assert!(report.groups.iter().any(|g| g.key == "keep"));
    assert!(!report.groups.iter().any(|g| g.key == "ghost"));
    assert_eq!(report.counts.static_object, 2);
}
