// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Walker behaviour over in-memory packs

use std::path::Path;
use std::sync::Arc;
use tokio_test::task;

use packlens::pack::{DiagnosticKind, PackWalker, Severity, WalkEvent};
use packlens::source::MemorySource;
use packlens::{AppConfig, PackLensError};

fn pack() -> MemorySource {
    MemorySource::new("/pack")
        .with_file("/pack/TAGS.md", "fantasy, pixel")
        .with_file("/pack/pack.json", r#"{"tag":"knights"}"#)
        .with_dir("/pack/previewImages")
}

fn walker(source: MemorySource) -> PackWalker<MemorySource> {
    PackWalker::new(Arc::new(source), &AppConfig::default())
}

#[tokio::test]
async fn nine_patch_counts_once() {
    let report = walker(pack().with_file("/pack/ui/9patch_frame_01.png", "f"))
        .walk(Path::new("/pack"))
        .await
        .unwrap();

    assert_eq!(report.counts.nine_patch, 1);
    assert_eq!(report.counts.static_object, 0);
    assert_eq!(report.counts.animated(), 0);
    assert_eq!(report.groups[0].key, "frame");
}

#[tokio::test]
async fn too_many_underscores_is_one_error_and_ungrouped() {
    let report = walker(pack().with_file("/pack/heroes/hero_walk_left_extra.png", "h"))
        .walk(Path::new("/pack"))
        .await
        .unwrap();

    assert_eq!(report.diagnostics.len(), 1);
    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.kind, DiagnosticKind::NamingConventionViolation);
    assert!(diagnostic.help_url.is_some());
    assert!(report.groups.is_empty());
    assert_eq!(report.counts.wrong_naming_convention, 1);
    // Ungrouped files are not recorded in the folder either
    assert!(report.root.find_child("heroes").unwrap().files.is_empty());
}

#[tokio::test]
async fn preview_artifact_is_invisible() {
    let report = walker(pack().with_file("/pack/heroes/idle.preview.png", "p"))
        .walk(Path::new("/pack"))
        .await
        .unwrap();

    assert!(report.diagnostics.is_empty());
    assert!(report.groups.is_empty());
    assert!(report.root.find_child("heroes").unwrap().files.is_empty());
    assert_eq!(report.counts.total(), 0);
}

#[tokio::test]
async fn spaces_around_underscore_still_grouped() {
    let report = walker(pack().with_file("/pack/a _b.png", "a"))
        .walk(Path::new("/pack"))
        .await
        .unwrap();

    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, DiagnosticKind::NamingConventionViolation);
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].key, "a ");
}

#[tokio::test]
async fn child_tags_start_with_parent_tags() {
    let source = pack()
        .with_file("/pack/heroes/TAGS.md", "character, , hero,")
        .with_file("/pack/heroes/melee/knight.png", "k")
        .with_file("/pack/heroes/ranged/archer.png", "a")
        .with_file("/pack/heroes/ranged/tags.md", "bow");
    let report = walker(source).walk(Path::new("/pack")).await.unwrap();

    fn check(node: &packlens::pack::FolderNode) {
        for child in &node.children {
            assert!(child.inherited_tags.starts_with(&node.inherited_tags));
            check(child);
        }
    }
    check(&report.root);

    let ranged = report
        .root
        .find_folder(Path::new("/pack/heroes/ranged"))
        .unwrap();
    assert_eq!(ranged.inherited_tags, vec!["fantasy", "pixel", "character", "hero", "bow"]);

    let knight = report.groups.iter().find(|g| g.key == "knight").unwrap();
    assert_eq!(report.tags_for_group(knight), vec!["fantasy", "pixel", "character", "hero"]);
}

#[tokio::test]
async fn rewalk_gives_identical_diagnostics() {
    let source = MemorySource::new("/pack")
        .with_file("/pack/a _b.png", "a")
        .with_file("/pack/heroes/hero_walk_left_extra.png", "h")
        .with_file("/pack/heroes/hero_walk.png", "h");
    let walker = walker(source);

    let first = walker.walk(Path::new("/pack")).await.unwrap();
    let second = walker.walk(Path::new("/pack")).await.unwrap();

    assert!(second.generation > first.generation);
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.groups, second.groups);
    assert_eq!(first.counts, second.counts);
}

#[tokio::test]
async fn superseded_walk_never_publishes() {
    let source = Arc::new(pack().with_file("/pack/tree.png", "t"));
    let gate = source.hold_listing("/pack");
    let walker = PackWalker::new(Arc::clone(&source), &AppConfig::default());
    let mut events = walker.subscribe();

    let mut stale = task::spawn(walker.walk(Path::new("/pack")));
    assert!(stale.poll().is_pending());

    // The gate was consumed by the first listing, so this walk runs freely
    let fresh = walker.walk(Path::new("/pack")).await.unwrap();
    assert_eq!(fresh.groups.len(), 1);

    gate.add_permits(1);
    let err = match stale.poll() {
        std::task::Poll::Ready(result) => result.unwrap_err(),
        std::task::Poll::Pending => panic!("stale walk should finish once released"),
    };
    assert!(matches!(err, PackLensError::Superseded { .. }));

    // Only the fresh walk reached presenters past its start
    while let Ok(event) = events.try_recv() {
        if !matches!(event, WalkEvent::Started { .. }) {
            assert_eq!(event.generation(), fresh.generation);
        }
    }
}

#[tokio::test]
async fn read_failure_stays_in_its_folder() {
    let source = pack()
        .with_file("/pack/broken/ghost.png", "g")
        .with_file("/pack/broken/nested/bat.png", "b")
        .with_file("/pack/fine/slime.png", "s");
    source.fail_reads("/pack/broken/ghost.png");
    let report = walker(source).walk(Path::new("/pack")).await.unwrap();

    let keys: Vec<_> = report.groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["slime"]);
    assert!(report.root.find_child("broken").is_some());
    assert!(report.root.find_child("fine").is_some());
    // Read failures are logged, not reported as findings
    assert!(report.diagnostics.is_empty());
}

#[tokio::test]
async fn unlistable_folder_skipped() {
    let source = pack()
        .with_file("/pack/locked/knight.png", "k")
        .with_file("/pack/open/slime.png", "s");
    source.fail_reads("/pack/locked");
    let report = walker(source).walk(Path::new("/pack")).await.unwrap();

    assert_eq!(report.groups.len(), 1);
    assert!(report.root.find_child("locked").unwrap().files.is_empty());
}

#[tokio::test]
async fn groups_ready_after_children() {
    let source = pack()
        .with_file("/pack/heroes/knight_walk.png", "k")
        .with_file("/pack/heroes/squires/squire.png", "s");
    let walker = walker(source);
    let mut events = walker.subscribe();
    walker.walk(Path::new("/pack")).await.unwrap();

    let mut ready = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let WalkEvent::GroupReady { group, .. } = event {
            ready.push(group.key);
        }
    }
    assert_eq!(ready, vec!["squire", "knight"]);
}
