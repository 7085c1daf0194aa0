// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Local filesystem source

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{media_type_for, EntryKind, PackSource, SourceEntry, TypedContent};
use crate::{PackLensError, Result};

/// [`PackSource`] over the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FsSource;

impl FsSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PackSource for FsSource {
    async fn list(&self, dir: &Path) -> Result<Vec<SourceEntry>> {
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| PackLensError::io(dir, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| PackLensError::io(dir, e))? {
            let file_type = entry.file_type().await.map_err(|e| PackLensError::io(entry.path(), e))?;
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                // Symlinks are leaves: file targets are read, directory
                // targets and dangling links are skipped so loops cannot form
                match tokio::fs::metadata(entry.path()).await {
                    Ok(m) if m.is_file() => EntryKind::File,
                    Ok(m) if m.is_dir() => {
                        debug!("Skipping symlinked folder: {:?}", entry.path());
                        continue;
                    }
                    _ => {
                        debug!("Skipping special entry: {:?}", entry.path());
                        continue;
                    }
                }
            };

            entries.push(SourceEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                kind,
                path: entry.path(),
            });
        }

        Ok(entries)
    }

    async fn read_text(&self, file: &Path) -> Result<String> {
        tokio::fs::read_to_string(file)
            .await
            .map_err(|e| PackLensError::io(file, e))
    }

    async fn read_typed(&self, file: &Path) -> Result<TypedContent> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| PackLensError::io(file, e))?;
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
        Ok(TypedContent {
            media_type: media_type_for(name),
            bytes,
        })
    }

    async fn write_text(&self, file: &Path, content: &str) -> Result<()> {
        tokio::fs::write(file, content)
            .await
            .map_err(|e| PackLensError::io(file, e))
    }

    async fn rename(&self, file: &Path, new_name: &str) -> Result<PathBuf> {
        let parent = file.parent().ok_or_else(|| PackLensError::NotFound { path: file.to_path_buf() })?;
        let new_path = parent.join(new_name);
        tokio::fs::rename(file, &new_path)
            .await
            .map_err(|e| PackLensError::io(file, e))?;
        Ok(new_path)
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_list_and_lookup() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("Tags.MD"), "ui, fantasy").unwrap();
        std::fs::create_dir(dir.path().join("previewImages")).unwrap();

        let source = FsSource::new();
        let mut entries = source.list(dir.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);

        let tags = source.find_entry(dir.path(), "TAGS.md").await.unwrap().unwrap();
        assert_eq!(tags.name, "Tags.MD");
        assert!(tags.is_file());

        let preview = source.find_directory(dir.path(), "previewimages").await.unwrap();
        assert_eq!(preview, Some(dir.path().join("previewImages")));
        assert!(source.find_directory(dir.path(), "Tags.MD").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_typed_and_rename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hero_idle.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let source = FsSource::new();
        let content = source.read_typed(&path).await.unwrap();
        assert_eq!(content.media_type, "image/png");
        assert_eq!(content.bytes.len(), 4);

        let renamed = source.rename(&path, "hero_walk.png").await.unwrap();
        assert!(source.exists(&renamed).await);
        assert!(!source.exists(&path).await);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let err = FsSource::new().list(&dir.path().join("gone")).await.unwrap_err();
        assert!(matches!(err, PackLensError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_leaves() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("tree.png"), "t").unwrap();
        std::fs::create_dir(dir.path().join("props")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("tree.png"), dir.path().join("bush.png")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("props/up")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.png"), dir.path().join("dangling.png")).unwrap();

        let source = FsSource::new();
        let mut names: Vec<_> = source
            .list(dir.path())
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.kind))
            .collect();
        names.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            names,
            vec![
                ("bush.png".to_string(), EntryKind::File),
                ("props".to_string(), EntryKind::Directory),
                ("tree.png".to_string(), EntryKind::File),
            ]
        );
        assert!(source.list(&dir.path().join("props")).await.unwrap().is_empty());
    }
}
