// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Directory access used by the walker
//!
//! The walker never touches the filesystem directly. It lists directories,
//! reads text and typed content, and performs the few writes the editor needs
//! through a [`PackSource`]. [`FsSource`] backs it with the local filesystem,
//! [`MemorySource`] with an in-memory tree.

pub mod fs;
pub mod memory;

pub use fs::FsSource;
pub use memory::MemorySource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// What a directory child is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// One immediate child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub kind: EntryKind,
    pub path: PathBuf,
}

impl SourceEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// File content together with its declared media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedContent {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl TypedContent {
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn is_audio(&self) -> bool {
        self.media_type.starts_with("audio/")
    }
}

/// Directory listing and file access capability
#[async_trait]
pub trait PackSource: Send + Sync {
    /// Immediate children of `dir`, in the order the backing store yields them
    async fn list(&self, dir: &Path) -> Result<Vec<SourceEntry>>;

    /// Read a small file as text
    async fn read_text(&self, file: &Path) -> Result<String>;

    /// Read a file with its media type
    async fn read_typed(&self, file: &Path) -> Result<TypedContent>;

    /// Replace the whole content of a file
    async fn write_text(&self, file: &Path, content: &str) -> Result<()>;

    /// Rename a file within its directory, returning the new path
    async fn rename(&self, file: &Path, new_name: &str) -> Result<PathBuf>;

    /// Whether anything exists at `path`
    async fn exists(&self, path: &Path) -> bool;

    /// Case-insensitive lookup of an immediate child by name
    async fn find_entry(&self, dir: &Path, name: &str) -> Result<Option<SourceEntry>> {
        Ok(self
            .list(dir)
            .await?
            .into_iter()
            .find(|e| e.name.eq_ignore_ascii_case(name)))
    }

    /// Case-insensitive lookup of an immediate subdirectory by name
    async fn find_directory(&self, dir: &Path, name: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .list(dir)
            .await?
            .into_iter()
            .find(|e| e.is_dir() && e.name.eq_ignore_ascii_case(name))
            .map(|e| e.path))
    }
}

/// Media type for a file name, derived from its extension
pub fn media_type_for(name: &str) -> String {
    let ext = match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return "application/octet-stream".to_string(),
    };

    if let Some(format) = image::ImageFormat::from_extension(&ext) {
        return format.to_mime_type().to_string();
    }

    match ext.as_str() {
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "json" => "application/json",
        "md" => "text/markdown",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
    .to_string()
}
