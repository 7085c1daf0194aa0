// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Pack model: folder tree, object groups and diagnostics

pub mod metadata;
pub mod naming;
pub mod rename;
pub mod tags;
pub mod walker;

pub use naming::{classify, Classification, NamingViolation, ObjectCounts, ObjectKind};
pub use walker::{PackWalker, WalkEvent};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file as recorded in the folder tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    /// Reserved for root-level files, left empty by the walker
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            tags: Vec::new(),
        }
    }
}

/// Mirror of one pack directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub name: String,
    pub path: PathBuf,
    /// Tags declared by this folder's own tags file
    pub tags: Vec<String>,
    /// Ancestors' tags, root first, followed by this folder's own tags
    pub inherited_tags: Vec<String>,
    pub files: Vec<FileEntry>,
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            tags: Vec::new(),
            inherited_tags: Vec::new(),
            files: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Child node seeded with this node's tags as known right now
    pub fn child(&self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let mut child = Self::new(name, path);
        child.inherited_tags = self.inherited_tags.clone();
        child
    }

    /// Set this folder's own tags and append them to the inherited ones
    pub fn declare_tags(&mut self, tags: Vec<String>) {
        self.inherited_tags.extend(tags.iter().cloned());
        self.tags = tags;
    }

    pub fn find_child(&self, name: &str) -> Option<&FolderNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Node mirroring `path`, searched depth-first
    pub fn find_folder(&self, path: &Path) -> Option<&FolderNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_folder(path))
    }

    /// Number of folders in this subtree, this one included
    pub fn folder_count(&self) -> usize {
        1 + self.children.iter().map(FolderNode::folder_count).sum::<usize>()
    }

    /// Number of recorded files in this subtree
    pub fn file_count(&self) -> usize {
        self.files.len() + self.children.iter().map(FolderNode::file_count).sum::<usize>()
    }
}

/// Image files forming one logical sprite, in discovery order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectGroup {
    pub key: String,
    pub folder: PathBuf,
    pub files: Vec<FileEntry>,
}

impl ObjectGroup {
    /// First file of the group, shown as its thumbnail
    pub fn representative(&self) -> Option<&FileEntry> {
        self.files.first()
    }

    pub fn is_animated(&self) -> bool {
        self.files.len() > 1
    }
}

/// An image from the reserved preview folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewImage {
    pub name: String,
    pub path: PathBuf,
}

/// A parsed metadata file found during the walk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub path: PathBuf,
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Category of a walk finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingRequiredFile,
    EmptyRequiredFile,
    NamingConventionViolation,
    MalformedMetadata,
}

/// One entry of the walk's diagnostic log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Documentation to point the user at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_url: Option<String>,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            path: None,
            help_url: None,
        }
    }

    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::warning(kind, message)
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_help(mut self, url: impl Into<String>) -> Self {
        self.help_url = Some(url.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Everything one walk learned about a pack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackReport {
    pub generation: u64,
    pub root: FolderNode,
    pub groups: Vec<ObjectGroup>,
    pub preview_images: Vec<PreviewImage>,
    pub metadata: Vec<MetadataDocument>,
    pub diagnostics: Vec<Diagnostic>,
    pub counts: ObjectCounts,
}

impl PackReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// Group containing the file at `path`
    pub fn group_of(&self, path: &Path) -> Option<&ObjectGroup> {
        self.groups.iter().find(|g| g.files.iter().any(|f| f.path == path))
    }

    /// Metadata file at the pack root, if one parsed
    pub fn root_metadata(&self) -> Option<&MetadataDocument> {
        self.metadata
            .iter()
            .find(|m| m.path.parent() == Some(self.root.path.as_path()))
    }

    /// Inherited tags of the first folder, searched depth-first over the
    /// whole tree, holding a file with the representative's object segment
    ///
    /// This is usually the group's own folder, but an earlier folder with a
    /// same-named object wins.
    pub fn tags_for_group(&self, group: &ObjectGroup) -> Vec<String> {
        match group.representative() {
            Some(file) => tags::find_tags_for_file(&file.name, &self.root),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_snapshot_of_parent_tags() {
        let mut root = FolderNode::new("pack", "/pack");
        root.declare_tags(vec!["fantasy".into()]);

        let child = root.child("heroes", "/pack/heroes");
        assert_eq!(child.inherited_tags, vec!["fantasy"]);
        assert!(child.tags.is_empty());

        // Later changes to the parent do not reach an existing child
        root.declare_tags(vec!["ui".into()]);
        assert_eq!(child.inherited_tags, vec!["fantasy"]);
    }

    #[test]
    fn test_counts_and_lookup() {
        let mut root = FolderNode::new("pack", "/pack");
        root.files.push(FileEntry::new("pack.json", "/pack/pack.json"));
        let mut heroes = root.child("heroes", "/pack/heroes");
        heroes.files.push(FileEntry::new("hero_walk.png", "/pack/heroes/hero_walk.png"));
        root.children.push(heroes);

        assert_eq!(root.folder_count(), 2);
        assert_eq!(root.file_count(), 2);
        assert!(root.find_child("heroes").is_some());
        assert_eq!(
            root.find_folder(Path::new("/pack/heroes")).map(|f| f.name.as_str()),
            Some("heroes")
        );
    }

    #[test]
    fn test_tags_for_group_searches_whole_tree() {
        let mut root = FolderNode::new("pack", "/pack");
        root.declare_tags(vec!["fantasy".into()]);

        let mut heroes = root.child("heroes", "/pack/heroes");
        heroes.declare_tags(vec!["character".into()]);
        heroes.files.push(FileEntry::new("knight_walk.png", "/pack/heroes/knight_walk.png"));
        let mut props = root.child("props", "/pack/props");
        props.declare_tags(vec!["prop".into()]);
        props.files.push(FileEntry::new("knight_statue.png", "/pack/props/knight_statue.png"));
        props.files.push(FileEntry::new("barrel.png", "/pack/props/barrel.png"));
        root.children.push(heroes);
        root.children.push(props);

        let report = PackReport {
            generation: 1,
            root,
            groups: Vec::new(),
            preview_images: Vec::new(),
            metadata: Vec::new(),
            diagnostics: Vec::new(),
            counts: ObjectCounts::default(),
        };
        let statue = ObjectGroup {
            key: "knight".into(),
            folder: PathBuf::from("/pack/props"),
            files: vec![FileEntry::new("knight_statue.png", "/pack/props/knight_statue.png")],
        };
        let barrel = ObjectGroup {
            key: "barrel".into(),
            folder: PathBuf::from("/pack/props"),
            files: vec![FileEntry::new("barrel.png", "/pack/props/barrel.png")],
        };

        // The heroes folder comes first and shares the "knight" segment
        assert_eq!(report.tags_for_group(&statue), vec!["fantasy", "character"]);
        assert_eq!(report.tags_for_group(&barrel), vec!["fantasy", "prop"]);
    }

    #[test]
    fn test_diagnostic_builders() {
        let d = Diagnostic::error(DiagnosticKind::NamingConventionViolation, "bad")
            .with_path("/pack/a _b.png")
            .with_help("https://example.org/naming");
        assert!(d.is_error());
        assert_eq!(d.path, Some(PathBuf::from("/pack/a _b.png")));

        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["severity"], "error");
        assert_eq!(json["kind"], "naming_convention_violation");
    }
}
