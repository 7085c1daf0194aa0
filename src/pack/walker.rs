// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Pack walker: mirrors the folder tree, groups sprite files and collects diagnostics
//!
//! Each call to [`PackWalker::walk`] owns a private [`WalkContext`] and a
//! generation number. Starting another walk bumps the shared generation, and
//! the older walk stops with [`PackLensError::Superseded`] at its next check,
//! so it can neither emit events nor return a report.

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::naming::{self, Classification, ObjectKind};
use super::tags::parse_tags;
use super::{
    Diagnostic, DiagnosticKind, FileEntry, FolderNode, MetadataDocument, ObjectGroup, PackReport,
    PreviewImage,
};
use crate::config::{AppConfig, DocsConfig, LayoutConfig};
use crate::source::{PackSource, SourceEntry, TypedContent};
use crate::{PackLensError, Result};

const EVENT_CHANNEL_SIZE: usize = 256;

/// Events streamed to presenters while a walk runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalkEvent {
    Started {
        generation: u64,
        root: PathBuf,
    },
    FolderEntered {
        generation: u64,
        path: PathBuf,
        inherited_tags: Vec<String>,
    },
    Diagnostic {
        generation: u64,
        diagnostic: Diagnostic,
    },
    Metadata {
        generation: u64,
        document: MetadataDocument,
    },
    PreviewImage {
        generation: u64,
        image: PreviewImage,
        #[serde(skip)]
        content: Arc<TypedContent>,
    },
    /// A folder's object group is complete; `content` is the representative's
    GroupReady {
        generation: u64,
        group: ObjectGroup,
        #[serde(skip)]
        content: Arc<TypedContent>,
    },
    Finished {
        generation: u64,
        counts: naming::ObjectCounts,
        diagnostics: usize,
    },
}

impl WalkEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Started { generation, .. }
            | Self::FolderEntered { generation, .. }
            | Self::Diagnostic { generation, .. }
            | Self::Metadata { generation, .. }
            | Self::PreviewImage { generation, .. }
            | Self::GroupReady { generation, .. }
            | Self::Finished { generation, .. } => *generation,
        }
    }
}

/// State owned by a single walk
struct WalkContext {
    generation: u64,
    latest: Arc<AtomicU64>,
    events: broadcast::Sender<WalkEvent>,
    diagnostics: Vec<Diagnostic>,
    kinds: Vec<ObjectKind>,
    groups: Vec<ObjectGroup>,
    preview_images: Vec<PreviewImage>,
    metadata: Vec<MetadataDocument>,
}

impl WalkContext {
    fn new(generation: u64, latest: Arc<AtomicU64>, events: broadcast::Sender<WalkEvent>) -> Self {
        Self {
            generation,
            latest,
            events,
            diagnostics: Vec::new(),
            kinds: Vec::new(),
            groups: Vec::new(),
            preview_images: Vec::new(),
            metadata: Vec::new(),
        }
    }

    fn ensure_current(&self) -> Result<()> {
        if self.latest.load(Ordering::SeqCst) != self.generation {
            return Err(PackLensError::Superseded { generation: self.generation });
        }
        Ok(())
    }

    fn emit(&self, event: WalkEvent) -> Result<()> {
        self.ensure_current()?;
        // No subscribers is fine
        let _ = self.events.send(event);
        Ok(())
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) -> Result<()> {
        debug!("{:?}: {}", diagnostic.severity, diagnostic.message);
        self.emit(WalkEvent::Diagnostic {
            generation: self.generation,
            diagnostic: diagnostic.clone(),
        })?;
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    fn finish(self, root: FolderNode) -> PackReport {
        PackReport {
            generation: self.generation,
            root,
            groups: self.groups,
            preview_images: self.preview_images,
            metadata: self.metadata,
            diagnostics: self.diagnostics,
            counts: self.kinds.into_iter().collect(),
        }
    }
}

/// Walks packs read through a [`PackSource`]
pub struct PackWalker<S> {
    source: Arc<S>,
    layout: LayoutConfig,
    docs: DocsConfig,
    latest: Arc<AtomicU64>,
    events: broadcast::Sender<WalkEvent>,
}

impl<S> Clone for PackWalker<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            layout: self.layout.clone(),
            docs: self.docs.clone(),
            latest: Arc::clone(&self.latest),
            events: self.events.clone(),
        }
    }
}

impl<S: PackSource> PackWalker<S> {
    /// Create a walker using the configured pack layout
    pub fn new(source: Arc<S>, config: &AppConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            source,
            layout: config.layout.clone(),
            docs: config.docs.clone(),
            latest: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Subscribe to events of this and later walks
    pub fn subscribe(&self) -> broadcast::Receiver<WalkEvent> {
        self.events.subscribe()
    }

    /// Generation of the newest walk started so far
    pub fn current_generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Supersede any walk in flight without starting a new one
    pub fn invalidate(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Walk the pack rooted at `root`
    pub async fn walk(&self, root: &Path) -> Result<PackReport> {
        let generation = self.invalidate();
        let mut ctx = WalkContext::new(generation, Arc::clone(&self.latest), self.events.clone());
        info!("Walk {} started: {:?}", generation, root);

        // Only an unreadable root fails the walk itself
        self.source.list(root).await?;
        ctx.ensure_current()?;

        ctx.emit(WalkEvent::Started {
            generation,
            root: root.to_path_buf(),
        })?;

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());
        let mut node = FolderNode::new(name, root);

        self.visit(&mut ctx, &mut node, true).await?;
        ctx.ensure_current()?;

        let report = ctx.finish(node);
        info!(
            "Walk {} finished: {} groups, {} diagnostics",
            generation,
            report.groups.len(),
            report.diagnostics.len()
        );
        let _ = self.events.send(WalkEvent::Finished {
            generation,
            counts: report.counts,
            diagnostics: report.diagnostics.len(),
        });
        Ok(report)
    }

    /// Walk one directory; read failures stop only this directory
    fn visit<'a>(
        &'a self,
        ctx: &'a mut WalkContext,
        node: &'a mut FolderNode,
        is_root: bool,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            match self.walk_directory(ctx, node, is_root).await {
                Err(e) if e.is_superseded() => Err(e),
                Err(e) => {
                    error!("Error accessing the folder {:?}: {}", node.path, e);
                    Ok(())
                }
                Ok(()) => Ok(()),
            }
        }
        .boxed()
    }

    async fn walk_directory(
        &self,
        ctx: &mut WalkContext,
        node: &mut FolderNode,
        is_root: bool,
    ) -> Result<()> {
        let dir = node.path.clone();
        debug!("Entering {:?}", dir);

        // First pass: settle this folder's own tags before seeding children
        let own_tags = if is_root {
            self.inspect_root(ctx, &dir).await?
        } else {
            Vec::new()
        };
        let entries = self.source.list(&dir).await?;
        ctx.ensure_current()?;

        let own_tags = if is_root {
            own_tags
        } else {
            match entries.iter().find(|e| e.is_file() && self.is_tags_file(&e.name)) {
                Some(entry) => {
                    let text = self.source.read_text(&entry.path).await?;
                    ctx.ensure_current()?;
                    parse_tags(&text)
                }
                None => Vec::new(),
            }
        };
        node.declare_tags(own_tags);
        ctx.emit(WalkEvent::FolderEntered {
            generation: ctx.generation,
            path: dir.clone(),
            inherited_tags: node.inherited_tags.clone(),
        })?;

        let in_preview_folder =
            !is_root && node.name.eq_ignore_ascii_case(&self.layout.preview_folder);

        // Second pass, in listing order
        let mut groups: Vec<ObjectGroup> = Vec::new();
        for entry in entries {
            if entry.is_dir() {
                let mut child = node.child(&entry.name, &entry.path);
                self.visit(ctx, &mut child, false).await?;
                node.children.push(child);
                continue;
            }
            self.visit_file(ctx, node, &mut groups, &entry, in_preview_folder)
                .await?;
        }

        for group in groups {
            let Some(representative) = group.representative() else {
                continue;
            };
            let content = self.source.read_typed(&representative.path).await?;
            ctx.emit(WalkEvent::GroupReady {
                generation: ctx.generation,
                group: group.clone(),
                content: Arc::new(content),
            })?;
            ctx.groups.push(group);
        }

        Ok(())
    }

    /// Root-only checks for the reserved files; returns the root's own tags
    async fn inspect_root(&self, ctx: &mut WalkContext, root: &Path) -> Result<Vec<String>> {
        let layout = &self.layout;
        let mut tags = Vec::new();

        match self.source.find_entry(root, &layout.tags_file).await? {
            Some(entry) if entry.is_file() => {
                let text = self.source.read_text(&entry.path).await?;
                ctx.ensure_current()?;
                if text.trim().is_empty() {
                    ctx.diagnose(
                        Diagnostic::warning(
                            DiagnosticKind::EmptyRequiredFile,
                            format!(
                                "\"{}\" file is empty. Please add a list of words separated by a comma.",
                                layout.tags_file
                            ),
                        )
                        .with_path(&entry.path),
                    )?;
                } else {
                    tags = parse_tags(&text);
                }
            }
            _ => {
                ctx.diagnose(Diagnostic::warning(
                    DiagnosticKind::MissingRequiredFile,
                    format!(
                        "\"{}\" file not found in the root folder. Please add the file with a list of words separated by a comma.",
                        layout.tags_file
                    ),
                ))?;
            }
        }

        let metadata = self.source.find_entry(root, &layout.metadata_file).await?;
        ctx.ensure_current()?;
        if !metadata.as_ref().is_some_and(SourceEntry::is_file) {
            ctx.diagnose(
                Diagnostic::warning(
                    DiagnosticKind::MissingRequiredFile,
                    format!(
                        "\"{}\" file not found in the root folder. Please add the necessary pack information.",
                        layout.metadata_file
                    ),
                )
                .with_help(&self.docs.metadata_url),
            )?;
        }

        let preview = self.source.find_directory(root, &layout.preview_folder).await?;
        ctx.ensure_current()?;
        if preview.is_none() {
            ctx.diagnose(
                Diagnostic::warning(
                    DiagnosticKind::MissingRequiredFile,
                    format!("\"{}\" folder is missing in the root folder.", layout.preview_folder),
                )
                .with_help(&self.docs.preview_url),
            )?;
        }

        Ok(tags)
    }

    async fn visit_file(
        &self,
        ctx: &mut WalkContext,
        node: &mut FolderNode,
        groups: &mut Vec<ObjectGroup>,
        entry: &SourceEntry,
        in_preview_folder: bool,
    ) -> Result<()> {
        let file = FileEntry::new(&entry.name, &entry.path);

        if self.is_metadata_file(&entry.name) {
            self.read_metadata(ctx, entry).await?;
            node.files.push(file);
            return Ok(());
        }
        if self.is_tags_file(&entry.name) {
            // Already consumed by the first pass
            node.files.push(file);
            return Ok(());
        }

        let content = self.source.read_typed(&entry.path).await?;
        ctx.ensure_current()?;

        if !content.is_image() {
            ctx.kinds.push(if content.is_audio() {
                ObjectKind::Sound
            } else {
                ObjectKind::OtherUnknown
            });
            node.files.push(file);
            return Ok(());
        }

        if naming::has_spaces_around_underscore(&entry.name) {
            ctx.diagnose(
                Diagnostic::error(
                    DiagnosticKind::NamingConventionViolation,
                    format!("\"{}\" has spaces around underscore(s). Please remove them.", entry.name),
                )
                .with_path(&entry.path)
                .with_help(&self.docs.naming_url),
            )?;
        }

        if in_preview_folder {
            let image = PreviewImage {
                name: entry.name.clone(),
                path: entry.path.clone(),
            };
            ctx.emit(WalkEvent::PreviewImage {
                generation: ctx.generation,
                image: image.clone(),
                content: Arc::new(content),
            })?;
            ctx.preview_images.push(image);
            return Ok(());
        }

        let class = naming::classify(&entry.name);
        if let Some(kind) = class.object_kind() {
            ctx.kinds.push(kind);
        }

        match (&class, class.group_key()) {
            (_, Some(key)) => {
                match groups.iter_mut().find(|g| g.key == key) {
                    Some(group) => group.files.push(file.clone()),
                    None => groups.push(ObjectGroup {
                        key: key.to_string(),
                        folder: node.path.clone(),
                        files: vec![file.clone()],
                    }),
                }
                node.files.push(file);
            }
            (Classification::Invalid(violation), None) => {
                ctx.diagnose(
                    Diagnostic::error(
                        DiagnosticKind::NamingConventionViolation,
                        format!(
                            "\"{}\" is not a valid file name: {}. Please read the naming convention.",
                            entry.name, violation
                        ),
                    )
                    .with_path(&entry.path)
                    .with_help(&self.docs.naming_url),
                )?;
            }
            _ => debug!("Ignoring preview render: {:?}", entry.path),
        }

        Ok(())
    }

    async fn read_metadata(&self, ctx: &mut WalkContext, entry: &SourceEntry) -> Result<()> {
        let text = self.source.read_text(&entry.path).await?;
        ctx.ensure_current()?;

        if text.trim().is_empty() {
            return ctx.diagnose(
                Diagnostic::warning(
                    DiagnosticKind::EmptyRequiredFile,
                    format!("\"{}\" file is empty.", entry.name),
                )
                .with_path(&entry.path)
                .with_help(&self.docs.metadata_url),
            );
        }

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(content) => {
                let document = MetadataDocument {
                    path: entry.path.clone(),
                    content,
                };
                ctx.emit(WalkEvent::Metadata {
                    generation: ctx.generation,
                    document: document.clone(),
                })?;
                ctx.metadata.push(document);
                Ok(())
            }
            Err(e) => ctx.diagnose(
                Diagnostic::error(
                    DiagnosticKind::MalformedMetadata,
                    format!("\"{}\" is not valid JSON: {}", entry.name, e),
                )
                .with_path(&entry.path)
                .with_help(&self.docs.metadata_url),
            ),
        }
    }

    fn is_tags_file(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(&self.layout.tags_file)
    }

    fn is_metadata_file(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(&self.layout.metadata_file)
    }
}
