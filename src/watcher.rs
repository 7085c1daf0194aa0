// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! File system watcher that re-walks a pack when it changes

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::Result;

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    /// Watcher error
    Error(String),
}

impl WatchEvent {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Created(p) | Self::Modified(p) | Self::Removed(p) => Some(p),
            Self::Error(_) => None,
        }
    }
}

/// Recursive watcher over one pack root
pub struct PackWatcher {
    watcher: RecommendedWatcher,
    root: PathBuf,
    event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
}

impl PackWatcher {
    /// Start watching `root` and everything below it
    pub fn new(root: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let config = Config::default().with_poll_interval(Duration::from_secs(2));
        let mut watcher = RecommendedWatcher::new(
            move |event| {
                // Receiver gone means the watcher is being dropped
                let _ = tx.send(event);
            },
            config,
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        info!("Watching: {:?}", root);

        Ok(Self {
            watcher,
            root: root.to_path_buf(),
            event_rx: rx,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching
    pub fn unwatch(&mut self) -> Result<()> {
        self.watcher.unwatch(&self.root)?;
        info!("Stopped watching: {:?}", self.root);
        Ok(())
    }

    /// Next relevant event, or `None` once the watcher is gone
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        loop {
            let event = match self.event_rx.recv().await? {
                Ok(event) => Self::convert_event(event),
                Err(e) => Some(WatchEvent::Error(e.to_string())),
            };
            match event {
                Some(WatchEvent::Error(e)) => return Some(WatchEvent::Error(e)),
                Some(event) if event.path().is_some_and(should_process) => return Some(event),
                Some(event) => debug!("Ignoring change: {:?}", event),
                None => {}
            }
        }
    }

    /// Wait for a change, then swallow the burst that follows it
    ///
    /// Returns the number of relevant events seen, or `None` once the watcher
    /// is gone.
    pub async fn next_batch(&mut self, quiet_period: Duration) -> Option<usize> {
        let first = self.next_event().await?;
        if let WatchEvent::Error(e) = &first {
            warn!("Watch error: {}", e);
        }
        let mut seen = 1;

        while let Ok(Some(event)) = tokio::time::timeout(quiet_period, self.next_event()).await {
            if let WatchEvent::Error(e) = &event {
                warn!("Watch error: {}", e);
            }
            seen += 1;
        }

        debug!("Change batch of {} events under {:?}", seen, self.root);
        Some(seen)
    }

    fn convert_event(event: Event) -> Option<WatchEvent> {
        let path = event.paths.first()?.clone();
        match event.kind {
            EventKind::Create(_) => Some(WatchEvent::Created(path)),
            EventKind::Modify(_) => Some(WatchEvent::Modified(path)),
            EventKind::Remove(_) => Some(WatchEvent::Removed(path)),
            _ => None,
        }
    }
}

/// Whether a change to `path` can affect the pack report
pub fn should_process(path: &Path) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    // Skip hidden files
    if filename.starts_with('.') {
        return false;
    }

    // Skip temporary files
    let temp_extensions = [".tmp", ".part", ".crdownload", ".partial", ".download", "~"];
    if temp_extensions.iter().any(|ext| filename.ends_with(ext)) {
        return false;
    }

    // Skip system files
    let skip_names = ["desktop.ini", "thumbs.db"];
    !skip_names.iter().any(|n| filename.eq_ignore_ascii_case(n))
}
