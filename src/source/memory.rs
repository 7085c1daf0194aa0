// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! In-memory source with deterministic listing order

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

use super::{media_type_for, EntryKind, PackSource, SourceEntry, TypedContent};
use crate::{PackLensError, Result};

#[derive(Debug, Clone)]
enum Node {
    Dir { children: Vec<String> },
    File { bytes: Vec<u8> },
}

#[derive(Default)]
struct State {
    nodes: HashMap<PathBuf, Node>,
    failing: HashSet<PathBuf>,
    read_only: HashSet<PathBuf>,
    held: HashMap<PathBuf, Arc<Semaphore>>,
}

/// [`PackSource`] over an in-memory tree
///
/// Children are listed in insertion order. Reads can be made to fail and
/// writes to be denied per path, and the first listing of a directory can be
/// held until released, which lets callers interleave concurrent walks.
pub struct MemorySource {
    state: Mutex<State>,
}

impl MemorySource {
    /// Create a source holding only the empty root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        let mut state = State::default();
        state
            .nodes
            .insert(root.as_ref().to_path_buf(), Node::Dir { children: Vec::new() });
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the tree itself consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a file, creating missing parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        Self::link(&mut state, &path);
        state.nodes.insert(path, Node::File { bytes: bytes.into() });
    }

    /// Add an empty directory, creating missing parents
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        if state.nodes.contains_key(&path) {
            return;
        }
        Self::link(&mut state, &path);
        state.nodes.insert(path, Node::Dir { children: Vec::new() });
    }

    pub fn with_file(self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, bytes);
        self
    }

    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.add_dir(path);
        self
    }

    /// Make every read or listing of `path` fail
    pub fn fail_reads(&self, path: impl AsRef<Path>) {
        self.lock().failing.insert(path.as_ref().to_path_buf());
    }

    /// Make writes and renames of `path` fail with permission denied
    pub fn deny_writes(&self, path: impl AsRef<Path>) {
        self.lock().read_only.insert(path.as_ref().to_path_buf());
    }

    /// Hold the next listing of `dir` until a permit is added to the returned semaphore
    pub fn hold_listing(&self, dir: impl AsRef<Path>) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.lock().held.insert(dir.as_ref().to_path_buf(), Arc::clone(&gate));
        gate
    }

    /// Raw bytes of a file, if present
    pub fn file_bytes(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().nodes.get(path.as_ref()) {
            Some(Node::File { bytes }) => Some(bytes.clone()),
            _ => None,
        }
    }

    fn link(state: &mut State, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        let name = name.to_string_lossy().to_string();

        if !state.nodes.contains_key(parent) {
            Self::link(state, parent);
            state
                .nodes
                .insert(parent.to_path_buf(), Node::Dir { children: Vec::new() });
        }

        if let Some(Node::Dir { children }) = state.nodes.get_mut(parent) {
            if !children.contains(&name) {
                children.push(name);
            }
        }
    }

    fn check_readable(state: &State, path: &Path) -> Result<()> {
        if state.failing.contains(path) {
            return Err(PackLensError::FileSystem(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("simulated read failure: {}", path.display()),
            )));
        }
        Ok(())
    }

    fn check_writable(state: &State, path: &Path) -> Result<()> {
        if state.read_only.contains(path) {
            return Err(PackLensError::PermissionDenied { path: path.to_path_buf() });
        }
        Ok(())
    }
}

#[async_trait]
impl PackSource for MemorySource {
    async fn list(&self, dir: &Path) -> Result<Vec<SourceEntry>> {
        let gate = self.lock().held.remove(dir);
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| PackLensError::Config(e.to_string()))?;
        }

        let state = self.lock();
        Self::check_readable(&state, dir)?;
        let children = match state.nodes.get(dir) {
            Some(Node::Dir { children }) => children,
            _ => return Err(PackLensError::NotFound { path: dir.to_path_buf() }),
        };

        Ok(children
            .iter()
            .map(|name| {
                let path = dir.join(name);
                let kind = match state.nodes.get(&path) {
                    Some(Node::Dir { .. }) => EntryKind::Directory,
                    _ => EntryKind::File,
                };
                SourceEntry { name: name.clone(), kind, path }
            })
            .collect())
    }

    async fn read_text(&self, file: &Path) -> Result<String> {
        let state = self.lock();
        Self::check_readable(&state, file)?;
        match state.nodes.get(file) {
            Some(Node::File { bytes }) => Ok(String::from_utf8_lossy(bytes).to_string()),
            _ => Err(PackLensError::NotFound { path: file.to_path_buf() }),
        }
    }

    async fn read_typed(&self, file: &Path) -> Result<TypedContent> {
        let state = self.lock();
        Self::check_readable(&state, file)?;
        match state.nodes.get(file) {
            Some(Node::File { bytes }) => {
                let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
                Ok(TypedContent {
                    media_type: media_type_for(name),
                    bytes: bytes.clone(),
                })
            }
            _ => Err(PackLensError::NotFound { path: file.to_path_buf() }),
        }
    }

    async fn write_text(&self, file: &Path, content: &str) -> Result<()> {
        let mut state = self.lock();
        Self::check_writable(&state, file)?;
        Self::link(&mut state, file);
        state
            .nodes
            .insert(file.to_path_buf(), Node::File { bytes: content.as_bytes().to_vec() });
        Ok(())
    }

    async fn rename(&self, file: &Path, new_name: &str) -> Result<PathBuf> {
        let mut state = self.lock();
        Self::check_writable(&state, file)?;
        let parent = file
            .parent()
            .ok_or_else(|| PackLensError::NotFound { path: file.to_path_buf() })?
            .to_path_buf();
        let node = state
            .nodes
            .remove(file)
            .ok_or_else(|| PackLensError::NotFound { path: file.to_path_buf() })?;

        let old_name = file.file_name().map(|n| n.to_string_lossy().to_string());
        let new_path = parent.join(new_name);
        if let Some(Node::Dir { children }) = state.nodes.get_mut(&parent) {
            // Renaming keeps the entry's position in the listing
            if let Some(slot) = children.iter_mut().find(|c| Some(c.as_str()) == old_name.as_deref()) {
                *slot = new_name.to_string();
            }
        }
        state.nodes.insert(new_path.clone(), node);
        Ok(new_path)
    }

    async fn exists(&self, path: &Path) -> bool {
        self.lock().nodes.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insertion_order_is_listing_order() {
        let source = MemorySource::new("/pack")
            .with_file("/pack/zeta.png", "z")
            .with_dir("/pack/alpha")
            .with_file("/pack/beta.png", "b");

        let names: Vec<_> = source
            .list(Path::new("/pack"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["zeta.png", "alpha", "beta.png"]);
    }

    #[tokio::test]
    async fn test_nested_parents_created() {
        let source = MemorySource::new("/pack").with_file("/pack/a/b/c.png", "c");
        let a = source.find_directory(Path::new("/pack"), "A").await.unwrap();
        assert_eq!(a, Some(PathBuf::from("/pack/a")));
        assert_eq!(source.list(Path::new("/pack/a/b")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failures() {
        let source = MemorySource::new("/pack").with_file("/pack/pack.json", "{}");
        source.fail_reads("/pack/pack.json");
        source.deny_writes("/pack/pack.json");

        assert!(source.read_text(Path::new("/pack/pack.json")).await.is_err());
        let err = source.write_text(Path::new("/pack/pack.json"), "{}").await.unwrap_err();
        assert!(matches!(err, PackLensError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_rename_keeps_position() {
        let source = MemorySource::new("/pack")
            .with_file("/pack/a.png", "a")
            .with_file("/pack/b.png", "b");
        let new_path = source.rename(Path::new("/pack/a.png"), "c.png").await.unwrap();
        assert_eq!(new_path, PathBuf::from("/pack/c.png"));

        let names: Vec<_> = source
            .list(Path::new("/pack"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["c.png", "b.png"]);
        assert_eq!(source.file_bytes("/pack/c.png"), Some(b"a".to_vec()));
    }
}
