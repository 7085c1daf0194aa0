// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rename history for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::Result;

/// A single rename in history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    /// Object group the file belonged to before the rename
    #[serde(default)]
    pub group_key: Option<String>,
    pub undone: bool,
}

/// JSONL log of renames
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append an entry to the history
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all history entries, oldest first
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse history entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Most recent `count` entries, newest first
    pub fn get_recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Mark an entry as undone
    pub fn mark_undone(&self, id: &str) -> Result<()> {
        let entries = self.read_all()?;

        // Rewrite the entire file with the updated entry
        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for mut entry in entries {
            if entry.id == id {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Entries not yet undone, newest first
    pub fn get_undoable(&self) -> Result<Vec<HistoryEntry>> {
        let mut entries: Vec<_> = self.read_all()?.into_iter().filter(|e| !e.undone).collect();
        entries.reverse();
        Ok(entries)
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create a new history entry stamped now
pub fn create_entry(original_path: PathBuf, new_path: PathBuf, group_key: Option<String>) -> HistoryEntry {
    HistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        original_path,
        new_path,
        group_key,
        undone: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_and_undo_order() {
        let dir = tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        assert!(history.read_all().unwrap().is_empty());

        let first = create_entry("/p/a.png".into(), "/p/b.png".into(), Some("a".into()));
        let second = create_entry("/p/c.png".into(), "/p/d.png".into(), None);
        history.append(&first).unwrap();
        history.append(&second).unwrap();

        let undoable = history.get_undoable().unwrap();
        assert_eq!(undoable[0].id, second.id);

        history.mark_undone(&second.id).unwrap();
        let undoable = history.get_undoable().unwrap();
        assert_eq!(undoable.len(), 1);
        assert_eq!(undoable[0].id, first.id);
        assert_eq!(history.get_recent(1).unwrap()[0].id, second.id);
    }

    #[test]
    fn test_skips_corrupt_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let entry = create_entry("/p/a.png".into(), "/p/b.png".into(), None);
        fs::write(
            &path,
            format!("not json\n\n{}\n", serde_json::to_string(&entry).unwrap()),
        )
        .unwrap();

        let history = History::new(&path);
        assert_eq!(history.read_all().unwrap(), vec![entry]);

        history.clear().unwrap();
        assert!(!path.exists());
    }
}
