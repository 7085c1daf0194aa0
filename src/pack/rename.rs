// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Renaming pack files, with history and undo

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::history::{create_entry, History, HistoryEntry};
use crate::source::PackSource;
use crate::{PackLensError, Result};

/// Characters no pack file name may contain
pub const INVALID_NAME_CHARS: [char; 9] = ['\\', '/', '?', ':', '*', '|', '"', '<', '>'];

/// Check a proposed file name before touching the source
pub fn validate_new_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PackLensError::InvalidFileName {
            name: name.to_string(),
            reason: "file name cannot be empty".to_string(),
        });
    }
    if name.contains(INVALID_NAME_CHARS) {
        return Err(PackLensError::InvalidFileName {
            name: name.to_string(),
            reason: "file name contains invalid characters (\\ / ? * : | \" < >)".to_string(),
        });
    }
    Ok(())
}

/// Rename `file` within its folder and record it in `history`
///
/// An existing sibling is never overwritten. A failure to record history is
/// logged; the rename itself has already happened by then.
pub async fn rename_file<S: PackSource + ?Sized>(
    source: &S,
    file: &Path,
    new_name: &str,
    group_key: Option<String>,
    history: Option<&History>,
) -> Result<HistoryEntry> {
    validate_new_name(new_name)?;

    let old_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| PackLensError::NotFound { path: file.to_path_buf() })?;
    if old_name == new_name {
        return Err(PackLensError::InvalidFileName {
            name: new_name.to_string(),
            reason: "the file already has this name".to_string(),
        });
    }

    let target = file.with_file_name(new_name);
    // A case-only change points at the file itself on case-insensitive stores
    if !old_name.eq_ignore_ascii_case(new_name) && source.exists(&target).await {
        return Err(PackLensError::AlreadyExists { path: target });
    }

    let new_path = source.rename(file, new_name).await?;
    info!("Renamed {:?} -> {:?}", file, new_path);

    let entry = create_entry(file.to_path_buf(), new_path, group_key);
    if let Some(history) = history {
        if let Err(e) = history.append(&entry) {
            warn!("Failed to record rename in {:?}: {}", history.path(), e);
        }
    }
    Ok(entry)
}

/// Rename a file back to its original name and mark the entry undone
pub async fn undo_rename<S: PackSource + ?Sized>(
    source: &S,
    history: &History,
    entry: &HistoryEntry,
) -> Result<PathBuf> {
    let original_name = entry
        .original_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| PackLensError::NotFound { path: entry.original_path.clone() })?;

    if !source.exists(&entry.new_path).await {
        return Err(PackLensError::NotFound { path: entry.new_path.clone() });
    }
    let current_name = entry
        .new_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !current_name.eq_ignore_ascii_case(&original_name) && source.exists(&entry.original_path).await {
        return Err(PackLensError::AlreadyExists { path: entry.original_path.clone() });
    }

    let restored = source.rename(&entry.new_path, &original_name).await?;
    history.mark_undone(&entry.id)?;
    info!("Undone: {:?} -> {:?}", entry.new_path, restored);
    Ok(restored)
}

/// Undo the most recent rename not yet undone
pub async fn undo_last<S: PackSource + ?Sized>(
    source: &S,
    history: &History,
) -> Result<Option<HistoryEntry>> {
    let Some(entry) = history.get_undoable()?.into_iter().next() else {
        return Ok(None);
    };
    undo_rename(source, history, &entry).await?;
    Ok(Some(entry))
}
