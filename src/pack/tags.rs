// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Tags file parsing and tag lookup in the folder tree

use super::FolderNode;

/// Parse a comma-separated tags file.
///
/// Segments are trimmed and empty segments (from blank files, doubled or
/// trailing commas) are dropped.
pub fn parse_tags(content: &str) -> Vec<String> {
    content
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// First underscore-delimited segment of a file name
fn object_segment(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

/// Tags for a clicked object: the inherited tags of the first folder, in
/// depth-first order, holding a file with the same object segment.
pub fn find_tags_for_file(file_name: &str, folder: &FolderNode) -> Vec<String> {
    find_folder_for_file(file_name, folder)
        .map(|f| f.inherited_tags.clone())
        .unwrap_or_default()
}

/// Folder holding the first file sharing the clicked file's object segment
pub fn find_folder_for_file<'a>(file_name: &str, folder: &'a FolderNode) -> Option<&'a FolderNode> {
    let wanted = object_segment(file_name);
    if folder.files.iter().any(|f| object_segment(&f.name) == wanted) {
        return Some(folder);
    }
    folder
        .children
        .iter()
        .find_map(|child| find_folder_for_file(file_name, child))
}
