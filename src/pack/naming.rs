// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Sprite file naming convention
//!
//! Image files are grouped into objects by name:
//!
//! - `9patch_<object>_...` and `tiled_<object>_...` are panel and tiled sprites
//!   keyed by the segment after the marker
//! - `<object>.png` is a static sprite
//! - `<object>_<animation>.png` is an object with one animation
//! - `<object>_<animation>_<frame>.png` is an object with several animations
//!
//! Anything with more underscores breaks the convention.

use serde::{Deserialize, Serialize};
use std::fmt;

const NINE_PATCH_MARKER: &str = "9patch_";
const TILED_MARKER: &str = "tiled_";
const PREVIEW_INFIX: &str = ".preview.";

/// Why a name breaks the convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum NamingViolation {
    TooManyUnderscores { count: usize },
    MissingObjectName,
}

impl fmt::Display for NamingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyUnderscores { count } => {
                write!(f, "there are {} underscores in the name, at most two are allowed", count)
            }
            Self::MissingObjectName => write!(f, "the object name before the underscore is empty"),
        }
    }
}

/// Result of classifying one image file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    NinePatch { key: String },
    Tiled { key: String },
    StaticObject { key: String },
    AnimatedSingle { key: String },
    AnimatedMultiple { key: String },
    /// Derived preview render, ignored entirely
    PreviewArtifact,
    Invalid(NamingViolation),
}

impl Classification {
    /// Object group this file belongs to, if it is grouped at all
    pub fn group_key(&self) -> Option<&str> {
        match self {
            Self::NinePatch { key }
            | Self::Tiled { key }
            | Self::StaticObject { key }
            | Self::AnimatedSingle { key }
            | Self::AnimatedMultiple { key } => Some(key),
            Self::PreviewArtifact | Self::Invalid(_) => None,
        }
    }

    /// Counting label, `None` for files that are not counted
    pub fn object_kind(&self) -> Option<ObjectKind> {
        match self {
            Self::NinePatch { .. } => Some(ObjectKind::NinePatch),
            Self::Tiled { .. } => Some(ObjectKind::Tiled),
            Self::StaticObject { .. } => Some(ObjectKind::StaticObject),
            Self::AnimatedSingle { .. } => Some(ObjectKind::AnimatedSingle),
            Self::AnimatedMultiple { .. } => Some(ObjectKind::AnimatedMultiple),
            Self::Invalid(_) => Some(ObjectKind::WrongNamingConvention),
            Self::PreviewArtifact => None,
        }
    }
}

/// Classify an image file name
pub fn classify(filename: &str) -> Classification {
    if let Some(rest) = strip_marker(filename, NINE_PATCH_MARKER) {
        return marker_key(rest)
            .map(|key| Classification::NinePatch { key })
            .unwrap_or(Classification::Invalid(NamingViolation::MissingObjectName));
    }
    if let Some(rest) = strip_marker(filename, TILED_MARKER) {
        return marker_key(rest)
            .map(|key| Classification::Tiled { key })
            .unwrap_or(Classification::Invalid(NamingViolation::MissingObjectName));
    }

    match underscore_count(filename) {
        0 => {
            if is_preview_artifact(filename) {
                return Classification::PreviewArtifact;
            }
            Classification::StaticObject {
                key: strip_extension(filename).to_string(),
            }
        }
        count @ (1 | 2) => {
            let key = filename.split('_').next().unwrap_or_default();
            if key.is_empty() {
                return Classification::Invalid(NamingViolation::MissingObjectName);
            }
            let key = key.to_string();
            if count == 1 {
                Classification::AnimatedSingle { key }
            } else {
                Classification::AnimatedMultiple { key }
            }
        }
        count => Classification::Invalid(NamingViolation::TooManyUnderscores { count }),
    }
}

fn strip_marker<'a>(filename: &'a str, marker: &str) -> Option<&'a str> {
    let head = filename.get(..marker.len())?;
    head.eq_ignore_ascii_case(marker).then(|| &filename[marker.len()..])
}

/// Segment following a marker; the extension goes when it is the last segment
fn marker_key(rest: &str) -> Option<String> {
    let key = match rest.split_once('_') {
        Some((segment, _)) => segment,
        None => strip_extension(rest),
    };
    (!key.is_empty()).then(|| key.to_string())
}

pub fn underscore_count(name: &str) -> usize {
    name.matches('_').count()
}

/// `.preview.` renders sitting next to the real sprite
pub fn is_preview_artifact(name: &str) -> bool {
    name.to_lowercase().contains(PREVIEW_INFIX)
}

/// Whitespace directly before or after an underscore
pub fn has_spaces_around_underscore(name: &str) -> bool {
    let chars: Vec<char> = name.chars().collect();
    chars.windows(2).any(|pair| {
        (pair[0].is_whitespace() && pair[1] == '_') || (pair[0] == '_' && pair[1].is_whitespace())
    })
}

/// File name without its last extension
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Object kind labels used in the pack summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    NinePatch,
    Tiled,
    StaticObject,
    AnimatedSingle,
    AnimatedMultiple,
    Sound,
    OtherUnknown,
    WrongNamingConvention,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 8] = [
        ObjectKind::NinePatch,
        ObjectKind::Tiled,
        ObjectKind::StaticObject,
        ObjectKind::AnimatedSingle,
        ObjectKind::AnimatedMultiple,
        ObjectKind::Sound,
        ObjectKind::OtherUnknown,
        ObjectKind::WrongNamingConvention,
    ];

    /// Human label for summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::NinePatch => "Panel sprites",
            Self::Tiled => "Tiled sprites",
            Self::StaticObject => "Static sprites",
            Self::AnimatedSingle => "Objects with only one animation",
            Self::AnimatedMultiple => "Objects with multiple animations",
            Self::Sound => "Audios",
            Self::OtherUnknown => "Other files",
            Self::WrongNamingConvention => "Files with the wrong naming convention",
        }
    }
}

/// Per-kind file counts of one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCounts {
    pub nine_patch: usize,
    pub tiled: usize,
    pub static_object: usize,
    pub animated_single: usize,
    pub animated_multiple: usize,
    pub sound: usize,
    pub other_unknown: usize,
    pub wrong_naming_convention: usize,
}

impl ObjectCounts {
    pub fn get(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::NinePatch => self.nine_patch,
            ObjectKind::Tiled => self.tiled,
            ObjectKind::StaticObject => self.static_object,
            ObjectKind::AnimatedSingle => self.animated_single,
            ObjectKind::AnimatedMultiple => self.animated_multiple,
            ObjectKind::Sound => self.sound,
            ObjectKind::OtherUnknown => self.other_unknown,
            ObjectKind::WrongNamingConvention => self.wrong_naming_convention,
        }
    }

    fn slot(&mut self, kind: ObjectKind) -> &mut usize {
        match kind {
            ObjectKind::NinePatch => &mut self.nine_patch,
            ObjectKind::Tiled => &mut self.tiled,
            ObjectKind::StaticObject => &mut self.static_object,
            ObjectKind::AnimatedSingle => &mut self.animated_single,
            ObjectKind::AnimatedMultiple => &mut self.animated_multiple,
            ObjectKind::Sound => &mut self.sound,
            ObjectKind::OtherUnknown => &mut self.other_unknown,
            ObjectKind::WrongNamingConvention => &mut self.wrong_naming_convention,
        }
    }

    /// Animated objects regardless of animation count
    pub fn animated(&self) -> usize {
        self.animated_single + self.animated_multiple
    }

    pub fn total(&self) -> usize {
        ObjectKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

impl Extend<ObjectKind> for ObjectCounts {
    fn extend<I: IntoIterator<Item = ObjectKind>>(&mut self, iter: I) {
        for kind in iter {
            *self.slot(kind) += 1;
        }
    }
}

impl FromIterator<ObjectKind> for ObjectCounts {
    fn from_iter<I: IntoIterator<Item = ObjectKind>>(iter: I) -> Self {
        let mut counts = Self::default();
        counts.extend(iter);
        counts
    }
}
