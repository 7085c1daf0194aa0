// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! packlens: asset pack inspector and editor
//!
//! Walks a sprite pack folder, groups image files into objects by their names,
//! carries folder tags down the tree and reports what breaks the pack
//! conventions. The pack metadata and file names can be edited in place, from
//! the command line or the web dashboard.

pub mod config;
pub mod error;
pub mod history;
pub mod pack;
pub mod source;
pub mod watcher;
pub mod web;

pub use config::AppConfig;
pub use error::{PackLensError, Result};
