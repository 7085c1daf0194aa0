// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for packlens

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Pack layout conventions
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Where the naming convention and pack documentation live
    #[serde(default)]
    pub docs: DocsConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,

    /// Rename history settings
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Reserved file and folder names of a pack
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LayoutConfig {
    #[serde(default = "default_tags_file")]
    pub tags_file: String,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
    #[serde(default = "default_preview_folder")]
    pub preview_folder: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DocsConfig {
    #[serde(default = "default_naming_url")]
    pub naming_url: String,
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
    #[serde(default = "default_preview_url")]
    pub preview_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Re-walk the pack when files change
    #[serde(default)]
    pub watch: bool,
    /// Milliseconds between a change and the re-walk it triggers
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
}

// Default value functions
fn default_tags_file() -> String { "TAGS.md".to_string() }
fn default_metadata_file() -> String { "pack.json".to_string() }
fn default_preview_folder() -> String { "previewImages".to_string() }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_debounce_ms() -> u64 { 500 }
fn default_history_path() -> String { "packlens_history.jsonl".to_string() }

const STORE_DOCS: &str =
    "https://wiki.gdevelop.io/gdevelop5/community/contribute-to-the-assets-store/";

fn default_naming_url() -> String { format!("{}#naming-assets", STORE_DOCS) }
fn default_metadata_url() -> String { format!("{}#the-title-description-and-price", STORE_DOCS) }
fn default_preview_url() -> String { format!("{}#add-a-thumbnail-and-images-previews", STORE_DOCS) }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            docs: DocsConfig::default(),
            web: WebConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tags_file: default_tags_file(),
            metadata_file: default_metadata_file(),
            preview_folder: default_preview_folder(),
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            naming_url: default_naming_url(),
            metadata_url: default_metadata_url(),
            preview_url: default_preview_url(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            watch: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::PackLensError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject layouts the walker cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        let layout = &self.layout;
        for (label, value) in [
            ("tags_file", &layout.tags_file),
            ("metadata_file", &layout.metadata_file),
            ("preview_folder", &layout.preview_folder),
        ] {
            if value.trim().is_empty() {
                return Err(crate::PackLensError::Config(format!("layout.{} must not be empty", label)));
            }
            if value.contains(['/', '\\']) {
                return Err(crate::PackLensError::Config(format!(
                    "layout.{} must be a plain name, got '{}'",
                    label, value
                )));
            }
        }
        if layout.tags_file.eq_ignore_ascii_case(&layout.metadata_file) {
            return Err(crate::PackLensError::Config(
                "layout.tags_file and layout.metadata_file must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.layout.tags_file, "TAGS.md");
        assert_eq!(config.layout.metadata_file, "pack.json");
        assert_eq!(config.layout.preview_folder, "previewImages");
        assert!(config.docs.naming_url.ends_with("#naming-assets"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("packlens.json");
        std::fs::write(&path, r#"{ "layout": { "tags_file": "tags.txt" } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.layout.tags_file, "tags.txt");
        assert_eq!(config.layout.metadata_file, "pack.json");
        assert_eq!(config.history.path, "packlens_history.jsonl");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("packlens.json");
        let mut config = AppConfig::default();
        config.web.port = 9000;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.web.port, 9000);
    }

    #[test]
    fn test_validate_rejects_paths() {
        let mut config = AppConfig::default();
        config.layout.preview_folder = "a/b".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.layout.metadata_file = "tags.md".to_string();
        assert!(config.validate().is_err());
    }
}
