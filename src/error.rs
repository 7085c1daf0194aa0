// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for packlens

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for packlens operations
pub type Result<T> = std::result::Result<T, PackLensError>;

/// packlens error types
#[derive(Error, Debug)]
pub enum PackLensError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed pack metadata: {0}")]
    MalformedMetadata(String),

    #[error("Invalid file name '{name}': {reason}")]
    InvalidFileName { name: String, reason: String },

    #[error("'{}' already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Walk {generation} was superseded by a newer walk")]
    Superseded { generation: u64 },

    #[error("Server error: {0}")]
    Server(String),
}

impl PackLensError {
    /// Attach a path to an I/O error, keeping the kinds callers react to.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::FileSystem(source),
        }
    }

    /// Whether this error means a newer walk took over.
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds() {
        let err = PackLensError::io(
            "/pack/pack.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, PackLensError::PermissionDenied { .. }));

        let err = PackLensError::io(
            "/pack/missing.png",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, PackLensError::NotFound { .. }));

        let err = PackLensError::io(
            "/pack/odd.png",
            std::io::Error::new(std::io::ErrorKind::Other, "odd"),
        );
        assert!(matches!(err, PackLensError::FileSystem(_)));
    }

    #[test]
    fn test_superseded() {
        assert!(PackLensError::Superseded { generation: 3 }.is_superseded());
        assert!(!PackLensError::Config("x".into()).is_superseded());
    }
}
