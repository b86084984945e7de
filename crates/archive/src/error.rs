//! Error types for scene archives and selection.

use thiserror::Error;

/// Errors produced while searching or loading scenes.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("no image available for {window}")]
    NoImageAvailable { window: String },

    #[error("scene '{0}' not found in archive")]
    SceneNotFound(String),

    #[error("scene '{scene}' has no asset for band {band}")]
    MissingAsset { scene: String, band: String },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid catalog: {0}")]
    Catalog(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] minescope_core::Error),
}

/// Result alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
