//! Error types for the dashboard layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown site '{0}'")]
    UnknownSite(String),

    #[error("no series slot labelled '{0}'")]
    NoSuchSlot(String),

    #[error("slot '{label}' is unavailable: {reason}")]
    SlotUnavailable { label: String, reason: String },

    #[error("histogram needs at least one bin")]
    ZeroBins,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] minescope_core::Error),

    #[error(transparent)]
    Archive(#[from] minescope_archive::ArchiveError),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
