//! Export error types.

use thiserror::Error;

/// Errors that can occur while building or writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing an output file failed.
    #[error("Export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON document could not be produced or parsed.
    #[error("Export JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The HTML template is unusable.
    #[error("Export template error: {0}")]
    Template(String),

    /// The player has no name to derive file names from.
    #[error("Cannot export for a player without a usable name: {0:?}")]
    InvalidPlayerName(String),

    /// Classification or another mirror operation failed.
    #[error(transparent)]
    Mirror(#[from] statmirror_core::MirrorError),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ExportError>;
