//! Session error types.

use statmirror_core::types::UnitId;
use thiserror::Error;

/// Errors surfaced by the polling owner.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A mirror operation failed.
    #[error(transparent)]
    Mirror(#[from] statmirror_core::MirrorError),

    /// Writing an export failed.
    #[error(transparent)]
    Export(#[from] statmirror_export::ExportError),

    /// The session configuration is invalid.
    #[error("Session configuration error: {0}")]
    Config(String),

    /// Reading a configuration file failed.
    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A global tracing subscriber was already installed.
    #[error("Tracing setup failed: {0}")]
    Telemetry(String),

    /// No tracked player has this id, or it could not be read.
    #[error("Player {0} is not available")]
    PlayerUnavailable(UnitId),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SessionError>;
