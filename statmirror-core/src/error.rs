//! Error types for the statmirror core library.

use thiserror::Error;

use crate::types::{RemoteAddress, UnitId};

/// Top-level error type for all mirror operations.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// A read from the remote process failed (bad address, unmapped page, short read).
    #[error("Remote read failed at {address} ({len} bytes): {reason}")]
    RemoteRead {
        /// Address the read started at.
        address: RemoteAddress,
        /// Number of bytes requested.
        len: usize,
        /// Backend-specific failure description.
        reason: String,
    },

    /// The remote process is gone or could not be opened.
    #[error("Process unavailable: {0}")]
    ProcessUnavailable(String),

    /// The structure at an entity's address now belongs to a different unit.
    #[error("Unit identity mismatch: expected {expected}, found {found}")]
    IdentityMismatch {
        /// Unit id the entity was created for.
        expected: UnitId,
        /// Unit id found at the address.
        found: UnitId,
    },

    /// An item matched more than one mutually exclusive bucket.
    #[error("Item {unit_id} matches several buckets: {buckets:?}")]
    ClassificationConflict {
        /// The offending item.
        unit_id: UnitId,
        /// Every bucket whose predicate accepted the item.
        buckets: Vec<&'static str>,
    },

    /// Remote or static data did not have the expected shape.
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError {
    /// Whether this error describes a transient remote condition that the
    /// next polling tick may not see again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RemoteRead { .. }
                | Self::ProcessUnavailable(_)
                | Self::IdentityMismatch { .. }
                | Self::DataFormat(_)
        )
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, MirrorError>;
