//! Runtime counters and span names.
//!
//! Every mirror subsystem emits `tracing` spans; this module adds cheap
//! counters that can be read at any time and exported as Prometheus text.
//! All counters are lock-free `AtomicU64`s incremented on the polling path.

use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Counters (lock-free)
// ---------------------------------------------------------------------------

/// Atomic counters for mirror activity.
#[derive(Debug)]
pub struct MirrorCounters {
    /// `update()` calls.
    pub updates_attempted: AtomicU64,
    /// `update()` calls answered from the cache without reading.
    pub updates_skipped: AtomicU64,
    /// Refreshes that published a new snapshot.
    pub updates_succeeded: AtomicU64,
    /// Refreshes that failed and kept the previous snapshot.
    pub updates_failed: AtomicU64,
    /// Scoped read contexts acquired.
    pub contexts_opened: AtomicU64,
    /// Scoped read contexts released.
    pub contexts_released: AtomicU64,
    /// Bytes copied out of the remote process.
    pub bytes_read: AtomicU64,
    /// Items found in more than one bucket.
    pub classification_faults: AtomicU64,
    /// Export documents written.
    pub exports_written: AtomicU64,
}

impl MirrorCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            updates_attempted: AtomicU64::new(0),
            updates_skipped: AtomicU64::new(0),
            updates_succeeded: AtomicU64::new(0),
            updates_failed: AtomicU64::new(0),
            contexts_opened: AtomicU64::new(0),
            contexts_released: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            classification_faults: AtomicU64::new(0),
            exports_written: AtomicU64::new(0),
        }
    }

    /// Read every counter.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            updates_attempted: self.updates_attempted.load(Ordering::Relaxed),
            updates_skipped: self.updates_skipped.load(Ordering::Relaxed),
            updates_succeeded: self.updates_succeeded.load(Ordering::Relaxed),
            updates_failed: self.updates_failed.load(Ordering::Relaxed),
            contexts_opened: self.contexts_opened.load(Ordering::Relaxed),
            contexts_released: self.contexts_released.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            classification_faults: self.classification_faults.load(Ordering::Relaxed),
            exports_written: self.exports_written.load(Ordering::Relaxed),
        }
    }
}

impl Default for MirrorCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// `update()` calls.
    pub updates_attempted: u64,
    /// Cache hits.
    pub updates_skipped: u64,
    /// Published snapshots.
    pub updates_succeeded: u64,
    /// Failed refreshes.
    pub updates_failed: u64,
    /// Contexts acquired.
    pub contexts_opened: u64,
    /// Contexts released.
    pub contexts_released: u64,
    /// Bytes read.
    pub bytes_read: u64,
    /// Classification conflicts.
    pub classification_faults: u64,
    /// Export documents written.
    pub exports_written: u64,
}

impl CounterSnapshot {
    /// Contexts currently held (acquired but not yet released).
    #[must_use]
    pub fn contexts_outstanding(&self) -> u64 {
        self.contexts_opened.saturating_sub(self.contexts_released)
    }

    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP statmirror_updates_total Entity update calls by outcome\n\
             # TYPE statmirror_updates_total counter\n\
             statmirror_updates_total{{outcome=\"attempted\"}} {}\n\
             statmirror_updates_total{{outcome=\"cached\"}} {}\n\
             statmirror_updates_total{{outcome=\"succeeded\"}} {}\n\
             statmirror_updates_total{{outcome=\"failed\"}} {}\n\
             # HELP statmirror_contexts_total Scoped read contexts\n\
             # TYPE statmirror_contexts_total counter\n\
             statmirror_contexts_total{{event=\"opened\"}} {}\n\
             statmirror_contexts_total{{event=\"released\"}} {}\n\
             # HELP statmirror_bytes_read_total Bytes read from the remote process\n\
             # TYPE statmirror_bytes_read_total counter\n\
             statmirror_bytes_read_total {}\n\
             # HELP statmirror_classification_faults_total Items matching several buckets\n\
             # TYPE statmirror_classification_faults_total counter\n\
             statmirror_classification_faults_total {}\n\
             # HELP statmirror_exports_written_total Export documents written\n\
             # TYPE statmirror_exports_written_total counter\n\
             statmirror_exports_written_total {}\n",
            self.updates_attempted,
            self.updates_skipped,
            self.updates_succeeded,
            self.updates_failed,
            self.contexts_opened,
            self.contexts_released,
            self.bytes_read,
            self.classification_faults,
            self.exports_written,
        )
    }
}

// ---------------------------------------------------------------------------
// Tracing span names
// ---------------------------------------------------------------------------

/// Span names used across the workspace.
pub mod spans {
    /// One refresh of one entity.
    pub const ENTITY_UPDATE: &str = "statmirror::entity::update";
    /// Item classification pass.
    pub const CLASSIFY: &str = "statmirror::classify";
    /// One polling tick.
    pub const SESSION_TICK: &str = "statmirror::session::tick";
    /// Inventory export.
    pub const EXPORT: &str = "statmirror::export";
    /// Static table load.
    pub const TABLES_LOAD: &str = "statmirror::tables::load";
}
