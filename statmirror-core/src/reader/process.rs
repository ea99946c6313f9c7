use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::trace;

use super::RemoteReader;
use crate::error::Result;
use crate::metrics::MirrorCounters;
use crate::types::RemoteAddress;

/// The raw read primitive for one attached process.
///
/// Implementations wrap whatever the platform offers (a process handle, a
/// `/proc/<pid>/mem` file, a core dump). `open` and `close` bracket every
/// logical refresh; they are always called in pairs.
pub trait MemorySource: Send + Sync {
    /// Acquire whatever the source needs to serve reads.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MirrorError::ProcessUnavailable`] if the process is gone.
    fn open(&self) -> Result<()>;

    /// Fill `buf` with the bytes at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MirrorError::RemoteRead`] if any byte is unreadable.
    fn read_into(&self, address: RemoteAddress, buf: &mut [u8]) -> Result<()>;

    /// Release what `open` acquired.
    fn close(&self);
}

/// Shared handle to an attached process.
#[derive(Clone)]
pub struct Process {
    source: Arc<dyn MemorySource>,
    counters: Arc<MirrorCounters>,
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("counters", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

impl Process {
    /// Wrap a memory source with fresh counters.
    #[must_use]
    pub fn new(source: Arc<dyn MemorySource>) -> Self {
        Self::with_counters(source, Arc::new(MirrorCounters::new()))
    }

    /// Wrap a memory source, reporting into existing counters.
    #[must_use]
    pub fn with_counters(source: Arc<dyn MemorySource>, counters: Arc<MirrorCounters>) -> Self {
        Self { source, counters }
    }

    /// Acquire a scoped read context.
    ///
    /// The source is closed when the returned guard drops.
    ///
    /// # Errors
    ///
    /// Propagates the source's `open` failure; nothing is left acquired.
    pub fn context(&self) -> Result<ProcessContext<'_>> {
        self.source.open()?;
        self.counters.contexts_opened.fetch_add(1, Ordering::Relaxed);
        trace!("process context acquired");
        Ok(ProcessContext { process: self })
    }

    /// Counters shared by every entity reading through this process.
    #[must_use]
    pub fn counters(&self) -> &Arc<MirrorCounters> {
        &self.counters
    }
}

/// Scoped read capability. Closes the underlying source on drop.
pub struct ProcessContext<'a> {
    process: &'a Process,
}

impl fmt::Debug for ProcessContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext").finish_non_exhaustive()
    }
}

impl RemoteReader for ProcessContext<'_> {
    fn read_bytes(&self, address: RemoteAddress, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0_u8; len];
        self.process.source.read_into(address, &mut buf)?;
        self.process
            .counters
            .bytes_read
            .fetch_add(len as u64, Ordering::Relaxed);
        Ok(buf)
    }
}

impl Drop for ProcessContext<'_> {
    fn drop(&mut self) {
        self.process.source.close();
        self.process
            .counters
            .contexts_released
            .fetch_add(1, Ordering::Relaxed);
        trace!("process context released");
    }
}
