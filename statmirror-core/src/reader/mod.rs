//! Remote memory access.
//!
//! The OS-level read primitive lives behind [`MemorySource`]. Everything in
//! the mirror reads through a [`ProcessContext`], a scoped guard acquired
//! from a [`Process`] for one logical refresh and released on drop, whatever
//! path the refresh leaves by.

mod block;
mod process;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use block::RemoteBlock;
pub use process::{MemorySource, Process, ProcessContext};

use bytemuck::Pod;

use crate::error::{MirrorError, Result};
use crate::types::RemoteAddress;

/// Upper bound on a single array read, in elements.
pub const MAX_ARRAY_LEN: usize = 0x1_0000;

/// Typed reads from the remote process.
pub trait RemoteReader {
    /// Read `len` bytes starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::RemoteRead`] or
    /// [`MirrorError::ProcessUnavailable`] if the bytes cannot be read.
    fn read_bytes(&self, address: RemoteAddress, len: usize) -> Result<Vec<u8>>;

    /// Read one plain-old-data value.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    fn read<T: Pod>(&self, address: RemoteAddress) -> Result<T> {
        let bytes = self.read_bytes(address, std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    /// Read `count` consecutive values.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] if `count` exceeds
    /// [`MAX_ARRAY_LEN`] (a torn count field), otherwise propagates read
    /// failures.
    fn read_array<T: Pod>(&self, address: RemoteAddress, count: usize) -> Result<Vec<T>> {
        if count > MAX_ARRAY_LEN {
            return Err(MirrorError::DataFormat(format!(
                "refusing to read {count} elements at {address}"
            )));
        }
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(address, size * count)?;
        Ok(bytes
            .chunks_exact(size)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// Read a pointer-sized value.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    fn read_ptr(&self, address: RemoteAddress) -> Result<RemoteAddress> {
        self.read::<u64>(address).map(RemoteAddress)
    }

    /// Read a contiguous structure once and decode its fields locally.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    fn read_block(&self, address: RemoteAddress, len: usize) -> Result<RemoteBlock> {
        Ok(RemoteBlock::new(address, self.read_bytes(address, len)?))
    }
}
