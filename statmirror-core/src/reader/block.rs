use crate::error::{MirrorError, Result};
use crate::types::RemoteAddress;

/// A structure copied out of the remote process in a single read.
///
/// Decoding fields from one block keeps them mutually consistent: they all
/// come from the same instant of the remote image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBlock {
    base: RemoteAddress,
    bytes: Vec<u8>,
}

impl RemoteBlock {
    /// Wrap bytes read at `base`.
    #[must_use]
    pub fn new(base: RemoteAddress, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    /// Address the block was read from.
    #[must_use]
    pub fn base(&self) -> RemoteAddress {
        self.base
    }

    /// Raw bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn field<const N: usize>(&self, offset: u64) -> Result<[u8; N]> {
        let start = usize::try_from(offset).ok();
        start
            .and_then(|start| self.bytes.get(start..start.checked_add(N)?))
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| {
                MirrorError::DataFormat(format!(
                    "field at +{offset:#x} ({N} bytes) outside {}-byte block at {}",
                    self.bytes.len(),
                    self.base
                ))
            })
    }

    /// Byte at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] if the field lies outside the block.
    pub fn u8_at(&self, offset: u64) -> Result<u8> {
        self.field::<1>(offset).map(|b| b[0])
    }

    /// Little-endian `u16` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] if the field lies outside the block.
    pub fn u16_at(&self, offset: u64) -> Result<u16> {
        self.field(offset).map(u16::from_le_bytes)
    }

    /// Little-endian `u32` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] if the field lies outside the block.
    pub fn u32_at(&self, offset: u64) -> Result<u32> {
        self.field(offset).map(u32::from_le_bytes)
    }

    /// Little-endian `u64` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] if the field lies outside the block.
    pub fn u64_at(&self, offset: u64) -> Result<u64> {
        self.field(offset).map(u64::from_le_bytes)
    }

    /// Pointer at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] if the field lies outside the block.
    pub fn ptr_at(&self, offset: u64) -> Result<RemoteAddress> {
        self.u64_at(offset).map(RemoteAddress)
    }

    /// `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::DataFormat`] if the range lies outside the block.
    pub fn slice_at(&self, offset: u64, len: usize) -> Result<&[u8]> {
        usize::try_from(offset)
            .ok()
            .and_then(|start| self.bytes.get(start..start.checked_add(len)?))
            .ok_or_else(|| {
                MirrorError::DataFormat(format!(
                    "range +{offset:#x}..+{len} outside block at {}",
                    self.base
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_fields() {
        let mut bytes = vec![0_u8; 16];
        bytes[0..4].copy_from_slice(&0xdead_beef_u32.to_le_bytes());
        bytes[8..16].copy_from_slice(&0x1234_u64.to_le_bytes());
        let block = RemoteBlock::new(RemoteAddress(0x100), bytes);

        assert_eq!(block.u32_at(0).expect("u32"), 0xdead_beef);
        assert_eq!(block.u16_at(0).expect("u16"), 0xbeef);
        assert_eq!(block.ptr_at(8).expect("ptr"), RemoteAddress(0x1234));
    }

    #[test]
    fn out_of_range_fields_error() {
        let block = RemoteBlock::new(RemoteAddress(0x100), vec![0; 4]);
        assert!(block.u64_at(0).is_err());
        assert!(block.u8_at(4).is_err());
        assert!(block.slice_at(2, 3).is_err());
        assert!(block.u32_at(u64::MAX).is_err());
    }
}
