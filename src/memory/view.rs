//! Captured byte buffer acting as a local, addressable mini-memory

use super::source::MemoryRead;
use crate::core::types::{Addr, MemSize, MemoryError, MemoryResult};

/// A byte buffer captured from a foreign address space, tagged with the
/// absolute address it was read from.
///
/// The view owns its bytes outright, so it stays valid after the process
/// that produced it is closed. It exposes the full [`MemoryRead`] surface at
/// absolute addresses range-checked against the captured window, plus a
/// parallel `off_*` surface addressed relative to the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetView {
    base: Addr,
    data: Vec<u8>,
}

impl OffsetView {
    /// Wraps captured bytes with the absolute address they came from
    pub fn new(base: Addr, data: Vec<u8>) -> Self {
        OffsetView { base, data }
    }

    /// The absolute address of the first byte
    pub fn base(&self) -> Addr {
        self.base
    }

    /// The captured bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Window length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the window holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn out_of_view(&self, addr: Addr) -> MemoryError {
        MemoryError::OutOfView {
            addr,
            base: self.base,
            len: self.data.len(),
        }
    }

    /// Translates an absolute range into a window slice
    fn window(&self, addr: Addr, size: MemSize) -> MemoryResult<&[u8]> {
        let offset = addr
            .offset_from(self.base)
            .ok_or_else(|| self.out_of_view(addr))?
            .as_usize();
        let end = offset
            .checked_add(size.as_usize())
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.out_of_view(addr))?;
        Ok(&self.data[offset..end])
    }

    pub fn off_u8(&self, offset: MemSize) -> MemoryResult<u8> {
        self.read_u8(self.base + offset)
    }

    pub fn off_u16(&self, offset: MemSize) -> MemoryResult<u16> {
        self.read_u16(self.base + offset)
    }

    pub fn off_u32(&self, offset: MemSize) -> MemoryResult<u32> {
        self.read_u32(self.base + offset)
    }

    pub fn off_u64(&self, offset: MemSize) -> MemoryResult<u64> {
        self.read_u64(self.base + offset)
    }

    pub fn off_i8(&self, offset: MemSize) -> MemoryResult<i8> {
        self.read_i8(self.base + offset)
    }

    pub fn off_i16(&self, offset: MemSize) -> MemoryResult<i16> {
        self.read_i16(self.base + offset)
    }

    pub fn off_i32(&self, offset: MemSize) -> MemoryResult<i32> {
        self.read_i32(self.base + offset)
    }

    pub fn off_i64(&self, offset: MemSize) -> MemoryResult<i64> {
        self.read_i64(self.base + offset)
    }

    pub fn off_f32(&self, offset: MemSize) -> MemoryResult<f32> {
        self.read_f32(self.base + offset)
    }

    pub fn off_f64(&self, offset: MemSize) -> MemoryResult<f64> {
        self.read_f64(self.base + offset)
    }

    pub fn off_nts(&self, offset: MemSize, max: MemSize) -> MemoryResult<String> {
        self.read_nts(self.base + offset, max)
    }

    pub fn off_ptr(&self, offset: MemSize) -> MemoryResult<Addr> {
        self.read_ptr(self.base + offset)
    }

    pub fn off_ptr_or_zero(&self, offset: MemSize) -> Addr {
        self.read_ptr_or_zero(self.base + offset)
    }

    /// Carves a subview out of the window.
    ///
    /// The subview copies its bytes and keeps absolute addressing: its base
    /// is `self.base + offset`, so outliving this view never yields stale
    /// data.
    pub fn off_blob(&self, offset: MemSize, size: MemSize) -> MemoryResult<OffsetView> {
        self.read_blob(self.base + offset, size)
    }
}

impl MemoryRead for OffsetView {
    fn read_bytes(&self, addr: Addr, size: MemSize) -> MemoryResult<Vec<u8>> {
        Ok(self.window(addr, size)?.to_vec())
    }

    fn is_valid_address(&self, addr: Addr) -> bool {
        self.base <= addr && addr < self.base + MemSize::from(self.data.len())
    }
}
