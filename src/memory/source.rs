//! Byte-source abstraction and the derived typed read surface
//!
//! Backends implement only [`MemoryRead::read_bytes`] and
//! [`MemoryRead::is_valid_address`]. Everything else (fixed-width
//! primitives, strings, pointers, blobs, pointer chains) is derived on
//! top, so the live process, the snapshot and a captured [`OffsetView`] all
//! expose the identical surface.

use super::view::OffsetView;
use crate::core::types::{Addr, MemSize, MemoryError, MemoryResult};
use tracing::debug;

/// Pointers above this value are outside the canonical userland half and
/// are collapsed to null by [`MemoryRead::read_ptr_or_zero`].
const CANONICAL_PTR_CEILING: u64 = 0x7FFF_FFFF_FFFF;

/// Outcome of one entry of a grouped [`MemoryRead::read_blobs`] call
#[derive(Debug)]
pub struct BlobReadResult {
    pub addr: Addr,
    pub result: MemoryResult<OffsetView>,
}

fn take_array<const N: usize>(bytes: &[u8]) -> MemoryResult<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(MemoryError::Partial {
            read: bytes.len(),
            requested: N,
        })
}

/// Uniform read capability over some foreign byte source.
///
/// All multi-byte values are little-endian; floats are IEEE-754
/// little-endian.
pub trait MemoryRead {
    /// Reads exactly `size` bytes starting at `addr`.
    ///
    /// A short read never succeeds silently: implementations surface
    /// `Partial` with the byte count actually transferred.
    fn read_bytes(&self, addr: Addr, size: MemSize) -> MemoryResult<Vec<u8>>;

    /// Checks `addr` against this source's validity model (memory map plus
    /// guard windows for processes, captured window for views)
    fn is_valid_address(&self, addr: Addr) -> bool;

    fn read_u8(&self, addr: Addr) -> MemoryResult<u8> {
        let bytes = self.read_bytes(addr, MemSize::new(1))?;
        Ok(take_array::<1>(&bytes)?[0])
    }

    fn read_u16(&self, addr: Addr) -> MemoryResult<u16> {
        let bytes = self.read_bytes(addr, MemSize::new(2))?;
        Ok(u16::from_le_bytes(take_array(&bytes)?))
    }

    fn read_u32(&self, addr: Addr) -> MemoryResult<u32> {
        let bytes = self.read_bytes(addr, MemSize::new(4))?;
        Ok(u32::from_le_bytes(take_array(&bytes)?))
    }

    fn read_u64(&self, addr: Addr) -> MemoryResult<u64> {
        let bytes = self.read_bytes(addr, MemSize::new(8))?;
        Ok(u64::from_le_bytes(take_array(&bytes)?))
    }

    fn read_i8(&self, addr: Addr) -> MemoryResult<i8> {
        Ok(self.read_u8(addr)? as i8)
    }

    fn read_i16(&self, addr: Addr) -> MemoryResult<i16> {
        Ok(self.read_u16(addr)? as i16)
    }

    fn read_i32(&self, addr: Addr) -> MemoryResult<i32> {
        Ok(self.read_u32(addr)? as i32)
    }

    fn read_i64(&self, addr: Addr) -> MemoryResult<i64> {
        Ok(self.read_u64(addr)? as i64)
    }

    fn read_f32(&self, addr: Addr) -> MemoryResult<f32> {
        Ok(f32::from_bits(self.read_u32(addr)?))
    }

    fn read_f64(&self, addr: Addr) -> MemoryResult<f64> {
        Ok(f64::from_bits(self.read_u64(addr)?))
    }

    /// Reads a null-terminated string of at most `max` bytes.
    ///
    /// Returns the bytes up to the first `\0`; when no terminator occurs
    /// within `max` bytes, all of them are returned. Invalid UTF-8 is
    /// replaced, never an error.
    fn read_nts(&self, addr: Addr, max: MemSize) -> MemoryResult<String> {
        if max.is_zero() {
            return Ok(String::new());
        }
        let bytes = self.read_bytes(addr, max)?;
        let terminated = match bytes.iter().position(|&b| b == 0) {
            Some(end) => &bytes[..end],
            None => &bytes[..],
        };
        Ok(String::from_utf8_lossy(terminated).into_owned())
    }

    /// Reads a 64-bit little-endian pointer value
    fn read_ptr(&self, addr: Addr) -> MemoryResult<Addr> {
        Ok(Addr::new(self.read_u64(addr)?))
    }

    /// Reads a pointer, masking every failure to null.
    ///
    /// Read errors, a null source address and pointers outside the
    /// canonical userland range all collapse to `Addr::null()`.
    fn read_ptr_or_zero(&self, addr: Addr) -> Addr {
        if addr.is_null() || addr.as_u64() > CANONICAL_PTR_CEILING {
            return Addr::null();
        }
        self.read_ptr(addr).unwrap_or_default()
    }

    /// Captures `size` bytes starting at `addr` as an owned [`OffsetView`]
    fn read_blob(&self, addr: Addr, size: MemSize) -> MemoryResult<OffsetView> {
        let data = self.read_bytes(addr, size)?;
        if data.len() < size.as_usize() {
            return Err(MemoryError::partial(data.len(), size.as_usize()));
        }
        Ok(OffsetView::new(addr, data))
    }

    /// Reads `count` consecutive 64-bit pointers at `base` and keeps the
    /// ones that validate against this source
    fn read_pointers(&self, base: Addr, count: usize) -> MemoryResult<Vec<Addr>> {
        let view = self.read_blob(base, MemSize::from(count * 8))?;
        let mut results = Vec::new();
        for i in 0..count {
            let ptr = view.off_ptr_or_zero(MemSize::from(i * 8));
            if self.is_valid_address(ptr) {
                results.push(ptr);
            }
        }
        Ok(results)
    }

    /// Reads one blob of `size` bytes per input address.
    ///
    /// Results are returned in the caller's input order; each entry carries
    /// its own error so one unreadable address never poisons the batch.
    fn read_blobs(&self, addrs: &[Addr], size: MemSize) -> Vec<BlobReadResult> {
        addrs
            .iter()
            .map(|&addr| BlobReadResult {
                addr,
                result: self.read_blob(addr, size),
            })
            .collect()
    }

    /// Walks a pointer chain and reads the final blob.
    ///
    /// Every offset except the last is "add then dereference"; the last is
    /// a raw byte displacement into the final structure. With no offsets
    /// the blob is read directly at `base`.
    fn read_pointer_chain(
        &self,
        base: Addr,
        size: MemSize,
        offsets: &[MemSize],
    ) -> MemoryResult<OffsetView> {
        let Some((&last, hops)) = offsets.split_last() else {
            return self.read_blob(base, size);
        };

        let mut current = base;
        for (step, &off) in hops.iter().enumerate() {
            let slot = current
                .checked_add(off)
                .ok_or_else(|| MemoryError::invalid_in_chain(step, current))?;
            let ptr = self.read_ptr_or_zero(slot);
            if ptr.is_null() {
                return Err(MemoryError::NullInChain(step));
            }
            if !self.is_valid_address(ptr) {
                return Err(MemoryError::invalid_in_chain(step, ptr));
            }
            current = ptr;
        }

        let start = current
            .checked_add(last)
            .ok_or_else(|| MemoryError::invalid_in_chain(offsets.len() - 1, current))?;
        self.read_blob(start, size)
    }

    /// Same as [`MemoryRead::read_pointer_chain`] but emits a per-hop trace
    fn read_pointer_chain_traced(
        &self,
        base: Addr,
        size: MemSize,
        offsets: &[MemSize],
    ) -> MemoryResult<OffsetView> {
        let Some((&last, hops)) = offsets.split_last() else {
            debug!(%base, %size, "chain: direct read");
            return self.read_blob(base, size);
        };

        debug!(%base, "chain: start");
        let mut current = base;
        for (step, &off) in hops.iter().enumerate() {
            let slot = current
                .checked_add(off)
                .ok_or_else(|| MemoryError::invalid_in_chain(step, current))?;
            let ptr = self.read_ptr_or_zero(slot);
            debug!(step, at = %current, offset = off.as_u64(), target = %ptr, "chain: hop");
            if ptr.is_null() {
                return Err(MemoryError::NullInChain(step));
            }
            if !self.is_valid_address(ptr) {
                return Err(MemoryError::invalid_in_chain(step, ptr));
            }
            current = ptr;
        }

        let start = current
            .checked_add(last)
            .ok_or_else(|| MemoryError::invalid_in_chain(offsets.len() - 1, current))?;
        debug!(at = %current, offset = last.as_u64(), read_at = %start, %size, "chain: final read");
        self.read_blob(start, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal source over one contiguous buffer, used to exercise the
    /// provided methods in isolation.
    struct FlatSource {
        base: Addr,
        data: Vec<u8>,
    }

    impl MemoryRead for FlatSource {
        fn read_bytes(&self, addr: Addr, size: MemSize) -> MemoryResult<Vec<u8>> {
            let offset = addr
                .offset_from(self.base)
                .ok_or(MemoryError::AddressNotMapped(addr))?
                .as_usize();
            let end = offset
                .checked_add(size.as_usize())
                .filter(|&end| end <= self.data.len())
                .ok_or(MemoryError::AddressNotMapped(addr))?;
            Ok(self.data[offset..end].to_vec())
        }

        fn is_valid_address(&self, addr: Addr) -> bool {
            addr >= self.base && addr < self.base + MemSize::from(self.data.len())
        }
    }

    fn source() -> FlatSource {
        let mut data = vec![0u8; 128];
        data[0..8].copy_from_slice(&0xDEAD_BEEF_CAFE_BABEu64.to_le_bytes());
        data[8..12].copy_from_slice(&1234u32.to_le_bytes());
        data[12..16].copy_from_slice(&(-5i32).to_le_bytes());
        data[16..20].copy_from_slice(&1.5f32.to_le_bytes());
        data[24..32].copy_from_slice(&2.25f64.to_le_bytes());
        data[32..37].copy_from_slice(b"SEED\0");
        // pointer at 40 -> base + 0x10
        data[40..48].copy_from_slice(&0x1010u64.to_le_bytes());
        FlatSource {
            base: Addr::new(0x1000),
            data,
        }
    }

    #[test]
    fn test_primitive_reads() {
        let src = source();
        assert_eq!(src.read_u64(Addr::new(0x1000)).unwrap(), 0xDEAD_BEEF_CAFE_BABE);
        assert_eq!(src.read_u32(Addr::new(0x1008)).unwrap(), 1234);
        assert_eq!(src.read_i32(Addr::new(0x100c)).unwrap(), -5);
        assert_eq!(src.read_f32(Addr::new(0x1010)).unwrap(), 1.5);
        assert_eq!(src.read_f64(Addr::new(0x1018)).unwrap(), 2.25);
        assert_eq!(src.read_u8(Addr::new(0x1020)).unwrap(), b'S');
        assert_eq!(src.read_u16(Addr::new(0x1000)).unwrap(), 0xBABE);
    }

    #[test]
    fn test_read_nts() {
        let src = source();
        assert_eq!(src.read_nts(Addr::new(0x1020), MemSize::new(16)).unwrap(), "SEED");
        // no terminator within max: all bytes returned
        assert_eq!(src.read_nts(Addr::new(0x1020), MemSize::new(3)).unwrap(), "SEE");
        // first byte is the terminator
        assert_eq!(src.read_nts(Addr::new(0x1024), MemSize::new(8)).unwrap(), "");
        assert_eq!(src.read_nts(Addr::new(0x1020), MemSize::new(0)).unwrap(), "");
    }

    #[test]
    fn test_read_ptr_variants() {
        let src = source();
        assert_eq!(src.read_ptr(Addr::new(0x1028)).unwrap(), Addr::new(0x1010));
        assert_eq!(src.read_ptr_or_zero(Addr::new(0x1028)), Addr::new(0x1010));
        // errors mask to null
        assert_eq!(src.read_ptr_or_zero(Addr::new(0x9000)), Addr::null());
        // null source address masks to null
        assert_eq!(src.read_ptr_or_zero(Addr::null()), Addr::null());
        // non-canonical source address masks to null
        assert_eq!(src.read_ptr_or_zero(Addr::new(0x8000_0000_0000)), Addr::null());
    }

    #[test]
    fn test_read_blob_carries_base() {
        let src = source();
        let view = src.read_blob(Addr::new(0x1008), MemSize::new(8)).unwrap();
        assert_eq!(view.base(), Addr::new(0x1008));
        assert_eq!(view.len(), 8);
        assert_eq!(view.read_u32(Addr::new(0x1008)).unwrap(), 1234);
    }

    #[test]
    fn test_read_blobs_preserves_order() {
        let src = source();
        let addrs = [Addr::new(0x1008), Addr::new(0x9000), Addr::new(0x1000)];
        let results = src.read_blobs(&addrs, MemSize::new(4));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].addr, Addr::new(0x1008));
        assert!(results[0].result.is_ok());
        assert!(results[1].result.is_err());
        assert!(results[2].result.is_ok());
    }

    #[test]
    fn test_pointer_chain_no_offsets() {
        let src = source();
        let view = src
            .read_pointer_chain(Addr::new(0x1008), MemSize::new(4), &[])
            .unwrap();
        assert_eq!(view.base(), Addr::new(0x1008));
    }

    #[test]
    fn test_pointer_chain_last_offset_not_dereferenced() {
        let src = source();
        // hop: *(base + 0x28) == 0x1010, then final displacement +8
        let view = src
            .read_pointer_chain(
                Addr::new(0x1000),
                MemSize::new(8),
                &[MemSize::new(0x28), MemSize::new(8)],
            )
            .unwrap();
        assert_eq!(view.base(), Addr::new(0x1018));
        assert_eq!(view.off_f64(MemSize::new(0)).unwrap(), 2.25);
    }

    #[test]
    fn test_pointer_chain_null_step() {
        let src = source();
        // the slot at base + 0x30 holds zeroes
        let err = src
            .read_pointer_chain(
                Addr::new(0x1000),
                MemSize::new(8),
                &[MemSize::new(0x30), MemSize::new(0)],
            )
            .unwrap_err();
        assert!(matches!(err, MemoryError::NullInChain(0)));
    }

    #[test]
    fn test_pointer_chain_invalid_step() {
        let mut src = source();
        // plant a pointer that does not validate
        src.data[40..48].copy_from_slice(&0x4_0000u64.to_le_bytes());
        let err = src
            .read_pointer_chain(
                Addr::new(0x1000),
                MemSize::new(8),
                &[MemSize::new(0x28), MemSize::new(0)],
            )
            .unwrap_err();
        match err {
            MemoryError::InvalidInChain { step, addr } => {
                assert_eq!(step, 0);
                assert_eq!(addr, Addr::new(0x4_0000));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_read_pointers_filters_invalid() {
        let mut src = source();
        src.data[48..56].copy_from_slice(&0x1020u64.to_le_bytes());
        src.data[56..64].copy_from_slice(&0xFFFF_0000u64.to_le_bytes());
        let ptrs = src.read_pointers(Addr::new(0x1028), 3).unwrap();
        assert_eq!(ptrs, vec![Addr::new(0x1010), Addr::new(0x1020)]);
    }
}
