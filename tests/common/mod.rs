//! In-memory process fixture shared by the integration tests
//!
//! Behaves like a live backend over a hand-assembled address space: reads
//! are served from region buffers, validity follows the map and guard
//! windows, and the default save pipeline works against it.

#![allow(dead_code)]

use memlens::{
    Addr, AddressGuard, MemSize, MemoryError, MemoryMap, MemoryRead, MemoryResult, Pid, Process,
    ProcessInfo, Region,
};
use std::collections::HashMap;

pub struct FakeProcess {
    info: ProcessInfo,
    map: MemoryMap,
    buffers: HashMap<u64, Vec<u8>>,
    guard: AddressGuard,
}

impl FakeProcess {
    /// Builds a fixture from `(start, bytes, perms)` triples with the
    /// default guard windows
    pub fn new(pid: Pid, name: &str, regions: Vec<(u64, Vec<u8>, &str)>) -> Self {
        Self::with_guard(pid, name, regions, AddressGuard::default())
    }

    /// Same, with explicit guard windows
    pub fn with_guard(
        pid: Pid,
        name: &str,
        regions: Vec<(u64, Vec<u8>, &str)>,
        guard: AddressGuard,
    ) -> Self {
        let map = MemoryMap::from_regions(
            regions
                .iter()
                .map(|(start, data, perms)| {
                    Region::new(Addr::new(*start), MemSize::from(data.len()), *perms)
                })
                .collect(),
        );
        let buffers = regions
            .into_iter()
            .map(|(start, data, _)| (start, data))
            .collect();
        FakeProcess {
            info: ProcessInfo::new(pid, name),
            map,
            buffers,
            guard,
        }
    }

    /// A guard wide enough for fixtures placed in the upper userland half
    pub fn wide_guard() -> AddressGuard {
        AddressGuard {
            low: Addr::new(0x10000),
            high: Addr::new(0x7FFF_FFFF_FFFF),
        }
    }
}

impl MemoryRead for FakeProcess {
    fn read_bytes(&self, addr: Addr, size: MemSize) -> MemoryResult<Vec<u8>> {
        if !self.map.is_readable(addr, &self.guard) {
            return Err(MemoryError::AddressNotMapped(addr));
        }
        let region = self
            .map
            .region_containing(addr)
            .ok_or(MemoryError::AddressNotMapped(addr))?;
        let data = self
            .buffers
            .get(&region.start.as_u64())
            .ok_or(MemoryError::BlobMissing(region.start))?;
        let offset = addr
            .offset_from(region.start)
            .ok_or(MemoryError::AddressNotMapped(addr))?
            .as_usize();
        let available = data.len().saturating_sub(offset);
        let end = offset
            .checked_add(size.as_usize())
            .filter(|&end| end <= data.len())
            .ok_or_else(|| MemoryError::partial(available, size.as_usize()))?;
        Ok(data[offset..end].to_vec())
    }

    fn is_valid_address(&self, addr: Addr) -> bool {
        self.map.is_readable(addr, &self.guard)
    }
}

impl Process for FakeProcess {
    fn pid(&self) -> MemoryResult<Pid> {
        Ok(self.info.pid)
    }

    fn name(&self) -> Option<String> {
        Some(self.info.name.clone())
    }

    fn memory_map(&self) -> MemoryResult<Vec<Region>> {
        Ok(self.map.regions().to_vec())
    }

    fn update_memory_map(&self) -> MemoryResult<()> {
        Ok(())
    }

    fn write_bytes(&self, _addr: Addr, _data: &[u8]) -> MemoryResult<()> {
        Err(MemoryError::Unsupported("write_bytes"))
    }

    fn close(&mut self) {
        self.map = MemoryMap::default();
        self.buffers.clear();
    }
}
