//! Offline backend replaying a previously captured snapshot

use super::{blob_file_name, MEMORY_MAP_FILE, METADATA_FILE};
use crate::core::types::{Addr, MemSize, MemoryError, MemoryResult, Pid};
use crate::map::{AddressGuard, MemoryMap, Region};
use crate::memory::MemoryRead;
use crate::process::{Process, ProcessInfo};
use crate::snapshot::{SaveOptions, SaveStats};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A process backend served entirely from a snapshot directory.
///
/// Reads locate the covering region, compute the offset and slice the
/// region's blob. Regions without a captured blob are legal gaps and
/// surface as `BlobMissing`. Writing and re-saving are unsupported.
#[derive(Debug, Default)]
pub struct SnapshotProcess {
    info: Option<ProcessInfo>,
    map: MemoryMap,
    blobs: HashMap<u64, Vec<u8>>,
    guard: AddressGuard,
}

impl SnapshotProcess {
    /// Loads a snapshot directory with the default guard windows
    pub fn load(dir: &Path) -> MemoryResult<Self> {
        Self::load_with_guard(dir, AddressGuard::default())
    }

    /// Loads a snapshot directory with explicit guard windows
    pub fn load_with_guard(dir: &Path, guard: AddressGuard) -> MemoryResult<Self> {
        let info: ProcessInfo = serde_json::from_slice(&fs::read(dir.join(METADATA_FILE))?)?;
        let regions: Vec<Region> = serde_json::from_slice(&fs::read(dir.join(MEMORY_MAP_FILE))?)?;
        let map = MemoryMap::from_regions(regions);

        let mut blobs = HashMap::new();
        for region in map.regions() {
            let path = dir.join(blob_file_name(region.start, region.size));
            if !path.exists() {
                continue;
            }
            blobs.insert(region.start.as_u64(), fs::read(&path)?);
        }

        info!(
            pid = info.pid,
            name = %info.name,
            regions = map.len(),
            blobs = blobs.len(),
            dir = %dir.display(),
            "snapshot loaded"
        );

        Ok(SnapshotProcess {
            info: Some(info),
            map,
            blobs,
            guard,
        })
    }

    /// Assembles a snapshot directly from parts, without touching disk.
    ///
    /// This is how in-memory fixtures and replayed captures from other
    /// sources are built; regions are sorted, blobs are keyed by their
    /// region's start address.
    pub fn from_parts(
        info: ProcessInfo,
        regions: Vec<Region>,
        blobs: impl IntoIterator<Item = (Addr, Vec<u8>)>,
        guard: AddressGuard,
    ) -> Self {
        SnapshotProcess {
            info: Some(info),
            map: MemoryMap::from_regions(regions),
            blobs: blobs
                .into_iter()
                .map(|(addr, data)| (addr.as_u64(), data))
                .collect(),
            guard,
        }
    }

    /// The guard windows this snapshot validates pointers against
    pub fn guard(&self) -> AddressGuard {
        self.guard
    }

    /// Number of regions with a captured blob
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }
}

impl MemoryRead for SnapshotProcess {
    fn read_bytes(&self, addr: Addr, size: MemSize) -> MemoryResult<Vec<u8>> {
        if self.info.is_none() {
            return Err(MemoryError::ProcessNotOpen);
        }
        let region = self
            .map
            .region_containing(addr)
            .ok_or(MemoryError::AddressNotMapped(addr))?;
        let data = self
            .blobs
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

impl Process for SnapshotProcess {
    fn pid(&self) -> MemoryResult<Pid> {
        self.info
            .as_ref()
            .map(|info| info.pid)
            .ok_or(MemoryError::ProcessNotOpen)
    }

    fn name(&self) -> Option<String> {
        self.info.as_ref().map(|info| info.name.clone())
    }

    fn memory_map(&self) -> MemoryResult<Vec<Region>> {
        if self.info.is_none() {
            return Err(MemoryError::ProcessNotOpen);
        }
        Ok(self.map.regions().to_vec())
    }

    fn update_memory_map(&self) -> MemoryResult<()> {
        // the map is static in a snapshot
        Ok(())
    }

    fn write_bytes(&self, _addr: Addr, _data: &[u8]) -> MemoryResult<()> {
        Err(MemoryError::Unsupported("write_bytes"))
    }

    fn save(&self, _dir: &Path, _options: &SaveOptions) -> MemoryResult<SaveStats> {
        Err(MemoryError::Unsupported("save"))
    }

    fn close(&mut self) {
        debug!("snapshot closed");
        self.info = None;
        self.map = MemoryMap::default();
        self.blobs.clear();
    }
}
