//! Pattern and value scanning over process memory
//!
//! Scans walk the readable regions of the target's memory map, read each
//! region through the backend and match a masked byte pattern against the
//! buffer. The parallel variant partitions work at region granularity under
//! a fixed concurrency cap; per-region read failures are logged and
//! skipped, never fatal.

use crate::core::types::{Addr, AobPattern, MemSize, MemoryError, MemoryResult};
use crate::process::Process;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Regions starting above this address are excluded from parallel scans;
/// they belong to kernel or otherwise unreachable mappings.
const SCAN_REGION_CEILING: u64 = 0x7d00_0000_0000;

/// Finds all offsets in `data` where the pattern matches.
///
/// Overlapping matches are reported; within one buffer the offsets ascend.
pub fn find_pattern_matches(data: &[u8], aob: &AobPattern) -> Vec<usize> {
    if data.len() < aob.len() {
        return Vec::new();
    }
    (0..=data.len() - aob.len())
        .filter(|&i| aob.matches(&data[i..]))
        .collect()
}

/// Pattern and typed-value scanning, available on every backend that
/// exposes a memory map.
pub trait MemoryScan: Process + Sync {
    /// Scans every readable region for the pattern, sequentially.
    ///
    /// Matches are absolute addresses, ascending. Regions that fail to
    /// read are skipped.
    fn scan(&self, aob: &AobPattern) -> MemoryResult<Vec<Addr>> {
        let regions = self.memory_map()?;
        let mut results = Vec::new();

        debug!(pattern = %aob, "starting scan");
        for region in &regions {
            if !region.is_readable() {
                continue;
            }
            let data = match self.read_bytes(region.start, region.size) {
                Ok(data) => data,
                Err(MemoryError::AddressNotMapped(_)) => continue,
                Err(err) => {
                    debug!(region = %region, %err, "region read failed");
                    continue;
                }
            };
            results.extend(
                find_pattern_matches(&data, aob)
                    .into_iter()
                    .map(|offset| region.start + MemSize::from(offset)),
            );
        }

        info!(matches = results.len(), "scan complete");
        Ok(results)
    }

    /// Scans readable regions in parallel with at most
    /// `min(maxdop, n_cpu)` worker threads.
    ///
    /// The result set equals the sequential scan's, with no defined
    /// cross-region order.
    fn scan_parallel(&self, aob: &AobPattern, maxdop: usize) -> MemoryResult<Vec<Addr>> {
        let workers = maxdop.min(num_cpus::get()).max(1);
        if workers <= 1 {
            return self.scan(aob);
        }

        let regions: Vec<_> = self
            .memory_map()?
            .into_iter()
            .filter(|r| r.is_readable() && r.start.as_u64() <= SCAN_REGION_CEILING)
            .collect();

        debug!(pattern = %aob, workers, regions = regions.len(), "starting parallel scan");

        let cursor = AtomicUsize::new(0);
        let results = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(region) = regions.get(index) else {
                        break;
                    };
                    let data = match self.read_bytes(region.start, region.size) {
                        Ok(data) => data,
                        Err(MemoryError::AddressNotMapped(_)) => continue,
                        Err(err) => {
                            debug!(region = %region, %err, "region read failed");
                            continue;
                        }
                    };
                    let matches = find_pattern_matches(&data, aob);
                    if !matches.is_empty() {
                        results.lock().extend(
                            matches
                                .into_iter()
                                .map(|offset| region.start + MemSize::from(offset)),
                        );
                    }
                });
            }
        });

        let results = results.into_inner();
        info!(matches = results.len(), "parallel scan complete");
        Ok(results)
    }

    /// Returns the lowest-addressed match, if any
    fn scan_first(&self, aob: &AobPattern) -> MemoryResult<Option<Addr>> {
        Ok(self.scan(aob)?.into_iter().min())
    }

    /// Parallel variant of [`MemoryScan::scan_first`]
    fn scan_first_parallel(&self, aob: &AobPattern, maxdop: usize) -> MemoryResult<Option<Addr>> {
        Ok(self.scan_parallel(aob, maxdop)?.into_iter().min())
    }

    /// Scans for an integer value encoded little-endian in `width` bytes
    /// (1, 2, 4 or 8)
    fn scan_integer(&self, value: i64, width: u32) -> MemoryResult<Vec<Addr>> {
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(MemoryError::InvalidScanWidth(width));
        }
        let pattern = value.to_le_bytes()[..width as usize].to_vec();
        self.scan(&AobPattern::exact(pattern)?)
    }

    /// Scans for the IEEE-754 bit pattern of a 32-bit float
    fn scan_f32(&self, value: f32) -> MemoryResult<Vec<Addr>> {
        self.scan(&AobPattern::exact(value.to_le_bytes().to_vec())?)
    }

    /// Scans for the IEEE-754 bit pattern of a 64-bit float
    fn scan_f64(&self, value: f64) -> MemoryResult<Vec<Addr>> {
        self.scan(&AobPattern::exact(value.to_le_bytes().to_vec())?)
    }

    /// Scans for a string, either as raw UTF-8 bytes or encoded UTF-16LE
    fn scan_string(&self, value: &str, utf16: bool) -> MemoryResult<Vec<Addr>> {
        let pattern = if utf16 {
            value
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect()
        } else {
            value.as_bytes().to_vec()
        };
        self.scan(&AobPattern::exact(pattern)?)
    }
}

impl<P: Process + Sync> MemoryScan for P {}
