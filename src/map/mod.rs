//! Memory map model: regions, validity queries and guard windows
//!
//! The map is the single source of truth for address validity. Every backend
//! parses its platform's description of the target address space into the
//! same sorted list of [`Region`]s and answers `contains`/`is_readable`
//! queries from it before any I/O is attempted.

use crate::core::types::{Addr, MemSize};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(target_os = "linux")]
pub mod linux;

/// A contiguous region of the target's virtual address space.
///
/// `perms` is the four-character encoding used by the Linux maps file:
/// position 0 is read, 1 is write, 2 is execute and 3 is the sharing flag,
/// which is carried through untouched. Field names are serialized in the
/// snapshot wire form (`Address`, `Size`, `Perms`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    #[serde(rename = "Address")]
    pub start: Addr,
    #[serde(rename = "Size")]
    pub size: MemSize,
    #[serde(rename = "Perms")]
    pub perms: String,
}

impl Region {
    /// Creates a region from raw parts
    pub fn new(start: Addr, size: MemSize, perms: impl Into<String>) -> Self {
        Region {
            start,
            size,
            perms: perms.into(),
        }
    }

    /// One past the last address of the region, saturating at the top of
    /// the address space
    pub fn end(&self) -> Addr {
        self.start + self.size
    }

    /// Checks the read permission bit
    pub fn is_readable(&self) -> bool {
        self.perms.as_bytes().first() == Some(&b'r')
    }

    /// Checks the write permission bit
    pub fn is_writable(&self) -> bool {
        self.perms.as_bytes().get(1) == Some(&b'w')
    }

    /// Checks the execute permission bit
    pub fn is_executable(&self) -> bool {
        self.perms.as_bytes().get(2) == Some(&b'x')
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:016x}-{:016x} {} ({})",
            self.start.as_u64(),
            self.end().as_u64(),
            self.perms,
            self.size
        )
    }
}

/// Synthetic validity windows applied on top of the memory map.
///
/// Addresses at or below `low` and above `high` are rejected regardless of
/// what the map says. The defaults cover the low-page sentinel and the
/// canonical userland half on mainstream 64-bit targets; non-standard
/// layouts can supply their own windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressGuard {
    pub low: Addr,
    pub high: Addr,
}

impl AddressGuard {
    /// Checks an address against both windows
    pub fn permits(&self, addr: Addr) -> bool {
        addr > self.low && addr <= self.high
    }
}

impl Default for AddressGuard {
    fn default() -> Self {
        AddressGuard {
            low: Addr::new(0x10000),
            high: Addr::new(0x7000_0000_0000),
        }
    }
}

/// An ordered sequence of non-overlapping regions, sorted by start address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryMap {
    regions: Vec<Region>,
}

impl MemoryMap {
    /// Builds a map from a list of regions, sorting by start address
    pub fn from_regions(mut regions: Vec<Region>) -> Self {
        regions.sort_by_key(|r| r.start);
        MemoryMap { regions }
    }

    /// The sorted region list
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Number of regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// True when the map holds no regions
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Returns the region covering `addr`, if any.
    ///
    /// Binary search for the first region whose end lies past `addr`, then a
    /// start check. A zero-size region covers nothing but is still matched
    /// at its exact start address.
    pub fn region_containing(&self, addr: Addr) -> Option<&Region> {
        let i = self.regions.partition_point(|r| r.end() <= addr);
        if let Some(region) = self.regions.get(i) {
            if region.start <= addr {
                return Some(region);
            }
        }
        if i > 0 {
            let prev = &self.regions[i - 1];
            if prev.size.is_zero() && prev.start == addr {
                return Some(prev);
            }
        }
        None
    }

    /// Checks that `addr` passes the guard windows and falls in a region
    /// with the read permission bit set
    pub fn is_readable(&self, addr: Addr, guard: &AddressGuard) -> bool {
        guard.permits(addr)
            && self
                .region_containing(addr)
                .map(Region::is_readable)
                .unwrap_or(false)
    }

    /// Checks that `addr` falls in a region with the write permission bit
    /// set; the guard windows still apply
    pub fn is_writable(&self, addr: Addr, guard: &AddressGuard) -> bool {
        guard.permits(addr)
            && self
                .region_containing(addr)
                .map(Region::is_writable)
                .unwrap_or(false)
    }
}

/// Parses the text of a Linux-format maps file into a sorted map.
///
/// One region per line: a hex `start-end` range followed by the permission
/// token. Malformed lines are discarded silently.
pub fn parse_proc_maps(text: &str) -> MemoryMap {
    let mut regions = Vec::new();
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let (Some(range), Some(perms)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Some((start, end)) = range.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(end)) = (
            u64::from_str_radix(start, 16),
            u64::from_str_radix(end, 16),
        ) else {
            continue;
        };
        let Some(size) = end.checked_sub(start) else {
            continue;
        };
        regions.push(Region::new(
            Addr::new(start),
            MemSize::new(size),
            perms.to_string(),
        ));
    }
    MemoryMap::from_regions(regions)
}
