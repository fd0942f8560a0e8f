//! On-disk snapshot directory format, save pipeline and replay backend
//!
//! A snapshot directory holds `metadata.json` (pid and best-effort name),
//! `process_memory_map.json` (the sorted region list) and zero or more
//! `blob_0x<hex>_<dec>.bin` files with the raw bytes of the corresponding
//! region. A missing blob file is a legal gap: that region's contents were
//! unavailable at capture time.

mod dump;
mod save;

pub use dump::SnapshotProcess;
pub use save::save_process;

use crate::core::types::{Addr, MemSize};
use std::time::Duration;

/// File name of the snapshot metadata
pub const METADATA_FILE: &str = "metadata.json";

/// File name of the persisted memory map
pub const MEMORY_MAP_FILE: &str = "process_memory_map.json";

/// File name for the blob of a region: lowercase hex start address without
/// width padding, decimal size
pub fn blob_file_name(start: Addr, size: MemSize) -> String {
    format!("blob_0x{:x}_{}.bin", start.as_u64(), size.as_u64())
}

/// Policy knobs for the save pipeline
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Regions larger than this are skipped unless `include_large` is set
    pub max_region_size: MemSize,
    /// Hard wall-clock deadline for the whole save
    pub timeout: Duration,
    /// Lifts the size cap and captures every readable region
    pub include_large: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            max_region_size: MemSize::new(100 * 1024 * 1024),
            timeout: Duration::from_secs(30),
            include_large: false,
        }
    }
}

/// Per-outcome region counts accumulated by a save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub saved: usize,
    pub skipped_non_readable: usize,
    pub skipped_too_large: usize,
    pub read_error: usize,
    pub write_error: usize,
}

impl std::fmt::Display for SaveStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} saved, {} non-readable, {} too large, {} read errors, {} write errors",
            self.saved,
            self.skipped_non_readable,
            self.skipped_too_large,
            self.read_error,
            self.write_error
        )
    }
}
