//! Default configuration values for memlens

use serde::{Deserialize, Serialize};

/// Scanner tuning section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Worker cap for parallel scans; clamped to the CPU count at use
    pub max_workers: usize,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            max_workers: num_cpus::get().min(8),
        }
    }
}

/// Snapshot save policy section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSettings {
    /// Regions above this many MiB are skipped unless `include_large`
    pub max_region_mib: u64,
    /// Wall-clock deadline for a whole save, in seconds
    pub timeout_secs: u64,
    /// Capture oversized regions too
    pub include_large: bool,
}

impl Default for SaveSettings {
    fn default() -> Self {
        SaveSettings {
            max_region_mib: 100,
            timeout_secs: 30,
            include_large: false,
        }
    }
}

/// Address guard section.
///
/// The defaults suit mainstream 64-bit userland; non-standard layouts can
/// widen or narrow the windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    /// Addresses at or below this value are rejected
    pub low: u64,
    /// Addresses above this value are rejected
    pub high: u64,
}

impl Default for GuardSettings {
    fn default() -> Self {
        GuardSettings {
            low: 0x10000,
            high: 0x7000_0000_0000,
        }
    }
}
