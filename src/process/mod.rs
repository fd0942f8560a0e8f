//! Process backends and the uniform capability trait they implement

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "linux")]
pub mod vm;
#[cfg(windows)]
pub mod windows;

use crate::core::types::{Addr, MemoryResult, Pid};
use crate::map::Region;
use crate::memory::MemoryRead;
use crate::snapshot::{SaveOptions, SaveStats};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identity of a target process, persisted as snapshot metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
}

impl ProcessInfo {
    pub fn new(pid: Pid, name: impl Into<String>) -> Self {
        ProcessInfo {
            pid,
            name: name.into(),
        }
    }
}

/// The uniform capability set over the live and snapshot backends.
///
/// All backends serve the derived [`MemoryRead`] surface; operations a
/// backend cannot honour (writing to or re-saving a snapshot) return
/// `Unsupported` rather than being absent, so consumers holding a generic
/// handle can branch on capability.
pub trait Process: MemoryRead {
    /// The target's process id; `ProcessNotOpen` before open or after close
    fn pid(&self) -> MemoryResult<Pid>;

    /// Best-effort process name
    fn name(&self) -> Option<String>;

    /// A copy of the current sorted memory map
    fn memory_map(&self) -> MemoryResult<Vec<Region>>;

    /// Re-reads and re-sorts the memory map from the backend's source of
    /// truth; a no-op for static snapshots
    fn update_memory_map(&self) -> MemoryResult<()>;

    /// Writes `data` at `addr`; requires a writable covering region
    fn write_bytes(&self, addr: Addr, data: &[u8]) -> MemoryResult<()>;

    /// Persists the target's map and region contents as a snapshot
    /// directory
    fn save(&self, dir: &Path, options: &SaveOptions) -> MemoryResult<SaveStats>
    where
        Self: Sized,
    {
        crate::snapshot::save_process(self, dir, options)
    }

    /// Releases the target. Captured views stay valid; new reads fail.
    fn close(&mut self);
}
