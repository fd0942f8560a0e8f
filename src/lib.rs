//! memlens: introspect the virtual address space of another live process
//! or of a previously captured snapshot of that address space.
//!
//! The live backends (Linux vectored cross-process I/O, Windows remote
//! read/query) and the offline snapshot reader all implement the same
//! capability set: a memory-map-driven validity model, a typed primitive
//! read surface, masked pattern scanning, schema-driven record
//! materialisation and pointer-chain resolution.

pub mod config;
pub mod core;
pub mod map;
pub mod memory;
pub mod process;
pub mod snapshot;

pub use crate::core::types::{Addr, AobPattern, MemSize, MemoryError, MemoryResult, Pid};
pub use crate::map::{AddressGuard, MemoryMap, Region};
pub use crate::memory::pod::{
    ensure_pod, read_pod, read_pod_slice, read_pod_strict, spec_of, FieldDecoder, FieldKind,
    FieldSpec, Materializer, Pod, StructSpec,
};
pub use crate::memory::search::{search_for_bytes, SearchHit, Searcher};
pub use crate::memory::{BlobReadResult, MemoryRead, MemoryScan, OffsetView};
pub use crate::process::{Process, ProcessInfo};
pub use crate::snapshot::{save_process, SaveOptions, SaveStats, SnapshotProcess};

#[cfg(target_os = "linux")]
pub use crate::process::linux::LiveProcess;
#[cfg(windows)]
pub use crate::process::windows::WindowsProcess;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_reexport() {
        let addr = Addr::new(0x1000);
        assert_eq!(addr.as_u64(), 0x1000);
        assert!(Addr::null().is_null());
    }

    #[test]
    fn test_pattern_reexport() {
        let aob = AobPattern::from_hex_string("de ad ?? ef").unwrap();
        assert_eq!(aob.len(), 4);
    }

    #[test]
    fn test_error_reexport() {
        let err = MemoryError::ProcessNotOpen;
        assert_eq!(err.to_string(), "process is not open");
    }

    #[test]
    fn test_version_constant() {
        assert_eq!(crate::core::VERSION, env!("CARGO_PKG_VERSION"));
    }
}
