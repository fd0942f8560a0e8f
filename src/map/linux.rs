//! Linux memory map source backed by /proc/<pid>/maps

use super::{parse_proc_maps, MemoryMap};
use crate::core::types::{MemoryError, MemoryResult, Pid};
use std::fs;
use std::path::PathBuf;

/// Path of the maps file for a process
fn maps_path(pid: Pid) -> PathBuf {
    PathBuf::from(format!("/proc/{}/maps", pid))
}

/// Reads and parses the memory map of a live process.
///
/// A missing proc entry maps to `ProcessNotFound`; other read failures
/// surface as I/O errors.
pub fn read_memory_map(pid: Pid) -> MemoryResult<MemoryMap> {
    let text = fs::read_to_string(maps_path(pid)).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            MemoryError::ProcessNotFound(pid)
        } else {
            MemoryError::Io(err)
        }
    })?;
    Ok(parse_proc_maps(&text))
}

/// Best-effort process name from /proc/<pid>/comm
pub fn read_process_name(pid: Pid) -> Option<String> {
    let text = fs::read_to_string(format!("/proc/{}/comm", pid)).ok()?;
    Some(text.trim_end_matches('\n').to_string())
}

/// Checks whether a process with the given pid exists
pub fn process_exists(pid: Pid) -> bool {
    PathBuf::from(format!("/proc/{}", pid)).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_own_memory_map() {
        let pid = std::process::id();
        let map = read_memory_map(pid).unwrap();
        assert!(!map.is_empty());
        // every process maps at least one readable region
        assert!(map.regions().iter().any(|r| r.is_readable()));
    }

    #[test]
    fn test_missing_process() {
        // pid 0 has no /proc entry
        assert!(matches!(
            read_memory_map(0),
            Err(MemoryError::ProcessNotFound(0))
        ));
        assert!(!process_exists(0));
    }

    #[test]
    fn test_own_process_name() {
        let name = read_process_name(std::process::id()).unwrap();
        assert!(!name.is_empty());
        assert!(!name.ends_with('\n'));
    }
}
