//! Live Linux backend over the cross-process vectored I/O syscalls

use super::{vm, Process};
use crate::core::types::{Addr, MemSize, MemoryError, MemoryResult, Pid};
use crate::map::{linux as map_source, AddressGuard, MemoryMap, Region};
use crate::memory::MemoryRead;
use parking_lot::RwLock;
use tracing::{debug, info, info_span, Span};

/// State behind the backend's single lock.
///
/// The lock is never held across a syscall into the foreign process or any
/// file-system call: accessors snapshot what they need and drop it before
/// blocking.
struct Inner {
    pid: Option<Pid>,
    name: Option<String>,
    map: MemoryMap,
    span: Span,
}

impl Inner {
    fn pid(&self) -> MemoryResult<Pid> {
        self.pid.ok_or(MemoryError::ProcessNotOpen)
    }
}

/// A handle on a live process, created empty and bound to a pid with
/// [`LiveProcess::open`].
pub struct LiveProcess {
    guard: AddressGuard,
    state: RwLock<Inner>,
}

impl LiveProcess {
    /// Creates an unbound handle with the default guard windows
    pub fn new() -> Self {
        Self::with_guard(AddressGuard::default())
    }

    /// Creates an unbound handle with explicit guard windows
    pub fn with_guard(guard: AddressGuard) -> Self {
        LiveProcess {
            guard,
            state: RwLock::new(Inner {
                pid: None,
                name: None,
                map: MemoryMap::default(),
                span: info_span!("process", pid = "not-open"),
            }),
        }
    }

    /// Creates a handle and opens it in one step
    pub fn attach(pid: Pid) -> MemoryResult<Self> {
        let process = Self::new();
        process.open(pid)?;
        Ok(process)
    }

    /// Binds the handle to a live pid and builds its memory map
    pub fn open(&self, pid: Pid) -> MemoryResult<()> {
        if !map_source::process_exists(pid) {
            return Err(MemoryError::ProcessNotFound(pid));
        }
        let name = map_source::read_process_name(pid);

        {
            let mut inner = self.state.write();
            inner.pid = Some(pid);
            inner.name = name;
            inner.span = info_span!("process", pid);
        }

        self.update_memory_map()?;

        let inner = self.state.read();
        let _e = inner.span.enter();
        info!(regions = inner.map.len(), "process opened");
        Ok(())
    }

    /// The guard windows this handle validates against
    pub fn guard(&self) -> AddressGuard {
        self.guard
    }
}

impl Default for LiveProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRead for LiveProcess {
    fn read_bytes(&self, addr: Addr, size: MemSize) -> MemoryResult<Vec<u8>> {
        // Snapshot pid and validity in one critical section so the check
        // and the syscall observe the same target, then release before the
        // kernel call.
        let (pid, valid) = {
            let inner = self.state.read();
            (inner.pid()?, inner.map.is_readable(addr, &self.guard))
        };
        if !valid {
            return Err(MemoryError::AddressNotMapped(addr));
        }
        vm::read_process_memory(pid, addr, size)
    }

    fn is_valid_address(&self, addr: Addr) -> bool {
        let inner = self.state.read();
        inner.map.is_readable(addr, &self.guard)
    }
}

impl Process for LiveProcess {
    fn pid(&self) -> MemoryResult<Pid> {
        self.state.read().pid()
    }

    fn name(&self) -> Option<String> {
        self.state.read().name.clone()
    }

    fn memory_map(&self) -> MemoryResult<Vec<Region>> {
        let inner = self.state.read();
        inner.pid()?;
        Ok(inner.map.regions().to_vec())
    }

    fn update_memory_map(&self) -> MemoryResult<()> {
        let pid = self.state.read().pid()?;

        // Re-parse outside the lock; swap under it.
        let map = map_source::read_memory_map(pid)?;

        let mut inner = self.state.write();
        debug!(pid, regions = map.len(), "memory map refreshed");
        inner.map = map;
        Ok(())
    }

    fn write_bytes(&self, addr: Addr, data: &[u8]) -> MemoryResult<()> {
        let pid = {
            let inner = self.state.read();
            let pid = inner.pid()?;
            if !inner.map.is_readable(addr, &self.guard) {
                return Err(MemoryError::AddressNotMapped(addr));
            }
            if !inner.map.is_writable(addr, &self.guard) {
                return Err(MemoryError::NotWritable { addr });
            }
            pid
        };
        vm::write_process_memory(pid, addr, data)?;
        Ok(())
    }

    fn close(&mut self) {
        let mut inner = self.state.write();
        {
            let _e = inner.span.enter();
            info!("process closed");
        }
        inner.pid = None;
        inner.name = None;
        inner.map = MemoryMap::default();
        inner.span = info_span!("process", pid = "not-open");
    }
}
