//! Live Windows backend over the remote read/query APIs

use super::Process;
use crate::core::types::{Addr, MemSize, MemoryError, MemoryResult, Pid};
use crate::map::{AddressGuard, MemoryMap, Region};
use crate::memory::MemoryRead;
use parking_lot::RwLock;
use std::ptr;
use tracing::{debug, info, info_span, Span};
use winapi::shared::minwindef::{DWORD, FALSE, MAX_PATH};
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQueryEx, WriteProcessMemory};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::psapi::GetModuleBaseNameW;
use winapi::um::winnt::{
    HANDLE, MEMORY_BASIC_INFORMATION, MEM_COMMIT, MEM_PRIVATE, PAGE_EXECUTE,
    PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY, PAGE_GUARD,
    PAGE_NOACCESS, PAGE_READONLY, PAGE_READWRITE, PAGE_WRITECOPY, PROCESS_QUERY_INFORMATION,
    PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

/// RAII wrapper closing the OS handle on drop
struct HandleGuard(HANDLE);

// SAFETY: the handle is an opaque kernel object identifier; the remote APIs
// it is passed to are documented as callable from any thread.
unsafe impl Send for HandleGuard {}
unsafe impl Sync for HandleGuard {}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the handle was returned by a successful OpenProcess
            // and is closed exactly once.
            unsafe { CloseHandle(self.0) };
        }
    }
}

struct Inner {
    pid: Option<Pid>,
    name: Option<String>,
    handle: Option<HandleGuard>,
    map: MemoryMap,
    span: Span,
}

impl Inner {
    fn pid(&self) -> MemoryResult<Pid> {
        self.pid.ok_or(MemoryError::ProcessNotOpen)
    }
}

/// A handle on a live process, created empty and bound to a pid with
/// [`WindowsProcess::open`].
pub struct WindowsProcess {
    guard: AddressGuard,
    state: RwLock<Inner>,
}

/// Encodes a protection constant as the four-character perms token shared
/// with the Linux map format. The sharing position reports `p` for private
/// commits and `s` otherwise.
fn perms_from_protect(protect: DWORD, kind: DWORD) -> String {
    let base = protect & 0xFF;
    let readable = matches!(
        base,
        PAGE_READONLY
            | PAGE_READWRITE
            | PAGE_WRITECOPY
            | PAGE_EXECUTE_READ
            | PAGE_EXECUTE_READWRITE
            | PAGE_EXECUTE_WRITECOPY
    );
    let writable = matches!(
        base,
        PAGE_READWRITE | PAGE_WRITECOPY | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY
    );
    let executable = matches!(
        base,
        PAGE_EXECUTE | PAGE_EXECUTE_READ | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY
    );
    let guarded = protect & PAGE_GUARD != 0 || base == PAGE_NOACCESS;

    let mut perms = String::with_capacity(4);
    perms.push(if readable && !guarded { 'r' } else { '-' });
    perms.push(if writable && !guarded { 'w' } else { '-' });
    perms.push(if executable && !guarded { 'x' } else { '-' });
    perms.push(if kind == MEM_PRIVATE { 'p' } else { 's' });
    perms
}

/// Walks the committed regions of the target with VirtualQueryEx
fn query_memory_map(handle: HANDLE) -> MemoryMap {
    let mut regions = Vec::new();
    let mut current: usize = 0;

    loop {
        let mut info: MEMORY_BASIC_INFORMATION = unsafe { std::mem::zeroed() };
        // SAFETY: `info` is a properly sized out-parameter; a zero return
        // means the probe address is past the last queryable region.
        let written = unsafe {
            VirtualQueryEx(
                handle,
                current as *const _,
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 {
            break;
        }

        if info.State == MEM_COMMIT {
            regions.push(Region::new(
                Addr::new(info.BaseAddress as u64),
                MemSize::new(info.RegionSize as u64),
                perms_from_protect(info.Protect, info.Type),
            ));
        }

        let next = (info.BaseAddress as usize).saturating_add(info.RegionSize);
        if next <= current {
            break;
        }
        current = next;
    }

    MemoryMap::from_regions(regions)
}

fn module_base_name(handle: HANDLE) -> Option<String> {
    let mut buffer = [0u16; MAX_PATH];
    // SAFETY: buffer length is passed in characters and the call writes at
    // most that many.
    let len = unsafe {
        GetModuleBaseNameW(handle, ptr::null_mut(), buffer.as_mut_ptr(), MAX_PATH as DWORD)
    };
    if len == 0 {
        return None;
    }
    Some(String::from_utf16_lossy(&buffer[..len as usize]))
}

impl WindowsProcess {
    /// Creates an unbound handle with the default guard windows
    pub fn new() -> Self {
        Self::with_guard(AddressGuard::default())
    }

    /// Creates an unbound handle with explicit guard windows
    pub fn with_guard(guard: AddressGuard) -> Self {
        WindowsProcess {
            guard,
            state: RwLock::new(Inner {
                pid: None,
                name: None,
                handle: None,
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
        // SAFETY: OpenProcess has no memory-safety preconditions; a null
        // return is mapped to an error below.
        let raw = unsafe {
            OpenProcess(
                PROCESS_QUERY_INFORMATION | PROCESS_VM_READ | PROCESS_VM_WRITE
                    | PROCESS_VM_OPERATION,
                FALSE,
                pid,
            )
        };
        if raw.is_null() {
            return Err(MemoryError::last_os_error());
        }
        let handle = HandleGuard(raw);
        let name = module_base_name(handle.0);
        let map = query_memory_map(handle.0);

        let mut inner = self.state.write();
        inner.pid = Some(pid);
        inner.name = name;
        inner.handle = Some(handle);
        inner.map = map;
        inner.span = info_span!("process", pid);
        let _e = inner.span.enter();
        info!(regions = inner.map.len(), "process opened");
        Ok(())
    }

    /// The guard windows this handle validates against
    pub fn guard(&self) -> AddressGuard {
        self.guard
    }
}

impl Default for WindowsProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRead for WindowsProcess {
    fn read_bytes(&self, addr: Addr, size: MemSize) -> MemoryResult<Vec<u8>> {
        let len = size.as_usize();
        if len == 0 {
            return Ok(Vec::new());
        }

        // Snapshot the raw handle and validity in one critical section,
        // then release the lock before the remote read.
        let handle = {
            let inner = self.state.read();
            inner.pid()?;
            if !inner.map.is_readable(addr, &self.guard) {
                return Err(MemoryError::AddressNotMapped(addr));
            }
            match &inner.handle {
                Some(handle) => handle.0,
                None => return Err(MemoryError::ProcessNotOpen),
            }
        };

        let mut buffer = vec![0u8; len];
        let mut transferred: usize = 0;
        // SAFETY: the local buffer outlives the call and `transferred` is a
        // valid out-parameter; the remote range is interpreted by the
        // kernel in the target's address space.
        let ok = unsafe {
            ReadProcessMemory(
                handle,
                addr.as_u64() as *const _,
                buffer.as_mut_ptr() as *mut _,
                len,
                &mut transferred,
            )
        };

        if ok == FALSE {
            return Err(MemoryError::last_os_error());
        }
        if transferred < len {
            return Err(MemoryError::partial(transferred, len));
        }
        Ok(buffer)
    }

    fn is_valid_address(&self, addr: Addr) -> bool {
        let inner = self.state.read();
        inner.map.is_readable(addr, &self.guard)
    }
}

impl Process for WindowsProcess {
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
        let mut inner = self.state.write();
        inner.pid()?;
        let handle = match &inner.handle {
            Some(handle) => handle.0,
            None => return Err(MemoryError::ProcessNotOpen),
        };
        let map = query_memory_map(handle);
        debug!(regions = map.len(), "memory map refreshed");
        inner.map = map;
        Ok(())
    }

    fn write_bytes(&self, addr: Addr, data: &[u8]) -> MemoryResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let handle = {
            let inner = self.state.read();
            inner.pid()?;
            if !inner.map.is_readable(addr, &self.guard) {
                return Err(MemoryError::AddressNotMapped(addr));
            }
            if !inner.map.is_writable(addr, &self.guard) {
                return Err(MemoryError::NotWritable { addr });
            }
            match &inner.handle {
                Some(handle) => handle.0,
                None => return Err(MemoryError::ProcessNotOpen),
            }
        };

        let staged = data.to_vec();
        let mut transferred: usize = 0;
        // SAFETY: `staged` is a private copy owned by this frame; the
        // remote range belongs to the target process.
        let ok = unsafe {
            WriteProcessMemory(
                handle,
                addr.as_u64() as *mut _,
                staged.as_ptr() as *const _,
                staged.len(),
                &mut transferred,
            )
        };

        if ok == FALSE {
            return Err(MemoryError::last_os_error());
        }
        if transferred < staged.len() {
            return Err(MemoryError::partial(transferred, staged.len()));
        }
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
        inner.handle = None;
        inner.map = MemoryMap::default();
        inner.span = info_span!("process", pid = "not-open");
    }
}
