//! Vectored cross-process I/O syscall wrappers
//!
//! The only unsafe code on the Linux read/write path lives here. Each call
//! issues exactly one `process_vm_readv`/`process_vm_writev` with a single
//! local iovec and a single remote iovec; everything above this module deals
//! in typed values and owned buffers.

use crate::core::types::{Addr, MemSize, MemoryError, MemoryResult, Pid};
use libc::{c_void, iovec};

/// Reads `size` bytes at `addr` in the target process.
///
/// A short transfer surfaces as `Partial` with the byte count the kernel
/// reported; a failed syscall wraps the errno as a backend error.
pub fn read_process_memory(pid: Pid, addr: Addr, size: MemSize) -> MemoryResult<Vec<u8>> {
    let len = size.as_usize();
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut buffer = vec![0u8; len];
    let local = iovec {
        iov_base: buffer.as_mut_ptr() as *mut c_void,
        iov_len: len,
    };
    let remote = iovec {
        iov_base: addr.as_u64() as *mut c_void,
        iov_len: len,
    };

    // SAFETY: both iovecs describe exactly one range. The local range is
    // the freshly allocated `buffer`, exclusively borrowed for the duration
    // of the call; the remote range is interpreted by the kernel in the
    // target's address space and never dereferenced locally. Failure is
    // reported through the return value.
    let transferred =
        unsafe { libc::process_vm_readv(pid as libc::pid_t, &local, 1, &remote, 1, 0) };

    if transferred < 0 {
        return Err(MemoryError::last_os_error());
    }
    let transferred = transferred as usize;
    if transferred < len {
        return Err(MemoryError::partial(transferred, len));
    }
    Ok(buffer)
}

/// Writes `data` at `addr` in the target process.
///
/// The caller's buffer is copied before the syscall so a racing mutation on
/// another thread cannot change the bytes mid-transfer.
pub fn write_process_memory(pid: Pid, addr: Addr, data: &[u8]) -> MemoryResult<usize> {
    if data.is_empty() {
        return Ok(0);
    }

    let mut staged = data.to_vec();
    let local = iovec {
        iov_base: staged.as_mut_ptr() as *mut c_void,
        iov_len: staged.len(),
    };
    let remote = iovec {
        iov_base: addr.as_u64() as *mut c_void,
        iov_len: staged.len(),
    };

    // SAFETY: same discipline as the read path; `staged` is a private copy
    // owned by this frame for the whole call.
    let transferred =
        unsafe { libc::process_vm_writev(pid as libc::pid_t, &local, 1, &remote, 1, 0) };

    if transferred < 0 {
        return Err(MemoryError::last_os_error());
    }
    let transferred = transferred as usize;
    if transferred < staged.len() {
        return Err(MemoryError::partial(transferred, staged.len()));
    }
    Ok(transferred)
}
