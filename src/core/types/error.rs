//! Custom error types for memlens

use super::address::Addr;
use std::time::Duration;
use thiserror::Error;

/// Main error type for memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("process is not open")]
    ProcessNotOpen,

    #[error("process not found: {0}")]
    ProcessNotFound(u32),

    #[error("invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("address {0} is not mapped")]
    AddressNotMapped(Addr),

    #[error("partial read: {read} of {requested} bytes")]
    Partial { read: usize, requested: usize },

    #[error("backend error: {0}")]
    Backend(#[source] std::io::Error),

    #[error("address {addr} outside captured view [{base}..{base}+{len}]")]
    OutOfView { addr: Addr, base: Addr, len: usize },

    #[error("no blob captured for region at {0}")]
    BlobMissing(Addr),

    #[error("region at {addr} is not writable")]
    NotWritable { addr: Addr },

    #[error("save timed out after {0:?}")]
    Timeout(Duration),

    #[error("empty scan pattern")]
    EmptyPattern,

    #[error("mask length {mask} does not match pattern length {pattern}")]
    MaskMismatch { pattern: usize, mask: usize },

    #[error("invalid pattern format: {0}")]
    InvalidPattern(String),

    #[error("invalid integer scan width: {0}")]
    InvalidScanWidth(u32),

    #[error("required pointer field {0} is null")]
    NullPointer(String),

    #[error("invalid pointer {addr} in field {field}")]
    InvalidPointer { field: String, addr: Addr },

    #[error("schema is not plain-old-data: {0}")]
    SchemaNotPod(String),

    #[error("null pointer at chain step {0}")]
    NullInChain(usize),

    #[error("invalid pointer {addr} at chain step {step}")]
    InvalidInChain { step: usize, addr: Addr },

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Wraps the calling thread's last OS error as a backend failure
    pub fn last_os_error() -> Self {
        MemoryError::Backend(std::io::Error::last_os_error())
    }

    /// Creates a partial-read error
    pub fn partial(read: usize, requested: usize) -> Self {
        MemoryError::Partial { read, requested }
    }

    /// Creates an invalid-pointer error for a named record field
    pub fn invalid_pointer(field: impl Into<String>, addr: Addr) -> Self {
        MemoryError::InvalidPointer {
            field: field.into(),
            addr,
        }
    }

    /// Creates an invalid-in-chain error for a dereference step
    pub fn invalid_in_chain(step: usize, addr: Addr) -> Self {
        MemoryError::InvalidInChain { step, addr }
    }
}
