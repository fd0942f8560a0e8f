//! Core type definitions shared by every backend

pub mod address;
pub mod error;
pub mod pattern;

pub use address::{Addr, MemSize};
pub use error::{MemoryError, MemoryResult};
pub use pattern::AobPattern;

/// Process identifier of a target process
pub type Pid = u32;
