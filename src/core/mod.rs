//! Core module with shared types and crate metadata

pub mod types;

pub use types::{Addr, AobPattern, MemSize, MemoryError, MemoryResult, Pid};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
