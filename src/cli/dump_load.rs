//! dump-load command: summarise a snapshot, optionally hexdump a range

use super::hexdump::format_hexdump;
use anyhow::{Context, Result};
use memlens::config::Config;
use memlens::{Addr, MemSize, MemoryRead, Process, SnapshotProcess};
use std::path::Path;
use std::str::FromStr;

/// Run the dump-load command
pub fn run(from: &Path, addr: Option<&str>, size: u64, config: &Config) -> Result<()> {
    let snapshot = SnapshotProcess::load_with_guard(from, config.address_guard())
        .with_context(|| format!("loading snapshot from {}", from.display()))?;

    println!("Loaded snapshot from {}", from.display());
    if let Some(name) = snapshot.name() {
        println!("Process name: {}", name);
    }
    println!("PID: {}", snapshot.pid()?);
    let regions = snapshot.memory_map()?;
    println!("Memory regions: {} ({} with blobs)", regions.len(), snapshot.blob_count());

    let Some(addr) = addr else {
        println!("\nMemory map:");
        for region in &regions {
            println!("  {}", region);
        }
        return Ok(());
    };

    let addr = Addr::from_str(addr).with_context(|| format!("parsing address {}", addr))?;
    let bytes = snapshot
        .read_bytes(addr, MemSize::new(size))
        .with_context(|| format!("reading {} bytes at {}", size, addr))?;
    print!("{}", format_hexdump(addr, &bytes));
    Ok(())
}
