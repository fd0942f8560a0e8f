//! aob-scan command: scan a live process for a byte pattern

use super::hexdump::format_hexdump;
use anyhow::{Context, Result};
use memlens::config::Config;
use memlens::{AobPattern, MemSize, MemoryRead, MemoryScan};

#[cfg(target_os = "linux")]
use memlens::LiveProcess as NativeProcess;
#[cfg(windows)]
use memlens::WindowsProcess as NativeProcess;

/// Bytes of context shown before each match
const CONTEXT_BEFORE: u64 = 16;
/// Bytes of context shown after each match
const CONTEXT_AFTER: u64 = 32;

/// Run the aob-scan command
pub fn run(pid: u32, aob: &str, config: &Config) -> Result<()> {
    let pattern = AobPattern::from_hex_string(aob).context("parsing AOB pattern")?;

    let process = NativeProcess::with_guard(config.address_guard());
    process
        .open(pid)
        .with_context(|| format!("attaching to process {}", pid))?;
    println!("Attached to process {}", pid);
    println!("Scanning for pattern: {}", pattern);

    let mut matches = process.scan_parallel(&pattern, config.scanner.max_workers)?;
    matches.sort();
    println!("Found {} matches:", matches.len());

    for hit in matches {
        println!("\nMatch at {}:", hit);
        let start = memlens::Addr::new(hit.as_u64().saturating_sub(CONTEXT_BEFORE));
        let span = MemSize::new(CONTEXT_BEFORE + pattern.len() as u64 + CONTEXT_AFTER);
        // context straddling a region edge falls back to the match itself
        let (base, bytes) = match process.read_bytes(start, span) {
            Ok(bytes) => (start, bytes),
            Err(_) => (hit, process.read_bytes(hit, MemSize::from(pattern.len()))?),
        };
        print!("{}", format_hexdump(base, &bytes));
    }
    Ok(())
}
