//! dump-save command: capture a live process into a snapshot directory

use anyhow::{Context, Result};
use memlens::config::Config;
use memlens::Process;
use std::path::Path;

#[cfg(target_os = "linux")]
use memlens::LiveProcess as NativeProcess;
#[cfg(windows)]
use memlens::WindowsProcess as NativeProcess;

/// Run the dump-save command
pub fn run(pid: u32, output: &Path, all: bool, config: &Config) -> Result<()> {
    let process = NativeProcess::with_guard(config.address_guard());
    process
        .open(pid)
        .with_context(|| format!("attaching to process {}", pid))?;
    println!("Attached to process {}", pid);

    let mut options = config.save_options();
    options.include_large |= all;

    println!("Saving snapshot to {}...", output.display());
    let stats = process
        .save(output, &options)
        .with_context(|| format!("saving snapshot to {}", output.display()))?;

    println!("Snapshot saved: {}", stats);
    Ok(())
}
