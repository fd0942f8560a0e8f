//! Command-line argument definitions and command dispatch

pub mod aob_scan;
pub mod dump_load;
pub mod dump_save;
pub mod hexdump;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memlens", version, about = "Inspect foreign process memory")]
pub struct Args {
    /// Optional TOML configuration file
    #[arg(long, global = true, default_value = "memlens.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Capture a live process into a snapshot directory
    DumpSave {
        /// Process id to attach to
        #[arg(long)]
        pid: u32,
        /// Output directory for the snapshot
        #[arg(long)]
        output: PathBuf,
        /// Capture oversized regions too
        #[arg(long)]
        all: bool,
    },
    /// Summarise a snapshot directory, optionally hexdumping one range
    DumpLoad {
        /// Directory containing the snapshot
        #[arg(long)]
        from: PathBuf,
        /// Address to read from (hex)
        #[arg(long)]
        addr: Option<String>,
        /// Number of bytes to hexdump
        #[arg(long, default_value_t = 256)]
        size: u64,
    },
    /// Scan a live process for a byte pattern
    AobScan {
        /// Process id to attach to
        #[arg(long)]
        pid: u32,
        /// Pattern of hex bytes or ?? wildcards, comma or space separated
        #[arg(long)]
        aob: String,
    },
}
