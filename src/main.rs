mod cli;

use clap::Parser;
use cli::{Args, Command};
use memlens::config::{load_config, validate_config};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // help and version land on stdout and exit cleanly; real usage
            // errors exit 1
            let failed = err.use_stderr();
            let _ = err.print();
            std::process::exit(if failed { 1 } else { 0 });
        }
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memlens=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let result = (|| -> anyhow::Result<()> {
        let config = load_config(&args.config)?;
        validate_config(&config)?;

        match &args.command {
            Command::DumpSave { pid, output, all } => {
                cli::dump_save::run(*pid, output, *all, &config)
            }
            Command::DumpLoad { from, addr, size } => {
                cli::dump_load::run(from, addr.as_deref(), *size, &config)
            }
            Command::AobScan { pid, aob } => cli::aob_scan::run(*pid, aob, &config),
        }
    })();

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
