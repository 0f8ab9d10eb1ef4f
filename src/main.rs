use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use workspace_monitor::app;
use workspace_monitor::cli::{Cli, Commands};
use workspace_monitor::config::{self, MonitorConfig};
use workspace_monitor::util::setup_tracing;

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("workspace-monitor error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<u8> {
    config::load_local_env();
    setup_tracing();
    let cli = Cli::parse();
    let config = MonitorConfig::from_env();

    match cli.command {
        Some(Commands::Once) => Ok(if app::run_once(config)? { 0 } else { 1 }),
        Some(Commands::Print) => {
            app::print_document(config)?;
            Ok(0)
        }
        Some(Commands::Status) => {
            app::print_status(&config)?;
            Ok(0)
        }
        Some(Commands::Doctor) => app::doctor(&config),
        None => {
            app::run(config)?;
            Ok(0)
        }
    }
}
