use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "workspace-monitor",
    version,
    about = "Keep a markdown note of what today's Claude Code sessions are working on"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh the output document once and exit.
    Once,
    /// Print the document to stdout without touching the output file.
    Print,
    /// Print resolved paths and whether a monitor is already running.
    Status,
    /// Check that the Claude directory, history and output location are usable.
    Doctor,
}
