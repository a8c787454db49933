//! keepsync CLI - sync Google Keep with a directory of text files.
//!
//! Usage:
//!   keepsync --download   - write every note and list to disk
//!   keepsync --upload     - push checklist edits from .todo files
//!   keepsync -d -u        - both, upload first

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keepsync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    cli::commands::run(&cli)
}
