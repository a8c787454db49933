//! CLI definitions and command implementations for keepsync.

pub mod commands;

use clap::Parser;

/// Sync between Google Keep and local files
#[derive(Parser)]
#[command(name = "keepsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Download and save notes as files
    #[arg(short, long)]
    pub download: bool,

    /// Sync changes to local list files with Google Keep
    #[arg(short, long)]
    pub upload: bool,
}

impl Cli {
    pub fn has_work(&self) -> bool {
        self.download || self.upload
    }
}
