//! Command implementations for the keepsync CLI.

use crate::cli::Cli;
use anyhow::Result;
use colored::Colorize;
use keepsync::config::locate_config;
use keepsync::{download, open_session, upload, Config, KeepClient, KeyringTokenStore};
use tracing::debug;

/// Run the requested directions. Upload goes first so a combined run
/// pushes local list edits before download overwrites the files.
pub fn run(cli: &Cli) -> Result<()> {
    if !cli.has_work() {
        debug!("Neither --download nor --upload given, nothing to do");
        return Ok(());
    }

    let config_path = locate_config();
    debug!("Using config {}", config_path.display());
    let config = Config::load(&config_path)?;

    let mut client = KeepClient::new(&config.android_id());
    open_session(&config, &KeyringTokenStore::new(), &mut client)?;

    if cli.upload {
        println!("{}", "Uploading list changes...".cyan());
        let report = upload(&mut client, config.notes_root())?;
        println!("  {} {}", "✓".green(), report.summary());
    }

    if cli.download {
        println!("{}", "Downloading notes...".cyan());
        let report = download(&client, config.notes_root())?;
        println!("  {} Saved {}", "✓".green(), report.summary());
    }

    Ok(())
}
