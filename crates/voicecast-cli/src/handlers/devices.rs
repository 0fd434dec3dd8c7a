//! Devices command handler.

use anyhow::{Context, Result};

use crate::bootstrap::{bootstrap, speech_settings};
use crate::error::CliError;
use crate::parser::Cli;

/// List output devices with the indexes `--device` expects.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut ctx = bootstrap(&speech_settings(cli, None))?;
    let devices = ctx
        .orchestrator
        .refresh_devices()
        .map_err(CliError::from)
        .context("Failed to enumerate output devices")?;

    if devices.is_empty() {
        println!("No output devices found.");
        return Ok(());
    }

    println!("Found {} output device(s):\n", devices.len());
    for device in devices {
        println!("  {device}");
    }
    println!("\nUse 'voicecast speak <TEXT> --sink secondary --device <INDEX>' to play on one.");
    Ok(())
}
