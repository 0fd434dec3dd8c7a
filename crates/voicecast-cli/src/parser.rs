//! Main CLI parser and top-level argument handling.
//!
//! Endpoint and timeout options are global so they can follow any subcommand.

use clap::Parser;
use voicecast_core::{DEFAULT_CLOUD_ENDPOINT, DEFAULT_LOCAL_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};

use crate::commands::Commands;

/// Speak text through a network voice engine.
#[derive(Debug, Parser)]
#[command(name = "voicecast")]
#[command(about = "Synthesize speech with a network voice engine and play it")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Base URL of the local query/synthesis engine
    #[arg(
        long = "base-url",
        env = "VOICECAST_BASE_URL",
        global = true,
        default_value = DEFAULT_LOCAL_BASE_URL
    )]
    pub base_url: String,

    /// Endpoint of the cloud style-coordinate service
    #[arg(
        long = "cloud-endpoint",
        env = "VOICECAST_CLOUD_ENDPOINT",
        global = true,
        default_value = DEFAULT_CLOUD_ENDPOINT
    )]
    pub cloud_endpoint: String,

    /// Per-request timeout in seconds
    #[arg(
        long = "timeout-secs",
        env = "VOICECAST_TIMEOUT_SECS",
        global = true,
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
