#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;

// Re-export primary types for convenient access
pub use bootstrap::{CliContext, bootstrap, cancel_on_ctrl_c, speech_settings};
pub use commands::{BackendArg, Commands, SinkArg, SpeakArgs};
pub use error::{CliError, exit_code, report};
pub use parser::Cli;
