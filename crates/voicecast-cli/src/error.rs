//! CLI-specific error types and mappings.
//!
//! Maps pipeline errors and outcomes to exit codes and user-facing messages.

use thiserror::Error;
use voicecast_core::{Outcome, SettingsError, VoiceError};

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument error, such as an unknown device index.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stage failed in a way that may succeed on retry.
    #[error("Temporarily unavailable: {0}")]
    Retryable(String),

    /// A stage failed for good.
    #[error("Speech failed: {0}")]
    Failure(String),

    /// Interrupted by the user.
    #[error("Cancelled")]
    Cancelled,

    /// No usable audio output.
    #[error("Audio output error: {0}")]
    Device(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// A pipeline invariant was broken.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    /// - 130: Terminated by Ctrl-C
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Failure(_) => 1,
            Self::Arguments(_) => 2,
            Self::Device(_) => 69,    // EX_UNAVAILABLE
            Self::Internal(_) => 70,  // EX_SOFTWARE
            Self::Io(_) => 74,        // EX_IOERR
            Self::Retryable(_) => 75, // EX_TEMPFAIL
            Self::Config(_) => 78,    // EX_CONFIG
            Self::Cancelled => 130,
        }
    }

    /// Turn a non-success outcome into an error.
    pub fn check(outcome: Outcome<()>) -> Result<(), Self> {
        match outcome {
            Outcome::Success(()) => Ok(()),
            Outcome::Retryable(reason) => Err(Self::Retryable(reason)),
            Outcome::Failure(reason) => Err(Self::Failure(reason)),
        }
    }
}

impl From<VoiceError> for CliError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::Cancelled => Self::Cancelled,
            VoiceError::DeviceNotFound { .. } | VoiceError::ParameterMismatch { .. } => {
                Self::Arguments(err.to_string())
            }
            VoiceError::InvalidSettings(msg) => Self::Config(msg),
            VoiceError::NoOutputDevice
            | VoiceError::OutputStreamError(_)
            | VoiceError::AudioThreadDied => Self::Device(err.to_string()),
            VoiceError::Io(e) => Self::Io(e.to_string()),
            VoiceError::NotBound
            | VoiceError::HandleSpent(_)
            | VoiceError::InputMismatch { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Exit code for an error surfaced by a handler.
///
/// Errors that did not originate as a [`CliError`] exit with 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
}

/// Line printed to stderr for an error surfaced by a handler.
///
/// A user interrupt is not an error and gets a plain notice.
pub fn report(err: &anyhow::Error) -> String {
    match err.downcast_ref::<CliError>() {
        Some(CliError::Cancelled) => "Cancelled.".to_string(),
        _ => format!("Error: {err:#}"),
    }
}
