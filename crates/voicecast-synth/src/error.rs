//! Error types for the HTTP synthesis backends.
//!
//! These errors are internal to `voicecast-synth` and are mapped to an
//! [`Outcome`] (or a cancellation) at the port boundary by
//! [`SynthError::into_outcome`].

use thiserror::Error;
use voicecast_core::{Outcome, VoiceError};

/// Result type alias for synthesis requests.
pub type SynthResult<T> = Result<T, SynthError>;

/// Longest error body kept for log messages.
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors raised while talking to a synthesis service.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Service answered with a non-success status.
    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
        /// Start of the response body, if any
        body: String,
    },

    /// Network or HTTP client error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Service returned something other than what it documents.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedded audio was not valid base64.
    #[error("invalid base64 audio: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Configured URL cannot carry the endpoint path.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The caller's token fired while the request was in flight.
    #[error("request cancelled")]
    Cancelled,
}

impl SynthError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Network(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            Self::InvalidResponse(_)
            | Self::Json(_)
            | Self::Base64(_)
            | Self::InvalidUrl(_)
            | Self::Cancelled => false,
        }
    }

    /// Classify into the port's three-way result.
    ///
    /// Cancellation is the one case that leaves the `Ok` side.
    pub fn into_outcome<T>(self) -> Result<Outcome<T>, VoiceError> {
        if matches!(self, Self::Cancelled) {
            return Err(VoiceError::Cancelled);
        }
        if self.is_retryable() {
            Ok(Outcome::Retryable(self.to_string()))
        } else {
            Ok(Outcome::Failure(self.to_string()))
        }
    }
}

/// Request timeout, rate limiting and server-side errors.
pub(crate) const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// Keep the first [`MAX_ERROR_BODY_CHARS`] characters of an error body.
pub(crate) fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
