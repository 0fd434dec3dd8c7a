//! Speech pipeline error types.
//!
//! [`VoiceError`] covers cancellation, local contract violations and local
//! device trouble. Environmental failures of a stage (a busy server, a bad
//! payload) are *not* errors: they are reported through
//! [`Outcome`](crate::Outcome).

use crate::kinds::BackendKind;
use crate::ports::PlaybackState;

/// Errors that can occur in the speech pipeline.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// The caller's cancellation signal fired.
    #[error("Speech operation cancelled")]
    Cancelled,

    /// `play_to_completion` was called on a handle with nothing bound.
    #[error("Playback handle has no input bound")]
    NotBound,

    /// The handle already played (or is playing) and cannot be reused.
    #[error("Playback handle already used (state: {0})")]
    HandleSpent(PlaybackState),

    /// No output device at the requested index.
    #[error("No output device at index {index} ({available} available)")]
    DeviceNotFound { index: usize, available: usize },

    /// A sink was handed an input form it does not accept.
    #[error("{sink} output cannot play {input} input")]
    InputMismatch {
        sink: &'static str,
        input: &'static str,
    },

    /// Voice parameters do not belong to the selected backend.
    #[error("{backend} backend cannot use {given} voice parameters")]
    ParameterMismatch {
        backend: BackendKind,
        given: BackendKind,
    },

    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// No audio output device available.
    #[error("No audio output device found")]
    NoOutputDevice,

    /// Failed to open audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStreamError(String),

    /// The thread owning an output stream is gone.
    #[error("Audio output thread died")]
    AudioThreadDied,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Caller mistakes as opposed to environmental or device trouble.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::NotBound
                | Self::HandleSpent(_)
                | Self::DeviceNotFound { .. }
                | Self::InputMismatch { .. }
                | Self::ParameterMismatch { .. }
                | Self::InvalidSettings(_)
        )
    }
}

/// Reasons a payload could not be turned into playable samples.
///
/// The decoder reports these as a `Failure` outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Payload was zero bytes long.
    #[error("audio payload is empty")]
    Empty,

    /// Container header or chunk layout is broken or truncated.
    #[error("malformed audio container: {0}")]
    MalformedContainer(String),

    /// Well-formed container with a layout the output cannot play.
    #[error("unsupported audio format: {channels} channel(s) at {sample_rate} Hz")]
    UnsupportedFormat { channels: u16, sample_rate: u32 },

    /// Sample encoding (bit depth or format tag) is not supported.
    #[error("unsupported sample encoding: {0}")]
    UnsupportedEncoding(String),

    /// The container holds no sample frames.
    #[error("audio payload holds no samples")]
    NoSamples,
}
