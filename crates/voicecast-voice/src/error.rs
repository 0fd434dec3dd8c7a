//! Internal error types for audio output.
//!
//! These errors are internal to `voicecast-voice` and are mapped to
//! [`VoiceError`] at the port boundary.

use thiserror::Error;
use voicecast_core::VoiceError;

/// Errors raised while opening or driving an output device.
#[derive(Debug, Error)]
pub enum OutputError {
    /// No default output device, or the enumerated one went away.
    #[error("output device not available: {0}")]
    NoDevice(String),

    /// Device enumeration failed.
    #[error("failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    /// The output stream could not be opened.
    #[error("failed to open output stream: {0}")]
    Stream(#[from] rodio::StreamError),

    /// A sink could not be attached to the stream.
    #[error("failed to create playback sink: {0}")]
    Play(#[from] rodio::PlayError),

    /// The device-side WAV reader rejected the payload.
    #[error("device cannot read payload: {0}")]
    Payload(#[from] rodio::decoder::DecoderError),

    /// The output thread could not be started.
    #[error("failed to spawn output thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<OutputError> for VoiceError {
    fn from(err: OutputError) -> Self {
        match err {
            OutputError::NoDevice(_) | OutputError::Stream(rodio::StreamError::NoDevice) => {
                Self::NoOutputDevice
            }
            OutputError::Spawn(e) => Self::Io(e),
            other => Self::OutputStreamError(other.to_string()),
        }
    }
}
