#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod audio;
pub mod device;
pub mod error;
pub mod kinds;
pub mod outcome;
pub mod params;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use audio::{AudioContainer, DecodedAudio, RawAudio};
pub use device::DeviceDescriptor;
pub use error::{DecodeError, VoiceError};
pub use kinds::{BackendKind, SinkChoice, SinkKind};
pub use outcome::{Outcome, OutcomeKind};
pub use params::{
    CloudVoiceParams, LocalVoiceParams, STYLE_COORDINATE_LIMIT, Style, VoiceParameters,
};
pub use ports::{
    AudioDecoder, Backends, Completion, DeviceCatalog, OutputChannel, PlaybackInput,
    PlaybackSink, PlaybackState, Sinks, SynthesisBackend,
};
pub use settings::{
    DEFAULT_CLOUD_ENDPOINT, DEFAULT_LOCAL_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS, SettingsError,
    SpeechSettings, validate_settings,
};

// Dev-dependencies only referenced from some test modules
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tokio as _;
