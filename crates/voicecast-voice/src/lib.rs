#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod decoder;
pub mod devices;
pub mod error;
pub mod output_thread;
pub mod pipeline;
pub mod playback;

// Re-export commonly used types
pub use decoder::{DECODE_BLOCK_FRAMES, WavDecoder, check_wav_header, decode_wav};
pub use devices::CpalDeviceCatalog;
pub use error::OutputError;
pub use output_thread::{OutputThread, ThreadSource};
pub use pipeline::{PipelineStage, PipelineState, SpeechEvent, SpeechOrchestrator};
pub use playback::{
    DEVICE_POLL_INTERVAL, PlaybackHandle, PrimaryOutput, SecondaryOutput, build_sinks,
};

// Dev-dependencies only referenced from integration tests
#[cfg(test)]
use axum as _;
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use url as _;
#[cfg(test)]
use voicecast_synth as _;
