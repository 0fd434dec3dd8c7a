//! Port definitions (trait abstractions) for the pipeline's collaborators.
//!
//! Ports define what the orchestrator expects from synthesis services, the
//! decoder and audio outputs. They use only domain types; HTTP clients and
//! audio devices live in the adapter crates.
//!
//! # Design Rules
//!
//! - Every long-running method takes a `CancellationToken`
//! - Environmental failures return an [`Outcome`](crate::Outcome), contract
//!   violations and cancellation return `Err`
//! - Selection between implementations is an exhaustive `match`, never a
//!   string lookup

pub mod decoder;
pub mod playback;
pub mod synthesis;

pub use decoder::AudioDecoder;
pub use playback::{
    Completion, DeviceCatalog, OutputChannel, PlaybackInput, PlaybackSink, PlaybackState, Sinks,
};
pub use synthesis::{Backends, SynthesisBackend};
