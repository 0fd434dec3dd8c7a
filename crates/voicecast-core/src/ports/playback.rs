//! Playback ports: sinks, the output channels they open, and device listing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::audio::{DecodedAudio, RawAudio};
use crate::device::DeviceDescriptor;
use crate::error::VoiceError;
use crate::kinds::SinkKind;

// ── Handle state ───────────────────────────────────────────────────

/// Lifecycle of one playback handle.
///
/// ```text
/// Idle → Bound → Playing → { Completed | Cancelled | Stopped }
/// ```
///
/// Terminal states never lead back to `Playing`; a new request gets a new
/// handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    Idle,
    Bound,
    Playing,
    Completed,
    Cancelled,
    Stopped,
}

impl PlaybackState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Stopped)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Bound => "bound",
            Self::Playing => "playing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Stopped => "stopped",
        })
    }
}

/// How a handle decides that playback has finished on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Wait for the declared clip length. This is wall-clock time and may drift
    /// slightly from the moment the hardware actually drains.
    Elapsed(Duration),

    /// Poll [`OutputChannel::is_finished`] at the given interval.
    UntilStopped { poll: Duration },
}

/// What a sink is asked to play.
#[derive(Debug, Clone)]
pub enum PlaybackInput {
    /// Samples already decoded (primary output).
    Decoded(Arc<DecodedAudio>),

    /// The encoded payload, read as a stream by the device (secondary output).
    Stream(RawAudio),
}

impl PlaybackInput {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Decoded(_) => "decoded",
            Self::Stream(_) => "stream",
        }
    }
}

// ── Ports ──────────────────────────────────────────────────────────

/// An opened, paused binding between a sink and one payload.
///
/// Methods are called from async code and must never block: they hand the
/// request to whatever thread owns the device and return.
pub trait OutputChannel: Send + Sync {
    /// Start playback.
    ///
    /// # Errors
    ///
    /// Fails only when the device side is already gone.
    fn play(&self) -> Result<(), VoiceError>;

    /// Halt playback. Safe to call more than once.
    fn stop(&self);

    /// Whether the device has drained or been stopped.
    fn is_finished(&self) -> bool;
}

/// A class of audio output.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    fn kind(&self) -> SinkKind;

    /// Open a paused channel for `input`.
    ///
    /// `device` is only meaningful to sinks that address devices explicitly.
    ///
    /// # Errors
    ///
    /// [`VoiceError::InputMismatch`] when the input form is not one this sink
    /// plays; device errors when the output cannot be opened.
    async fn open(
        &self,
        input: &PlaybackInput,
        device: Option<&DeviceDescriptor>,
    ) -> Result<Box<dyn OutputChannel>, VoiceError>;

    /// Completion rule for `input` on this sink.
    fn completion(&self, input: &PlaybackInput) -> Completion;
}

/// Enumerates output devices on request.
pub trait DeviceCatalog: Send + Sync {
    fn output_devices(&self) -> Result<Vec<DeviceDescriptor>, VoiceError>;
}

/// One instance of every sink, selected by [`SinkKind`].
#[derive(Clone)]
pub struct Sinks {
    primary: Arc<dyn PlaybackSink>,
    secondary: Arc<dyn PlaybackSink>,
}

impl Sinks {
    pub fn new(primary: Arc<dyn PlaybackSink>, secondary: Arc<dyn PlaybackSink>) -> Self {
        Self { primary, secondary }
    }

    #[must_use]
    pub fn select(&self, kind: SinkKind) -> &Arc<dyn PlaybackSink> {
        match kind {
            SinkKind::Primary => &self.primary,
            SinkKind::Secondary => &self.secondary,
        }
    }
}

impl fmt::Debug for Sinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sinks")
            .field("primary", &self.primary.kind())
            .field("secondary", &self.secondary.kind())
            .finish()
    }
}
