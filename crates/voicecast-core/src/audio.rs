//! Audio payloads moving through the pipeline.

use std::time::Duration;

use bytes::Bytes;

use crate::error::DecodeError;

/// Container format of an encoded payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AudioContainer {
    /// RIFF/WAVE, which both synthesis services produce.
    #[default]
    Wav,
}

impl AudioContainer {
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
        }
    }
}

/// Encoded audio exactly as a synthesis backend returned it.
///
/// Cloning is cheap: the bytes are reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAudio {
    bytes: Bytes,
    container: AudioContainer,
}

impl RawAudio {
    pub fn new(bytes: impl Into<Bytes>, container: AudioContainer) -> Self {
        Self {
            bytes: bytes.into(),
            container,
        }
    }

    /// Shorthand for a WAV payload.
    pub fn wav(bytes: impl Into<Bytes>) -> Self {
        Self::new(bytes, AudioContainer::Wav)
    }

    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub const fn container(&self) -> AudioContainer {
        self.container
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// PCM audio ready for the primary output.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]`. A `DecodedAudio` always
/// holds at least one whole frame, so its duration is strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl DecodedAudio {
    /// Highest channel count the pipeline plays back.
    pub const MAX_CHANNELS: u16 = 2;

    /// Wrap interleaved samples, rejecting buffers that cannot be played.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::UnsupportedFormat`] for zero or more than two channels,
    ///   or a zero sample rate.
    /// - [`DecodeError::NoSamples`] for an empty buffer.
    /// - [`DecodeError::MalformedContainer`] when the sample count is not a
    ///   whole number of frames.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Result<Self, DecodeError> {
        if channels == 0 || channels > Self::MAX_CHANNELS || sample_rate == 0 {
            return Err(DecodeError::UnsupportedFormat {
                channels,
                sample_rate,
            });
        }
        if samples.is_empty() {
            return Err(DecodeError::NoSamples);
        }
        if samples.len() % usize::from(channels) != 0 {
            return Err(DecodeError::MalformedContainer(format!(
                "{} samples do not divide into {channels}-channel frames",
                samples.len()
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of sample frames (samples per channel).
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    /// Playback length.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }
}
