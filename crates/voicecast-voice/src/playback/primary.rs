//! Default output device, fed decoded samples.

use async_trait::async_trait;
use voicecast_core::{
    Completion, DeviceDescriptor, OutputChannel, PlaybackInput, PlaybackSink, SinkKind, VoiceError,
};

use crate::output_thread::{OutputThread, ThreadSource};
use crate::playback::DEVICE_POLL_INTERVAL;

/// Plays [`PlaybackInput::Decoded`] audio on the system default output.
///
/// Completion is the clip's declared length, measured on the wall clock
/// from the moment playback starts. The device is not consulted, so the
/// reported end can drift slightly from the moment the hardware drains.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryOutput;

impl PrimaryOutput {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlaybackSink for PrimaryOutput {
    fn kind(&self) -> SinkKind {
        SinkKind::Primary
    }

    async fn open(
        &self,
        input: &PlaybackInput,
        _device: Option<&DeviceDescriptor>,
    ) -> Result<Box<dyn OutputChannel>, VoiceError> {
        let PlaybackInput::Decoded(audio) = input else {
            return Err(VoiceError::InputMismatch {
                sink: SinkKind::Primary.as_str(),
                input: input.label(),
            });
        };

        let source = ThreadSource::Samples {
            channels: audio.channels(),
            sample_rate: audio.sample_rate(),
            samples: audio.samples().to_vec(),
        };
        Ok(Box::new(
            OutputThread::spawn("voicecast-primary", None, source).await?,
        ))
    }

    fn completion(&self, input: &PlaybackInput) -> Completion {
        match input {
            PlaybackInput::Decoded(audio) => Completion::Elapsed(audio.duration()),
            PlaybackInput::Stream(_) => Completion::UntilStopped {
                poll: DEVICE_POLL_INTERVAL,
            },
        }
    }
}
