//! Explicitly selected output device, fed the raw WAV stream.

use std::time::Duration;

use async_trait::async_trait;
use voicecast_core::{
    Completion, DeviceDescriptor, OutputChannel, PlaybackInput, PlaybackSink, SinkKind, VoiceError,
};

use crate::output_thread::{OutputThread, ThreadSource};

/// Plays [`PlaybackInput::Stream`] payloads on a chosen device and reports
/// completion when the device says it has stopped.
#[derive(Debug, Clone, Copy)]
pub struct SecondaryOutput {
    poll: Duration,
}

impl SecondaryOutput {
    pub const fn new(poll: Duration) -> Self {
        Self { poll }
    }
}

#[async_trait]
impl PlaybackSink for SecondaryOutput {
    fn kind(&self) -> SinkKind {
        SinkKind::Secondary
    }

    async fn open(
        &self,
        input: &PlaybackInput,
        device: Option<&DeviceDescriptor>,
    ) -> Result<Box<dyn OutputChannel>, VoiceError> {
        let PlaybackInput::Stream(raw) = input else {
            return Err(VoiceError::InputMismatch {
                sink: SinkKind::Secondary.as_str(),
                input: input.label(),
            });
        };

        tracing::debug!(
            device = device.map_or("default", |d| d.name.as_str()),
            bytes = raw.len(),
            "Opening secondary output"
        );
        let source = ThreadSource::Wav(raw.bytes().clone());
        Ok(Box::new(OutputThread::spawn(
            "voicecast-secondary",
            device.map(|d| d.id.clone()),
            source,
        )
        .await?))
    }

    fn completion(&self, _input: &PlaybackInput) -> Completion {
        Completion::UntilStopped { poll: self.poll }
    }
}
