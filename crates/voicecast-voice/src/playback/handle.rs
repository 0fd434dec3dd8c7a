//! Playback handle state machine.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use voicecast_core::{
    Completion, DeviceDescriptor, OutputChannel, PlaybackInput, PlaybackSink, PlaybackState,
    SinkKind, VoiceError,
};

/// Live binding of one sink to one payload.
///
/// A handle plays at most once. After reaching a terminal state it only
/// accepts `stop()` (a no-op) and is meant to be discarded.
pub struct PlaybackHandle {
    sink: Arc<dyn PlaybackSink>,
    state: PlaybackState,
    channel: Option<Box<dyn OutputChannel>>,
    completion: Option<Completion>,
}

impl PlaybackHandle {
    pub fn new(sink: Arc<dyn PlaybackSink>) -> Self {
        Self {
            sink,
            state: PlaybackState::Idle,
            channel: None,
            completion: None,
        }
    }

    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn sink_kind(&self) -> SinkKind {
        self.sink.kind()
    }

    /// Open the sink for `input`, leaving the channel paused.
    ///
    /// Binding again before playing replaces the previous binding.
    pub async fn bind(
        &mut self,
        input: &PlaybackInput,
        device: Option<&DeviceDescriptor>,
    ) -> Result<(), VoiceError> {
        match self.state {
            PlaybackState::Idle => {}
            PlaybackState::Bound => self.release(),
            other => return Err(VoiceError::HandleSpent(other)),
        }

        let channel = self.sink.open(input, device).await?;
        self.completion = Some(self.sink.completion(input));
        self.channel = Some(channel);
        self.transition(PlaybackState::Bound);
        Ok(())
    }

    /// Start playback and wait until it completes or `cancel` fires.
    ///
    /// The channel is stopped exactly once before this returns, whichever
    /// way the wait ended.
    pub async fn play_to_completion(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<PlaybackState, VoiceError> {
        match self.state {
            PlaybackState::Bound => {}
            PlaybackState::Idle => return Err(VoiceError::NotBound),
            other => return Err(VoiceError::HandleSpent(other)),
        }
        let (Some(channel), Some(completion)) = (self.channel.as_deref(), self.completion) else {
            return Err(VoiceError::NotBound);
        };

        if cancel.is_cancelled() {
            channel.stop();
            self.finish(PlaybackState::Cancelled);
            return Ok(PlaybackState::Cancelled);
        }

        if let Err(e) = channel.play() {
            channel.stop();
            self.finish(PlaybackState::Stopped);
            return Err(e);
        }
        self.state = PlaybackState::Playing;
        debug!(sink = %self.sink.kind(), ?completion, "Playback started");

        let finished = tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            () = wait_for(channel, completion) => true,
        };
        channel.stop();

        let terminal = if finished {
            PlaybackState::Completed
        } else {
            PlaybackState::Cancelled
        };
        self.finish(terminal);
        Ok(terminal)
    }

    /// Halt or release, depending on state. Never fails.
    ///
    /// - `Bound`: the binding is released and the handle returns to `Idle`
    /// - `Playing`: the channel is stopped and the handle ends `Stopped`
    /// - otherwise nothing happens
    pub fn stop(&mut self) {
        match self.state {
            PlaybackState::Bound => {
                self.release();
                self.transition(PlaybackState::Idle);
            }
            PlaybackState::Playing => {
                if let Some(channel) = self.channel.take() {
                    channel.stop();
                }
                self.finish(PlaybackState::Stopped);
            }
            PlaybackState::Idle
            | PlaybackState::Completed
            | PlaybackState::Cancelled
            | PlaybackState::Stopped => {}
        }
    }

    fn release(&mut self) {
        self.channel = None;
        self.completion = None;
    }

    fn finish(&mut self, terminal: PlaybackState) {
        self.release();
        self.transition(terminal);
    }

    fn transition(&mut self, next: PlaybackState) {
        debug!(
            sink = %self.sink.kind(),
            from = %self.state,
            to = %next,
            "Playback state transition"
        );
        self.state = next;
    }
}

async fn wait_for(channel: &dyn OutputChannel, completion: Completion) {
    match completion {
        Completion::Elapsed(length) => tokio::time::sleep(length).await,
        Completion::UntilStopped { poll } => {
            let mut ticker = tokio::time::interval(poll);
            loop {
                ticker.tick().await;
                if channel.is_finished() {
                    break;
                }
            }
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        // A dropped wait leaves the handle Playing; never leave hardware running.
        if self.state == PlaybackState::Playing {
            if let Some(channel) = self.channel.take() {
                channel.stop();
            }
        }
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("sink", &self.sink.kind())
            .field("state", &self.state)
            .field("completion", &self.completion)
            .finish_non_exhaustive()
    }
}
