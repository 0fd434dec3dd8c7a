//! Speech orchestrator: synthesis → decode → playback for one utterance at a time.
//!
//! ```text
//!  Idle ──run──▶ Synthesizing ──▶ Decoding ──▶ Playing ──▶ Idle
//!                     │               │           │
//!                     └─── setback ───┴─ cancel ──┴──────▶ Idle
//! ```
//!
//! The orchestrator owns the current audio and the live playback handle.
//! New audio replaces the current audio only once its output is open, so a
//! setback at any stage leaves the previous utterance available to
//! [`SpeechOrchestrator::replay`]. A new run always releases the old handle
//! first.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use voicecast_core::{
    AudioDecoder, BackendKind, Backends, DeviceCatalog, DeviceDescriptor, Outcome, OutcomeKind,
    PlaybackInput, PlaybackState, SinkChoice, SinkKind, Sinks, VoiceError, VoiceParameters,
};

use crate::playback::PlaybackHandle;

// ── Events ─────────────────────────────────────────────────────────

/// Coarse pipeline state, reported through [`SpeechEvent::StateChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Synthesizing,
    Decoding,
    Playing,
}

/// Stage a run halted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Synthesis,
    Decode,
    Playback,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Synthesis => "synthesis",
            Self::Decode => "decode",
            Self::Playback => "playback",
        })
    }
}

/// Events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    /// Pipeline state changed.
    StateChanged(PipelineState),

    /// A backend returned audio.
    Synthesized { backend: BackendKind, bytes: usize },

    /// Audio was decoded for the primary output.
    Decoded {
        sample_rate: u32,
        channels: u16,
        duration: Duration,
    },

    /// A playback handle reached a terminal state.
    PlaybackFinished(PlaybackState),

    /// A stage reported a retryable or terminal failure.
    Halted {
        stage: PipelineStage,
        kind: OutcomeKind,
        reason: String,
    },

    /// The run was cancelled.
    Cancelled,
}

// ── Orchestrator ───────────────────────────────────────────────────

/// Audio ready to (re)play, with where it was played.
#[derive(Debug, Clone)]
struct CurrentAudio {
    input: PlaybackInput,
    backend: BackendKind,
    sink: SinkKind,
    device: Option<DeviceDescriptor>,
}

/// Sequences one utterance at a time through backend, decoder and sink.
pub struct SpeechOrchestrator {
    backends: Backends,
    decoder: Arc<dyn AudioDecoder>,
    sinks: Sinks,
    catalog: Arc<dyn DeviceCatalog>,

    /// Devices as of the last explicit refresh.
    devices: Vec<DeviceDescriptor>,

    /// Most recent successfully prepared audio.
    current: Option<CurrentAudio>,

    /// At most one live handle.
    active: Option<PlaybackHandle>,

    state: PipelineState,
    event_tx: mpsc::UnboundedSender<SpeechEvent>,
}

impl SpeechOrchestrator {
    /// Create an orchestrator.
    ///
    /// Returns the orchestrator and a receiver for [`SpeechEvent`]s.
    pub fn new(
        backends: Backends,
        decoder: Arc<dyn AudioDecoder>,
        sinks: Sinks,
        catalog: Arc<dyn DeviceCatalog>,
    ) -> (Self, mpsc::UnboundedReceiver<SpeechEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            backends,
            decoder,
            sinks,
            catalog,
            devices: Vec::new(),
            current: None,
            active: None,
            state: PipelineState::Idle,
            event_tx,
        };
        (orchestrator, event_rx)
    }

    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// Devices captured by the last [`refresh_devices`](Self::refresh_devices).
    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Re-enumerate output devices. Never called implicitly.
    pub fn refresh_devices(&mut self) -> Result<&[DeviceDescriptor], VoiceError> {
        self.devices = self.catalog.output_devices()?;
        info!(count = self.devices.len(), "Output devices refreshed");
        Ok(&self.devices)
    }

    /// Whether there is audio for [`replay`](Self::replay).
    pub const fn has_audio(&self) -> bool {
        self.current.is_some()
    }

    /// Synthesize `text`, prepare it for `sink` and play it to the end.
    ///
    /// # Returns
    ///
    /// - `Ok(Outcome::Success(()))` once playback reached a terminal state
    /// - `Ok(Outcome::Retryable | Outcome::Failure)` when a stage failed; the
    ///   previous audio is left untouched
    /// - `Err(VoiceError::Cancelled)` when `cancel` fired at any point
    /// - `Err(..)` for contract violations such as an unknown device index
    pub async fn run(
        &mut self,
        text: &str,
        backend: BackendKind,
        sink: SinkChoice,
        params: &VoiceParameters,
        cancel: &CancellationToken,
    ) -> Result<Outcome<()>, VoiceError> {
        let device = self.resolve_device(sink)?;
        let sink_kind = sink.kind();
        if cancel.is_cancelled() {
            return Err(self.abort(VoiceError::Cancelled));
        }

        // A handle left Playing by an abandoned run is stopped before anything else.
        self.release_handle();

        info!(
            backend = %backend,
            sink = %sink_kind,
            chars = text.chars().count(),
            "Speech run started"
        );
        self.set_state(PipelineState::Synthesizing);
        let synthesizer = Arc::clone(self.backends.select(backend));
        let synthesized = match synthesizer.synthesize(text, params, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.abort(e)),
        };
        let raw = match self.settle(PipelineStage::Synthesis, backend, sink_kind, synthesized) {
            Ok(raw) => raw,
            Err(halted) => return Ok(halted),
        };
        self.emit(SpeechEvent::Synthesized {
            backend,
            bytes: raw.len(),
        });

        if cancel.is_cancelled() {
            return Err(self.abort(VoiceError::Cancelled));
        }

        let input = match sink_kind {
            SinkKind::Primary => {
                self.set_state(PipelineState::Decoding);
                let decoder = Arc::clone(&self.decoder);
                let decoded = match decoder.decode(raw, cancel).await {
                    Ok(outcome) => outcome,
                    Err(e) => return Err(self.abort(e)),
                };
                let audio = match self.settle(PipelineStage::Decode, backend, sink_kind, decoded) {
                    Ok(audio) => audio,
                    Err(halted) => return Ok(halted),
                };
                self.emit(SpeechEvent::Decoded {
                    sample_rate: audio.sample_rate(),
                    channels: audio.channels(),
                    duration: audio.duration(),
                });
                PlaybackInput::Decoded(Arc::new(audio))
            }
            SinkKind::Secondary => {
                // Streamed as-is, so only the header is checked here.
                let checked = self.decoder.validate(&raw);
                if let Err(halted) = self.settle(PipelineStage::Decode, backend, sink_kind, checked)
                {
                    return Ok(halted);
                }
                PlaybackInput::Stream(raw)
            }
        };

        if cancel.is_cancelled() {
            return Err(self.abort(VoiceError::Cancelled));
        }

        let audio = CurrentAudio {
            input,
            backend,
            sink: sink_kind,
            device,
        };
        self.play(audio, cancel).await
    }

    /// Play the current audio again on the sink (and device) it last used.
    ///
    /// With no audio this logs and succeeds without doing anything.
    pub async fn replay(&mut self, cancel: &CancellationToken) -> Result<Outcome<()>, VoiceError> {
        let Some(audio) = self.current.clone() else {
            info!("No audio clip to replay");
            return Ok(Outcome::Success(()));
        };
        if cancel.is_cancelled() {
            return Err(self.abort(VoiceError::Cancelled));
        }
        self.release_handle();
        self.play(audio, cancel).await
    }

    /// Stop playback and drop the current audio.
    pub fn release_playback(&mut self) {
        self.release_handle();
        if self.current.take().is_some() {
            debug!("Current audio released");
        }
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Open an output for `audio`, make it the current audio and play it.
    ///
    /// An open failure leaves the current audio as it was.
    async fn play(
        &mut self,
        audio: CurrentAudio,
        cancel: &CancellationToken,
    ) -> Result<Outcome<()>, VoiceError> {
        let sink = Arc::clone(self.sinks.select(audio.sink));
        self.set_state(PipelineState::Playing);

        let mut handle = PlaybackHandle::new(sink);
        if let Err(e) = handle.bind(&audio.input, audio.device.as_ref()).await {
            return self.playback_setback(e, audio.backend, audio.sink);
        }

        let (sink, backend, input) = (audio.sink, audio.backend, audio.input.label());
        if self.current.replace(audio).is_some() {
            debug!("Current audio replaced");
        }
        let played = self.active.insert(handle).play_to_completion(cancel).await;
        // Terminal or failed: the handle is done either way.
        self.active = None;

        match played {
            Ok(PlaybackState::Cancelled) => {
                self.emit(SpeechEvent::PlaybackFinished(PlaybackState::Cancelled));
                Err(self.abort(VoiceError::Cancelled))
            }
            Ok(state) => {
                info!(sink = %sink, input, state = %state, "Playback finished");
                self.emit(SpeechEvent::PlaybackFinished(state));
                self.set_state(PipelineState::Idle);
                Ok(Outcome::Success(()))
            }
            Err(e) => self.playback_setback(e, backend, sink),
        }
    }

    /// Cancellation and contract violations propagate; device trouble halts.
    fn playback_setback(
        &mut self,
        err: VoiceError,
        backend: BackendKind,
        sink: SinkKind,
    ) -> Result<Outcome<()>, VoiceError> {
        if err.is_cancelled() || err.is_contract_violation() {
            return Err(self.abort(err));
        }
        let failure = Outcome::Failure(err.to_string());
        Ok(self.halt(PipelineStage::Playback, backend, sink, failure))
    }

    fn resolve_device(&self, sink: SinkChoice) -> Result<Option<DeviceDescriptor>, VoiceError> {
        match sink {
            SinkChoice::Primary => Ok(None),
            SinkChoice::Secondary { device_index } => self
                .devices
                .get(device_index)
                .cloned()
                .map(Some)
                .ok_or(VoiceError::DeviceNotFound {
                    index: device_index,
                    available: self.devices.len(),
                }),
        }
    }

    /// Pass a success through; log and report anything else.
    fn settle<T>(
        &mut self,
        stage: PipelineStage,
        backend: BackendKind,
        sink: SinkKind,
        outcome: Outcome<T>,
    ) -> Result<T, Outcome<()>> {
        match outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::Retryable(reason) => {
                Err(self.halt(stage, backend, sink, Outcome::Retryable(reason)))
            }
            Outcome::Failure(reason) => {
                Err(self.halt(stage, backend, sink, Outcome::Failure(reason)))
            }
        }
    }

    fn halt(
        &mut self,
        stage: PipelineStage,
        backend: BackendKind,
        sink: SinkKind,
        setback: Outcome<()>,
    ) -> Outcome<()> {
        let reason = match &setback {
            Outcome::Success(()) => return setback,
            Outcome::Retryable(reason) => {
                warn!(
                    stage = %stage,
                    backend = %backend,
                    sink = %sink,
                    reason = %reason,
                    "Speech run halted, retry possible"
                );
                reason.clone()
            }
            Outcome::Failure(reason) => {
                error!(
                    stage = %stage,
                    backend = %backend,
                    sink = %sink,
                    reason = %reason,
                    "Speech run failed"
                );
                reason.clone()
            }
        };

        self.emit(SpeechEvent::Halted {
            stage,
            kind: setback.kind(),
            reason,
        });
        self.set_state(PipelineState::Idle);
        setback
    }

    /// Return to idle on an error path, announcing cancellation.
    fn abort(&mut self, err: VoiceError) -> VoiceError {
        if err.is_cancelled() {
            info!("Speech run cancelled");
            self.emit(SpeechEvent::Cancelled);
        } else {
            debug!(error = %err, "Speech run aborted");
        }
        self.set_state(PipelineState::Idle);
        err
    }

    fn release_handle(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.stop();
            debug!(
                sink = %handle.sink_kind(),
                state = %handle.state(),
                "Previous playback released"
            );
        }
    }

    fn set_state(&mut self, new_state: PipelineState) {
        if self.state != new_state {
            debug!(old = ?self.state, new = ?new_state, "Speech state transition");
            self.state = new_state;
            self.emit(SpeechEvent::StateChanged(new_state));
        }
    }

    /// Emit an event (best-effort; a dropped receiver is not an error).
    fn emit(&self, event: SpeechEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Speech event receiver dropped");
        }
    }
}

impl Drop for SpeechOrchestrator {
    fn drop(&mut self) {
        self.release_playback();
    }
}

impl fmt::Debug for SpeechOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechOrchestrator")
            .field("backends", &self.backends)
            .field("sinks", &self.sinks)
            .field("devices", &self.devices.len())
            .field("has_audio", &self.current.is_some())
            .field("active", &self.active)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
