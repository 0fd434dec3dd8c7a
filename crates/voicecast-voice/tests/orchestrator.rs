//! End-to-end orchestrator runs against scripted backends and in-memory sinks.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Query;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use voicecast_core::{
    AudioContainer, AudioDecoder, BackendKind, Backends, CloudVoiceParams, Completion,
    DecodedAudio, DeviceCatalog, DeviceDescriptor, LocalVoiceParams, Outcome, OutcomeKind,
    OutputChannel, PlaybackInput, PlaybackSink, PlaybackState, RawAudio, SinkChoice, SinkKind,
    Sinks, Style, SynthesisBackend, VoiceError, VoiceParameters,
};
use voicecast_synth::LocalQueryVoice;
use voicecast_voice::{
    DECODE_BLOCK_FRAMES, PipelineStage, PipelineState, SpeechEvent, SpeechOrchestrator, WavDecoder,
};

// ── Fixtures ───────────────────────────────────────────────────────

fn wav_bytes(sample_rate: u32, frames: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..frames {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// 50 ms of mono 8 kHz silence.
fn short_wav() -> RawAudio {
    RawAudio::wav(wav_bytes(8_000, 400))
}

fn local_params() -> VoiceParameters {
    LocalVoiceParams::new(1).into()
}

fn cloud_params() -> VoiceParameters {
    CloudVoiceParams::new(0.0, 0.0, Style::Talk).into()
}

// ── Backend ────────────────────────────────────────────────────────

struct ScriptedBackend {
    kind: BackendKind,
    script: Mutex<VecDeque<Outcome<RawAudio>>>,
    delay: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, VoiceParameters)>>,
}

impl ScriptedBackend {
    fn new(kind: BackendKind, script: Vec<Outcome<RawAudio>>) -> Self {
        Self {
            kind,
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn synthesize(
        &self,
        text: &str,
        params: &VoiceParameters,
        cancel: &CancellationToken,
    ) -> Result<Outcome<RawAudio>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((text.to_string(), params.clone()));

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(VoiceError::Cancelled),
            () = tokio::time::sleep(self.delay) => {}
        }

        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Outcome::failure("script exhausted")))
    }
}

// ── Decoder ────────────────────────────────────────────────────────

/// Real WAV decoding behind an optional stall.
struct CountingDecoder {
    inner: WavDecoder,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingDecoder {
    fn new(delay: Duration) -> Self {
        Self {
            inner: WavDecoder::new(),
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioDecoder for CountingDecoder {
    fn container(&self) -> AudioContainer {
        self.inner.container()
    }

    fn validate(&self, raw: &RawAudio) -> Outcome<()> {
        self.inner.validate(raw)
    }

    async fn decode(
        &self,
        raw: RawAudio,
        cancel: &CancellationToken,
    ) -> Result<Outcome<DecodedAudio>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(VoiceError::Cancelled),
            () = tokio::time::sleep(self.delay) => {}
        }
        self.inner.decode(raw, cancel).await
    }
}

// ── Sinks ──────────────────────────────────────────────────────────

#[derive(Default)]
struct SinkLog {
    opens: AtomicUsize,
    plays: AtomicUsize,
    stops: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    devices: Mutex<Vec<Option<DeviceDescriptor>>>,
    /// Fail the next open as if the device vanished.
    unplugged: AtomicBool,
}

impl SinkLog {
    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Accepts the same inputs as the real sinks. Each opened channel finishes
/// after the next scripted number of polls; `None` never finishes.
struct RecordingSink {
    kind: SinkKind,
    log: Arc<SinkLog>,
    finish_after: Mutex<VecDeque<Option<usize>>>,
}

impl RecordingSink {
    fn new(kind: SinkKind, log: Arc<SinkLog>, finish_after: Vec<Option<usize>>) -> Self {
        Self {
            kind,
            log,
            finish_after: Mutex::new(finish_after.into()),
        }
    }
}

#[async_trait]
impl PlaybackSink for RecordingSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    async fn open(
        &self,
        input: &PlaybackInput,
        device: Option<&DeviceDescriptor>,
    ) -> Result<Box<dyn OutputChannel>, VoiceError> {
        match (self.kind, input) {
            (SinkKind::Primary, PlaybackInput::Decoded(_))
            | (SinkKind::Secondary, PlaybackInput::Stream(_)) => {}
            _ => {
                return Err(VoiceError::InputMismatch {
                    sink: self.kind.as_str(),
                    input: input.label(),
                });
            }
        }
        if self.log.unplugged.swap(false, Ordering::SeqCst) {
            return Err(VoiceError::NoOutputDevice);
        }

        self.log.opens.fetch_add(1, Ordering::SeqCst);
        let live = self.log.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_live.fetch_max(live, Ordering::SeqCst);
        self.log.devices.lock().unwrap().push(device.cloned());

        let finish_after = self.finish_after.lock().unwrap().pop_front().unwrap_or(Some(2));
        Ok(Box::new(RecordingChannel {
            log: Arc::clone(&self.log),
            polls: AtomicUsize::new(0),
            finish_after,
        }))
    }

    fn completion(&self, input: &PlaybackInput) -> Completion {
        match input {
            PlaybackInput::Decoded(audio) => Completion::Elapsed(audio.duration()),
            PlaybackInput::Stream(_) => Completion::UntilStopped {
                poll: Duration::from_millis(5),
            },
        }
    }
}

struct RecordingChannel {
    log: Arc<SinkLog>,
    polls: AtomicUsize,
    finish_after: Option<usize>,
}

impl OutputChannel for RecordingChannel {
    fn play(&self) -> Result<(), VoiceError> {
        self.log.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.log.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_finished(&self) -> bool {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        self.finish_after.is_some_and(|limit| polls >= limit)
    }
}

impl Drop for RecordingChannel {
    fn drop(&mut self) {
        self.log.live.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FixedCatalog(Vec<DeviceDescriptor>);

impl DeviceCatalog for FixedCatalog {
    fn output_devices(&self) -> Result<Vec<DeviceDescriptor>, VoiceError> {
        Ok(self.0.clone())
    }
}

fn two_devices() -> Vec<DeviceDescriptor> {
    vec![
        DeviceDescriptor {
            index: 0,
            name: "Speakers".to_string(),
            id: "test:Speakers".to_string(),
        },
        DeviceDescriptor {
            index: 1,
            name: "Virtual Cable".to_string(),
            id: "test:Virtual Cable".to_string(),
        },
    ]
}

// ── Harness ────────────────────────────────────────────────────────

struct Harness {
    orchestrator: SpeechOrchestrator,
    events: UnboundedReceiver<SpeechEvent>,
    local: Arc<ScriptedBackend>,
    cloud: Arc<ScriptedBackend>,
    decoder: Arc<CountingDecoder>,
    primary: Arc<SinkLog>,
    secondary: Arc<SinkLog>,
}

struct Setup {
    local: ScriptedBackend,
    cloud: ScriptedBackend,
    decode_delay: Duration,
    secondary_finish: Vec<Option<usize>>,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            local: ScriptedBackend::new(BackendKind::LocalQuery, Vec::new()),
            cloud: ScriptedBackend::new(BackendKind::CloudStyle, Vec::new()),
            decode_delay: Duration::ZERO,
            secondary_finish: Vec::new(),
        }
    }
}

impl Setup {
    fn build(self) -> Harness {
        let local = Arc::new(self.local);
        let cloud = Arc::new(self.cloud);
        let decoder = Arc::new(CountingDecoder::new(self.decode_delay));
        let primary = Arc::new(SinkLog::default());
        let secondary = Arc::new(SinkLog::default());

        let (orchestrator, events) = SpeechOrchestrator::new(
            Backends::new(local.clone(), cloud.clone()),
            decoder.clone(),
            Sinks::new(
                Arc::new(RecordingSink::new(SinkKind::Primary, primary.clone(), Vec::new())),
                Arc::new(RecordingSink::new(
                    SinkKind::Secondary,
                    secondary.clone(),
                    self.secondary_finish,
                )),
            ),
            Arc::new(FixedCatalog(two_devices())),
        );

        Harness {
            orchestrator,
            events,
            local,
            cloud,
            decoder,
            primary,
            secondary,
        }
    }
}

impl Harness {
    fn drain(&mut self) -> Vec<SpeechEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }
}

fn cancel_after(delay: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trigger.cancel();
    });
    cancel
}

// ── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn local_backend_to_primary_output_plays_to_completion() {
    let mut h = Setup {
        local: ScriptedBackend::new(BackendKind::LocalQuery, vec![Outcome::Success(short_wav())]),
        ..Setup::default()
    }
    .build();

    let result = h
        .orchestrator
        .run(
            "こんにちは",
            BackendKind::LocalQuery,
            SinkChoice::Primary,
            &local_params(),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(result.unwrap(), Outcome::Success(()));
    assert_eq!(h.local.calls(), 1);
    assert_eq!(h.cloud.calls(), 0);
    assert_eq!(h.decoder.calls(), 1);
    assert_eq!(SinkLog::count(&h.primary.opens), 1);
    assert_eq!(SinkLog::count(&h.primary.plays), 1);
    assert_eq!(SinkLog::count(&h.primary.stops), 1);
    assert_eq!(SinkLog::count(&h.primary.live), 0);
    assert_eq!(h.primary.devices.lock().unwrap()[0], None);
    assert!(h.orchestrator.has_audio());
    assert_eq!(h.orchestrator.state(), PipelineState::Idle);

    let (text, params) = h.local.seen.lock().unwrap()[0].clone();
    assert_eq!(text, "こんにちは");
    assert_eq!(params, local_params());

    let events = h.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        SpeechEvent::Decoded {
            sample_rate: 8_000,
            channels: 1,
            ..
        }
    )));
    assert!(events.contains(&SpeechEvent::PlaybackFinished(PlaybackState::Completed)));
    assert_eq!(
        events.last(),
        Some(&SpeechEvent::StateChanged(PipelineState::Idle))
    );
}

#[tokio::test]
async fn retryable_synthesis_keeps_previous_audio() {
    let mut h = Setup {
        local: ScriptedBackend::new(
            BackendKind::LocalQuery,
            vec![
                Outcome::Success(short_wav()),
                Outcome::retryable("server busy"),
            ],
        ),
        ..Setup::default()
    }
    .build();
    let cancel = CancellationToken::new();

    h.orchestrator
        .run("first", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await
        .unwrap();
    h.drain();

    let result = h
        .orchestrator
        .run("second", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await
        .unwrap();

    assert_eq!(result, Outcome::Retryable("server busy".to_string()));
    assert_eq!(h.decoder.calls(), 1);
    assert_eq!(SinkLog::count(&h.primary.opens), 1);
    assert!(h.orchestrator.has_audio());
    assert!(h.drain().contains(&SpeechEvent::Halted {
        stage: PipelineStage::Synthesis,
        kind: OutcomeKind::Retryable,
        reason: "server busy".to_string(),
    }));

    // The first utterance is still replayable.
    let replayed = h.orchestrator.replay(&cancel).await.unwrap();
    assert_eq!(replayed, Outcome::Success(()));
    assert_eq!(SinkLog::count(&h.primary.opens), 2);
    assert_eq!(h.decoder.calls(), 1);
}

#[tokio::test]
async fn cloud_backend_to_secondary_device_cancels_mid_playback() {
    let mut h = Setup {
        cloud: ScriptedBackend::new(BackendKind::CloudStyle, vec![Outcome::Success(short_wav())]),
        secondary_finish: vec![None],
        ..Setup::default()
    }
    .build();
    h.orchestrator.refresh_devices().unwrap();

    let cancel = cancel_after(Duration::from_millis(50));
    let result = h
        .orchestrator
        .run(
            "hello",
            BackendKind::CloudStyle,
            SinkChoice::Secondary { device_index: 0 },
            &cloud_params(),
            &cancel,
        )
        .await;

    assert!(matches!(result, Err(VoiceError::Cancelled)));
    assert_eq!(h.cloud.calls(), 1);
    // Secondary output streams the payload; nothing is decoded up front.
    assert_eq!(h.decoder.calls(), 0);
    assert_eq!(SinkLog::count(&h.secondary.plays), 1);
    assert_eq!(SinkLog::count(&h.secondary.stops), 1);
    assert_eq!(SinkLog::count(&h.secondary.live), 0);
    assert_eq!(
        h.secondary.devices.lock().unwrap()[0].as_ref().map(|d| d.index),
        Some(0)
    );
    assert_eq!(SinkLog::count(&h.primary.opens), 0);

    let events = h.drain();
    assert!(events.contains(&SpeechEvent::PlaybackFinished(PlaybackState::Cancelled)));
    assert!(events.contains(&SpeechEvent::Cancelled));
    assert_eq!(h.orchestrator.state(), PipelineState::Idle);
}

#[tokio::test]
async fn cancel_during_synthesis_never_decodes() {
    let mut h = Setup {
        local: ScriptedBackend::new(BackendKind::LocalQuery, vec![Outcome::Success(short_wav())])
            .with_delay(Duration::from_secs(5)),
        ..Setup::default()
    }
    .build();

    let cancel = cancel_after(Duration::from_millis(30));
    let result = h
        .orchestrator
        .run("hello", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await;

    assert!(matches!(result, Err(VoiceError::Cancelled)));
    assert_eq!(h.decoder.calls(), 0);
    assert_eq!(SinkLog::count(&h.primary.opens), 0);
    assert!(!h.orchestrator.has_audio());
    assert!(h.drain().contains(&SpeechEvent::Cancelled));
}

#[tokio::test]
async fn cancel_during_decode_never_plays() {
    let mut h = Setup {
        local: ScriptedBackend::new(BackendKind::LocalQuery, vec![Outcome::Success(short_wav())]),
        decode_delay: Duration::from_secs(5),
        ..Setup::default()
    }
    .build();

    let cancel = cancel_after(Duration::from_millis(30));
    let result = h
        .orchestrator
        .run("hello", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await;

    assert!(matches!(result, Err(VoiceError::Cancelled)));
    assert_eq!(h.decoder.calls(), 1);
    assert_eq!(SinkLog::count(&h.primary.opens), 0);
    assert!(!h.orchestrator.has_audio());
}

#[tokio::test]
async fn pre_cancelled_run_touches_nothing() {
    let mut h = Setup::default().build();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = h
        .orchestrator
        .run("hello", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await;

    assert!(matches!(result, Err(VoiceError::Cancelled)));
    assert_eq!(h.local.calls(), 0);
    assert!(h.drain().contains(&SpeechEvent::Cancelled));
}

#[tokio::test]
async fn new_run_stops_abandoned_playback_first() {
    let mut h = Setup {
        cloud: ScriptedBackend::new(
            BackendKind::CloudStyle,
            vec![Outcome::Success(short_wav()), Outcome::Success(short_wav())],
        ),
        secondary_finish: vec![None, Some(2)],
        ..Setup::default()
    }
    .build();
    h.orchestrator.refresh_devices().unwrap();
    let sink = SinkChoice::Secondary { device_index: 1 };
    let cancel = CancellationToken::new();

    // Abandon the first run while its output is still playing.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(40),
        h.orchestrator
            .run("first", BackendKind::CloudStyle, sink, &cloud_params(), &cancel),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(SinkLog::count(&h.secondary.live), 1);
    assert_eq!(SinkLog::count(&h.secondary.stops), 0);

    let result = h
        .orchestrator
        .run("second", BackendKind::CloudStyle, sink, &cloud_params(), &cancel)
        .await
        .unwrap();

    assert_eq!(result, Outcome::Success(()));
    assert_eq!(SinkLog::count(&h.secondary.opens), 2);
    assert_eq!(SinkLog::count(&h.secondary.max_live), 1);
    // One stop for the abandoned channel, one when the second finished.
    assert_eq!(SinkLog::count(&h.secondary.stops), 2);
    assert_eq!(SinkLog::count(&h.secondary.live), 0);
}

#[tokio::test]
async fn replay_without_audio_is_a_no_op() {
    let mut h = Setup::default().build();

    let result = h.orchestrator.replay(&CancellationToken::new()).await;

    assert_eq!(result.unwrap(), Outcome::Success(()));
    assert_eq!(SinkLog::count(&h.primary.opens), 0);
    assert_eq!(SinkLog::count(&h.secondary.opens), 0);
}

#[tokio::test]
async fn replay_reuses_the_last_sink_and_device() {
    let mut h = Setup {
        cloud: ScriptedBackend::new(BackendKind::CloudStyle, vec![Outcome::Success(short_wav())]),
        ..Setup::default()
    }
    .build();
    h.orchestrator.refresh_devices().unwrap();
    let cancel = CancellationToken::new();

    h.orchestrator
        .run(
            "hello",
            BackendKind::CloudStyle,
            SinkChoice::Secondary { device_index: 1 },
            &cloud_params(),
            &cancel,
        )
        .await
        .unwrap();
    let replayed = h.orchestrator.replay(&cancel).await.unwrap();

    assert_eq!(replayed, Outcome::Success(()));
    assert_eq!(h.cloud.calls(), 1);
    assert_eq!(SinkLog::count(&h.secondary.opens), 2);
    let devices = h.secondary.devices.lock().unwrap();
    assert!(devices.iter().all(|d| d.as_ref().map(|d| d.index) == Some(1)));
}

#[tokio::test]
async fn unknown_device_index_is_rejected_before_synthesis() {
    let mut h = Setup::default().build();
    let cancel = CancellationToken::new();

    // Devices are only known after an explicit refresh.
    let before_refresh = h
        .orchestrator
        .run(
            "hello",
            BackendKind::CloudStyle,
            SinkChoice::Secondary { device_index: 0 },
            &cloud_params(),
            &cancel,
        )
        .await;
    assert!(matches!(
        before_refresh,
        Err(VoiceError::DeviceNotFound {
            index: 0,
            available: 0
        })
    ));

    h.orchestrator.refresh_devices().unwrap();
    let out_of_range = h
        .orchestrator
        .run(
            "hello",
            BackendKind::CloudStyle,
            SinkChoice::Secondary { device_index: 5 },
            &cloud_params(),
            &cancel,
        )
        .await;
    assert!(matches!(
        out_of_range,
        Err(VoiceError::DeviceNotFound {
            index: 5,
            available: 2
        })
    ));
    assert_eq!(h.cloud.calls(), 0);
}

#[tokio::test]
async fn undecodable_audio_halts_and_keeps_previous_audio() {
    let mut h = Setup {
        local: ScriptedBackend::new(
            BackendKind::LocalQuery,
            vec![
                Outcome::Success(short_wav()),
                Outcome::Success(RawAudio::wav(b"not a wav file".to_vec())),
            ],
        ),
        ..Setup::default()
    }
    .build();
    let cancel = CancellationToken::new();

    h.orchestrator
        .run("first", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await
        .unwrap();
    h.drain();

    let result = h
        .orchestrator
        .run("second", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await
        .unwrap();

    assert_eq!(result.kind(), OutcomeKind::Failure);
    assert_eq!(SinkLog::count(&h.primary.opens), 1);
    assert!(h.orchestrator.has_audio());
    assert!(h.drain().iter().any(|e| matches!(
        e,
        SpeechEvent::Halted {
            stage: PipelineStage::Decode,
            kind: OutcomeKind::Failure,
            ..
        }
    )));
}

#[tokio::test]
async fn dropping_the_orchestrator_stops_live_playback() {
    let mut h = Setup {
        cloud: ScriptedBackend::new(BackendKind::CloudStyle, vec![Outcome::Success(short_wav())]),
        secondary_finish: vec![None],
        ..Setup::default()
    }
    .build();
    h.orchestrator.refresh_devices().unwrap();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(40),
        h.orchestrator.run(
            "hello",
            BackendKind::CloudStyle,
            SinkChoice::Secondary { device_index: 0 },
            &cloud_params(),
            &CancellationToken::new(),
        ),
    )
    .await;
    assert!(abandoned.is_err());

    let log = Arc::clone(&h.secondary);
    drop(h);

    assert_eq!(SinkLog::count(&log.stops), 1);
    assert_eq!(SinkLog::count(&log.live), 0);
}

#[tokio::test]
async fn garbage_stream_payload_halts_and_keeps_previous_audio() {
    let mut h = Setup {
        local: ScriptedBackend::new(BackendKind::LocalQuery, vec![Outcome::Success(short_wav())]),
        cloud: ScriptedBackend::new(
            BackendKind::CloudStyle,
            vec![Outcome::Success(RawAudio::wav(b"<html>502 Bad Gateway</html>".to_vec()))],
        ),
        ..Setup::default()
    }
    .build();
    h.orchestrator.refresh_devices().unwrap();
    let cancel = CancellationToken::new();

    h.orchestrator
        .run("first", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await
        .unwrap();
    h.drain();

    let result = h
        .orchestrator
        .run(
            "second",
            BackendKind::CloudStyle,
            SinkChoice::Secondary { device_index: 1 },
            &cloud_params(),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(result.kind(), OutcomeKind::Failure);
    assert_eq!(SinkLog::count(&h.secondary.opens), 0);
    assert!(h.orchestrator.has_audio());
    assert_eq!(h.orchestrator.state(), PipelineState::Idle);
    assert!(h.drain().iter().any(|e| matches!(
        e,
        SpeechEvent::Halted {
            stage: PipelineStage::Decode,
            kind: OutcomeKind::Failure,
            ..
        }
    )));

    // Replay still plays the first utterance where it was played.
    let replayed = h.orchestrator.replay(&cancel).await.unwrap();
    assert_eq!(replayed, Outcome::Success(()));
    assert_eq!(SinkLog::count(&h.primary.opens), 2);
    assert_eq!(SinkLog::count(&h.secondary.opens), 0);
}

#[tokio::test]
async fn output_that_fails_to_open_keeps_previous_audio() {
    let mut h = Setup {
        local: ScriptedBackend::new(
            BackendKind::LocalQuery,
            vec![Outcome::Success(short_wav()), Outcome::Success(short_wav())],
        ),
        ..Setup::default()
    }
    .build();
    let cancel = CancellationToken::new();

    h.orchestrator
        .run("first", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await
        .unwrap();
    h.drain();

    h.primary.unplugged.store(true, Ordering::SeqCst);
    let result = h
        .orchestrator
        .run("second", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await
        .unwrap();

    assert_eq!(result, Outcome::Failure(VoiceError::NoOutputDevice.to_string()));
    assert_eq!(h.decoder.calls(), 2);
    assert_eq!(SinkLog::count(&h.primary.opens), 1);
    assert!(h.orchestrator.has_audio());
    assert_eq!(h.orchestrator.state(), PipelineState::Idle);
    assert!(h.drain().iter().any(|e| matches!(
        e,
        SpeechEvent::Halted {
            stage: PipelineStage::Playback,
            kind: OutcomeKind::Failure,
            ..
        }
    )));

    let replayed = h.orchestrator.replay(&cancel).await.unwrap();
    assert_eq!(replayed, Outcome::Success(()));
    assert_eq!(SinkLog::count(&h.primary.opens), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_while_wav_decoding_is_underway_never_plays() {
    let long = RawAudio::wav(wav_bytes(24_000, DECODE_BLOCK_FRAMES * 1_000));
    let mut h = Setup {
        local: ScriptedBackend::new(BackendKind::LocalQuery, vec![Outcome::Success(long)]),
        ..Setup::default()
    }
    .build();

    // Fire once the decoder has been entered, from another task.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let decoder = Arc::clone(&h.decoder);
    tokio::spawn(async move {
        while decoder.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        trigger.cancel();
    });

    let result = h
        .orchestrator
        .run("long", BackendKind::LocalQuery, SinkChoice::Primary, &local_params(), &cancel)
        .await;

    assert!(matches!(result, Err(VoiceError::Cancelled)), "{result:?}");
    assert_eq!(h.decoder.calls(), 1);
    assert_eq!(SinkLog::count(&h.primary.opens), 0);
    assert!(!h.orchestrator.has_audio());
    let events = h.drain();
    assert!(events.contains(&SpeechEvent::Cancelled));
    assert!(!events.iter().any(|e| matches!(e, SpeechEvent::Decoded { .. })));
}

// ── Local engine over HTTP ─────────────────────────────────────────

fn engine_query() -> serde_json::Value {
    serde_json::json!({
        "accent_phrases": [],
        "speedScale": 1.0,
        "pitchScale": 0.0,
        "intonationScale": 1.0,
        "volumeScale": 1.0,
        "prePhonemeLength": 0.1,
        "postPhonemeLength": 0.1,
        "outputSamplingRate": 24000,
        "outputStereo": false,
        "kana": "コンニチワ"
    })
}

/// Two-step engine fake: `/audio_query` returns a query, `/synthesis` a WAV.
async fn serve_local_engine(wav: Vec<u8>) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let paths = Arc::new(Mutex::new(Vec::new()));
    let query_paths = Arc::clone(&paths);
    let synthesis_paths = Arc::clone(&paths);

    let app = Router::new()
        .route(
            "/audio_query",
            post(move |Query(query): Query<HashMap<String, String>>| {
                let paths = Arc::clone(&query_paths);
                async move {
                    paths.lock().unwrap().push(format!("audio_query:{}", query["text"]));
                    Json(engine_query())
                }
            }),
        )
        .route(
            "/synthesis",
            post(move |Json(body): Json<serde_json::Value>| {
                let paths = Arc::clone(&synthesis_paths);
                let wav = wav.clone();
                async move {
                    paths.lock().unwrap().push(format!("synthesis:{}", body["kana"]));
                    ([(header::CONTENT_TYPE, "audio/wav")], wav).into_response()
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, paths)
}

#[tokio::test]
async fn local_engine_over_http_plays_on_primary_output() {
    let (addr, paths) = serve_local_engine(wav_bytes(24_000, 2_400)).await;
    let local = LocalQueryVoice::new(
        url::Url::parse(&format!("http://{addr}")).unwrap(),
        Duration::from_secs(5),
    );
    let cloud = ScriptedBackend::new(BackendKind::CloudStyle, Vec::new());
    let primary = Arc::new(SinkLog::default());
    let secondary = Arc::new(SinkLog::default());

    let (mut orchestrator, mut events) = SpeechOrchestrator::new(
        Backends::new(Arc::new(local), Arc::new(cloud)),
        Arc::new(WavDecoder::new()),
        Sinks::new(
            Arc::new(RecordingSink::new(SinkKind::Primary, primary.clone(), Vec::new())),
            Arc::new(RecordingSink::new(SinkKind::Secondary, secondary.clone(), Vec::new())),
        ),
        Arc::new(FixedCatalog(two_devices())),
    );

    let result = orchestrator
        .run(
            "こんにちは",
            BackendKind::LocalQuery,
            SinkChoice::Primary,
            &local_params(),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(result.unwrap(), Outcome::Success(()));
    assert_eq!(
        *paths.lock().unwrap(),
        vec![
            "audio_query:こんにちは".to_string(),
            "synthesis:\"コンニチワ\"".to_string(),
        ]
    );
    assert_eq!(SinkLog::count(&primary.opens), 1);
    assert_eq!(SinkLog::count(&primary.plays), 1);
    assert_eq!(SinkLog::count(&secondary.opens), 0);
    assert!(orchestrator.has_audio());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&SpeechEvent::Synthesized {
        backend: BackendKind::LocalQuery,
        bytes: wav_bytes(24_000, 2_400).len(),
    }));
    assert!(seen.iter().any(|e| matches!(
        e,
        SpeechEvent::Decoded {
            sample_rate: 24_000,
            channels: 1,
            duration,
        } if duration.as_millis() == 100
    )));
    assert!(seen.contains(&SpeechEvent::PlaybackFinished(PlaybackState::Completed)));
}
