//! Dedicated output thread: keeps `!Send` audio resources off the async runtime.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. Each opened output gets
//! its own OS thread that creates the stream, attaches a paused sink holding
//! the payload, then serves commands until shut down. [`OutputThread`] is the
//! `Send + Sync` proxy handed to the playback handle.
//!
//! Nothing on the proxy side blocks: opening awaits a oneshot reply, commands
//! are fire-and-forget, and the thread publishes whether its sink has drained
//! through a shared flag instead of answering queries.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use tokio::sync::oneshot;
use voicecast_core::{OutputChannel, VoiceError};

use crate::devices;
use crate::error::OutputError;

/// How often an idle output thread refreshes its drained flag.
const DRAIN_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ── Payload ────────────────────────────────────────────────────────

/// What the output thread feeds its sink.
#[derive(Debug, Clone)]
pub enum ThreadSource {
    /// Interleaved `f32` samples.
    Samples {
        channels: u16,
        sample_rate: u32,
        samples: Vec<f32>,
    },

    /// A WAV payload, read incrementally by the device-side decoder.
    Wav(Bytes),
}

// ── Commands ───────────────────────────────────────────────────────

enum OutputCommand {
    /// Unpause the sink.
    Play,

    /// Stop playback and clear the queue.
    Stop,

    /// Release the stream and exit.
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to one output thread.
pub struct OutputThread {
    cmd_tx: mpsc::Sender<OutputCommand>,
    drained: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

impl OutputThread {
    /// Spawn the thread, open the stream and queue `source` in a paused sink.
    ///
    /// `device_id` selects an enumerated device; `None` uses the system
    /// default. Open errors are reported back before this resolves.
    pub async fn spawn(
        name: &str,
        device_id: Option<String>,
        source: ThreadSource,
    ) -> Result<Self, VoiceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<OutputCommand>();
        let (init_tx, init_rx) = oneshot::channel::<Result<(), VoiceError>>();
        let drained = Arc::new(AtomicBool::new(false));
        let published = Arc::clone(&drained);

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || Self::run(device_id.as_deref(), source, &cmd_rx, init_tx, &published))
            .map_err(OutputError::Spawn)?;

        init_rx.await.map_err(|_| VoiceError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            drained,
            thread,
        })
    }

    // ── Output thread event loop ───────────────────────────────────

    fn run(
        device_id: Option<&str>,
        source: ThreadSource,
        cmd_rx: &mpsc::Receiver<OutputCommand>,
        init_tx: oneshot::Sender<Result<(), VoiceError>>,
        drained: &AtomicBool,
    ) {
        let (_stream, sink) = match open(device_id, source) {
            Ok(opened) => opened,
            Err(e) => {
                drained.store(true, Ordering::Release);
                let _ = init_tx.send(Err(e.into()));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            return;
        }

        loop {
            match cmd_rx.recv_timeout(DRAIN_CHECK_INTERVAL) {
                Ok(OutputCommand::Play) => sink.play(),
                Ok(OutputCommand::Stop) => sink.stop(),
                Ok(OutputCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            drained.store(sink.empty(), Ordering::Release);
        }

        sink.stop();
        drained.store(true, Ordering::Release);
        tracing::debug!(device = device_id.unwrap_or("default"), "Output thread shutting down");
    }
}

fn open(
    device_id: Option<&str>,
    source: ThreadSource,
) -> Result<(OutputStream, Sink), OutputError> {
    let (stream, handle) = open_stream(device_id)?;
    let sink = Sink::try_new(&handle)?;
    sink.pause();

    match source {
        ThreadSource::Samples {
            channels,
            sample_rate,
            samples,
        } => sink.append(rodio::buffer::SamplesBuffer::new(channels, sample_rate, samples)),
        ThreadSource::Wav(bytes) => sink.append(rodio::Decoder::new_wav(Cursor::new(bytes))?),
    }

    tracing::debug!(device = device_id.unwrap_or("default"), "Output stream opened");
    Ok((stream, sink))
}

fn open_stream(device_id: Option<&str>) -> Result<(OutputStream, OutputStreamHandle), OutputError> {
    match device_id {
        None => Ok(OutputStream::try_default()?),
        Some(id) => {
            let device = devices::find_output_device(id)?;
            Ok(OutputStream::try_from_device(&device)?)
        }
    }
}

impl OutputChannel for OutputThread {
    fn play(&self) -> Result<(), VoiceError> {
        self.cmd_tx
            .send(OutputCommand::Play)
            .map_err(|_| VoiceError::AudioThreadDied)
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(OutputCommand::Stop);
    }

    fn is_finished(&self) -> bool {
        // A dead thread plays nothing.
        self.drained.load(Ordering::Acquire) || self.thread.is_finished()
    }
}

impl Drop for OutputThread {
    fn drop(&mut self) {
        // Not joined: the thread closes the stream once it sees Shutdown.
        let _ = self.cmd_tx.send(OutputCommand::Shutdown);
    }
}
