//! WAV decoding.
//!
//! The payload is read in blocks of [`DECODE_BLOCK_FRAMES`] frames straight
//! out of the received buffer, so no second copy of the encoded bytes is
//! made. Between blocks the cancellation token is checked; a cancelled decode
//! drops whatever it had built and returns nothing.

use std::convert::Infallible;
use std::io::{Cursor, Read};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use voicecast_core::{
    AudioContainer, AudioDecoder, DecodeError, DecodedAudio, Outcome, RawAudio, VoiceError,
};

/// Frames decoded between cancellation checks.
pub const DECODE_BLOCK_FRAMES: usize = 4096;

/// Upper bound on the up-front sample allocation; a header may claim more
/// data than the payload carries.
const MAX_PREALLOCATED_SAMPLES: usize = 1 << 22;

/// Why a decode did not produce audio. `S` is what a fired stop check reports.
enum Interrupted<S> {
    Stopped(S),
    Invalid(DecodeError),
}

impl<S> From<DecodeError> for Interrupted<S> {
    fn from(err: DecodeError) -> Self {
        Self::Invalid(err)
    }
}

/// The cancellation token fired between blocks.
struct Cancelled;

/// Decode a complete WAV payload synchronously.
///
/// # Errors
///
/// Returns a [`DecodeError`] describing why the payload cannot be played.
pub fn decode_wav(raw: RawAudio) -> Result<DecodedAudio, DecodeError> {
    decode_blocks(raw, || Ok::<(), Infallible>(())).map_err(|interrupted| match interrupted {
        Interrupted::Invalid(err) => err,
        Interrupted::Stopped(never) => match never {},
    })
}

/// Check the container header without reading any samples.
///
/// # Errors
///
/// The same [`DecodeError`]s a full decode reports for a bad header, plus
/// [`DecodeError::NoSamples`] for an empty data chunk.
pub fn check_wav_header(raw: &RawAudio) -> Result<(), DecodeError> {
    let bytes: &[u8] = raw.bytes().as_ref();
    let reader = open_reader(bytes, Cursor::new(bytes))?;
    if reader.len() == 0 {
        return Err(DecodeError::NoSamples);
    }
    Ok(())
}

fn open_reader<R: Read>(head: &[u8], source: R) -> Result<hound::WavReader<R>, DecodeError> {
    if head.is_empty() {
        return Err(DecodeError::Empty);
    }
    if head.len() < 12 || &head[0..4] != b"RIFF" || &head[8..12] != b"WAVE" {
        return Err(DecodeError::MalformedContainer("not a RIFF/WAVE container".to_string()));
    }

    let reader = hound::WavReader::new(source).map_err(map_hound_error)?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.channels > DecodedAudio::MAX_CHANNELS || spec.sample_rate == 0 {
        return Err(DecodeError::UnsupportedFormat {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        });
    }
    let bits = spec.bits_per_sample;
    match spec.sample_format {
        hound::SampleFormat::Int if !(1..=32).contains(&bits) => Err(
            DecodeError::UnsupportedEncoding(format!("{bits}-bit integer samples")),
        ),
        hound::SampleFormat::Float if bits != 32 => Err(DecodeError::UnsupportedEncoding(
            format!("{bits}-bit float samples"),
        )),
        _ => Ok(reader),
    }
}

fn decode_blocks<S>(
    raw: RawAudio,
    mut check: impl FnMut() -> Result<(), S>,
) -> Result<DecodedAudio, Interrupted<S>> {
    match raw.container() {
        AudioContainer::Wav => {}
    }
    let bytes = raw.into_bytes();
    let mut reader = open_reader(&bytes, Cursor::new(bytes.clone()))?;
    let spec = reader.spec();

    let declared = usize::try_from(reader.len()).unwrap_or(usize::MAX);
    let mut samples = Vec::with_capacity(declared.min(MAX_PREALLOCATED_SAMPLES));
    let block = DECODE_BLOCK_FRAMES * usize::from(spec.channels);

    match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = 2f32.powi(1 - i32::from(spec.bits_per_sample));
            #[allow(clippy::cast_precision_loss)]
            read_blocks(reader.samples::<i32>(), block, &mut samples, &mut check, |s| {
                s as f32 * scale
            })?;
        }
        hound::SampleFormat::Float => {
            read_blocks(reader.samples::<f32>(), block, &mut samples, &mut check, |s| s)?;
        }
    }

    Ok(DecodedAudio::new(spec.sample_rate, spec.channels, samples)?)
}

fn read_blocks<T, S>(
    mut source: impl Iterator<Item = hound::Result<T>>,
    block: usize,
    out: &mut Vec<f32>,
    check: &mut impl FnMut() -> Result<(), S>,
    convert: impl Fn(T) -> f32,
) -> Result<(), Interrupted<S>> {
    loop {
        check().map_err(Interrupted::Stopped)?;
        let before = out.len();
        for sample in source.by_ref().take(block) {
            out.push(convert(sample.map_err(map_hound_error)?));
        }
        if out.len() - before < block {
            return Ok(());
        }
    }
}

fn map_hound_error(err: hound::Error) -> DecodeError {
    match err {
        hound::Error::IoError(e) => {
            DecodeError::MalformedContainer(format!("payload is truncated or unreadable: {e}"))
        }
        hound::Error::FormatError(msg) => DecodeError::MalformedContainer(msg.to_string()),
        hound::Error::UnfinishedSample => {
            DecodeError::MalformedContainer("data chunk ends mid-sample".to_string())
        }
        other => DecodeError::UnsupportedEncoding(other.to_string()),
    }
}

/// [`AudioDecoder`] for RIFF/WAVE payloads.
///
/// Decoding runs on the blocking pool so large payloads never stall the
/// runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl WavDecoder {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioDecoder for WavDecoder {
    fn container(&self) -> AudioContainer {
        AudioContainer::Wav
    }

    fn validate(&self, raw: &RawAudio) -> Outcome<()> {
        match check_wav_header(raw) {
            Ok(()) => Outcome::Success(()),
            Err(err) => Outcome::Failure(err.to_string()),
        }
    }

    async fn decode(
        &self,
        raw: RawAudio,
        cancel: &CancellationToken,
    ) -> Result<Outcome<DecodedAudio>, VoiceError> {
        if cancel.is_cancelled() {
            return Err(VoiceError::Cancelled);
        }

        let bytes = raw.len();
        let token = cancel.clone();
        let joined = tokio::task::spawn_blocking(move || {
            decode_blocks(raw, || if token.is_cancelled() { Err(Cancelled) } else { Ok(()) })
        })
        .await;

        match joined {
            Ok(Ok(audio)) => {
                debug!(
                    bytes,
                    samples = audio.samples().len(),
                    sample_rate = audio.sample_rate(),
                    channels = audio.channels(),
                    duration_ms = audio.duration().as_millis(),
                    "WAV decoded"
                );
                Ok(Outcome::Success(audio))
            }
            Ok(Err(Interrupted::Stopped(Cancelled))) => Err(VoiceError::Cancelled),
            Ok(Err(Interrupted::Invalid(err))) => Ok(Outcome::Failure(err.to_string())),
            Err(e) => Ok(Outcome::Failure(format!("decoder task failed: {e}"))),
        }
    }
}
