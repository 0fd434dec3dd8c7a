//! Audio decoder port.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioContainer, DecodedAudio, RawAudio};
use crate::error::VoiceError;
use crate::outcome::Outcome;

/// Turns an encoded payload into samples for the primary output.
///
/// A payload the decoder cannot make sense of is `Ok(Outcome::Failure)`:
/// feeding the same bytes again will not help, so it is never `Retryable`.
/// Cancellation before completion is `Err(VoiceError::Cancelled)`.
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Container this decoder understands.
    fn container(&self) -> AudioContainer;

    /// Header-only check for a payload that will be streamed to a device
    /// instead of decoded here. Reads no samples.
    fn validate(&self, raw: &RawAudio) -> Outcome<()>;

    async fn decode(
        &self,
        raw: RawAudio,
        cancel: &CancellationToken,
    ) -> Result<Outcome<DecodedAudio>, VoiceError>;
}
