//! Text-to-speech service port.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::audio::RawAudio;
use crate::error::VoiceError;
use crate::kinds::BackendKind;
use crate::outcome::Outcome;
use crate::params::VoiceParameters;

/// A remote (or local-network) speech synthesis service.
///
/// # Contract
///
/// - `Ok(Outcome::Success)` carries the encoded payload as received.
/// - Transient trouble (5xx, 408, 429, timeouts, refused connections) is
///   `Ok(Outcome::Retryable)`; anything else the service rejects is
///   `Ok(Outcome::Failure)`.
/// - If `cancel` fires before the payload is fully received the call returns
///   `Err(VoiceError::Cancelled)` and any in-flight request is dropped.
/// - Parameters built for a different backend are
///   `Err(VoiceError::ParameterMismatch)`.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Which service this is.
    fn kind(&self) -> BackendKind;

    /// Render `text` to encoded audio.
    async fn synthesize(
        &self,
        text: &str,
        params: &VoiceParameters,
        cancel: &CancellationToken,
    ) -> Result<Outcome<RawAudio>, VoiceError>;
}

/// One instance of every backend, selected by [`BackendKind`].
#[derive(Clone)]
pub struct Backends {
    local: Arc<dyn SynthesisBackend>,
    cloud: Arc<dyn SynthesisBackend>,
}

impl Backends {
    pub fn new(local: Arc<dyn SynthesisBackend>, cloud: Arc<dyn SynthesisBackend>) -> Self {
        Self { local, cloud }
    }

    #[must_use]
    pub fn select(&self, kind: BackendKind) -> &Arc<dyn SynthesisBackend> {
        match kind {
            BackendKind::LocalQuery => &self.local,
            BackendKind::CloudStyle => &self.cloud,
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("local", &self.local.kind())
            .field("cloud", &self.cloud.kind())
            .finish()
    }
}
