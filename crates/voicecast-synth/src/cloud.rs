//! Cloud style-coordinate synthesis backend.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;
use voicecast_core::{
    BackendKind, CloudVoiceParams, Outcome, RawAudio, Style, SynthesisBackend, VoiceError,
    VoiceParameters,
};

use crate::error::{SynthError, SynthResult};
use crate::http::HttpTransport;

/// Request body sent to the cloud endpoint.
#[derive(Debug, Serialize)]
struct CloudSynthesisRequest<'a> {
    text: &'a str,
    speaker_x: f64,
    speaker_y: f64,
    style: Style,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

impl<'a> CloudSynthesisRequest<'a> {
    fn new(text: &'a str, params: &CloudVoiceParams) -> Self {
        Self {
            text,
            speaker_x: params.speaker_x(),
            speaker_y: params.speaker_y(),
            style: params.style(),
            seed: params.seed(),
        }
    }
}

/// Response body of the cloud endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudSynthesisResponse {
    /// `data:audio/x-wav;base64,...` URI (a bare base64 string is accepted too).
    pub audio: String,
    #[serde(default)]
    pub phonemes: Vec<serde_json::Value>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl CloudSynthesisResponse {
    /// Decode the embedded audio.
    pub fn audio_bytes(&self) -> SynthResult<Vec<u8>> {
        let payload = match self.audio.split_once(',') {
            Some((header, data)) if header.starts_with("data:") => {
                if !header.ends_with(";base64") {
                    return Err(SynthError::InvalidResponse(format!(
                        "audio data URI is not base64: {header}"
                    )));
                }
                data
            }
            _ => self.audio.as_str(),
        };

        let bytes = STANDARD.decode(payload.trim())?;
        if bytes.is_empty() {
            return Err(SynthError::InvalidResponse("empty audio payload".to_string()));
        }
        Ok(bytes)
    }
}

/// Backend for the hosted style-coordinate service.
#[derive(Debug, Clone)]
pub struct CloudStyleVoice {
    endpoint: Url,
    http: HttpTransport,
}

impl CloudStyleVoice {
    pub fn new(endpoint: Url, timeout: Duration) -> Self {
        Self {
            endpoint,
            http: HttpTransport::new(timeout),
        }
    }

    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request(
        &self,
        text: &str,
        params: &CloudVoiceParams,
        cancel: &CancellationToken,
    ) -> SynthResult<Vec<u8>> {
        let body = CloudSynthesisRequest::new(text, params);
        let response: CloudSynthesisResponse = self
            .http
            .fetch_json(self.http.post(&self.endpoint).json(&body), cancel)
            .await?;

        debug!(
            phonemes = response.phonemes.len(),
            seed = ?response.seed,
            "cloud synthesis response received"
        );
        response.audio_bytes()
    }
}

#[async_trait]
impl SynthesisBackend for CloudStyleVoice {
    fn kind(&self) -> BackendKind {
        BackendKind::CloudStyle
    }

    async fn synthesize(
        &self,
        text: &str,
        params: &VoiceParameters,
        cancel: &CancellationToken,
    ) -> Result<Outcome<RawAudio>, VoiceError> {
        let VoiceParameters::Cloud(params) = params else {
            return Err(VoiceError::ParameterMismatch {
                backend: BackendKind::CloudStyle,
                given: params.backend(),
            });
        };

        match self.request(text, params, cancel).await {
            Ok(audio) => {
                info!(
                    style = %params.style(),
                    x = params.speaker_x(),
                    y = params.speaker_y(),
                    bytes = audio.len(),
                    "cloud synthesis complete"
                );
                Ok(Outcome::Success(RawAudio::wav(audio)))
            }
            Err(e) => e.into_outcome(),
        }
    }
}
