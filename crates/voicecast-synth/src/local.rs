//! Local query/synthesis engine backend.
//!
//! Speech is produced in two round-trips against the same base URL:
//!
//! 1. `POST /audio_query?text=..&speaker=..` returns an [`AudioQuery`]
//! 2. `POST /synthesis?speaker=..` with that query as the JSON body returns
//!    WAV bytes
//!
//! A setback in step 1 ends the call with that step's outcome; step 2 is
//! never attempted.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;
use voicecast_core::{
    BackendKind, LocalVoiceParams, Outcome, RawAudio, SynthesisBackend, VoiceError,
    VoiceParameters,
};

use crate::error::{SynthError, SynthResult};
use crate::http::HttpTransport;

const AUDIO_QUERY_PATH: &str = "audio_query";
const SYNTHESIS_PATH: &str = "synthesis";

/// Intermediate query returned by the engine's query-creation endpoint.
///
/// The known fields are typed so callers may adjust prosody before
/// synthesis; anything else the engine sends is kept in `extra` and sent
/// back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioQuery {
    #[serde(rename = "accent_phrases")]
    pub accent_phrases: Vec<serde_json::Value>,
    pub speed_scale: f64,
    pub pitch_scale: f64,
    pub intonation_scale: f64,
    pub volume_scale: f64,
    pub pre_phoneme_length: f64,
    pub post_phoneme_length: f64,
    pub output_sampling_rate: u32,
    pub output_stereo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kana: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Backend for a locally hosted two-step synthesis engine.
#[derive(Debug, Clone)]
pub struct LocalQueryVoice {
    base_url: Url,
    http: HttpTransport,
}

impl LocalQueryVoice {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        Self {
            base_url,
            http: HttpTransport::new(timeout),
        }
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> SynthResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SynthError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    pub(crate) fn query_creation_url(
        &self,
        text: &str,
        params: &LocalVoiceParams,
    ) -> SynthResult<Url> {
        let mut url = self.endpoint(AUDIO_QUERY_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("text", text)
                .append_pair("speaker", &params.speaker.to_string());
            if let Some(version) = &params.core_version {
                pairs.append_pair("core_version", version);
            }
        }
        Ok(url)
    }

    pub(crate) fn synthesis_url(&self, params: &LocalVoiceParams) -> SynthResult<Url> {
        let mut url = self.endpoint(SYNTHESIS_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("speaker", &params.speaker.to_string());
            if let Some(upspeak) = params.upspeak {
                pairs.append_pair("enable_interrogative_upspeak", &upspeak.to_string());
            }
            if let Some(version) = &params.core_version {
                pairs.append_pair("core_version", version);
            }
        }
        Ok(url)
    }

    /// Step 1: build a query from text.
    pub async fn create_query(
        &self,
        text: &str,
        params: &LocalVoiceParams,
        cancel: &CancellationToken,
    ) -> SynthResult<AudioQuery> {
        let url = self.query_creation_url(text, params)?;
        self.http.fetch_json(self.http.post(&url), cancel).await
    }

    /// Step 2: render a query to WAV bytes.
    pub async fn render(
        &self,
        query: &AudioQuery,
        params: &LocalVoiceParams,
        cancel: &CancellationToken,
    ) -> SynthResult<Bytes> {
        let url = self.synthesis_url(params)?;
        let audio = self
            .http
            .fetch_bytes(self.http.post(&url).json(query), cancel)
            .await?;

        if audio.is_empty() {
            return Err(SynthError::InvalidResponse("empty audio body".to_string()));
        }
        Ok(audio)
    }
}

#[async_trait]
impl SynthesisBackend for LocalQueryVoice {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalQuery
    }

    async fn synthesize(
        &self,
        text: &str,
        params: &VoiceParameters,
        cancel: &CancellationToken,
    ) -> Result<Outcome<RawAudio>, VoiceError> {
        let VoiceParameters::Local(params) = params else {
            return Err(VoiceError::ParameterMismatch {
                backend: BackendKind::LocalQuery,
                given: params.backend(),
            });
        };

        let query = match self.create_query(text, params, cancel).await {
            Ok(query) => query,
            Err(e) => {
                debug!(step = AUDIO_QUERY_PATH, error = %e, "query creation did not succeed");
                return e.into_outcome();
            }
        };

        match self.render(&query, params, cancel).await {
            Ok(audio) => {
                info!(
                    speaker = params.speaker,
                    bytes = audio.len(),
                    "local synthesis complete"
                );
                Ok(Outcome::Success(RawAudio::wav(audio)))
            }
            Err(e) => {
                debug!(step = SYNTHESIS_PATH, error = %e, "synthesis did not succeed");
                e.into_outcome()
            }
        }
    }
}
