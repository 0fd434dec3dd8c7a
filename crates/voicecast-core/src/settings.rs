//! Speech settings and validation.
//!
//! Pure data: the CLI fills these from flags and environment, adapters read
//! them through [`SpeechSettings::voice_parameters`] and friends.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::kinds::{BackendKind, SinkChoice, SinkKind};
use crate::params::{
    CloudVoiceParams, LocalVoiceParams, STYLE_COORDINATE_LIMIT, Style, VoiceParameters,
};

/// Default address of a locally running query/synthesis engine.
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://127.0.0.1:50021";

/// Default endpoint of the cloud style-coordinate service.
pub const DEFAULT_CLOUD_ENDPOINT: &str = "https://api.rinna.co.jp/models/cttse/koeiro";

/// Default per-request timeout for synthesis calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings for one speech session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Base URL of the local engine.
    pub local_base_url: String,

    /// Full URL of the cloud synthesis endpoint.
    pub cloud_endpoint: String,

    /// Per-request timeout in seconds (must be non-zero).
    pub request_timeout_secs: u64,

    /// Backend to synthesize with.
    pub backend: BackendKind,

    /// Output path to play through.
    pub sink: SinkKind,

    /// Local engine speaker id.
    pub speaker_id: u32,

    /// Local engine question intonation toggle.
    pub upspeak: Option<bool>,

    /// Local engine core version pin.
    pub core_version: Option<String>,

    /// Cloud speaker coordinate, x axis.
    pub speaker_x: f64,

    /// Cloud speaker coordinate, y axis.
    pub speaker_y: f64,

    /// Cloud speaking style.
    pub style: Style,

    /// Cloud sampling seed.
    pub seed: Option<u64>,

    /// Output device index for the secondary sink.
    pub device_index: usize,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            local_base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            cloud_endpoint: DEFAULT_CLOUD_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            backend: BackendKind::default(),
            sink: SinkKind::default(),
            speaker_id: 0,
            upspeak: None,
            core_version: None,
            speaker_x: 0.0,
            speaker_y: 0.0,
            style: Style::default(),
            seed: None,
            device_index: 0,
        }
    }
}

impl SpeechSettings {
    /// Voice parameters for the configured backend.
    #[must_use]
    pub fn voice_parameters(&self) -> VoiceParameters {
        match self.backend {
            BackendKind::LocalQuery => VoiceParameters::Local(LocalVoiceParams {
                speaker: self.speaker_id,
                upspeak: self.upspeak,
                core_version: self.core_version.clone(),
            }),
            BackendKind::CloudStyle => {
                let params = CloudVoiceParams::new(self.speaker_x, self.speaker_y, self.style);
                VoiceParameters::Cloud(match self.seed {
                    Some(seed) => params.with_seed(seed),
                    None => params,
                })
            }
        }
    }

    #[must_use]
    pub const fn sink_choice(&self) -> SinkChoice {
        match self.sink {
            SinkKind::Primary => SinkChoice::Primary,
            SinkKind::Secondary => SinkChoice::Secondary {
                device_index: self.device_index,
            },
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} is not a valid http(s) URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Request timeout must be at least one second")]
    InvalidTimeout,

    #[error("Speaker {axis} must be between -3 and 3, got {value}")]
    InvalidStyleCoordinate { axis: &'static str, value: f64 },
}

/// Validate settings values.
///
/// Out-of-range style coordinates are rejected here even though
/// [`CloudVoiceParams`] would clamp them, so a typo on the command line is
/// reported instead of silently flattened.
pub fn validate_settings(settings: &SpeechSettings) -> Result<(), SettingsError> {
    check_url("local_base_url", &settings.local_base_url)?;
    check_url("cloud_endpoint", &settings.cloud_endpoint)?;

    if settings.request_timeout_secs == 0 {
        return Err(SettingsError::InvalidTimeout);
    }

    for (axis, value) in [("x", settings.speaker_x), ("y", settings.speaker_y)] {
        if !(-STYLE_COORDINATE_LIMIT..=STYLE_COORDINATE_LIMIT).contains(&value) {
            return Err(SettingsError::InvalidStyleCoordinate { axis, value });
        }
    }

    Ok(())
}

fn check_url(field: &'static str, value: &str) -> Result<(), SettingsError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(SettingsError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}
