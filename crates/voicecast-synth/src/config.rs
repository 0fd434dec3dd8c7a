//! Endpoint and timeout configuration for the HTTP backends.

use std::time::Duration;

use url::Url;
use voicecast_core::{
    DEFAULT_CLOUD_ENDPOINT, DEFAULT_LOCAL_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS, SettingsError,
    SpeechSettings,
};

/// Where the synthesis services live and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    /// Base URL of the local engine; `audio_query` and `synthesis` are
    /// appended as path segments.
    pub local_base_url: Url,
    /// Full URL of the cloud synthesis endpoint.
    pub cloud_endpoint: Url,
    /// Per-request timeout, applied to both backends.
    pub timeout: Duration,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            local_base_url: Url::parse(DEFAULT_LOCAL_BASE_URL).expect("default local URL is valid"),
            cloud_endpoint: Url::parse(DEFAULT_CLOUD_ENDPOINT).expect("default cloud URL is valid"),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl SynthConfig {
    /// Build from validated settings.
    pub fn from_settings(settings: &SpeechSettings) -> Result<Self, SettingsError> {
        let parse = |field: &'static str, value: &str| {
            Url::parse(value).map_err(|_| SettingsError::InvalidUrl {
                field,
                value: value.to_string(),
            })
        };

        if settings.request_timeout_secs == 0 {
            return Err(SettingsError::InvalidTimeout);
        }

        Ok(Self {
            local_base_url: parse("local_base_url", &settings.local_base_url)?,
            cloud_endpoint: parse("cloud_endpoint", &settings.cloud_endpoint)?,
            timeout: settings.request_timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_engine_port() {
        let config = SynthConfig::default();
        assert_eq!(config.local_base_url.port(), Some(50021));
        assert_eq!(config.cloud_endpoint.scheme(), "https");
    }

    #[test]
    fn from_settings_reports_bad_field() {
        let settings = SpeechSettings {
            cloud_endpoint: "::nope::".to_string(),
            ..SpeechSettings::default()
        };
        assert!(matches!(
            SynthConfig::from_settings(&settings),
            Err(SettingsError::InvalidUrl {
                field: "cloud_endpoint",
                ..
            })
        ));
    }

    #[test]
    fn from_settings_copies_timeout() {
        let settings = SpeechSettings {
            request_timeout_secs: 5,
            ..SpeechSettings::default()
        };
        let config = SynthConfig::from_settings(&settings).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
