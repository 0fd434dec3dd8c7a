//! Per-backend voice parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::kinds::BackendKind;

/// Style coordinates are clamped into `[-LIMIT, LIMIT]`.
pub const STYLE_COORDINATE_LIMIT: f64 = 3.0;

/// Speaking style understood by the cloud service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Talk,
    Happy,
    Sad,
    Angry,
    Fear,
    Surprised,
}

impl Style {
    pub const ALL: [Self; 6] = [
        Self::Talk,
        Self::Happy,
        Self::Sad,
        Self::Angry,
        Self::Fear,
        Self::Surprised,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Talk => "talk",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fear => "fear",
            Self::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown style '{s}'"))
    }
}

/// Parameters for the local query/synthesis service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalVoiceParams {
    /// Speaker (style) id, passed as the `speaker` query parameter.
    pub speaker: u32,
    /// Raise pitch at the end of questions. Left to the server when `None`.
    pub upspeak: Option<bool>,
    /// Pin a specific engine core version.
    pub core_version: Option<String>,
}

impl LocalVoiceParams {
    #[must_use]
    pub fn new(speaker: u32) -> Self {
        Self {
            speaker,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_upspeak(mut self, enabled: bool) -> Self {
        self.upspeak = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_core_version(mut self, version: impl Into<String>) -> Self {
        self.core_version = Some(version.into());
        self
    }
}

/// Parameters for the cloud style-coordinate service.
///
/// Coordinates are clamped on construction, so a value of this type is
/// always within range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CloudVoiceParams {
    speaker_x: f64,
    speaker_y: f64,
    style: Style,
    seed: Option<u64>,
}

impl CloudVoiceParams {
    #[must_use]
    pub fn new(speaker_x: f64, speaker_y: f64, style: Style) -> Self {
        Self {
            speaker_x: clamp_coordinate(speaker_x),
            speaker_y: clamp_coordinate(speaker_y),
            style,
            seed: None,
        }
    }

    /// Fix the sampling seed so the same text renders identically.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub const fn speaker_x(&self) -> f64 {
        self.speaker_x
    }

    #[must_use]
    pub const fn speaker_y(&self) -> f64 {
        self.speaker_y
    }

    #[must_use]
    pub const fn style(&self) -> Style {
        self.style
    }

    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }
}

fn clamp_coordinate(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-STYLE_COORDINATE_LIMIT, STYLE_COORDINATE_LIMIT)
    }
}

/// Voice parameters tagged by the backend they belong to.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceParameters {
    Local(LocalVoiceParams),
    Cloud(CloudVoiceParams),
}

impl VoiceParameters {
    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        match self {
            Self::Local(_) => BackendKind::LocalQuery,
            Self::Cloud(_) => BackendKind::CloudStyle,
        }
    }
}

impl From<LocalVoiceParams> for VoiceParameters {
    fn from(params: LocalVoiceParams) -> Self {
        Self::Local(params)
    }
}

impl From<CloudVoiceParams> for VoiceParameters {
    fn from(params: CloudVoiceParams) -> Self {
        Self::Cloud(params)
    }
}
