//! Backend and sink selectors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which synthesis service to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Locally hosted query/synthesis service (two requests per utterance).
    #[default]
    LocalQuery,
    /// Hosted style-coordinate service (one request per utterance).
    CloudStyle,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalQuery => "local-query",
            Self::CloudStyle => "cloud-style",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which output path to play through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SinkKind {
    /// Default output, fed decoded samples.
    #[default]
    Primary,
    /// Device chosen by index, fed the raw stream.
    Secondary,
}

impl SinkKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sink plus whatever it needs to be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkChoice {
    Primary,
    Secondary { device_index: usize },
}

impl SinkChoice {
    #[must_use]
    pub const fn kind(self) -> SinkKind {
        match self {
            Self::Primary => SinkKind::Primary,
            Self::Secondary { .. } => SinkKind::Secondary,
        }
    }
}
