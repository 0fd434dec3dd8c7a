//! Subcommands and their arguments.

use clap::{Args, Subcommand, ValueEnum};
use voicecast_core::{BackendKind, SinkKind, Style};

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synthesize text and play it
    Speak(SpeakArgs),

    /// List audio output devices usable with `--sink secondary`
    Devices,
}

/// Synthesis backend as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Local engine: query creation, then synthesis
    Local,
    /// Cloud service driven by speaker coordinates and style
    Cloud,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Local => Self::LocalQuery,
            BackendArg::Cloud => Self::CloudStyle,
        }
    }
}

/// Output path as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkArg {
    /// Default output, plays decoded samples
    Primary,
    /// A chosen output device, streams the WAV payload
    Secondary,
}

impl From<SinkArg> for SinkKind {
    fn from(arg: SinkArg) -> Self {
        match arg {
            SinkArg::Primary => Self::Primary,
            SinkArg::Secondary => Self::Secondary,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SpeakArgs {
    /// Text to speak
    pub text: String,

    /// Synthesis backend
    #[arg(long, value_enum, env = "VOICECAST_BACKEND", default_value_t = BackendArg::Local)]
    pub backend: BackendArg,

    /// Output path
    #[arg(long, value_enum, env = "VOICECAST_SINK", default_value_t = SinkArg::Primary)]
    pub sink: SinkArg,

    /// Speaker id (local backend)
    #[arg(long, env = "VOICECAST_SPEAKER", default_value_t = 0)]
    pub speaker: u32,

    /// Raise the pitch at the end of questions (local backend)
    #[arg(long, value_name = "BOOL")]
    pub upspeak: Option<bool>,

    /// Engine core version to pin (local backend)
    #[arg(long, env = "VOICECAST_CORE_VERSION")]
    pub core_version: Option<String>,

    /// Speaker coordinate on the x axis, -3.0 to 3.0 (cloud backend)
    #[arg(long, env = "VOICECAST_SPEAKER_X", default_value_t = 0.0, allow_negative_numbers = true)]
    pub speaker_x: f64,

    /// Speaker coordinate on the y axis, -3.0 to 3.0 (cloud backend)
    #[arg(long, env = "VOICECAST_SPEAKER_Y", default_value_t = 0.0, allow_negative_numbers = true)]
    pub speaker_y: f64,

    /// Speaking style: talk, happy, sad, angry, fear or surprised (cloud backend)
    #[arg(long, env = "VOICECAST_STYLE", default_value_t = Style::Talk)]
    pub style: Style,

    /// Sampling seed for reproducible output (cloud backend)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output device index from `voicecast devices` (secondary sink)
    #[arg(long, env = "VOICECAST_DEVICE", default_value_t = 0)]
    pub device: usize,

    /// Play the utterance once more after it finishes
    #[arg(long)]
    pub replay: bool,
}
