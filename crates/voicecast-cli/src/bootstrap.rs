//! CLI bootstrap - the composition root.
//!
//! The only place where concrete adapters are instantiated:
//! - HTTP synthesis backends (via voicecast-synth)
//! - WAV decoder, hardware sinks and device catalog (via voicecast-voice)
//!
//! Handlers receive the composed [`CliContext`] and drive the orchestrator.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use voicecast_core::{SpeechSettings, validate_settings};
use voicecast_synth::{SynthConfig, build_backends};
use voicecast_voice::{CpalDeviceCatalog, SpeechEvent, SpeechOrchestrator, WavDecoder, build_sinks};

use crate::commands::SpeakArgs;
use crate::error::CliError;
use crate::parser::Cli;

/// Fully composed context for CLI commands.
pub struct CliContext {
    pub orchestrator: SpeechOrchestrator,
    pub events: UnboundedReceiver<SpeechEvent>,
}

/// Collect settings from global options and, for `speak`, its arguments.
pub fn speech_settings(cli: &Cli, speak: Option<&SpeakArgs>) -> SpeechSettings {
    let mut settings = SpeechSettings {
        local_base_url: cli.base_url.clone(),
        cloud_endpoint: cli.cloud_endpoint.clone(),
        request_timeout_secs: cli.timeout_secs,
        ..SpeechSettings::default()
    };

    if let Some(args) = speak {
        settings.backend = args.backend.into();
        settings.sink = args.sink.into();
        settings.speaker_id = args.speaker;
        settings.upspeak = args.upspeak;
        settings.core_version.clone_from(&args.core_version);
        settings.speaker_x = args.speaker_x;
        settings.speaker_y = args.speaker_y;
        settings.style = args.style;
        settings.seed = args.seed;
        settings.device_index = args.device;
    }

    settings
}

/// Validate settings and wire every adapter into a [`SpeechOrchestrator`].
pub fn bootstrap(settings: &SpeechSettings) -> Result<CliContext, CliError> {
    validate_settings(settings)?;
    let synth = SynthConfig::from_settings(settings)?;

    let (orchestrator, events) = SpeechOrchestrator::new(
        build_backends(&synth),
        Arc::new(WavDecoder::new()),
        build_sinks(),
        Arc::new(CpalDeviceCatalog),
    );

    tracing::debug!(
        backend = %settings.backend,
        sink = %settings.sink,
        timeout_secs = settings.request_timeout_secs,
        "CLI context ready"
    );
    Ok(CliContext {
        orchestrator,
        events,
    })
}

/// A token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling");
            trigger.cancel();
        }
    });
    cancel
}
