//! Speak command handler.

use anyhow::Result;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use voicecast_core::SinkKind;
use voicecast_voice::SpeechEvent;

use crate::bootstrap::{CliContext, bootstrap, speech_settings};
use crate::commands::SpeakArgs;
use crate::error::CliError;
use crate::parser::Cli;

/// Synthesize `args.text`, play it, and optionally play it again.
///
/// The secondary sink needs a device list, so devices are enumerated once
/// before the run.
pub async fn execute(cli: &Cli, args: &SpeakArgs, cancel: &CancellationToken) -> Result<()> {
    let settings = speech_settings(cli, Some(args));
    let CliContext {
        mut orchestrator,
        events,
    } = bootstrap(&settings)?;
    let reporter = tokio::spawn(report(events));

    if settings.sink == SinkKind::Secondary {
        orchestrator.refresh_devices().map_err(CliError::from)?;
    }

    let outcome = orchestrator
        .run(
            &args.text,
            settings.backend,
            settings.sink_choice(),
            &settings.voice_parameters(),
            cancel,
        )
        .await
        .map_err(CliError::from)?;
    CliError::check(outcome)?;

    if args.replay {
        let outcome = orchestrator.replay(cancel).await.map_err(CliError::from)?;
        CliError::check(outcome)?;
    }

    // Closing the event channel lets the reporter finish.
    drop(orchestrator);
    let _ = reporter.await;
    Ok(())
}

async fn report(mut events: UnboundedReceiver<SpeechEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SpeechEvent::Synthesized { backend, bytes } => {
                println!("Synthesized {bytes} bytes with the {backend} backend");
            }
            SpeechEvent::Decoded {
                sample_rate,
                channels,
                duration,
            } => {
                println!(
                    "Decoded {:.2}s of audio ({sample_rate} Hz, {channels} channel(s))",
                    duration.as_secs_f64()
                );
            }
            other => debug!(event = ?other, "Speech event"),
        }
    }
}
