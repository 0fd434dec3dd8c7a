//! Playback sinks and the handle that drives them.

mod handle;
mod primary;
mod secondary;

use std::sync::Arc;
use std::time::Duration;

use voicecast_core::Sinks;

pub use handle::PlaybackHandle;
pub use primary::PrimaryOutput;
pub use secondary::SecondaryOutput;

/// How often the secondary output is asked whether it has drained.
pub const DEVICE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Build one instance of every hardware sink.
pub fn build_sinks() -> Sinks {
    Sinks::new(
        Arc::new(PrimaryOutput::new()),
        Arc::new(SecondaryOutput::new(DEVICE_POLL_INTERVAL)),
    )
}
