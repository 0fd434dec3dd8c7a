//! Backend construction.

use std::sync::Arc;

use voicecast_core::Backends;

use crate::cloud::CloudStyleVoice;
use crate::config::SynthConfig;
use crate::local::LocalQueryVoice;

/// Build one instance of every synthesis backend.
pub fn build_backends(config: &SynthConfig) -> Backends {
    Backends::new(
        Arc::new(LocalQueryVoice::new(
            config.local_base_url.clone(),
            config.timeout,
        )),
        Arc::new(CloudStyleVoice::new(
            config.cloud_endpoint.clone(),
            config.timeout,
        )),
    )
}
