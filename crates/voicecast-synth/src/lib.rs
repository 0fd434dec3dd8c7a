#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

mod cloud;
mod config;
mod error;
mod factory;
mod http;
mod local;

// ============================================================================
// Public API
// ============================================================================

pub use cloud::{CloudStyleVoice, CloudSynthesisResponse};
pub use config::SynthConfig;
pub use error::SynthError;
pub use factory::build_backends;
pub use local::{AudioQuery, LocalQueryVoice};

// Silence unused dev-dependency warnings
#[cfg(test)]
use axum as _;
