//! Command handlers.
//!
//! Handlers are thin wrappers: build settings, bootstrap the context, drive
//! the orchestrator and format the result for the terminal. Errors surface as
//! [`CliError`](crate::CliError) inside `anyhow` so `main` can pick the exit
//! code.

pub mod devices;
pub mod speak;
