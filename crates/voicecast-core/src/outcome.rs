//! Three-way result type shared by every network and decode stage.
//!
//! An [`Outcome`] describes how an *environmental* operation ended: it
//! produced a value, it failed in a way that may succeed on a second attempt,
//! or it failed for good. Cancellation is not an outcome; it travels on the
//! `Err` side as [`VoiceError::Cancelled`](crate::VoiceError::Cancelled) so a
//! cancelled call can never be mistaken for a failed one.

use std::fmt;

/// Result of a fallible pipeline stage.
///
/// Consumers match all three variants. Nothing in the pipeline retries on
/// its own: a `Retryable` is surfaced to the caller, who decides.
#[must_use = "an Outcome must be matched on all three variants"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation produced a value.
    Success(T),

    /// The operation failed, but repeating it with unchanged inputs may succeed
    /// (server busy, timeout, dropped connection).
    Retryable(String),

    /// The operation failed and must not be repeated with the same inputs.
    Failure(String),
}

/// Variant tag of an [`Outcome`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    Retryable,
    Failure,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Retryable => "retryable",
            Self::Failure => "failure",
        })
    }
}

impl<T> Outcome<T> {
    /// Build a retryable outcome from any displayable reason.
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable(reason.into())
    }

    /// Build a terminal failure from any displayable reason.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }

    /// The variant tag.
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::Retryable(_) => OutcomeKind::Retryable,
            Self::Failure(_) => OutcomeKind::Failure,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure reason, or `None` for a success.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Retryable(reason) | Self::Failure(reason) => Some(reason),
        }
    }

    /// Consume the outcome, keeping only a successful value.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Retryable(_) | Self::Failure(_) => None,
        }
    }

    /// Transform the success value, carrying failures through unchanged.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Retryable(reason) => Outcome::Retryable(reason),
            Self::Failure(reason) => Outcome::Failure(reason),
        }
    }

    /// Chain a dependent step; it only runs when `self` is a success.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Self::Success(value) => f(value),
            Self::Retryable(reason) => Outcome::Retryable(reason),
            Self::Failure(reason) => Outcome::Failure(reason),
        }
    }
}
