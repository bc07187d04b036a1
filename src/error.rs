//! Error types for suspendable-function construction and execution.
//!
//! Configuration problems surface at build time as [`ConfigError`]; everything
//! that can go wrong while a suspendable function runs is an [`Error`]. Both
//! are cheap to clone and comparable, so rejection values keep their identity
//! all the way out to the caller.

use std::fmt;

use thiserror::Error;

/// Execution-time error of a suspendable function.
///
/// Body failures are created via [`Error::failure`]; the engine adds its own
/// variants for iterator misuse and invalid call shapes.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// The variant was built from an invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A failure reported by the wrapped body.
    #[error("{0}")]
    Failure(String),

    /// `next()` was called while a previous `next()` was still being driven.
    #[error("iterator resumed while already running")]
    IteratorRunning,

    /// `next()` was called after the final step had been delivered.
    #[error("iterated past end")]
    IteratorDone,

    /// A trailing callback was supplied to a variant that does not accept one.
    #[error("this variant does not accept a trailing callback")]
    CallbackNotAccepted,
}

impl Error {
    /// Creates a body-level failure from any displayable message.
    pub fn failure(msg: impl fmt::Display) -> Error {
        Error::Failure(msg.to_string())
    }
}

/// Invalid option combination, reported once at build time and never at call
/// time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    /// A concurrency bound of zero would never admit a call.
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,

    /// A fire-and-forget function with no callback has no observable outcome.
    #[error("a fire-and-forget function needs a trailing callback to observe its outcome")]
    UnobservableResult,

    /// Iterators are driven one step at a time and cannot be bounded.
    #[error("concurrency bounds are not supported on iterable functions")]
    IterableConcurrency,

    /// Iterable variants deliver their steps through futures only.
    #[error("iterable functions deliver steps through futures only")]
    IterableKind,
}
