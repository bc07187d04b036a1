//! Completion protocols: how a running body becomes an observable result.
//!
//! A protocol is a triple of lifecycle hooks around one invocation:
//!
//! - `begin` runs once, synchronously, before the body starts. It returns the
//!   externally observable handle (a future, a thunk, an iterator, a plain
//!   value) and arranges for the coroutine to actually start.
//! - `suspend` runs whenever the body yields an intermediate value without
//!   finishing. Only iterable variants produce these.
//! - `end` runs exactly once when the body returns or fails, and settles
//!   whatever `begin` handed out.
//!
//! New protocols are built by layering over an existing one: a wrapper may
//! call through to the base hooks before or after its own logic and may
//! rewrite the value or error it passes down. [`MapOutcome`] is the canonical
//! layer. Protocols never inspect one another's state; they share only the
//! run context and these three signatures.

mod blocking;
mod callback;
mod future;
mod thunk;

pub use blocking::BlockingProtocol;
pub use callback::{CallbackLayer, DiscardProtocol};
pub use future::FutureProtocol;
pub use thunk::{Thunk, ThunkProtocol};

use crate::context::RunContext;
use crate::error::Error;

use std::sync::Arc;

/// The object-safe part of a protocol, kept by every run context.
pub trait Hooks<T>: Send + Sync {
    /// Invoked when the body yields an intermediate value or error without
    /// finishing. The two are mutually exclusive.
    fn suspend(&self, ctx: &RunContext<T>, step: Result<T, Error>);

    /// Invoked exactly once when the body finishes.
    ///
    /// A panic here propagates on the driving thread: no observer remains to
    /// receive the failure, so it must not be swallowed.
    fn end(&self, ctx: &RunContext<T>, outcome: Result<T, Error>);
}

/// A complete protocol: the hooks plus the entry point that produces the
/// caller-visible handle.
pub trait Protocol<T>: Hooks<T> {
    /// What a call on the produced function returns.
    type Handle;

    /// Sets this invocation up and arranges its start.
    ///
    /// An error fails the call synchronously; no coroutine has started and
    /// the run context is dropped.
    fn begin(&self, ctx: &Arc<RunContext<T>>) -> Result<Self::Handle, Error>;
}

/// Layers over a base protocol, rewriting every value or error that flows
/// into the base's `suspend` and `end` hooks.
pub struct MapOutcome<P, F> {
    base: P,
    map: F,
}

impl<P, F> MapOutcome<P, F> {
    pub fn new(base: P, map: F) -> MapOutcome<P, F> {
        MapOutcome { base, map }
    }
}

impl<T, P, F> Hooks<T> for MapOutcome<P, F>
where
    P: Hooks<T>,
    F: Fn(Result<T, Error>) -> Result<T, Error> + Send + Sync,
{
    fn suspend(&self, ctx: &RunContext<T>, step: Result<T, Error>) {
        self.base.suspend(ctx, (self.map)(step));
    }

    fn end(&self, ctx: &RunContext<T>, outcome: Result<T, Error>) {
        self.base.end(ctx, (self.map)(outcome));
    }
}

impl<T, P, F> Protocol<T> for MapOutcome<P, F>
where
    P: Protocol<T>,
    F: Fn(Result<T, Error>) -> Result<T, Error> + Send + Sync,
{
    type Handle = P::Handle;

    fn begin(&self, ctx: &Arc<RunContext<T>>) -> Result<Self::Handle, Error> {
        self.base.begin(ctx)
    }
}

impl<P: Clone, F: Clone> Clone for MapOutcome<P, F> {
    fn clone(&self) -> Self {
        MapOutcome {
            base: self.base.clone(),
            map: self.map.clone(),
        }
    }
}
