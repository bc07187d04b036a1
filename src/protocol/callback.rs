//! Callback-accepting protocols.

use crate::context::RunContext;
use crate::error::Error;
use crate::protocol::{Hooks, Protocol};

use log::{debug, trace};
use std::sync::Arc;

/// Layers trailing-callback delivery over any base protocol.
///
/// When the body finishes, the per-call callback (if one was supplied) is
/// invoked with the outcome before the base protocol settles its own handle.
#[derive(Clone, Copy, Debug)]
pub struct CallbackLayer<P> {
    base: P,
}

impl<P> CallbackLayer<P> {
    pub fn new(base: P) -> CallbackLayer<P> {
        CallbackLayer { base }
    }
}

impl<T: Clone + Send + 'static, P: Hooks<T>> Hooks<T> for CallbackLayer<P> {
    fn suspend(&self, ctx: &RunContext<T>, step: Result<T, Error>) {
        self.base.suspend(ctx, step);
    }

    fn end(&self, ctx: &RunContext<T>, outcome: Result<T, Error>) {
        match ctx.take_callback() {
            Some(callback) => callback(outcome.clone()),
            None => debug!("call supplied no trailing callback"),
        }
        self.base.end(ctx, outcome);
    }
}

impl<T: Clone + Send + 'static, P: Protocol<T>> Protocol<T> for CallbackLayer<P> {
    type Handle = P::Handle;

    fn begin(&self, ctx: &Arc<RunContext<T>>) -> Result<Self::Handle, Error> {
        self.base.begin(ctx)
    }
}

/// The fire-and-forget base: the call returns nothing and the outcome is
/// dropped here, having already reached the trailing callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardProtocol;

impl<T: Send + 'static> Hooks<T> for DiscardProtocol {
    fn suspend(&self, _ctx: &RunContext<T>, _step: Result<T, Error>) {
        trace!("dropping intermediate value of a fire-and-forget body");
    }

    fn end(&self, _ctx: &RunContext<T>, outcome: Result<T, Error>) {
        if outcome.is_err() {
            debug!("discarding failed outcome of a fire-and-forget call");
        }
    }
}

impl<T: Send + 'static> Protocol<T> for DiscardProtocol {
    type Handle = ();

    fn begin(&self, ctx: &Arc<RunContext<T>>) -> Result<(), Error> {
        ctx.schedule();
        Ok(())
    }
}
