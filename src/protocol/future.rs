//! The future-returning protocol.

use crate::context::RunContext;
use crate::error::Error;
use crate::promise::{self, Promise};
use crate::protocol::{Hooks, Protocol};

use log::trace;
use std::sync::Arc;

/// Hands the caller a [`Promise`] and settles it when the body finishes.
#[derive(Clone, Copy, Debug, Default)]
pub struct FutureProtocol;

impl<T: Clone + Send + 'static> Hooks<T> for FutureProtocol {
    fn suspend(&self, _ctx: &RunContext<T>, _step: Result<T, Error>) {
        // Only iterable variants consume intermediate values.
        trace!("dropping intermediate value of a non-iterable body");
    }

    fn end(&self, ctx: &RunContext<T>, outcome: Result<T, Error>) {
        let Some(resolver) = ctx.take_resolver() else {
            trace!("future already settled by an outer layer");
            return;
        };

        match outcome {
            Ok(value) => resolver.resolve(value),
            Err(error) => resolver.reject(error),
        }
    }
}

impl<T: Clone + Send + 'static> Protocol<T> for FutureProtocol {
    type Handle = Promise<T>;

    fn begin(&self, ctx: &Arc<RunContext<T>>) -> Result<Promise<T>, Error> {
        let (resolver, promise) = promise::deferred();
        ctx.set_resolver(resolver);
        ctx.schedule();
        Ok(promise)
    }
}
