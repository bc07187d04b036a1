//! The deferred-invocation protocol.

use crate::context::{Callback, RunContext};
use crate::error::Error;
use crate::protocol::{Hooks, Protocol};

use log::trace;
use std::sync::Arc;

struct Sink<T>(Callback<T>);

/// A zero-argument deferred-invocation handle.
///
/// The body has not started yet; it starts when the thunk is invoked with a
/// completion callback. Invocation consumes the thunk, so a body can run at
/// most once per call.
pub struct Thunk<T> {
    ctx: Arc<RunContext<T>>,
}

impl<T: Send + 'static> Thunk<T> {
    /// Starts the body; `callback` receives the outcome when it finishes.
    pub fn invoke(self, callback: impl FnOnce(Result<T, Error>) + Send + 'static) {
        self.ctx.attach_state(Box::new(Sink::<T>(Box::new(callback))));
        self.ctx.schedule();
    }
}

/// Hands the caller a [`Thunk`] and delivers the outcome to whatever callback
/// the thunk is eventually invoked with.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThunkProtocol;

impl<T: Send + 'static> Hooks<T> for ThunkProtocol {
    fn suspend(&self, _ctx: &RunContext<T>, _step: Result<T, Error>) {
        trace!("dropping intermediate value of a thunk body");
    }

    fn end(&self, ctx: &RunContext<T>, outcome: Result<T, Error>) {
        match ctx.take_state::<Sink<T>>() {
            Some(sink) => (sink.0)(outcome),
            None => trace!("thunk outcome already delivered by an outer layer"),
        }
    }
}

impl<T: Send + 'static> Protocol<T> for ThunkProtocol {
    type Handle = Thunk<T>;

    fn begin(&self, ctx: &Arc<RunContext<T>>) -> Result<Thunk<T>, Error> {
        // Deferred start: nothing is scheduled until the thunk is invoked.
        Ok(Thunk { ctx: ctx.clone() })
    }
}
