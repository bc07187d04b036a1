//! The produced suspendable function.
//!
//! A [`Suspendable`] wraps a plain sequential body. Calling it creates a run
//! context, routes admission through the definition's semaphore, and hands
//! back whatever the active protocol's `begin` produced: a future, a thunk, a
//! plain value, an iterator, or nothing. A call issued from inside a running
//! coroutine bypasses the definition's own semaphore so a body can never
//! deadlock on a slot it already occupies.

use crate::config::Config;
use crate::context::{BodyJob, Callback, RunContext};
use crate::coroutine::pool;
use crate::error::Error;
use crate::protocol::{Hooks, Protocol};
use crate::scope::Scope;
use crate::semaphore::Semaphore;

use log::trace;
use std::sync::Arc;

pub(crate) type Body<A, T> = Arc<dyn Fn(&Scope<'_, T>, A) -> Result<T, Error> + Send + Sync>;

/// A function whose body may suspend without blocking its caller's thread.
pub struct Suspendable<A, T, P> {
    body: Body<A, T>,
    config: Config,
    protocol: Arc<P>,
    semaphore: Arc<Semaphore>,
}

impl<A, T, P> Suspendable<A, T, P>
where
    A: Send + 'static,
    T: Send + 'static,
    P: Protocol<T> + 'static,
{
    pub(crate) fn new(body: Body<A, T>, config: Config, protocol: P) -> Suspendable<A, T, P> {
        let semaphore = Arc::new(config.semaphore());
        Suspendable {
            body,
            config,
            protocol: Arc::new(protocol),
            semaphore,
        }
    }

    /// Invokes the body with `args`.
    ///
    /// Returns the protocol handle synchronously; whether the body has
    /// already started, finished, or is still queued for admission depends on
    /// the variant and the semaphore.
    pub fn call(&self, args: A) -> Result<P::Handle, Error> {
        self.invoke(args, None)
    }

    /// Invokes the body with `args` and a trailing completion callback.
    ///
    /// Only variants built with a callback accept one; other variants report
    /// the misuse synchronously.
    pub fn call_with(
        &self,
        args: A,
        callback: impl FnOnce(Result<T, Error>) + Send + 'static,
    ) -> Result<P::Handle, Error> {
        if !self.config.accepts_callback {
            return Err(Error::CallbackNotAccepted);
        }
        self.invoke(args, Some(Box::new(callback)))
    }

    /// The configuration this variant was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn invoke(&self, args: A, callback: Option<Callback<T>>) -> Result<P::Handle, Error> {
        // A nested call already holds a slot of its own definition's gate up
        // the stack; admitting it unconditionally avoids self-deadlock.
        let semaphore = if pool::executing_on_coroutine() {
            trace!("nested call bypasses its admission gate");
            Arc::new(Semaphore::unlimited())
        } else {
            self.semaphore.clone()
        };

        let body = self.body.clone();
        let job: BodyJob<T> = Box::new(move |scope| body(scope, args));

        let hooks: Arc<dyn Hooks<T>> = self.protocol.clone();
        let ctx = RunContext::new(job, hooks, semaphore);
        if let Some(callback) = callback {
            ctx.set_callback(callback);
        }

        self.protocol.begin(&ctx)
    }
}
