//! Per-invocation run context.
//!
//! One [`RunContext`] is created for every call on a suspendable function. It
//! binds the pre-bound body job, the active protocol's hooks, the optional
//! trailing callback, the optional future resolver, the closure that returns
//! the admission slot, and the leased coroutine. The drive path lives here:
//! [`RunContext::schedule`] routes the launch through the semaphore,
//! [`RunContext::launch`] leases a coroutine and runs the body to its first
//! suspension point, and [`RunContext::resume`] re-enters a parked body.
//!
//! After every step the context dispatches what happened: a pending yield
//! goes to the protocol's `suspend` hook, a finished body to its `end` hook
//! followed by the semaphore slot and the coroutine going back where they
//! came from. Hooks therefore always run on the driving thread, never inside
//! the parked body.

use crate::coroutine::{Coroutine, Job, StepEvent, pool};
use crate::error::Error;
use crate::promise::Deferred;
use crate::protocol::Hooks;
use crate::scope::Scope;
use crate::semaphore::Semaphore;

use log::trace;
use std::any::Any;
use std::panic;
use std::sync::{Arc, Mutex};

pub(crate) type BodyJob<T> = Box<dyn FnOnce(&Scope<'_, T>) -> Result<T, Error> + Send>;

/// A completion callback supplied with a call (or through a thunk).
pub type Callback<T> = Box<dyn FnOnce(Result<T, Error>) + Send>;

/// State of one invocation of a suspendable function.
pub struct RunContext<T> {
    body: Mutex<Option<BodyJob<T>>>,
    hooks: Arc<dyn Hooks<T>>,
    semaphore: Arc<Semaphore>,
    callback: Mutex<Option<Callback<T>>>,
    resolver: Mutex<Option<Deferred<T>>>,
    release: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    coroutine: Mutex<Option<Coroutine>>,
    yielded: Mutex<Option<T>>,
    outcome: Mutex<Option<Result<T, Error>>>,
    slot: Mutex<Option<Box<dyn Any + Send>>>,
}

impl<T: Send + 'static> RunContext<T> {
    pub(crate) fn new(
        body: BodyJob<T>,
        hooks: Arc<dyn Hooks<T>>,
        semaphore: Arc<Semaphore>,
    ) -> Arc<RunContext<T>> {
        Arc::new(RunContext {
            body: Mutex::new(Some(body)),
            hooks,
            semaphore,
            callback: Mutex::new(None),
            resolver: Mutex::new(None),
            release: Mutex::new(None),
            coroutine: Mutex::new(None),
            yielded: Mutex::new(None),
            outcome: Mutex::new(None),
            slot: Mutex::new(None),
        })
    }

    /// Stores the trailing callback for this invocation.
    pub fn set_callback(&self, callback: Callback<T>) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    /// Takes the trailing callback, if one was supplied.
    pub fn take_callback(&self) -> Option<Callback<T>> {
        self.callback.lock().unwrap().take()
    }

    /// Stores the resolver that settles this invocation's future.
    pub fn set_resolver(&self, resolver: Deferred<T>) {
        *self.resolver.lock().unwrap() = Some(resolver);
    }

    /// Takes the future resolver, if one was attached.
    pub fn take_resolver(&self) -> Option<Deferred<T>> {
        self.resolver.lock().unwrap().take()
    }

    /// Attaches an opaque per-invocation value for the active protocol.
    pub fn attach_state(&self, state: Box<dyn Any + Send>) {
        *self.slot.lock().unwrap() = Some(state);
    }

    /// Borrows the attached protocol state, if it has the expected type.
    pub fn with_state<S: 'static, R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.slot
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|state| state.downcast_ref::<S>())
            .map(f)
    }

    /// Removes and returns the attached protocol state, if it has the
    /// expected type.
    pub fn take_state<S: 'static>(&self) -> Option<S> {
        let state = self.slot.lock().unwrap().take()?;
        match state.downcast::<S>() {
            Ok(state) => Some(*state),
            Err(other) => {
                *self.slot.lock().unwrap() = Some(other);
                None
            }
        }
    }

    /// Routes the launch of this invocation through its admission gate.
    ///
    /// The body starts immediately if a slot is free, or later on whichever
    /// thread frees the slot it queued for.
    pub fn schedule(self: &Arc<Self>) {
        {
            let semaphore = self.semaphore.clone();
            *self.release.lock().unwrap() = Some(Box::new(move || semaphore.leave()));
        }

        let ctx = self.clone();
        self.semaphore.enter(move || ctx.launch());
    }

    /// Leases a coroutine and runs the body to its first park or finish.
    pub(crate) fn launch(self: &Arc<Self>) {
        let coroutine = pool::acquire();
        let driver = coroutine.driver();
        *self.coroutine.lock().unwrap() = Some(coroutine);

        let ctx = self.clone();
        let job: Job = Box::new(move |suspender| {
            let body = ctx
                .body
                .lock()
                .unwrap()
                .take()
                .expect("run context started twice");
            let scope = Scope::new(&ctx, suspender);
            let outcome = body(&scope);
            *ctx.outcome.lock().unwrap() = Some(outcome);
        });

        let event = driver.start(job);
        self.dispatch(event);
    }

    /// Re-enters a parked body and dispatches whatever it does next.
    pub fn resume(self: &Arc<Self>) {
        let driver = {
            let coroutine = self.coroutine.lock().unwrap();
            coroutine
                .as_ref()
                .expect("resumed a run context with no parked coroutine")
                .driver()
        };

        let event = driver.resume();
        self.dispatch(event);
    }

    fn dispatch(self: &Arc<Self>, event: StepEvent) {
        match event {
            StepEvent::Parked => {
                // A park with a stashed value is a yield; a bare park is an
                // await and needs nothing from the driver.
                if let Some(value) = self.yielded.lock().unwrap().take() {
                    self.hooks.suspend(self, Ok(value));
                }
            }
            StepEvent::Finished(payload) => self.finish(payload),
        }
    }

    fn finish(self: &Arc<Self>, payload: Option<Box<dyn Any + Send>>) {
        let coroutine = self
            .coroutine
            .lock()
            .unwrap()
            .take()
            .expect("body finished without a leased coroutine");

        if let Some(payload) = payload {
            // The body unwound. Put the lease back, free the slot, and
            // re-raise on the driving thread where someone can hear it.
            self.release_slot();
            pool::release(coroutine);
            panic::resume_unwind(payload);
        }

        let outcome = self
            .outcome
            .lock()
            .unwrap()
            .take()
            .expect("body finished without an outcome");

        trace!("body finished, settling through end hook");
        self.hooks.end(self, outcome);
        self.release_slot();
        pool::release(coroutine);
    }

    fn release_slot(&self) {
        if let Some(release) = self.release.lock().unwrap().take() {
            release();
        }
    }

    pub(crate) fn stash_yield(&self, value: T) {
        *self.yielded.lock().unwrap() = Some(value);
    }
}
