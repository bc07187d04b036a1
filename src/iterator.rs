//! Pull-based lazy sequences over a suspended body.
//!
//! An [`AsyncIterator`] adapts one run context into a sequence: each
//! [`AsyncIterator::next`] runs the body until it either emits a value
//! ([`IterStep::Next`]) or returns ([`IterStep::Done`]), at which point the
//! coroutine goes back to the pool. At most one pull may be outstanding at a
//! time, and pulling past the final step is an error.

use crate::context::RunContext;
use crate::error::Error;
use crate::promise::{self, Deferred, Promise};
use crate::protocol::{Hooks, Protocol};

use log::{debug, trace};
use std::sync::{Arc, Mutex};

/// One step of a lazy sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IterStep<T> {
    /// An intermediate value; the body is suspended at its yield point.
    Next(T),

    /// The body's final return value; the sequence is exhausted.
    Done(T),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Idle,
    Running,
    Suspended,
    Done,
}

struct IterShared<T> {
    state: Mutex<State>,
    pending: Mutex<Option<Deferred<IterStep<T>>>>,
}

/// A lazy sequence produced by an iterable suspendable function.
pub struct AsyncIterator<T> {
    ctx: Arc<RunContext<T>>,
    shared: Arc<IterShared<T>>,
}

impl<T: Clone + Send + 'static> AsyncIterator<T> {
    /// Pulls the next step of the sequence.
    ///
    /// The first pull starts the body; later pulls resume it at its yield
    /// point. Pulling while a pull is still being driven, or after the final
    /// step, yields an already-rejected promise.
    pub fn next(&self) -> Promise<IterStep<T>> {
        let first = {
            let mut state = self.shared.state.lock().unwrap();
            match *state {
                State::Running => return Promise::rejected(Error::IteratorRunning),
                State::Done => return Promise::rejected(Error::IteratorDone),
                State::Idle | State::Suspended => {
                    let first = *state == State::Idle;
                    *state = State::Running;
                    first
                }
            }
        };

        let (step, promise) = promise::deferred();
        *self.shared.pending.lock().unwrap() = Some(step);

        trace!("pulling next step (first: {first})");
        if first {
            self.ctx.schedule();
        } else {
            self.ctx.resume();
        }

        promise
    }

    /// Drives the whole sequence, invoking `callback` with every
    /// intermediate value.
    ///
    /// Resolves with the body's final return value once the sequence is
    /// exhausted. Any body error or callback error aborts the drive and
    /// rejects the returned promise.
    pub fn for_each<F>(self, callback: F) -> Promise<T>
    where
        F: FnMut(T) -> Result<(), Error> + Send + 'static,
    {
        let (done, promise) = promise::deferred();
        drive(Arc::new(self), Arc::new(Mutex::new(callback)), done);
        promise
    }
}

fn drive<T, F>(iterator: Arc<AsyncIterator<T>>, callback: Arc<Mutex<F>>, done: Deferred<T>)
where
    T: Clone + Send + 'static,
    F: FnMut(T) -> Result<(), Error> + Send + 'static,
{
    let next = iterator.next();
    let again = iterator.clone();

    next.subscribe(move |step| match step {
        Ok(IterStep::Next(value)) => {
            let fed = (&mut *callback.lock().unwrap())(value);
            match fed {
                Ok(()) => drive(again, callback, done),
                Err(error) => {
                    debug!("step callback failed, aborting drive");
                    done.reject(error);
                }
            }
        }
        Ok(IterStep::Done(value)) => done.resolve(value),
        Err(error) => done.reject(error),
    });
}

/// The lazy-sequence protocol: adapts a run context into an
/// [`AsyncIterator`].
#[derive(Clone, Copy, Debug, Default)]
pub struct IterProtocol;

fn settle<T: Clone + Send + 'static>(
    ctx: &RunContext<T>,
    state: State,
    step: Result<IterStep<T>, Error>,
) {
    let Some(shared) = ctx.with_state::<Arc<IterShared<T>>, _>(|shared| shared.clone()) else {
        trace!("iterator state already detached");
        return;
    };

    // Update the state before settling: the consumer may pull again from
    // inside its completion callback.
    *shared.state.lock().unwrap() = state;
    let Some(pending) = shared.pending.lock().unwrap().take() else {
        trace!("no pull outstanding for this step");
        return;
    };
    match step {
        Ok(step) => pending.resolve(step),
        Err(error) => pending.reject(error),
    }
}

impl<T: Clone + Send + 'static> Hooks<T> for IterProtocol {
    fn suspend(&self, ctx: &RunContext<T>, step: Result<T, Error>) {
        match step {
            Ok(value) => settle(ctx, State::Suspended, Ok(IterStep::Next(value))),
            Err(error) => settle(ctx, State::Done, Err(error)),
        }
    }

    fn end(&self, ctx: &RunContext<T>, outcome: Result<T, Error>) {
        match outcome {
            Ok(value) => settle(ctx, State::Done, Ok(IterStep::Done(value))),
            Err(error) => settle(ctx, State::Done, Err(error)),
        }
    }
}

impl<T: Clone + Send + 'static> Protocol<T> for IterProtocol {
    type Handle = AsyncIterator<T>;

    fn begin(&self, ctx: &Arc<RunContext<T>>) -> Result<AsyncIterator<T>, Error> {
        let shared = Arc::new(IterShared {
            state: Mutex::new(State::Idle),
            pending: Mutex::new(None),
        });
        ctx.attach_state(Box::new(shared.clone()));

        // Deferred start: the body runs once the first step is pulled.
        Ok(AsyncIterator {
            ctx: ctx.clone(),
            shared,
        })
    }
}
