//! The suspension primitive, handed to every running body.
//!
//! A [`Scope`] is the body's only way to give up control. It is passed in as
//! an explicit parameter rather than living in ambient global state, and its
//! borrowed lifetime pins it to the body invocation it belongs to: it cannot
//! be stored, sent to another thread, or used after the body returns.
//!
//! [`Scope::wait`] suspends the body until one pending operation settles and
//! hands back its value, or re-raises its error at the call site exactly as a
//! local failure. [`Scope::wait_all`] does the same for an ordered collection:
//! results come back in input order no matter how the settlements race, and
//! the first rejection wins immediately with the remaining outcomes
//! discarded. [`Scope::emit`] is the yield point of iterable bodies.

use crate::context::RunContext;
use crate::coroutine::Suspender;
use crate::error::Error;
use crate::promise::Promise;

use log::trace;
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Eq, PartialEq)]
enum Phase {
    Registering,
    Parked,
    Done,
}

struct Join<U> {
    results: Vec<Option<U>>,
    remaining: usize,
    error: Option<Error>,
    phase: Phase,
}

/// The running body's handle to its own suspension point.
pub struct Scope<'a, T> {
    ctx: &'a Arc<RunContext<T>>,
    suspender: &'a Suspender,
}

impl<'a, T: Send + 'static> Scope<'a, T> {
    pub(crate) fn new(ctx: &'a Arc<RunContext<T>>, suspender: &'a Suspender) -> Scope<'a, T> {
        Scope { ctx, suspender }
    }

    /// Suspends the body until `operation` settles.
    ///
    /// Returns the resolved value, or the rejection error as if a local call
    /// had failed. An operation that has already settled completes without
    /// suspending at all.
    pub fn wait<U: Clone + Send + 'static>(&self, operation: &Promise<U>) -> Result<U, Error> {
        let mut results = self.join(std::slice::from_ref(operation))?;
        Ok(results.pop().expect("join of one operation yielded no result"))
    }

    /// Suspends the body until every operation settles, or any one rejects.
    ///
    /// The resolved values come back in the same order as `operations`,
    /// regardless of settlement order. On the first rejection the body
    /// resumes immediately with that error and the other outcomes are
    /// discarded.
    pub fn wait_all<U: Clone + Send + 'static>(
        &self,
        operations: &[Promise<U>],
    ) -> Result<Vec<U>, Error> {
        self.join(operations)
    }

    /// Yields an intermediate value from an iterable body.
    ///
    /// The body parks until the consumer pulls the next step. Non-iterable
    /// variants drop the value.
    pub fn emit(&self, value: T) {
        self.ctx.stash_yield(value);
        self.suspender.park();
    }

    fn join<U: Clone + Send + 'static>(&self, operations: &[Promise<U>]) -> Result<Vec<U>, Error> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let join = Arc::new(Mutex::new(Join {
            results: vec![None; operations.len()],
            remaining: operations.len(),
            error: None,
            phase: Phase::Registering,
        }));

        for (index, operation) in operations.iter().enumerate() {
            let join = join.clone();
            let ctx = self.ctx.clone();
            operation.subscribe(move |settled| {
                let should_resume;
                {
                    let mut join = join.lock().unwrap();
                    if join.phase == Phase::Done {
                        trace!("discarding settlement past completion");
                        return;
                    }
                    let complete = match settled {
                        Ok(value) => {
                            join.results[index] = Some(value);
                            join.remaining -= 1;
                            join.remaining == 0
                        }
                        Err(error) => {
                            // First rejection wins.
                            join.error = Some(error);
                            true
                        }
                    };
                    if !complete {
                        return;
                    }
                    should_resume = join.phase == Phase::Parked;
                    join.phase = Phase::Done;
                }
                if should_resume {
                    ctx.resume();
                }
            });
        }

        {
            let mut state = join.lock().unwrap();
            if state.phase != Phase::Done {
                state.phase = Phase::Parked;
                drop(state);
                trace!("body parked awaiting {} operation(s)", operations.len());
                self.suspender.park();
            }
        }

        let mut state = join.lock().unwrap();
        debug_assert!(state.phase == Phase::Done, "body resumed before completion");

        if let Some(error) = state.error.take() {
            return Err(error);
        }
        Ok(state
            .results
            .iter_mut()
            .map(|slot| slot.take().expect("completed join left a result empty"))
            .collect())
    }
}
