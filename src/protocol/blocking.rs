//! The raw-value protocol.

use crate::context::RunContext;
use crate::error::Error;
use crate::protocol::{Hooks, Protocol};

use log::trace;
use std::sync::{Arc, Condvar, Mutex};

struct Gate<T> {
    cell: Mutex<Option<Result<T, Error>>>,
    settled: Condvar,
}

impl<T> Gate<T> {
    fn new() -> Arc<Gate<T>> {
        Arc::new(Gate {
            cell: Mutex::new(None),
            settled: Condvar::new(),
        })
    }

    fn put(&self, outcome: Result<T, Error>) {
        *self.cell.lock().unwrap() = Some(outcome);
        self.settled.notify_all();
    }

    fn wait(&self) -> Result<T, Error> {
        let mut cell = self.cell.lock().unwrap();
        loop {
            if let Some(outcome) = cell.take() {
                return outcome;
            }
            cell = self.settled.wait(cell).unwrap();
        }
    }
}

/// Runs the body and hands the caller its plain outcome.
///
/// The call blocks the calling thread until the body has fully finished, so
/// the awaited operations must settle from elsewhere. Inside a coroutine,
/// prefer the future kind plus an await.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockingProtocol;

impl<T: Send + 'static> Hooks<T> for BlockingProtocol {
    fn suspend(&self, _ctx: &RunContext<T>, _step: Result<T, Error>) {
        trace!("dropping intermediate value of a blocking body");
    }

    fn end(&self, ctx: &RunContext<T>, outcome: Result<T, Error>) {
        if ctx
            .with_state::<Arc<Gate<T>>, _>(|gate| gate.clone())
            .map(|gate| gate.put(outcome))
            .is_none()
        {
            trace!("blocking gate already consumed");
        }
    }
}

impl<T: Send + 'static> Protocol<T> for BlockingProtocol {
    type Handle = T;

    fn begin(&self, ctx: &Arc<RunContext<T>>) -> Result<T, Error> {
        let gate = Gate::new();
        ctx.attach_state(Box::new(gate.clone()));
        ctx.schedule();
        gate.wait()
    }
}
