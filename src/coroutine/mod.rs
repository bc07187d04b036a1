//! Suspendable execution contexts backed by pooled worker threads.
//!
//! A [`Coroutine`] gives a body a real stack it can park on: the body runs on
//! a dedicated worker thread, and a strict-handoff channel pair transfers
//! control between that worker and whichever thread is driving it. The driver
//! blocks for exactly the span in which the body runs, so along any one chain
//! of control at most one body is actually executing at any instant.
//!
//! # Handoff protocol
//!
//! 1. The driver submits a job with [`Driver::start`] and blocks.
//! 2. The body runs until it parks ([`Suspender::park`]) or returns; either
//!    way the worker emits one [`StepEvent`] and the driver wakes up.
//! 3. A later driver (often a completion callback on another thread) calls
//!    [`Driver::resume`], unparking the body and blocking in its turn.
//!
//! Alternation is enforced by a mutex over the driver half: each locked
//! section sends exactly one signal and receives exactly one event.

pub(crate) mod pool;

use log::trace;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread;

/// What a coroutine reported when control came back to the driver.
pub(crate) enum StepEvent {
    /// The body parked at a suspension point; a resume will continue it.
    Parked,

    /// The body returned, or unwound with the carried panic payload.
    Finished(Option<Box<dyn Any + Send>>),
}

/// A body job, run to completion on the worker thread.
pub(crate) type Job = Box<dyn FnOnce(&Suspender) + Send + 'static>;

// Marker payload for a park whose driver disappeared. Unwound without the
// panic hook so abandoned coroutines wind down quietly.
struct Abandoned;

struct DriverHalf {
    job_tx: Sender<Job>,
    resume_tx: Sender<()>,
    event_rx: Receiver<StepEvent>,
}

/// An execution context leased from the pool.
///
/// While idle it is owned by the pool; while leased it is owned by exactly
/// one run context. The worker thread and its stack survive across leases.
pub(crate) struct Coroutine {
    half: Arc<Mutex<DriverHalf>>,
    id: usize,
}

/// A cloneable handle that drives a coroutine from any thread.
pub(crate) struct Driver {
    half: Arc<Mutex<DriverHalf>>,
    id: usize,
}

/// The worker-side half of the handoff, lent to the running body.
pub(crate) struct Suspender {
    event_tx: Sender<StepEvent>,
    resume_rx: Receiver<()>,
}

impl Coroutine {
    /// Spawns a fresh worker thread with an empty job queue.
    pub(crate) fn spawn(id: usize) -> Coroutine {
        let (job_tx, job_rx) = channel::<Job>();
        let (resume_tx, resume_rx) = channel::<()>();
        let (event_tx, event_rx) = channel::<StepEvent>();

        thread::Builder::new()
            .name(format!("cofn-worker-{id}"))
            .spawn(move || {
                worker_loop(
                    job_rx,
                    Suspender {
                        event_tx,
                        resume_rx,
                    },
                )
            })
            .expect("failed to spawn coroutine worker thread");

        Coroutine {
            half: Arc::new(Mutex::new(DriverHalf {
                job_tx,
                resume_tx,
                event_rx,
            })),
            id,
        }
    }

    /// Returns a driving handle usable independently of pool ownership.
    pub(crate) fn driver(&self) -> Driver {
        Driver {
            half: self.half.clone(),
            id: self.id,
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }
}

impl Driver {
    /// Submits a job and blocks until the body first parks or finishes.
    pub(crate) fn start(&self, job: Job) -> StepEvent {
        let half = self.half.lock().unwrap();
        trace!("starting body on coroutine {}", self.id);
        half.job_tx
            .send(job)
            .expect("coroutine worker disconnected");
        half.event_rx
            .recv()
            .expect("coroutine worker disconnected")
    }

    /// Unparks the body and blocks until it parks again or finishes.
    ///
    /// Callers contend on the driver mutex, so a resume issued while the body
    /// is still running simply waits its turn.
    pub(crate) fn resume(&self) -> StepEvent {
        let half = self.half.lock().unwrap();
        trace!("resuming coroutine {}", self.id);
        half.resume_tx
            .send(())
            .expect("coroutine worker disconnected");
        half.event_rx
            .recv()
            .expect("coroutine worker disconnected")
    }
}

impl Suspender {
    /// Parks the calling body until the next [`Driver::resume`].
    ///
    /// Control returns to the blocked driver, not to the body's caller; the
    /// worker thread keeps its stack and re-enters exactly here.
    pub(crate) fn park(&self) {
        self.event_tx
            .send(StepEvent::Parked)
            .expect("coroutine driver disconnected");

        if self.resume_rx.recv().is_err() {
            // Every driving handle is gone; unwind the body quietly.
            panic::resume_unwind(Box::new(Abandoned));
        }
    }
}

fn worker_loop(job_rx: Receiver<Job>, suspender: Suspender) {
    pool::mark_coroutine_thread();

    while let Ok(job) = job_rx.recv() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(&suspender)));

        let payload = match outcome {
            Ok(()) => None,
            Err(payload) if payload.is::<Abandoned>() => break,
            Err(payload) => Some(payload),
        };

        if suspender.event_tx.send(StepEvent::Finished(payload)).is_err() {
            break;
        }
    }
}
