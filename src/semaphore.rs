//! Admission control for concurrently active bodies.
//!
//! Every suspendable-function definition owns one semaphore. A call either
//! enters immediately or queues; queued entries are granted strictly in
//! arrival order as running bodies leave. The unlimited variant always admits
//! and never queues.

use log::{debug, trace};
use std::collections::VecDeque;
use std::sync::Mutex;

type Entry = Box<dyn FnOnce() + Send>;

struct State {
    capacity: usize,
    occupied: usize,
    queue: VecDeque<Entry>,
}

/// Counting admission gate with a FIFO queue of deferred entries.
pub struct Semaphore {
    state: Option<Mutex<State>>,
}

impl Semaphore {
    /// Creates a gate admitting at most `capacity` concurrent entries.
    pub fn bounded(capacity: usize) -> Semaphore {
        Semaphore {
            state: Some(Mutex::new(State {
                capacity,
                occupied: 0,
                queue: VecDeque::new(),
            })),
        }
    }

    /// Creates a gate that always admits immediately.
    pub fn unlimited() -> Semaphore {
        Semaphore { state: None }
    }

    /// Admits `task` now if a slot is free, otherwise queues it.
    ///
    /// A queued task runs later on whichever thread frees the slot it was
    /// waiting for.
    pub fn enter(&self, task: impl FnOnce() + Send + 'static) {
        let Some(state) = &self.state else {
            task();
            return;
        };

        {
            let mut state = state.lock().unwrap();
            if state.occupied >= state.capacity {
                state.queue.push_back(Box::new(task));
                debug!("admission queued ({} waiting)", state.queue.len());
                return;
            }
            state.occupied += 1;
            trace!("admitted ({}/{})", state.occupied, state.capacity);
        }

        task();
    }

    /// Frees one slot, handing it to the oldest queued entry if any.
    pub fn leave(&self) {
        let Some(state) = &self.state else {
            return;
        };

        // The slot stays occupied for the dequeued task.
        let next = {
            let mut state = state.lock().unwrap();
            match state.queue.pop_front() {
                Some(task) => {
                    debug!("granting queued admission ({} still waiting)", state.queue.len());
                    Some(task)
                }
                None => {
                    state.occupied -= 1;
                    trace!("left ({}/{})", state.occupied, state.capacity);
                    None
                }
            }
        };

        if let Some(task) = next {
            task();
        }
    }

    /// Number of occupied slots; always zero for the unlimited gate.
    pub fn occupied(&self) -> usize {
        match &self.state {
            Some(state) => state.lock().unwrap().occupied,
            None => 0,
        }
    }
}
