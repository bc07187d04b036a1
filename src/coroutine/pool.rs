//! Process-wide pool of idle coroutines.
//!
//! Leasing is an optimization, not a correctness requirement: when the idle
//! set is empty a fresh worker is spawned, and the pool may grow without
//! bound. A released coroutine keeps its thread and stack but retains no
//! reference to the run context it just served.

use crate::coroutine::Coroutine;

use log::{debug, trace};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

static IDLE: OnceLock<Mutex<Vec<Coroutine>>> = OnceLock::new();
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    // Set once per worker thread; read by reentrancy checks.
    static IS_COROUTINE_THREAD: Cell<bool> = const { Cell::new(false) };
}

fn idle() -> &'static Mutex<Vec<Coroutine>> {
    IDLE.get_or_init(|| Mutex::new(Vec::new()))
}

/// Leases an idle coroutine, spawning a new one if none is available.
pub(crate) fn acquire() -> Coroutine {
    if let Some(coroutine) = idle().lock().unwrap().pop() {
        trace!("reusing coroutine {}", coroutine.id());
        return coroutine;
    }

    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    debug!("spawning coroutine {id}");
    Coroutine::spawn(id)
}

/// Returns a coroutine to the idle set once its job has fully returned.
pub(crate) fn release(coroutine: Coroutine) {
    trace!("releasing coroutine {}", coroutine.id());
    idle().lock().unwrap().push(coroutine);
}

/// Reports whether the calling code is itself running inside a managed
/// coroutine.
///
/// Used to detect reentrant suspendable calls: a nested call must bypass its
/// own admission gate, otherwise a body holding its only slot would deadlock
/// waiting for itself.
pub fn executing_on_coroutine() -> bool {
    IS_COROUTINE_THREAD.with(|flag| flag.get())
}

pub(crate) fn mark_coroutine_thread() {
    IS_COROUTINE_THREAD.with(|flag| flag.set(true));
}
