//! Timer-backed completion sources.
//!
//! The engine never runs an event loop of its own; it only reacts when a
//! pending operation settles. These helpers are the smallest possible host
//! stand-in: a background timer thread that settles a deferred after a delay.
//! Useful for tests, demos, and racing a real operation against a deadline.

use crate::error::Error;
use crate::promise::{self, Promise};

use log::trace;
use std::thread;
use std::time::Duration;

/// Returns a promise resolved with `value` after `delay`.
pub fn resolve_after<T: Clone + Send + 'static>(delay: Duration, value: T) -> Promise<T> {
    let (deferred, promise) = promise::deferred();

    thread::Builder::new()
        .name("cofn-timer".into())
        .spawn(move || {
            thread::sleep(delay);
            trace!("timer fired after {delay:?}");
            deferred.resolve(value);
        })
        .expect("failed to spawn timer thread");

    promise
}

/// Returns a promise rejected with `error` after `delay`.
pub fn reject_after<T: Clone + Send + 'static>(delay: Duration, error: Error) -> Promise<T> {
    let (deferred, promise) = promise::deferred();

    thread::Builder::new()
        .name("cofn-timer".into())
        .spawn(move || {
            thread::sleep(delay);
            trace!("timer fired after {delay:?}");
            deferred.reject(error);
        })
        .expect("failed to spawn timer thread");

    promise
}
