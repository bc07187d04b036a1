//! Completion handles for pending asynchronous operations.
//!
//! A [`Promise`] is the consumer half of a settle-once cell and a [`Deferred`]
//! is the producer half. Whoever completes the underlying operation settles
//! the deferred exactly once; subscribers registered before settlement run at
//! that moment on the settling thread, subscribers registered afterwards run
//! immediately. `Promise` also implements [`Future`], so host async code can
//! consume engine results directly.

use crate::error::Error;

use futures::task::AtomicWaker;

use log::trace;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

type Subscriber<T> = Box<dyn FnOnce(Result<T, Error>) + Send>;

enum State<T> {
    Pending(Vec<Subscriber<T>>),
    Settled(Result<T, Error>),
}

struct Shared<T> {
    state: Mutex<State<T>>,
    waker: AtomicWaker,
}

/// The consumer half of a pending operation.
///
/// Cloning a promise clones the handle, not the operation; all clones observe
/// the same settlement.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

/// The producer half of a pending operation.
///
/// Settling is idempotent: only the first `resolve` or `reject` takes effect,
/// later settlements are ignored.
pub struct Deferred<T> {
    shared: Arc<Shared<T>>,
}

/// Creates a linked producer/consumer pair for one pending operation.
pub fn deferred<T: Clone + Send + 'static>() -> (Deferred<T>, Promise<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending(Vec::new())),
        waker: AtomicWaker::new(),
    });

    (
        Deferred {
            shared: shared.clone(),
        },
        Promise { shared },
    )
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Creates a promise that is already resolved with `value`.
    pub fn resolved(value: T) -> Promise<T> {
        let (deferred, promise) = deferred();
        deferred.resolve(value);
        promise
    }

    /// Creates a promise that is already rejected with `error`.
    pub fn rejected(error: Error) -> Promise<T> {
        let (deferred, promise) = deferred();
        deferred.reject(error);
        promise
    }

    /// Registers a completion callback.
    ///
    /// Runs exactly once with the settled outcome: on the settling thread if
    /// the operation is still pending, or immediately on the current thread
    /// if it has already settled.
    pub fn subscribe(&self, f: impl FnOnce(Result<T, Error>) + Send + 'static) {
        let mut state = self.shared.state.lock().unwrap();
        match &mut *state {
            State::Pending(subscribers) => subscribers.push(Box::new(f)),
            State::Settled(result) => {
                let result = result.clone();
                // Invoke outside the lock so the callback may touch this
                // promise.
                drop(state);
                f(result);
            }
        }
    }

    /// Reports whether the operation has settled.
    pub fn is_settled(&self) -> bool {
        matches!(*self.shared.state.lock().unwrap(), State::Settled(_))
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Promise<T> {
        Promise {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Deferred<T> {
    /// Settles the operation with a value.
    pub fn resolve(&self, value: T) {
        self.settle(Ok(value));
    }

    /// Settles the operation with an error.
    pub fn reject(&self, error: Error) {
        self.settle(Err(error));
    }

    /// Returns a consumer handle for this operation.
    pub fn promise(&self) -> Promise<T> {
        Promise {
            shared: self.shared.clone(),
        }
    }

    fn settle(&self, result: Result<T, Error>) {
        let subscribers = {
            let mut state = self.shared.state.lock().unwrap();
            match &mut *state {
                State::Pending(subscribers) => {
                    let subscribers = std::mem::take(subscribers);
                    *state = State::Settled(result.clone());
                    subscribers
                }
                State::Settled(_) => {
                    trace!("ignoring repeated settlement");
                    return;
                }
            }
        };

        for subscriber in subscribers {
            subscriber(result.clone());
        }

        self.shared.waker.wake();
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Deferred<T> {
        Deferred {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Future for Promise<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Register before checking so a settlement racing with this poll
        // cannot be missed.
        self.shared.waker.register(cx.waker());

        match &*self.shared.state.lock().unwrap() {
            State::Settled(result) => Poll::Ready(result.clone()),
            State::Pending(_) => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use crate::error::Error;

    use super::deferred;

    #[test]
    fn subscriber_runs_on_settlement() {
        let _ = env_logger::try_init();

        let (producer, promise) = deferred::<u32>();
        let seen = Arc::new(Mutex::new(None));

        let slot = seen.clone();
        promise.subscribe(move |result| *slot.lock().unwrap() = Some(result));
        assert_eq!(*seen.lock().unwrap(), None);

        producer.resolve(7);
        assert_eq!(*seen.lock().unwrap(), Some(Ok(7)));
    }

    #[test]
    fn late_subscriber_runs_immediately() {
        let _ = env_logger::try_init();

        let (producer, promise) = deferred::<u32>();
        producer.reject(Error::failure("boom"));

        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        promise.subscribe(move |result| *slot.lock().unwrap() = Some(result));

        assert_eq!(*seen.lock().unwrap(), Some(Err(Error::failure("boom"))));
    }

    #[test]
    fn repeated_settlement_is_ignored() {
        let _ = env_logger::try_init();

        let (producer, promise) = deferred::<u32>();
        producer.resolve(1);
        producer.resolve(2);
        producer.reject(Error::failure("late"));

        assert_eq!(futures::executor::block_on(promise), Ok(1));
    }

    #[test]
    fn promise_is_a_future() {
        let _ = env_logger::try_init();

        let (producer, promise) = deferred::<&'static str>();
        std::thread::spawn(move || producer.resolve("done"));

        assert_eq!(futures::executor::block_on(promise), Ok("done"));
    }
}
