//! Suspendable functions over pooled coroutines.
//!
//! This crate lets a function body be written as plain sequential code yet
//! execute asynchronously: the body suspends at each await point without
//! blocking the thread that called it, and resumes transparently once the
//! awaited operation settles. Concurrency is cooperative interleaving over
//! one chain of control, layered underneath real asynchronous completion
//! sources; nothing here runs an event loop or performs I/O.
//!
//! # Architecture
//!
//! - **Coroutine pool**: reusable suspend-capable execution contexts, one
//!   leased per invocation
//! - **Semaphore**: FIFO admission control per function definition
//! - **RunContext**: per-call state machine driving a body through its
//!   lifecycle
//! - **Protocols**: pluggable begin/suspend/end hooks that turn the internal
//!   lifecycle into a future, a callback, a plain value, or a lazy sequence
//! - **Scope**: the await primitive, dependency-injected into every body
//! - **AsyncIterator**: pull-based lazy sequences over a suspended body
//!
//! # Example
//!
//! ```ignore
//! use cofn::{Builder, Error, Scope, time};
//! use std::time::Duration;
//!
//! let fetch = Builder::future()
//!     .max_concurrency(4)
//!     .build(|scope: &Scope<'_, String>, name: String| {
//!         let greeting = scope.wait(&time::resolve_after(
//!             Duration::from_millis(10),
//!             format!("hello {name}"),
//!         ))?;
//!         Ok(greeting)
//!     })?;
//!
//! let promise = fetch.call("world".into())?;
//! # Ok::<(), Error>(())
//! ```

mod builder;
mod config;
mod context;
mod coroutine;
mod error;
mod func;
mod iterator;
mod promise;
mod scope;
mod semaphore;

pub mod protocol;
pub mod time;

pub use builder::Builder;
pub use config::{Config, ReturnKind};
pub use context::{Callback, RunContext};
pub use coroutine::pool::executing_on_coroutine;
pub use error::{ConfigError, Error};
pub use func::Suspendable;
pub use iterator::{AsyncIterator, IterProtocol, IterStep};
pub use promise::{Deferred, Promise, deferred};
pub use scope::Scope;
pub use semaphore::Semaphore;
