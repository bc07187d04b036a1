//! Fluent construction of suspendable-function variants.
//!
//! Each constructor picks a return kind and its protocol; the remaining
//! options are set with chained methods and checked once by
//! [`Builder::build`]. A builder clones cheaply, so a configured builder
//! doubles as a factory to derive new variants from: cloned options carry
//! over and later calls override them.

use crate::config::{Config, ReturnKind};
use crate::error::Error;
use crate::func::Suspendable;
use crate::iterator::IterProtocol;
use crate::protocol::{
    BlockingProtocol, CallbackLayer, DiscardProtocol, FutureProtocol, Protocol, ThunkProtocol,
};
use crate::scope::Scope;

use std::sync::Arc;

/// Builder for one suspendable-function variant.
#[derive(Clone)]
pub struct Builder<P> {
    config: Config,
    protocol: P,
}

impl Builder<FutureProtocol> {
    /// A variant whose calls return a future of the body's result.
    pub fn future() -> Builder<FutureProtocol> {
        Builder {
            config: Config::new(ReturnKind::Future),
            protocol: FutureProtocol,
        }
    }

    /// Alias for [`Builder::future`], the default variant.
    pub fn new() -> Builder<FutureProtocol> {
        Builder::future()
    }
}

impl Default for Builder<FutureProtocol> {
    fn default() -> Self {
        Builder::future()
    }
}

impl Builder<BlockingProtocol> {
    /// A variant whose calls block and return the body's plain result.
    pub fn value() -> Builder<BlockingProtocol> {
        Builder {
            config: Config::new(ReturnKind::Value),
            protocol: BlockingProtocol,
        }
    }
}

impl Builder<ThunkProtocol> {
    /// A variant whose calls return a deferred-invocation handle.
    pub fn thunk() -> Builder<ThunkProtocol> {
        Builder {
            config: Config::new(ReturnKind::Thunk),
            protocol: ThunkProtocol,
        }
    }
}

impl Builder<CallbackLayer<DiscardProtocol>> {
    /// A variant whose calls return nothing; the outcome reaches the
    /// trailing callback only.
    pub fn fire_and_forget() -> Builder<CallbackLayer<DiscardProtocol>> {
        let mut config = Config::new(ReturnKind::Nothing);
        config.accepts_callback = true;
        Builder {
            config,
            protocol: CallbackLayer::new(DiscardProtocol),
        }
    }
}

impl Builder<IterProtocol> {
    /// A variant whose calls return a lazy sequence of emitted values.
    pub fn iterable() -> Builder<IterProtocol> {
        let mut config = Config::new(ReturnKind::Future);
        config.is_iterable = true;
        Builder {
            config,
            protocol: IterProtocol,
        }
    }
}

impl<P> Builder<P> {
    /// Bounds how many bodies of this definition may be active at once.
    pub fn max_concurrency(mut self, limit: usize) -> Builder<P> {
        self.config.max_concurrency = Some(limit);
        self
    }

    /// Removes the concurrency bound.
    pub fn unbounded(mut self) -> Builder<P> {
        self.config.max_concurrency = None;
        self
    }

    /// Accepts a trailing completion callback on every call.
    pub fn with_callback(self) -> Builder<CallbackLayer<P>> {
        let mut config = self.config;
        config.accepts_callback = true;
        Builder {
            config,
            protocol: CallbackLayer::new(self.protocol),
        }
    }

    /// Layers a new protocol over the current one.
    ///
    /// The wrapper decides when to call through to the base hooks and may
    /// rewrite the values and errors flowing into them.
    pub fn wrap<Q>(self, layer: impl FnOnce(P) -> Q) -> Builder<Q> {
        Builder {
            config: self.config,
            protocol: layer(self.protocol),
        }
    }

    /// The options accumulated so far.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validates the configuration and produces the suspendable function.
    pub fn build<A, T>(
        self,
        body: impl Fn(&Scope<'_, T>, A) -> Result<T, Error> + Send + Sync + 'static,
    ) -> Result<Suspendable<A, T, P>, Error>
    where
        A: Send + 'static,
        T: Send + 'static,
        P: Protocol<T> + 'static,
    {
        self.config.validate()?;
        Ok(Suspendable::new(Arc::new(body), self.config, self.protocol))
    }
}
