//! Variant configuration for suspendable functions.
//!
//! A [`Config`] describes one variant completely: what a call returns, whether
//! a trailing callback is accepted, whether the result is a lazy sequence, and
//! how many bodies may be active at once. It is validated exactly once when
//! the variant is built; invalid combinations never surface at call time.

use crate::error::ConfigError;
use crate::semaphore::Semaphore;

/// What a call on the produced function hands back to the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReturnKind {
    /// A future settled when the body finishes.
    Future,

    /// A deferred-invocation handle; the body starts when it is invoked.
    Thunk,

    /// The plain value; the call blocks until the body finishes.
    Value,

    /// Nothing; the outcome reaches the trailing callback only.
    Nothing,
}

/// Immutable description of one suspendable-function variant.
#[derive(Clone, Debug)]
pub struct Config {
    pub return_kind: ReturnKind,
    pub accepts_callback: bool,
    pub is_iterable: bool,

    /// Upper bound on concurrently active bodies; `None` means unbounded.
    pub max_concurrency: Option<usize>,
}

impl Config {
    pub(crate) fn new(return_kind: ReturnKind) -> Config {
        Config {
            return_kind,
            accepts_callback: false,
            is_iterable: false,
            max_concurrency: None,
        }
    }

    /// Checks the combination for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.return_kind == ReturnKind::Nothing && !self.accepts_callback {
            return Err(ConfigError::UnobservableResult);
        }
        if self.is_iterable {
            if self.max_concurrency.is_some() {
                return Err(ConfigError::IterableConcurrency);
            }
            if self.return_kind != ReturnKind::Future || self.accepts_callback {
                return Err(ConfigError::IterableKind);
            }
        }
        Ok(())
    }

    pub(crate) fn semaphore(&self) -> Semaphore {
        match self.max_concurrency {
            Some(limit) => Semaphore::bounded(limit),
            None => Semaphore::unlimited(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ConfigError;

    use super::{Config, ReturnKind};

    #[test]
    fn default_future_config_is_valid() {
        assert_eq!(Config::new(ReturnKind::Future).validate(), Ok(()));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = Config::new(ReturnKind::Future);
        config.max_concurrency = Some(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));
    }

    #[test]
    fn unobservable_outcome_is_rejected() {
        let config = Config::new(ReturnKind::Nothing);
        assert_eq!(config.validate(), Err(ConfigError::UnobservableResult));
    }

    #[test]
    fn bounded_iterables_are_rejected() {
        let mut config = Config::new(ReturnKind::Future);
        config.is_iterable = true;
        config.max_concurrency = Some(2);
        assert_eq!(config.validate(), Err(ConfigError::IterableConcurrency));
    }

    #[test]
    fn non_future_iterables_are_rejected() {
        let mut config = Config::new(ReturnKind::Value);
        config.is_iterable = true;
        assert_eq!(config.validate(), Err(ConfigError::IterableKind));
    }
}
