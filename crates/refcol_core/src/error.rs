//! # Core Error Types
//!
//! Errors raised by the one-time initialization gate.
//!
//! Everything else in the core degrades instead of failing: bad names and
//! unknown type tags are logged and produce empty or placeholder results.

use thiserror::Error;

/// Errors that can occur in the collector core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The guarded value could not be constructed.
    ///
    /// Once raised, every later caller of the same gate observes this error.
    #[error("initialization failed: {reason}")]
    InitializationFailed {
        /// Why construction failed.
        reason: String,
    },

    /// A waiter gave up before the initializing thread published its value.
    #[error("initialization still in progress after {waited_ms} ms")]
    InitializationTimeout {
        /// How long the caller waited.
        waited_ms: u64,
    },
}

impl CoreError {
    /// Shorthand for [`CoreError::InitializationFailed`].
    pub fn init_failed(reason: impl Into<String>) -> Self {
        Self::InitializationFailed {
            reason: reason.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::init_failed("mutex unavailable");
        assert_eq!(err.to_string(), "initialization failed: mutex unavailable");

        let err = CoreError::InitializationTimeout { waited_ms: 25 };
        assert_eq!(err.to_string(), "initialization still in progress after 25 ms");
    }
}
