//! Error types for notekv core.

use std::error::Error as StdError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in notekv core operations.
///
/// Absent keys are never reported through this type: a missing value is
/// observed as empty input handed to a decoder, and an exhausted scan is
/// observed as a short page.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A fixed-width value was decoded from input of the wrong size.
    #[error("invalid {kind} encoding: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// What was being decoded.
        kind: &'static str,
        /// Required byte length.
        expected: usize,
        /// Byte length actually supplied.
        actual: usize,
    },

    /// Stored bytes could not be interpreted.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Every identifier the allocator can hand out has been used.
    #[error("entity allocator exhausted")]
    AllocatorExhausted,

    /// A mutation was attempted through a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnly,

    /// The backend implementing the transaction contract failed.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl CoreError {
    /// Creates an invalid length error.
    pub fn invalid_length(kind: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            kind,
            expected,
            actual,
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Wraps a backend failure without altering it.
    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}
