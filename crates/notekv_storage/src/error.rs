//! Error types for storage operations.

use notekv_core::CoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The commit log holds bytes that are not a valid record.
    #[error("commit log corrupted at offset {offset}: {message}")]
    Corrupted {
        /// Byte offset of the offending record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// A complete commit log record failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Byte offset of the record.
        offset: u64,
        /// Checksum stored with the record.
        expected: u32,
        /// Checksum computed from the record.
        actual: u32,
    },

    /// Another process holds the store.
    #[error("store locked: {0} is held by another process")]
    Locked(PathBuf),

    /// The store does not exist and creation was not requested.
    #[error("store not found: {0}")]
    NotFound(PathBuf),

    /// The store has no allocator because it was never fully opened.
    #[error("store is closed")]
    Closed,
}

impl StorageError {
    /// Creates a corruption error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        CoreError::backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn converts_into_backend_error() {
        let core: CoreError = StorageError::Closed.into();
        assert!(matches!(core, CoreError::Backend(_)));
        assert_eq!(core.source().unwrap().to_string(), "store is closed");
    }

    #[test]
    fn checksum_message() {
        let err = StorageError::ChecksumMismatch {
            offset: 10,
            expected: 0xdead_beef,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch at offset 10: expected deadbeef, got 00000001"
        );
    }
}
