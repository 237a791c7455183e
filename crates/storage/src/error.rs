//! Error types for the storage layer

use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by [`Store`](crate::Store) transactions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Mutation attempted on a read-only transaction
    #[error("transaction is not writable")]
    ReadOnly,

    /// A path segment names no bucket
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// A bucket was expected where a value lives, or the reverse
    #[error("incompatible value at key: {0}")]
    IncompatibleValue(String),

    /// Keys and bucket names must be non-empty
    #[error("key required")]
    EmptyKey,

    /// The per-bucket sequence reached `u64::MAX`
    #[error("bucket sequence exhausted")]
    SequenceExhausted,

    /// Reading or writing the commit log failed
    #[error("commit log I/O: {0}")]
    Io(String),

    /// The commit log holds a record that fails validation
    #[error("corrupt commit log at offset {offset}: {reason}")]
    Corrupt {
        /// Byte offset of the bad record
        offset: u64,
        /// What failed
        reason: String,
    },
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

pub(crate) fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
