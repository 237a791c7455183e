//! Error types for rowkv
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

use crate::field::FieldType;

/// Result type alias for rowkv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for rowkv
#[derive(Debug, Error)]
pub enum Error {
    /// A field's type conflicts with the type recorded in its schema
    #[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Field name
        field: String,
        /// Type recorded in the schema
        expected: FieldType,
        /// Type carried by the offending field
        actual: FieldType,
    },

    /// Type tag with no defined wire form
    #[error("Unsupported field type tag: {0}")]
    UnsupportedType(u8),

    /// Lookup by field name missed
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Operation applied to a field of the wrong type
    #[error("Field '{field}' of type {actual} is incompatible with {operation}")]
    IncompatibleType {
        /// Field name
        field: String,
        /// Actual type of the field
        actual: FieldType,
        /// Operation that rejected the field
        operation: &'static str,
    },

    /// Stored key lacks the row separator
    #[error("Malformed key: {}", String::from_utf8_lossy(.0))]
    MalformedKey(Vec<u8>),

    /// Varint cannot be represented as an i64
    #[error("Integer overflow while decoding varint")]
    Overflow,

    /// Schema inference attempted on zero records
    #[error("Cannot infer a schema from an empty record buffer")]
    EmptyInput,

    /// Empty bucket path or reserved path segment
    #[error("Invalid bucket path: {0}")]
    InvalidPath(String),

    /// Stored data could not be interpreted
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Commit attempted after an insert failed inside the same transaction
    #[error("Transaction aborted after a failed write")]
    TransactionAborted,

    /// Backend storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a `Storage` error from any backend error.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Error::Storage(err.to_string())
    }

    /// Build a `Config` error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
