//! Core types and traits for rowkv
//!
//! This crate defines the foundational types used throughout the system:
//! - Field: a named, typed scalar with a memoized wire encoding
//! - Schema: per-bucket mapping from field name to declared type
//! - Record: iterator-style contract over fields (FieldBuffer in memory)
//! - Bucket: iterator-style contract over records (RecordBuffer in memory)
//! - encoding: the variable-length signed integer wire form
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bucket;
pub mod encoding;
pub mod error;
pub mod field;
pub mod record;
pub mod schema;

pub use bucket::{Bucket, RecordBuffer};
pub use encoding::{decode_int64, decode_varint, encode_int64, put_int64, MAX_VARINT_LEN};
pub use error::{Error, Result};
pub use field::{decode_value, Field, FieldType, FieldValue};
pub use record::{FieldBuffer, Record, RecordExt};
pub use schema::{FieldDescriptor, Schema};
