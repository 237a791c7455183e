//! Storage layer for rowkv
//!
//! This crate implements the ordered transactional byte store the key-value
//! adapter runs on:
//! - Store: shared handle, single-writer gate, atomic publish
//! - Tx: read-only snapshot, or a writable transaction buffering its
//!   changes in a write set
//! - BucketRef / Cursor: owned point-in-time views of one bucket
//! - Per-bucket monotonic sequences
//! - Commit log: CRC-checked records replayed when a store is reopened
//!
//! A store is either purely in memory ([`Store::new`]) or durable in a
//! directory ([`Store::open`]). Both give the isolation and ordering
//! guarantees of an embedded B-tree store.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commit_log;
pub mod error;
pub mod snapshot;
pub mod store;
pub mod tx;
mod writeset;

pub use commit_log::LOG_FILE_NAME;
pub use error::{Result, StorageError};
pub use snapshot::{BucketRef, Cursor, CursorEntry};
pub use store::Store;
pub use tx::Tx;
