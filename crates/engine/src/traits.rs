//! Storage-engine contract
//!
//! These traits are the only thing the query layer knows about a backend.
//! Any ordered, transactional key-value store that can provide them is
//! pluggable; [`KvEngine`](crate::kv::KvEngine) is the bundled
//! implementation.

use rowkv_core::{Bucket, Record, Result};

/// A storage backend able to start transactions.
///
/// Thread safety: a backend must allow any number of concurrent read-only
/// transactions and at most one live writable transaction, and each
/// read-only transaction must observe a consistent snapshot.
pub trait Engine: Send + Sync {
    /// Transaction type of this backend.
    type Transaction: Transaction;

    /// Start a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start a transaction.
    fn begin(&self, writable: bool) -> Result<Self::Transaction>;
}

/// A unit of work against an [`Engine`].
///
/// Every transaction is released exactly once, by [`Transaction::commit`],
/// [`Transaction::rollback`], or by being dropped (which rolls back).
pub trait Transaction {
    /// Bucket type produced by [`Transaction::bucket`].
    ///
    /// Buckets are `'static`: they own whatever snapshot they read from and
    /// remain valid after the transaction ends.
    type Bucket: Bucket + 'static;

    /// Persist every remaining field of `record` as a new row of the bucket
    /// at `path`, creating the bucket chain if needed.
    ///
    /// Returns the encoded row identifier.
    ///
    /// # Errors
    ///
    /// Fails if a field cannot be encoded or conflicts with the bucket
    /// schema, or if the transaction is read-only.
    fn insert(&mut self, record: &mut dyn Record, path: &[&str]) -> Result<Vec<u8>>;

    /// Open the bucket at `path` for scanning, positioned before its first
    /// record.
    ///
    /// # Errors
    ///
    /// Fails on an invalid path or unreadable schema.
    fn bucket(&mut self, path: &[&str]) -> Result<Self::Bucket>;

    /// Finalize all writes.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot publish the writes.
    fn commit(self) -> Result<()>;

    /// Discard all writes.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot release the transaction.
    fn rollback(self) -> Result<()>;
}
