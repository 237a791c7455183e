//! Transactions over a [`Store`](crate::Store)
//!
//! Buckets are addressed by a path of byte segments from the root. A read
//! transaction sees the snapshot it started from. A write transaction
//! records its changes in a private [`WriteSet`] layered over that
//! snapshot; commit hands the set to the store, rollback or drop discards
//! it.

use std::sync::Arc;

use tracing::debug;

use crate::error::{display_key, Result, StorageError};
use crate::snapshot::{BucketRef, Entry, Node};
use crate::store::{Shared, WriterPermit};
use crate::writeset::{Path, WriteSet};

/// What a key holds inside a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Value,
    Bucket,
}

/// A read-only or writable transaction.
#[derive(Debug)]
pub struct Tx {
    shared: Arc<Shared>,
    root: Arc<Node>,
    version: u64,
    writer: Option<WriterPermit>,
    writes: WriteSet,
}

fn owned_path<S: AsRef<[u8]>>(path: &[S]) -> Path {
    path.iter().map(|s| s.as_ref().to_vec()).collect()
}

impl Tx {
    pub(crate) fn new(
        shared: Arc<Shared>,
        root: Arc<Node>,
        version: u64,
        writer: Option<WriterPermit>,
    ) -> Self {
        Self {
            shared,
            root,
            version,
            writer,
            writes: WriteSet::default(),
        }
    }

    /// True for transactions started with `begin(true)`.
    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    /// Store version this transaction started from.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Read-only view of the bucket at `path`; the empty path is the root.
    ///
    /// In a write transaction the view includes the transaction's own
    /// writes. A bucket with pending writes is merged into a private copy,
    /// so the view stays fixed while the transaction goes on writing.
    pub fn bucket<S: AsRef<[u8]>>(&self, path: &[S]) -> Option<BucketRef> {
        self.view(&owned_path(path)).map(BucketRef::new)
    }

    /// Value stored at `key` in the bucket at `path`.
    pub fn get<S: AsRef<[u8]>>(&self, path: &[S], key: &[u8]) -> Option<Vec<u8>> {
        let path = owned_path(path);
        if let Some(value) = self.writes.delta(&path).and_then(|d| d.puts.get(key)) {
            return Some(value.clone());
        }
        match self.committed(&path)?.entries.get(key)? {
            Entry::Value(v) => Some(v.to_vec()),
            Entry::Bucket(_) => None,
        }
    }

    /// Create every missing bucket along `path`.
    ///
    /// # Errors
    ///
    /// [`StorageError::ReadOnly`], [`StorageError::EmptyKey`] for an empty
    /// segment, [`StorageError::IncompatibleValue`] if a segment names a value.
    pub fn create_bucket_if_not_exists<S: AsRef<[u8]>>(&mut self, path: &[S]) -> Result<()> {
        self.check_writable()?;
        let path = owned_path(path);
        for depth in 0..path.len() {
            let segment = &path[depth];
            if segment.is_empty() {
                return Err(StorageError::EmptyKey);
            }
            match self.slot(&path[..depth], segment) {
                Some(Slot::Bucket) => {}
                Some(Slot::Value) => {
                    return Err(StorageError::IncompatibleValue(display_key(segment)))
                }
                None => {
                    self.writes.delta_mut(&path[..=depth]);
                }
            }
        }
        Ok(())
    }

    /// Store `value` at `key` in the existing bucket at `path`.
    ///
    /// # Errors
    ///
    /// [`StorageError::ReadOnly`], [`StorageError::BucketNotFound`],
    /// [`StorageError::EmptyKey`], or [`StorageError::IncompatibleValue`] if
    /// `key` names a nested bucket.
    pub fn put<S: AsRef<[u8]>>(&mut self, path: &[S], key: &[u8], value: &[u8]) -> Result<()> {
        self.check_writable()?;
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        let path = owned_path(path);
        self.require_bucket(&path)?;
        if self.slot(&path, key) == Some(Slot::Bucket) {
            return Err(StorageError::IncompatibleValue(display_key(key)));
        }
        self.writes
            .delta_mut(&path)
            .puts
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Advance and return the sequence of the bucket at `path`.
    ///
    /// Sequences start at 1 and live inside the bucket, so they are committed
    /// and rolled back with the rest of the transaction.
    ///
    /// # Errors
    ///
    /// [`StorageError::ReadOnly`], [`StorageError::BucketNotFound`],
    /// [`StorageError::SequenceExhausted`].
    pub fn next_sequence<S: AsRef<[u8]>>(&mut self, path: &[S]) -> Result<u64> {
        self.check_writable()?;
        let path = owned_path(path);
        self.require_bucket(&path)?;

        let current = match self.writes.delta(&path).and_then(|d| d.sequence) {
            Some(sequence) => sequence,
            None => self.committed(&path).map_or(0, |n| n.sequence),
        };
        let next = current
            .checked_add(1)
            .ok_or(StorageError::SequenceExhausted)?;
        self.writes.delta_mut(&path).sequence = Some(next);
        Ok(next)
    }

    /// Publish the writes of a writable transaction.
    ///
    /// Committing a read-only transaction only releases it.
    ///
    /// # Errors
    ///
    /// [`StorageError::Io`] if a durable store cannot log the commit; the
    /// writes are then discarded.
    pub fn commit(mut self) -> Result<()> {
        let Some(permit) = self.writer.take() else {
            return Ok(());
        };
        let writes = std::mem::take(&mut self.writes);
        let puts = writes.put_count();

        // The shared tree is updated in place only if this snapshot is gone.
        self.root = Arc::default();
        let version = self.shared.publish(writes)?;
        debug!(target: "rowkv::storage", version, puts, "committed write transaction");
        drop(permit);
        Ok(())
    }

    /// Discard the transaction.
    pub fn rollback(self) {
        if self.is_writable() {
            debug!(
                target: "rowkv::storage",
                version = self.version,
                discarded = self.writes.put_count(),
                "rolled back write transaction"
            );
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.writer.is_none() {
            return Err(StorageError::ReadOnly);
        }
        Ok(())
    }

    /// Committed node at `path` as of this transaction's snapshot.
    fn committed(&self, path: &[Vec<u8>]) -> Option<&Arc<Node>> {
        let mut node = &self.root;
        for segment in path {
            node = match node.entries.get(segment.as_slice()) {
                Some(Entry::Bucket(child)) => child,
                _ => return None,
            };
        }
        Some(node)
    }

    /// What `name` holds in the bucket at `parent`, pending writes first.
    fn slot(&self, parent: &[Vec<u8>], name: &[u8]) -> Option<Slot> {
        if let Some(delta) = self.writes.delta(parent) {
            if delta.puts.contains_key(name) {
                return Some(Slot::Value);
            }
        }
        let mut child = parent.to_vec();
        child.push(name.to_vec());
        if self.writes.delta(&child).is_some() {
            return Some(Slot::Bucket);
        }
        match self.committed(parent)?.entries.get(name)? {
            Entry::Value(_) => Some(Slot::Value),
            Entry::Bucket(_) => Some(Slot::Bucket),
        }
    }

    fn require_bucket(&self, path: &[Vec<u8>]) -> Result<()> {
        if self.writes.delta(path).is_some() {
            return Ok(());
        }
        for (depth, segment) in path.iter().enumerate() {
            if segment.is_empty() {
                return Err(StorageError::EmptyKey);
            }
            match self.slot(&path[..depth], segment) {
                Some(Slot::Bucket) => {}
                Some(Slot::Value) => {
                    return Err(StorageError::IncompatibleValue(display_key(segment)))
                }
                None => return Err(StorageError::BucketNotFound(display_key(segment))),
            }
        }
        Ok(())
    }

    /// Node at `path` with this transaction's writes merged in.
    ///
    /// Untouched buckets are shared with the snapshot; touched ones are
    /// copied, which costs the size of the bucket.
    fn view(&self, path: &[Vec<u8>]) -> Option<Arc<Node>> {
        let committed = self.committed(path);
        if !self.writes.touches(path) {
            return committed.cloned();
        }

        let mut node = committed.map(|n| Node::clone(n)).unwrap_or_default();
        if let Some(delta) = self.writes.delta(path) {
            for (key, value) in &delta.puts {
                node.entries
                    .insert(key.clone(), Entry::Value(Arc::from(value.as_slice())));
            }
            if let Some(sequence) = delta.sequence {
                node.sequence = sequence;
            }
        }
        for name in self.writes.touched_children(path) {
            let mut child = path.to_vec();
            child.push(name.clone());
            if let Some(view) = self.view(&child) {
                node.entries.insert(name, Entry::Bucket(view));
            }
        }
        Some(Arc::new(node))
    }
}
