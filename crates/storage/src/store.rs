//! Store: ordered transactional byte store with nested buckets
//!
//! This module implements the backing store using:
//! - a copy-on-write tree of `Arc<Node>` buckets, each a `BTreeMap` of byte
//!   keys to values or nested buckets
//! - `parking_lot::RwLock` guarding the published root
//! - a writer gate (`Mutex<bool>` + `Condvar`) admitting one writable
//!   transaction at a time
//! - `AtomicU64` counting committed write transactions
//! - an optional commit log making the store durable
//!
//! # Design Notes
//!
//! - **Snapshot reads**: a read transaction clones the root `Arc` at begin and
//!   never observes later commits
//! - **Single writer**: `begin(true)` blocks while another writer is live;
//!   readers never block
//! - **Atomic publish**: commit applies the write set under the write lock,
//!   so no reader can see a partial transaction
//! - **Write-ahead**: a durable store syncs the commit to its log before
//!   applying it

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, info};

use crate::commit_log::CommitLog;
use crate::error::Result;
use crate::snapshot::Node;
use crate::tx::Tx;
use crate::writeset::WriteSet;

#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) root: RwLock<Arc<Node>>,
    pub(crate) version: AtomicU64,
    log: Option<Mutex<CommitLog>>,
    writer_busy: Mutex<bool>,
    writer_released: Condvar,
}

impl Shared {
    /// Log and apply a writer's changes, returning the new version.
    ///
    /// Only the holder of the writer permit calls this.
    pub(crate) fn publish(&self, writes: WriteSet) -> Result<u64> {
        let version = self.version.load(Ordering::SeqCst) + 1;
        if let Some(log) = &self.log {
            log.lock().append(version, &writes)?;
        }

        let mut root = self.root.write();
        if !writes.is_empty() {
            writes.apply(Arc::make_mut(&mut root));
        }
        self.version.store(version, Ordering::SeqCst);
        Ok(version)
    }
}

/// Proof of holding the writer slot; released on drop.
#[derive(Debug)]
pub(crate) struct WriterPermit {
    shared: Arc<Shared>,
}

impl Drop for WriterPermit {
    fn drop(&mut self) {
        let mut busy = self.shared.writer_busy.lock();
        *busy = false;
        self.shared.writer_released.notify_one();
    }
}

/// Ordered transactional key-value store with nested buckets.
///
/// [`Store::new`] keeps everything in memory; [`Store::open`] backs the store
/// with a commit log in a directory. Cloning a `Store` yields another handle
/// to the same data.
///
/// # Example
///
/// ```
/// use rowkv_storage::Store;
///
/// let store = Store::new();
/// let mut tx = store.begin(true);
/// tx.create_bucket_if_not_exists(&["users"]).unwrap();
/// tx.put(&["users"], b"alice", b"42").unwrap();
/// tx.commit().unwrap();
///
/// let tx = store.begin(false);
/// assert_eq!(tx.get(&["users"], b"alice").as_deref(), Some(&b"42"[..]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Store {
    shared: Arc<Shared>,
}

impl Store {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the durable store in `dir`, creating it if needed.
    ///
    /// Every committed transaction is synced to the directory's commit log
    /// before it becomes visible, and reopening restores buckets, values and
    /// sequences. A directory must be opened by one `Store` at a time.
    ///
    /// # Errors
    ///
    /// [`StorageError::Io`](crate::StorageError::Io) if the directory or log
    /// cannot be read or written,
    /// [`StorageError::Corrupt`](crate::StorageError::Corrupt) if a complete
    /// log record fails validation.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let (log, recovered) = CommitLog::open(dir)?;
        info!(
            target: "rowkv::storage",
            path = %dir.display(),
            version = recovered.version,
            records = recovered.records,
            "opened durable store"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                root: RwLock::new(Arc::new(recovered.root)),
                version: AtomicU64::new(recovered.version),
                log: Some(Mutex::new(log)),
                ..Shared::default()
            }),
        })
    }

    /// True for a store opened from a directory.
    pub fn is_durable(&self) -> bool {
        self.shared.log.is_some()
    }

    /// Begin a transaction.
    ///
    /// A writable transaction waits until no other writable transaction is
    /// live. Read-only transactions start immediately on the latest committed
    /// snapshot.
    pub fn begin(&self, writable: bool) -> Tx {
        if writable {
            let permit = self.acquire_writer();
            self.start_write(permit)
        } else {
            self.start_read()
        }
    }

    /// Begin a writable transaction if no other writer is live.
    pub fn try_begin_write(&self) -> Option<Tx> {
        let mut busy = self.shared.writer_busy.try_lock()?;
        if *busy {
            return None;
        }
        *busy = true;
        drop(busy);
        let permit = WriterPermit {
            shared: Arc::clone(&self.shared),
        };
        Some(self.start_write(permit))
    }

    /// Number of committed write transactions.
    pub fn current_version(&self) -> u64 {
        self.shared.version.load(Ordering::SeqCst)
    }

    fn acquire_writer(&self) -> WriterPermit {
        let mut busy = self.shared.writer_busy.lock();
        while *busy {
            self.shared.writer_released.wait(&mut busy);
        }
        *busy = true;
        WriterPermit {
            shared: Arc::clone(&self.shared),
        }
    }

    fn start_read(&self) -> Tx {
        // Read the version under the root lock so both describe the same state.
        let root = self.shared.root.read();
        let version = self.current_version();
        debug!(target: "rowkv::storage", version, "begin read transaction");
        Tx::new(Arc::clone(&self.shared), Arc::clone(&root), version, None)
    }

    fn start_write(&self, permit: WriterPermit) -> Tx {
        let root = self.shared.root.read();
        let version = self.current_version();
        debug!(target: "rowkv::storage", version, "begin write transaction");
        Tx::new(
            Arc::clone(&self.shared),
            Arc::clone(&root),
            version,
            Some(permit),
        )
    }
}
