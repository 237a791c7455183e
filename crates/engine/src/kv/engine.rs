//! Engine and transaction over a [`Store`]

use std::path::Path;

use rowkv_core::{encode_int64, Error, Record, Result};
use rowkv_storage::{Store, Tx};
use tracing::{debug, warn};

use super::bucket::KvBucket;
use super::keys::{row_key, validate_path};
use super::schema::SchemaBucket;
use crate::traits::{Engine, Transaction};

/// [`Engine`] backed by an ordered transactional key-value [`Store`].
///
/// # Example
///
/// ```
/// use rowkv_core::{Bucket, FieldBuffer, RecordExt};
/// use rowkv_engine::{Engine, KvEngine, Transaction};
///
/// let engine = KvEngine::default();
///
/// let mut tx = engine.begin(true).unwrap();
/// let mut record = FieldBuffer::new();
/// record.add_string("Name", "Alice").unwrap();
/// record.add_int64("Age", 30).unwrap();
/// tx.insert(&mut record, &["users"]).unwrap();
/// tx.commit().unwrap();
///
/// let mut tx = engine.begin(false).unwrap();
/// let mut users = tx.bucket(&["users"]).unwrap();
/// let alice = users.next().unwrap().unwrap();
/// assert_eq!(alice.get_int64("Age").unwrap(), 30);
/// ```
#[derive(Debug, Clone, Default)]
pub struct KvEngine {
    store: Store,
}

impl KvEngine {
    /// Engine over an existing store handle.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Engine over the durable store in `dir`, created if missing.
    ///
    /// Records, schemas and row-id sequences committed before a reopen are
    /// all restored, so row ids keep increasing across restarts.
    ///
    /// # Errors
    ///
    /// [`Error::Storage`] if the store cannot be opened or its commit log
    /// is corrupt.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let store = Store::open(dir).map_err(Error::storage)?;
        Ok(Self::new(store))
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl Engine for KvEngine {
    type Transaction = KvTransaction;

    fn begin(&self, writable: bool) -> Result<KvTransaction> {
        debug!(target: "rowkv::engine", writable, "begin transaction");
        Ok(KvTransaction {
            tx: Some(self.store.begin(writable)),
            aborted: false,
        })
    }
}

/// Transaction of a [`KvEngine`].
///
/// A failed [`insert`](Transaction::insert) poisons the transaction: the
/// only remaining outcome is rollback, and [`commit`](Transaction::commit)
/// reports [`Error::TransactionAborted`]. Dropping the transaction rolls it
/// back.
#[derive(Debug)]
pub struct KvTransaction {
    tx: Option<Tx>,
    aborted: bool,
}

impl KvTransaction {
    /// True once an insert has failed.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    fn tx(&mut self) -> Result<&mut Tx> {
        self.tx
            .as_mut()
            .ok_or_else(|| Error::storage("transaction already released"))
    }

    fn insert_row(&mut self, record: &mut dyn Record, path: &[&str]) -> Result<Vec<u8>> {
        validate_path(path)?;
        let tx = self.tx()?;

        tx.create_bucket_if_not_exists(path)
            .map_err(Error::storage)?;
        let sequence = tx.next_sequence(path).map_err(Error::storage)?;
        let row_id = encode_int64(i64::try_from(sequence).map_err(|_| Error::Overflow)?);
        let schema = SchemaBucket::create(tx, path)?;

        while let Some(field) = record.next()? {
            let data = field.encode()?;
            schema.register(tx, field)?;
            tx.put(path, &row_key(&row_id, field.name()), data)
                .map_err(Error::storage)?;
        }
        Ok(row_id)
    }
}

impl Transaction for KvTransaction {
    type Bucket = KvBucket;

    fn insert(&mut self, record: &mut dyn Record, path: &[&str]) -> Result<Vec<u8>> {
        let result = self.insert_row(record, path);
        if result.is_err() {
            self.aborted = true;
        }
        result
    }

    fn bucket(&mut self, path: &[&str]) -> Result<KvBucket> {
        validate_path(path)?;
        let tx = self.tx()?;

        if tx.is_writable() {
            tx.create_bucket_if_not_exists(path)
                .map_err(Error::storage)?;
            SchemaBucket::create(tx, path)?;
        }
        match tx.bucket(path) {
            Some(bucket) => KvBucket::open(&bucket),
            None => Ok(KvBucket::empty()),
        }
    }

    fn commit(mut self) -> Result<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        if self.aborted {
            tx.rollback();
            warn!(target: "rowkv::engine", "commit of aborted transaction, writes discarded");
            return Err(Error::TransactionAborted);
        }
        let version = tx.version();
        tx.commit().map_err(Error::storage)?;
        debug!(target: "rowkv::engine", version, "commit transaction");
        Ok(())
    }

    fn rollback(mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback();
            debug!(target: "rowkv::engine", "rollback transaction");
        }
        Ok(())
    }
}

impl Drop for KvTransaction {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.rollback();
            debug!(target: "rowkv::engine", "rollback of dropped transaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::schema::SCHEMA_BUCKET;
    use rowkv_core::{Bucket, FieldBuffer, FieldType, RecordExt};

    fn person(name: &str, age: i64) -> FieldBuffer {
        let mut record = FieldBuffer::new();
        record.add_string("Name", name).unwrap();
        record.add_int64("Age", age).unwrap();
        record
    }

    fn collect(bucket: &mut KvBucket) -> Vec<(String, i64)> {
        let mut out = Vec::new();
        while let Some(record) = bucket.next().unwrap() {
            out.push((
                record.get_string("Name").unwrap(),
                record.get_int64("Age").unwrap(),
            ));
        }
        out
    }

    // ========================================================================
    // Insert
    // ========================================================================

    #[test]
    fn test_insert_returns_row_ids() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        let first = tx.insert(&mut person("a", 1), &["people"]).unwrap();
        let second = tx.insert(&mut person("b", 2), &["people"]).unwrap();
        assert_eq!(first, encode_int64(1));
        assert_eq!(second, encode_int64(2));
        tx.commit().unwrap();
    }

    #[test]
    fn test_insert_writes_layout() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        tx.insert(&mut person("Alice", 30), &["people"]).unwrap();
        tx.commit().unwrap();

        let raw = engine.store().begin(false);
        assert_eq!(
            raw.get(&["people"], b"\x02-Name"),
            Some(b"Alice".to_vec())
        );
        assert_eq!(raw.get(&["people"], b"\x02-Age"), Some(encode_int64(30)));
        assert_eq!(
            raw.get(&["people", SCHEMA_BUCKET], b"Age"),
            Some(vec![FieldType::Int64.tag()])
        );
    }

    #[test]
    fn test_insert_nested_path() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        tx.insert(&mut person("a", 1), &["org", "team"]).unwrap();
        tx.commit().unwrap();

        let mut tx = engine.begin(false).unwrap();
        let mut team = tx.bucket(&["org", "team"]).unwrap();
        assert_eq!(collect(&mut team), vec![("a".to_string(), 1)]);
        // Nested buckets are not records of their parent.
        let mut org = tx.bucket(&["org"]).unwrap();
        assert!(org.next().unwrap().is_none());
    }

    #[test]
    fn test_insert_rejects_reserved_path() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        let err = tx.insert(&mut person("a", 1), &["a", SCHEMA_BUCKET]);
        assert!(matches!(err, Err(Error::InvalidPath(_))));
        let err = tx.insert(&mut person("a", 1), &[]);
        assert!(matches!(err, Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_insert_read_only_fails() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(false).unwrap();
        assert!(matches!(
            tx.insert(&mut person("a", 1), &["people"]),
            Err(Error::Storage(_))
        ));
    }

    // ========================================================================
    // Poisoning
    // ========================================================================

    #[test]
    fn test_type_conflict_poisons_transaction() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        tx.insert(&mut person("a", 1), &["people"]).unwrap();

        let mut bad = FieldBuffer::new();
        bad.add_string("Age", "old").unwrap();
        assert!(matches!(
            tx.insert(&mut bad, &["people"]),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(tx.is_aborted());
        assert!(matches!(tx.commit(), Err(Error::TransactionAborted)));

        // Nothing from the aborted transaction is visible.
        let mut tx = engine.begin(false).unwrap();
        assert!(tx.bucket(&["people"]).unwrap().next().unwrap().is_none());
        assert_eq!(engine.store().current_version(), 0);
    }

    #[test]
    fn test_writer_released_after_aborted_commit() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        let _ = tx.insert(&mut person("a", 1), &[]);
        let _ = tx.commit();
        assert!(engine.store().try_begin_write().is_some());
    }

    // ========================================================================
    // Release
    // ========================================================================

    #[test]
    fn test_rollback_discards() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        tx.insert(&mut person("a", 1), &["people"]).unwrap();
        tx.rollback().unwrap();

        let mut tx = engine.begin(false).unwrap();
        assert!(tx.bucket(&["people"]).unwrap().next().unwrap().is_none());
    }

    #[test]
    fn test_drop_rolls_back_and_releases_writer() {
        let engine = KvEngine::default();
        {
            let mut tx = engine.begin(true).unwrap();
            tx.insert(&mut person("a", 1), &["people"]).unwrap();
        }
        let tx = engine.store().try_begin_write();
        assert!(tx.is_some());
        assert!(tx.unwrap().bucket(&["people"]).is_none());
    }

    #[test]
    fn test_read_commit_is_release() {
        let engine = KvEngine::default();
        let tx = engine.begin(false).unwrap();
        tx.commit().unwrap();
        assert_eq!(engine.store().current_version(), 0);
    }

    // ========================================================================
    // Bucket
    // ========================================================================

    #[test]
    fn test_bucket_read_only_missing_is_empty() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(false).unwrap();
        let mut bucket = tx.bucket(&["nothing", "here"]).unwrap();
        assert!(bucket.next().unwrap().is_none());
        assert!(bucket.schema().unwrap().is_empty());
    }

    #[test]
    fn test_bucket_writable_creates_chain() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        tx.bucket(&["a", "b"]).unwrap();
        tx.commit().unwrap();

        let raw = engine.store().begin(false);
        assert!(raw.bucket(&["a", "b", SCHEMA_BUCKET]).is_some());
    }

    #[test]
    fn test_bucket_sees_own_writes_and_outlives_tx() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        tx.insert(&mut person("a", 1), &["people"]).unwrap();
        let mut bucket = tx.bucket(&["people"]).unwrap();
        tx.rollback().unwrap();

        assert_eq!(collect(&mut bucket), vec![("a".to_string(), 1)]);
    }

    #[test]
    fn test_bucket_schema() {
        let engine = KvEngine::default();
        let mut tx = engine.begin(true).unwrap();
        tx.insert(&mut person("a", 1), &["people"]).unwrap();
        let schema = tx.bucket(&["people"]).unwrap().schema().unwrap();
        assert_eq!(schema.get("Age").unwrap().field_type, FieldType::Int64);
        assert_eq!(schema.get("Name").unwrap().field_type, FieldType::String);
    }
}
