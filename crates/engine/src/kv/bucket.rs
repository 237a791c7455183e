//! Scanning a data bucket back into records
//!
//! Fields of one row are stored under keys sharing the row identifier
//! prefix. Row identifiers are prefix-free varints, so all keys of a row are
//! contiguous in key order and a single forward pass can regroup them.

use rowkv_core::{Bucket, Error, Field, FieldBuffer, Record, Result, Schema};
use rowkv_storage::{BucketRef, Cursor};

use super::keys::split_row_key;
use super::schema::load_schema;

/// Live scan over one bucket of a [`KvEngine`](super::KvEngine).
///
/// The scan owns a snapshot of the bucket taken when it was opened, so it
/// stays valid after its transaction commits or rolls back. Records are
/// emitted only once all of their fields have been read.
#[derive(Debug)]
pub struct KvBucket {
    cursor: Option<Cursor>,
    pending: Option<(Vec<u8>, Vec<u8>)>,
    schema: Schema,
}

impl KvBucket {
    /// Scan over `bucket`, loading its schema.
    pub(crate) fn open(bucket: &BucketRef) -> Result<Self> {
        Ok(Self {
            cursor: Some(bucket.cursor()),
            pending: None,
            schema: load_schema(bucket)?,
        })
    }

    /// Scan over a bucket that does not exist: no records, empty schema.
    pub(crate) fn empty() -> Self {
        Self {
            cursor: None,
            pending: None,
            schema: Schema::new(),
        }
    }

    /// Next `(key, value)` entry, skipping nested buckets.
    fn next_entry(&mut self) -> Option<(Vec<u8>, Vec<u8>)> {
        if let Some(entry) = self.pending.take() {
            return Some(entry);
        }
        let cursor = self.cursor.as_mut()?;
        cursor.find_map(|entry| match entry.value {
            Some(value) => Some((entry.key, value)),
            None => None,
        })
    }
}

impl Bucket for KvBucket {
    fn next(&mut self) -> Result<Option<Box<dyn Record>>> {
        let mut record = FieldBuffer::new();
        let mut row_id: Option<Vec<u8>> = None;

        while let Some((key, value)) = self.next_entry() {
            let (id, name) = split_row_key(&key)?;

            let starts_next_row = matches!(&row_id, Some(current) if current.as_slice() != id);
            if starts_next_row {
                self.pending = Some((key, value));
                break;
            }
            if row_id.is_none() {
                row_id = Some(id.to_vec());
            }

            let name = std::str::from_utf8(name).map_err(|e| {
                Error::Corruption(format!("field name in key is not valid UTF-8: {}", e))
            })?;
            let field_type = self
                .schema
                .get(name)
                .ok_or_else(|| Error::FieldNotFound(name.to_string()))?
                .field_type;
            record.add(Field::from_data(name, field_type, value));
        }

        if record.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(record)))
    }

    fn schema(&mut self) -> Result<Schema> {
        Ok(self.schema.clone())
    }
}
