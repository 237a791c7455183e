//! Buckets: ordered sequences of records
//!
//! [`Bucket`] is the contract shared by storage scans and pipeline stages.
//! [`RecordBuffer`] is the in-memory realization pipeline stages emit.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::record::Record;
use crate::schema::Schema;

/// Ordered, finite, single-pass sequence of records with a schema.
pub trait Bucket {
    /// Next record, or `None` once the bucket is exhausted.
    fn next(&mut self) -> Result<Option<Box<dyn Record>>>;

    /// Schema governing the records of this bucket.
    fn schema(&mut self) -> Result<Schema>;
}

impl<B: Bucket + ?Sized> Bucket for Box<B> {
    fn next(&mut self) -> Result<Option<Box<dyn Record>>> {
        (**self).next()
    }

    fn schema(&mut self) -> Result<Schema> {
        (**self).schema()
    }
}

/// In-memory bucket of pre-built records, replayed in insertion order.
#[derive(Default)]
pub struct RecordBuffer {
    records: VecDeque<Box<dyn Record>>,
    schema: Option<Schema>,
}

impl RecordBuffer {
    /// Empty buffer whose schema is inferred from its first record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffer with a fixed schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            records: VecDeque::new(),
            schema: Some(schema),
        }
    }

    /// Append a record.
    pub fn add(&mut self, record: Box<dyn Record>) {
        self.records.push_back(record);
    }

    /// Records not yet returned by `next`.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when `next` would return `None`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Debug for RecordBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordBuffer")
            .field("records", &self.records.len())
            .field("schema", &self.schema)
            .finish()
    }
}

impl Bucket for RecordBuffer {
    fn next(&mut self) -> Result<Option<Box<dyn Record>>> {
        Ok(self.records.pop_front())
    }

    /// Fixed schema if one was given, otherwise the names and types of the
    /// fields of the first pending record.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyInput`] when inferring from an empty buffer.
    fn schema(&mut self) -> Result<Schema> {
        if let Some(schema) = &self.schema {
            return Ok(schema.clone());
        }

        let first = self.records.front_mut().ok_or(Error::EmptyInput)?;
        let mut schema = Schema::new();
        first.rewind();
        while let Some(field) = first.next()? {
            schema.set(field.name(), field.field_type());
        }
        first.rewind();
        Ok(schema)
    }
}
