//! Records: ordered sequences of fields
//!
//! [`Record`] is the iterator-style contract every record source implements.
//! [`FieldBuffer`] is the in-memory realization used both for records built
//! by the application and for rows materialized by storage scans.

use crate::encoding::decode_int64;
use crate::error::{Error, Result};
use crate::field::{Field, FieldValue};
use crate::schema::Schema;

/// Ordered, finite sequence of fields.
pub trait Record {
    /// Next field, or `None` at the end of the record.
    fn next(&mut self) -> Result<Option<&Field>>;

    /// Encoded bytes of the field called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldNotFound`] if the record has no such field.
    fn bytes(&self, name: &str) -> Result<&[u8]>;

    /// Restart `next` from the first field.
    fn rewind(&mut self);
}

/// Typed accessors over any [`Record`].
pub trait RecordExt: Record {
    /// Decode field `name` as an integer.
    fn get_int64(&self, name: &str) -> Result<i64> {
        decode_int64(self.bytes(name)?)
    }

    /// Decode field `name` as a string.
    fn get_string(&self, name: &str) -> Result<String> {
        let data = self.bytes(name)?;
        String::from_utf8(data.to_vec())
            .map_err(|e| Error::Corruption(format!("field '{}' is not valid UTF-8: {}", name, e)))
    }

    /// All fields as `(name, value)` pairs, in record order.
    ///
    /// Replays the record from the start and leaves it rewound.
    fn values(&mut self) -> Result<Vec<(String, FieldValue)>> {
        self.rewind();
        let mut out = Vec::new();
        while let Some(field) = self.next()? {
            out.push((field.name().to_string(), field.value()?));
        }
        self.rewind();
        Ok(out)
    }
}

impl<R: Record + ?Sized> RecordExt for R {}

/// In-memory record: an append-only list of fields with sequential replay.
#[derive(Debug, Clone, Default)]
pub struct FieldBuffer {
    fields: Vec<Field>,
    pos: usize,
    schema: Schema,
}

impl FieldBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffer with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Append a field without any schema check.
    pub fn add(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Append an integer field, registering its name in the buffer schema.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if `name` was previously added with another type.
    pub fn add_int64(&mut self, name: &str, value: i64) -> Result<()> {
        self.add_value(name, FieldValue::Int64(value))
    }

    /// Append a string field, registering its name in the buffer schema.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if `name` was previously added with another type.
    pub fn add_string(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.add_value(name, FieldValue::String(value.into()))
    }

    fn add_value(&mut self, name: &str, value: FieldValue) -> Result<()> {
        self.schema.register(name, value.field_type())?;
        let field = self.schema.field(name, value)?;
        self.fields.push(field);
        Ok(())
    }

    /// Rewind and drop all fields, keeping the allocation and the schema.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.fields.clear();
    }

    /// Number of buffered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field is buffered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Buffered fields in insertion order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Schema built from typed `add_*` calls.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Record for FieldBuffer {
    fn next(&mut self) -> Result<Option<&Field>> {
        match self.fields.get(self.pos) {
            Some(field) => {
                self.pos += 1;
                Ok(Some(field))
            }
            None => Ok(None),
        }
    }

    fn bytes(&self, name: &str) -> Result<&[u8]> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))?
            .encode()
    }

    fn rewind(&mut self) {
        self.pos = 0;
    }
}
