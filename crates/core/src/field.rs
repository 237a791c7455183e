//! Typed fields and their wire encoding
//!
//! A [`Field`] is one named scalar of a record. It is built either from an
//! in-memory [`FieldValue`] (when the application constructs a record) or
//! from already-encoded bytes (when a record is read back from storage).
//! Encoding of in-memory values is computed once and memoized.

use std::fmt;

use once_cell::unsync::OnceCell;

use crate::encoding::{decode_int64, encode_int64};
use crate::error::{Error, Result};

/// Declared type of a field.
///
/// The discriminant is the one-byte tag persisted in schema buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    /// 64-bit signed integer, varint encoded
    Int64 = 0,
    /// UTF-8 string, stored verbatim
    String = 1,
}

impl FieldType {
    /// Persisted tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a persisted tag byte.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for tags with no wire form.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(FieldType::Int64),
            1 => Ok(FieldType::String),
            other => Err(Error::UnsupportedType(other)),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int64 => f.write_str("int64"),
            FieldType::String => f.write_str("string"),
        }
    }
}

/// In-memory typed value of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// 64-bit signed integer
    Int64(i64),
    /// UTF-8 string
    String(String),
}

impl FieldValue {
    /// Type of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Int64(_) => FieldType::Int64,
            FieldValue::String(_) => FieldType::String,
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            FieldValue::Int64(i) => encode_int64(*i),
            FieldValue::String(s) => s.as_bytes().to_vec(),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

#[derive(Debug, Clone)]
enum Content {
    /// Built in memory; `encoded` is filled on first `encode`.
    Value {
        value: FieldValue,
        encoded: OnceCell<Vec<u8>>,
    },
    /// Read from storage.
    Data(Vec<u8>),
}

/// One named, typed scalar belonging to a record.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    field_type: FieldType,
    content: Content,
}

impl Field {
    /// Field whose declared type is taken from the value.
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        Self::with_type(name, value.field_type(), value)
    }

    /// Field with an explicit declared type.
    ///
    /// A value whose variant differs from `field_type` is accepted here and
    /// rejected by [`Field::encode`].
    pub fn with_type(name: impl Into<String>, field_type: FieldType, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            field_type,
            content: Content::Value {
                value,
                encoded: OnceCell::new(),
            },
        }
    }

    /// Field holding already-encoded bytes.
    pub fn from_data(name: impl Into<String>, field_type: FieldType, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            field_type,
            content: Content::Data(data),
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Encoded form of the field, computed once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the in-memory value does not match
    /// the declared type.
    pub fn encode(&self) -> Result<&[u8]> {
        match &self.content {
            Content::Data(data) => Ok(data),
            Content::Value { value, encoded } => encoded
                .get_or_try_init(|| {
                    if value.field_type() != self.field_type {
                        return Err(Error::TypeMismatch {
                            field: self.name.clone(),
                            expected: self.field_type,
                            actual: value.field_type(),
                        });
                    }
                    Ok(value.encode())
                })
                .map(Vec::as_slice),
        }
    }

    /// Typed value, decoding stored bytes if needed.
    ///
    /// # Errors
    ///
    /// [`Error::Overflow`] for an undecodable integer, [`Error::Corruption`]
    /// for a string that is not valid UTF-8.
    pub fn value(&self) -> Result<FieldValue> {
        match &self.content {
            Content::Value { value, .. } => Ok(value.clone()),
            Content::Data(data) => decode_value(&self.name, self.field_type, data),
        }
    }
}

/// Decode stored bytes as a value of `field_type`.
pub fn decode_value(name: &str, field_type: FieldType, data: &[u8]) -> Result<FieldValue> {
    match field_type {
        FieldType::Int64 => decode_int64(data).map(FieldValue::Int64),
        FieldType::String => std::str::from_utf8(data)
            .map(|s| FieldValue::String(s.to_string()))
            .map_err(|e| Error::Corruption(format!("field '{}' is not valid UTF-8: {}", name, e))),
    }
}
