//! Row key layout
//!
//! ```text
//! varint(row id) | 0x2D | field name  ->  encoded field value
//! ```

use rowkv_core::{decode_varint, Error, Result};

use super::schema::SCHEMA_BUCKET;

/// Byte between the row identifier and the field name.
pub const SEPARATOR: u8 = b'-';

/// Key of field `name` in row `row_id`.
pub fn row_key(row_id: &[u8], name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(row_id.len() + 1 + name.len());
    key.extend_from_slice(row_id);
    key.push(SEPARATOR);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Split a key into `(row id, field name)`.
///
/// The row id is read as one varint, so a multi-byte id whose last byte
/// equals [`SEPARATOR`] still splits at the right place.
///
/// # Errors
///
/// [`Error::MalformedKey`] if the key does not start with a varint followed
/// by the separator.
pub fn split_row_key(key: &[u8]) -> Result<(&[u8], &[u8])> {
    let malformed = || Error::MalformedKey(key.to_vec());
    let (_, len) = decode_varint(key).map_err(|_| malformed())?;
    match key.get(len) {
        Some(&SEPARATOR) => Ok((&key[..len], &key[len + 1..])),
        _ => Err(malformed()),
    }
}

/// Reject empty paths, empty segments and the reserved schema bucket name.
pub(crate) fn validate_path(path: &[&str]) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidPath("path must name at least one bucket".into()));
    }
    for segment in path {
        if segment.is_empty() {
            return Err(Error::InvalidPath("empty path segment".into()));
        }
        if *segment == SCHEMA_BUCKET {
            return Err(Error::InvalidPath(format!("'{}' is reserved", SCHEMA_BUCKET)));
        }
    }
    Ok(())
}
