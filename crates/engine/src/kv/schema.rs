//! Schema persistence in a hidden sub-bucket
//!
//! Each data bucket owns a nested bucket named [`SCHEMA_BUCKET`] holding one
//! entry per field name whose value is the one-byte [`FieldType`] tag.

use rowkv_core::{Error, Field, FieldType, Result, Schema};
use rowkv_storage::{BucketRef, Tx};
use tracing::{debug, warn};

/// Name of the reserved schema sub-bucket.
pub const SCHEMA_BUCKET: &str = "__schema";

/// Writer for the schema sub-bucket of one data bucket.
pub(crate) struct SchemaBucket {
    path: Vec<Vec<u8>>,
}

impl SchemaBucket {
    /// Create (if absent) the schema sub-bucket under `bucket_path`.
    pub(crate) fn create(tx: &mut Tx, bucket_path: &[&str]) -> Result<Self> {
        let path: Vec<Vec<u8>> = bucket_path
            .iter()
            .map(|s| s.as_bytes().to_vec())
            .chain(std::iter::once(SCHEMA_BUCKET.as_bytes().to_vec()))
            .collect();
        tx.create_bucket_if_not_exists(&path)
            .map_err(Error::storage)?;
        Ok(Self { path })
    }

    /// Record the type of `field`, or check it against the recorded one.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if the name is recorded with another type.
    pub(crate) fn register(&self, tx: &mut Tx, field: &Field) -> Result<()> {
        let name = field.name();
        let tag = field.field_type().tag();

        match tx.get(&self.path, name.as_bytes()).as_deref() {
            None | Some([]) => {
                tx.put(&self.path, name.as_bytes(), &[tag])
                    .map_err(Error::storage)?;
                debug!(target: "rowkv::schema", field = name, field_type = %field.field_type(), "registered field");
                Ok(())
            }
            Some([existing]) if *existing == tag => Ok(()),
            Some(existing) => {
                let expected = FieldType::from_tag(existing[0])?;
                warn!(
                    target: "rowkv::schema",
                    field = name,
                    expected = %expected,
                    actual = %field.field_type(),
                    "field type conflicts with schema"
                );
                Err(Error::TypeMismatch {
                    field: name.to_string(),
                    expected,
                    actual: field.field_type(),
                })
            }
        }
    }
}

/// Read the schema stored under `bucket`.
///
/// A bucket without a schema sub-bucket has an empty schema. Entries with an
/// empty value are ignored.
///
/// # Errors
///
/// [`Error::UnsupportedType`] for an unknown tag, [`Error::Corruption`] for a
/// field name that is not UTF-8.
pub(crate) fn load_schema(bucket: &BucketRef) -> Result<Schema> {
    let mut schema = Schema::new();
    let Some(stored) = bucket.bucket(SCHEMA_BUCKET.as_bytes()) else {
        return Ok(schema);
    };

    for (name, value) in stored.iter() {
        let Some(&tag) = value.and_then(|v| v.first()) else {
            continue;
        };
        let name = std::str::from_utf8(name).map_err(|e| {
            Error::Corruption(format!("schema field name is not valid UTF-8: {}", e))
        })?;
        schema.set(name, FieldType::from_tag(tag)?);
    }
    Ok(schema)
}
