//! `MaxInt64`: maximum of an integer field

use rowkv_core::{Bucket, Error, FieldBuffer, FieldType, RecordBuffer, RecordExt, Result};
use rowkv_engine::{MaxSeed, RowkvConfig};

use crate::pipe::Pipe;

/// Reduces its input to one record holding the maximum of an integer
/// field, stored under `max(<field>)`.
///
/// With [`MaxSeed::Zero`] (the default) the running maximum starts at 0, so
/// an all-negative input yields 0. [`MaxSeed::FirstObserved`] starts from
/// the first value instead. An empty input yields 0 in both modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxInt64 {
    field: String,
    seed: MaxSeed,
}

impl MaxInt64 {
    /// Maximum of `field`, seeded with 0.
    pub fn new(field: impl Into<String>) -> Self {
        Self::with_seed(field, MaxSeed::Zero)
    }

    /// Maximum of `field` with an explicit seed mode.
    pub fn with_seed(field: impl Into<String>, seed: MaxSeed) -> Self {
        Self {
            field: field.into(),
            seed,
        }
    }

    /// Maximum of `field` using the seed mode from `config`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the configured seed is invalid.
    pub fn from_config(field: impl Into<String>, config: &RowkvConfig) -> Result<Self> {
        Ok(Self::with_seed(field, config.max_seed_mode()?))
    }

    /// Name of the output field.
    pub fn output_name(&self) -> String {
        format!("max({})", self.field)
    }
}

impl Pipe for MaxInt64 {
    fn apply(&self, mut input: Box<dyn Bucket>) -> Result<Box<dyn Bucket>> {
        let schema = input.schema()?;
        let descriptor = schema
            .get(&self.field)
            .ok_or_else(|| Error::FieldNotFound(self.field.clone()))?;
        if descriptor.field_type != FieldType::Int64 {
            return Err(Error::IncompatibleType {
                field: self.field.clone(),
                actual: descriptor.field_type,
                operation: "max",
            });
        }

        let mut max: Option<i64> = match self.seed {
            MaxSeed::Zero => Some(0),
            MaxSeed::FirstObserved => None,
        };
        while let Some(record) = input.next()? {
            let value = record.get_int64(&self.field)?;
            max = Some(max.map_or(value, |m| m.max(value)));
        }

        let mut record = FieldBuffer::with_capacity(1);
        record.add_int64(&self.output_name(), max.unwrap_or(0))?;
        let mut output = RecordBuffer::with_schema(record.schema().clone());
        output.add(Box::new(record));
        Ok(Box::new(output))
    }

    fn name(&self) -> &str {
        "max"
    }
}
