//! Per-bucket schema: field name to declared type
//!
//! A schema is an explicit value. Storage adapters load it from the bucket
//! they open and thread it through the records they produce; there is no
//! process-wide schema cache.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::field::{Field, FieldType, FieldValue};

/// Name and declared type of a schema entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
}

/// Mapping from field name to declared type, scoped to one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: BTreeMap<String, FieldDescriptor>,
}

impl Schema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor registered for `name`.
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Register or overwrite the type of `name`.
    ///
    /// This bypasses the type-change check and is meant for loading a schema
    /// that was already validated when it was persisted. Use
    /// [`Schema::register`] everywhere else.
    pub fn set(&mut self, name: impl Into<String>, field_type: FieldType) {
        let name = name.into();
        self.fields.insert(
            name.clone(),
            FieldDescriptor { name, field_type },
        );
    }

    /// Register `name` with `field_type`.
    ///
    /// Registering an existing name with the same type is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `name` is already registered with a
    /// different type.
    pub fn register(&mut self, name: &str, field_type: FieldType) -> Result<()> {
        match self.fields.get(name) {
            Some(existing) if existing.field_type != field_type => Err(Error::TypeMismatch {
                field: name.to_string(),
                expected: existing.field_type,
                actual: field_type,
            }),
            Some(_) => Ok(()),
            None => {
                self.set(name, field_type);
                Ok(())
            }
        }
    }

    /// Build a field for a registered name.
    ///
    /// # Errors
    ///
    /// [`Error::FieldNotFound`] for an unknown name, [`Error::TypeMismatch`]
    /// if `value` does not have the registered type.
    pub fn field(&self, name: &str, value: FieldValue) -> Result<Field> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))?;
        if descriptor.field_type != value.field_type() {
            return Err(Error::TypeMismatch {
                field: name.to_string(),
                expected: descriptor.field_type,
                actual: value.field_type(),
            });
        }
        Ok(Field::with_type(name, descriptor.field_type, value))
    }

    /// Descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field is registered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
