//! Collection schema.
//!
//! Schemas are supplied by the metadata layer and never change for the
//! lifetime of a segment. The row blob layout of an insert batch is derived
//! from the user fields in declaration order.

use crate::error::{CoreError, CoreResult};
use crate::types::{UniqueId, ROW_ID_FIELD_ID, TIMESTAMP_FIELD_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use vecseg_codec::{DataType, FieldId, RowField, RowLayout};

/// Declaration of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field identifier.
    pub field_id: FieldId,
    /// Field name.
    pub name: String,
    /// Declared type.
    pub data_type: DataType,
    /// Vector dimension, 0 for scalars.
    #[serde(default)]
    pub dim: usize,
    /// Whether this field holds the primary key.
    #[serde(default)]
    pub is_primary_key: bool,
}

impl FieldSchema {
    /// Creates a scalar field.
    pub fn scalar(field_id: FieldId, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            field_id,
            name: name.into(),
            data_type,
            dim: 0,
            is_primary_key: false,
        }
    }

    /// Creates a vector field.
    pub fn vector(
        field_id: FieldId,
        name: impl Into<String>,
        data_type: DataType,
        dim: usize,
    ) -> Self {
        Self {
            field_id,
            name: name.into(),
            data_type,
            dim,
            is_primary_key: false,
        }
    }

    /// Marks the field as the primary key.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    fn is_system(&self) -> bool {
        self.field_id == ROW_ID_FIELD_ID || self.field_id == TIMESTAMP_FIELD_ID
    }
}

/// Schema of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Collection name.
    pub name: String,
    /// Whether primary keys are generated by the system.
    #[serde(default)]
    pub auto_id: bool,
    /// Declared fields.
    pub fields: Vec<FieldSchema>,
}

impl CollectionSchema {
    /// Creates a schema and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if field ids repeat, a vector dimension is invalid, a
    /// field has type `None`, or more than one primary key is declared.
    pub fn new(name: impl Into<String>, auto_id: bool, fields: Vec<FieldSchema>) -> CoreResult<Self> {
        let schema = Self {
            name: name.into(),
            auto_id,
            fields,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Checks the schema for structural errors.
    ///
    /// # Errors
    ///
    /// See [`CollectionSchema::new`].
    pub fn validate(&self) -> CoreResult<()> {
        let mut seen = HashSet::new();
        let mut primaries = 0;
        for field in &self.fields {
            if !seen.insert(field.field_id) {
                return Err(CoreError::invalid_argument(format!(
                    "duplicate field id {}",
                    field.field_id
                )));
            }
            if field.data_type == DataType::None {
                return Err(CoreError::UnsupportedFieldType {
                    data_type: DataType::None,
                });
            }
            field.data_type.check_dim(field.dim)?;
            if field.is_primary_key {
                primaries += 1;
                if !matches!(
                    field.data_type,
                    DataType::Int64 | DataType::VarChar | DataType::String
                ) {
                    return Err(CoreError::invalid_argument(format!(
                        "primary key field {} must be int64 or varchar",
                        field.field_id
                    )));
                }
            }
        }
        if primaries > 1 {
            return Err(CoreError::invalid_argument("more than one primary key"));
        }
        Ok(())
    }

    /// Looks up a field, including the reserved row id and timestamp fields.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` if the field is not declared.
    pub fn field(&self, field_id: FieldId) -> CoreResult<FieldSchema> {
        if let Some(field) = self.fields.iter().find(|f| f.field_id == field_id) {
            return Ok(field.clone());
        }
        match field_id {
            ROW_ID_FIELD_ID => Ok(FieldSchema::scalar(field_id, "RowID", DataType::Int64)),
            TIMESTAMP_FIELD_ID => Ok(FieldSchema::scalar(field_id, "Timestamp", DataType::Int64)),
            _ => Err(CoreError::FieldNotFound { field_id }),
        }
    }

    /// Returns the primary key field, if one is declared.
    #[must_use]
    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.is_primary_key)
    }

    /// User fields in declaration order, excluding reserved fields.
    pub fn user_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| !f.is_system())
    }

    /// Layout of the row blobs carried by an insert batch.
    ///
    /// # Errors
    ///
    /// Returns an error if a user field cannot be encoded.
    pub fn row_layout(&self) -> CoreResult<RowLayout> {
        let fields = self
            .user_fields()
            .map(|f| RowField {
                field_id: f.field_id,
                data_type: f.data_type,
                dim: f.dim,
            })
            .collect();
        Ok(RowLayout::new(fields)?)
    }
}

/// A collection: identity plus schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    id: UniqueId,
    schema: CollectionSchema,
}

impl Collection {
    /// Creates a collection.
    pub fn new(id: UniqueId, schema: CollectionSchema) -> Self {
        Self { id, schema }
    }

    /// Collection identifier.
    #[must_use]
    pub fn id(&self) -> UniqueId {
        self.id
    }

    /// Collection schema.
    #[must_use]
    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> CollectionSchema {
        CollectionSchema::new(
            "test",
            false,
            vec![
                FieldSchema::scalar(ROW_ID_FIELD_ID, "RowID", DataType::Int64),
                FieldSchema::vector(100, "vec", DataType::FloatVector, 16),
                FieldSchema::scalar(101, "age", DataType::Int32),
            ],
        )
        .unwrap()
    }

    #[test]
    fn reserved_fields_resolve() {
        let s = schema();
        assert_eq!(s.field(TIMESTAMP_FIELD_ID).unwrap().data_type, DataType::Int64);
        assert_eq!(s.field(101).unwrap().name, "age");
        assert!(matches!(
            s.field(999),
            Err(CoreError::FieldNotFound { field_id: 999 })
        ));
    }

    #[test]
    fn layout_skips_reserved_fields() {
        let layout = schema().row_layout().unwrap();
        let ids: Vec<_> = layout.fields().iter().map(|f| f.field_id).collect();
        assert_eq!(ids, vec![100, 101]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = CollectionSchema::new(
            "dup",
            true,
            vec![
                FieldSchema::scalar(100, "a", DataType::Int64),
                FieldSchema::scalar(100, "b", DataType::Int64),
            ],
        );
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }

    #[test]
    fn rejects_float_primary_key() {
        let result = CollectionSchema::new(
            "pk",
            false,
            vec![FieldSchema::scalar(100, "f", DataType::Float).primary()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn schema_from_json() {
        let json = r#"{
            "name": "c",
            "fields": [
                {"field_id": 100, "name": "pk", "data_type": "VarChar", "is_primary_key": true},
                {"field_id": 101, "name": "v", "data_type": "BinaryVector", "dim": 32}
            ]
        }"#;
        let s: CollectionSchema = serde_json::from_str(json).unwrap();
        s.validate().unwrap();
        assert_eq!(s.primary_field().unwrap().field_id, 100);
        assert!(!s.auto_id);
    }
}
