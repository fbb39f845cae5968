//! Resident data and indexes of sealed segments.

use crate::error::{CoreError, CoreResult};
use crate::index::LoadedIndex;
use std::collections::HashMap;
use vecseg_codec::{FieldId, FieldValues};

/// Columns and indexes loaded into a sealed segment.
///
/// Every loaded column and index covers the same number of rows; the first
/// load fixes that count.
#[derive(Debug, Default)]
pub(crate) struct SealedStorage {
    row_count: Option<usize>,
    columns: HashMap<FieldId, FieldValues>,
    indexes: HashMap<FieldId, LoadedIndex>,
}

impl SealedStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn row_count(&self) -> usize {
        self.row_count.unwrap_or(0)
    }

    fn check_rows(&mut self, what: &str, rows: usize) -> CoreResult<()> {
        match self.row_count {
            Some(expected) if expected != rows => Err(CoreError::invalid_argument(format!(
                "{what} holds {rows} rows but the segment has {expected}"
            ))),
            _ => {
                self.row_count = Some(rows);
                Ok(())
            }
        }
    }

    pub(crate) fn load_column(&mut self, field_id: FieldId, values: FieldValues) -> CoreResult<()> {
        self.check_rows(&format!("field {field_id}"), values.len())?;
        self.columns.insert(field_id, values);
        Ok(())
    }

    pub(crate) fn load_index(&mut self, field_id: FieldId, index: LoadedIndex) -> CoreResult<()> {
        self.check_rows(&format!("index of field {field_id}"), index.count())?;
        self.indexes.insert(field_id, index);
        Ok(())
    }

    /// Releases a column that an index now serves.
    pub(crate) fn drop_column(&mut self, field_id: FieldId) -> CoreResult<()> {
        if !self.indexes.contains_key(&field_id) {
            return Err(CoreError::index_not_ready(
                field_id,
                "raw data can only be dropped once an index is loaded",
            ));
        }
        self.columns.remove(&field_id);
        Ok(())
    }

    pub(crate) fn column(&self, field_id: FieldId) -> Option<&FieldValues> {
        self.columns.get(&field_id)
    }

    pub(crate) fn has_column(&self, field_id: FieldId) -> bool {
        self.columns.contains_key(&field_id)
    }

    pub(crate) fn index(&self, field_id: FieldId) -> Option<&LoadedIndex> {
        self.indexes.get(&field_id)
    }

    pub(crate) fn mem_size(&self) -> usize {
        self.columns.values().map(FieldValues::heap_size).sum::<usize>()
            + self.indexes.values().map(LoadedIndex::heap_size).sum::<usize>()
    }
}
