//! Loading field data and indexes into sealed segments.

use super::Segment;
use crate::error::{CoreError, CoreResult};
use crate::index::{BinarySet, FieldIndexInfo, LoadedIndex};
use crate::primary_key::PrimaryKey;
use crate::types::{ROW_ID_FIELD_ID, TIMESTAMP_FIELD_ID};
use tracing::info;
use vecseg_codec::{DataType, FieldId, FieldValues};
use vecseg_storage::ChunkManager;

fn canonical(data_type: DataType) -> DataType {
    if data_type.is_string() {
        DataType::VarChar
    } else {
        data_type
    }
}

impl Segment {
    /// Loads one field's full column into a sealed segment.
    ///
    /// Loading the primary-key field also adds its keys to the bloom filter.
    /// Safe to race with [`Segment::delete_segment`]: whichever takes the
    /// storage lock second sees the outcome of the first.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, `SegmentTypeMismatch` on a growing
    /// segment, `FieldNotFound` for an unknown field, or `InvalidArgument` if
    /// the column disagrees with `row_count`, the schema or earlier loads.
    pub fn load_field_data(&self, field_id: FieldId, row_count: i64, values: FieldValues) -> CoreResult<()> {
        let field = self.collection.schema().field(field_id)?;
        if row_count < 0 || values.len() != row_count as usize {
            return Err(CoreError::invalid_argument(format!(
                "field {field_id} column has {} rows, expected {row_count}",
                values.len()
            )));
        }
        let type_ok = if field_id == TIMESTAMP_FIELD_ID {
            values.data_type() == DataType::Int64
        } else {
            values.data_type() == canonical(field.data_type) && values.dim() == field.dim
        };
        if !type_ok {
            return Err(CoreError::invalid_argument(format!(
                "field {field_id} is {}(dim {}), got {}(dim {})",
                field.data_type,
                field.dim,
                values.data_type(),
                values.dim()
            )));
        }
        let pk_field = self
            .collection
            .schema()
            .primary_field()
            .map_or(ROW_ID_FIELD_ID, |f| f.field_id);
        let pks = if field_id == pk_field {
            Some(PrimaryKey::all_from_column(&values)?)
        } else {
            None
        };

        let mut sealed = self.sealed_mut()?;
        sealed.load_column(field_id, values)?;
        drop(sealed);

        if let Some(pks) = pks {
            self.update_bloom_filter(&pks);
        }
        info!(segment_id = self.meta.segment_id, field_id, row_count, "loaded field data");
        Ok(())
    }

    /// Attaches a built index to a field of a sealed segment.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, `SegmentTypeMismatch` on a growing
    /// segment, or `InvalidArgument` if the index does not fit the field or
    /// covers a different row count.
    pub fn load_index(&self, field_id: FieldId, index: LoadedIndex) -> CoreResult<()> {
        let field = self.collection.schema().field(field_id)?;
        let fits = match &index {
            LoadedIndex::StringTrie(_) => field.data_type.is_string(),
            LoadedIndex::Flat(flat) => flat.data_type() == field.data_type && flat.dim() == field.dim,
        };
        if !fits {
            return Err(CoreError::invalid_argument(format!(
                "index does not apply to field {field_id} of type {}",
                field.data_type
            )));
        }
        let rows = index.count();
        self.sealed_mut()?.load_index(field_id, index)?;
        info!(segment_id = self.meta.segment_id, field_id, rows, "loaded index");
        Ok(())
    }

    /// Reads an index's blobs through the chunk manager and attaches it.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the chunk manager, format errors for
    /// malformed blobs, or any error of [`Segment::load_index`].
    pub fn load_index_from_storage(
        &self,
        chunk_manager: &dyn ChunkManager,
        info: &FieldIndexInfo,
    ) -> CoreResult<()> {
        let set = BinarySet::read_from(chunk_manager, &info.index_file_paths)?;
        let index = LoadedIndex::from_binary_set(info, set)?;
        self.load_index(info.field_id, index)
    }

    /// Releases the resident raw data of an index-backed field.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, `SegmentTypeMismatch` on a growing
    /// segment, or `IndexNotReady` if no index serves the field.
    pub fn drop_field_data(&self, field_id: FieldId) -> CoreResult<()> {
        self.sealed_mut()?.drop_column(field_id)?;
        info!(segment_id = self.meta.segment_id, field_id, "dropped field data");
        Ok(())
    }
}
