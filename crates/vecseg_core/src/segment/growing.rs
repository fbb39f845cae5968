//! In-memory appendable storage of growing segments.

use crate::deleted::{check_batch, reserve};
use crate::error::{CoreError, CoreResult};
use crate::primary_key::PrimaryKey;
use crate::schema::CollectionSchema;
use crate::segment::ack::AckResponder;
use crate::types::{Timestamp, UniqueId, ROW_ID_FIELD_ID, TIMESTAMP_FIELD_ID};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::AtomicI64;
use std::sync::Arc;
use vecseg_codec::{DataType, Endian, FieldId, FieldValues, RowLayout};

/// One field's values split into fixed-size chunks.
///
/// Chunks are allocated on demand and never move, so commits to disjoint
/// offset ranges only contend on the chunks they touch.
#[derive(Debug)]
pub(crate) struct ChunkedColumn {
    data_type: DataType,
    dim: usize,
    chunk_rows: usize,
    chunks: RwLock<Vec<Arc<RwLock<FieldValues>>>>,
}

impl ChunkedColumn {
    pub(crate) fn new(data_type: DataType, dim: usize, chunk_rows: usize) -> Self {
        Self {
            data_type,
            dim,
            chunk_rows: chunk_rows.max(1),
            chunks: RwLock::new(Vec::new()),
        }
    }

    fn ensure(&self, rows: usize) -> CoreResult<()> {
        let needed = rows.div_ceil(self.chunk_rows);
        if self.chunks.read().len() >= needed {
            return Ok(());
        }
        let mut chunks = self.chunks.write();
        while chunks.len() < needed {
            let chunk = FieldValues::with_rows(self.data_type, self.dim, self.chunk_rows)?;
            chunks.push(Arc::new(RwLock::new(chunk)));
        }
        Ok(())
    }

    /// Copies `src` into rows `offset..offset + src.len()`.
    pub(crate) fn write(&self, offset: usize, src: &FieldValues) -> CoreResult<()> {
        self.ensure(offset + src.len())?;
        let mut row = 0;
        while row < src.len() {
            let global = offset + row;
            let (index, local) = (global / self.chunk_rows, global % self.chunk_rows);
            let span = (self.chunk_rows - local).min(src.len() - row);
            let chunk = self
                .chunks
                .read()
                .get(index)
                .cloned()
                .ok_or_else(|| CoreError::invalid_argument(format!("chunk {index} not allocated")))?;
            let mut chunk = chunk.write();
            for i in 0..span {
                chunk.copy_row_from(local + i, src, row + i)?;
            }
            row += span;
        }
        Ok(())
    }

    /// Collects `rows` (ascending) into one column.
    pub(crate) fn gather(&self, rows: &[usize]) -> CoreResult<FieldValues> {
        let mut out = FieldValues::empty(self.data_type, self.dim)?;
        let chunks = self.chunks.read();
        let mut i = 0;
        while i < rows.len() {
            let index = rows[i] / self.chunk_rows;
            let mut local = Vec::new();
            while i < rows.len() && rows[i] / self.chunk_rows == index {
                local.push(rows[i] % self.chunk_rows);
                i += 1;
            }
            let chunk = chunks.get(index).ok_or_else(|| {
                CoreError::invalid_argument(format!("row {} beyond allocated chunks", rows[i - 1]))
            })?;
            out.extend_from(&chunk.read().gather(&local)?)?;
        }
        Ok(out)
    }

    /// The first `n` rows.
    pub(crate) fn prefix(&self, n: usize) -> CoreResult<FieldValues> {
        self.gather(&(0..n).collect::<Vec<_>>())
    }

    pub(crate) fn mem_size(&self) -> usize {
        self.chunks.read().iter().map(|c| c.read().heap_size()).sum()
    }
}

/// Row storage of a growing segment, including row ids and timestamps.
#[derive(Debug)]
pub(crate) struct GrowingStorage {
    reserved: AtomicI64,
    ack: AckResponder,
    layout: RowLayout,
    pk_field: FieldId,
    columns: HashMap<FieldId, ChunkedColumn>,
}

impl GrowingStorage {
    pub(crate) fn new(schema: &CollectionSchema, chunk_rows: usize) -> CoreResult<Self> {
        let layout = schema.row_layout()?;
        let mut columns = HashMap::with_capacity(layout.fields().len() + 2);
        for system in [ROW_ID_FIELD_ID, TIMESTAMP_FIELD_ID] {
            columns.insert(system, ChunkedColumn::new(DataType::Int64, 0, chunk_rows));
        }
        for field in layout.fields() {
            columns.insert(
                field.field_id,
                ChunkedColumn::new(field.data_type, field.dim, chunk_rows),
            );
        }
        let pk_field = schema.primary_field().map_or(ROW_ID_FIELD_ID, |f| f.field_id);
        Ok(Self {
            reserved: AtomicI64::new(0),
            ack: AckResponder::new(),
            layout,
            pk_field,
            columns,
        })
    }

    pub(crate) fn pre_insert(&self, n: i64) -> CoreResult<i64> {
        let start = reserve(&self.reserved, n)?;
        self.ack.reserve(start, start + n);
        Ok(start)
    }

    /// Rows in the acknowledged prefix.
    pub(crate) fn row_count(&self) -> usize {
        self.ack.ack_count() as usize
    }

    pub(crate) fn pk_field(&self) -> FieldId {
        self.pk_field
    }

    pub(crate) fn column(&self, field_id: FieldId) -> Option<&ChunkedColumn> {
        self.columns.get(&field_id)
    }

    /// Decodes and writes a batch into one whole reservation without
    /// acknowledging it. Returns the batch's primary keys.
    ///
    /// The batch must fill exactly a range returned by `pre_insert` that has
    /// not been committed yet. A failed write gives the range back.
    pub(crate) fn write_rows<B: AsRef<[u8]>>(
        &self,
        offset: i64,
        row_ids: &[UniqueId],
        timestamps: &[Timestamp],
        blobs: &[B],
        endian: Endian,
    ) -> CoreResult<Vec<PrimaryKey>> {
        let n = row_ids.len();
        check_batch(n, timestamps.len())?;
        check_batch(n, blobs.len())?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let end = offset
            .checked_add(n as i64)
            .filter(|_| offset >= 0)
            .ok_or_else(|| CoreError::invalid_argument(format!("invalid insert offset {offset}")))?;
        if !self.ack.claim(offset, end) {
            return Err(CoreError::invalid_argument(format!(
                "insert of {n} rows at offset {offset} does not match an uncommitted reservation"
            )));
        }
        let written = self.write_claimed(offset as usize, row_ids, timestamps, blobs, endian);
        if written.is_err() {
            self.ack.release(offset, end);
        }
        written
    }

    fn write_claimed<B: AsRef<[u8]>>(
        &self,
        start: usize,
        row_ids: &[UniqueId],
        timestamps: &[Timestamp],
        blobs: &[B],
        endian: Endian,
    ) -> CoreResult<Vec<PrimaryKey>> {
        let decoded = self.layout.decode_rows(blobs, endian)?;
        for (field, values) in self.layout.fields().iter().zip(&decoded) {
            self.column_for_write(field.field_id)?.write(start, values)?;
        }
        let ids = FieldValues::Int64(row_ids.to_vec());
        self.column_for_write(ROW_ID_FIELD_ID)?.write(start, &ids)?;
        let ts = FieldValues::Int64(timestamps.iter().map(|&t| t as i64).collect());
        self.column_for_write(TIMESTAMP_FIELD_ID)?.write(start, &ts)?;

        if self.pk_field == ROW_ID_FIELD_ID {
            return Ok(row_ids.iter().map(|&id| PrimaryKey::Int64(id)).collect());
        }
        let position = self
            .layout
            .fields()
            .iter()
            .position(|f| f.field_id == self.pk_field)
            .ok_or(CoreError::FieldNotFound {
                field_id: self.pk_field,
            })?;
        PrimaryKey::all_from_column(&decoded[position])
    }

    pub(crate) fn ack(&self, offset: i64, n: usize) {
        self.ack.ack(offset, offset + n as i64);
    }

    pub(crate) fn mem_size(&self) -> usize {
        self.columns.values().map(ChunkedColumn::mem_size).sum()
    }

    fn column_for_write(&self, field_id: FieldId) -> CoreResult<&ChunkedColumn> {
        self.columns
            .get(&field_id)
            .ok_or(CoreError::FieldNotFound { field_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_write_spans_chunks() {
        let column = ChunkedColumn::new(DataType::Int32, 0, 4);
        column.write(2, &FieldValues::Int32(vec![1, 2, 3, 4, 5, 6, 7])).unwrap();
        assert_eq!(
            column.prefix(9).unwrap(),
            FieldValues::Int32(vec![0, 0, 1, 2, 3, 4, 5, 6, 7])
        );
        assert_eq!(column.gather(&[3, 8]).unwrap(), FieldValues::Int32(vec![2, 7]));
        assert!(column.gather(&[12]).is_err());
    }

    #[test]
    fn chunked_vectors() {
        let column = ChunkedColumn::new(DataType::FloatVector, 2, 2);
        let src = FieldValues::FloatVector {
            dim: 2,
            data: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        };
        column.write(0, &src).unwrap();
        assert_eq!(column.prefix(3).unwrap(), src);
        assert!(column.mem_size() >= 8 * 4);
    }

    #[test]
    fn chunked_rejects_wrong_type() {
        let column = ChunkedColumn::new(DataType::Int64, 0, 4);
        assert!(column.write(0, &FieldValues::Bool(vec![true])).is_err());
    }
}
