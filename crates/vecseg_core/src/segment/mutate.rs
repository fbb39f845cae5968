//! Offset reservation, inserts, deletes and bloom-filter maintenance.

use super::{Segment, SegmentStorage};
use crate::error::{CoreError, CoreResult};
use crate::primary_key::PrimaryKey;
use crate::types::{SegmentType, Timestamp, UniqueId};
use tracing::debug;

impl Segment {
    /// Reserves `n` row offsets and returns the first.
    ///
    /// Sealed segments accept no inserts and always return 0.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, or `InvalidArgument` for a
    /// negative count.
    pub fn pre_insert(&self, n: i64) -> CoreResult<i64> {
        if self.segment_type != SegmentType::Growing {
            return Ok(0);
        }
        let storage = self.storage()?;
        let SegmentStorage::Growing(growing) = &*storage else {
            return Ok(0);
        };
        let offset = growing.pre_insert(n)?;
        debug!(segment_id = self.meta.segment_id, offset, n, "reserved insert offsets");
        Ok(offset)
    }

    /// Commits a batch of rows into offsets reserved by
    /// [`Segment::pre_insert`].
    ///
    /// Each blob is one row holding every user field in schema order. The
    /// batch becomes visible once every earlier reservation is committed too.
    /// On a sealed segment this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, `InvalidArgument` if the batch
    /// lengths differ or the batch does not fill exactly one uncommitted
    /// reservation, or a decode error for malformed blobs. A rejected batch
    /// leaves its reservation open for a corrected retry.
    pub fn insert<B: AsRef<[u8]>>(
        &self,
        offset: i64,
        row_ids: &[UniqueId],
        timestamps: &[Timestamp],
        blobs: &[B],
    ) -> CoreResult<()> {
        if self.segment_type != SegmentType::Growing {
            return Ok(());
        }
        let storage = self.storage()?;
        let SegmentStorage::Growing(growing) = &*storage else {
            return Ok(());
        };
        let pks = growing.write_rows(offset, row_ids, timestamps, blobs, self.config.endian)?;
        self.update_bloom_filter(&pks);
        growing.ack(offset, row_ids.len());
        debug!(
            segment_id = self.meta.segment_id,
            offset,
            rows = row_ids.len(),
            "inserted rows"
        );
        Ok(())
    }

    /// Reserves `n` tombstone slots and returns the first.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, or `InvalidArgument` for a
    /// negative count.
    pub fn pre_delete(&self, n: i64) -> CoreResult<i64> {
        let _storage = self.storage()?;
        let offset = self.deleted.pre_delete(n)?;
        debug!(segment_id = self.meta.segment_id, offset, n, "reserved delete slots");
        Ok(offset)
    }

    /// Commits tombstones into slots reserved by [`Segment::pre_delete`].
    ///
    /// Row storage is untouched; matching rows are masked from reads at or
    /// after each tombstone's timestamp.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, or `InvalidArgument` if the batch
    /// lengths differ or the slots were not reserved.
    pub fn delete(&self, offset: i64, pks: &[PrimaryKey], timestamps: &[Timestamp]) -> CoreResult<()> {
        let _storage = self.storage()?;
        self.deleted.delete(offset, pks, timestamps)?;
        debug!(
            segment_id = self.meta.segment_id,
            offset,
            rows = pks.len(),
            "deleted rows"
        );
        Ok(())
    }

    /// Replaces all tombstones of a sealed segment being recovered.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, `SegmentTypeMismatch` on a growing
    /// segment, or `InvalidArgument` if the lengths disagree with `row_count`.
    pub fn load_deleted_record(
        &self,
        pks: &[PrimaryKey],
        timestamps: &[Timestamp],
        row_count: i64,
    ) -> CoreResult<()> {
        let _storage = self.storage()?;
        if self.segment_type != SegmentType::Sealed {
            return Err(CoreError::SegmentTypeMismatch {
                expected: SegmentType::Sealed,
                actual: self.segment_type,
            });
        }
        self.deleted.load(pks, timestamps, row_count)?;
        debug!(segment_id = self.meta.segment_id, row_count, "loaded deleted record");
        Ok(())
    }

    /// Adds primary keys to the segment's bloom filter. Keys are never
    /// removed, so repeating a call changes nothing.
    pub fn update_bloom_filter(&self, pks: &[PrimaryKey]) {
        let endian = self.config.endian;
        let mut filter = self.pk_filter.write();
        for pk in pks {
            filter.insert(&pk.to_bytes(endian));
        }
    }
}
