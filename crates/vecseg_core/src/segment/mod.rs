//! Segments: the unit of row storage.
//!
//! A [`Segment`] is either growing (accepts inserts into in-memory chunked
//! columns) or sealed (immutable, loaded column by column from binlogs or
//! served by indexes). The type is fixed at construction.
//!
//! # Concurrency
//!
//! Storage sits behind one `RwLock<Option<_>>`. Every operation takes the
//! read side and fails with [`CoreError::NilSegment`] once the storage has
//! been released by [`Segment::delete_segment`], which takes the write side.
//! Offset reservation is a lock-free atomic counter. The bloom filter,
//! tombstones and indexed-field registry each carry their own lock.

mod ack;
mod fill;
mod growing;
mod load;
mod mutate;
mod read;
mod sealed;

pub use fill::{
    fill_binary_vector_field_data, fill_bool_field_data, fill_double_field_data,
    fill_field_data, fill_float_field_data, fill_float_vector_field_data,
    fill_int16_field_data, fill_int32_field_data, fill_int64_field_data,
    fill_int8_field_data, fill_string_field_data, BinlogFormat,
};

use crate::bloom::BloomFilter;
use crate::config::SegmentConfig;
use crate::deleted::DeletedRecord;
use crate::error::{CoreError, CoreResult};
use crate::index::IndexedFieldInfo;
use crate::primary_key::PrimaryKey;
use crate::schema::Collection;
use crate::stats::SegmentStats;
use crate::types::{SegmentType, UniqueId};
use growing::GrowingStorage;
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use sealed::SealedStorage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use vecseg_codec::FieldId;

/// Identity of a segment within the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMeta {
    /// Segment identifier.
    pub segment_id: UniqueId,
    /// Owning partition.
    pub partition_id: UniqueId,
    /// Owning collection.
    pub collection_id: UniqueId,
    /// DML channel the segment consumes.
    pub channel: String,
}

impl SegmentMeta {
    /// Creates segment identity.
    pub fn new(
        segment_id: UniqueId,
        partition_id: UniqueId,
        collection_id: UniqueId,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            segment_id,
            partition_id,
            collection_id,
            channel: channel.into(),
        }
    }
}

#[derive(Debug)]
pub(crate) enum SegmentStorage {
    Growing(GrowingStorage),
    Sealed(SealedStorage),
}

impl SegmentStorage {
    fn row_count(&self) -> usize {
        match self {
            Self::Growing(g) => g.row_count(),
            Self::Sealed(s) => s.row_count(),
        }
    }

    fn mem_size(&self) -> usize {
        match self {
            Self::Growing(g) => g.mem_size(),
            Self::Sealed(s) => s.mem_size(),
        }
    }
}

/// A shard of rows with mutation and query operations.
#[derive(Debug)]
pub struct Segment {
    meta: SegmentMeta,
    segment_type: SegmentType,
    collection: Arc<Collection>,
    config: SegmentConfig,
    on_service: AtomicBool,
    storage: RwLock<Option<SegmentStorage>>,
    pk_filter: RwLock<BloomFilter>,
    deleted: DeletedRecord,
    indexed_fields: RwLock<HashMap<FieldId, IndexedFieldInfo>>,
    id_binlog_row_sizes: RwLock<Vec<i64>>,
}

impl Segment {
    /// Creates an empty segment of the given type.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `meta.collection_id` does not name
    /// `collection`, or an error if the schema has no valid row layout.
    pub fn new(
        collection: Arc<Collection>,
        meta: SegmentMeta,
        segment_type: SegmentType,
        config: SegmentConfig,
    ) -> CoreResult<Self> {
        if meta.collection_id != collection.id() {
            return Err(CoreError::invalid_argument(format!(
                "segment {} names collection {} but was given collection {}",
                meta.segment_id,
                meta.collection_id,
                collection.id()
            )));
        }
        let storage = match segment_type {
            SegmentType::Growing => {
                SegmentStorage::Growing(GrowingStorage::new(collection.schema(), config.chunk_rows)?)
            }
            SegmentType::Sealed => SegmentStorage::Sealed(SealedStorage::new()),
        };
        let pk_filter = BloomFilter::with_rate(config.bloom_capacity, config.bloom_false_positive_rate);
        info!(
            segment_id = meta.segment_id,
            collection_id = meta.collection_id,
            partition_id = meta.partition_id,
            channel = %meta.channel,
            segment_type = %segment_type,
            "created segment"
        );
        Ok(Self {
            meta,
            segment_type,
            collection,
            config,
            on_service: AtomicBool::new(false),
            storage: RwLock::new(Some(storage)),
            pk_filter: RwLock::new(pk_filter),
            deleted: DeletedRecord::new(),
            indexed_fields: RwLock::new(HashMap::new()),
            id_binlog_row_sizes: RwLock::new(Vec::new()),
        })
    }

    /// Creates a segment from a raw type code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSegmentType` for codes other than growing (1) and
    /// sealed (2), otherwise as [`Segment::new`].
    pub fn with_type_code(
        collection: Arc<Collection>,
        meta: SegmentMeta,
        code: i32,
        config: SegmentConfig,
    ) -> CoreResult<Self> {
        Self::new(collection, meta, SegmentType::from_code(code)?, config)
    }

    /// Releases all row storage and indexes.
    ///
    /// Calling this again is a no-op. In-flight operations finish first;
    /// later ones fail with `NilSegment`.
    pub fn delete_segment(&self) {
        let released = self.storage.write().take();
        if released.is_some() {
            self.indexed_fields.write().clear();
            info!(segment_id = self.meta.segment_id, "released segment");
        }
    }

    /// Returns true once [`Segment::delete_segment`] has run.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.storage.read().is_none()
    }

    /// Segment identifier.
    #[must_use]
    pub fn segment_id(&self) -> UniqueId {
        self.meta.segment_id
    }

    /// Owning partition.
    #[must_use]
    pub fn partition_id(&self) -> UniqueId {
        self.meta.partition_id
    }

    /// Owning collection.
    #[must_use]
    pub fn collection_id(&self) -> UniqueId {
        self.meta.collection_id
    }

    /// DML channel.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.meta.channel
    }

    /// Physical representation.
    #[must_use]
    pub fn segment_type(&self) -> SegmentType {
        self.segment_type
    }

    /// Collection the segment belongs to.
    #[must_use]
    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    /// Segment configuration.
    #[must_use]
    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Whether the segment serves queries.
    #[must_use]
    pub fn is_on_service(&self) -> bool {
        self.on_service.load(Ordering::Acquire)
    }

    /// Marks the segment ready (or not) for queries.
    pub fn set_on_service(&self, on_service: bool) {
        self.on_service.store(on_service, Ordering::Release);
    }

    /// Committed rows. Zero once released.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.storage.read().as_ref().map_or(0, SegmentStorage::row_count)
    }

    /// Committed tombstones.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Estimated resident bytes of rows, indexes, tombstones and the bloom
    /// filter.
    #[must_use]
    pub fn mem_size(&self) -> usize {
        let storage = self.storage.read().as_ref().map_or(0, SegmentStorage::mem_size);
        storage + self.pk_filter.read().heap_size() + self.deleted.heap_size()
    }

    /// Snapshot of the segment's counters.
    #[must_use]
    pub fn stats(&self) -> SegmentStats {
        SegmentStats {
            segment_id: self.meta.segment_id,
            segment_type: self.segment_type,
            row_count: self.row_count(),
            deleted_count: self.deleted_count(),
            mem_size: self.mem_size(),
            on_service: self.is_on_service(),
            released: self.is_released(),
        }
    }

    /// Returns `false` if no row with `pk` was ever inserted or loaded.
    #[must_use]
    pub fn may_contain_pk(&self, pk: &PrimaryKey) -> bool {
        self.pk_filter.read().may_contain(&pk.to_bytes(self.config.endian))
    }

    /// Registers binlog and index metadata for a field.
    pub fn set_indexed_field_info(&self, field_id: FieldId, info: IndexedFieldInfo) {
        if info.index_enabled() && info.binlogs().is_empty() {
            warn!(
                segment_id = self.meta.segment_id,
                field_id, "index enabled for field without binlogs"
            );
        }
        self.indexed_fields.write().insert(field_id, info);
    }

    /// Returns the registered info of a field.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` if nothing is registered for the field.
    pub fn get_indexed_field_info(&self, field_id: FieldId) -> CoreResult<IndexedFieldInfo> {
        self.indexed_fields
            .read()
            .get(&field_id)
            .cloned()
            .ok_or(CoreError::FieldNotFound { field_id })
    }

    /// Returns true if the field has enabled index info.
    #[must_use]
    pub fn has_load_index_for_indexed_field(&self, field_id: FieldId) -> bool {
        self.indexed_fields
            .read()
            .get(&field_id)
            .is_some_and(IndexedFieldInfo::index_enabled)
    }

    /// Sets the rows held by each binlog, in binlog order.
    pub fn set_id_binlog_row_sizes(&self, sizes: Vec<i64>) {
        *self.id_binlog_row_sizes.write() = sizes;
    }

    /// Rows held by each binlog, in binlog order.
    #[must_use]
    pub fn id_binlog_row_sizes(&self) -> Vec<i64> {
        self.id_binlog_row_sizes.read().clone()
    }

    fn nil(&self) -> CoreError {
        CoreError::NilSegment {
            segment_id: self.meta.segment_id,
        }
    }

    fn storage(&self) -> CoreResult<MappedRwLockReadGuard<'_, SegmentStorage>> {
        RwLockReadGuard::try_map(self.storage.read(), Option::as_ref).map_err(|_| self.nil())
    }

    fn sealed_mut(&self) -> CoreResult<MappedRwLockWriteGuard<'_, SealedStorage>> {
        RwLockWriteGuard::try_map(self.storage.write(), |s| match s {
            Some(SegmentStorage::Sealed(sealed)) => Some(sealed),
            _ => None,
        })
        .map_err(|guard| match &*guard {
            None => self.nil(),
            Some(_) => CoreError::SegmentTypeMismatch {
                expected: SegmentType::Sealed,
                actual: self.segment_type,
            },
        })
    }
}
