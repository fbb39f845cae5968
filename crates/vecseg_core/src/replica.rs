//! Registry of the collections and segments served by one node.
//!
//! The replica is an explicit context object: callers own it and pass it
//! around, so there is no process-wide segment state. Each map has its own
//! lock; segment operations lock only inside the segment.

use crate::config::SegmentConfig;
use crate::error::{CoreError, CoreResult};
use crate::plan::{PlaceholderGroup, RetrievePlan, RetrieveResult, SearchPlan, SearchResult};
use crate::primary_key::PrimaryKey;
use crate::schema::{Collection, CollectionSchema};
use crate::segment::{Segment, SegmentMeta};
use crate::types::{SegmentType, Timestamp, UniqueId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use vecseg_storage::ChunkManager;

/// Collections and segments of one replica.
#[derive(Debug, Default)]
pub struct SegmentReplica {
    config: SegmentConfig,
    collections: RwLock<HashMap<UniqueId, Arc<Collection>>>,
    segments: RwLock<HashMap<UniqueId, Arc<Segment>>>,
}

impl SegmentReplica {
    /// Creates an empty replica whose segments use `config`.
    #[must_use]
    pub fn new(config: SegmentConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Registers a collection, replacing any previous schema under the id.
    pub fn add_collection(&self, collection_id: UniqueId, schema: CollectionSchema) -> Arc<Collection> {
        let collection = Arc::new(Collection::new(collection_id, schema));
        self.collections
            .write()
            .insert(collection_id, Arc::clone(&collection));
        info!(collection_id, "added collection");
        collection
    }

    /// Looks up a collection.
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotFound` if it is not registered.
    pub fn get_collection(&self, collection_id: UniqueId) -> CoreResult<Arc<Collection>> {
        self.collections
            .read()
            .get(&collection_id)
            .cloned()
            .ok_or(CoreError::CollectionNotFound { collection_id })
    }

    /// Drops a collection and releases all of its segments.
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotFound` if it is not registered.
    pub fn remove_collection(&self, collection_id: UniqueId) -> CoreResult<()> {
        self.collections
            .write()
            .remove(&collection_id)
            .ok_or(CoreError::CollectionNotFound { collection_id })?;
        let mut segments = self.segments.write();
        segments.retain(|_, segment| {
            let keep = segment.collection_id() != collection_id;
            if !keep {
                segment.delete_segment();
            }
            keep
        });
        info!(collection_id, "removed collection");
        Ok(())
    }

    /// Creates and registers a segment from a raw type code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSegmentType` for an unknown code,
    /// `CollectionNotFound` for an unregistered collection, or
    /// `InvalidArgument` if the segment id is taken.
    pub fn add_segment(&self, meta: SegmentMeta, segment_type: i32) -> CoreResult<Arc<Segment>> {
        let segment_type = SegmentType::from_code(segment_type)?;
        let collection = self.get_collection(meta.collection_id)?;
        let mut segments = self.segments.write();
        if segments.contains_key(&meta.segment_id) {
            return Err(CoreError::invalid_argument(format!(
                "segment {} already exists",
                meta.segment_id
            )));
        }
        let segment = Arc::new(Segment::new(collection, meta, segment_type, self.config.clone())?);
        segments.insert(segment.segment_id(), Arc::clone(&segment));
        Ok(segment)
    }

    /// Looks up a segment.
    ///
    /// # Errors
    ///
    /// Returns `SegmentNotFound` if it is not registered.
    pub fn get_segment_by_id(&self, segment_id: UniqueId) -> CoreResult<Arc<Segment>> {
        self.segments
            .read()
            .get(&segment_id)
            .cloned()
            .ok_or(CoreError::SegmentNotFound { segment_id })
    }

    /// Unregisters a segment and releases its storage. Handles held
    /// elsewhere see `NilSegment` from then on.
    ///
    /// # Errors
    ///
    /// Returns `SegmentNotFound` if it is not registered.
    pub fn remove_segment(&self, segment_id: UniqueId) -> CoreResult<()> {
        let segment = self
            .segments
            .write()
            .remove(&segment_id)
            .ok_or(CoreError::SegmentNotFound { segment_id })?;
        segment.delete_segment();
        Ok(())
    }

    /// Whether a segment is registered.
    #[must_use]
    pub fn has_segment(&self, segment_id: UniqueId) -> bool {
        self.segments.read().contains_key(&segment_id)
    }

    /// Registered segment ids, ascending, optionally of one type.
    #[must_use]
    pub fn segment_ids(&self, segment_type: Option<SegmentType>) -> Vec<UniqueId> {
        let mut ids: Vec<UniqueId> = self
            .segments
            .read()
            .values()
            .filter(|s| segment_type.map_or(true, |t| s.segment_type() == t))
            .map(|s| s.segment_id())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// For each segment of `segment_ids`, the keys of `pks` it may hold.
    /// Segments whose bloom filter rules out every key are omitted.
    ///
    /// # Errors
    ///
    /// Returns `SegmentNotFound` for an unregistered segment.
    pub fn filter_segments_by_pks(
        &self,
        segment_ids: &[UniqueId],
        pks: &[PrimaryKey],
    ) -> CoreResult<Vec<(UniqueId, Vec<PrimaryKey>)>> {
        let mut out = Vec::new();
        for &segment_id in segment_ids {
            let segment = self.get_segment_by_id(segment_id)?;
            let hits: Vec<PrimaryKey> = pks.iter().filter(|pk| segment.may_contain_pk(pk)).cloned().collect();
            if !hits.is_empty() {
                out.push((segment_id, hits));
            }
        }
        Ok(out)
    }

    /// Retrieves from each segment and fills its index-backed fields.
    ///
    /// # Errors
    ///
    /// Returns the first segment's lookup, retrieve or fill error.
    pub fn retrieve(
        &self,
        segment_ids: &[UniqueId],
        plan: &RetrievePlan,
        chunk_manager: Option<&dyn ChunkManager>,
    ) -> CoreResult<Vec<(UniqueId, RetrieveResult)>> {
        let mut out = Vec::with_capacity(segment_ids.len());
        for &segment_id in segment_ids {
            let segment = self.get_segment_by_id(segment_id)?;
            let mut result = segment.retrieve(plan)?;
            segment.fill_indexed_fields_data(chunk_manager, &mut result)?;
            out.push((segment_id, result));
        }
        Ok(out)
    }

    /// Searches each segment; results stay per segment for the caller to
    /// merge.
    ///
    /// # Errors
    ///
    /// Returns the first segment's lookup or search error.
    pub fn search(
        &self,
        segment_ids: &[UniqueId],
        plan: &SearchPlan,
        groups: &[PlaceholderGroup],
        timestamps: &[Timestamp],
    ) -> CoreResult<Vec<(UniqueId, Vec<SearchResult>)>> {
        let mut out = Vec::with_capacity(segment_ids.len());
        for &segment_id in segment_ids {
            let segment = self.get_segment_by_id(segment_id)?;
            out.push((segment_id, segment.search(plan, groups, timestamps)?));
        }
        Ok(out)
    }
}
