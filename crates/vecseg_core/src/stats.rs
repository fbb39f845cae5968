//! Point-in-time segment statistics.

use crate::types::{SegmentType, UniqueId};
use serde::{Deserialize, Serialize};

/// Snapshot of a segment's counters.
///
/// Values are read without a global lock, so fields may come from slightly
/// different instants while writers are active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStats {
    /// Segment identifier.
    pub segment_id: UniqueId,
    /// Physical representation.
    pub segment_type: SegmentType,
    /// Committed rows; 0 once released.
    pub row_count: usize,
    /// Committed tombstones.
    pub deleted_count: usize,
    /// Estimated resident bytes.
    pub mem_size: usize,
    /// Whether the segment serves queries.
    pub on_service: bool,
    /// Whether the segment storage has been released.
    pub released: bool,
}

impl SegmentStats {
    /// Rows minus tombstones, floored at zero. Tombstones may target rows in
    /// other segments, so this is an estimate.
    #[must_use]
    pub fn live_rows_estimate(&self) -> usize {
        self.row_count.saturating_sub(self.deleted_count)
    }
}
