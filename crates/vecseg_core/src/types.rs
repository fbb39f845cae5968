//! Core type definitions for vecseg.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use vecseg_codec::FieldId;

/// Identifier for segments, partitions and collections.
pub type UniqueId = i64;

/// Hybrid logical timestamp attached to inserts, deletes and queries.
pub type Timestamp = u64;

/// Reserved field holding row ids.
pub const ROW_ID_FIELD_ID: FieldId = 0;

/// Reserved field holding insert timestamps.
pub const TIMESTAMP_FIELD_ID: FieldId = 1;

/// First identifier available to user fields.
pub const START_OF_USER_FIELD_ID: FieldId = 100;

/// Physical representation of a segment.
///
/// A segment never changes type after construction.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentType {
    /// Accepts live inserts; rows live in process memory.
    Growing = 1,
    /// Immutable; rows are loaded from binlogs or served from indexes.
    Sealed = 2,
}

impl SegmentType {
    /// Validates a raw segment type code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSegmentType` for any code other than 1 or 2.
    pub fn from_code(code: i32) -> CoreResult<Self> {
        match code {
            1 => Ok(Self::Growing),
            2 => Ok(Self::Sealed),
            _ => Err(CoreError::InvalidSegmentType { code }),
        }
    }

    /// Returns the raw type code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Growing => f.write_str("growing"),
            Self::Sealed => f.write_str("sealed"),
        }
    }
}
