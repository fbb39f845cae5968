//! Segment configuration.

use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use vecseg_codec::Endian;

/// Configuration shared by every segment of a replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Byte order of every fixed-width value in blobs and binlogs.
    pub endian: Endian,

    /// Bytes skipped at the head of each binlog before row data.
    pub binlog_header_size: u64,

    /// Rows per chunk of growing-segment column storage.
    pub chunk_rows: usize,

    /// Expected number of primary keys per segment.
    pub bloom_capacity: usize,

    /// Target false-positive rate of the primary-key filter.
    pub bloom_false_positive_rate: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
            binlog_header_size: 0,
            chunk_rows: 32 * 1024,
            bloom_capacity: 100_000,
            bloom_false_positive_rate: 0.005,
        }
    }
}

impl SegmentConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the JSON is malformed.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the byte order.
    #[must_use]
    pub const fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Sets the binlog header size.
    #[must_use]
    pub const fn binlog_header_size(mut self, size: u64) -> Self {
        self.binlog_header_size = size;
        self
    }

    /// Sets rows per growing chunk. Zero is treated as one.
    #[must_use]
    pub const fn chunk_rows(mut self, rows: usize) -> Self {
        self.chunk_rows = if rows == 0 { 1 } else { rows };
        self
    }

    /// Sets bloom filter sizing.
    #[must_use]
    pub const fn bloom(mut self, capacity: usize, false_positive_rate: f64) -> Self {
        self.bloom_capacity = capacity;
        self.bloom_false_positive_rate = false_positive_rate;
        self
    }
}

/// Options for serializing an index into a [`crate::index::BinarySet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializeConfig {
    /// When set, blobs larger than this are split into slices.
    pub slice_size: Option<usize>,
}

impl SerializeConfig {
    /// Splits blobs into slices of at most `size` bytes.
    #[must_use]
    pub const fn sliced(size: usize) -> Self {
        Self {
            slice_size: Some(size),
        }
    }
}
