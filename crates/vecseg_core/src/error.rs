//! Error types for vecseg core.

use crate::types::{SegmentType, UniqueId};
use thiserror::Error;
use vecseg_codec::{DataType, FieldId};

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in segment and index operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage read or write failed (the chunk manager's I/O error).
    #[error("storage error: {0}")]
    Storage(#[from] vecseg_storage::StorageError),

    /// Byte content is malformed or undersized for its field type.
    #[error("decode error: {0}")]
    Decode(#[from] vecseg_codec::CodecError),

    /// Segment type code is neither growing nor sealed.
    #[error("invalid segment type: {code}")]
    InvalidSegmentType {
        /// The rejected type code.
        code: i32,
    },

    /// Operation attempted on a torn-down segment.
    #[error("segment {segment_id} has been released")]
    NilSegment {
        /// Segment identifier.
        segment_id: UniqueId,
    },

    /// `build` called on an index that is already built.
    #[error("index has been built")]
    AlreadyBuilt,

    /// Field type has no encoding rule.
    #[error("unsupported field type: {data_type}")]
    UnsupportedFieldType {
        /// The rejected type.
        data_type: DataType,
    },

    /// Operation is a known gap.
    #[error("unimplemented: {operation}")]
    Unimplemented {
        /// Name of the operation.
        operation: String,
    },

    /// Field is flagged as indexed but its data cannot be materialized yet.
    #[error("index not ready for field {field_id}: {reason}")]
    IndexNotReady {
        /// Field identifier.
        field_id: FieldId,
        /// What is missing.
        reason: String,
    },

    /// Caller passed inconsistent or out-of-range arguments.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// Field is not part of the schema or has no registered info.
    #[error("field not found: {field_id}")]
    FieldNotFound {
        /// Field identifier.
        field_id: FieldId,
    },

    /// Field exists but has no resident data and no indexed info.
    #[error("field {field_id} is not loaded")]
    FieldNotLoaded {
        /// Field identifier.
        field_id: FieldId,
    },

    /// Serialized index or config is malformed.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// Operation requires a different segment type.
    #[error("segment type mismatch: expected {expected}, got {actual}")]
    SegmentTypeMismatch {
        /// Required type.
        expected: SegmentType,
        /// Actual type.
        actual: SegmentType,
    },

    /// Segment is not registered in the replica.
    #[error("segment not found: {segment_id}")]
    SegmentNotFound {
        /// Segment identifier.
        segment_id: UniqueId,
    },

    /// Collection is not registered in the replica.
    #[error("collection not found: {collection_id}")]
    CollectionNotFound {
        /// Collection identifier.
        collection_id: UniqueId,
    },
}

impl CoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an unimplemented error.
    pub fn unimplemented(operation: impl Into<String>) -> Self {
        Self::Unimplemented {
            operation: operation.into(),
        }
    }

    /// Creates an index not ready error.
    pub fn index_not_ready(field_id: FieldId, reason: impl Into<String>) -> Self {
        Self::IndexNotReady {
            field_id,
            reason: reason.into(),
        }
    }

    /// Returns true if this error reports a torn-down segment.
    #[must_use]
    pub fn is_nil_segment(&self) -> bool {
        matches!(self, Self::NilSegment { .. })
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_format(err.to_string())
    }
}
