//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before a complete value could be read.
    #[error("truncated input: needed {needed} bytes, got {available}")]
    Truncated {
        /// Bytes required to decode the value.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// A boolean byte was neither 0 nor 1.
    #[error("illegal boolean byte: {0:#04x}")]
    InvalidBool(u8),

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// The field type has no encoding rule.
    #[error("unsupported field type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported type.
        type_name: String,
    },

    /// Two columns or batches disagree on row count.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Values of one type were used where another was required.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: String,
        /// Actual type name.
        actual: String,
    },

    /// A vector dimension is zero or not representable for the type.
    #[error("invalid vector dimension {dim} for {type_name}")]
    InvalidDimension {
        /// The offending dimension.
        dim: usize,
        /// Name of the vector type.
        type_name: String,
    },

    /// A row index is outside the column.
    #[error("row {row} out of range for column of {len} rows")]
    RowOutOfRange {
        /// Requested row.
        row: usize,
        /// Column length.
        len: usize,
    },
}

impl CodecError {
    /// Create a truncated input error.
    pub fn truncated(needed: usize, available: usize) -> Self {
        Self::Truncated { needed, available }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
