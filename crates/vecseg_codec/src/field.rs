//! Typed column arrays.

use crate::error::{CodecError, CodecResult};
use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// Identifier of a field within a collection schema.
pub type FieldId = i64;

/// A typed column of values, one entry per row.
///
/// Vector variants store `dim` components per row in a flat buffer; binary
/// vectors pack 8 components per byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValues {
    /// Boolean column.
    Bool(Vec<bool>),
    /// 8-bit integer column.
    Int8(Vec<i8>),
    /// 16-bit integer column.
    Int16(Vec<i16>),
    /// 32-bit integer column.
    Int32(Vec<i32>),
    /// 64-bit integer column.
    Int64(Vec<i64>),
    /// 32-bit float column.
    Float(Vec<f32>),
    /// 64-bit float column.
    Double(Vec<f64>),
    /// String column (`String` and `VarChar` fields).
    VarChar(Vec<String>),
    /// Float vector column.
    FloatVector {
        /// Components per row.
        dim: usize,
        /// Row-major components.
        data: Vec<f32>,
    },
    /// Binary vector column.
    BinaryVector {
        /// Bits per row.
        dim: usize,
        /// Row-major packed bytes, `dim / 8` per row.
        data: Vec<u8>,
    },
}

impl FieldValues {
    /// Creates a column of `rows` default values for the given type.
    ///
    /// # Errors
    ///
    /// Returns an error for `DataType::None` or an invalid vector dimension.
    pub fn with_rows(data_type: DataType, dim: usize, rows: usize) -> CodecResult<Self> {
        data_type.check_dim(dim)?;
        Ok(match data_type {
            DataType::Bool => Self::Bool(vec![false; rows]),
            DataType::Int8 => Self::Int8(vec![0; rows]),
            DataType::Int16 => Self::Int16(vec![0; rows]),
            DataType::Int32 => Self::Int32(vec![0; rows]),
            DataType::Int64 => Self::Int64(vec![0; rows]),
            DataType::Float => Self::Float(vec![0.0; rows]),
            DataType::Double => Self::Double(vec![0.0; rows]),
            DataType::String | DataType::VarChar => Self::VarChar(vec![String::new(); rows]),
            DataType::FloatVector => Self::FloatVector {
                dim,
                data: vec![0.0; rows * dim],
            },
            DataType::BinaryVector => Self::BinaryVector {
                dim,
                data: vec![0; rows * dim / 8],
            },
            DataType::None => return Err(CodecError::unsupported_type(DataType::None.to_string())),
        })
    }

    /// Creates an empty column for the given type.
    ///
    /// # Errors
    ///
    /// Same as [`FieldValues::with_rows`].
    pub fn empty(data_type: DataType, dim: usize) -> CodecResult<Self> {
        Self::with_rows(data_type, dim, 0)
    }

    /// Returns the canonical data type of the column.
    ///
    /// Both `String` and `VarChar` fields report `VarChar`.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::VarChar(_) => DataType::VarChar,
            Self::FloatVector { .. } => DataType::FloatVector,
            Self::BinaryVector { .. } => DataType::BinaryVector,
        }
    }

    /// Returns the vector dimension, or 0 for scalar columns.
    #[must_use]
    pub fn dim(&self) -> usize {
        match self {
            Self::FloatVector { dim, .. } | Self::BinaryVector { dim, .. } => *dim,
            _ => 0,
        }
    }

    /// Number of rows in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::VarChar(v) => v.len(),
            Self::FloatVector { dim, data } => data.len() / (*dim).max(1),
            Self::BinaryVector { dim, data } => data.len() / (*dim / 8).max(1),
        }
    }

    /// Returns true if the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate heap bytes held by the column.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len() * 2,
            Self::Int32(v) => v.len() * 4,
            Self::Int64(v) => v.len() * 8,
            Self::Float(v) => v.len() * 4,
            Self::Double(v) => v.len() * 8,
            Self::VarChar(v) => v.iter().map(|s| s.len() + std::mem::size_of::<String>()).sum(),
            Self::FloatVector { data, .. } => data.len() * 4,
            Self::BinaryVector { data, .. } => data.len(),
        }
    }

    fn mismatch(&self, other: &Self) -> CodecError {
        CodecError::type_mismatch(
            format!("{}(dim {})", self.data_type(), self.dim()),
            format!("{}(dim {})", other.data_type(), other.dim()),
        )
    }

    /// Overwrites row `dst` with row `src_row` of `src`.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns differ in type or dimension, or if
    /// either row is out of range.
    pub fn copy_row_from(&mut self, dst: usize, src: &Self, src_row: usize) -> CodecResult<()> {
        let dst_len = self.len();
        if dst >= dst_len {
            return Err(CodecError::RowOutOfRange { row: dst, len: dst_len });
        }
        if src_row >= src.len() {
            return Err(CodecError::RowOutOfRange {
                row: src_row,
                len: src.len(),
            });
        }
        if self.data_type() != src.data_type() || self.dim() != src.dim() {
            return Err(self.mismatch(src));
        }

        match (self, src) {
            (Self::Bool(d), Self::Bool(s)) => d[dst] = s[src_row],
            (Self::Int8(d), Self::Int8(s)) => d[dst] = s[src_row],
            (Self::Int16(d), Self::Int16(s)) => d[dst] = s[src_row],
            (Self::Int32(d), Self::Int32(s)) => d[dst] = s[src_row],
            (Self::Int64(d), Self::Int64(s)) => d[dst] = s[src_row],
            (Self::Float(d), Self::Float(s)) => d[dst] = s[src_row],
            (Self::Double(d), Self::Double(s)) => d[dst] = s[src_row],
            (Self::VarChar(d), Self::VarChar(s)) => d[dst].clone_from(&s[src_row]),
            (Self::FloatVector { dim, data: d }, Self::FloatVector { data: s, .. }) => {
                let w = *dim;
                d[dst * w..(dst + 1) * w].copy_from_slice(&s[src_row * w..(src_row + 1) * w]);
            }
            (Self::BinaryVector { dim, data: d }, Self::BinaryVector { data: s, .. }) => {
                let w = *dim / 8;
                d[dst * w..(dst + 1) * w].copy_from_slice(&s[src_row * w..(src_row + 1) * w]);
            }
            _ => unreachable!("types checked above"),
        }
        Ok(())
    }

    /// Builds a new column holding the given rows, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if any row is out of range.
    pub fn gather(&self, rows: &[usize]) -> CodecResult<Self> {
        let mut out = Self::with_rows(self.data_type(), self.dim(), rows.len())?;
        for (i, &row) in rows.iter().enumerate() {
            out.copy_row_from(i, self, row)?;
        }
        Ok(out)
    }

    /// Appends all rows of `other`.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns differ in type or dimension.
    pub fn extend_from(&mut self, other: &Self) -> CodecResult<()> {
        if self.data_type() != other.data_type() || self.dim() != other.dim() {
            return Err(self.mismatch(other));
        }
        match (self, other) {
            (Self::Bool(d), Self::Bool(s)) => d.extend_from_slice(s),
            (Self::Int8(d), Self::Int8(s)) => d.extend_from_slice(s),
            (Self::Int16(d), Self::Int16(s)) => d.extend_from_slice(s),
            (Self::Int32(d), Self::Int32(s)) => d.extend_from_slice(s),
            (Self::Int64(d), Self::Int64(s)) => d.extend_from_slice(s),
            (Self::Float(d), Self::Float(s)) => d.extend_from_slice(s),
            (Self::Double(d), Self::Double(s)) => d.extend_from_slice(s),
            (Self::VarChar(d), Self::VarChar(s)) => d.extend_from_slice(s),
            (Self::FloatVector { data: d, .. }, Self::FloatVector { data: s, .. }) => {
                d.extend_from_slice(s);
            }
            (Self::BinaryVector { data: d, .. }, Self::BinaryVector { data: s, .. }) => {
                d.extend_from_slice(s);
            }
            _ => unreachable!("types checked above"),
        }
        Ok(())
    }

    /// Returns row `row` of a float vector column.
    #[must_use]
    pub fn float_vector(&self, row: usize) -> Option<&[f32]> {
        match self {
            Self::FloatVector { dim, data } => data.get(row * dim..(row + 1) * dim),
            _ => None,
        }
    }

    /// Returns row `row` of a binary vector column.
    #[must_use]
    pub fn binary_vector(&self, row: usize) -> Option<&[u8]> {
        match self {
            Self::BinaryVector { dim, data } => {
                let w = dim / 8;
                data.get(row * w..(row + 1) * w)
            }
            _ => None,
        }
    }
}

/// A named, typed column in a retrieve result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    /// Field identifier.
    pub field_id: FieldId,
    /// Field name.
    pub field_name: String,
    /// Declared field type.
    pub data_type: DataType,
    /// Column values.
    pub values: FieldValues,
}

impl FieldData {
    /// Creates field data from its parts.
    pub fn new(
        field_id: FieldId,
        field_name: impl Into<String>,
        data_type: DataType,
        values: FieldValues,
    ) -> Self {
        Self {
            field_id,
            field_name: field_name.into(),
            data_type,
            values,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
