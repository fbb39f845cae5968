//! Field data types.

use crate::error::{CodecError, CodecResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a collection field.
///
/// Discriminants match the wire codes used by schema metadata.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Placeholder for "no type"; never encodable.
    None = 0,
    /// Boolean, one byte per row.
    Bool = 1,
    /// 8-bit signed integer.
    Int8 = 2,
    /// 16-bit signed integer.
    Int16 = 3,
    /// 32-bit signed integer.
    Int32 = 4,
    /// 64-bit signed integer.
    Int64 = 5,
    /// 32-bit IEEE float.
    Float = 10,
    /// 64-bit IEEE float.
    Double = 11,
    /// Legacy string type, stored like `VarChar`.
    String = 20,
    /// Variable-length UTF-8 string.
    VarChar = 21,
    /// Packed bit vector; `dim` bits per row.
    BinaryVector = 100,
    /// Float vector; `dim` floats per row.
    FloatVector = 101,
}

impl DataType {
    /// Returns the width in bytes of one scalar element, or `None` for
    /// variable-length and vector types.
    #[must_use]
    pub const fn element_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Int8 => Some(1),
            Self::Int16 => Some(2),
            Self::Int32 | Self::Float => Some(4),
            Self::Int64 | Self::Double => Some(8),
            _ => None,
        }
    }

    /// Returns the number of bytes one row occupies, or `None` for
    /// variable-length types and `None`.
    #[must_use]
    pub fn row_size(self, dim: usize) -> Option<usize> {
        match self {
            Self::FloatVector => Some(dim * 4),
            Self::BinaryVector => Some(dim / 8),
            other => other.element_size(),
        }
    }

    /// Returns true for vector types.
    #[must_use]
    pub const fn is_vector(self) -> bool {
        matches!(self, Self::FloatVector | Self::BinaryVector)
    }

    /// Returns true for string types.
    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String | Self::VarChar)
    }

    /// Validates the dimension of a vector type.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimension is zero, or not a multiple of 8 for
    /// binary vectors.
    pub fn check_dim(self, dim: usize) -> CodecResult<()> {
        let valid = match self {
            Self::FloatVector => dim > 0,
            Self::BinaryVector => dim > 0 && dim % 8 == 0,
            _ => true,
        };
        if valid {
            Ok(())
        } else {
            Err(CodecError::InvalidDimension {
                dim,
                type_name: self.to_string(),
            })
        }
    }
}

impl TryFrom<i32> for DataType {
    type Error = CodecError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => Self::None,
            1 => Self::Bool,
            2 => Self::Int8,
            3 => Self::Int16,
            4 => Self::Int32,
            5 => Self::Int64,
            10 => Self::Float,
            11 => Self::Double,
            20 => Self::String,
            21 => Self::VarChar,
            100 => Self::BinaryVector,
            101 => Self::FloatVector,
            other => return Err(CodecError::unsupported_type(format!("code {other}"))),
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Bool => "Bool",
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::VarChar => "VarChar",
            Self::BinaryVector => "BinaryVector",
            Self::FloatVector => "FloatVector",
        };
        f.write_str(name)
    }
}
