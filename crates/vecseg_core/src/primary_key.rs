//! Primary keys.
//!
//! A primary key is either an `int64` or a string. Deletes and bloom-filter
//! lookups match rows by primary key.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use vecseg_codec::{DataType, Endian, FieldValues};

/// Unique row identifier used for delete matching.
///
/// Ordering is total within a variant; every `Int64` key sorts before every
/// `VarChar` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimaryKey {
    /// Integer key.
    Int64(i64),
    /// String key.
    VarChar(String),
}

impl PrimaryKey {
    /// The field type this key belongs to.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int64(_) => DataType::Int64,
            Self::VarChar(_) => DataType::VarChar,
        }
    }

    /// Canonical byte encoding fed to the bloom filter: 8 bytes in the
    /// configured order for integers, raw UTF-8 for strings.
    #[must_use]
    pub fn to_bytes(&self, endian: Endian) -> Vec<u8> {
        match self {
            Self::Int64(v) => {
                let mut buf = Vec::with_capacity(8);
                endian.put_u64(&mut buf, *v as u64);
                buf
            }
            Self::VarChar(s) => s.as_bytes().to_vec(),
        }
    }

    /// Reads the key at `row` of a primary-key column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is not int64/varchar or the row is out
    /// of range.
    pub fn from_column(values: &FieldValues, row: usize) -> CoreResult<Self> {
        let out_of_range = || CoreError::invalid_argument(format!("primary key row {row} out of range"));
        match values {
            FieldValues::Int64(v) => v.get(row).map(|&k| Self::Int64(k)).ok_or_else(out_of_range),
            FieldValues::VarChar(v) => v
                .get(row)
                .map(|k| Self::VarChar(k.clone()))
                .ok_or_else(out_of_range),
            other => Err(CoreError::invalid_argument(format!(
                "{} column cannot hold primary keys",
                other.data_type()
            ))),
        }
    }

    /// Reads every key of a primary-key column.
    ///
    /// # Errors
    ///
    /// Same as [`PrimaryKey::from_column`].
    pub fn all_from_column(values: &FieldValues) -> CoreResult<Vec<Self>> {
        (0..values.len()).map(|row| Self::from_column(values, row)).collect()
    }
}

impl From<i64> for PrimaryKey {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<&str> for PrimaryKey {
    fn from(v: &str) -> Self {
        Self::VarChar(v.to_owned())
    }
}

impl From<String> for PrimaryKey {
    fn from(v: String) -> Self {
        Self::VarChar(v)
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int64(v) => write!(f, "{v}"),
            Self::VarChar(s) => write!(f, "{s:?}"),
        }
    }
}
