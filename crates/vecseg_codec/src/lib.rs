//! # vecseg Codec
//!
//! Typed column encoding and decoding for vecseg segments.
//!
//! This crate owns every byte layout the segment engine reads or writes
//! for field data:
//! - [`DataType`] - the closed set of field types
//! - [`Endian`] - the process-wide byte order for fixed-width values
//! - [`FieldValues`] / [`FieldData`] - typed column arrays
//! - [`encode_column`] / [`decode_column`] - flat binlog layout
//! - [`RowLayout`] - row-oriented insert blobs
//!
//! ## Usage
//!
//! ```
//! use vecseg_codec::{decode_column, encode_column, DataType, Endian, FieldValues};
//!
//! let column = FieldValues::Int64(vec![1, 2, 3]);
//! let bytes = encode_column(&column, Endian::Little);
//! assert_eq!(bytes.len(), 24);
//!
//! let decoded = decode_column(DataType::Int64, 0, &bytes, Endian::Little).unwrap();
//! assert_eq!(decoded, column);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod column;
mod endian;
mod error;
mod field;
mod row;
mod types;

pub use column::{decode_column, decode_strings, encode_column, encode_strings, string_at};
pub use endian::{decode_bool, Endian};
pub use error::{CodecError, CodecResult};
pub use field::{FieldData, FieldId, FieldValues};
pub use row::{RowField, RowLayout};
pub use types::DataType;
