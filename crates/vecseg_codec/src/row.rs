//! Row-oriented insert blobs.
//!
//! An insert batch arrives as one blob per row. Each blob concatenates the
//! row's value for every field of the layout, in layout order, using the
//! same element encodings as [`crate::column`]. String values are framed
//! with a `u32` length prefix. A blob must be consumed exactly; leftover
//! bytes are an error.

use crate::column::{decode_column, encode_column};
use crate::endian::Endian;
use crate::error::{CodecError, CodecResult};
use crate::field::{FieldId, FieldValues};
use crate::types::DataType;

/// One field's slot in a row blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowField {
    /// Field identifier.
    pub field_id: FieldId,
    /// Field type.
    pub data_type: DataType,
    /// Vector dimension, 0 for scalars.
    pub dim: usize,
}

/// Ordered description of the fields packed into each row blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowLayout {
    fields: Vec<RowField>,
}

impl RowLayout {
    /// Creates a layout from ordered fields.
    ///
    /// # Errors
    ///
    /// Returns an error if a field type is `None` or a vector dimension is
    /// invalid.
    pub fn new(fields: Vec<RowField>) -> CodecResult<Self> {
        for f in &fields {
            if f.data_type == DataType::None {
                return Err(CodecError::unsupported_type(DataType::None.to_string()));
            }
            f.data_type.check_dim(f.dim)?;
        }
        Ok(Self { fields })
    }

    /// The fields, in blob order.
    #[must_use]
    pub fn fields(&self) -> &[RowField] {
        &self.fields
    }

    /// Decodes a batch of row blobs into one column per layout field.
    ///
    /// # Errors
    ///
    /// Returns an error if any blob is truncated, has trailing bytes, or holds
    /// an illegal value.
    pub fn decode_rows<B: AsRef<[u8]>>(
        &self,
        blobs: &[B],
        endian: Endian,
    ) -> CodecResult<Vec<FieldValues>> {
        let mut columns = self
            .fields
            .iter()
            .map(|f| FieldValues::with_rows(f.data_type, f.dim, 0))
            .collect::<CodecResult<Vec<_>>>()?;

        for blob in blobs {
            let blob = blob.as_ref();
            let mut pos = 0usize;
            for (field, column) in self.fields.iter().zip(columns.iter_mut()) {
                let width = match field.data_type.row_size(field.dim) {
                    Some(w) => w,
                    None => {
                        let len = endian.read_u32(&blob[pos.min(blob.len())..])? as usize;
                        4 + len
                    }
                };
                let end = pos + width;
                if end > blob.len() {
                    return Err(CodecError::truncated(end, blob.len()));
                }
                let cell = decode_column(field.data_type, field.dim, &blob[pos..end], endian)?;
                column.extend_from(&cell)?;
                pos = end;
            }
            if pos != blob.len() {
                return Err(CodecError::LengthMismatch {
                    expected: pos,
                    actual: blob.len(),
                });
            }
        }
        Ok(columns)
    }

    /// Encodes row `row` of the given columns as one blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the column count does not match the layout or a
    /// column is shorter than `row + 1`.
    pub fn encode_row(
        &self,
        columns: &[FieldValues],
        row: usize,
        endian: Endian,
    ) -> CodecResult<Vec<u8>> {
        if columns.len() != self.fields.len() {
            return Err(CodecError::LengthMismatch {
                expected: self.fields.len(),
                actual: columns.len(),
            });
        }
        let mut blob = Vec::new();
        for column in columns {
            let cell = column.gather(&[row])?;
            blob.extend_from_slice(&encode_column(&cell, endian));
        }
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> RowLayout {
        RowLayout::new(vec![
            RowField {
                field_id: 100,
                data_type: DataType::FloatVector,
                dim: 4,
            },
            RowField {
                field_id: 101,
                data_type: DataType::Int32,
                dim: 0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn decode_vector_then_tag() {
        let mut blob = Vec::new();
        for x in [1.0f32, 2.0, 3.0, 4.0] {
            Endian::Little.put_f32(&mut blob, x);
        }
        Endian::Little.put_u32(&mut blob, 7);

        let columns = layout().decode_rows(&[blob.clone(), blob], Endian::Little).unwrap();
        assert_eq!(columns[1], FieldValues::Int32(vec![7, 7]));
        assert_eq!(columns[0].float_vector(1), Some(&[1.0, 2.0, 3.0, 4.0][..]));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let blob = vec![0u8; 16 + 4 + 1];
        assert!(matches!(
            layout().decode_rows(&[blob], Endian::Little),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn short_blob_rejected() {
        let blob = vec![0u8; 10];
        assert!(matches!(
            layout().decode_rows(&[blob], Endian::Little),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn varchar_cells_are_framed() {
        let layout = RowLayout::new(vec![
            RowField {
                field_id: 102,
                data_type: DataType::VarChar,
                dim: 0,
            },
            RowField {
                field_id: 103,
                data_type: DataType::Bool,
                dim: 0,
            },
        ])
        .unwrap();
        let columns = vec![
            FieldValues::VarChar(vec!["ab".into(), "xyz".into()]),
            FieldValues::Bool(vec![true, false]),
        ];
        let blobs: Vec<Vec<u8>> = (0..2)
            .map(|r| layout.encode_row(&columns, r, Endian::Big).unwrap())
            .collect();
        assert_eq!(layout.decode_rows(&blobs, Endian::Big).unwrap(), columns);
    }

    #[test]
    fn none_field_rejected() {
        let result = RowLayout::new(vec![RowField {
            field_id: 1,
            data_type: DataType::None,
            dim: 0,
        }]);
        assert!(result.is_err());
    }
}
