//! Flat binlog encoding of whole columns.
//!
//! ## Layout
//!
//! Fixed-width columns are packed back to back with no per-row framing, so
//! row `i` of a column of element width `w` lives at byte `i * w`:
//!
//! ```text
//! bool        | 1 byte, 0 or 1 |
//! int8..int64 | 1/2/4/8 bytes  |
//! float       | 4 bytes        |
//! double      | 8 bytes        |
//! float vec   | dim * 4 bytes  |
//! binary vec  | dim / 8 bytes  |
//! ```
//!
//! String columns cannot be addressed by stride; each row is framed with its
//! length:
//!
//! ```text
//! | len: u32 | utf-8 bytes (len) | len: u32 | utf-8 bytes | ...
//! ```

use crate::endian::{decode_bool, Endian};
use crate::error::{CodecError, CodecResult};
use crate::field::FieldValues;
use crate::types::DataType;
use bytes::BufMut;

/// Encodes a whole column in the flat binlog layout.
pub fn encode_column(values: &FieldValues, endian: Endian) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.heap_size());
    match values {
        FieldValues::Bool(v) => buf.extend(v.iter().map(|&b| u8::from(b))),
        FieldValues::Int8(v) => buf.extend(v.iter().map(|&x| x as u8)),
        FieldValues::Int16(v) => v.iter().for_each(|&x| endian.put_u16(&mut buf, x as u16)),
        FieldValues::Int32(v) => v.iter().for_each(|&x| endian.put_u32(&mut buf, x as u32)),
        FieldValues::Int64(v) => v.iter().for_each(|&x| endian.put_u64(&mut buf, x as u64)),
        FieldValues::Float(v) => v.iter().for_each(|&x| endian.put_f32(&mut buf, x)),
        FieldValues::Double(v) => v.iter().for_each(|&x| endian.put_f64(&mut buf, x)),
        FieldValues::VarChar(v) => return encode_strings(v, endian),
        FieldValues::FloatVector { data, .. } => {
            data.iter().for_each(|&x| endian.put_f32(&mut buf, x));
        }
        FieldValues::BinaryVector { data, .. } => buf.put_slice(data),
    }
    buf
}

/// Decodes a whole column from the flat binlog layout.
///
/// # Errors
///
/// Returns an error if the byte length does not divide into whole rows, a
/// boolean byte is illegal, a string is malformed, or the type is `None`.
pub fn decode_column(
    data_type: DataType,
    dim: usize,
    bytes: &[u8],
    endian: Endian,
) -> CodecResult<FieldValues> {
    data_type.check_dim(dim)?;
    if data_type.is_string() {
        return decode_strings(bytes, endian).map(FieldValues::VarChar);
    }

    let row_size = data_type
        .row_size(dim)
        .ok_or_else(|| CodecError::unsupported_type(data_type.to_string()))?;
    if bytes.len() % row_size != 0 {
        return Err(CodecError::truncated(
            bytes.len().next_multiple_of(row_size),
            bytes.len(),
        ));
    }
    let rows = bytes.chunks_exact(row_size);

    Ok(match data_type {
        DataType::Bool => FieldValues::Bool(
            bytes
                .iter()
                .map(|&b| decode_bool(b))
                .collect::<CodecResult<_>>()?,
        ),
        DataType::Int8 => FieldValues::Int8(bytes.iter().map(|&b| b as i8).collect()),
        DataType::Int16 => {
            FieldValues::Int16(rows.map(|r| endian.read_i16(r)).collect::<CodecResult<_>>()?)
        }
        DataType::Int32 => {
            FieldValues::Int32(rows.map(|r| endian.read_i32(r)).collect::<CodecResult<_>>()?)
        }
        DataType::Int64 => {
            FieldValues::Int64(rows.map(|r| endian.read_i64(r)).collect::<CodecResult<_>>()?)
        }
        DataType::Float => {
            FieldValues::Float(rows.map(|r| endian.read_f32(r)).collect::<CodecResult<_>>()?)
        }
        DataType::Double => {
            FieldValues::Double(rows.map(|r| endian.read_f64(r)).collect::<CodecResult<_>>()?)
        }
        DataType::FloatVector => FieldValues::FloatVector {
            dim,
            data: endian.read_f32_slice(bytes)?,
        },
        DataType::BinaryVector => FieldValues::BinaryVector {
            dim,
            data: bytes.to_vec(),
        },
        other => return Err(CodecError::unsupported_type(other.to_string())),
    })
}

/// Encodes strings in the length-framed layout.
pub fn encode_strings(values: &[String], endian: Endian) -> Vec<u8> {
    let total: usize = values.iter().map(|s| 4 + s.len()).sum();
    let mut buf = Vec::with_capacity(total);
    for s in values {
        endian.put_u32(&mut buf, s.len() as u32);
        buf.put_slice(s.as_bytes());
    }
    buf
}

/// Decodes every string of a length-framed blob.
///
/// # Errors
///
/// Returns an error on a truncated frame or invalid UTF-8.
pub fn decode_strings(bytes: &[u8], endian: Endian) -> CodecResult<Vec<String>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let (s, next) = read_frame(bytes, pos, endian)?;
        out.push(s.to_owned());
        pos = next;
    }
    Ok(out)
}

/// Returns string row `row` of a length-framed blob by scanning the frames.
///
/// # Errors
///
/// Returns an error if the blob ends before row `row`, a frame is truncated,
/// or the row is not valid UTF-8.
pub fn string_at(bytes: &[u8], row: usize, endian: Endian) -> CodecResult<String> {
    let mut pos = 0usize;
    for current in 0..=row {
        if pos >= bytes.len() {
            return Err(CodecError::RowOutOfRange { row, len: current });
        }
        let (s, next) = read_frame(bytes, pos, endian)?;
        if current == row {
            return Ok(s.to_owned());
        }
        pos = next;
    }
    Err(CodecError::RowOutOfRange { row, len: row })
}

fn read_frame(bytes: &[u8], pos: usize, endian: Endian) -> CodecResult<(&str, usize)> {
    let len = endian.read_u32(&bytes[pos..])? as usize;
    let start = pos + 4;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| CodecError::truncated(len, bytes.len().saturating_sub(start)))?;
    let s = std::str::from_utf8(&bytes[start..end]).map_err(|_| CodecError::InvalidUtf8)?;
    Ok((s, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_column_layout() {
        let col = FieldValues::Int32(vec![1, -1]);
        let bytes = encode_column(&col, Endian::Little);
        assert_eq!(bytes, [1, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(decode_column(DataType::Int32, 0, &bytes, Endian::Little).unwrap(), col);
    }

    #[test]
    fn float_vector_column() {
        let col = FieldValues::FloatVector {
            dim: 2,
            data: vec![1.5, 2.5, 3.5, 4.5],
        };
        let bytes = encode_column(&col, Endian::Big);
        assert_eq!(bytes.len(), 16);
        assert_eq!(
            decode_column(DataType::FloatVector, 2, &bytes, Endian::Big).unwrap(),
            col
        );
    }

    #[test]
    fn ragged_fixed_width_rejected() {
        let err = decode_column(DataType::Int64, 0, &[0; 12], Endian::Little).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn illegal_bool_rejected() {
        let err = decode_column(DataType::Bool, 0, &[0, 1, 2], Endian::Little).unwrap_err();
        assert_eq!(err, CodecError::InvalidBool(2));
    }

    #[test]
    fn none_type_rejected() {
        assert!(matches!(
            decode_column(DataType::None, 0, &[], Endian::Little),
            Err(CodecError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn string_frames() {
        let values = vec!["alpha".to_string(), String::new(), "γάμμα".to_string()];
        let bytes = encode_strings(&values, Endian::Little);

        assert_eq!(decode_strings(&bytes, Endian::Little).unwrap(), values);
        assert_eq!(string_at(&bytes, 2, Endian::Little).unwrap(), "γάμμα");
        assert_eq!(string_at(&bytes, 1, Endian::Little).unwrap(), "");
        assert!(matches!(
            string_at(&bytes, 3, Endian::Little),
            Err(CodecError::RowOutOfRange { row: 3, .. })
        ));
    }

    #[test]
    fn truncated_string_frame() {
        let mut bytes = encode_strings(&["hello".to_string()], Endian::Little);
        bytes.truncate(6);
        assert!(matches!(
            decode_strings(&bytes, Endian::Little),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn invalid_utf8_frame() {
        let mut bytes = Vec::new();
        Endian::Little.put_u32(&mut bytes, 2);
        bytes.extend_from_slice(&[0xc3, 0x28]);
        assert_eq!(
            string_at(&bytes, 0, Endian::Little),
            Err(CodecError::InvalidUtf8)
        );
    }
}
