//! Process-wide byte order for fixed-width values.

use crate::error::{CodecError, CodecResult};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

/// Byte order used for every fixed-width value in binlogs and row blobs.
///
/// A deployment picks one order and uses it everywhere; mixing orders
/// between writer and reader produces garbage, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

fn need(bytes: &[u8], n: usize) -> CodecResult<()> {
    if bytes.len() < n {
        Err(CodecError::truncated(n, bytes.len()))
    } else {
        Ok(())
    }
}

impl Endian {
    /// Reads a `u16` from the front of `bytes`.
    pub fn read_u16(self, mut bytes: &[u8]) -> CodecResult<u16> {
        need(bytes, 2)?;
        Ok(match self {
            Self::Little => bytes.get_u16_le(),
            Self::Big => bytes.get_u16(),
        })
    }

    /// Reads a `u32` from the front of `bytes`.
    pub fn read_u32(self, mut bytes: &[u8]) -> CodecResult<u32> {
        need(bytes, 4)?;
        Ok(match self {
            Self::Little => bytes.get_u32_le(),
            Self::Big => bytes.get_u32(),
        })
    }

    /// Reads a `u64` from the front of `bytes`.
    pub fn read_u64(self, mut bytes: &[u8]) -> CodecResult<u64> {
        need(bytes, 8)?;
        Ok(match self {
            Self::Little => bytes.get_u64_le(),
            Self::Big => bytes.get_u64(),
        })
    }

    /// Reads an `i16` from the front of `bytes`.
    pub fn read_i16(self, bytes: &[u8]) -> CodecResult<i16> {
        self.read_u16(bytes).map(|v| v as i16)
    }

    /// Reads an `i32` from the front of `bytes`.
    pub fn read_i32(self, bytes: &[u8]) -> CodecResult<i32> {
        self.read_u32(bytes).map(|v| v as i32)
    }

    /// Reads an `i64` from the front of `bytes`.
    pub fn read_i64(self, bytes: &[u8]) -> CodecResult<i64> {
        self.read_u64(bytes).map(|v| v as i64)
    }

    /// Reads an `f32` from the front of `bytes`.
    pub fn read_f32(self, bytes: &[u8]) -> CodecResult<f32> {
        self.read_u32(bytes).map(f32::from_bits)
    }

    /// Reads an `f64` from the front of `bytes`.
    pub fn read_f64(self, bytes: &[u8]) -> CodecResult<f64> {
        self.read_u64(bytes).map(f64::from_bits)
    }

    /// Decodes a packed array of `f32`. The input length must be a multiple of 4.
    pub fn read_f32_slice(self, bytes: &[u8]) -> CodecResult<Vec<f32>> {
        if bytes.len() % 4 != 0 {
            return Err(CodecError::truncated(bytes.len().next_multiple_of(4), bytes.len()));
        }
        bytes.chunks_exact(4).map(|c| self.read_f32(c)).collect()
    }

    /// Appends a `u16`.
    pub fn put_u16(self, buf: &mut impl BufMut, v: u16) {
        match self {
            Self::Little => buf.put_u16_le(v),
            Self::Big => buf.put_u16(v),
        }
    }

    /// Appends a `u32`.
    pub fn put_u32(self, buf: &mut impl BufMut, v: u32) {
        match self {
            Self::Little => buf.put_u32_le(v),
            Self::Big => buf.put_u32(v),
        }
    }

    /// Appends a `u64`.
    pub fn put_u64(self, buf: &mut impl BufMut, v: u64) {
        match self {
            Self::Little => buf.put_u64_le(v),
            Self::Big => buf.put_u64(v),
        }
    }

    /// Appends an `f32`.
    pub fn put_f32(self, buf: &mut impl BufMut, v: f32) {
        self.put_u32(buf, v.to_bits());
    }

    /// Appends an `f64`.
    pub fn put_f64(self, buf: &mut impl BufMut, v: f64) {
        self.put_u64(buf, v.to_bits());
    }
}

/// Decodes a boolean byte, rejecting anything other than 0 or 1.
pub fn decode_bool(byte: u8) -> CodecResult<bool> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::InvalidBool(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_and_big_differ() {
        let mut le = Vec::new();
        let mut be = Vec::new();
        Endian::Little.put_u32(&mut le, 1);
        Endian::Big.put_u32(&mut be, 1);
        assert_eq!(le, [1, 0, 0, 0]);
        assert_eq!(be, [0, 0, 0, 1]);
        assert_eq!(Endian::Little.read_u32(&le).unwrap(), 1);
        assert_eq!(Endian::Big.read_u32(&be).unwrap(), 1);
    }

    #[test]
    fn short_input_is_truncated() {
        assert_eq!(
            Endian::Little.read_u64(&[1, 2, 3]),
            Err(CodecError::truncated(8, 3))
        );
        assert!(Endian::Little.read_f32_slice(&[0; 6]).is_err());
    }

    #[test]
    fn floats_roundtrip_through_bits() {
        let mut buf = Vec::new();
        Endian::Big.put_f64(&mut buf, -2.5);
        assert_eq!(Endian::Big.read_f64(&buf).unwrap(), -2.5);
    }

    #[test]
    fn bool_bytes() {
        assert!(!decode_bool(0).unwrap());
        assert!(decode_bool(1).unwrap());
        assert_eq!(decode_bool(7), Err(CodecError::InvalidBool(7)));
    }
}
