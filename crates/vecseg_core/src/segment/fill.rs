//! Materializing index-backed fields from binlogs.
//!
//! A retrieve on a sealed segment returns placeholders for fields whose raw
//! data lives only in binlogs, whether or not an index serves them. Each placeholder row is filled by
//! locating the binlog that holds its offset and reading just that value:
//! fixed-width types and vectors with one ranged read at
//! `header + offset * width`, strings by reading the whole binlog and walking
//! its length-framed rows.

use super::{Segment, SegmentStorage};
use crate::config::SegmentConfig;
use crate::error::{CoreError, CoreResult};
use crate::index::IndexedFieldInfo;
use crate::plan::RetrieveResult;
use tracing::{debug, warn};
use vecseg_codec::{decode_bool, string_at, CodecError, DataType, Endian, FieldData, FieldId, FieldValues};
use vecseg_storage::ChunkManager;

/// Layout parameters shared by every binlog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinlogFormat {
    /// Bytes before the first row.
    pub header_size: u64,
    /// Byte order of fixed-width values.
    pub endian: Endian,
}

impl BinlogFormat {
    /// Creates a format.
    #[must_use]
    pub const fn new(header_size: u64, endian: Endian) -> Self {
        Self { header_size, endian }
    }

    /// The format a segment configuration prescribes.
    #[must_use]
    pub const fn from_config(config: &SegmentConfig) -> Self {
        Self::new(config.binlog_header_size, config.endian)
    }
}

impl Segment {
    /// Fills placeholder columns from their binlogs.
    ///
    /// Every output field whose raw data is not resident but whose info is
    /// registered is read back, whether or not an index is enabled for it.
    /// Resident fields are left as they are. Growing segments have nothing to
    /// fill.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, `IndexNotReady` if no chunk
    /// manager is given or no binlogs are registered for a placeholder field,
    /// `InvalidArgument` if the binlog row sizes do not cover the segment, or
    /// the first storage or decode error. A failed call may leave `result`
    /// partially filled and must not be used.
    pub fn fill_indexed_fields_data(
        &self,
        chunk_manager: Option<&dyn ChunkManager>,
        result: &mut RetrieveResult,
    ) -> CoreResult<()> {
        let pending: Vec<(usize, IndexedFieldInfo)> = {
            let storage = self.storage()?;
            let SegmentStorage::Sealed(sealed) = &*storage else {
                return Ok(());
            };
            let infos = self.indexed_fields.read();
            result
                .fields_data
                .iter()
                .enumerate()
                .filter(|(_, field)| !sealed.has_column(field.field_id))
                .filter_map(|(i, field)| infos.get(&field.field_id).map(|info| (i, info.clone())))
                .collect()
        };
        if pending.is_empty() {
            return Ok(());
        }

        let format = BinlogFormat::from_config(&self.config);
        let RetrieveResult {
            offsets, fields_data, ..
        } = result;
        for (i, info) in pending {
            let field = &mut fields_data[i];
            let chunk_manager = chunk_manager.ok_or_else(|| {
                CoreError::index_not_ready(field.field_id, "no chunk manager to read binlogs")
            })?;
            if info.binlogs().is_empty() {
                warn!(
                    segment_id = self.meta.segment_id,
                    field_id = field.field_id,
                    "placeholder field has no binlogs registered"
                );
                return Err(CoreError::index_not_ready(field.field_id, "no binlogs registered"));
            }
            for (row, &offset) in offsets.iter().enumerate() {
                let (path, offset_in_binlog) = self.get_field_data_path(&info, offset)?;
                fill_field_data(chunk_manager, &path, field, row, offset_in_binlog, format)?;
            }
            debug!(
                segment_id = self.meta.segment_id,
                field_id = field.field_id,
                rows = offsets.len(),
                "filled indexed field"
            );
        }
        Ok(())
    }

    /// Resolves a segment offset to a binlog path and the row within it.
    ///
    /// Walks the segment's binlog row-size table, which runs parallel to
    /// `info`'s binlog list. The sizes must be non-negative and sum to the
    /// segment's row count.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed size table or offsets outside
    /// it, or `IndexNotReady` if the binlog list is shorter than the table.
    pub fn get_field_data_path(&self, info: &IndexedFieldInfo, offset: i64) -> CoreResult<(String, i64)> {
        let field_id = info
            .field_binlog
            .as_ref()
            .map(|b| b.field_id)
            .or_else(|| info.index_info.as_ref().map(|i| i.field_id))
            .unwrap_or_default();
        let row_count = self.row_count();
        let sizes = self.id_binlog_row_sizes.read();
        check_row_sizes(&sizes, row_count)?;
        if offset < 0 {
            return Err(CoreError::invalid_argument(format!("negative offset {offset}")));
        }
        let mut start = 0i64;
        for (i, &size) in sizes.iter().enumerate() {
            if offset < start + size {
                let binlog = info.binlogs().get(i).ok_or_else(|| {
                    CoreError::index_not_ready(field_id, format!("binlog {i} is not registered"))
                })?;
                return Ok((binlog.log_path.clone(), offset - start));
            }
            start += size;
        }
        Err(CoreError::invalid_argument(format!(
            "offset {offset} beyond {start} rows in binlogs"
        )))
    }
}

fn check_row_sizes(sizes: &[i64], row_count: usize) -> CoreResult<()> {
    if let Some(size) = sizes.iter().find(|&&s| s < 0) {
        return Err(CoreError::invalid_argument(format!("negative binlog row size {size}")));
    }
    let total = sizes.iter().try_fold(0i64, |acc, &s| acc.checked_add(s));
    match total.and_then(|t| usize::try_from(t).ok()) {
        Some(total) if total == row_count => {}
        _ => {
            return Err(CoreError::invalid_argument(format!(
                "binlog row sizes {sizes:?} do not cover the segment's {row_count} rows"
            )))
        }
    }
    Ok(())
}

/// Fills row `index` of `field` with the value at `offset` of binlog `path`.
///
/// # Errors
///
/// Returns `UnsupportedFieldType` for `DataType::None`, otherwise the errors
/// of the per-type fill function.
pub fn fill_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    match field.data_type {
        DataType::Bool => fill_bool_field_data(chunk_manager, path, field, index, offset, format),
        DataType::Int8 => fill_int8_field_data(chunk_manager, path, field, index, offset, format),
        DataType::Int16 => fill_int16_field_data(chunk_manager, path, field, index, offset, format),
        DataType::Int32 => fill_int32_field_data(chunk_manager, path, field, index, offset, format),
        DataType::Int64 => fill_int64_field_data(chunk_manager, path, field, index, offset, format),
        DataType::Float => fill_float_field_data(chunk_manager, path, field, index, offset, format),
        DataType::Double => fill_double_field_data(chunk_manager, path, field, index, offset, format),
        DataType::String | DataType::VarChar => {
            fill_string_field_data(chunk_manager, path, field, index, offset, format)
        }
        DataType::FloatVector => {
            fill_float_vector_field_data(chunk_manager, path, field, index, offset, format)
        }
        DataType::BinaryVector => {
            fill_binary_vector_field_data(chunk_manager, path, field, index, offset, format)
        }
        DataType::None => Err(CoreError::UnsupportedFieldType {
            data_type: field.data_type,
        }),
    }
}

fn type_mismatch(field_id: FieldId, expected: DataType, actual: DataType) -> CoreError {
    CoreError::invalid_argument(format!(
        "field {field_id} holds {actual} values, cannot fill {expected}"
    ))
}

fn row_out_of_range(field_id: FieldId, index: usize) -> CoreError {
    CoreError::invalid_argument(format!("row {index} out of range for field {field_id}"))
}

fn read_row(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    offset: i64,
    width: usize,
    format: BinlogFormat,
) -> CoreResult<Vec<u8>> {
    let offset = u64::try_from(offset)
        .map_err(|_| CoreError::invalid_argument(format!("negative binlog offset {offset}")))?;
    let position = format.header_size + offset * width as u64;
    let bytes = chunk_manager.read_at(path, position, width)?;
    if bytes.len() != width {
        return Err(CodecError::truncated(width, bytes.len()).into());
    }
    Ok(bytes)
}

#[allow(clippy::too_many_arguments)]
fn fill_fixed<T>(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
    expected: DataType,
    column: impl FnOnce(&mut FieldValues) -> Option<&mut Vec<T>>,
    decode: impl FnOnce(&[u8], Endian) -> Result<T, CodecError>,
) -> CoreResult<()> {
    let field_id = field.field_id;
    let width = expected.element_size().ok_or(CoreError::UnsupportedFieldType { data_type: expected })?;
    let actual = field.values.data_type();
    let slot = column(&mut field.values)
        .ok_or_else(|| type_mismatch(field_id, expected, actual))?
        .get_mut(index)
        .ok_or_else(|| row_out_of_range(field_id, index))?;
    let bytes = read_row(chunk_manager, path, offset, width, format)?;
    *slot = decode(&bytes, format.endian)?;
    Ok(())
}

/// Fills one bool. Bytes other than 0 and 1 are a decode error.
///
/// # Errors
///
/// Returns storage errors, decode errors, or `InvalidArgument` if `field`
/// is not a bool column or `index` is out of range.
pub fn fill_bool_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    fill_fixed(
        chunk_manager,
        path,
        field,
        index,
        offset,
        format,
        DataType::Bool,
        |v| match v {
            FieldValues::Bool(v) => Some(v),
            _ => None,
        },
        |b, _| decode_bool(b[0]),
    )
}

/// Fills one int8.
///
/// # Errors
///
/// See [`fill_bool_field_data`].
pub fn fill_int8_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    fill_fixed(
        chunk_manager,
        path,
        field,
        index,
        offset,
        format,
        DataType::Int8,
        |v| match v {
            FieldValues::Int8(v) => Some(v),
            _ => None,
        },
        |b, _| Ok(b[0] as i8),
    )
}

/// Fills one int16.
///
/// # Errors
///
/// See [`fill_bool_field_data`].
pub fn fill_int16_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    fill_fixed(
        chunk_manager,
        path,
        field,
        index,
        offset,
        format,
        DataType::Int16,
        |v| match v {
            FieldValues::Int16(v) => Some(v),
            _ => None,
        },
        |b, e| e.read_i16(b),
    )
}

/// Fills one int32.
///
/// # Errors
///
/// See [`fill_bool_field_data`].
pub fn fill_int32_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    fill_fixed(
        chunk_manager,
        path,
        field,
        index,
        offset,
        format,
        DataType::Int32,
        |v| match v {
            FieldValues::Int32(v) => Some(v),
            _ => None,
        },
        |b, e| e.read_i32(b),
    )
}

/// Fills one int64.
///
/// # Errors
///
/// See [`fill_bool_field_data`].
pub fn fill_int64_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    fill_fixed(
        chunk_manager,
        path,
        field,
        index,
        offset,
        format,
        DataType::Int64,
        |v| match v {
            FieldValues::Int64(v) => Some(v),
            _ => None,
        },
        |b, e| e.read_i64(b),
    )
}

/// Fills one float.
///
/// # Errors
///
/// See [`fill_bool_field_data`].
pub fn fill_float_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    fill_fixed(
        chunk_manager,
        path,
        field,
        index,
        offset,
        format,
        DataType::Float,
        |v| match v {
            FieldValues::Float(v) => Some(v),
            _ => None,
        },
        |b, e| e.read_f32(b),
    )
}

/// Fills one double.
///
/// # Errors
///
/// See [`fill_bool_field_data`].
pub fn fill_double_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    fill_fixed(
        chunk_manager,
        path,
        field,
        index,
        offset,
        format,
        DataType::Double,
        |v| match v {
            FieldValues::Double(v) => Some(v),
            _ => None,
        },
        |b, e| e.read_f64(b),
    )
}

/// Fills one string. Rows are length-framed, so the whole binlog is read
/// and scanned up to `offset`.
///
/// # Errors
///
/// Returns storage errors, decode errors for truncated frames or invalid
/// UTF-8, or `InvalidArgument` if `field` is not a string column or `index`
/// is out of range.
pub fn fill_string_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    let field_id = field.field_id;
    let actual = field.values.data_type();
    let FieldValues::VarChar(values) = &mut field.values else {
        return Err(type_mismatch(field_id, DataType::VarChar, actual));
    };
    let slot = values
        .get_mut(index)
        .ok_or_else(|| row_out_of_range(field_id, index))?;
    let row = usize::try_from(offset)
        .map_err(|_| CoreError::invalid_argument(format!("negative binlog offset {offset}")))?;
    let bytes = chunk_manager.read(path)?;
    let header = usize::try_from(format.header_size).unwrap_or(usize::MAX);
    let body = bytes
        .get(header..)
        .ok_or_else(|| CodecError::truncated(header, bytes.len()))?;
    *slot = string_at(body, row, format.endian)?;
    Ok(())
}

/// Fills one float vector of the column's dimension.
///
/// # Errors
///
/// Returns storage errors, a decode error for short reads, or
/// `InvalidArgument` if `field` is not a float vector column or `index` is
/// out of range.
pub fn fill_float_vector_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    let field_id = field.field_id;
    let actual = field.values.data_type();
    let FieldValues::FloatVector { dim, data } = &mut field.values else {
        return Err(type_mismatch(field_id, DataType::FloatVector, actual));
    };
    let dim = *dim;
    let slot = data
        .get_mut(index * dim..(index + 1) * dim)
        .ok_or_else(|| row_out_of_range(field_id, index))?;
    let bytes = read_row(chunk_manager, path, offset, dim * 4, format)?;
    slot.copy_from_slice(&format.endian.read_f32_slice(&bytes)?);
    Ok(())
}

/// Fills one binary vector of the column's dimension.
///
/// # Errors
///
/// Returns storage errors, a decode error for short reads, or
/// `InvalidArgument` if `field` is not a binary vector column or `index` is
/// out of range.
pub fn fill_binary_vector_field_data(
    chunk_manager: &dyn ChunkManager,
    path: &str,
    field: &mut FieldData,
    index: usize,
    offset: i64,
    format: BinlogFormat,
) -> CoreResult<()> {
    let field_id = field.field_id;
    let actual = field.values.data_type();
    let FieldValues::BinaryVector { dim, data } = &mut field.values else {
        return Err(type_mismatch(field_id, DataType::BinaryVector, actual));
    };
    let width = *dim / 8;
    let slot = data
        .get_mut(index * width..(index + 1) * width)
        .ok_or_else(|| row_out_of_range(field_id, index))?;
    let bytes = read_row(chunk_manager, path, offset, width, format)?;
    slot.copy_from_slice(&bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Binlog, FieldBinlog, FieldIndexInfo};
    use crate::schema::{Collection, CollectionSchema, FieldSchema};
    use crate::segment::SegmentMeta;
    use crate::types::SegmentType;
    use std::sync::Arc;
    use vecseg_codec::{encode_column, encode_strings};
    use vecseg_storage::{InMemoryChunkManager, StorageError, StorageResult};

    struct FailingChunkManager;

    impl ChunkManager for FailingChunkManager {
        fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::not_found(path))
        }
        fn read_at(&self, path: &str, _offset: u64, _len: usize) -> StorageResult<Vec<u8>> {
            Err(StorageError::not_found(path))
        }
        fn write(&self, path: &str, _data: &[u8]) -> StorageResult<()> {
            Err(StorageError::invalid_path(path))
        }
        fn exists(&self, _path: &str) -> StorageResult<bool> {
            Ok(false)
        }
        fn size(&self, path: &str) -> StorageResult<u64> {
            Err(StorageError::not_found(path))
        }
        fn remove(&self, _path: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    fn format() -> BinlogFormat {
        BinlogFormat::new(4, Endian::Little)
    }

    fn with_header(body: Vec<u8>) -> Vec<u8> {
        let mut bytes = vec![0xAB; 4];
        bytes.extend(body);
        bytes
    }

    fn field(data_type: DataType, dim: usize) -> FieldData {
        FieldData::new(7, "f", data_type, FieldValues::with_rows(data_type, dim, 2).unwrap())
    }

    #[test]
    fn fixed_width_types() {
        let cm = InMemoryChunkManager::with_objects([
            ("i32", with_header(encode_column(&FieldValues::Int32(vec![5, -6, 7]), Endian::Little))),
            ("f64", with_header(encode_column(&FieldValues::Double(vec![1.5, 2.5]), Endian::Little))),
            ("i8", with_header(vec![1, 2, 0xFF])),
        ]);
        let mut f = field(DataType::Int32, 0);
        fill_field_data(&cm, "i32", &mut f, 1, 2, format()).unwrap();
        fill_field_data(&cm, "i32", &mut f, 0, 1, format()).unwrap();
        assert_eq!(f.values, FieldValues::Int32(vec![-6, 7]));

        let mut f = field(DataType::Double, 0);
        fill_field_data(&cm, "f64", &mut f, 0, 1, format()).unwrap();
        assert_eq!(f.values, FieldValues::Double(vec![2.5, 0.0]));

        let mut f = field(DataType::Int8, 0);
        fill_field_data(&cm, "i8", &mut f, 1, 2, format()).unwrap();
        assert_eq!(f.values, FieldValues::Int8(vec![0, -1]));
    }

    #[test]
    fn big_endian_int64() {
        let body = encode_column(&FieldValues::Int64(vec![1, 1 << 40]), Endian::Big);
        let cm = InMemoryChunkManager::with_objects([("i64", body)]);
        let mut f = field(DataType::Int64, 0);
        fill_int64_field_data(&cm, "i64", &mut f, 0, 1, BinlogFormat::new(0, Endian::Big)).unwrap();
        assert_eq!(f.values, FieldValues::Int64(vec![1 << 40, 0]));
    }

    #[test]
    fn bool_rejects_illegal_byte() {
        let cm = InMemoryChunkManager::with_objects([("b", with_header(vec![1, 2]))]);
        let mut f = field(DataType::Bool, 0);
        fill_bool_field_data(&cm, "b", &mut f, 0, 0, format()).unwrap();
        assert_eq!(f.values, FieldValues::Bool(vec![true, false]));
        let err = fill_bool_field_data(&cm, "b", &mut f, 1, 1, format()).unwrap_err();
        assert!(matches!(err, CoreError::Decode(CodecError::InvalidBool(2))));
    }

    #[test]
    fn strings_scan_frames() {
        let body = encode_strings(&["x".into(), "hello".into(), "".into()], Endian::Little);
        let cm = InMemoryChunkManager::with_objects([("s", with_header(body))]);
        let mut f = field(DataType::VarChar, 0);
        fill_string_field_data(&cm, "s", &mut f, 0, 1, format()).unwrap();
        assert_eq!(f.values, FieldValues::VarChar(vec!["hello".into(), String::new()]));
        assert!(matches!(
            fill_string_field_data(&cm, "s", &mut f, 0, 5, format()),
            Err(CoreError::Decode(_))
        ));

        let cm = InMemoryChunkManager::with_objects([("bad", with_header(vec![9, 0, 0, 0, b'a']))]);
        assert!(matches!(
            fill_string_field_data(&cm, "bad", &mut f, 0, 0, format()),
            Err(CoreError::Decode(_))
        ));
    }

    #[test]
    fn vectors() {
        let floats = encode_column(
            &FieldValues::FloatVector {
                dim: 2,
                data: vec![1.0, 2.0, 3.0, 4.0],
            },
            Endian::Little,
        );
        let cm = InMemoryChunkManager::with_objects([
            ("fv", with_header(floats)),
            ("bv", with_header(vec![0xF0, 0x0F, 0xAA, 0x55])),
        ]);
        let mut f = field(DataType::FloatVector, 2);
        fill_float_vector_field_data(&cm, "fv", &mut f, 1, 1, format()).unwrap();
        assert_eq!(f.values.float_vector(1), Some(&[3.0, 4.0][..]));

        let mut f = field(DataType::BinaryVector, 16);
        fill_binary_vector_field_data(&cm, "bv", &mut f, 0, 1, format()).unwrap();
        assert_eq!(f.values.binary_vector(0), Some(&[0xAA, 0x55][..]));
    }

    #[test]
    fn storage_errors_surface() {
        let mut f = field(DataType::Int32, 0);
        assert!(matches!(
            fill_field_data(&FailingChunkManager, "x", &mut f, 0, 0, format()),
            Err(CoreError::Storage(_))
        ));
        let mut f = field(DataType::VarChar, 0);
        assert!(matches!(
            fill_field_data(&FailingChunkManager, "x", &mut f, 0, 0, format()),
            Err(CoreError::Storage(_))
        ));
    }

    #[test]
    fn none_type_is_unsupported() {
        let mut f = FieldData::new(7, "f", DataType::None, FieldValues::Bool(vec![false]));
        let cm = InMemoryChunkManager::new();
        assert!(matches!(
            fill_field_data(&cm, "x", &mut f, 0, 0, format()),
            Err(CoreError::UnsupportedFieldType { .. })
        ));
    }

    #[test]
    fn wrong_column_or_row() {
        let cm = InMemoryChunkManager::with_objects([("i32", vec![0; 8])]);
        let mut f = FieldData::new(7, "f", DataType::Int32, FieldValues::Int64(vec![0]));
        assert!(fill_field_data(&cm, "i32", &mut f, 0, 0, BinlogFormat::default()).is_err());
        let mut f = field(DataType::Int32, 0);
        assert!(fill_field_data(&cm, "i32", &mut f, 5, 0, BinlogFormat::default()).is_err());
    }

    fn sealed_segment(rows: i64) -> Segment {
        let schema = CollectionSchema::new(
            "c",
            false,
            vec![
                FieldSchema::scalar(100, "pk", DataType::Int64).primary(),
                FieldSchema::scalar(101, "score", DataType::Int32),
            ],
        )
        .unwrap();
        let seg = Segment::new(
            Arc::new(Collection::new(1, schema)),
            SegmentMeta::new(9, 1, 1, "c"),
            SegmentType::Sealed,
            SegmentConfig::default(),
        )
        .unwrap();
        seg.load_field_data(100, rows, FieldValues::Int64((0..rows).collect()))
            .unwrap();
        seg
    }

    fn enabled_info(binlogs: Vec<Binlog>) -> IndexedFieldInfo {
        IndexedFieldInfo::new(
            FieldBinlog { field_id: 101, binlogs },
            FieldIndexInfo {
                field_id: 101,
                enable_index: true,
                ..FieldIndexInfo::default()
            },
        )
    }

    fn binlog_only_info(binlogs: Vec<Binlog>) -> IndexedFieldInfo {
        IndexedFieldInfo {
            field_binlog: Some(FieldBinlog { field_id: 101, binlogs }),
            index_info: None,
        }
    }

    fn score_binlogs() -> InMemoryChunkManager {
        InMemoryChunkManager::with_objects([
            ("s/0", encode_column(&FieldValues::Int32(vec![10, 11]), Endian::Little)),
            ("s/1", encode_column(&FieldValues::Int32(vec![12, 13]), Endian::Little)),
        ])
    }

    #[test]
    fn field_data_path_walks_row_sizes() {
        let seg = sealed_segment(25);
        seg.set_id_binlog_row_sizes(vec![10, 15]);
        let info = enabled_info(vec![Binlog::new("binlog0", 10), Binlog::new("binlog1", 15)]);
        assert_eq!(seg.get_field_data_path(&info, 4).unwrap(), ("binlog0".to_string(), 4));
        assert_eq!(seg.get_field_data_path(&info, 11).unwrap(), ("binlog1".to_string(), 1));
        assert_eq!(seg.get_field_data_path(&info, 10).unwrap(), ("binlog1".to_string(), 0));
        assert!(seg.get_field_data_path(&info, 25).is_err());
        assert!(seg.get_field_data_path(&info, -1).is_err());

        let short = enabled_info(vec![Binlog::new("binlog0", 10)]);
        assert!(matches!(
            seg.get_field_data_path(&short, 11),
            Err(CoreError::IndexNotReady { .. })
        ));
    }

    #[test]
    fn row_sizes_must_cover_the_segment() {
        let seg = sealed_segment(4);
        let info = enabled_info(vec![Binlog::new("s/0", 2), Binlog::new("s/1", 2)]);

        seg.set_id_binlog_row_sizes(vec![2, 3]);
        assert!(matches!(
            seg.get_field_data_path(&info, 0),
            Err(CoreError::InvalidArgument { .. })
        ));
        seg.set_id_binlog_row_sizes(vec![6, -2]);
        assert!(matches!(
            seg.get_field_data_path(&info, 0),
            Err(CoreError::InvalidArgument { .. })
        ));
        seg.set_id_binlog_row_sizes(vec![i64::MAX, i64::MAX]);
        assert!(seg.get_field_data_path(&info, 0).is_err());

        seg.set_id_binlog_row_sizes(vec![2, 2]);
        assert_eq!(seg.get_field_data_path(&info, 3).unwrap(), ("s/1".to_string(), 1));
    }

    fn placeholder_result() -> RetrieveResult {
        RetrieveResult {
            ids: Vec::new(),
            offsets: vec![1, 3],
            fields_data: vec![FieldData::new(101, "score", DataType::Int32, FieldValues::Int32(vec![0, 0]))],
        }
    }

    #[test]
    fn fill_indexed_fields() {
        let seg = sealed_segment(4);
        seg.set_id_binlog_row_sizes(vec![2, 2]);
        seg.set_indexed_field_info(
            101,
            enabled_info(vec![Binlog::new("s/0", 2), Binlog::new("s/1", 2)]),
        );
        let mut result = placeholder_result();
        seg.fill_indexed_fields_data(Some(&score_binlogs()), &mut result).unwrap();
        assert_eq!(result.fields_data[0].values, FieldValues::Int32(vec![11, 13]));
    }

    #[test]
    fn fill_rejects_mismatched_row_sizes() {
        let seg = sealed_segment(0);
        seg.set_id_binlog_row_sizes(vec![2, 2]);
        seg.set_indexed_field_info(
            101,
            enabled_info(vec![Binlog::new("s/0", 2), Binlog::new("s/1", 2)]),
        );
        assert!(matches!(
            seg.fill_indexed_fields_data(Some(&score_binlogs()), &mut placeholder_result()),
            Err(CoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn fill_requires_chunk_manager_and_binlogs() {
        let seg = sealed_segment(4);
        seg.set_id_binlog_row_sizes(vec![4]);
        seg.set_indexed_field_info(101, enabled_info(vec![Binlog::new("s/0", 4)]));
        let mut result = placeholder_result();
        assert!(matches!(
            seg.fill_indexed_fields_data(None, &mut result),
            Err(CoreError::IndexNotReady { field_id: 101, .. })
        ));

        seg.set_indexed_field_info(101, enabled_info(Vec::new()));
        let cm = InMemoryChunkManager::new();
        assert!(matches!(
            seg.fill_indexed_fields_data(Some(&cm), &mut result),
            Err(CoreError::IndexNotReady { .. })
        ));
    }

    #[test]
    fn fill_reads_fields_without_an_enabled_index() {
        let seg = sealed_segment(4);
        seg.set_id_binlog_row_sizes(vec![2, 2]);
        let binlogs = vec![Binlog::new("s/0", 2), Binlog::new("s/1", 2)];

        seg.set_indexed_field_info(101, binlog_only_info(binlogs.clone()));
        let mut result = placeholder_result();
        seg.fill_indexed_fields_data(Some(&score_binlogs()), &mut result).unwrap();
        assert_eq!(result.fields_data[0].values, FieldValues::Int32(vec![11, 13]));

        let mut disabled = enabled_info(binlogs);
        if let Some(index_info) = disabled.index_info.as_mut() {
            index_info.enable_index = false;
        }
        seg.set_indexed_field_info(101, disabled);
        let mut result = placeholder_result();
        seg.fill_indexed_fields_data(Some(&score_binlogs()), &mut result).unwrap();
        assert_eq!(result.fields_data[0].values, FieldValues::Int32(vec![11, 13]));
        assert!(matches!(
            seg.fill_indexed_fields_data(None, &mut placeholder_result()),
            Err(CoreError::IndexNotReady { field_id: 101, .. })
        ));
    }

    #[test]
    fn fill_skips_resident_fields() {
        let seg = sealed_segment(4);
        seg.set_indexed_field_info(101, enabled_info(Vec::new()));
        seg.load_field_data(101, 4, FieldValues::Int32(vec![1, 2, 3, 4])).unwrap();
        let mut result = placeholder_result();
        seg.fill_indexed_fields_data(None, &mut result).unwrap();
        assert_eq!(result.fields_data[0].values, FieldValues::Int32(vec![0, 0]));
    }

    #[test]
    fn fill_on_released_segment() {
        let seg = sealed_segment(0);
        seg.delete_segment();
        assert!(seg
            .fill_indexed_fields_data(None, &mut placeholder_result())
            .unwrap_err()
            .is_nil_segment());
    }
}
