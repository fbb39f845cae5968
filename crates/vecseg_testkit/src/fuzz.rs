//! Fuzz testing harnesses for vecseg.
//!
//! This module provides fuzz targets that can be used with cargo-fuzz
//! or other fuzzing frameworks. Each target must return normally for any
//! input; malformed input is expected to surface as an error value.

use crate::fixtures::{vector_schema, RowBatch, TestSegment};
use vecseg_codec::{decode_column, decode_strings, string_at, DataType, Endian};
use vecseg_core::{
    BinarySet, PrimaryKey, RetrievePlan, SegmentType, SerializableIndex, StringTrieIndex,
};

/// Fuzz target for loading a string trie from untrusted blobs.
///
/// The input is split in two at its first byte; the halves become the trie
/// and id-table blobs.
pub fn fuzz_trie_load(data: &[u8]) {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(rest.len());
    let (trie, ids) = rest.split_at(split);

    let mut set = BinarySet::new();
    set.append(vecseg_core::index::TRIE_INDEX_BLOB, trie.to_vec());
    set.append(vecseg_core::index::TRIE_IDS_BLOB, ids.to_vec());

    let mut index = StringTrieIndex::new();
    if index.load(set).is_ok() {
        // A loaded index must answer queries without panicking.
        for row in 0..index.len().min(16) {
            if let Some(value) = index.value_at(row) {
                let _ = index.in_values(&[value.as_str()]);
                let _ = index.prefix_match(&value);
            }
        }
    }
}

/// Fuzz target for decoding insert row blobs of the fixture schema.
pub fn fuzz_row_decode(data: &[u8]) {
    let Ok(layout) = vector_schema().row_layout() else {
        return;
    };
    let _ = layout.decode_rows(&[data], Endian::Little);
    let _ = layout.decode_rows(&[data], Endian::Big);
}

/// Fuzz target for the string and column decoders.
pub fn fuzz_column_decode(data: &[u8]) {
    let _ = decode_strings(data, Endian::Little);
    for row in 0..4 {
        let _ = string_at(data, row, Endian::Little);
    }
    for data_type in [DataType::Bool, DataType::Int32, DataType::Double] {
        let _ = decode_column(data_type, 0, data, Endian::Little);
    }
    let _ = decode_column(DataType::FloatVector, 4, data, Endian::Little);
    let _ = decode_column(DataType::BinaryVector, 8, data, Endian::Little);
}

/// Fuzz target for segment operation sequences.
///
/// Each 3-byte group is one operation: an opcode, a key and a timestamp
/// step. Operations that the segment rejects are ignored.
pub fn fuzz_segment_operations(data: &[u8]) {
    let segment = TestSegment::new(SegmentType::Growing);
    let mut ts = 0u64;

    for op in data.chunks_exact(3) {
        let key = i64::from(op[1] % 32);
        ts += u64::from(op[2] % 4) + 1;
        match op[0] % 4 {
            0 | 1 => {
                let batch = RowBatch::from_pks(vec![key]);
                if let Ok(offset) = segment.pre_insert(1) {
                    let _ = segment.insert(
                        offset,
                        &batch.row_ids,
                        &[ts],
                        &batch.blobs(Endian::Little),
                    );
                }
            }
            2 => {
                if let Ok(offset) = segment.pre_delete(1) {
                    let _ = segment.delete(offset, &[PrimaryKey::from(key)], &[ts]);
                }
            }
            _ => {
                let plan = RetrievePlan {
                    predicate: None,
                    output_field_ids: vec![],
                    timestamp: ts,
                };
                let _ = segment.retrieve(&plan);
            }
        }
    }
}
