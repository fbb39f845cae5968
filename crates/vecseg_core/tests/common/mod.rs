//! Shared helpers for vecseg_core integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use vecseg_codec::{DataType, Endian, FieldValues};
use vecseg_core::{
    Collection, CollectionSchema, FieldSchema, PrimaryKey, RetrieveResult, Segment,
    SegmentConfig, SegmentMeta, SegmentType, Timestamp,
};

pub const DIM: usize = 4;
pub const VEC_FIELD: i64 = 100;
pub const AGE_FIELD: i64 = 101;
pub const PK_FIELD: i64 = 102;

/// int64 primary key, a float vector and an int32 column.
pub fn collection() -> Arc<Collection> {
    let schema = CollectionSchema::new(
        "items",
        false,
        vec![
            FieldSchema::vector(VEC_FIELD, "embedding", DataType::FloatVector, DIM),
            FieldSchema::scalar(AGE_FIELD, "age", DataType::Int32),
            FieldSchema::scalar(PK_FIELD, "pk", DataType::Int64).primary(),
        ],
    )
    .expect("valid schema");
    Arc::new(Collection::new(1, schema))
}

pub fn segment(segment_id: i64, segment_type: SegmentType) -> Segment {
    Segment::new(
        collection(),
        SegmentMeta::new(segment_id, 1, 1, "dml-0"),
        segment_type,
        SegmentConfig::default().chunk_rows(8),
    )
    .expect("segment")
}

pub fn vector(seed: i64) -> Vec<f32> {
    (0..DIM).map(|d| (seed * DIM as i64 + d as i64) as f32 * 0.25).collect()
}

/// One row blob per primary key.
pub fn row_blobs(pks: &[i64]) -> Vec<Vec<u8>> {
    let layout = collection().schema().row_layout().expect("layout");
    let columns = [
        FieldValues::FloatVector {
            dim: DIM,
            data: pks.iter().flat_map(|&pk| vector(pk)).collect(),
        },
        FieldValues::Int32(pks.iter().map(|&pk| pk as i32 + 20).collect()),
        FieldValues::Int64(pks.to_vec()),
    ];
    (0..pks.len())
        .map(|row| layout.encode_row(&columns, row, Endian::Little).expect("row"))
        .collect()
}

/// Reserves and inserts rows with the given keys, all at `ts`.
pub fn insert(segment: &Segment, pks: &[i64], ts: Timestamp) {
    let offset = segment.pre_insert(pks.len() as i64).expect("pre_insert");
    let row_ids: Vec<i64> = pks.iter().map(|pk| pk + 1000).collect();
    let timestamps = vec![ts; pks.len()];
    segment
        .insert(offset, &row_ids, &timestamps, &row_blobs(pks))
        .expect("insert");
}

pub fn delete(segment: &Segment, pks: &[i64], ts: Timestamp) {
    let offset = segment.pre_delete(pks.len() as i64).expect("pre_delete");
    let keys: Vec<PrimaryKey> = pks.iter().map(|&pk| PrimaryKey::from(pk)).collect();
    segment
        .delete(offset, &keys, &vec![ts; pks.len()])
        .expect("delete");
}

pub fn int_ids(result: &RetrieveResult) -> Vec<i64> {
    result
        .ids
        .iter()
        .map(|pk| match pk {
            PrimaryKey::Int64(v) => *v,
            PrimaryKey::VarChar(s) => panic!("unexpected string key {s}"),
        })
        .collect()
}
