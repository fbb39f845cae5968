//! Test fixtures and segment helpers.
//!
//! Provides the collection schemas most tests share, row batches encoded in
//! the insert blob layout, and segments that tear themselves down on drop.

use std::ops::Deref;
use std::sync::Arc;
use tempfile::TempDir;
use vecseg_codec::{DataType, Endian, FieldValues};
use vecseg_core::{
    Collection, CollectionSchema, FieldSchema, PrimaryKey, RetrievePlan, Segment, SegmentConfig,
    SegmentMeta, SegmentType, Timestamp,
};
use vecseg_storage::LocalChunkManager;

/// Float vector field of [`vector_schema`].
pub const VECTOR_FIELD_ID: i64 = 100;
/// Int32 `age` field of [`vector_schema`].
pub const AGE_FIELD_ID: i64 = 101;
/// Int64 primary key field of [`vector_schema`].
pub const PK_FIELD_ID: i64 = 102;
/// Dimension of the vector field.
pub const DEFAULT_DIM: usize = 16;

/// Collection id used by every fixture.
pub const DEFAULT_COLLECTION_ID: i64 = 1;
/// Partition id used by every fixture.
pub const DEFAULT_PARTITION_ID: i64 = 1;

/// A float vector, an int32 `age` column and an int64 primary key.
pub fn vector_schema() -> CollectionSchema {
    CollectionSchema::new(
        "test-collection",
        false,
        vec![
            FieldSchema::vector(VECTOR_FIELD_ID, "vec", DataType::FloatVector, DEFAULT_DIM),
            FieldSchema::scalar(AGE_FIELD_ID, "age", DataType::Int32),
            FieldSchema::scalar(PK_FIELD_ID, "pk", DataType::Int64).primary(),
        ],
    )
    .expect("vector schema is valid")
}

/// A varchar primary key and a varchar `name` column.
pub fn varchar_schema() -> CollectionSchema {
    CollectionSchema::new(
        "test-strings",
        false,
        vec![
            FieldSchema::scalar(100, "id", DataType::VarChar).primary(),
            FieldSchema::scalar(101, "name", DataType::VarChar),
        ],
    )
    .expect("varchar schema is valid")
}

/// [`vector_schema`] registered under [`DEFAULT_COLLECTION_ID`].
pub fn test_collection() -> Arc<Collection> {
    Arc::new(Collection::new(DEFAULT_COLLECTION_ID, vector_schema()))
}

/// Deterministic vector for row `seed`.
pub fn vector_for(seed: i64) -> Vec<f32> {
    (0..DEFAULT_DIM)
        .map(|d| ((seed as f32) * 0.5 + d as f32).sin())
        .collect()
}

/// Rows of [`vector_schema`], in insert order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    /// Primary keys.
    pub pks: Vec<i64>,
    /// Row ids.
    pub row_ids: Vec<i64>,
    /// One vector per row.
    pub vectors: Vec<Vec<f32>>,
    /// One age per row.
    pub ages: Vec<i32>,
}

impl RowBatch {
    /// Rows with keys `start..start + n`.
    pub fn sequential(start: i64, n: usize) -> Self {
        Self::from_pks((start..start + n as i64).collect())
    }

    /// Rows with the given keys; the other columns derive from the key.
    pub fn from_pks(pks: Vec<i64>) -> Self {
        Self {
            row_ids: pks.iter().map(|pk| pk + 10_000).collect(),
            vectors: pks.iter().map(|&pk| vector_for(pk)).collect(),
            ages: pks.iter().map(|&pk| (pk % 100) as i32).collect(),
            pks,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.pks.len()
    }

    /// Returns true if the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.pks.is_empty()
    }

    /// Columns in schema order.
    pub fn columns(&self) -> Vec<FieldValues> {
        vec![
            FieldValues::FloatVector {
                dim: DEFAULT_DIM,
                data: self.vectors.iter().flatten().copied().collect(),
            },
            FieldValues::Int32(self.ages.clone()),
            FieldValues::Int64(self.pks.clone()),
        ]
    }

    /// Row blobs in the insert layout.
    pub fn blobs(&self, endian: Endian) -> Vec<Vec<u8>> {
        let layout = vector_schema().row_layout().expect("layout");
        let columns = self.columns();
        (0..self.len())
            .map(|row| layout.encode_row(&columns, row, endian).expect("encode row"))
            .collect()
    }

    /// Primary keys as [`PrimaryKey`]s.
    pub fn primary_keys(&self) -> Vec<PrimaryKey> {
        self.pks.iter().map(|&pk| PrimaryKey::from(pk)).collect()
    }
}

/// A segment over [`vector_schema`] that is released when dropped.
pub struct TestSegment {
    segment: Arc<Segment>,
}

impl TestSegment {
    /// Creates a segment with id 1 and small chunks.
    pub fn new(segment_type: SegmentType) -> Self {
        Self::with_config(1, segment_type, SegmentConfig::default().chunk_rows(64))
    }

    /// Creates a segment with an explicit id and configuration.
    pub fn with_config(segment_id: i64, segment_type: SegmentType, config: SegmentConfig) -> Self {
        let meta = SegmentMeta::new(segment_id, DEFAULT_PARTITION_ID, DEFAULT_COLLECTION_ID, "test-dml");
        let segment = Segment::new(test_collection(), meta, segment_type, config).expect("segment");
        Self {
            segment: Arc::new(segment),
        }
    }

    /// A sealed segment with `batch` loaded as resident columns.
    pub fn sealed_with(batch: &RowBatch) -> Self {
        let seg = Self::new(SegmentType::Sealed);
        let rows = batch.len() as i64;
        let mut columns = batch.columns().into_iter();
        for field_id in [VECTOR_FIELD_ID, AGE_FIELD_ID, PK_FIELD_ID] {
            let values = columns.next().expect("three columns");
            seg.load_field_data(field_id, rows, values).expect("load field");
        }
        seg
    }

    /// Shared handle for use from other threads.
    pub fn handle(&self) -> Arc<Segment> {
        Arc::clone(&self.segment)
    }

    /// Reserves and inserts `batch`, every row stamped `ts`. Returns the
    /// reserved offset.
    pub fn insert_batch(&self, batch: &RowBatch, ts: Timestamp) -> i64 {
        insert_batch(&self.segment, batch, ts)
    }

    /// Deletes `pks` at `ts`.
    pub fn delete_pks(&self, pks: &[i64], ts: Timestamp) {
        delete_pks(&self.segment, pks, ts)
    }

    /// Integer primary keys visible at `ts`, in offset order.
    pub fn visible_pks(&self, ts: Timestamp) -> Vec<i64> {
        visible_pks(&self.segment, ts)
    }
}

impl Deref for TestSegment {
    type Target = Segment;

    fn deref(&self) -> &Self::Target {
        &self.segment
    }
}

impl Drop for TestSegment {
    fn drop(&mut self) {
        self.segment.delete_segment();
    }
}

/// Reserves and inserts `batch` into `segment`.
pub fn insert_batch(segment: &Segment, batch: &RowBatch, ts: Timestamp) -> i64 {
    let offset = segment.pre_insert(batch.len() as i64).expect("pre_insert");
    segment
        .insert(
            offset,
            &batch.row_ids,
            &vec![ts; batch.len()],
            &batch.blobs(segment.config().endian),
        )
        .expect("insert");
    offset
}

/// Reserves and applies deletes of `pks` at `ts`.
pub fn delete_pks(segment: &Segment, pks: &[i64], ts: Timestamp) {
    let offset = segment.pre_delete(pks.len() as i64).expect("pre_delete");
    let keys: Vec<PrimaryKey> = pks.iter().map(|&pk| PrimaryKey::from(pk)).collect();
    segment
        .delete(offset, &keys, &vec![ts; pks.len()])
        .expect("delete");
}

/// Integer primary keys of `segment` visible at `ts`.
pub fn visible_pks(segment: &Segment, ts: Timestamp) -> Vec<i64> {
    let plan = RetrievePlan {
        predicate: None,
        output_field_ids: vec![],
        timestamp: ts,
    };
    segment
        .retrieve(&plan)
        .expect("retrieve")
        .ids
        .into_iter()
        .filter_map(|pk| match pk {
            PrimaryKey::Int64(v) => Some(v),
            PrimaryKey::VarChar(_) => None,
        })
        .collect()
}

/// A local chunk manager over a temporary directory.
pub struct TempStorage {
    /// The chunk manager.
    pub chunk_manager: LocalChunkManager,
    _dir: TempDir,
}

impl TempStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let chunk_manager = LocalChunkManager::open(dir.path()).expect("open chunk manager");
        Self {
            chunk_manager,
            _dir: dir,
        }
    }
}

impl Default for TempStorage {
    fn default() -> Self {
        Self::new()
    }
}
