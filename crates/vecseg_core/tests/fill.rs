//! Materializing index-backed fields from binlogs after retrieve.

use std::collections::BTreeMap;
use std::sync::Arc;
use vecseg_codec::{encode_column, encode_strings, DataType, Endian, FieldValues};
use vecseg_core::index::INDEX_TYPE_STRING_TRIE;
use vecseg_core::{
    Binlog, Collection, CollectionSchema, CoreError, Expr, FieldBinlog, FieldIndexInfo,
    FieldSchema, IndexedFieldInfo, LoadedIndex, RetrievePlan, ScalarValue, Segment,
    SegmentConfig, SegmentMeta, SegmentReplica, SegmentType, StringTrieIndex,
};
use vecseg_storage::{ChunkManager, InMemoryChunkManager};

const PK: i64 = 100;
const NAME: i64 = 101;
const AGE: i64 = 102;
const EMBEDDING: i64 = 103;
const HEADER: usize = 8;

const NAMES: [&str; 5] = ["apple", "apricot", "banana", "avocado", "blueberry"];
const AGES: [i32; 5] = [31, 32, 33, 34, 35];

fn embedding(row: usize) -> Vec<f32> {
    vec![row as f32, 0.5, -1.0, row as f32 * 2.0]
}

fn sealed_segment() -> Segment {
    let schema = CollectionSchema::new(
        "fruit",
        false,
        vec![
            FieldSchema::scalar(PK, "pk", DataType::Int64).primary(),
            FieldSchema::scalar(NAME, "name", DataType::VarChar),
            FieldSchema::scalar(AGE, "age", DataType::Int32),
            FieldSchema::vector(EMBEDDING, "embedding", DataType::FloatVector, 4),
        ],
    )
    .unwrap();
    Segment::new(
        Arc::new(Collection::new(9, schema)),
        SegmentMeta::new(42, 1, 9, "dml-1"),
        SegmentType::Sealed,
        SegmentConfig::default().binlog_header_size(HEADER as u64),
    )
    .unwrap()
}

fn with_header(body: Vec<u8>) -> Vec<u8> {
    let mut blob = vec![0xEE; HEADER];
    blob.extend(body);
    blob
}

/// Writes each field's rows as two binlogs of 3 and 2 rows.
fn write_binlogs(cm: &InMemoryChunkManager, field_id: i64, column: &FieldValues) -> FieldBinlog {
    let mut binlogs = Vec::new();
    for (i, range) in [0..3usize, 3..5].into_iter().enumerate() {
        let rows: Vec<usize> = range.collect();
        let part = column.gather(&rows).unwrap();
        let body = match &part {
            FieldValues::VarChar(values) => encode_strings(values, Endian::Little),
            other => encode_column(other, Endian::Little),
        };
        let path = format!("binlog/42/{field_id}/{i}");
        cm.write(&path, &with_header(body)).unwrap();
        binlogs.push(Binlog::new(path, rows.len() as i64));
    }
    FieldBinlog { field_id, binlogs }
}

fn index_info(field_id: i64) -> FieldIndexInfo {
    FieldIndexInfo {
        field_id,
        enable_index: true,
        index_params: BTreeMap::from([("index_type".to_string(), INDEX_TYPE_STRING_TRIE.to_string())]),
        ..FieldIndexInfo::default()
    }
}

/// A sealed segment serving `name` from a trie, with `name`, `age` and
/// `embedding` raw values only in binlogs.
fn prepared() -> (Segment, InMemoryChunkManager) {
    let segment = sealed_segment();
    let cm = InMemoryChunkManager::new();
    let names: Vec<String> = NAMES.iter().map(|s| s.to_string()).collect();

    segment
        .load_field_data(PK, 5, FieldValues::Int64((1..=5).collect()))
        .unwrap();
    segment
        .load_field_data(NAME, 5, FieldValues::VarChar(names.clone()))
        .unwrap();
    let mut trie = StringTrieIndex::new();
    trie.build(&names).unwrap();
    segment.load_index(NAME, LoadedIndex::StringTrie(trie)).unwrap();
    segment.drop_field_data(NAME).unwrap();

    let columns = [
        (NAME, FieldValues::VarChar(names)),
        (AGE, FieldValues::Int32(AGES.to_vec())),
        (
            EMBEDDING,
            FieldValues::FloatVector {
                dim: 4,
                data: (0..5).flat_map(embedding).collect(),
            },
        ),
    ];
    for (field_id, column) in &columns {
        let binlog = write_binlogs(&cm, *field_id, column);
        segment.set_indexed_field_info(*field_id, IndexedFieldInfo::new(binlog, index_info(*field_id)));
    }
    segment.set_id_binlog_row_sizes(vec![3, 2]);
    (segment, cm)
}

#[test]
fn prefix_retrieve_then_fill_from_binlogs() {
    let (segment, cm) = prepared();
    let plan = RetrievePlan {
        predicate: Some(Expr::prefix(NAME, "a")),
        output_field_ids: vec![NAME, AGE, EMBEDDING],
        timestamp: 100,
    };
    let mut result = segment.retrieve(&plan).unwrap();
    assert_eq!(result.offsets, vec![0, 1, 3]);
    assert_eq!(
        result.field(NAME).unwrap().values,
        FieldValues::VarChar(vec![String::new(); 3])
    );

    segment.fill_indexed_fields_data(Some(&cm), &mut result).unwrap();
    assert_eq!(
        result.field(NAME).unwrap().values,
        FieldValues::VarChar(vec!["apple".into(), "apricot".into(), "avocado".into()])
    );
    assert_eq!(result.field(AGE).unwrap().values, FieldValues::Int32(vec![31, 32, 34]));
    let vectors = &result.field(EMBEDDING).unwrap().values;
    assert_eq!(vectors.float_vector(2), Some(embedding(3).as_slice()));
}

#[test]
fn term_and_not_equal_use_the_trie() {
    let (segment, _cm) = prepared();
    let term = RetrievePlan {
        predicate: Some(Expr::term(NAME, [ScalarValue::from("banana"), ScalarValue::from("kiwi")])),
        output_field_ids: vec![],
        timestamp: 100,
    };
    assert_eq!(segment.retrieve(&term).unwrap().offsets, vec![2]);

    let ne = RetrievePlan {
        predicate: Some(Expr::compare(NAME, vecseg_core::CompareOp::Ne, "banana")),
        ..term.clone()
    };
    assert_eq!(segment.retrieve(&ne).unwrap().offsets, vec![0, 1, 3, 4]);

    let ordered = RetrievePlan {
        predicate: Some(Expr::compare(NAME, vecseg_core::CompareOp::Lt, "b")),
        ..term
    };
    assert!(matches!(
        segment.retrieve(&ordered),
        Err(CoreError::Unimplemented { .. })
    ));
}

#[test]
fn fill_without_chunk_manager_is_not_ready() {
    let (segment, _cm) = prepared();
    let plan = RetrievePlan {
        predicate: None,
        output_field_ids: vec![AGE],
        timestamp: 100,
    };
    let mut result = segment.retrieve(&plan).unwrap();
    assert!(matches!(
        segment.fill_indexed_fields_data(None, &mut result),
        Err(CoreError::IndexNotReady { field_id: AGE, .. })
    ));
}

#[test]
fn missing_binlog_object_surfaces_storage_error() {
    let (segment, cm) = prepared();
    cm.remove("binlog/42/102/1").unwrap();
    let plan = RetrievePlan {
        predicate: None,
        output_field_ids: vec![AGE],
        timestamp: 100,
    };
    let mut result = segment.retrieve(&plan).unwrap();
    assert!(matches!(
        segment.fill_indexed_fields_data(Some(&cm), &mut result),
        Err(CoreError::Storage(_))
    ));
}

#[test]
fn field_data_paths_follow_row_sizes() {
    let segment = sealed_segment();
    segment
        .load_field_data(PK, 25, FieldValues::Int64((0..25).collect()))
        .unwrap();
    segment.set_id_binlog_row_sizes(vec![10, 15]);
    let info = IndexedFieldInfo::new(
        FieldBinlog {
            field_id: AGE,
            binlogs: vec![Binlog::new("a", 10), Binlog::new("b", 15)],
        },
        index_info(AGE),
    );
    assert_eq!(segment.get_field_data_path(&info, 0).unwrap(), ("a".to_string(), 0));
    assert_eq!(segment.get_field_data_path(&info, 9).unwrap(), ("a".to_string(), 9));
    assert_eq!(segment.get_field_data_path(&info, 10).unwrap(), ("b".to_string(), 0));
    assert_eq!(segment.get_field_data_path(&info, 24).unwrap(), ("b".to_string(), 14));
    assert!(segment.get_field_data_path(&info, 25).is_err());
}

#[test]
fn replica_retrieve_reads_binlog_only_fields() {
    let replica = SegmentReplica::new(SegmentConfig::default());
    let schema = CollectionSchema::new(
        "scores",
        false,
        vec![
            FieldSchema::scalar(PK, "pk", DataType::Int64).primary(),
            FieldSchema::scalar(AGE, "age", DataType::Int32),
        ],
    )
    .unwrap();
    replica.add_collection(9, schema);
    let segment = replica.add_segment(SegmentMeta::new(7, 1, 9, "dml-1"), 2).unwrap();
    segment
        .load_field_data(PK, 2, FieldValues::Int64(vec![1, 2]))
        .unwrap();
    segment.set_indexed_field_info(
        AGE,
        IndexedFieldInfo {
            field_binlog: Some(FieldBinlog {
                field_id: AGE,
                binlogs: vec![Binlog::new("s/0", 2)],
            }),
            index_info: None,
        },
    );
    segment.set_id_binlog_row_sizes(vec![2]);
    let cm = InMemoryChunkManager::with_objects([(
        "s/0",
        encode_column(&FieldValues::Int32(vec![10, 11]), Endian::Little),
    )]);

    let plan = RetrievePlan {
        predicate: None,
        output_field_ids: vec![AGE],
        timestamp: 100,
    };
    let results = replica.retrieve(&[7], &plan, Some(&cm)).unwrap();
    assert_eq!(results[0].1.field(AGE).unwrap().values, FieldValues::Int32(vec![10, 11]));
    assert!(matches!(
        replica.retrieve(&[7], &plan, None),
        Err(CoreError::IndexNotReady { field_id: AGE, .. })
    ));
}
