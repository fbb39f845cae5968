//! # vecseg Core
//!
//! Segment engine and scalar trie index for vecseg.
//!
//! This crate provides:
//! - [`Segment`] - growing and sealed row storage with insert, delete,
//!   retrieve and search
//! - [`DeletedRecord`] and [`BloomFilter`] - tombstones and primary-key
//!   membership
//! - [`StringTrieIndex`] and [`FlatIndex`] - scalar and vector indexes,
//!   persisted as [`BinarySet`]s
//! - Binlog fill routines that materialize index-backed fields through a
//!   [`vecseg_storage::ChunkManager`]
//! - [`SegmentReplica`] - the registry that owns segments
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use vecseg_codec::{DataType, FieldValues};
//! use vecseg_core::{
//!     Collection, CollectionSchema, FieldSchema, RetrievePlan, Segment, SegmentConfig,
//!     SegmentMeta, SegmentType,
//! };
//!
//! let schema = CollectionSchema::new(
//!     "docs",
//!     false,
//!     vec![FieldSchema::scalar(100, "id", DataType::Int64).primary()],
//! )
//! .unwrap();
//! let collection = Arc::new(Collection::new(1, schema));
//! let segment = Segment::new(
//!     collection,
//!     SegmentMeta::new(7, 1, 1, "dml-0"),
//!     SegmentType::Sealed,
//!     SegmentConfig::default(),
//! )
//! .unwrap();
//! segment.load_field_data(100, 2, FieldValues::Int64(vec![4, 5])).unwrap();
//!
//! let plan = RetrievePlan { predicate: None, output_field_ids: vec![100], timestamp: 1 };
//! assert_eq!(segment.retrieve(&plan).unwrap().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bloom;
mod config;
mod deleted;
mod error;
pub mod index;
mod metric;
mod plan;
mod primary_key;
mod replica;
mod schema;
mod segment;
mod stats;
mod types;

pub use bloom::BloomFilter;
pub use config::{SegmentConfig, SerializeConfig};
pub use deleted::DeletedRecord;
pub use error::{CoreError, CoreResult};
pub use index::{
    BinarySet, Binlog, FieldBinlog, FieldIndexInfo, FlatIndex, IndexedFieldInfo, LoadedIndex,
    SerializableIndex, StringTrieIndex,
};
pub use metric::{round_score, MetricType};
pub use plan::{
    CompareOp, Expr, PlaceholderGroup, RetrievePlan, RetrieveResult, ScalarValue, SearchHit,
    SearchPlan, SearchResult,
};
pub use primary_key::PrimaryKey;
pub use replica::SegmentReplica;
pub use schema::{Collection, CollectionSchema, FieldSchema};
pub use segment::{
    fill_binary_vector_field_data, fill_bool_field_data, fill_double_field_data,
    fill_field_data, fill_float_field_data, fill_float_vector_field_data,
    fill_int16_field_data, fill_int32_field_data, fill_int64_field_data,
    fill_int8_field_data, fill_string_field_data, BinlogFormat, Segment, SegmentMeta,
};
pub use stats::SegmentStats;
pub use types::{
    SegmentType, Timestamp, UniqueId, ROW_ID_FIELD_ID, START_OF_USER_FIELD_ID,
    TIMESTAMP_FIELD_ID,
};
