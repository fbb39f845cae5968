//! Indexes attached to sealed segments.
//!
//! # Index Types
//!
//! - [`StringTrieIndex`]: equality and prefix membership over a varchar field
//! - [`FlatIndex`]: exhaustive vector search over an owned copy of the vectors
//!
//! Both serialize to a [`BinarySet`] whose blobs must be stored and loaded
//! together. Which index a blob set holds is recorded in the `index_type`
//! parameter of its [`FieldIndexInfo`].

mod binary_set;
mod flat;
mod info;
mod louds;
mod trie;

pub use binary_set::{BinarySet, SLICE_META};
pub use flat::{FlatIndex, FLAT_META_BLOB, FLAT_VECTORS_BLOB};
pub use info::{Binlog, FieldBinlog, FieldIndexInfo, IndexedFieldInfo};
pub use trie::{StringTrieIndex, TRIE_IDS_BLOB, TRIE_INDEX_BLOB};

use crate::config::SerializeConfig;
use crate::error::{CoreError, CoreResult};
use crate::metric::MetricType;

/// `index_type` parameter value of a [`StringTrieIndex`].
pub const INDEX_TYPE_STRING_TRIE: &str = "STRING_TRIE";
/// `index_type` parameter value of a [`FlatIndex`].
pub const INDEX_TYPE_FLAT: &str = "FLAT";

/// An index that can be persisted as a blob set.
pub trait SerializableIndex: Send + Sync {
    /// Serializes the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is not built or slicing fails.
    fn serialize(&self, config: &SerializeConfig) -> CoreResult<BinarySet>;

    /// Replaces the index contents with a deserialized blob set.
    ///
    /// # Errors
    ///
    /// Returns an error if the blobs are missing or malformed.
    fn load(&mut self, set: BinarySet) -> CoreResult<()>;

    /// Number of rows covered by the index.
    fn count(&self) -> usize;
}

/// A built index held by a sealed segment.
#[derive(Debug, Clone)]
pub enum LoadedIndex {
    /// Scalar string index.
    StringTrie(StringTrieIndex),
    /// Vector index.
    Flat(FlatIndex),
}

impl LoadedIndex {
    /// Rebuilds an index from its blobs, dispatching on `index_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index type is unknown or the blobs are
    /// malformed.
    pub fn from_binary_set(info: &FieldIndexInfo, set: BinarySet) -> CoreResult<Self> {
        match info.param("index_type") {
            Some(INDEX_TYPE_STRING_TRIE) => {
                let mut index = StringTrieIndex::new();
                index.load(set)?;
                Ok(Self::StringTrie(index))
            }
            Some(INDEX_TYPE_FLAT) => {
                let metric = info.param("metric_type").unwrap_or("L2").parse::<MetricType>()?;
                let mut index = FlatIndex::empty(metric);
                index.load(set)?;
                Ok(Self::Flat(index))
            }
            other => Err(CoreError::invalid_argument(format!(
                "unsupported index type {}",
                other.unwrap_or("<missing>")
            ))),
        }
    }

    /// Number of rows covered by the index.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::StringTrie(i) => i.count(),
            Self::Flat(i) => i.count(),
        }
    }

    /// Approximate heap bytes held by the index.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        match self {
            Self::StringTrie(i) => i.heap_size(),
            Self::Flat(i) => i.heap_size(),
        }
    }

    /// Serializes the index.
    ///
    /// # Errors
    ///
    /// See [`SerializableIndex::serialize`].
    pub fn serialize(&self, config: &SerializeConfig) -> CoreResult<BinarySet> {
        match self {
            Self::StringTrie(i) => i.serialize(config),
            Self::Flat(i) => i.serialize(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn info(params: &[(&str, &str)]) -> FieldIndexInfo {
        FieldIndexInfo {
            enable_index: true,
            index_params: params
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
            ..FieldIndexInfo::default()
        }
    }

    #[test]
    fn dispatch_on_index_type() {
        let mut trie = StringTrieIndex::new();
        trie.build(&["a", "b", "a"]).unwrap();
        let set = trie.serialize(&SerializeConfig::default()).unwrap();
        let loaded = LoadedIndex::from_binary_set(&info(&[("index_type", "STRING_TRIE")]), set).unwrap();
        assert!(matches!(loaded, LoadedIndex::StringTrie(_)));
        assert_eq!(loaded.count(), 3);
    }

    #[test]
    fn flat_uses_metric_param() {
        let flat = FlatIndex::build(
            MetricType::IP,
            vecseg_codec::FieldValues::FloatVector {
                dim: 1,
                data: vec![1.0, 2.0],
            },
        )
        .unwrap();
        let set = flat.serialize(&SerializeConfig::default()).unwrap();
        let loaded = LoadedIndex::from_binary_set(
            &info(&[("index_type", "FLAT"), ("metric_type", "IP")]),
            set,
        )
        .unwrap();
        match loaded {
            LoadedIndex::Flat(f) => assert_eq!(f.metric(), MetricType::IP),
            LoadedIndex::StringTrie(_) => panic!("expected flat index"),
        }
    }

    #[test]
    fn unknown_index_type() {
        let err = LoadedIndex::from_binary_set(&info(&[("index_type", "IVF_PQ")]), BinarySet::new());
        assert!(matches!(err, Err(CoreError::InvalidArgument { .. })));
        assert!(LoadedIndex::from_binary_set(&info(&[]), BinarySet::new()).is_err());
    }
}
