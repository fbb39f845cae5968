//! Per-field binlog and index descriptors of sealed segments.

use crate::types::UniqueId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vecseg_codec::FieldId;

/// One immutable remote file holding a row range of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binlog {
    /// Object path understood by the chunk manager.
    pub log_path: String,
    /// Rows in the file.
    #[serde(default)]
    pub entries_num: i64,
}

impl Binlog {
    /// Creates a binlog descriptor.
    pub fn new(log_path: impl Into<String>, entries_num: i64) -> Self {
        Self {
            log_path: log_path.into(),
            entries_num,
        }
    }
}

/// Ordered binlogs of one field. Order matches the segment's row-size table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBinlog {
    /// Field identifier.
    pub field_id: FieldId,
    /// Binlogs in row order.
    pub binlogs: Vec<Binlog>,
}

/// Index build metadata delivered when a sealed segment is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldIndexInfo {
    /// Field identifier.
    pub field_id: FieldId,
    /// Whether the field is served from an index.
    pub enable_index: bool,
    /// Index name.
    pub index_name: String,
    /// Index identifier.
    pub index_id: UniqueId,
    /// Build task identifier.
    pub build_id: UniqueId,
    /// Free-form parameters such as `index_type` and `metric_type`.
    pub index_params: BTreeMap<String, String>,
    /// Object paths of the serialized index blobs.
    pub index_file_paths: Vec<String>,
    /// Total serialized size in bytes.
    pub index_size: i64,
}

impl FieldIndexInfo {
    /// Returns an index parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.index_params.get(key).map(String::as_str)
    }
}

/// What a sealed segment knows about one field's remote data.
///
/// A binlog list without index info means raw data must come from the
/// binlogs; index info with `enable_index` means the field is index-backed and
/// its raw values are filled from binlogs on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFieldInfo {
    /// Remote binlogs of the field.
    pub field_binlog: Option<FieldBinlog>,
    /// Index metadata.
    pub index_info: Option<FieldIndexInfo>,
}

impl IndexedFieldInfo {
    /// Creates info with both parts.
    #[must_use]
    pub fn new(field_binlog: FieldBinlog, index_info: FieldIndexInfo) -> Self {
        Self {
            field_binlog: Some(field_binlog),
            index_info: Some(index_info),
        }
    }

    /// Returns true if index info is present and enabled.
    #[must_use]
    pub fn index_enabled(&self) -> bool {
        self.index_info.as_ref().is_some_and(|i| i.enable_index)
    }

    /// Binlogs of the field, empty if none are registered.
    #[must_use]
    pub fn binlogs(&self) -> &[Binlog] {
        self.field_binlog.as_ref().map_or(&[], |b| b.binlogs.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_enabled_requires_flag() {
        let mut info = IndexedFieldInfo::default();
        assert!(!info.index_enabled());
        info.index_info = Some(FieldIndexInfo::default());
        assert!(!info.index_enabled());
        info.index_info = Some(FieldIndexInfo {
            enable_index: true,
            ..FieldIndexInfo::default()
        });
        assert!(info.index_enabled());
        assert!(info.binlogs().is_empty());
    }

    #[test]
    fn index_info_from_json() {
        let json = r#"{
            "field_id": 100,
            "enable_index": true,
            "index_name": "idx",
            "index_params": {"index_type": "STRING_TRIE"},
            "index_file_paths": ["a/string_trie_index", "a/string_trie_ids"]
        }"#;
        let info: FieldIndexInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.param("index_type"), Some("STRING_TRIE"));
        assert_eq!(info.build_id, 0);
        assert_eq!(info.index_file_paths.len(), 2);
    }
}
