//! Named blob sets produced by index serialization.
//!
//! An index serializes to several named blobs that are only meaningful
//! together. Large blobs may be disassembled into slices:
//!
//! ```text
//! "<name>_0", "<name>_1", ...   slices of at most slice_size bytes
//! "SLICE_META"                  JSON {"meta": [{"name", "slice_num", "total_len"}]}
//! ```
//!
//! [`BinarySet::assemble`] reverses the split and removes the meta entry.

use crate::config::SerializeConfig;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vecseg_storage::ChunkManager;

/// Key of the slice metadata entry.
pub const SLICE_META: &str = "SLICE_META";

#[derive(Debug, Serialize, Deserialize)]
struct SliceEntry {
    name: String,
    slice_num: usize,
    total_len: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SliceMeta {
    meta: Vec<SliceEntry>,
}

/// Ordered map of blob name to bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinarySet {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl BinarySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a blob.
    pub fn append(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.blobs.insert(name.into(), data);
    }

    /// Returns a blob by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.blobs.get(name).map(Vec::as_slice)
    }

    /// Returns a blob by name or an `InvalidFormat` error naming it.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is missing.
    pub fn require(&self, name: &str) -> CoreResult<&[u8]> {
        self.get(name)
            .ok_or_else(|| CoreError::invalid_format(format!("missing blob {name}")))
    }

    /// Removes and returns a blob.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.blobs.remove(name)
    }

    /// Blob names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(String::as_str)
    }

    /// Number of blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns true if the set holds no blobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Total bytes across all blobs.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.blobs.values().map(Vec::len).sum()
    }

    /// Splits blobs per `config`. A no-op when no slice size is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice size is zero.
    pub fn disassemble(&mut self, config: &SerializeConfig) -> CoreResult<()> {
        let Some(slice_size) = config.slice_size else {
            return Ok(());
        };
        if slice_size == 0 {
            return Err(CoreError::invalid_argument("slice size must be positive"));
        }

        let mut meta = SliceMeta::default();
        let names: Vec<String> = self
            .blobs
            .iter()
            .filter(|(_, data)| data.len() > slice_size)
            .map(|(name, _)| name.clone())
            .collect();
        for name in names {
            let Some(data) = self.blobs.remove(&name) else {
                continue;
            };
            let mut slice_num = 0;
            for chunk in data.chunks(slice_size) {
                self.blobs.insert(format!("{name}_{slice_num}"), chunk.to_vec());
                slice_num += 1;
            }
            meta.meta.push(SliceEntry {
                name,
                slice_num,
                total_len: data.len(),
            });
        }
        if !meta.meta.is_empty() {
            self.blobs.insert(SLICE_META.to_owned(), serde_json::to_vec(&meta)?);
        }
        Ok(())
    }

    /// Reassembles sliced blobs. A no-op when no slice metadata is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata is malformed, a slice is missing, or
    /// the reassembled length disagrees with the metadata.
    pub fn assemble(&mut self) -> CoreResult<()> {
        let Some(raw) = self.blobs.remove(SLICE_META) else {
            return Ok(());
        };
        let meta: SliceMeta = serde_json::from_slice(&raw)?;
        for entry in meta.meta {
            let mut data = Vec::with_capacity(entry.total_len);
            for i in 0..entry.slice_num {
                let key = format!("{}_{i}", entry.name);
                let slice = self
                    .blobs
                    .remove(&key)
                    .ok_or_else(|| CoreError::invalid_format(format!("missing slice {key}")))?;
                data.extend_from_slice(&slice);
            }
            if data.len() != entry.total_len {
                return Err(CoreError::invalid_format(format!(
                    "blob {} reassembled to {} bytes, expected {}",
                    entry.name,
                    data.len(),
                    entry.total_len
                )));
            }
            self.blobs.insert(entry.name, data);
        }
        Ok(())
    }

    /// Writes every blob as `<prefix>/<name>` and returns the paths.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails.
    pub fn write_to(&self, chunk_manager: &dyn ChunkManager, prefix: &str) -> CoreResult<Vec<String>> {
        let mut paths = Vec::with_capacity(self.blobs.len());
        for (name, data) in &self.blobs {
            let path = format!("{}/{name}", prefix.trim_end_matches('/'));
            chunk_manager.write(&path, data)?;
            paths.push(path);
        }
        Ok(paths)
    }

    /// Reads blobs from `paths`, naming each by its last path component.
    ///
    /// # Errors
    ///
    /// Returns an error if any read fails.
    pub fn read_from(chunk_manager: &dyn ChunkManager, paths: &[String]) -> CoreResult<Self> {
        let mut set = Self::new();
        for path in paths {
            let name = path.rsplit('/').next().unwrap_or(path);
            set.append(name, chunk_manager.read(path)?);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecseg_storage::InMemoryChunkManager;

    fn sample() -> BinarySet {
        let mut set = BinarySet::new();
        set.append("big", (0..=255u8).cycle().take(1000).collect());
        set.append("small", vec![1, 2, 3]);
        set
    }

    #[test]
    fn disassemble_then_assemble() {
        let original = sample();
        let mut set = original.clone();
        set.disassemble(&SerializeConfig::sliced(300)).unwrap();

        assert!(set.get("big").is_none());
        assert_eq!(set.get("big_3").unwrap().len(), 100);
        assert!(set.get(SLICE_META).is_some());
        assert_eq!(set.get("small").unwrap(), &[1, 2, 3]);

        set.assemble().unwrap();
        assert_eq!(set, original);
    }

    #[test]
    fn unsliced_config_is_noop() {
        let mut set = sample();
        set.disassemble(&SerializeConfig::default()).unwrap();
        assert_eq!(set, sample());
        set.assemble().unwrap();
        assert_eq!(set, sample());
    }

    #[test]
    fn missing_slice_is_an_error() {
        let mut set = sample();
        set.disassemble(&SerializeConfig::sliced(300)).unwrap();
        set.remove("big_1");
        assert!(matches!(set.assemble(), Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn zero_slice_size_rejected() {
        let mut set = sample();
        assert!(set.disassemble(&SerializeConfig::sliced(0)).is_err());
    }

    #[test]
    fn storage_round_trip() {
        let cm = InMemoryChunkManager::new();
        let set = sample();
        let paths = set.write_to(&cm, "index/7/").unwrap();
        assert_eq!(paths, vec!["index/7/big".to_string(), "index/7/small".to_string()]);
        assert_eq!(BinarySet::read_from(&cm, &paths).unwrap(), set);
    }
}
