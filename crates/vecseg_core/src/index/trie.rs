//! Scalar string index backed by a succinct trie.
//!
//! Each distinct string gets a dense id from the trie. `string_ids[row]` is
//! the id of the value at that row; `id_to_offsets` is the inverse and is
//! always re-derived from `string_ids`, never persisted.
//!
//! The serialized form is a pair of blobs that must travel together:
//!
//! ```text
//! "string_trie_index"   trie bytes (see the LOUDS layout)
//! "string_trie_ids"     string_ids as u64 little-endian, one per row
//! ```

use crate::config::SerializeConfig;
use crate::error::{CoreError, CoreResult};
use crate::index::binary_set::BinarySet;
use crate::index::louds::LoudsTrie;
use crate::index::SerializableIndex;
use roaring::RoaringBitmap;
use std::ops::Bound;
use tracing::debug;

/// Blob name of the trie structure.
pub const TRIE_INDEX_BLOB: &str = "string_trie_index";
/// Blob name of the row-to-id table.
pub const TRIE_IDS_BLOB: &str = "string_trie_ids";

/// Immutable string index answering equality and prefix predicates.
///
/// `build` and `load` take `&mut self`; every query takes `&self` and is safe
/// to call concurrently afterwards.
#[derive(Debug, Clone, Default)]
pub struct StringTrieIndex {
    trie: Option<LoudsTrie>,
    string_ids: Vec<u64>,
    id_to_offsets: Vec<Vec<u32>>,
}

impl StringTrieIndex {
    /// Creates an empty, unbuilt index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once `build` or `load` has completed.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.trie.is_some()
    }

    /// Builds the index over `values`, one per row, preserving row order.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyBuilt` on a second call, or `InvalidArgument` if the
    /// row count does not fit a bitmap.
    pub fn build<S: AsRef<str>>(&mut self, values: &[S]) -> CoreResult<()> {
        if self.trie.is_some() {
            return Err(CoreError::AlreadyBuilt);
        }
        check_row_count(values.len())?;

        let bytes: Vec<&[u8]> = values.iter().map(|v| v.as_ref().as_bytes()).collect();
        let trie = LoudsTrie::build(&bytes);
        let string_ids = bytes
            .iter()
            .map(|b| {
                trie.lookup(b)
                    .ok_or_else(|| CoreError::invalid_format("built trie is missing a key"))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        debug!(rows = values.len(), keys = trie.key_count(), "built string trie index");
        self.install(trie, string_ids);
        Ok(())
    }

    fn install(&mut self, trie: LoudsTrie, string_ids: Vec<u64>) {
        let mut id_to_offsets = vec![Vec::new(); trie.key_count()];
        for (offset, &id) in string_ids.iter().enumerate() {
            // ids are validated against key_count before install
            id_to_offsets[id as usize].push(offset as u32);
        }
        self.trie = Some(trie);
        self.string_ids = string_ids;
        self.id_to_offsets = id_to_offsets;
    }

    fn trie(&self) -> CoreResult<&LoudsTrie> {
        self.trie
            .as_ref()
            .ok_or_else(|| CoreError::invalid_argument("string index is not built"))
    }

    /// Number of rows indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.string_ids.len()
    }

    /// Returns true if no rows are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.string_ids.is_empty()
    }

    /// Number of distinct strings.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.trie.as_ref().map_or(0, LoudsTrie::key_count)
    }

    /// Trie id of the value at `row`.
    #[must_use]
    pub fn string_id(&self, row: usize) -> Option<u64> {
        self.string_ids.get(row).copied()
    }

    /// The string with trie id `id`.
    #[must_use]
    pub fn reverse_lookup(&self, id: u64) -> Option<String> {
        let bytes = self.trie.as_ref()?.reverse_lookup(id)?;
        String::from_utf8(bytes).ok()
    }

    /// The string stored at `row`.
    #[must_use]
    pub fn value_at(&self, row: usize) -> Option<String> {
        self.reverse_lookup(self.string_id(row)?)
    }

    fn mark(&self, bitmap: &mut RoaringBitmap, id: u64) {
        if let Some(offsets) = usize::try_from(id).ok().and_then(|i| self.id_to_offsets.get(i)) {
            bitmap.extend(offsets.iter().copied());
        }
    }

    /// Rows whose value equals any of `values`. Unknown values match nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is not built.
    pub fn in_values<S: AsRef<str>>(&self, values: &[S]) -> CoreResult<RoaringBitmap> {
        let trie = self.trie()?;
        let mut bitmap = RoaringBitmap::new();
        for v in values {
            if let Some(id) = trie.lookup(v.as_ref().as_bytes()) {
                self.mark(&mut bitmap, id);
            }
        }
        Ok(bitmap)
    }

    /// Complement of [`StringTrieIndex::in_values`] over all rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is not built.
    pub fn not_in<S: AsRef<str>>(&self, values: &[S]) -> CoreResult<RoaringBitmap> {
        let matched = self.in_values(values)?;
        let mut all = RoaringBitmap::new();
        all.insert_range(0..self.len() as u32);
        Ok(all - matched)
    }

    /// Rows whose value starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is not built.
    pub fn prefix_match(&self, prefix: &str) -> CoreResult<RoaringBitmap> {
        let trie = self.trie()?;
        let mut bitmap = RoaringBitmap::new();
        for id in trie.predictive_search(prefix.as_bytes()) {
            self.mark(&mut bitmap, id);
        }
        Ok(bitmap)
    }

    /// Ordered range queries are not supported: trie ids carry no value
    /// ordering.
    ///
    /// # Errors
    ///
    /// Always returns `Unimplemented`.
    pub fn range(&self, _lower: Bound<&str>, _upper: Bound<&str>) -> CoreResult<RoaringBitmap> {
        Err(CoreError::unimplemented("range query on string trie index"))
    }

    /// Approximate heap bytes held by the index.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        self.trie.as_ref().map_or(0, LoudsTrie::heap_size)
            + self.string_ids.len() * 8
            + self.string_ids.len() * 4
    }
}

fn check_row_count(rows: usize) -> CoreResult<()> {
    if rows as u64 > u64::from(u32::MAX) {
        return Err(CoreError::invalid_argument(format!(
            "{rows} rows exceed the bitmap universe"
        )));
    }
    Ok(())
}

impl SerializableIndex for StringTrieIndex {
    fn serialize(&self, config: &SerializeConfig) -> CoreResult<BinarySet> {
        let trie = self.trie()?;
        let mut ids = Vec::with_capacity(self.string_ids.len() * 8);
        for id in &self.string_ids {
            ids.extend_from_slice(&id.to_le_bytes());
        }
        let mut set = BinarySet::new();
        set.append(TRIE_INDEX_BLOB, trie.to_bytes());
        set.append(TRIE_IDS_BLOB, ids);
        set.disassemble(config)?;
        Ok(set)
    }

    fn load(&mut self, mut set: BinarySet) -> CoreResult<()> {
        set.assemble()?;
        let trie = LoudsTrie::from_bytes(set.require(TRIE_INDEX_BLOB)?)?;
        let raw = set.require(TRIE_IDS_BLOB)?;
        if raw.len() % 8 != 0 {
            return Err(CoreError::invalid_format(format!(
                "string id table length {} is not a multiple of 8",
                raw.len()
            )));
        }
        let key_count = trie.key_count() as u64;
        let string_ids = raw
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                let id = u64::from_le_bytes(b);
                if id < key_count {
                    Ok(id)
                } else {
                    Err(CoreError::invalid_format(format!(
                        "string id {id} out of range for {key_count} keys"
                    )))
                }
            })
            .collect::<CoreResult<Vec<_>>>()?;
        check_row_count(string_ids.len())?;

        debug!(rows = string_ids.len(), keys = key_count, "loaded string trie index");
        self.install(trie, string_ids);
        Ok(())
    }

    fn count(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn built(values: &[&str]) -> StringTrieIndex {
        let mut index = StringTrieIndex::new();
        index.build(values).unwrap();
        index
    }

    fn rows(bitmap: &RoaringBitmap) -> Vec<u32> {
        bitmap.iter().collect()
    }

    #[test]
    fn build_twice_fails() {
        let mut index = built(&["a"]);
        assert!(matches!(index.build(&["b"]), Err(CoreError::AlreadyBuilt)));
    }

    #[test]
    fn duplicates_share_one_id() {
        let index = built(&["x", "y", "x", "x"]);
        assert_eq!(index.len(), 4);
        assert_eq!(index.key_count(), 2);
        assert_eq!(index.string_id(0), index.string_id(2));
        assert_ne!(index.string_id(0), index.string_id(1));
        assert_eq!(index.value_at(3).as_deref(), Some("x"));
    }

    #[test]
    fn in_and_not_in() {
        let index = built(&["a", "b", "c", "a", "d"]);
        assert_eq!(rows(&index.in_values(&["a", "d", "zz"]).unwrap()), vec![0, 3, 4]);
        assert_eq!(rows(&index.not_in(&["a", "d", "zz"]).unwrap()), vec![1, 2]);
        assert!(index.in_values::<&str>(&[]).unwrap().is_empty());
        assert_eq!(index.not_in::<&str>(&[]).unwrap().len(), 5);
    }

    #[test]
    fn prefix_match() {
        let index = built(&["hello", "help", "world", "he", "hello"]);
        assert_eq!(rows(&index.prefix_match("hel").unwrap()), vec![0, 1, 4]);
        assert_eq!(rows(&index.prefix_match("").unwrap()), vec![0, 1, 2, 3, 4]);
        assert!(index.prefix_match("x").unwrap().is_empty());
    }

    #[test]
    fn range_is_unimplemented() {
        let index = built(&["a"]);
        assert!(matches!(
            index.range(Bound::Included("a"), Bound::Unbounded),
            Err(CoreError::Unimplemented { .. })
        ));
    }

    #[test]
    fn queries_before_build_fail() {
        let index = StringTrieIndex::new();
        assert!(index.in_values(&["a"]).is_err());
        assert!(index.serialize(&SerializeConfig::default()).is_err());
    }

    #[test]
    fn load_rejects_bad_id_table() {
        let index = built(&["a", "b"]);
        let mut set = index.serialize(&SerializeConfig::default()).unwrap();
        set.append(TRIE_IDS_BLOB, 7u64.to_le_bytes().to_vec());
        assert!(StringTrieIndex::new().load(set.clone()).is_err());
        set.append(TRIE_IDS_BLOB, vec![0; 5]);
        assert!(StringTrieIndex::new().load(set).is_err());
    }

    #[test]
    fn load_requires_both_blobs() {
        let index = built(&["a", "b"]);
        let mut set = index.serialize(&SerializeConfig::default()).unwrap();
        set.remove(TRIE_IDS_BLOB);
        assert!(matches!(
            StringTrieIndex::new().load(set),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn sliced_round_trip() {
        let values: Vec<String> = (0..300).map(|i| format!("v{}", i % 37)).collect();
        let mut index = StringTrieIndex::new();
        index.build(&values).unwrap();
        let set = index.serialize(&SerializeConfig::sliced(64)).unwrap();
        assert!(set.len() > 2);

        let mut loaded = StringTrieIndex::new();
        loaded.load(set).unwrap();
        assert!(matches!(loaded.build(&["x"]), Err(CoreError::AlreadyBuilt)));
        assert_eq!(loaded.in_values(&["v3"]).unwrap(), index.in_values(&["v3"]).unwrap());
    }

    proptest! {
        #[test]
        fn load_of_serialize_answers_identically(
            values in prop::collection::vec("[a-c]{0,4}", 0..64),
            probes in prop::collection::vec("[a-c]{0,3}", 0..8),
        ) {
            let mut index = StringTrieIndex::new();
            index.build(&values).unwrap();
            let mut loaded = StringTrieIndex::new();
            loaded.load(index.serialize(&SerializeConfig::default()).unwrap()).unwrap();

            prop_assert_eq!(loaded.in_values(&probes).unwrap(), index.in_values(&probes).unwrap());
            prop_assert_eq!(loaded.not_in(&probes).unwrap(), index.not_in(&probes).unwrap());
            for p in &probes {
                prop_assert_eq!(loaded.prefix_match(p).unwrap(), index.prefix_match(p).unwrap());
            }
        }

        #[test]
        fn in_matches_linear_scan(
            values in prop::collection::vec("[ab]{0,3}", 0..48),
            probe in "[ab]{0,3}",
        ) {
            let mut index = StringTrieIndex::new();
            index.build(&values).unwrap();
            let expected: Vec<u32> = values
                .iter()
                .enumerate()
                .filter(|(_, v)| **v == probe)
                .map(|(i, _)| i as u32)
                .collect();
            prop_assert_eq!(rows(&index.in_values(&[probe.as_str()]).unwrap()), expected);

            let expected_prefix: Vec<u32> = values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.starts_with(probe.as_str()))
                .map(|(i, _)| i as u32)
                .collect();
            prop_assert_eq!(rows(&index.prefix_match(&probe).unwrap()), expected_prefix);
        }
    }
}
