//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use crate::fixtures::{RowBatch, DEFAULT_DIM};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vecseg_core::{PrimaryKey, Timestamp};

/// Strategy for generating primary keys of either kind.
pub fn primary_key_strategy() -> impl Strategy<Value = PrimaryKey> {
    prop_oneof![
        any::<i64>().prop_map(PrimaryKey::Int64),
        "[a-z0-9]{0,12}".prop_map(PrimaryKey::VarChar),
    ]
}

/// Strategy for short strings drawn from a small alphabet, so that
/// duplicates and shared prefixes are common.
pub fn trie_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[abc]{0,5}").expect("Invalid regex")
}

/// Strategy for a column of trie values.
pub fn trie_column_strategy(max_rows: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(trie_value_strategy(), 0..max_rows)
}

/// Strategy for a float vector of the default dimension.
pub fn float_vector_strategy() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-100.0f32..100.0, DEFAULT_DIM)
}

/// Strategy for a batch of distinct keys.
pub fn row_batch_strategy(max_rows: usize) -> impl Strategy<Value = RowBatch> {
    prop::collection::btree_set(0i64..10_000, 1..max_rows.max(2))
        .prop_map(|keys| RowBatch::from_pks(keys.into_iter().collect()))
}

/// A mutation applied to a growing segment.
#[derive(Debug, Clone)]
pub enum SegmentOperation {
    /// Insert rows with these keys.
    Insert {
        /// Keys to insert.
        pks: Vec<i64>,
    },
    /// Delete these keys.
    Delete {
        /// Keys to delete.
        pks: Vec<i64>,
    },
}

/// Strategy for generating a single operation over a small key space.
pub fn segment_operation_strategy() -> impl Strategy<Value = SegmentOperation> {
    let keys = || prop::collection::vec(0i64..32, 1..6);
    prop_oneof![
        3 => keys().prop_map(|pks| SegmentOperation::Insert { pks }),
        1 => keys().prop_map(|pks| SegmentOperation::Delete { pks }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn segment_operations_strategy(max_ops: usize) -> impl Strategy<Value = Vec<SegmentOperation>> {
    prop::collection::vec(segment_operation_strategy(), 1..max_ops)
}

/// Strategy for strictly increasing timestamps, one per operation.
pub fn timestamps_strategy(len: usize) -> impl Strategy<Value = Vec<Timestamp>> {
    prop::collection::vec(1u64..10, len).prop_map(|steps| {
        steps
            .into_iter()
            .scan(0u64, |ts, step| {
                *ts += step;
                Some(*ts)
            })
            .collect()
    })
}

/// `n` seeded random vectors of dimension `dim`.
pub fn random_vectors(seed: u64, n: usize, dim: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect()
}

/// `n` seeded random strings over `alphabet`, each at most `max_len` long.
pub fn random_strings(seed: u64, n: usize, alphabet: &[u8], max_len: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let len = rng.gen_range(0..=max_len);
            (0..len)
                .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
                .collect()
        })
        .collect()
}

/// Proptest configuration for tests.
pub struct PropTestConfig {
    /// Number of test cases.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 64,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a config for quick tests.
    pub fn quick() -> Self {
        Self {
            cases: 16,
            max_shrink_iters: 100,
        }
    }

    /// Creates a config for thorough tests.
    pub fn thorough() -> Self {
        Self {
            cases: 1000,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_generators_are_reproducible() {
        assert_eq!(random_vectors(7, 3, 4), random_vectors(7, 3, 4));
        let strings = random_strings(7, 20, b"ab", 3);
        assert_eq!(strings, random_strings(7, 20, b"ab", 3));
        assert!(strings.iter().all(|s| s.len() <= 3 && s.chars().all(|c| c == 'a' || c == 'b')));
    }

    proptest! {
        #[test]
        fn timestamps_increase(ts in timestamps_strategy(10)) {
            prop_assert!(ts.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn batches_have_distinct_keys(batch in row_batch_strategy(20)) {
            let mut keys = batch.pks.clone();
            keys.dedup();
            prop_assert_eq!(keys.len(), batch.len());
            prop_assert_eq!(batch.vectors.len(), batch.len());
        }
    }
}
