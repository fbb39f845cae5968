//! Bloom filter over primary-key bytes.
//!
//! Keys are hashed once with XXH3-128; the two 64-bit halves drive
//! enhanced double hashing to derive probe positions. The filter is
//! append-only: there is no removal, so false positives only accumulate.

use xxhash_rust::xxh3::xxh3_128;

/// Approximate membership over byte strings. No false negatives.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: usize,
    num_hashes: usize,
}

fn probe_positions(key: &[u8], num_hashes: usize, num_bits: usize) -> impl Iterator<Item = usize> {
    let hash = xxh3_128(key);
    let h1 = hash as u64;
    // odd, so it is coprime with any power-of-two modulus
    let h2 = ((hash >> 64) as u64) | 1;
    (0..num_hashes as u64).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % num_bits as u64) as usize)
}

impl BloomFilter {
    /// Creates a filter sized for `capacity` keys at the given false-positive
    /// rate.
    ///
    /// The bit count is rounded up to a whole number of 64-bit words with a
    /// minimum of one word. Out-of-range rates are clamped.
    #[must_use]
    pub fn with_rate(capacity: usize, false_positive_rate: f64) -> Self {
        let n = capacity.max(1) as f64;
        let p = false_positive_rate.clamp(1e-9, 0.5);
        let ln2 = std::f64::consts::LN_2;
        let raw_bits = (-n * p.ln() / (ln2 * ln2)).ceil() as usize;
        let num_bits = (raw_bits.max(64) + 63) & !63;
        let num_hashes = ((num_bits as f64 / n) * ln2).round().max(1.0) as usize;
        Self {
            bits: vec![0u64; num_bits / 64],
            num_bits,
            num_hashes,
        }
    }

    /// Adds a key.
    pub fn insert(&mut self, key: &[u8]) {
        for pos in probe_positions(key, self.num_hashes, self.num_bits) {
            self.bits[pos / 64] |= 1u64 << (pos % 64);
        }
    }

    /// Returns `false` if the key was definitely never inserted.
    #[must_use]
    pub fn may_contain(&self, key: &[u8]) -> bool {
        probe_positions(key, self.num_hashes, self.num_bits)
            .all(|pos| self.bits[pos / 64] & (1u64 << (pos % 64)) != 0)
    }

    /// Number of bits in the filter.
    #[must_use]
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Number of probes per key.
    #[must_use]
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    /// Heap bytes held by the bit vector.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        self.bits.len() * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sizing_for_default_parameters() {
        let bf = BloomFilter::with_rate(100_000, 0.005);
        // -n ln p / ln^2 2 ~= 11.03 bits per key, ~7.6 probes
        assert!(bf.num_bits() > 1_100_000 && bf.num_bits() < 1_110_000);
        assert_eq!(bf.num_bits() % 64, 0);
        assert!((7..=8).contains(&bf.num_hashes()));
    }

    #[test]
    fn empty_filter_contains_nothing() {
        let bf = BloomFilter::with_rate(10, 0.01);
        for i in 0u64..100 {
            assert!(!bf.may_contain(&i.to_le_bytes()));
        }
    }

    #[test]
    fn no_false_negatives() {
        let mut bf = BloomFilter::with_rate(1000, 0.005);
        for i in 0u64..1000 {
            bf.insert(&i.to_le_bytes());
        }
        for i in 0u64..1000 {
            assert!(bf.may_contain(&i.to_le_bytes()), "false negative for {i}");
        }
    }

    #[test]
    fn false_positive_rate_near_target() {
        let mut bf = BloomFilter::with_rate(10_000, 0.01);
        for i in 0u64..10_000 {
            bf.insert(&i.to_le_bytes());
        }
        let fp = (10_000u64..110_000)
            .filter(|i| bf.may_contain(&i.to_le_bytes()))
            .count();
        let rate = fp as f64 / 100_000.0;
        assert!(rate < 0.03, "false positive rate {rate}");
    }

    #[test]
    fn degenerate_parameters() {
        let bf = BloomFilter::with_rate(0, 2.0);
        assert_eq!(bf.num_bits(), 64);
        assert!(bf.num_hashes() >= 1);
    }

    proptest! {
        #[test]
        fn reinsert_keeps_membership(keys in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 1..64)) {
            let mut bf = BloomFilter::with_rate(128, 0.005);
            for k in &keys {
                bf.insert(k);
            }
            let before: Vec<bool> = (0u32..256).map(|i| bf.may_contain(&i.to_be_bytes())).collect();
            for k in &keys {
                bf.insert(k);
            }
            for k in &keys {
                prop_assert!(bf.may_contain(k));
            }
            let after: Vec<bool> = (0u32..256).map(|i| bf.may_contain(&i.to_be_bytes())).collect();
            prop_assert_eq!(before, after);
        }
    }
}
