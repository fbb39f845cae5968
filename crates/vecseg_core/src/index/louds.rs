//! Level-order unary degree sequence (LOUDS) trie.
//!
//! Nodes are numbered in breadth-first order with the root as node 0. The
//! tree shape is a bit string: a virtual super-root `10`, then for each node
//! one `1` per child followed by a `0`. Children of a node are consecutive
//! node ids, sorted by edge label, so a child lookup is a binary search over
//! a slice of `labels`.
//!
//! ```text
//! child_start(x) = rank1(select0(x + 1) + 1)   children of x: [child_start(x), child_start(x + 1))
//! parent(x)      = rank0(select1(x + 1)) - 1
//! key id         = rank1 over the terminal bits
//! ```
//!
//! ## Serialized layout (little-endian)
//!
//! ```text
//! | magic "VSTR" | version: u8 | node_count: u64 | key_count: u64 |
//! | louds_bits: u64 | louds words: u64 * ceil(louds_bits / 64) |
//! | labels: u8 * (node_count - 1) | terminal words: u64 * ceil(node_count / 64) |
//! ```

use crate::error::{CoreError, CoreResult};
use std::collections::VecDeque;

const TRIE_MAGIC: [u8; 4] = *b"VSTR";
const TRIE_VERSION: u8 = 1;

/// Bit vector with a rank directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BitVector {
    words: Vec<u64>,
    len: usize,
    // ones before each word
    ranks: Vec<usize>,
}

impl BitVector {
    fn from_bits(bits: &[bool]) -> Self {
        let mut words = vec![0u64; bits.len().div_ceil(64)];
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                words[i / 64] |= 1u64 << (i % 64);
            }
        }
        Self::from_words(words, bits.len())
    }

    fn from_words(words: Vec<u64>, len: usize) -> Self {
        let mut ranks = Vec::with_capacity(words.len() + 1);
        let mut acc = 0usize;
        for w in &words {
            ranks.push(acc);
            acc += w.count_ones() as usize;
        }
        ranks.push(acc);
        Self { words, len, ranks }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, pos: usize) -> bool {
        pos < self.len && self.words[pos / 64] & (1u64 << (pos % 64)) != 0
    }

    /// Ones in `[0, pos)`.
    fn rank1(&self, pos: usize) -> usize {
        let pos = pos.min(self.len);
        let word = pos / 64;
        let bit = pos % 64;
        let partial = if bit == 0 {
            0
        } else {
            (self.words[word] & ((1u64 << bit) - 1)).count_ones() as usize
        };
        self.ranks[word] + partial
    }

    fn rank0(&self, pos: usize) -> usize {
        pos.min(self.len) - self.rank1(pos)
    }

    /// Returns false if any bit past `len` is set in the last word.
    fn tail_is_clear(&self) -> bool {
        let bit = self.len % 64;
        bit == 0 || self.words.last().map_or(true, |w| w >> bit == 0)
    }

    fn count_ones(&self) -> usize {
        self.ranks.last().copied().unwrap_or(0)
    }

    /// Position of the `k`-th one, `k` starting at 1.
    fn select1(&self, k: usize) -> Option<usize> {
        self.select(k, |bv, w| bv.ranks[w], |word| word)
    }

    /// Position of the `k`-th zero, `k` starting at 1.
    fn select0(&self, k: usize) -> Option<usize> {
        self.select(k, |bv, w| w * 64 - bv.ranks[w], |word| !word)
    }

    fn select(
        &self,
        k: usize,
        before: impl Fn(&Self, usize) -> usize,
        flip: impl Fn(u64) -> u64,
    ) -> Option<usize> {
        if k == 0 || self.words.is_empty() {
            return None;
        }
        // last word whose preceding count is < k
        let (mut lo, mut hi) = (0usize, self.words.len());
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if before(self, mid) < k {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let mut remaining = k - before(self, lo);
        let mut word = flip(self.words[lo]);
        while word != 0 {
            let tz = word.trailing_zeros() as usize;
            remaining -= 1;
            if remaining == 0 {
                let pos = lo * 64 + tz;
                return (pos < self.len).then_some(pos);
            }
            word &= word - 1;
        }
        None
    }
}

/// Immutable succinct trie mapping byte strings to dense ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoudsTrie {
    louds: BitVector,
    labels: Vec<u8>,
    terminal: BitVector,
    node_count: usize,
}

impl LoudsTrie {
    /// Builds a trie over the distinct keys. Key order does not matter.
    pub(crate) fn build<K: AsRef<[u8]>>(keys: &[K]) -> Self {
        let mut sorted: Vec<&[u8]> = keys.iter().map(AsRef::as_ref).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut louds = vec![true, false];
        let mut labels = Vec::new();
        let mut terminal = Vec::new();

        // (lo, hi, depth): node covering sorted[lo..hi], all sharing a prefix of length depth
        let mut queue = VecDeque::from([(0usize, sorted.len(), 0usize)]);
        while let Some((lo, hi, depth)) = queue.pop_front() {
            let mut start = lo;
            let is_terminal = start < hi && sorted[start].len() == depth;
            terminal.push(is_terminal);
            if is_terminal {
                start += 1;
            }
            while start < hi {
                let label = sorted[start][depth];
                let mut end = start + 1;
                while end < hi && sorted[end][depth] == label {
                    end += 1;
                }
                louds.push(true);
                labels.push(label);
                queue.push_back((start, end, depth + 1));
                start = end;
            }
            louds.push(false);
        }

        let node_count = terminal.len();
        Self {
            louds: BitVector::from_bits(&louds),
            labels,
            terminal: BitVector::from_bits(&terminal),
            node_count,
        }
    }

    pub(crate) fn key_count(&self) -> usize {
        self.terminal.count_ones()
    }

    fn child_start(&self, node: usize) -> usize {
        self.louds
            .select0(node + 1)
            .map_or(self.node_count, |pos| self.louds.rank1(pos + 1))
    }

    fn child(&self, node: usize, label: u8) -> Option<usize> {
        let (lo, hi) = (self.child_start(node), self.child_start(node + 1));
        if lo >= hi {
            return None;
        }
        // labels[c - 1] is the edge into node c
        let slice = &self.labels[lo - 1..hi - 1];
        slice.binary_search(&label).ok().map(|i| lo + i)
    }

    fn descend(&self, key: &[u8]) -> Option<usize> {
        key.iter().try_fold(0usize, |node, &b| self.child(node, b))
    }

    /// Returns the id of `key`, if present.
    pub(crate) fn lookup(&self, key: &[u8]) -> Option<u64> {
        let node = self.descend(key)?;
        self.terminal
            .get(node)
            .then(|| self.terminal.rank1(node) as u64)
    }

    /// Returns the ids of every key starting with `prefix`.
    pub(crate) fn predictive_search(&self, prefix: &[u8]) -> Vec<u64> {
        let Some(node) = self.descend(prefix) else {
            return Vec::new();
        };
        let mut ids = Vec::new();
        // a subtree occupies one contiguous id range per level
        let (mut lo, mut hi) = (node, node + 1);
        while lo < hi {
            for n in lo..hi {
                if self.terminal.get(n) {
                    ids.push(self.terminal.rank1(n) as u64);
                }
            }
            let next = (self.child_start(lo), self.child_start(hi));
            lo = next.0;
            hi = next.1;
        }
        ids
    }

    fn parent(&self, node: usize) -> Option<usize> {
        let pos = self.louds.select1(node + 1)?;
        self.louds.rank0(pos).checked_sub(1)
    }

    /// Returns the key with the given id.
    pub(crate) fn reverse_lookup(&self, id: u64) -> Option<Vec<u8>> {
        let mut node = self.terminal.select1(usize::try_from(id).ok()? + 1)?;
        let mut key = Vec::new();
        while node > 0 {
            key.push(self.labels[node - 1]);
            node = self.parent(node)?;
        }
        key.reverse();
        Some(key)
    }

    /// Every node's parent precedes it and sibling labels strictly increase.
    fn check_shape(&self) -> CoreResult<()> {
        let mut prev: Option<(usize, u8)> = None;
        for node in 1..self.node_count {
            let parent = self.parent(node).filter(|&p| p < node).ok_or_else(|| {
                CoreError::invalid_format(format!("trie node {node} does not follow its parent"))
            })?;
            let label = self.labels[node - 1];
            if prev.is_some_and(|(p, l)| p == parent && l >= label) {
                return Err(CoreError::invalid_format(format!(
                    "trie node {node} breaks sibling label order"
                )));
            }
            prev = Some((parent, label));
        }
        Ok(())
    }

    pub(crate) fn heap_size(&self) -> usize {
        (self.louds.words.len() + self.terminal.words.len()) * 8 + self.labels.len()
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + self.heap_size());
        buf.extend_from_slice(&TRIE_MAGIC);
        buf.push(TRIE_VERSION);
        buf.extend_from_slice(&(self.node_count as u64).to_le_bytes());
        buf.extend_from_slice(&(self.key_count() as u64).to_le_bytes());
        buf.extend_from_slice(&(self.louds.len() as u64).to_le_bytes());
        for w in &self.louds.words {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        buf.extend_from_slice(&self.labels);
        for w in &self.terminal.words {
            buf.extend_from_slice(&w.to_le_bytes());
        }
        buf
    }

    pub(crate) fn from_bytes(data: &[u8]) -> CoreResult<Self> {
        let mut reader = Reader { data, pos: 0 };
        if reader.take(4)? != TRIE_MAGIC {
            return Err(CoreError::invalid_format("invalid trie magic"));
        }
        let version = reader.take(1)?[0];
        if version != TRIE_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported trie version: {version}"
            )));
        }
        let node_count = reader.len_field()?;
        let key_count = reader.len_field()?;
        let louds_bits = reader.len_field()?;
        if node_count == 0 || node_count.checked_mul(2).and_then(|n| n.checked_add(1)) != Some(louds_bits) {
            return Err(CoreError::invalid_format("inconsistent trie header"));
        }
        let louds_words = reader.words(louds_bits.div_ceil(64))?;
        let labels = reader.take(node_count - 1)?.to_vec();
        let terminal_words = reader.words(node_count.div_ceil(64))?;
        if reader.pos != data.len() {
            return Err(CoreError::invalid_format("trailing bytes after trie"));
        }

        let trie = Self {
            louds: BitVector::from_words(louds_words, louds_bits),
            labels,
            terminal: BitVector::from_words(terminal_words, node_count),
            node_count,
        };
        if !trie.louds.get(0) || trie.louds.get(1) {
            return Err(CoreError::invalid_format("missing trie super-root"));
        }
        if !trie.louds.tail_is_clear() || !trie.terminal.tail_is_clear() {
            return Err(CoreError::invalid_format("trie bits set past their length"));
        }
        if trie.key_count() != key_count || trie.louds.count_ones() != node_count {
            return Err(CoreError::invalid_format("trie counts do not match header"));
        }
        trie.check_shape()?;
        Ok(trie)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| CoreError::invalid_format("truncated trie"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u64(&mut self) -> CoreResult<u64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(b))
    }

    fn len_field(&mut self) -> CoreResult<usize> {
        usize::try_from(self.u64()?).map_err(|_| CoreError::invalid_format("trie length overflow"))
    }

    fn words(&mut self, n: usize) -> CoreResult<Vec<u64>> {
        let bytes = self.take(n.checked_mul(8).ok_or_else(|| CoreError::invalid_format("trie length overflow"))?)?;
        Ok(bytes
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                u64::from_le_bytes(b)
            })
            .collect())
    }
}
