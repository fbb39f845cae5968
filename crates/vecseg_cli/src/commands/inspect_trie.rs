//! Inspect-trie command implementation.

use super::read_file;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};
use vecseg_core::index::{TRIE_IDS_BLOB, TRIE_INDEX_BLOB};
use vecseg_core::{BinarySet, SerializableIndex, StringTrieIndex};

/// Rows printed per query before the list is truncated.
const MAX_LISTED_ROWS: usize = 32;

/// Result of one membership query.
#[derive(Debug, Serialize)]
pub struct QueryReport {
    /// Human-readable query.
    pub query: String,
    /// Number of matching rows.
    pub matched: u64,
    /// First matching rows, ascending.
    pub rows: Vec<u32>,
}

/// Trie inspection result.
#[derive(Debug, Serialize)]
pub struct TrieReport {
    /// Trie blob path.
    pub trie_path: String,
    /// Rows indexed.
    pub rows: usize,
    /// Distinct strings.
    pub distinct_values: usize,
    /// Estimated heap bytes once loaded.
    pub heap_size: usize,
    /// Query results, if any were requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<QueryReport>,
}

impl fmt::Display for TrieReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trie Index: {}", self.trie_path)?;
        writeln!(f, "  Rows:            {}", self.rows)?;
        writeln!(f, "  Distinct values: {}", self.distinct_values)?;
        write!(f, "  Heap size:       {} bytes", self.heap_size)?;
        for q in &self.queries {
            write!(f, "\n  {} -> {} rows {:?}", q.query, q.matched, q.rows)?;
            if q.matched as usize > q.rows.len() {
                write!(f, " ...")?;
            }
        }
        Ok(())
    }
}

fn query_report(query: String, rows: impl IntoIterator<Item = u32>, matched: u64) -> QueryReport {
    QueryReport {
        query,
        matched,
        rows: rows.into_iter().take(MAX_LISTED_ROWS).collect(),
    }
}

/// Runs the inspect-trie command.
pub fn run(
    trie_path: &Path,
    ids_path: &Path,
    prefix: Option<&str>,
    in_values: &[String],
) -> Result<TrieReport, Box<dyn std::error::Error>> {
    let mut set = BinarySet::new();
    set.append(TRIE_INDEX_BLOB, read_file(trie_path)?);
    set.append(TRIE_IDS_BLOB, read_file(ids_path)?);
    debug!(bytes = set.total_size(), "read trie blobs");

    let mut index = StringTrieIndex::new();
    index.load(set)?;
    info!(rows = index.count(), "loaded trie index");

    let mut queries = Vec::new();
    if let Some(prefix) = prefix {
        let bitmap = index.prefix_match(prefix)?;
        queries.push(query_report(format!("prefix {prefix:?}"), bitmap.iter(), bitmap.len()));
    }
    if !in_values.is_empty() {
        let bitmap = index.in_values(in_values)?;
        queries.push(query_report(format!("in {in_values:?}"), bitmap.iter(), bitmap.len()));
    }

    Ok(TrieReport {
        trie_path: trie_path.display().to_string(),
        rows: index.len(),
        distinct_values: index.key_count(),
        heap_size: index.heap_size(),
        queries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecseg_core::SerializeConfig;

    #[test]
    fn queries_a_serialized_trie() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = StringTrieIndex::new();
        index.build(&["red", "green", "blue", "green", "grey"]).unwrap();
        let set = index.serialize(&SerializeConfig::default()).unwrap();
        let trie = dir.path().join("trie");
        let ids = dir.path().join("ids");
        std::fs::write(&trie, set.get(TRIE_INDEX_BLOB).unwrap()).unwrap();
        std::fs::write(&ids, set.get(TRIE_IDS_BLOB).unwrap()).unwrap();

        let report = run(&trie, &ids, Some("gr"), &["red".to_string(), "pink".to_string()]).unwrap();
        assert_eq!(report.rows, 5);
        assert_eq!(report.distinct_values, 4);
        assert_eq!(report.queries[0].rows, vec![1, 3, 4]);
        assert_eq!(report.queries[1].matched, 1);
        assert!(report.to_string().contains("Distinct values: 4"));
    }

    #[test]
    fn rejects_swapped_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = StringTrieIndex::new();
        index.build(&["a"]).unwrap();
        let set = index.serialize(&SerializeConfig::default()).unwrap();
        let trie = dir.path().join("trie");
        let ids = dir.path().join("ids");
        std::fs::write(&trie, set.get(TRIE_INDEX_BLOB).unwrap()).unwrap();
        std::fs::write(&ids, set.get(TRIE_IDS_BLOB).unwrap()).unwrap();
        assert!(run(&ids, &trie, None, &[]).is_err());
    }
}
