//! Brute-force vector index.

use crate::config::SerializeConfig;
use crate::error::{CoreError, CoreResult};
use crate::index::binary_set::BinarySet;
use crate::index::SerializableIndex;
use crate::metric::{brute_force_search, MetricType};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use vecseg_codec::{decode_column, encode_column, DataType, Endian, FieldValues};

/// Blob name of the index metadata.
pub const FLAT_META_BLOB: &str = "flat_meta";
/// Blob name of the raw vectors.
pub const FLAT_VECTORS_BLOB: &str = "flat_vectors";

#[derive(Debug, Serialize, Deserialize)]
struct FlatMeta {
    metric: MetricType,
    data_type: DataType,
    dim: usize,
    rows: usize,
}

/// Vector index that owns a copy of its vectors and scans them exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    metric: MetricType,
    vectors: FieldValues,
}

impl FlatIndex {
    /// Builds an index over a vector column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is not a vector column the metric
    /// applies to.
    pub fn build(metric: MetricType, vectors: FieldValues) -> CoreResult<Self> {
        if !metric.supports(vectors.data_type()) {
            return Err(CoreError::invalid_argument(format!(
                "metric {metric} does not apply to {}",
                vectors.data_type()
            )));
        }
        Ok(Self { metric, vectors })
    }

    /// An empty index, filled by [`SerializableIndex::load`].
    #[must_use]
    pub fn empty(metric: MetricType) -> Self {
        let vectors = match metric {
            MetricType::L2 | MetricType::IP => FieldValues::FloatVector {
                dim: 0,
                data: Vec::new(),
            },
            MetricType::Hamming | MetricType::Jaccard => FieldValues::BinaryVector {
                dim: 0,
                data: Vec::new(),
            },
        };
        Self { metric, vectors }
    }

    /// Metric the index ranks by.
    #[must_use]
    pub fn metric(&self) -> MetricType {
        self.metric
    }

    /// Vector type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.vectors.data_type()
    }

    /// Vector dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.vectors.dim()
    }

    /// Approximate heap bytes held by the index.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        self.vectors.heap_size()
    }

    /// Returns the `topk` best rows per query among `candidates`, best-first.
    ///
    /// # Errors
    ///
    /// Returns an error if the queries do not match the indexed vectors.
    pub fn search(
        &self,
        queries: &FieldValues,
        topk: usize,
        candidates: &RoaringBitmap,
    ) -> CoreResult<Vec<Vec<(u32, f32)>>> {
        brute_force_search(self.metric, queries, &self.vectors, candidates, topk)
    }
}

impl SerializableIndex for FlatIndex {
    fn serialize(&self, config: &SerializeConfig) -> CoreResult<BinarySet> {
        let meta = FlatMeta {
            metric: self.metric,
            data_type: self.vectors.data_type(),
            dim: self.vectors.dim(),
            rows: self.vectors.len(),
        };
        let mut set = BinarySet::new();
        set.append(FLAT_META_BLOB, serde_json::to_vec(&meta)?);
        set.append(FLAT_VECTORS_BLOB, encode_column(&self.vectors, Endian::Little));
        set.disassemble(config)?;
        Ok(set)
    }

    fn load(&mut self, mut set: BinarySet) -> CoreResult<()> {
        set.assemble()?;
        let meta: FlatMeta = serde_json::from_slice(set.require(FLAT_META_BLOB)?)?;
        if !meta.metric.supports(meta.data_type) {
            return Err(CoreError::invalid_format(format!(
                "flat index metric {} does not apply to {}",
                meta.metric, meta.data_type
            )));
        }
        let vectors = decode_column(
            meta.data_type,
            meta.dim,
            set.require(FLAT_VECTORS_BLOB)?,
            Endian::Little,
        )?;
        if vectors.len() != meta.rows {
            return Err(CoreError::invalid_format(format!(
                "flat index holds {} rows, header says {}",
                vectors.len(),
                meta.rows
            )));
        }
        self.metric = meta.metric;
        self.vectors = vectors;
        Ok(())
    }

    fn count(&self) -> usize {
        self.vectors.len()
    }
}
