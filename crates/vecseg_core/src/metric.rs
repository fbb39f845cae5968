//! Vector similarity metrics and brute-force top-k.

use crate::error::{CoreError, CoreResult};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use vecseg_codec::{DataType, FieldValues};

/// Distance or similarity measure between two vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricType {
    /// Squared Euclidean distance; smaller is better.
    L2,
    /// Inner product; larger is better.
    IP,
    /// Differing bits; smaller is better.
    Hamming,
    /// Jaccard distance over set bits; smaller is better.
    Jaccard,
}

impl MetricType {
    /// Returns true if larger scores rank first.
    #[must_use]
    pub const fn larger_is_better(self) -> bool {
        matches!(self, Self::IP)
    }

    /// Returns true if the metric applies to vectors of `data_type`.
    #[must_use]
    pub const fn supports(self, data_type: DataType) -> bool {
        match self {
            Self::L2 | Self::IP => matches!(data_type, DataType::FloatVector),
            Self::Hamming | Self::Jaccard => matches!(data_type, DataType::BinaryVector),
        }
    }

    /// Orders two scores best-first.
    #[must_use]
    pub fn rank(self, a: f32, b: f32) -> Ordering {
        if self.larger_is_better() {
            b.total_cmp(&a)
        } else {
            a.total_cmp(&b)
        }
    }

    fn score_binary(self, query: &[u8], base: &[u8]) -> f32 {
        let (mut and, mut or, mut xor) = (0u32, 0u32, 0u32);
        for (q, b) in query.iter().zip(base) {
            and += (q & b).count_ones();
            or += (q | b).count_ones();
            xor += (q ^ b).count_ones();
        }
        match self {
            Self::Jaccard if or == 0 => 0.0,
            Self::Jaccard => 1.0 - and as f32 / or as f32,
            _ => xor as f32,
        }
    }

    fn score_float(self, query: &[f32], base: &[f32]) -> f32 {
        match self {
            Self::IP => query.iter().zip(base).map(|(q, b)| q * b).sum(),
            _ => query.iter().zip(base).map(|(q, b)| (q - b) * (q - b)).sum(),
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::L2 => "L2",
            Self::IP => "IP",
            Self::Hamming => "HAMMING",
            Self::Jaccard => "JACCARD",
        })
    }
}

impl FromStr for MetricType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "L2" => Ok(Self::L2),
            "IP" => Ok(Self::IP),
            "HAMMING" => Ok(Self::Hamming),
            "JACCARD" => Ok(Self::Jaccard),
            _ => Err(CoreError::invalid_argument(format!("unknown metric type {s}"))),
        }
    }
}

/// Rounds `score` to `round_decimal` places; negative means no rounding.
#[must_use]
pub fn round_score(score: f32, round_decimal: i64) -> f32 {
    if round_decimal < 0 {
        return score;
    }
    let factor = 10f64.powi(round_decimal.min(10) as i32);
    ((f64::from(score) * factor).round() / factor) as f32
}

/// Scores every candidate row of `base` against each query and keeps the
/// best `topk` per query, best-first. Ties rank the lower row first.
///
/// # Errors
///
/// Returns an error if queries and base differ in type or dimension, or the
/// metric does not apply to the vector type.
pub(crate) fn brute_force_search(
    metric: MetricType,
    queries: &FieldValues,
    base: &FieldValues,
    candidates: &RoaringBitmap,
    topk: usize,
) -> CoreResult<Vec<Vec<(u32, f32)>>> {
    let data_type = base.data_type();
    if !metric.supports(data_type) {
        return Err(CoreError::invalid_argument(format!(
            "metric {metric} does not apply to {data_type}"
        )));
    }
    if queries.data_type() != data_type || queries.dim() != base.dim() {
        return Err(CoreError::invalid_argument(format!(
            "query vectors {}(dim {}) do not match field {}(dim {})",
            queries.data_type(),
            queries.dim(),
            data_type,
            base.dim()
        )));
    }

    let rows = base.len();
    let mut results = Vec::with_capacity(queries.len());
    for q in 0..queries.len() {
        let mut scored: Vec<(u32, f32)> = candidates
            .iter()
            .take_while(|&row| (row as usize) < rows)
            .filter_map(|row| {
                let r = row as usize;
                let score = match (queries, base) {
                    (FieldValues::FloatVector { .. }, FieldValues::FloatVector { .. }) => {
                        metric.score_float(queries.float_vector(q)?, base.float_vector(r)?)
                    }
                    _ => metric.score_binary(queries.binary_vector(q)?, base.binary_vector(r)?),
                };
                Some((row, score))
            })
            .collect();
        scored.sort_by(|a, b| metric.rank(a.1, b.1).then(a.0.cmp(&b.0)));
        scored.truncate(topk);
        results.push(scored);
    }
    Ok(results)
}
