//! Compiled query plans and their results.
//!
//! Plans are produced by an external compiler and consumed read-only. A
//! predicate is a boolean expression tree over scalar fields; leaves are
//! evaluated per column into row bitmaps and combined with set algebra.

use crate::error::{CoreError, CoreResult};
use crate::metric::MetricType;
use crate::primary_key::PrimaryKey;
use crate::types::Timestamp;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use vecseg_codec::{FieldData, FieldId, FieldValues};

/// A literal in a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal, compared against any integer or float column.
    Int64(i64),
    /// Float literal, compared against any numeric column.
    Double(f64),
    /// String literal.
    VarChar(String),
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        Self::VarChar(v.to_owned())
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
        }
    }

    /// Returns true for `<`, `<=`, `>` and `>=`.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }
}

/// Predicate expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Field value is one of `values`.
    Term {
        /// Field tested.
        field_id: FieldId,
        /// Accepted values.
        values: Vec<ScalarValue>,
    },
    /// Field value compared with a literal.
    Compare {
        /// Field tested.
        field_id: FieldId,
        /// Operator.
        op: CompareOp,
        /// Right-hand literal.
        value: ScalarValue,
    },
    /// String field starts with `prefix`.
    Prefix {
        /// Field tested.
        field_id: FieldId,
        /// Required prefix.
        prefix: String,
    },
    /// Both sides hold.
    And(Box<Expr>, Box<Expr>),
    /// Either side holds.
    Or(Box<Expr>, Box<Expr>),
    /// The inner expression does not hold.
    Not(Box<Expr>),
}

impl Expr {
    /// `field in values`.
    pub fn term(field_id: FieldId, values: impl IntoIterator<Item = ScalarValue>) -> Self {
        Self::Term {
            field_id,
            values: values.into_iter().collect(),
        }
    }

    /// `field <op> value`.
    pub fn compare(field_id: FieldId, op: CompareOp, value: impl Into<ScalarValue>) -> Self {
        Self::Compare {
            field_id,
            op,
            value: value.into(),
        }
    }

    /// `field like 'prefix%'`.
    pub fn prefix(field_id: FieldId, prefix: impl Into<String>) -> Self {
        Self::Prefix {
            field_id,
            prefix: prefix.into(),
        }
    }

    /// `self && other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// `self || other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// `!self`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluates a leaf (`Term`, `Compare`, `Prefix`) over every row of
    /// `values`.
    ///
    /// # Errors
    ///
    /// Returns an error for composite expressions or when the literal type
    /// does not match the column.
    pub(crate) fn eval_leaf(&self, values: &FieldValues) -> CoreResult<RoaringBitmap> {
        let mut bitmap = RoaringBitmap::new();
        for row in 0..values.len() {
            let hit = match self {
                Self::Term { values: lits, .. } => {
                    let mut any = false;
                    for lit in lits {
                        if cell_cmp(values, row, lit)? == Some(Ordering::Equal) {
                            any = true;
                            break;
                        }
                    }
                    any
                }
                Self::Compare { op, value, .. } => {
                    cell_cmp(values, row, value)?.is_some_and(|ord| op.holds(ord))
                }
                Self::Prefix { prefix, .. } => match values {
                    FieldValues::VarChar(v) => v[row].starts_with(prefix.as_str()),
                    other => {
                        return Err(CoreError::invalid_argument(format!(
                            "prefix match on {} field",
                            other.data_type()
                        )))
                    }
                },
                _ => return Err(CoreError::invalid_argument("not a leaf expression")),
            };
            if hit {
                bitmap.insert(row as u32);
            }
        }
        Ok(bitmap)
    }
}

enum Cell<'a> {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
}

fn cell(values: &FieldValues, row: usize) -> Option<Cell<'_>> {
    Some(match values {
        FieldValues::Bool(v) => Cell::Bool(*v.get(row)?),
        FieldValues::Int8(v) => Cell::Int(i64::from(*v.get(row)?)),
        FieldValues::Int16(v) => Cell::Int(i64::from(*v.get(row)?)),
        FieldValues::Int32(v) => Cell::Int(i64::from(*v.get(row)?)),
        FieldValues::Int64(v) => Cell::Int(*v.get(row)?),
        FieldValues::Float(v) => Cell::Float(f64::from(*v.get(row)?)),
        FieldValues::Double(v) => Cell::Float(*v.get(row)?),
        FieldValues::VarChar(v) => Cell::Str(v.get(row)?.as_str()),
        FieldValues::FloatVector { .. } | FieldValues::BinaryVector { .. } => return None,
    })
}

/// Orders the cell at `row` against a literal. `None` means unordered (NaN).
fn cell_cmp(values: &FieldValues, row: usize, lit: &ScalarValue) -> CoreResult<Option<Ordering>> {
    let mismatch = || {
        CoreError::invalid_argument(format!(
            "cannot compare {} field with {lit:?}",
            values.data_type()
        ))
    };
    let cell = cell(values, row).ok_or_else(mismatch)?;
    Ok(match (cell, lit) {
        (Cell::Bool(a), ScalarValue::Bool(b)) => Some(a.cmp(b)),
        (Cell::Int(a), ScalarValue::Int64(b)) => Some(a.cmp(b)),
        (Cell::Int(a), ScalarValue::Double(b)) => (a as f64).partial_cmp(b),
        (Cell::Float(a), ScalarValue::Int64(b)) => a.partial_cmp(&(*b as f64)),
        (Cell::Float(a), ScalarValue::Double(b)) => a.partial_cmp(b),
        (Cell::Str(a), ScalarValue::VarChar(b)) => Some(a.cmp(b.as_str())),
        _ => return Err(mismatch()),
    })
}

/// Scalar query: filter, project, at a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievePlan {
    /// Filter; `None` selects every visible row.
    pub predicate: Option<Expr>,
    /// Fields to project, in output order.
    pub output_field_ids: Vec<FieldId>,
    /// Rows inserted after, or deleted at or before, this time are hidden.
    pub timestamp: Timestamp,
}

/// Vector query over one vector field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPlan {
    /// Vector field searched.
    pub field_id: FieldId,
    /// Ranking metric.
    pub metric: MetricType,
    /// Hits kept per query vector.
    pub topk: usize,
    /// Decimal places of reported scores; negative keeps full precision.
    #[serde(default = "default_round_decimal")]
    pub round_decimal: i64,
    /// Index-specific search parameters.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Optional scalar filter.
    #[serde(default)]
    pub predicate: Option<Expr>,
}

fn default_round_decimal() -> i64 {
    -1
}

/// A batch of query vectors searched together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderGroup {
    /// Caller-chosen tag echoed in the result.
    pub tag: String,
    /// Query vectors; must match the searched field's type and dimension.
    pub values: FieldValues,
}

/// Rows selected by a retrieve, in ascending offset order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrieveResult {
    /// Primary key of each row.
    pub ids: Vec<PrimaryKey>,
    /// Segment offset of each row.
    pub offsets: Vec<i64>,
    /// One column per requested output field.
    pub fields_data: Vec<FieldData>,
}

impl RetrieveResult {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns true if no rows were selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// The column of one output field.
    #[must_use]
    pub fn field(&self, field_id: FieldId) -> Option<&FieldData> {
        self.fields_data.iter().find(|f| f.field_id == field_id)
    }
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Segment offset of the row.
    pub offset: i64,
    /// Primary key of the row.
    pub id: PrimaryKey,
    /// Distance or similarity, rounded per the plan.
    pub score: f32,
}

/// Ranked hits of one placeholder group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Tag of the placeholder group.
    pub tag: String,
    /// Timestamp the group was searched at.
    pub timestamp: Timestamp,
    /// Requested hits per query.
    pub topk: usize,
    /// For each query vector, at most `topk` hits, best-first.
    pub hits: Vec<Vec<SearchHit>>,
}

impl SearchResult {
    /// Number of query vectors.
    #[must_use]
    pub fn num_queries(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(b: &RoaringBitmap) -> Vec<u32> {
        b.iter().collect()
    }

    #[test]
    fn term_on_ints() {
        let col = FieldValues::Int32(vec![5, 6, 7, 5]);
        let e = Expr::term(101, [ScalarValue::Int64(5), ScalarValue::Int64(7)]);
        assert_eq!(rows(&e.eval_leaf(&col).unwrap()), vec![0, 2, 3]);
    }

    #[test]
    fn compare_mixed_numeric() {
        let col = FieldValues::Float(vec![0.5, 1.5, 2.5]);
        let e = Expr::compare(101, CompareOp::Ge, 1i64);
        assert_eq!(rows(&e.eval_leaf(&col).unwrap()), vec![1, 2]);
        let e = Expr::compare(101, CompareOp::Lt, 2.0);
        assert_eq!(rows(&e.eval_leaf(&col).unwrap()), vec![0, 1]);
    }

    #[test]
    fn nan_matches_nothing_but_ne() {
        let col = FieldValues::Double(vec![f64::NAN]);
        assert!(Expr::compare(1, CompareOp::Eq, 1.0).eval_leaf(&col).unwrap().is_empty());
        assert!(Expr::compare(1, CompareOp::Ne, 1.0).eval_leaf(&col).unwrap().is_empty());
    }

    #[test]
    fn prefix_on_strings() {
        let col = FieldValues::VarChar(vec!["abc".into(), "abd".into(), "b".into()]);
        assert_eq!(rows(&Expr::prefix(1, "ab").eval_leaf(&col).unwrap()), vec![0, 1]);
        assert!(Expr::prefix(1, "a").eval_leaf(&FieldValues::Int64(vec![1])).is_err());
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let col = FieldValues::VarChar(vec!["a".into()]);
        assert!(Expr::compare(1, CompareOp::Eq, 1i64).eval_leaf(&col).is_err());
        let vecs = FieldValues::FloatVector { dim: 1, data: vec![1.0] };
        assert!(Expr::compare(1, CompareOp::Eq, 1i64).eval_leaf(&vecs).is_err());
    }

    #[test]
    fn composite_is_not_a_leaf() {
        let e = Expr::prefix(1, "a").and(Expr::prefix(1, "b"));
        assert!(e.eval_leaf(&FieldValues::VarChar(vec!["a".into()])).is_err());
    }

    #[test]
    fn plan_from_json() {
        let json = r#"{
            "field_id": 100,
            "metric": "L2",
            "topk": 10,
            "predicate": {"Compare": {"field_id": 101, "op": "Gt", "value": {"Int64": 3}}}
        }"#;
        let plan: SearchPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.round_decimal, -1);
        assert_eq!(plan.predicate, Some(Expr::compare(101, CompareOp::Gt, 3i64)));
    }
}
