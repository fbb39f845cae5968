//! Retrieve and search over a consistent storage snapshot.
//!
//! Both operations hold the storage read lock for their whole duration, so a
//! concurrent teardown waits for them and later reads fail cleanly.

use super::{Segment, SegmentStorage};
use crate::deleted::{check_batch, DeletedView};
use crate::error::{CoreError, CoreResult};
use crate::index::LoadedIndex;
use crate::metric::{brute_force_search, round_score};
use crate::plan::{
    CompareOp, Expr, PlaceholderGroup, RetrievePlan, RetrieveResult, ScalarValue, SearchHit,
    SearchPlan, SearchResult,
};
use crate::primary_key::PrimaryKey;
use crate::types::{Timestamp, ROW_ID_FIELD_ID, TIMESTAMP_FIELD_ID};
use roaring::RoaringBitmap;
use std::borrow::Cow;
use std::ops::Bound;
use tracing::debug;
use vecseg_codec::{FieldData, FieldId, FieldValues};

impl SegmentStorage {
    fn pk_field(&self, declared: Option<FieldId>) -> FieldId {
        match self {
            Self::Growing(g) => g.pk_field(),
            Self::Sealed(_) => declared.unwrap_or(ROW_ID_FIELD_ID),
        }
    }

    /// The first `rows` values of a field, if resident.
    fn column(&self, field_id: FieldId, rows: usize) -> CoreResult<Option<Cow<'_, FieldValues>>> {
        match self {
            Self::Growing(g) => match g.column(field_id) {
                Some(column) => Ok(Some(Cow::Owned(column.prefix(rows)?))),
                None => Ok(None),
            },
            Self::Sealed(s) => Ok(s.column(field_id).map(Cow::Borrowed)),
        }
    }

    /// Selected rows of a field, if resident.
    fn gather(&self, field_id: FieldId, rows: &[usize]) -> CoreResult<Option<FieldValues>> {
        match self {
            Self::Growing(g) => g.column(field_id).map(|c| c.gather(rows)).transpose(),
            Self::Sealed(s) => Ok(s.column(field_id).map(|c| c.gather(rows)).transpose()?),
        }
    }

    fn index(&self, field_id: FieldId) -> Option<&LoadedIndex> {
        match self {
            Self::Growing(_) => None,
            Self::Sealed(s) => s.index(field_id),
        }
    }
}

fn strings(field_id: FieldId, values: &[ScalarValue]) -> CoreResult<Vec<&str>> {
    values
        .iter()
        .map(|v| match v {
            ScalarValue::VarChar(s) => Ok(s.as_str()),
            other => Err(CoreError::invalid_argument(format!(
                "string field {field_id} compared with {other:?}"
            ))),
        })
        .collect()
}

impl Segment {
    fn pk_field(&self, storage: &SegmentStorage) -> FieldId {
        storage.pk_field(self.collection.schema().primary_field().map(|f| f.field_id))
    }

    /// Rows committed, inserted no later than `ts` and not deleted as of
    /// `ts`.
    fn visible_rows(
        &self,
        storage: &SegmentStorage,
        deleted: &DeletedView<'_>,
        rows: usize,
        ts: Timestamp,
    ) -> CoreResult<RoaringBitmap> {
        let insert_ts = storage.column(TIMESTAMP_FIELD_ID, rows)?;
        let insert_ts = match insert_ts.as_deref() {
            Some(FieldValues::Int64(v)) => Some(v.as_slice()),
            Some(other) => {
                return Err(CoreError::invalid_argument(format!(
                    "timestamp column is {}",
                    other.data_type()
                )))
            }
            None => None,
        };
        let pk_field = self.pk_field(storage);
        let pks = if deleted.is_empty() {
            None
        } else {
            let column = storage
                .column(pk_field, rows)?
                .ok_or(CoreError::FieldNotLoaded { field_id: pk_field })?;
            Some(PrimaryKey::all_from_column(&column)?)
        };

        let mut visible = RoaringBitmap::new();
        for row in 0..rows {
            let row_ts = insert_ts.map_or(0, |t| t[row] as Timestamp);
            if row_ts > ts {
                continue;
            }
            if let Some(pks) = &pks {
                if deleted.is_deleted(&pks[row], row_ts, ts) {
                    continue;
                }
            }
            visible.insert(row as u32);
        }
        Ok(visible)
    }

    fn eval(&self, storage: &SegmentStorage, expr: &Expr, rows: usize) -> CoreResult<RoaringBitmap> {
        match expr {
            Expr::And(a, b) => Ok(self.eval(storage, a, rows)? & self.eval(storage, b, rows)?),
            Expr::Or(a, b) => Ok(self.eval(storage, a, rows)? | self.eval(storage, b, rows)?),
            Expr::Not(inner) => {
                let mut all = RoaringBitmap::new();
                all.insert_range(0..rows as u32);
                Ok(all - self.eval(storage, inner, rows)?)
            }
            Expr::Term { field_id, .. } | Expr::Compare { field_id, .. } | Expr::Prefix { field_id, .. } => {
                if let Some(LoadedIndex::StringTrie(trie)) = storage.index(*field_id) {
                    return match expr {
                        Expr::Term { values, .. } => trie.in_values(&strings(*field_id, values)?),
                        Expr::Prefix { prefix, .. } => trie.prefix_match(prefix),
                        Expr::Compare { op, value, .. } => {
                            let value = strings(*field_id, std::slice::from_ref(value))?[0];
                            match op {
                                CompareOp::Eq => trie.in_values(&[value]),
                                CompareOp::Ne => trie.not_in(&[value]),
                                CompareOp::Lt => trie.range(Bound::Unbounded, Bound::Excluded(value)),
                                CompareOp::Le => trie.range(Bound::Unbounded, Bound::Included(value)),
                                CompareOp::Gt => trie.range(Bound::Excluded(value), Bound::Unbounded),
                                CompareOp::Ge => trie.range(Bound::Included(value), Bound::Unbounded),
                            }
                        }
                        _ => Err(CoreError::invalid_argument("not a leaf expression")),
                    };
                }
                let column = storage
                    .column(*field_id, rows)?
                    .ok_or(CoreError::FieldNotLoaded { field_id: *field_id })?;
                expr.eval_leaf(&column)
            }
        }
    }

    fn candidates(
        &self,
        storage: &SegmentStorage,
        predicate: Option<&Expr>,
        ts: Timestamp,
    ) -> CoreResult<RoaringBitmap> {
        let rows = storage.row_count();
        let deleted = self.deleted.view();
        let mut selected = self.visible_rows(storage, &deleted, rows, ts)?;
        drop(deleted);
        if let Some(expr) = predicate {
            selected &= self.eval(storage, expr, rows)?;
        }
        Ok(selected)
    }

    fn primary_keys_at(&self, storage: &SegmentStorage, rows: &[usize]) -> CoreResult<Vec<PrimaryKey>> {
        let pk_field = self.pk_field(storage);
        let column = storage
            .gather(pk_field, rows)?
            .ok_or(CoreError::FieldNotLoaded { field_id: pk_field })?;
        PrimaryKey::all_from_column(&column)
    }

    /// Evaluates a scalar query and projects the requested fields.
    ///
    /// Fields with registered binlog or index info but no resident raw data
    /// come back as default-valued placeholders; fill them with
    /// [`Segment::fill_indexed_fields_data`] before use.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, `FieldNotFound` for fields outside
    /// the schema, `FieldNotLoaded` for fields with neither data nor indexed
    /// info, or `Unimplemented` for ordered comparisons answered by a trie
    /// index.
    pub fn retrieve(&self, plan: &RetrievePlan) -> CoreResult<RetrieveResult> {
        let storage = self.storage()?;
        let selected = self.candidates(&storage, plan.predicate.as_ref(), plan.timestamp)?;
        let rows: Vec<usize> = selected.iter().map(|r| r as usize).collect();

        let mut fields_data = Vec::with_capacity(plan.output_field_ids.len());
        for &field_id in &plan.output_field_ids {
            let field = self.collection.schema().field(field_id)?;
            let values = match storage.gather(field_id, &rows)? {
                Some(values) => values,
                None if self.indexed_fields.read().contains_key(&field_id) => {
                    FieldValues::with_rows(field.data_type, field.dim, rows.len())?
                }
                None => return Err(CoreError::FieldNotLoaded { field_id }),
            };
            fields_data.push(FieldData::new(field_id, field.name, field.data_type, values));
        }

        let ids = self.primary_keys_at(&storage, &rows)?;
        debug!(
            segment_id = self.meta.segment_id,
            rows = rows.len(),
            "retrieved rows"
        );
        Ok(RetrieveResult {
            ids,
            offsets: rows.iter().map(|&r| r as i64).collect(),
            fields_data,
        })
    }

    /// Searches each placeholder group at its timestamp.
    ///
    /// Growing segments and sealed segments with resident vectors are scanned
    /// exhaustively; sealed segments without them use a loaded flat index.
    ///
    /// # Errors
    ///
    /// Returns `NilSegment` once released, `InvalidArgument` if group and
    /// timestamp counts differ or the queries do not fit the field, or
    /// `IndexNotReady` if a sealed segment has neither vectors nor an index.
    pub fn search(
        &self,
        plan: &SearchPlan,
        groups: &[PlaceholderGroup],
        timestamps: &[Timestamp],
    ) -> CoreResult<Vec<SearchResult>> {
        check_batch(groups.len(), timestamps.len())?;
        let field = self.collection.schema().field(plan.field_id)?;
        if !field.data_type.is_vector() || !plan.metric.supports(field.data_type) {
            return Err(CoreError::invalid_argument(format!(
                "metric {} cannot search field {} of type {}",
                plan.metric, plan.field_id, field.data_type
            )));
        }

        let storage = self.storage()?;
        let rows = storage.row_count();
        let base = storage.column(plan.field_id, rows)?;
        let flat = match (&base, storage.index(plan.field_id)) {
            (Some(_), _) => None,
            (None, Some(LoadedIndex::Flat(flat))) => {
                if flat.metric() != plan.metric {
                    return Err(CoreError::invalid_argument(format!(
                        "field {} is indexed for {}, searched with {}",
                        plan.field_id,
                        flat.metric(),
                        plan.metric
                    )));
                }
                Some(flat)
            }
            (None, _) => {
                return Err(CoreError::index_not_ready(
                    plan.field_id,
                    "no resident vectors and no vector index",
                ))
            }
        };

        let mut results = Vec::with_capacity(groups.len());
        for (group, &ts) in groups.iter().zip(timestamps) {
            let candidates = self.candidates(&storage, plan.predicate.as_ref(), ts)?;
            let ranked = match (&base, flat) {
                (Some(base), _) => brute_force_search(plan.metric, &group.values, base, &candidates, plan.topk)?,
                (None, Some(flat)) => flat.search(&group.values, plan.topk, &candidates)?,
                (None, None) => Vec::new(),
            };
            let mut hits = Vec::with_capacity(ranked.len());
            for query in ranked {
                let offsets: Vec<usize> = query.iter().map(|&(row, _)| row as usize).collect();
                let ids = self.primary_keys_at(&storage, &offsets)?;
                hits.push(
                    query
                        .into_iter()
                        .zip(ids)
                        .map(|((row, score), id)| SearchHit {
                            offset: i64::from(row),
                            id,
                            score: round_score(score, plan.round_decimal),
                        })
                        .collect(),
                );
            }
            results.push(SearchResult {
                tag: group.tag.clone(),
                timestamp: ts,
                topk: plan.topk,
                hits,
            });
        }
        debug!(
            segment_id = self.meta.segment_id,
            groups = groups.len(),
            "searched segment"
        );
        Ok(results)
    }
}
