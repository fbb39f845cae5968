//! Tombstones of a segment.
//!
//! Deletes never touch row storage. A tombstone `(pk, t_d)` hides every row
//! with the same primary key whose insert timestamp is at or before `t_d`,
//! for any query at or after `t_d`. Rows re-inserted after the delete stay
//! visible.

use crate::error::{CoreError, CoreResult};
use crate::primary_key::PrimaryKey;
use crate::types::Timestamp;
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
struct Tombstones {
    by_pk: HashMap<PrimaryKey, Vec<Timestamp>>,
    committed: usize,
}

/// Tombstone set with atomic slot reservation.
#[derive(Debug, Default)]
pub struct DeletedRecord {
    reserved: AtomicI64,
    tombstones: RwLock<Tombstones>,
}

impl DeletedRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `n` tombstone slots and returns the first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a negative count or when the slot space
    /// would overflow.
    pub fn pre_delete(&self, n: i64) -> CoreResult<i64> {
        reserve(&self.reserved, n)
    }

    /// Slots reserved so far.
    #[must_use]
    pub fn reserved(&self) -> i64 {
        self.reserved.load(Ordering::Acquire)
    }

    /// Commits tombstones into slots reserved by [`DeletedRecord::pre_delete`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the batch lengths differ or the slots were
    /// never reserved.
    pub fn delete(&self, offset: i64, pks: &[PrimaryKey], timestamps: &[Timestamp]) -> CoreResult<()> {
        check_batch(pks.len(), timestamps.len())?;
        let end = offset.checked_add(pks.len() as i64);
        if offset < 0 || end.map_or(true, |end| end > self.reserved()) {
            return Err(CoreError::invalid_argument(format!(
                "delete of {} rows at offset {offset} exceeds {} reserved slots",
                pks.len(),
                self.reserved()
            )));
        }
        let mut tombstones = self.tombstones.write();
        for (pk, &ts) in pks.iter().zip(timestamps) {
            tombstones.by_pk.entry(pk.clone()).or_default().push(ts);
        }
        tombstones.committed += pks.len();
        Ok(())
    }

    /// Replaces the whole tombstone set, as when recovering a sealed segment.
    ///
    /// The loaded rows take fresh slots past every reservation made so far;
    /// offsets already handed out by [`DeletedRecord::pre_delete`] are never
    /// reissued.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless `pks`, `timestamps` and `row_count`
    /// agree.
    pub fn load(&self, pks: &[PrimaryKey], timestamps: &[Timestamp], row_count: i64) -> CoreResult<()> {
        check_batch(pks.len(), timestamps.len())?;
        if row_count < 0 || row_count as usize != pks.len() {
            return Err(CoreError::invalid_argument(format!(
                "deleted record row count {row_count} does not match {} keys",
                pks.len()
            )));
        }
        let mut by_pk: HashMap<PrimaryKey, Vec<Timestamp>> = HashMap::with_capacity(pks.len());
        for (pk, &ts) in pks.iter().zip(timestamps) {
            by_pk.entry(pk.clone()).or_default().push(ts);
        }
        let mut tombstones = self.tombstones.write();
        reserve(&self.reserved, row_count)?;
        tombstones.by_pk = by_pk;
        tombstones.committed = pks.len();
        Ok(())
    }

    /// Committed tombstones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tombstones.read().committed
    }

    /// Returns true if no tombstone is committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if a row with `pk` inserted at `insert_ts` is hidden from
    /// a query at `query_ts`.
    #[must_use]
    pub fn is_deleted(&self, pk: &PrimaryKey, insert_ts: Timestamp, query_ts: Timestamp) -> bool {
        self.view().is_deleted(pk, insert_ts, query_ts)
    }

    /// Locks the tombstones for a batch of visibility checks.
    pub(crate) fn view(&self) -> DeletedView<'_> {
        DeletedView {
            tombstones: self.tombstones.read(),
        }
    }

    /// Approximate heap bytes held by the tombstones.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        let tombstones = self.tombstones.read();
        tombstones
            .by_pk
            .iter()
            .map(|(pk, ts)| {
                let key = match pk {
                    PrimaryKey::Int64(_) => 8,
                    PrimaryKey::VarChar(s) => s.capacity(),
                };
                key + ts.capacity() * std::mem::size_of::<Timestamp>()
            })
            .sum()
    }
}

/// Read-locked tombstones.
pub(crate) struct DeletedView<'a> {
    tombstones: RwLockReadGuard<'a, Tombstones>,
}

impl DeletedView<'_> {
    pub(crate) fn is_empty(&self) -> bool {
        self.tombstones.committed == 0
    }

    pub(crate) fn is_deleted(&self, pk: &PrimaryKey, insert_ts: Timestamp, query_ts: Timestamp) -> bool {
        self.tombstones
            .by_pk
            .get(pk)
            .is_some_and(|ts| ts.iter().any(|&t| insert_ts <= t && t <= query_ts))
    }
}

/// Atomically advances `counter` by `n` and returns the previous value.
pub(crate) fn reserve(counter: &AtomicI64, n: i64) -> CoreResult<i64> {
    if n < 0 {
        return Err(CoreError::invalid_argument(format!("cannot reserve {n} slots")));
    }
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| cur.checked_add(n))
        .map_err(|cur| CoreError::invalid_argument(format!("offset space exhausted at {cur}")))
}

pub(crate) fn check_batch(keys: usize, timestamps: usize) -> CoreResult<()> {
    if keys != timestamps {
        return Err(CoreError::invalid_argument(format!(
            "batch has {keys} keys but {timestamps} timestamps"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservations_are_sequential() {
        let record = DeletedRecord::new();
        assert_eq!(record.pre_delete(3).unwrap(), 0);
        assert_eq!(record.pre_delete(0).unwrap(), 3);
        assert_eq!(record.pre_delete(2).unwrap(), 3);
        assert_eq!(record.reserved(), 5);
        assert!(record.pre_delete(-1).is_err());
    }

    #[test]
    fn delete_requires_reservation() {
        let record = DeletedRecord::new();
        let pks = [PrimaryKey::from(1)];
        assert!(record.delete(0, &pks, &[10]).is_err());
        let offset = record.pre_delete(1).unwrap();
        assert!(record.delete(offset, &pks, &[10, 11]).is_err());
        record.delete(offset, &pks, &[10]).unwrap();
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn visibility_window() {
        let record = DeletedRecord::new();
        let offset = record.pre_delete(1).unwrap();
        record.delete(offset, &[PrimaryKey::from(2)], &[20]).unwrap();

        let pk = PrimaryKey::from(2);
        // inserted before the delete
        assert!(record.is_deleted(&pk, 10, 20));
        assert!(record.is_deleted(&pk, 10, 30));
        assert!(!record.is_deleted(&pk, 10, 19));
        // re-inserted after the delete
        assert!(!record.is_deleted(&pk, 21, 30));
        assert!(!record.is_deleted(&PrimaryKey::from(3), 10, 30));
    }

    #[test]
    fn load_replaces_state() {
        let record = DeletedRecord::new();
        let offset = record.pre_delete(1).unwrap();
        record.delete(offset, &[PrimaryKey::from(1)], &[5]).unwrap();

        let pks = [PrimaryKey::from("a"), PrimaryKey::from("b")];
        record.load(&pks, &[7, 8], 2).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.reserved(), 3);
        assert!(!record.is_deleted(&PrimaryKey::from(1), 0, 100));
        assert!(record.is_deleted(&PrimaryKey::from("b"), 0, 100));

        assert!(record.load(&pks, &[7, 8], 3).is_err());
        assert!(record.load(&pks, &[7], 2).is_err());
    }

    #[test]
    fn load_never_reissues_reserved_offsets() {
        let record = DeletedRecord::new();
        assert_eq!(record.pre_delete(5).unwrap(), 0);
        record
            .load(&[PrimaryKey::from(1), PrimaryKey::from(2)], &[3, 4], 2)
            .unwrap();
        assert_eq!(record.pre_delete(1).unwrap(), 7);
        record.delete(7, &[PrimaryKey::from(3)], &[9]).unwrap();
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn concurrent_reservations_do_not_overlap() {
        let record = DeletedRecord::new();
        let mut starts: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| (0..100).map(|_| record.pre_delete(2).unwrap()).collect::<Vec<_>>()))
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        starts.sort_unstable();
        let expected: Vec<i64> = (0..800).map(|i| i * 2).collect();
        assert_eq!(starts, expected);
    }
}
