//! Tracks reserved offset ranges and which of them have been committed.

use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct AckState {
    acked: i64,
    pending: BTreeMap<i64, i64>,
    outstanding: BTreeMap<i64, i64>,
}

/// Commits may finish out of order; only the contiguous prefix starting at
/// zero is reported as acknowledged.
#[derive(Debug, Default)]
pub(crate) struct AckResponder {
    state: Mutex<AckState>,
}

impl AckResponder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records `[start, end)` as handed out and not yet committed.
    pub(crate) fn reserve(&self, start: i64, end: i64) {
        if start < end {
            self.state.lock().outstanding.insert(start, end);
        }
    }

    /// Takes ownership of exactly the reserved range `[start, end)`.
    ///
    /// Returns false if no reservation starts at `start`, if it has a
    /// different length, or if it was already claimed.
    pub(crate) fn claim(&self, start: i64, end: i64) -> bool {
        let mut state = self.state.lock();
        if state.outstanding.get(&start) != Some(&end) {
            return false;
        }
        state.outstanding.remove(&start);
        true
    }

    /// Returns a claimed range whose commit failed.
    pub(crate) fn release(&self, start: i64, end: i64) {
        self.reserve(start, end);
    }

    /// Marks `[start, end)` committed.
    pub(crate) fn ack(&self, start: i64, end: i64) {
        if start >= end {
            return;
        }
        let mut state = self.state.lock();
        state.pending.insert(start, end);
        loop {
            let acked = state.acked;
            match state.pending.remove(&acked) {
                Some(next) => state.acked = next,
                None => break,
            }
        }
    }

    /// Length of the acknowledged prefix.
    pub(crate) fn ack_count(&self) -> i64 {
        self.state.lock().acked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_order_acks() {
        let ack = AckResponder::new();
        ack.ack(5, 8);
        assert_eq!(ack.ack_count(), 0);
        ack.ack(0, 3);
        assert_eq!(ack.ack_count(), 3);
        ack.ack(3, 5);
        assert_eq!(ack.ack_count(), 8);
        ack.ack(8, 8);
        assert_eq!(ack.ack_count(), 8);
    }

    #[test]
    fn claims_need_the_exact_range() {
        let ack = AckResponder::new();
        ack.reserve(0, 3);
        ack.reserve(3, 4);
        assert!(!ack.claim(0, 2));
        assert!(!ack.claim(1, 3));
        assert!(!ack.claim(0, 4));
        assert!(ack.claim(0, 3));
        assert!(!ack.claim(0, 3));

        ack.release(0, 3);
        assert!(ack.claim(0, 3));
        assert!(ack.claim(3, 4));
    }
}
