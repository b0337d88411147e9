//! Order-independent pair filtering.

use super::EntityHandle;
use std::collections::HashSet;

/// Pack two handles into one key, smaller handle in the high half.
///
/// `pair_key(a, b) == pair_key(b, a)` for every `a`, `b`.
#[inline]
pub fn pair_key(a: EntityHandle, b: EntityHandle) -> u64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (u64::from(lo.index()) << 32) | u64::from(hi.index())
}

/// Set of pairs already emitted this tick.
///
/// Not shared between threads: the broad phase gives each task slot its own
/// deduplicator and reconciles slots on the merging thread.
#[derive(Debug, Default)]
pub struct PairDeduplicator {
    seen: HashSet<u64>,
}

impl PairDeduplicator {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Record the pair and report whether it had been seen before.
    ///
    /// Returns `true` if the pair was already present, `false` if this call
    /// inserted it.
    #[inline]
    pub fn mark_and_test_seen(&mut self, a: EntityHandle, b: EntityHandle) -> bool {
        !self.seen.insert(pair_key(a, b))
    }

    #[inline]
    pub fn contains(&self, a: EntityHandle, b: EntityHandle) -> bool {
        self.seen.contains(&pair_key(a, b))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.seen.capacity()
    }

    /// Forget every pair; the table allocation is kept for the next tick.
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
