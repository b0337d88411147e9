//! Per-task candidate pair buffers.
//!
//! One `PairBuffer` per broad-phase task, slot 0 belonging to the calling
//! thread. Buffers are allocated once when the broad phase starts and are
//! cleared, never freed, between ticks.

use super::{Aabb, EntityHandle, MapId, PairDeduplicator};

/// Candidate pair handed to the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairInfo {
    /// Always the smaller handle.
    pub first: EntityHandle,
    pub second: EntityHandle,
    pub map: MapId,
    /// Intersection of the two bounding boxes.
    pub overlap: Aabb,
}

impl PairInfo {
    pub fn new(a: EntityHandle, b: EntityHandle, map: MapId, overlap: Aabb) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first,
            second,
            map,
            overlap,
        }
    }

    #[inline]
    pub fn involves(&self, entity: EntityHandle) -> bool {
        self.first == entity || self.second == entity
    }
}

/// Append-only output of one task plus the pairs it has already emitted.
#[derive(Debug)]
pub struct PairBuffer {
    pairs: Vec<PairInfo>,
    seen: PairDeduplicator,
    skipped: usize,
}

impl PairBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            pairs: Vec::with_capacity(capacity),
            seen: PairDeduplicator::with_capacity(capacity),
            skipped: 0,
        }
    }

    /// Append unless this buffer already holds the same unordered pair.
    /// Returns `true` when the pair was appended.
    pub fn push(&mut self, pair: PairInfo) -> bool {
        if self.seen.mark_and_test_seen(pair.first, pair.second) {
            self.skipped += 1;
            return false;
        }
        self.pairs.push(pair);
        true
    }

    /// Append without consulting the seen set. Only valid for pairs that can
    /// be discovered from a single cell, i.e. both entities occupy one cell.
    #[inline]
    pub fn push_unique(&mut self, pair: PairInfo) {
        self.pairs.push(pair);
    }

    #[inline]
    pub fn pairs(&self) -> &[PairInfo] {
        &self.pairs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pushes refused because the pair was already in this buffer.
    #[inline]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Drop the pairs but keep the seen set, so a pair found again later in
    /// the same tick is still filtered.
    fn drain_pairs(&mut self) -> std::vec::Drain<'_, PairInfo> {
        self.pairs.drain(..)
    }

    fn clear(&mut self) {
        self.pairs.clear();
        self.seen.clear();
        self.skipped = 0;
    }
}

/// Fixed set of task buffers merged in index order.
#[derive(Debug)]
pub struct PairCollector {
    buffers: Vec<PairBuffer>,
}

impl PairCollector {
    /// `tasks` is clamped to at least one buffer.
    pub fn new(tasks: usize, capacity: usize) -> Self {
        Self {
            buffers: (0..tasks.max(1))
                .map(|_| PairBuffer::with_capacity(capacity))
                .collect(),
        }
    }

    #[inline]
    pub fn task_count(&self) -> usize {
        self.buffers.len()
    }

    /// Buffer owned by task `index`.
    ///
    /// # Panics
    /// If `index >= task_count()`.
    #[inline]
    pub fn buffer(&mut self, index: usize) -> &mut PairBuffer {
        &mut self.buffers[index]
    }

    /// All buffers, for handing one to each task.
    #[inline]
    pub fn buffers_mut(&mut self) -> &mut [PairBuffer] {
        &mut self.buffers
    }

    pub fn pending(&self) -> usize {
        self.buffers.iter().map(PairBuffer::len).sum()
    }

    pub fn skipped(&self) -> usize {
        self.buffers.iter().map(PairBuffer::skipped).sum()
    }

    /// Move every buffered pair into `out`, buffer 0 first, dropping pairs
    /// `merged` has already seen. Returns the number of dropped pairs.
    ///
    /// Must run after all tasks have finished writing.
    pub fn merge_into(&mut self, merged: &mut PairDeduplicator, out: &mut Vec<PairInfo>) -> usize {
        let mut dropped = 0;
        for buffer in &mut self.buffers {
            for pair in buffer.drain_pairs() {
                if merged.mark_and_test_seen(pair.first, pair.second) {
                    dropped += 1;
                } else {
                    out.push(pair);
                }
            }
        }
        dropped
    }

    /// Reset for a new tick, keeping every allocation.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn pair(a: u32, b: u32) -> PairInfo {
        PairInfo::new(
            EntityHandle::new(a),
            EntityHandle::new(b),
            MapId::new(0),
            Aabb::new(Vec2::ZERO, Vec2::ONE),
        )
    }

    #[test]
    fn pair_info_orders_its_handles() {
        let p = pair(9, 2);
        assert_eq!(p.first, EntityHandle::new(2));
        assert_eq!(p.second, EntityHandle::new(9));
        assert!(p.involves(EntityHandle::new(9)));
    }

    #[test]
    fn buffer_drops_repeats_within_a_task() {
        let mut collector = PairCollector::new(1, 8);
        assert!(collector.buffer(0).push(pair(1, 2)));
        assert!(!collector.buffer(0).push(pair(2, 1)));
        assert_eq!(collector.pending(), 1);
        assert_eq!(collector.skipped(), 1);
    }

    #[test]
    fn merge_is_in_buffer_order_and_drops_cross_task_repeats() {
        let mut collector = PairCollector::new(3, 8);
        collector.buffer(2).push(pair(5, 6));
        collector.buffer(1).push(pair(1, 2));
        collector.buffer(0).push(pair(3, 4));
        collector.buffer(2).push(pair(2, 1));

        let mut merged = PairDeduplicator::new();
        let mut out = Vec::new();
        let dropped = collector.merge_into(&mut merged, &mut out);

        assert_eq!(dropped, 1);
        let order: Vec<(u32, u32)> = out
            .iter()
            .map(|p| (p.first.index(), p.second.index()))
            .collect();
        assert_eq!(order, vec![(3, 4), (1, 2), (5, 6)]);
        assert_eq!(collector.pending(), 0);
    }

    #[test]
    fn zero_tasks_still_has_one_buffer() {
        let mut collector = PairCollector::new(0, 4);
        assert_eq!(collector.task_count(), 1);
        collector.buffer(0).push(pair(1, 2));
        collector.clear();
        assert_eq!(collector.pending(), 0);
        assert!(collector.buffer(0).push(pair(1, 2)));
    }
}
