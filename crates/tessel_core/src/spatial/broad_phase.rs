//! Parallel broad-phase pass.
//!
//! Fork-join over each map's bucket arena: the arena is cut into contiguous
//! chunks, one per task slot. Slot 0 runs on the calling thread, the others
//! on a rayon pool built once at startup. Every slot writes only to its own
//! `PairBuffer` and reads the grid, which nobody mutates during the pass.
//!
//! A pair whose entities share several cells can be found by more than one
//! slot. Each slot drops its own repeats; after the barrier the calling
//! thread merges slots in index order and drops repeats across slots, so the
//! first slot to find a pair owns it and the output order is fixed for a
//! given grid state and task count.

use super::{Bucket, HashGrid, MapId, MapRegistry, PairBuffer, PairCollector, PairDeduplicator, PairInfo, SpatialError};
use crate::config::BroadPhaseConfig;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tessel_metrics::PhaseProfiler;

/// Counters describing the most recent pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadPhaseStats {
    pub maps_scanned: usize,
    pub cells_scanned: usize,
    /// Overlapping same-cell pairs found, repeats included.
    pub raw_pairs: usize,
    /// Repeats dropped inside a slot.
    pub slot_duplicates: usize,
    /// Repeats dropped while merging slots.
    pub cross_slot_duplicates: usize,
    pub emitted: usize,
}

pub struct BroadPhase {
    pool: Option<ThreadPool>,
    collector: PairCollector,
    merged_seen: PairDeduplicator,
    output: Vec<PairInfo>,
    stats: BroadPhaseStats,
    profiler: PhaseProfiler,
}

impl BroadPhase {
    pub fn new(config: &BroadPhaseConfig) -> Result<Self, SpatialError> {
        let pool = match config.worker_threads {
            0 => None,
            threads => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("tessel-broad-{i}"))
                    .build()?,
            ),
        };
        let tasks = config.worker_threads + 1;
        tracing::debug!(tasks, "broad phase ready");
        Ok(Self {
            pool,
            collector: PairCollector::new(tasks, config.pair_capacity),
            merged_seen: PairDeduplicator::with_capacity(config.pair_capacity),
            output: Vec::with_capacity(config.pair_capacity),
            stats: BroadPhaseStats::default(),
            profiler: PhaseProfiler::new(),
        })
    }

    /// Slots per pass, the calling thread included.
    pub fn task_count(&self) -> usize {
        self.collector.task_count()
    }

    /// Forget the previous pass. Every allocation is kept.
    pub fn clear(&mut self) {
        self.collector.clear();
        self.merged_seen.clear();
        self.output.clear();
        self.stats = BroadPhaseStats::default();
    }

    /// Scan every map in ascending id order and replace the candidate pairs.
    /// Returns the number of pairs emitted.
    pub fn run(&mut self, maps: &MapRegistry) -> usize {
        self.clear();
        for (map, grid) in maps.iter() {
            if grid.is_empty() {
                continue;
            }
            self.run_map(map, grid);
        }
        self.stats.emitted = self.output.len();
        tracing::debug!(
            maps = self.stats.maps_scanned,
            cells = self.stats.cells_scanned,
            raw = self.stats.raw_pairs,
            emitted = self.stats.emitted,
            "broad phase pass complete"
        );
        self.output.len()
    }

    /// Candidate pairs of the last pass, in merge order.
    #[inline]
    pub fn pairs(&self) -> &[PairInfo] {
        &self.output
    }

    /// Hand the candidate pairs over; they are gone afterwards.
    pub fn drain(&mut self) -> std::vec::Drain<'_, PairInfo> {
        self.output.drain(..)
    }

    #[inline]
    pub fn stats(&self) -> BroadPhaseStats {
        self.stats
    }

    #[inline]
    pub fn profiler(&self) -> &PhaseProfiler {
        &self.profiler
    }

    fn run_map(&mut self, map: MapId, grid: &HashGrid) {
        // Pair keys carry no map, so dedup state is per map.
        self.collector.clear();
        self.merged_seen.clear();

        #[cfg(feature = "metrics")]
        let scan_started = std::time::Instant::now();

        let buckets = grid.buckets();
        let chunk_len = buckets.len().div_ceil(self.collector.task_count()).max(1);
        let buffers = self.collector.buffers_mut();

        match &self.pool {
            Some(pool) => pool.in_place_scope(|scope| {
                let mut slots = buffers.iter_mut().zip(buckets.chunks(chunk_len));
                let own = slots.next();
                for (buffer, cells) in slots {
                    scope.spawn(move |_| scan_cells(grid, map, cells, buffer));
                }
                if let Some((buffer, cells)) = own {
                    scan_cells(grid, map, cells, buffer);
                }
            }),
            None => {
                for (buffer, cells) in buffers.iter_mut().zip(buckets.chunks(chunk_len)) {
                    scan_cells(grid, map, cells, buffer);
                }
            }
        }

        tessel_metrics::metrics! {
            self.profiler.record("scan", scan_started.elapsed());
        }
        #[cfg(feature = "metrics")]
        let merge_started = std::time::Instant::now();

        let skipped = self.collector.skipped();
        self.stats.slot_duplicates += skipped;
        self.stats.raw_pairs += self.collector.pending() + skipped;
        self.stats.cross_slot_duplicates += self
            .collector
            .merge_into(&mut self.merged_seen, &mut self.output);
        self.stats.maps_scanned += 1;
        self.stats.cells_scanned += buckets.len();

        tessel_metrics::metrics! {
            self.profiler.record("merge", merge_started.elapsed());
        }
    }
}

/// Emit every overlapping, layer-compatible pair sharing a bucket in `cells`.
fn scan_cells(grid: &HashGrid, map: MapId, cells: &[Bucket], out: &mut PairBuffer) {
    for bucket in cells {
        let members = bucket.members();
        if members.len() < 2 {
            continue;
        }
        for (i, &a) in members.iter().enumerate() {
            let Some(ta) = grid.tracked(a) else { continue };
            let a_single = ta.cells.cell_count() == 1;
            for &b in &members[i + 1..] {
                let Some(tb) = grid.tracked(b) else { continue };
                if !ta.layers.interacts_with(tb.layers) {
                    continue;
                }
                let Some(overlap) = ta.bounds.intersection(&tb.bounds) else {
                    continue;
                };
                let pair = PairInfo::new(a, b, map, overlap);
                if a_single && tb.cells.cell_count() == 1 {
                    // Only this bucket holds both.
                    out.push_unique(pair);
                } else {
                    out.push(pair);
                }
            }
        }
    }
}
