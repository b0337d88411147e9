//! Uniform spatial hash grid for one map.
//!
//! Cells are square, `cell_size` world units wide, and only exist once an
//! entity touched them. Each cell owns a bucket of entity handles stored in
//! a dense arena, so the broad phase can slice the arena across workers.
//!
//! Every tracked entity remembers the `(bucket, index)` slot it holds in each
//! occupied cell. Removal is a `swap_remove` followed by patching the slot of
//! whichever entity got swapped into the hole, so it never searches a bucket.

use super::{Aabb, CellCoord, CellSpan, CollisionLayers, EntityHandle, EntitySink, SpatialError};
use crate::config::{CapacityPolicy, GridConfig};
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    bucket: u32,
    index: u32,
}

#[derive(Debug, Clone)]
struct GridEntry {
    bounds: Aabb,
    span: CellSpan,
    layers: CollisionLayers,
    slots: SmallVec<[Slot; 4]>,
}

/// Entities currently overlapping one cell.
#[derive(Debug)]
pub struct Bucket {
    cell: CellCoord,
    members: Vec<EntityHandle>,
    grown: bool,
}

impl Bucket {
    fn new(cell: CellCoord, capacity: usize) -> Self {
        Self {
            cell,
            members: Vec::with_capacity(capacity),
            grown: false,
        }
    }

    #[inline]
    pub fn cell(&self) -> CellCoord {
        self.cell
    }

    #[inline]
    pub fn members(&self) -> &[EntityHandle] {
        &self.members
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Result of a successful move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Cell set unchanged; only the stored bounds were refreshed.
    SameCells,
    /// The entity left and/or entered at least one cell.
    Relocated,
}

/// What the broad phase needs to know about a tracked entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedBounds {
    pub bounds: Aabb,
    pub cells: CellSpan,
    pub layers: CollisionLayers,
}

pub struct HashGrid {
    cell_size: f32,
    bucket_capacity: usize,
    policy: CapacityPolicy,
    max_cells: u64,
    lookup: HashMap<CellCoord, u32>,
    buckets: Vec<Bucket>,
    entries: HashMap<EntityHandle, GridEntry>,
}

impl HashGrid {
    /// A non-positive or non-finite cell size falls back to the default.
    pub fn new(config: &GridConfig) -> Self {
        let cell_size = if config.cell_size.is_finite() && config.cell_size > 0.0 {
            config.cell_size
        } else {
            let fallback = GridConfig::default().cell_size;
            tracing::warn!(requested = config.cell_size, fallback, "unusable cell size");
            fallback
        };
        Self {
            cell_size,
            bucket_capacity: config.bucket_capacity.max(1),
            policy: config.capacity_policy,
            max_cells: config.max_cells_per_entity.max(1),
            lookup: HashMap::new(),
            buckets: Vec::new(),
            entries: HashMap::new(),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    #[inline]
    pub fn capacity_policy(&self) -> CapacityPolicy {
        self.policy
    }

    #[inline]
    pub fn max_cells_per_entity(&self) -> u64 {
        self.max_cells
    }

    /// Number of tracked entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, entity: EntityHandle) -> bool {
        self.entry(entity).is_some()
    }

    pub fn bounds_of(&self, entity: EntityHandle) -> Option<Aabb> {
        self.entry(entity).map(|e| e.bounds)
    }

    /// Cells the entity is recorded in.
    pub fn cells_of(&self, entity: EntityHandle) -> Option<CellSpan> {
        self.entry(entity).map(|e| e.span)
    }

    pub fn tracked(&self, entity: EntityHandle) -> Option<TrackedBounds> {
        self.entry(entity).map(|e| TrackedBounds {
            bounds: e.bounds,
            cells: e.span,
            layers: e.layers,
        })
    }

    /// Cells touched by `bounds` under this grid's cell size.
    #[inline]
    pub fn span_for(&self, bounds: &Aabb) -> CellSpan {
        CellSpan::covering(bounds, self.cell_size)
    }

    pub fn bucket_len(&self, cell: CellCoord) -> usize {
        self.lookup
            .get(&cell)
            .map_or(0, |&idx| self.buckets[idx as usize].len())
    }

    /// Buckets ever created, including ones that are empty now.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket arena in creation order.
    #[inline]
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn insert(&mut self, entity: EntityHandle, bounds: Aabb) -> Result<(), SpatialError> {
        self.insert_with_layers(entity, bounds, CollisionLayers::DEFAULT)
    }

    /// Track `entity` in every cell overlapped by `bounds`.
    ///
    /// Under `CapacityPolicy::Reject` every target bucket is checked before
    /// anything is written, so a refused insert leaves the grid untouched.
    pub fn insert_with_layers(
        &mut self,
        entity: EntityHandle,
        bounds: Aabb,
        layers: CollisionLayers,
    ) -> Result<(), SpatialError> {
        if !bounds.is_valid() {
            return Err(SpatialError::InvalidBounds { entity });
        }
        if self.contains(entity) {
            return Err(SpatialError::AlreadyTracked(entity));
        }

        let span = self.checked_span(entity, &bounds)?;
        self.ensure_room(span, None)?;

        let mut slots = SmallVec::new();
        for cell in span.iter() {
            slots.push(self.attach(cell, entity));
        }

        self.entries.insert(
            entity,
            GridEntry {
                bounds,
                span,
                layers,
                slots,
            },
        );
        Ok(())
    }

    /// Move `entity` from `old` to `new`.
    ///
    /// `old` must describe the cells the grid already has on record. A
    /// mismatch means an upstream move was skipped: debug builds stop here,
    /// release builds log it and continue from the recorded cells.
    pub fn move_entity(
        &mut self,
        entity: EntityHandle,
        old: Aabb,
        new: Aabb,
    ) -> Result<MoveOutcome, SpatialError> {
        let recorded = self
            .entry(entity)
            .ok_or(SpatialError::NotTracked(entity))?
            .span;
        let claimed = self.span_for(&old);
        if claimed != recorded {
            let err = SpatialError::InconsistentState { entity };
            debug_assert!(false, "{err}");
            tracing::error!(?claimed, ?recorded, "{err}; continuing from recorded cells");
        }
        self.update(entity, new)
    }

    /// Move `entity` from its recorded bounds to `new`.
    ///
    /// Only cells that stop or start being overlapped are touched; an
    /// unchanged cell set costs one span comparison.
    pub fn update(&mut self, entity: EntityHandle, new: Aabb) -> Result<MoveOutcome, SpatialError> {
        if !new.is_valid() {
            return Err(SpatialError::InvalidBounds { entity });
        }
        let new_span = self.span_for(&new);
        let old_span = match self.entries.get_mut(&entity) {
            Some(entry) if entry.span == new_span => {
                entry.bounds = new;
                return Ok(MoveOutcome::SameCells);
            }
            Some(entry) => entry.span,
            None => return Err(SpatialError::NotTracked(entity)),
        };
        self.checked_span(entity, &new)?;
        self.ensure_room(new_span, Some(old_span))?;

        let Some(mut entry) = self.entries.remove(&entity) else {
            return Err(SpatialError::NotTracked(entity));
        };

        let mut kept: SmallVec<[Slot; 4]> = SmallVec::new();
        for slot in std::mem::take(&mut entry.slots) {
            if new_span.contains(self.buckets[slot.bucket as usize].cell) {
                kept.push(slot);
            } else {
                self.detach(slot);
            }
        }
        for cell in new_span.iter() {
            if !old_span.contains(cell) {
                kept.push(self.attach(cell, entity));
            }
        }

        entry.slots = kept;
        entry.span = new_span;
        entry.bounds = new;
        self.entries.insert(entity, entry);
        Ok(MoveOutcome::Relocated)
    }

    /// Returns `false` when the entity is not tracked.
    pub fn set_layers(&mut self, entity: EntityHandle, layers: CollisionLayers) -> bool {
        match self.entries.get_mut(&entity) {
            Some(entry) => {
                entry.layers = layers;
                true
            }
            None => false,
        }
    }

    /// Remove `entity` from every cell it occupies ("remove with holes").
    ///
    /// Returns `false` when the entity is not tracked.
    pub fn remove(&mut self, entity: EntityHandle) -> bool {
        let Some(entry) = self.entries.remove(&entity) else {
            return false;
        };
        for slot in entry.slots {
            self.detach(slot);
        }
        true
    }

    /// Append every entity in the cells overlapping the rectangle.
    ///
    /// Results are cell granular: entities near the rectangle but inside a
    /// touched cell are included. A `Vec` sink sees multi-cell entities
    /// once per shared cell; use `EntitySet` for unique results.
    pub fn query<S: EntitySink>(&self, out: &mut S, x: f32, y: f32, width: f32, height: f32) {
        self.query_bounds(out, &Aabb::from_rect(x, y, width, height));
    }

    pub fn query_bounds<S: EntitySink>(&self, out: &mut S, bounds: &Aabb) {
        if self.entries.is_empty() || !bounds.is_valid() {
            return;
        }
        let span = self.span_for(bounds);
        if span.cell_count() > self.buckets.len() as u64 {
            // Fewer live buckets than cells in the span.
            for bucket in self.buckets.iter().filter(|b| span.contains(b.cell)) {
                for &entity in &bucket.members {
                    out.push_entity(entity);
                }
            }
            return;
        }
        for cell in span.iter() {
            if let Some(&idx) = self.lookup.get(&cell) {
                for &entity in &self.buckets[idx as usize].members {
                    out.push_entity(entity);
                }
            }
        }
    }

    /// Forget every entity but keep buckets and their allocations.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.members.clear();
            bucket.grown = false;
        }
        self.entries.clear();
    }

    /// Check every recorded slot against the buckets and every recorded span
    /// against the stored bounds.
    pub fn verify(&self) -> Result<(), SpatialError> {
        let mut slot_total = 0usize;
        for (&entity, entry) in &self.entries {
            let broken = SpatialError::InconsistentState { entity };
            if self.span_for(&entry.bounds) != entry.span
                || entry.slots.len() as u64 != entry.span.cell_count()
            {
                return Err(broken);
            }
            for slot in &entry.slots {
                let bucket = self.buckets.get(slot.bucket as usize).ok_or_else(|| {
                    SpatialError::InconsistentState { entity }
                })?;
                if !entry.span.contains(bucket.cell)
                    || bucket.members.get(slot.index as usize) != Some(&entity)
                {
                    return Err(broken);
                }
            }
            slot_total += entry.slots.len();
        }
        let member_total: usize = self.buckets.iter().map(Bucket::len).sum();
        if member_total != slot_total {
            // A bucket holds a handle no entry points at.
            let stray = self
                .buckets
                .iter()
                .flat_map(|b| b.members.iter())
                .copied()
                .find(|e| !self.contains(*e))
                .unwrap_or(EntityHandle::new(u32::MAX));
            return Err(SpatialError::InconsistentState { entity: stray });
        }
        Ok(())
    }

    #[inline]
    fn entry(&self, entity: EntityHandle) -> Option<&GridEntry> {
        self.entries.get(&entity)
    }

    /// Span of `bounds`, refused when it covers more than `max_cells`.
    fn checked_span(&self, entity: EntityHandle, bounds: &Aabb) -> Result<CellSpan, SpatialError> {
        let span = self.span_for(bounds);
        let cells = span.cell_count();
        if cells > self.max_cells {
            return Err(SpatialError::TooManyCells {
                entity,
                cells,
                limit: self.max_cells,
            });
        }
        Ok(span)
    }

    /// Fail with `CapacityExceeded` if any cell of `span` outside `skip` is
    /// already full. A no-op under `CapacityPolicy::Grow`.
    fn ensure_room(&self, span: CellSpan, skip: Option<CellSpan>) -> Result<(), SpatialError> {
        if self.policy != CapacityPolicy::Reject {
            return Ok(());
        }
        for cell in span.iter() {
            if skip.is_some_and(|s| s.contains(cell)) {
                continue;
            }
            if let Some(&idx) = self.lookup.get(&cell) {
                if self.buckets[idx as usize].len() >= self.bucket_capacity {
                    return Err(SpatialError::CapacityExceeded {
                        cell,
                        capacity: self.bucket_capacity,
                    });
                }
            }
        }
        Ok(())
    }

    fn attach(&mut self, cell: CellCoord, entity: EntityHandle) -> Slot {
        let bucket_idx = match self.lookup.get(&cell) {
            Some(&idx) => idx,
            None => {
                let idx = self.buckets.len() as u32;
                self.buckets.push(Bucket::new(cell, self.bucket_capacity));
                self.lookup.insert(cell, idx);
                idx
            }
        };
        let capacity = self.bucket_capacity;
        let bucket = &mut self.buckets[bucket_idx as usize];
        if bucket.members.len() == capacity && !bucket.grown {
            bucket.grown = true;
            tracing::warn!(
                cell.x = cell.x,
                cell.y = cell.y,
                capacity,
                "bucket grew past its nominal capacity; consider a smaller cell size"
            );
        }
        let index = bucket.members.len() as u32;
        bucket.members.push(entity);
        Slot {
            bucket: bucket_idx,
            index,
        }
    }

    fn detach(&mut self, slot: Slot) {
        let bucket = &mut self.buckets[slot.bucket as usize];
        let index = slot.index as usize;
        if index >= bucket.members.len() {
            debug_assert!(false, "slot {index} past end of bucket {:?}", bucket.cell);
            return;
        }
        bucket.members.swap_remove(index);
        let Some(displaced) = bucket.members.get(index).copied() else {
            return;
        };
        if let Some(entry) = self.entries.get_mut(&displaced) {
            if let Some(moved) = entry.slots.iter_mut().find(|s| s.bucket == slot.bucket) {
                moved.index = slot.index;
            }
        }
    }
}
