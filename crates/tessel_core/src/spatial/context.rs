//! Owner of all spatial state for one simulation instance.

use super::{
    Aabb, BroadPhase, BroadPhaseStats, CollisionLayers, EntityHandle, MapId, MapRegistry,
    MoveOutcome, NearbyQueryCache, PairInfo, SpatialError,
};
use crate::config::SpatialSettings;
use crate::time::SimulationTime;
use glam::Vec2;
use std::collections::HashMap;
use tessel_metrics::PhaseProfiler;

/// Where an entity is and what it collides with, as reported by the entity
/// registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub map: MapId,
    pub bounds: Aabb,
    pub layers: CollisionLayers,
}

/// Read-only view of the external entity registry.
pub trait EntitySource {
    fn is_valid(&self, entity: EntityHandle) -> bool;

    /// `None` for entities that exist but take no part in collision.
    fn placement(&self, entity: EntityHandle) -> Option<Placement>;
}

/// What `SpatialContext::sync` did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub relocated: usize,
    pub unchanged: usize,
    pub removed: usize,
    /// Entities whose insert or move was refused. A refused insert leaves the
    /// entity untracked; a refused move leaves it at its previous bounds.
    pub rejected: Vec<EntityHandle>,
}

/// Grids, broad phase and query cache of one simulation.
///
/// Mutations (`insert`, `update`, `remove`, `sync`) belong between ticks on
/// the owning thread; `run_broad_phase` only reads the grids.
pub struct SpatialContext {
    maps: MapRegistry,
    locations: HashMap<EntityHandle, MapId>,
    broad_phase: BroadPhase,
    nearby: NearbyQueryCache,
    time: SimulationTime,
    profiler: PhaseProfiler,
}

impl SpatialContext {
    pub fn new(settings: &SpatialSettings) -> Result<Self, SpatialError> {
        Ok(Self {
            maps: MapRegistry::new(settings.grid.clone()),
            locations: HashMap::new(),
            broad_phase: BroadPhase::new(&settings.broad_phase)?,
            nearby: NearbyQueryCache::new(settings.nearby.clone()),
            time: SimulationTime::new(),
            profiler: PhaseProfiler::new(),
        })
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.time.tick_count()
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    /// Start a tick: tick-scoped pair state and the nearby cache are reset.
    pub fn begin_tick(&mut self) {
        self.time.advance_tick();
        self.broad_phase.clear();
        self.nearby.invalidate();
    }

    pub fn maps(&self) -> &MapRegistry {
        &self.maps
    }

    /// Tracked entity count across all maps.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn map_of(&self, entity: EntityHandle) -> Option<MapId> {
        self.locations.get(&entity).copied()
    }

    pub fn insert(&mut self, entity: EntityHandle, map: MapId, bounds: Aabb) -> Result<(), SpatialError> {
        self.insert_with_layers(entity, map, bounds, CollisionLayers::DEFAULT)
    }

    pub fn insert_with_layers(
        &mut self,
        entity: EntityHandle,
        map: MapId,
        bounds: Aabb,
        layers: CollisionLayers,
    ) -> Result<(), SpatialError> {
        if self.locations.contains_key(&entity) {
            return Err(SpatialError::AlreadyTracked(entity));
        }
        self.maps.grid(map).insert_with_layers(entity, bounds, layers)?;
        self.locations.insert(entity, map);
        self.nearby.invalidate_map(map);
        Ok(())
    }

    /// Move `entity` to `bounds` on `map`, switching grids if the map changed.
    /// The entity keeps its layers.
    pub fn update(&mut self, entity: EntityHandle, map: MapId, bounds: Aabb) -> Result<MoveOutcome, SpatialError> {
        let current = self
            .locations
            .get(&entity)
            .copied()
            .ok_or(SpatialError::NotTracked(entity))?;
        let layers = self
            .maps
            .get(current)
            .and_then(|grid| grid.tracked(entity))
            .map_or(CollisionLayers::DEFAULT, |t| t.layers);
        self.update_with_layers(entity, map, bounds, layers)
    }

    /// Like `update`, also replacing the layers. A refused move changes
    /// neither bounds nor layers.
    pub fn update_with_layers(
        &mut self,
        entity: EntityHandle,
        map: MapId,
        bounds: Aabb,
        layers: CollisionLayers,
    ) -> Result<MoveOutcome, SpatialError> {
        let current = self
            .locations
            .get(&entity)
            .copied()
            .ok_or(SpatialError::NotTracked(entity))?;
        if current == map {
            let grid = self.maps.grid(map);
            let outcome = grid.update(entity, bounds)?;
            grid.set_layers(entity, layers);
            if outcome == MoveOutcome::Relocated {
                self.nearby.invalidate_map(map);
            }
            return Ok(outcome);
        }

        // Insert first so a refused insert leaves the old membership intact.
        self.maps.grid(map).insert_with_layers(entity, bounds, layers)?;
        if let Some(grid) = self.maps.get_mut(current) {
            grid.remove(entity);
        }
        self.locations.insert(entity, map);
        self.nearby.invalidate_map(current);
        self.nearby.invalidate_map(map);
        tracing::trace!(%entity, from = %current, to = %map, "entity changed map");
        Ok(MoveOutcome::Relocated)
    }

    /// Explicit move within the entity's current map; see
    /// `HashGrid::move_entity` for how a stale `old` is handled.
    pub fn move_entity(&mut self, entity: EntityHandle, old: Aabb, new: Aabb) -> Result<MoveOutcome, SpatialError> {
        let map = self
            .locations
            .get(&entity)
            .copied()
            .ok_or(SpatialError::NotTracked(entity))?;
        let grid = self.maps.get_mut(map).ok_or(SpatialError::InvalidMap(map))?;
        let outcome = grid.move_entity(entity, old, new)?;
        if outcome == MoveOutcome::Relocated {
            self.nearby.invalidate_map(map);
        }
        Ok(outcome)
    }

    pub fn set_layers(&mut self, entity: EntityHandle, layers: CollisionLayers) -> bool {
        let Some(map) = self.map_of(entity) else {
            return false;
        };
        self.maps
            .get_mut(map)
            .is_some_and(|grid| grid.set_layers(entity, layers))
    }

    /// Stop tracking `entity`. Call before the registry recycles the handle.
    pub fn remove(&mut self, entity: EntityHandle) -> bool {
        let Some(map) = self.locations.remove(&entity) else {
            return false;
        };
        self.nearby.invalidate_map(map);
        self.maps.get_mut(map).is_some_and(|grid| grid.remove(entity))
    }

    /// Drop every grid and every tracked entity.
    pub fn destroy_all(&mut self) {
        tracing::debug!(entities = self.locations.len(), maps = self.maps.len(), "destroying all spatial state");
        self.maps.clear();
        self.locations.clear();
        self.broad_phase.clear();
        self.nearby.invalidate();
    }

    /// Bring the grids in line with `source` for the given entities.
    ///
    /// Invalid handles and entities without a placement are removed. Refused
    /// updates are logged and listed in the report.
    pub fn sync<S, I>(&mut self, source: &S, entities: I) -> SyncReport
    where
        S: EntitySource + ?Sized,
        I: IntoIterator<Item = EntityHandle>,
    {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        let mut report = SyncReport::default();
        for entity in entities {
            let placement = if source.is_valid(entity) {
                source.placement(entity)
            } else {
                None
            };
            let Some(placement) = placement else {
                if self.remove(entity) {
                    report.removed += 1;
                }
                continue;
            };

            let result = if self.locations.contains_key(&entity) {
                self.update_with_layers(entity, placement.map, placement.bounds, placement.layers)
                    .map(|outcome| match outcome {
                        MoveOutcome::SameCells => report.unchanged += 1,
                        MoveOutcome::Relocated => report.relocated += 1,
                    })
            } else {
                self.insert_with_layers(entity, placement.map, placement.bounds, placement.layers)
                    .map(|()| report.inserted += 1)
            };
            if let Err(err) = result {
                tracing::warn!(%entity, map = %placement.map, "spatial update refused: {err}");
                report.rejected.push(entity);
            }
        }

        tessel_metrics::metrics! {
            self.profiler.record("grid_sync", started.elapsed());
        }
        report
    }

    /// Run the broad phase over every map. Returns the candidate pair count.
    pub fn run_broad_phase(&mut self) -> usize {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        let emitted = self.broad_phase.run(&self.maps);

        tessel_metrics::metrics! {
            self.profiler.record("broad_phase", started.elapsed());
        }
        emitted
    }

    /// Candidate pairs of this tick in deterministic order. Consumed by
    /// iterating; a second call in the same tick yields nothing.
    pub fn candidate_pairs(&mut self) -> std::vec::Drain<'_, PairInfo> {
        self.broad_phase.drain()
    }

    pub fn broad_phase_stats(&self) -> BroadPhaseStats {
        self.broad_phase.stats()
    }

    pub fn broad_phase_task_count(&self) -> usize {
        self.broad_phase.task_count()
    }

    /// Entities in the cells around `origin`, served from the nearby cache
    /// when an equivalent query already ran this tick.
    pub fn nearby_entities(&mut self, map: MapId, origin: Vec2, radius: f32) -> &[EntityHandle] {
        self.nearby.query(&self.maps, self.time.tick_count(), map, origin, radius)
    }

    pub fn nearby_contains(&mut self, map: MapId, origin: Vec2, radius: f32, target: EntityHandle) -> bool {
        self.nearby
            .query_contains(&self.maps, self.time.tick_count(), map, origin, radius, target)
    }

    /// `(hits, misses)` of the nearby cache since creation.
    pub fn nearby_cache_stats(&self) -> (u64, u64) {
        (self.nearby.hits(), self.nearby.misses())
    }

    /// Timings of `grid_sync` and `broad_phase`.
    pub fn profiler(&self) -> &PhaseProfiler {
        &self.profiler
    }

    /// Timings of the broad phase's `scan` and `merge` steps.
    pub fn broad_phase_profiler(&self) -> &PhaseProfiler {
        self.broad_phase.profiler()
    }
}
