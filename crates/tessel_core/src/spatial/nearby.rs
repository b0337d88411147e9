//! Single-slot cache for "entities near a point" queries.
//!
//! Several systems tend to ask the same question about the same actor in one
//! tick (AI perception, rendering, scripts). The cache keeps only the most
//! recent answer and reuses it when the next query is close enough.
//!
//! A query is close enough when, within the same tick and map, the origin
//! moved by at most `origin_epsilon`, the radius changed by at most
//! `radius_epsilon`, and the query still covers exactly the same cells.
//! Grid results are cell granular, so the last condition makes a hit return
//! exactly what a fresh scan would.

use super::{Aabb, CellSpan, EntityHandle, EntitySet, MapId, MapRegistry};
use crate::config::NearbyCacheConfig;
use glam::Vec2;

#[derive(Debug, Clone, Copy)]
struct CachedQuery {
    tick: u64,
    map: MapId,
    origin: Vec2,
    radius: f32,
    span: CellSpan,
}

pub struct NearbyQueryCache {
    config: NearbyCacheConfig,
    last: Option<CachedQuery>,
    result: EntitySet,
    hits: u64,
    misses: u64,
}

impl NearbyQueryCache {
    pub fn new(config: NearbyCacheConfig) -> Self {
        Self {
            config,
            last: None,
            result: EntitySet::with_capacity(64),
            hits: 0,
            misses: 0,
        }
    }

    /// Entities in the cells overlapped by the square of side `2 * radius`
    /// centered on `origin`.
    ///
    /// Unknown maps and non-finite parameters yield an empty slice and leave
    /// the cached entry alone.
    pub fn query(
        &mut self,
        maps: &MapRegistry,
        tick: u64,
        map: MapId,
        origin: Vec2,
        radius: f32,
    ) -> &[EntityHandle] {
        let Some(grid) = maps.get(map) else {
            return &[];
        };
        let bounds = Aabb::around(origin, radius);
        if !bounds.is_valid() {
            return &[];
        }
        let span = grid.span_for(&bounds);
        if self.is_similar(tick, map, origin, radius, span) {
            self.hits += 1;
            return self.result.as_slice();
        }

        self.misses += 1;
        self.result.clear();
        grid.query_bounds(&mut self.result, &bounds);
        self.last = Some(CachedQuery {
            tick,
            map,
            origin,
            radius,
            span,
        });
        self.result.as_slice()
    }

    /// Whether `target` is in the result of the given query, reusing the
    /// cached result when possible.
    pub fn query_contains(
        &mut self,
        maps: &MapRegistry,
        tick: u64,
        map: MapId,
        origin: Vec2,
        radius: f32,
        target: EntityHandle,
    ) -> bool {
        // An early-out returns an empty slice without touching `result`.
        let answered = !self.query(maps, tick, map, origin, radius).is_empty();
        answered && self.result.contains(target)
    }

    /// Membership test against the most recent result.
    #[inline]
    pub fn contains(&self, entity: EntityHandle) -> bool {
        self.last.is_some() && self.result.contains(entity)
    }

    /// Most recent result, empty if nothing is cached.
    pub fn last_result(&self) -> &[EntityHandle] {
        if self.last.is_some() {
            self.result.as_slice()
        } else {
            &[]
        }
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Drop the entry if it was computed for `map`.
    pub fn invalidate_map(&mut self, map: MapId) {
        if self.last.is_some_and(|last| last.map == map) {
            self.last = None;
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    fn is_similar(&self, tick: u64, map: MapId, origin: Vec2, radius: f32, span: CellSpan) -> bool {
        self.last.is_some_and(|last| {
            last.tick == tick
                && last.map == map
                && last.span == span
                && last.origin.distance(origin) <= self.config.origin_epsilon
                && (last.radius - radius).abs() <= self.config.radius_epsilon
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    fn setup() -> MapRegistry {
        let mut maps = MapRegistry::new(GridConfig::default());
        let grid = maps.grid(MapId::new(0));
        grid.insert(
            EntityHandle::new(1),
            Aabb::from_center(Vec2::new(10.0, 10.0), Vec2::splat(16.0)),
        )
        .unwrap();
        grid.insert(
            EntityHandle::new(2),
            Aabb::from_center(Vec2::new(1000.0, 1000.0), Vec2::splat(16.0)),
        )
        .unwrap();
        maps
    }

    #[test]
    fn near_identical_queries_hit() {
        let maps = setup();
        let mut cache = NearbyQueryCache::new(NearbyCacheConfig::default());
        let map = MapId::new(0);

        assert_eq!(cache.query(&maps, 1, map, Vec2::ZERO, 50.0), &[EntityHandle::new(1)]);
        cache.query(&maps, 1, map, Vec2::new(0.2, -0.1), 50.3);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        // New tick: recomputed even though the parameters match.
        cache.query(&maps, 2, map, Vec2::ZERO, 50.0);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn distant_query_misses_and_replaces_the_entry() {
        let maps = setup();
        let mut cache = NearbyQueryCache::new(NearbyCacheConfig::default());
        let map = MapId::new(0);

        cache.query(&maps, 1, map, Vec2::ZERO, 50.0);
        let far = cache.query(&maps, 1, map, Vec2::splat(1000.0), 50.0).to_vec();
        assert_eq!(far, vec![EntityHandle::new(2)]);
        assert!(cache.contains(EntityHandle::new(2)));
        assert!(!cache.contains(EntityHandle::new(1)));
    }

    #[test]
    fn unknown_map_is_empty_and_keeps_the_entry() {
        let maps = setup();
        let mut cache = NearbyQueryCache::new(NearbyCacheConfig::default());
        cache.query(&maps, 1, MapId::new(0), Vec2::ZERO, 50.0);

        assert!(cache.query(&maps, 1, MapId::new(7), Vec2::ZERO, 50.0).is_empty());
        assert_eq!(cache.last_result(), &[EntityHandle::new(1)]);
    }

    #[test]
    fn zero_epsilon_requires_exact_parameters() {
        let maps = setup();
        let mut cache = NearbyQueryCache::new(NearbyCacheConfig {
            origin_epsilon: 0.0,
            radius_epsilon: 0.0,
        });
        let map = MapId::new(0);
        cache.query(&maps, 1, map, Vec2::ZERO, 50.0);
        cache.query(&maps, 1, map, Vec2::new(0.01, 0.0), 50.0);
        cache.query(&maps, 1, map, Vec2::new(0.01, 0.0), 50.0);
        assert_eq!((cache.hits(), cache.misses()), (1, 2));
    }

    #[test]
    fn contains_after_invalidate_is_false() {
        let maps = setup();
        let mut cache = NearbyQueryCache::new(NearbyCacheConfig::default());
        let map = MapId::new(0);
        assert!(cache.query_contains(&maps, 1, map, Vec2::ZERO, 50.0, EntityHandle::new(1)));
        cache.invalidate_map(MapId::new(4));
        assert!(cache.contains(EntityHandle::new(1)));
        cache.invalidate_map(map);
        assert!(!cache.contains(EntityHandle::new(1)));
    }
}
