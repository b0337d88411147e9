//! One `HashGrid` per map, created on first use.

use super::{HashGrid, MapId};
use crate::config::GridConfig;
use std::collections::BTreeMap;

pub struct MapRegistry {
    config: GridConfig,
    // Ordered so every pass over the maps visits them in the same order.
    grids: BTreeMap<MapId, HashGrid>,
}

impl MapRegistry {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            grids: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Grid for `map`, created empty if the map has never been used.
    pub fn grid(&mut self, map: MapId) -> &mut HashGrid {
        let config = &self.config;
        self.grids.entry(map).or_insert_with(|| {
            tracing::debug!(%map, "creating spatial grid");
            HashGrid::new(config)
        })
    }

    /// Lookup without creating anything.
    pub fn get(&self, map: MapId) -> Option<&HashGrid> {
        self.grids.get(&map)
    }

    pub fn get_mut(&mut self, map: MapId) -> Option<&mut HashGrid> {
        self.grids.get_mut(&map)
    }

    #[inline]
    pub fn contains(&self, map: MapId) -> bool {
        self.grids.contains_key(&map)
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Maps in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (MapId, &HashGrid)> {
        self.grids.iter().map(|(&map, grid)| (map, grid))
    }

    /// Total entities tracked across all maps.
    pub fn entity_count(&self) -> usize {
        self.grids.values().map(HashGrid::len).sum()
    }

    /// Drop every grid, as on a global entity wipe.
    pub fn clear(&mut self) {
        self.grids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Aabb, EntityHandle};

    #[test]
    fn contains_does_not_create() {
        let mut maps = MapRegistry::new(GridConfig::default());
        assert!(!maps.contains(MapId::new(3)));
        assert!(maps.get(MapId::new(3)).is_none());
        assert!(maps.is_empty());

        maps.grid(MapId::new(3));
        assert!(maps.contains(MapId::new(3)));
        assert_eq!(maps.len(), 1);
    }

    #[test]
    fn maps_are_independent_and_ordered() {
        let mut maps = MapRegistry::new(GridConfig::default());
        let bounds = Aabb::from_rect(0.0, 0.0, 4.0, 4.0);
        maps.grid(MapId::new(9)).insert(EntityHandle::new(1), bounds).unwrap();
        maps.grid(MapId::new(2)).insert(EntityHandle::new(1), bounds).unwrap();

        let ids: Vec<u16> = maps.iter().map(|(map, _)| map.raw()).collect();
        assert_eq!(ids, vec![2, 9]);
        assert_eq!(maps.entity_count(), 2);

        maps.clear();
        assert!(maps.is_empty());
        assert_eq!(maps.entity_count(), 0);
    }
}
