//! Caller-owned output targets for grid queries.
//!
//! Queries append into a sink instead of returning a fresh `Vec`, so a
//! caller that keeps its sink around pays no allocation after warm-up.

use super::EntityHandle;
use std::collections::HashSet;

/// Destination for entities found by a grid query.
pub trait EntitySink {
    fn push_entity(&mut self, entity: EntityHandle);
}

/// Raw collection. An entity spanning several cells shows up once per cell.
impl EntitySink for Vec<EntityHandle> {
    #[inline]
    fn push_entity(&mut self, entity: EntityHandle) {
        self.push(entity);
    }
}

/// Insertion-ordered set of entities with O(1) membership.
///
/// Values are stored densely, so `as_slice` is contiguous and `clear` keeps
/// both allocations.
#[derive(Debug, Default, Clone)]
pub struct EntitySet {
    values: Vec<EntityHandle>,
    lookup: HashSet<EntityHandle>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            lookup: HashSet::with_capacity(capacity),
        }
    }

    /// Returns `false` if the entity was already present.
    pub fn insert(&mut self, entity: EntityHandle) -> bool {
        if self.lookup.insert(entity) {
            self.values.push(entity);
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn contains(&self, entity: EntityHandle) -> bool {
        self.lookup.contains(&entity)
    }

    #[inline]
    pub fn as_slice(&self) -> &[EntityHandle] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntityHandle> {
        self.values.iter()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.lookup.clear();
    }
}

impl EntitySink for EntitySet {
    #[inline]
    fn push_entity(&mut self, entity: EntityHandle) {
        self.insert(entity);
    }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = &'a EntityHandle;
    type IntoIter = std::slice::Iter<'a, EntityHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_first_insertion_order() {
        let mut set = EntitySet::new();
        for id in [4, 1, 4, 9, 1] {
            set.push_entity(EntityHandle::new(id));
        }
        let ids: Vec<u32> = set.iter().map(|e| e.index()).collect();
        assert_eq!(ids, vec![4, 1, 9]);
        assert!(set.contains(EntityHandle::new(9)));
        assert!(!set.contains(EntityHandle::new(2)));
    }

    #[test]
    fn clear_empties_without_forgetting_capacity() {
        let mut set = EntitySet::with_capacity(16);
        set.insert(EntityHandle::new(1));
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(EntityHandle::new(1)));
        assert!(set.values.capacity() >= 16);
    }
}
