//! Identifiers shared by every spatial structure.
//!
//! Handles are owned by the external entity registry. The grid stores them
//! by value and never assumes anything about their lifetime beyond "unique
//! while alive".

use std::fmt;

/// Opaque 32-bit entity identifier.
///
/// Recyclable after removal, so a stale handle must be removed from the
/// grid before the registry hands it out again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityHandle(u32);

impl EntityHandle {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl From<u32> for EntityHandle {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an independent spatial domain (level, instance, ...).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapId(u16);

impl MapId {
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map:{}", self.0)
    }
}

/// Collision layer mask. Two entities are only paired when they share a bit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CollisionLayers(u32);

impl CollisionLayers {
    pub const NONE: Self = Self(0);
    pub const DEFAULT: Self = Self(1);
    pub const ALL: Self = Self(u32::MAX);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn interacts_with(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for CollisionLayers {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_need_a_shared_bit() {
        let a = CollisionLayers::from_bits(0b0011);
        let b = CollisionLayers::from_bits(0b0100);
        assert!(!a.interacts_with(b));
        assert!(a.interacts_with(CollisionLayers::ALL));
        assert!(!CollisionLayers::NONE.interacts_with(CollisionLayers::ALL));
    }

    #[test]
    fn handles_order_by_index() {
        assert!(EntityHandle::new(3) < EntityHandle::new(10));
        assert_eq!(EntityHandle::from(7).index(), 7);
        assert_eq!(EntityHandle::new(5).to_string(), "#5");
    }
}
