//! Axis-aligned boxes and grid cell coordinates.

use glam::Vec2;

/// Axis-aligned bounding box in world units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box from a top-left corner and size.
    #[inline]
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(x + width, y + height))
    }

    #[inline]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Bounding square of a circle, as used by radius queries.
    #[inline]
    pub fn around(origin: Vec2, radius: f32) -> Self {
        Self::from_center(origin, Vec2::splat(radius))
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Finite coordinates and `min <= max` on both axes.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmple(self.max).all()
    }

    /// Closed-interval overlap test; touching edges count as overlapping.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Aabb::new(self.min.max(other.min), self.max.min(other.max)))
    }

    #[inline]
    pub fn translated(&self, offset: Vec2) -> Aabb {
        Aabb::new(self.min + offset, self.max + offset)
    }
}

/// Integer cell coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cell holding a world position. Out-of-range values saturate.
    #[inline]
    pub fn containing(point: Vec2, cell_size: f32) -> Self {
        Self::new(
            (point.x / cell_size).floor() as i32,
            (point.y / cell_size).floor() as i32,
        )
    }
}

/// Inclusive rectangle of cells.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CellSpan {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl CellSpan {
    #[inline]
    pub const fn new(min: CellCoord, max: CellCoord) -> Self {
        Self { min, max }
    }

    /// Every cell touched by `bounds`.
    pub fn covering(bounds: &Aabb, cell_size: f32) -> Self {
        Self::new(
            CellCoord::containing(bounds.min, cell_size),
            CellCoord::containing(bounds.max, cell_size),
        )
    }

    #[inline]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    pub fn cell_count(&self) -> u64 {
        let w = (self.max.x as i64 - self.min.x as i64 + 1).max(0) as u64;
        let h = (self.max.y as i64 - self.min.y as i64 + 1).max(0) as u64;
        w.saturating_mul(h)
    }

    /// Row-major walk, `y` outer.
    pub fn iter(&self) -> CellSpanIter {
        CellSpanIter {
            span: *self,
            x: self.min.x as i64,
            y: self.min.y as i64,
        }
    }
}

pub struct CellSpanIter {
    span: CellSpan,
    x: i64,
    y: i64,
}

impl Iterator for CellSpanIter {
    type Item = CellCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.y > self.span.max.y as i64 || self.span.min.x > self.span.max.x {
            return None;
        }
        let cell = CellCoord::new(self.x as i32, self.y as i32);
        self.x += 1;
        if self.x > self.span.max.x as i64 {
            self.x = self.span.min.x as i64;
            self.y += 1;
        }
        Some(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_division_handles_negative_coordinates() {
        assert_eq!(CellCoord::containing(Vec2::new(-0.5, 63.9), 64.0), CellCoord::new(-1, 0));
        assert_eq!(CellCoord::containing(Vec2::new(64.0, -64.0), 64.0), CellCoord::new(1, -1));
    }

    #[test]
    fn span_walks_row_major() {
        let span = CellSpan::new(CellCoord::new(-1, 0), CellCoord::new(0, 1));
        let cells: Vec<_> = span.iter().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(-1, 0),
                CellCoord::new(0, 0),
                CellCoord::new(-1, 1),
                CellCoord::new(0, 1),
            ]
        );
        assert_eq!(span.cell_count(), 4);
    }

    #[test]
    fn box_centered_near_origin_straddles_four_cells() {
        let bounds = Aabb::from_center(Vec2::new(10.0, 10.0), Vec2::splat(16.0));
        let span = CellSpan::covering(&bounds, 64.0);
        assert_eq!(span.min, CellCoord::new(-1, -1));
        assert_eq!(span.max, CellCoord::new(0, 0));
    }

    #[test]
    fn intersection_of_touching_boxes_is_degenerate() {
        let a = Aabb::from_rect(0.0, 0.0, 10.0, 10.0);
        let b = Aabb::from_rect(10.0, 0.0, 10.0, 10.0);
        let hit = a.intersection(&b).unwrap();
        assert_eq!(hit.width(), 0.0);
        assert!(a.intersection(&Aabb::from_rect(11.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn rejects_inverted_and_nan_boxes() {
        assert!(!Aabb::new(Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)).is_valid());
        assert!(!Aabb::new(Vec2::new(f32::NAN, 0.0), Vec2::ONE).is_valid());
        assert!(Aabb::from_rect(0.0, 0.0, 0.0, 0.0).is_valid());
    }
}
