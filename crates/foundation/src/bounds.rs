use crate::math::Vec2;

/// Axis-aligned bounding box in tile space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// The tile square `[0, extent]²`.
    pub fn tile(extent: f64) -> Self {
        Aabb2::new([0.0, 0.0], [extent, extent])
    }

    pub fn from_points<I: IntoIterator<Item = Vec2>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Aabb2::new([first.x, first.y], [first.x, first.y]);
        for p in iter {
            out.extend(p);
        }
        Some(out)
    }

    pub fn extend(&mut self, p: Vec2) {
        self.min[0] = self.min[0].min(p.x);
        self.min[1] = self.min[1].min(p.y);
        self.max[0] = self.max[0].max(p.x);
        self.max[1] = self.max[1].max(p.y);
    }

    /// Inclusive containment on every edge.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;
    use crate::math::Vec2;

    #[test]
    fn tile_bounds_are_inclusive() {
        let b = Aabb2::tile(8192.0);
        assert!(b.contains(Vec2::new(0.0, 0.0)));
        assert!(b.contains(Vec2::new(8192.0, 8192.0)));
        assert!(!b.contains(Vec2::new(-1.0, 10.0)));
        assert!(!b.contains(Vec2::new(10.0, 8193.0)));
    }

    #[test]
    fn from_points_covers_all() {
        let b = Aabb2::from_points([Vec2::new(3.0, -1.0), Vec2::new(-2.0, 4.0)]).expect("bounds");
        assert_eq!(b, Aabb2::new([-2.0, -1.0], [3.0, 4.0]));
        assert_eq!(b.width(), 5.0);
        assert!(Aabb2::from_points(std::iter::empty()).is_none());
    }
}
