use foundation::Aabb2;
use foundation::math::{StableF64, Vec2};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Interior point of `polygon` (outer ring first, then holes) farthest from
/// its boundary, found to within `precision`.
///
/// Returns `None` when the outer ring is empty.
pub fn pole_of_inaccessibility(polygon: &[Vec<Vec2>], precision: f64) -> Option<Vec2> {
    let outer = polygon.first()?;
    let bounds = Aabb2::from_points(outer.iter().copied())?;
    let (min_x, min_y) = (bounds.min[0], bounds.min[1]);

    let cell_size = bounds.width().min(bounds.height());
    if cell_size == 0.0 {
        return Some(Vec2::new(min_x, min_y));
    }
    let h = cell_size / 2.0;

    let mut queue = BinaryHeap::new();
    let mut x = min_x;
    while x < bounds.max[0] {
        let mut y = min_y;
        while y < bounds.max[1] {
            queue.push(Cell::new(Vec2::new(x + h, y + h), h, polygon));
            y += cell_size;
        }
        x += cell_size;
    }

    let mut best = centroid_cell(polygon).unwrap_or_else(|| Cell::new(outer[0], 0.0, polygon));
    while let Some(cell) = queue.pop() {
        if cell.d > best.d || best.d == 0.0 {
            best = cell;
        }
        if cell.max - best.d <= precision {
            continue;
        }
        let h = cell.h / 2.0;
        for (dx, dy) in [(-h, -h), (h, -h), (-h, h), (h, h)] {
            queue.push(Cell::new(cell.p + Vec2::new(dx, dy), h, polygon));
        }
    }
    Some(best.p)
}

#[derive(Debug, Copy, Clone)]
struct Cell {
    p: Vec2,
    h: f64,
    /// Signed distance to the boundary, positive inside.
    d: f64,
    /// Best distance any point of the cell could reach.
    max: f64,
}

impl Cell {
    fn new(p: Vec2, h: f64, polygon: &[Vec<Vec2>]) -> Self {
        let d = point_to_polygon_dist(p, polygon);
        Self {
            p,
            h,
            d,
            max: d + h * std::f64::consts::SQRT_2,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        StableF64(self.max) == StableF64(other.max)
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        StableF64(self.max).cmp(&StableF64(other.max))
    }
}

fn centroid_cell(polygon: &[Vec<Vec2>]) -> Option<Cell> {
    let points = polygon.first()?;
    let (mut area, mut x, mut y) = (0.0, 0.0, 0.0);
    let len = points.len();
    for i in 0..len {
        let a = points[i];
        let b = points[if i == 0 { len - 1 } else { i - 1 }];
        let f = a.x * b.y - b.x * a.y;
        x += (a.x + b.x) * f;
        y += (a.y + b.y) * f;
        area += f * 3.0;
    }
    if area == 0.0 {
        return None;
    }
    Some(Cell::new(Vec2::new(x / area, y / area), 0.0, polygon))
}

fn point_to_polygon_dist(p: Vec2, polygon: &[Vec<Vec2>]) -> f64 {
    let mut inside = false;
    let mut min_dist_sq = f64::INFINITY;
    for ring in polygon {
        let len = ring.len();
        for i in 0..len {
            let a = ring[i];
            let b = ring[if i == 0 { len - 1 } else { i - 1 }];
            if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
                inside = !inside;
            }
            min_dist_sq = min_dist_sq.min(dist_to_segment_sq(p, a, b));
        }
    }
    let sign = if inside { 1.0 } else { -1.0 };
    sign * min_dist_sq.sqrt()
}

fn dist_to_segment_sq(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let mut x = a.x;
    let mut y = a.y;
    let dx = b.x - x;
    let dy = b.y - y;
    if dx != 0.0 || dy != 0.0 {
        let t = ((p.x - x) * dx + (p.y - y) * dy) / (dx * dx + dy * dy);
        if t > 1.0 {
            x = b.x;
            y = b.y;
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }
    let (dx, dy) = (p.x - x, p.y - y);
    dx * dx + dy * dy
}
