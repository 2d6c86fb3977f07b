use foundation::math::Vec2;

/// Shoelace sum over a ring. Positive means clockwise in y-down tile space.
pub fn signed_area(ring: &[Vec2]) -> f64 {
    let mut sum = 0.0;
    let len = ring.len();
    for i in 0..len {
        let j = if i == 0 { len - 1 } else { i - 1 };
        let (p1, p2) = (ring[i], ring[j]);
        sum += (p2.x - p1.x) * (p1.y + p2.y);
    }
    sum
}

/// Group rings into polygons: a ring with the winding of the first ring
/// starts a new polygon, the opposite winding makes it a hole of the current
/// one. Zero-area rings are dropped.
pub fn classify_rings(rings: &[Vec<Vec2>]) -> Vec<Vec<Vec<Vec2>>> {
    if rings.len() <= 1 {
        return vec![rings.to_vec()];
    }

    let mut polygons = Vec::new();
    let mut polygon: Vec<Vec<Vec2>> = Vec::new();
    let mut ccw: Option<bool> = None;
    for ring in rings {
        let area = signed_area(ring);
        if area == 0.0 {
            continue;
        }
        let outer_winding = *ccw.get_or_insert(area < 0.0);
        if outer_winding == (area < 0.0) && !polygon.is_empty() {
            polygons.push(std::mem::take(&mut polygon));
        }
        polygon.push(ring.clone());
    }
    if !polygon.is_empty() {
        polygons.push(polygon);
    }
    polygons
}

#[cfg(test)]
mod tests {
    use super::{classify_rings, signed_area};
    use foundation::math::Vec2;

    fn square(x: f64, y: f64, size: f64, clockwise: bool) -> Vec<Vec2> {
        let mut ring = vec![
            Vec2::new(x, y),
            Vec2::new(x + size, y),
            Vec2::new(x + size, y + size),
            Vec2::new(x, y + size),
        ];
        if !clockwise {
            ring.reverse();
        }
        ring
    }

    #[test]
    fn winding_sign() {
        assert_eq!(signed_area(&square(0.0, 0.0, 10.0, true)), 200.0);
        assert_eq!(signed_area(&square(0.0, 0.0, 10.0, false)), -200.0);
    }

    #[test]
    fn holes_attach_to_their_outer_ring() {
        let rings = vec![
            square(0.0, 0.0, 100.0, true),
            square(10.0, 10.0, 10.0, false),
            square(200.0, 200.0, 50.0, true),
            vec![Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)],
        ];
        let polygons = classify_rings(&rings);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].len(), 2);
        assert_eq!(polygons[1].len(), 1);
    }
}
