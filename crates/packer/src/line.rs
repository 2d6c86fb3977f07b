use foundation::math::Vec2;

/// One logical vertex of a widened line.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CrossSection {
    pub point: Vec2,
    /// Unit-width extrusion towards the left (`up`) side; the right (`down`)
    /// side uses its negation. Longer than 1 at mitered joins.
    pub extrude: Vec2,
    /// Line length travelled up to `point`.
    pub distance: f64,
}

/// Remove consecutive duplicates; a closed ring also loses a repeated
/// closing point.
pub fn dedupe(line: &[Vec2], closed: bool) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(line.len());
    for &p in line {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    if closed && out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

/// Cross sections for `line`. Open lines extrude square to their end
/// segments; closed rings join the last point back to the first and repeat
/// the first section at the ring's full length.
///
/// Miters longer than `miter_limit` are clamped to it.
pub fn cross_sections(line: &[Vec2], closed: bool, miter_limit: f64) -> Vec<CrossSection> {
    let points = dedupe(line, closed);
    let n = points.len();
    if n < 2 || (closed && n < 3) {
        return Vec::new();
    }

    let mut sections = Vec::with_capacity(n + 1);
    let mut distance = 0.0;
    for i in 0..n {
        let point = points[i];
        let prev = if i > 0 {
            Some(points[i - 1])
        } else if closed {
            Some(points[n - 1])
        } else {
            None
        };
        let next = if i + 1 < n {
            Some(points[i + 1])
        } else if closed {
            Some(points[0])
        } else {
            None
        };
        if i > 0 {
            distance += points[i - 1].dist(point);
        }

        let prev_normal = prev.map(|p| (point - p).unit().perp());
        let next_normal = next.map(|q| (q - point).unit().perp());
        let extrude = match (prev_normal, next_normal) {
            (Some(a), Some(b)) => miter(a, b, miter_limit),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => Vec2::ZERO,
        };
        sections.push(CrossSection {
            point,
            extrude,
            distance,
        });
    }

    if closed {
        let first = sections[0];
        sections.push(CrossSection {
            distance: distance + points[n - 1].dist(first.point),
            ..first
        });
    }
    sections
}

fn miter(a: Vec2, b: Vec2, limit: f64) -> Vec2 {
    let join = (a + b).unit();
    if join == Vec2::ZERO {
        // the line doubles back on itself
        return b;
    }
    let cos_half = join.dot(b);
    let length = if cos_half > 0.0 { 1.0 / cos_half } else { limit };
    join.scale(length.min(limit))
}
