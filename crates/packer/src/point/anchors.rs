use foundation::math::Vec2;
use std::collections::VecDeque;

/// Placement point for one marker or label.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Anchor {
    pub point: Vec2,
    /// Altitude carried over from the source vertex (0 for derived anchors).
    pub z: f64,
    /// Tangent angle of the line at the anchor.
    pub angle: f64,
    /// Segment of the owning line the anchor sits on.
    pub segment: Option<usize>,
    /// Number of points of the owning line.
    pub line_len: usize,
    /// First point of the owning line in the line-vertex buffer.
    pub start_index: usize,
}

impl Anchor {
    pub fn at(point: Vec2, z: f64) -> Self {
        Self {
            point,
            z,
            angle: 0.0,
            segment: None,
            line_len: 0,
            start_index: 0,
        }
    }
}

/// Anchors every `spacing` along `line`.
///
/// `label_width` is the unscaled width of the shaped label; when present the
/// turn angle inside a window around each anchor is limited to `max_angle`.
/// A line that does not start on the tile edge falls back to one anchor at
/// its middle when nothing else fits. A spacing that is not positive places
/// nothing.
#[allow(clippy::too_many_arguments)]
pub fn get_anchors(
    line: &[Vec2],
    spacing: f64,
    max_angle: f64,
    label_width: Option<f64>,
    glyph_size: f64,
    box_scale: f64,
    overscaling: f64,
    tile_extent: f64,
) -> Vec<Anchor> {
    let Some(first) = line.first() else {
        return Vec::new();
    };
    if spacing.is_nan() || spacing <= 0.0 {
        return Vec::new();
    }
    let angle_window = if label_width.is_some() {
        3.0 / 5.0 * glyph_size * box_scale
    } else {
        0.0
    };
    let label_length = label_width.unwrap_or(0.0);
    let continued =
        first.x == 0.0 || first.x == tile_extent || first.y == 0.0 || first.y == tile_extent;

    let mut spacing = spacing;
    if spacing - label_length * box_scale < spacing / 4.0 {
        spacing = label_length * box_scale + spacing / 4.0;
    }

    let fixed_extra_offset = glyph_size * 2.0;
    let offset = if continued {
        (spacing / 2.0 * overscaling) % spacing
    } else {
        ((label_length / 2.0 + fixed_extra_offset) * box_scale * overscaling) % spacing
    };

    resample(
        line,
        offset,
        spacing,
        angle_window,
        max_angle,
        label_length * box_scale,
        continued,
        false,
        tile_extent,
    )
}

#[allow(clippy::too_many_arguments)]
fn resample(
    line: &[Vec2],
    offset: f64,
    spacing: f64,
    angle_window: f64,
    max_angle: f64,
    label_length: f64,
    continued: bool,
    at_middle: bool,
    tile_extent: f64,
) -> Vec<Anchor> {
    let half_label = label_length / 2.0;
    let line_length: f64 = line.windows(2).map(|w| w[0].dist(w[1])).sum();

    let mut distance = 0.0;
    let mut marked = offset - spacing;
    let mut anchors = Vec::new();
    for (i, pair) in line.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        let segment_dist = a.dist(b);
        let angle = b.angle_to(a);
        while marked + spacing < distance + segment_dist {
            marked += spacing;
            let t = (marked - distance) / segment_dist;
            let p = a.lerp(b, t);
            if p.x >= 0.0
                && p.x < tile_extent
                && p.y >= 0.0
                && p.y < tile_extent
                && marked - half_label >= 0.0
                && marked + half_label <= line_length
            {
                let anchor = Anchor {
                    point: p.round(),
                    z: 0.0,
                    angle,
                    segment: Some(i),
                    line_len: line.len(),
                    start_index: 0,
                };
                if angle_window == 0.0
                    || check_max_angle(line, &anchor, label_length, angle_window, max_angle)
                {
                    anchors.push(anchor);
                }
            }
        }
        distance += segment_dist;
    }

    if !at_middle && anchors.is_empty() && !continued {
        return resample(
            line,
            distance / 2.0,
            spacing,
            angle_window,
            max_angle,
            label_length,
            continued,
            true,
            tile_extent,
        );
    }
    anchors
}

/// Whether the line bends less than `max_angle` inside every `window` of
/// the label centered on `anchor`.
pub fn check_max_angle(
    line: &[Vec2],
    anchor: &Anchor,
    label_length: f64,
    window: f64,
    max_angle: f64,
) -> bool {
    let Some(segment) = anchor.segment else {
        return true;
    };
    if label_length <= 0.0 {
        return true;
    }

    let mut p = anchor.point;
    let mut index = segment as isize + 1;
    let mut anchor_distance = 0.0;
    // walk back to the start of the label
    while anchor_distance > -label_length / 2.0 {
        index -= 1;
        if index < 0 {
            return false;
        }
        let q = line[index as usize];
        anchor_distance -= q.dist(p);
        p = q;
    }

    let mut index = index as usize;
    anchor_distance += line[index].dist(line[index + 1]);
    index += 1;

    let mut corners: VecDeque<(f64, f64)> = VecDeque::new();
    let mut recent_delta = 0.0;
    while anchor_distance < label_length / 2.0 {
        let Some(&next) = line.get(index + 1) else {
            return false;
        };
        let prev = line[index - 1];
        let current = line[index];

        let delta = prev.angle_to(current) - current.angle_to(next);
        let delta = ((delta + 3.0 * std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI)
            - std::f64::consts::PI)
            .abs();
        corners.push_back((anchor_distance, delta));
        recent_delta += delta;

        while let Some(&(corner_distance, corner_delta)) = corners.front()
            && anchor_distance - corner_distance > window
        {
            recent_delta -= corner_delta;
            corners.pop_front();
        }

        if recent_delta > max_angle {
            return false;
        }
        index += 1;
        anchor_distance += current.dist(next);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{Anchor, check_max_angle, get_anchors};
    use foundation::math::Vec2;
    use pretty_assertions::assert_eq;
    use std::f64::consts::PI;

    const MAX_ANGLE: f64 = 45.0 * PI / 100.0;

    fn v(x: f64, y: f64) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn anchor_count_follows_spacing() {
        let line = [v(10.0, 100.0), v(2010.0, 100.0)];
        let length = 2000.0;
        let spacing = 250.0;
        let anchors = get_anchors(&line, spacing, MAX_ANGLE, None, 24.0, 1.0, 1.0, 8192.0);
        let expected = (length / spacing).floor() as i64;
        assert!((anchors.len() as i64 - expected).abs() <= 1, "got {}", anchors.len());
        for pair in anchors.windows(2) {
            assert!((pair[0].point.dist(pair[1].point) - spacing).abs() <= 1.0);
        }
        assert!(anchors.iter().all(|a| a.segment == Some(0) && a.line_len == 2));
    }

    #[test]
    fn short_lines_fall_back_to_the_middle() {
        let line = [v(100.0, 100.0), v(140.0, 100.0)];
        let anchors = get_anchors(&line, 250.0, MAX_ANGLE, None, 24.0, 1.0, 1.0, 8192.0);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].point, v(120.0, 100.0));
    }

    #[test]
    fn continued_lines_do_not_fall_back() {
        let line = [v(0.0, 100.0), v(40.0, 100.0)];
        assert!(get_anchors(&line, 250.0, MAX_ANGLE, None, 24.0, 1.0, 1.0, 8192.0).is_empty());
    }

    #[test]
    fn non_positive_spacing_places_nothing() {
        let line = [v(100.0, 100.0), v(2100.0, 100.0)];
        for spacing in [-250.0, 0.0, f64::NAN] {
            let anchors = get_anchors(&line, spacing, MAX_ANGLE, None, 24.0, 1.0, 1.0, 8192.0);
            assert!(anchors.is_empty(), "spacing {spacing}");
        }
    }

    #[test]
    fn sharp_turns_reject_labels() {
        let zigzag = [v(100.0, 100.0), v(200.0, 100.0), v(100.0, 110.0), v(200.0, 120.0)];
        let anchor = Anchor {
            point: v(150.0, 105.0),
            z: 0.0,
            angle: 0.0,
            segment: Some(1),
            line_len: 4,
            start_index: 0,
        };
        assert!(!check_max_angle(&zigzag, &anchor, 200.0, 100.0, MAX_ANGLE));

        let straight = [v(100.0, 100.0), v(200.0, 100.0), v(300.0, 100.0)];
        let anchor = Anchor { point: v(200.0, 100.0), ..anchor };
        assert!(check_max_angle(&straight, &anchor, 200.0, 100.0, MAX_ANGLE));
    }

    #[test]
    fn labelled_anchors_respect_max_turn() {
        let line = [v(100.0, 100.0), v(1100.0, 100.0), v(1100.0, 1100.0)];
        let anchors = get_anchors(&line, 100.0, MAX_ANGLE, Some(60.0), 24.0, 1.0, 1.0, 8192.0);
        assert!(!anchors.is_empty());
        for a in &anchors {
            assert!(check_max_angle(&line, a, 60.0, 3.0 / 5.0 * 24.0, MAX_ANGLE));
        }
    }
}
