use foundation::math::Vec2;

/// Clip polylines to the box `[x1, x2] × [y1, y2]`.
///
/// Each line may split into several pieces; intersection points are rounded
/// to integer tile units.
pub fn clip_lines(lines: &[Vec<Vec2>], x1: f64, y1: f64, x2: f64, y2: f64) -> Vec<Vec<Vec2>> {
    let mut clipped: Vec<Vec<Vec2>> = Vec::new();
    for line in lines {
        let mut current: Option<usize> = None;
        for pair in line.windows(2) {
            let (mut p0, mut p1) = (pair[0], pair[1]);

            if p0.x < x1 && p1.x < x1 {
                continue;
            } else if p0.x < x1 {
                p0 = at_x(p0, p1, x1);
            } else if p1.x < x1 {
                p1 = at_x(p0, p1, x1);
            }

            if p0.y < y1 && p1.y < y1 {
                continue;
            } else if p0.y < y1 {
                p0 = at_y(p0, p1, y1);
            } else if p1.y < y1 {
                p1 = at_y(p0, p1, y1);
            }

            if p0.x > x2 && p1.x > x2 {
                continue;
            } else if p0.x > x2 {
                p0 = at_x(p0, p1, x2);
            } else if p1.x > x2 {
                p1 = at_x(p0, p1, x2);
            }

            if p0.y > y2 && p1.y > y2 {
                continue;
            } else if p0.y > y2 {
                p0 = at_y(p0, p1, y2);
            } else if p1.y > y2 {
                p1 = at_y(p0, p1, y2);
            }

            let continues = current
                .and_then(|i| clipped[i].last())
                .is_some_and(|last| *last == p0);
            if !continues {
                clipped.push(vec![p0]);
                current = Some(clipped.len() - 1);
            }
            if let Some(i) = current {
                clipped[i].push(p1);
            }
        }
    }
    clipped
}

fn at_x(p0: Vec2, p1: Vec2, x: f64) -> Vec2 {
    Vec2::new(x, p0.y + (p1.y - p0.y) * ((x - p0.x) / (p1.x - p0.x))).round()
}

fn at_y(p0: Vec2, p1: Vec2, y: f64) -> Vec2 {
    Vec2::new(p0.x + (p1.x - p0.x) * ((y - p0.y) / (p1.y - p0.y)), y).round()
}

#[cfg(test)]
mod tests {
    use super::clip_lines;
    use foundation::math::Vec2;
    use pretty_assertions::assert_eq;

    fn v(x: f64, y: f64) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn inside_lines_are_untouched() {
        let lines = vec![vec![v(1.0, 1.0), v(5.0, 5.0), v(9.0, 1.0)]];
        assert_eq!(clip_lines(&lines, 0.0, 0.0, 10.0, 10.0), lines);
    }

    #[test]
    fn crossing_lines_are_cut_at_the_edge() {
        let lines = vec![vec![v(-10.0, 5.0), v(20.0, 5.0)]];
        assert_eq!(
            clip_lines(&lines, 0.0, 0.0, 10.0, 10.0),
            vec![vec![v(0.0, 5.0), v(10.0, 5.0)]]
        );
    }

    #[test]
    fn excursions_split_the_line() {
        let lines = vec![vec![v(2.0, 5.0), v(2.0, 20.0), v(8.0, 20.0), v(8.0, 5.0)]];
        assert_eq!(
            clip_lines(&lines, 0.0, 0.0, 10.0, 10.0),
            vec![vec![v(2.0, 5.0), v(2.0, 10.0)], vec![v(8.0, 10.0), v(8.0, 5.0)]]
        );
    }
}
