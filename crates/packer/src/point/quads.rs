use super::shaping::{ShapedIcon, Shaping};
use crate::atlas::{GLYPH_BORDER, GlyphPosition, ImagePosition, Rect};
use foundation::math::Vec2;
use std::collections::BTreeMap;

/// One textured rectangle relative to its anchor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    pub tl: Vec2,
    pub tr: Vec2,
    pub bl: Vec2,
    pub br: Vec2,
    pub tex: Rect,
    /// Glyph center along the line (along-line text only).
    pub glyph_offset: [f64; 2],
}

pub fn glyph_quads(
    shaping: &Shaping,
    along_line: bool,
    positions: &BTreeMap<u32, GlyphPosition>,
) -> Vec<Quad> {
    let rect_buffer = f64::from(GLYPH_BORDER);
    let mut quads = Vec::with_capacity(shaping.glyphs.len());
    for positioned in &shaping.glyphs {
        let Some(glyph) = positions.get(&positioned.code) else {
            continue;
        };
        let rect = glyph.rect;
        if rect.w == 0 || rect.h == 0 {
            continue;
        }
        let half_advance = glyph.metrics.advance / 2.0;
        let glyph_offset = if along_line {
            [positioned.x + half_advance, positioned.y]
        } else {
            [0.0, 0.0]
        };
        let built_in = if along_line {
            Vec2::ZERO
        } else {
            Vec2::new(positioned.x + half_advance, positioned.y)
        };

        let x1 = glyph.metrics.left - rect_buffer - half_advance + built_in.x;
        let y1 = -glyph.metrics.top - rect_buffer + built_in.y;
        let x2 = x1 + f64::from(rect.w);
        let y2 = y1 + f64::from(rect.h);

        let mut corners = [
            Vec2::new(x1, y1),
            Vec2::new(x2, y1),
            Vec2::new(x1, y2),
            Vec2::new(x2, y2),
        ];
        if along_line && positioned.vertical {
            let center = Vec2::new(-half_advance, half_advance);
            let correction = Vec2::new(5.0, 0.0);
            for c in &mut corners {
                *c = center + (*c - center).rotate(-std::f64::consts::FRAC_PI_2) + correction;
            }
        }
        let [tl, tr, bl, br] = corners;
        quads.push(Quad {
            tl,
            tr,
            bl,
            br,
            tex: rect,
            glyph_offset,
        });
    }
    quads
}

/// Single quad covering the icon plus a one-texel border.
pub fn icon_quads(shape: &ShapedIcon, image: &ImagePosition) -> Vec<Quad> {
    let border = 1.0 / image.pixel_ratio;
    let top = shape.top - border;
    let left = shape.left - border;
    let bottom = shape.bottom + border;
    let right = shape.right + border;
    vec![Quad {
        tl: Vec2::new(left, top),
        tr: Vec2::new(right, top),
        bl: Vec2::new(left, bottom),
        br: Vec2::new(right, bottom),
        tex: image.padded_rect,
        glyph_offset: [0.0, 0.0],
    }]
}

#[cfg(test)]
mod tests {
    use super::{glyph_quads, icon_quads};
    use crate::atlas::{GlyphMetrics, GlyphPosition, ImagePosition, Rect};
    use crate::point::shaping::{Alignment, PositionedGlyph, Shaping, WritingMode, shape_icon};
    use foundation::math::Vec2;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn icon_quad_covers_padded_rect() {
        let image = ImagePosition {
            padded_rect: Rect { x: 0, y: 0, w: 18, h: 18 },
            pixel_ratio: 1.0,
            tl: [1.0, 1.0],
            br: [17.0, 17.0],
            display_size: [16.0, 16.0],
        };
        let quads = icon_quads(&shape_icon(&image, Alignment::CENTER), &image);
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].tl, Vec2::new(-9.0, -9.0));
        assert_eq!(quads[0].br, Vec2::new(9.0, 9.0));
        assert_eq!(quads[0].tex, image.padded_rect);
    }

    #[test]
    fn glyph_quads_follow_positions() {
        let mut positions = BTreeMap::new();
        positions.insert(
            'a' as u32,
            GlyphPosition {
                rect: Rect { x: 1, y: 1, w: 20, h: 24 },
                metrics: GlyphMetrics {
                    width: 14.0,
                    height: 18.0,
                    left: 1.0,
                    top: -6.0,
                    advance: 16.0,
                },
            },
        );
        positions.insert(
            ' ' as u32,
            GlyphPosition {
                rect: Rect::default(),
                metrics: GlyphMetrics {
                    advance: 6.0,
                    ..GlyphMetrics::default()
                },
            },
        );
        let shaping = Shaping {
            glyphs: vec![
                PositionedGlyph { code: 'a' as u32, x: -8.0, y: 0.0, vertical: false },
                PositionedGlyph { code: ' ' as u32, x: 8.0, y: 0.0, vertical: false },
            ],
            top: -14.4,
            bottom: 14.4,
            left: -8.0,
            right: 14.0,
            writing_mode: WritingMode::Horizontal,
        };

        let quads = glyph_quads(&shaping, false, &positions);
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].tl, Vec2::new(-10.0, 3.0));
        assert_eq!(quads[0].br, Vec2::new(10.0, 27.0));
        assert_eq!(quads[0].glyph_offset, [0.0, 0.0]);

        let along = glyph_quads(&shaping, true, &positions);
        assert_eq!(along[0].glyph_offset, [0.0, 0.0]);
        assert_eq!(along[0].tl, Vec2::new(-10.0, 3.0));
    }
}
