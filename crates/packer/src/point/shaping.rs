use super::script::{char_has_upright_vertical_orientation, is_break_opportunity};
use crate::atlas::{GlyphPosition, ImagePosition};
use std::collections::BTreeMap;

/// Em size of the SDF glyphs in the atlas.
pub const ONE_EM: f64 = 24.0;

pub const LINE_HEIGHT: f64 = 1.2 * ONE_EM;

/// Baseline shift of the first line.
const Y_OFFSET: f64 = -17.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WritingMode {
    Horizontal,
    Vertical,
}

/// Fractions of the label size to shift left/up so the anchor lands on the
/// requested side.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Alignment {
    pub horizontal: f64,
    pub vertical: f64,
}

impl Alignment {
    pub const CENTER: Alignment = Alignment {
        horizontal: 0.5,
        vertical: 0.5,
    };

    /// `right`/`left` and `bottom`/`top`; anything else centers.
    pub fn from_names(horizontal: Option<&str>, vertical: Option<&str>) -> Self {
        Self {
            horizontal: match horizontal {
                Some("right") => 1.0,
                Some("left") => 0.0,
                _ => 0.5,
            },
            vertical: match vertical {
                Some("bottom") => 1.0,
                Some("top") => 0.0,
                _ => 0.5,
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PositionedGlyph {
    pub code: u32,
    pub x: f64,
    pub y: f64,
    pub vertical: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shaping {
    pub glyphs: Vec<PositionedGlyph>,
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    pub writing_mode: WritingMode,
}

impl Shaping {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }
}

pub struct TextLayout {
    pub max_width: f64,
    pub line_height: f64,
    pub alignment: Alignment,
    /// 0 left, 0.5 center, 1 right.
    pub justify: f64,
    pub letter_spacing: f64,
    pub translate: [f64; 2],
    pub vertical_height: f64,
}

/// Lay out `text` with `glyphs`; `None` when no glyph could be positioned.
pub fn shape_text(
    text: &str,
    glyphs: &BTreeMap<u32, GlyphPosition>,
    layout: &TextLayout,
    writing_mode: WritingMode,
) -> Option<Shaping> {
    let spacing = layout.letter_spacing;
    let lines = break_lines(text.trim(), glyphs, layout.max_width, spacing);

    let mut positioned: Vec<PositionedGlyph> = Vec::new();
    let mut max_line_length: f64 = 0.0;
    let mut y = Y_OFFSET;
    for line in &lines {
        let line = line.trim();
        if line.is_empty() {
            y += layout.line_height;
            continue;
        }
        let start = positioned.len();
        let mut x = 0.0;
        for c in line.chars() {
            let code = c as u32;
            let Some(glyph) = glyphs.get(&code) else {
                continue;
            };
            if writing_mode == WritingMode::Horizontal || !char_has_upright_vertical_orientation(c) {
                positioned.push(PositionedGlyph {
                    code,
                    x,
                    y,
                    vertical: false,
                });
                x += glyph.metrics.advance + spacing;
            } else {
                positioned.push(PositionedGlyph {
                    code,
                    x,
                    y: 0.0,
                    vertical: true,
                });
                x += layout.vertical_height + spacing;
            }
        }
        if positioned.len() != start {
            max_line_length = max_line_length.max(x - spacing);
            justify_line(&mut positioned[start..], glyphs, layout.justify);
        }
        y += layout.line_height;
    }
    if positioned.is_empty() {
        return None;
    }

    let Alignment {
        horizontal,
        vertical,
    } = layout.alignment;
    let line_count = lines.len() as f64;
    let shift_x = (layout.justify - horizontal) * max_line_length + layout.translate[0];
    let shift_y = (-vertical * line_count + 0.5) * layout.line_height + layout.translate[1];
    for g in &mut positioned {
        g.x += shift_x;
        g.y += shift_y;
    }

    let height = line_count * layout.line_height;
    let top = layout.translate[1] - vertical * height;
    let left = layout.translate[0] - horizontal * max_line_length;
    Some(Shaping {
        glyphs: positioned,
        top,
        bottom: top + height,
        left,
        right: left + max_line_length,
        writing_mode,
    })
}

fn justify_line(line: &mut [PositionedGlyph], glyphs: &BTreeMap<u32, GlyphPosition>, justify: f64) {
    if justify == 0.0 {
        return;
    }
    let Some(last) = line.last() else {
        return;
    };
    let Some(glyph) = glyphs.get(&last.code) else {
        return;
    };
    let indent = (last.x + glyph.metrics.advance) * justify;
    for g in line {
        g.x -= indent;
    }
}

/// Greedy wrapping at break opportunities; `\n` always breaks.
fn break_lines(
    text: &str,
    glyphs: &BTreeMap<u32, GlyphPosition>,
    max_width: f64,
    spacing: f64,
) -> Vec<String> {
    let advance = |c: char| {
        glyphs
            .get(&(c as u32))
            .map(|g| g.metrics.advance + spacing)
            .unwrap_or(0.0)
    };

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut width = 0.0;
        let mut word = String::new();
        let mut word_width = 0.0;
        for c in paragraph.chars() {
            word.push(c);
            word_width += advance(c);
            if is_break_opportunity(c) {
                if !line.is_empty() && width + word_width - trailing(&word, advance) > max_width {
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
                line.push_str(&word);
                width += word_width;
                word.clear();
                word_width = 0.0;
            }
        }
        if !word.is_empty() {
            if !line.is_empty() && width + word_width > max_width {
                lines.push(std::mem::take(&mut line));
            }
            line.push_str(&word);
        }
        lines.push(line);
    }
    lines
}

/// Width of trailing whitespace, which may hang past the wrap width.
fn trailing(word: &str, advance: impl Fn(char) -> f64) -> f64 {
    word.chars()
        .rev()
        .take_while(|c| c.is_whitespace())
        .map(advance)
        .sum()
}

/// Icon box relative to the anchor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShapedIcon {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl ShapedIcon {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }
}

pub fn shape_icon(image: &ImagePosition, alignment: Alignment) -> ShapedIcon {
    let [w, h] = image.display_size;
    let left = -w * alignment.horizontal;
    let top = -h * alignment.vertical;
    ShapedIcon {
        top,
        bottom: top + h,
        left,
        right: left + w,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Alignment, LINE_HEIGHT, ONE_EM, TextLayout, WritingMode, shape_icon, shape_text,
    };
    use crate::atlas::{GlyphMetrics, GlyphPosition, ImagePosition, Rect};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn glyphs(text: &str) -> BTreeMap<u32, GlyphPosition> {
        text.chars()
            .map(|c| {
                let advance = if c == ' ' { 6.0 } else { 16.0 };
                (
                    c as u32,
                    GlyphPosition {
                        rect: Rect { x: 0, y: 0, w: 20, h: 24 },
                        metrics: GlyphMetrics {
                            width: 14.0,
                            height: 18.0,
                            left: 1.0,
                            top: -6.0,
                            advance,
                        },
                    },
                )
            })
            .collect()
    }

    fn layout(max_width: f64) -> TextLayout {
        TextLayout {
            max_width,
            line_height: LINE_HEIGHT,
            alignment: Alignment::CENTER,
            justify: 0.5,
            letter_spacing: 0.0,
            translate: [0.0, 0.0],
            vertical_height: ONE_EM,
        }
    }

    #[test]
    fn single_line_is_centered() {
        let shaping = shape_text("ab", &glyphs("ab"), &layout(240.0), WritingMode::Horizontal);
        let Some(shaping) = shaping else {
            panic!("no shaping");
        };
        assert_eq!(shaping.glyphs.len(), 2);
        assert_eq!(shaping.glyphs[0].x, -16.0);
        assert_eq!(shaping.glyphs[1].x, 0.0);
        assert_eq!(shaping.left, -16.0);
        assert_eq!(shaping.width(), 32.0);
        assert_eq!(shaping.bottom - shaping.top, LINE_HEIGHT);
    }

    #[test]
    fn long_text_wraps() {
        let text = "aaaa bbbb cccc";
        let Some(shaping) = shape_text(text, &glyphs(text), &layout(80.0), WritingMode::Horizontal)
        else {
            panic!("no shaping");
        };
        let mut rows: Vec<f64> = shaping.glyphs.iter().map(|g| g.y).collect();
        rows.dedup();
        assert_eq!(rows.len(), 3);
        assert_eq!(shaping.bottom - shaping.top, 3.0 * LINE_HEIGHT);
    }

    #[test]
    fn missing_glyphs_give_nothing() {
        assert_eq!(
            shape_text("xyz", &glyphs("ab"), &layout(240.0), WritingMode::Horizontal),
            None
        );
    }

    #[test]
    fn icon_alignment() {
        let image = ImagePosition {
            padded_rect: Rect { x: 0, y: 0, w: 18, h: 18 },
            pixel_ratio: 1.0,
            tl: [1.0, 1.0],
            br: [17.0, 17.0],
            display_size: [16.0, 16.0],
        };
        let centered = shape_icon(&image, Alignment::CENTER);
        assert_eq!((centered.left, centered.top, centered.right), (-8.0, -8.0, 8.0));
        let corner = shape_icon(&image, Alignment::from_names(Some("right"), Some("bottom")));
        assert_eq!((corner.left, corner.top), (-16.0, -16.0));
    }
}
