//! Markers and labels: one textured quad per icon or glyph, repeated at
//! every anchor of a feature.

pub mod anchors;
pub mod clip;
pub mod merge;
pub mod pole;
pub mod quads;
pub mod rings;
pub mod script;
pub mod shaping;
pub mod styled;

pub use anchors::*;
pub use clip::*;
pub use merge::*;
pub use pole::*;
pub use quads::*;
pub use rings::*;
pub use shaping::*;
pub use styled::*;

use crate::atlas::{AtlasRequests, GlyphPosition};
use crate::buffer::{NumericKind, TypedBuffer};
use crate::builder::PackBuilder;
use crate::data_pack::DataPack;
use crate::format::Format;
use crate::pack::{PackContext, PackError, Placement};
use formats::{GeometryType, TileFeature};
use foundation::Aabb2;
use foundation::math::Vec2;
use std::collections::BTreeMap;
use style::{Symbol, parse_color, to_rgba8};
use tracing::warn;

pub const GLYPH_SIZE: f64 = 24.0;
pub const DEFAULT_SPACING: f64 = 250.0;

/// Pole search precision, about two pixels.
const POLE_PRECISION: f64 = 16.0;

const TEXT_FN_ATTRIBUTES: &[(&str, &str, usize, NumericKind)] = &[
    ("textFill", "aTextFill", 4, NumericKind::U8),
    ("textSize", "aTextSize", 1, NumericKind::U8),
    ("textHaloFill", "aTextHaloFill", 4, NumericKind::U8),
    ("textHaloRadius", "aTextHaloRadius", 1, NumericKind::U8),
    ("textDx", "aTextDx", 1, NumericKind::I8),
    ("textDy", "aTextDy", 1, NumericKind::I8),
];

const MARKER_FN_ATTRIBUTES: &[(&str, &str, usize, NumericKind)] = &[
    ("markerWidth", "aMarkerWidth", 1, NumericKind::U8),
    ("markerHeight", "aMarkerHeight", 1, NumericKind::U8),
    ("markerDx", "aMarkerDx", 1, NumericKind::I8),
    ("markerDy", "aMarkerDy", 1, NumericKind::I8),
];

/// Pack flag raised when a field resolves to a non-zero value.
fn flag_for(field: &str) -> Option<&'static str> {
    Some(match field {
        "textHaloRadius" => "hasHalo",
        "textDx" => "hasTextDx",
        "textDy" => "hasTextDy",
        "markerWidth" => "hasMarkerWidth",
        "markerHeight" => "hasMarkerHeight",
        "markerDx" => "hasMarkerDx",
        "markerDy" => "hasMarkerDy",
        _ => return None,
    })
}

pub fn is_text(symbol: &Symbol) -> bool {
    symbol.get("textName").is_some()
}

pub fn is_icon_text(symbol: &Symbol) -> bool {
    symbol.boolean("isIconText").unwrap_or(false)
}

/// Labels that follow their line glyph by glyph.
pub fn is_along_line(symbol: &Symbol) -> bool {
    symbol.string("textPlacement") == Some("line") && !is_icon_text(symbol)
}

fn is_line_placed(symbol: &Symbol) -> bool {
    symbol.string("markerPlacement") == Some("line") || symbol.string("textPlacement") == Some("line")
}

pub fn point_format(ctx: &PackContext<'_>) -> Format {
    let mut format = Format::with_position(ctx.separate_altitude)
        .with("aShape", 2, NumericKind::I16)
        .with("aTexCoord", 2, NumericKind::U16);
    let attributes = if is_text(ctx.symbol) {
        format.push("aCount", 1, NumericKind::U8);
        if is_along_line(ctx.symbol) {
            format.push("aGlyphOffset", 2, NumericKind::I16);
            format.push("aSegment", 3, NumericKind::U16);
            format.push("aVertical", 1, NumericKind::U8);
        }
        TEXT_FN_ATTRIBUTES
    } else {
        MARKER_FN_ATTRIBUTES
    };
    for &(field, name, width, kind) in attributes {
        if ctx.is_dynamic(field) {
            format.push(name, width, kind);
        }
    }
    format
}

enum PointShape<'a> {
    Text {
        horizontal: Shaping,
        vertical: Option<Shaping>,
        positions: &'a BTreeMap<u32, GlyphPosition>,
        vertical_text: bool,
    },
    Icon {
        shape: ShapedIcon,
        quads: Vec<Quad>,
    },
}

impl PointShape<'_> {
    fn label_width(&self) -> f64 {
        match self {
            PointShape::Text {
                horizontal,
                vertical,
                ..
            } => vertical.as_ref().unwrap_or(horizontal).width(),
            PointShape::Icon { shape, .. } => shape.width(),
        }
    }
}

#[derive(Debug, Default)]
pub struct PointPlacement {
    /// Clipped label lines as `x, y, 0` triples.
    line_vertex: Vec<f64>,
}

impl PointPlacement {
    fn shape<'a>(
        &self,
        point: &StyledPoint,
        feature: &TileFeature,
        ctx: &PackContext<'a>,
    ) -> Option<(PointShape<'a>, [f64; 2])> {
        if let Some(text) = &point.text {
            let Some(positions) = ctx.glyph_atlas.and_then(|a| a.font(&text.font)) else {
                warn!(font = %text.font, "font missing from glyph atlas");
                return None;
            };
            let size = point.size.unwrap_or([DEFAULT_TEXT_SIZE, DEFAULT_TEXT_SIZE]);
            let font_scale = size[0] / GLYPH_SIZE;
            let along_line = is_along_line(ctx.symbol);
            let text_along_line =
                along_line && ctx.symbol.string("textRotationAlignment") == Some("map");
            let keep_upright = ctx.symbol.boolean("textKeepUpright").unwrap_or(false);
            let letter_spacing_allowed = script::allows_letter_spacing(&text.text);

            let alignment = Alignment::from_names(
                ctx.string("textHorizontalAlignment", feature).as_deref(),
                ctx.string("textVerticalAlignment", feature).as_deref(),
            );
            let letter_spacing = if letter_spacing_allowed {
                ctx.number("textLetterSpacing", feature).unwrap_or(0.0) / font_scale
            } else {
                0.0
            };
            let wrap_width = ctx
                .number("textWrapWidth", feature)
                .filter(|w| *w > 0.0)
                .unwrap_or(10.0 * ONE_EM);
            let layout = TextLayout {
                max_width: wrap_width / font_scale,
                line_height: LINE_HEIGHT,
                alignment,
                justify: 0.5,
                letter_spacing,
                translate: [
                    ctx.number("textDx", feature).unwrap_or(0.0) / font_scale,
                    ctx.number("textDy", feature).unwrap_or(0.0) / font_scale,
                ],
                vertical_height: ONE_EM,
            };

            let horizontal = shape_text(&text.text, positions, &layout, WritingMode::Horizontal)?;
            let vertical = if letter_spacing_allowed && text_along_line && keep_upright {
                shape_text(&text.text, positions, &layout, WritingMode::Vertical)
            } else {
                None
            };
            let vertical_text = along_line && script::allows_vertical_writing_mode(&text.text);
            return Some((
                PointShape::Text {
                    horizontal,
                    vertical,
                    positions,
                    vertical_text,
                },
                size,
            ));
        }

        let key = point.icon.as_deref()?;
        let Some(image) = ctx.icon_atlas.and_then(|a| a.get(key)) else {
            warn!(icon = key, "icon missing from atlas");
            return None;
        };
        let alignment = Alignment::from_names(
            ctx.string("markerHorizontalAlignment", feature).as_deref(),
            ctx.string("markerVerticalAlignment", feature).as_deref(),
        );
        let shape = shape_icon(image, alignment);
        let quads = icon_quads(&shape, image);
        Some((PointShape::Icon { shape, quads }, point.size.unwrap_or(image.display_size)))
    }

    fn anchors(
        &mut self,
        feature: &TileFeature,
        label_width: f64,
        size: [f64; 2],
        scale: f64,
        ctx: &PackContext<'_>,
    ) -> Result<Vec<Anchor>, PackError> {
        let extent = ctx.extent();
        let placement = ctx
            .string("markerPlacement", feature)
            .or_else(|| ctx.string("textPlacement", feature))
            .unwrap_or_else(|| "point".to_string());
        let tile = Aabb2::tile(extent);

        let mut anchors = Vec::new();
        if placement == "line" {
            let icon_text = is_icon_text(ctx.symbol);
            let record_line = is_along_line(ctx.symbol);
            let box_scale = if icon_text {
                1.0
            } else {
                scale * size[0] / GLYPH_SIZE
            };
            let spacing = ctx
                .number("markerSpacing", feature)
                .filter(|s| *s > 0.0)
                .or_else(|| ctx.number("textSpacing", feature).filter(|s| *s > 0.0))
                .unwrap_or(DEFAULT_SPACING)
                * scale;

            let lines: Vec<Vec<Vec2>> = feature
                .geometry
                .iter()
                .map(|line| line.iter().map(|p| p.xy()).collect())
                .collect();
            for line in clip_lines(&lines, 0.0, 0.0, extent, extent) {
                let start_index = self.line_vertex.len() / 3;
                let placed = get_anchors(
                    &line,
                    spacing,
                    ctx.options.max_angle,
                    (!icon_text).then_some(label_width),
                    GLYPH_SIZE,
                    box_scale,
                    1.0,
                    extent,
                );
                anchors.extend(placed.into_iter().map(|a| Anchor { start_index, ..a }));
                if record_line {
                    for p in &line {
                        self.line_vertex.extend_from_slice(&[p.x, p.y, 0.0]);
                    }
                }
            }
            return Ok(anchors);
        }

        match feature.kind {
            GeometryType::Polygon => {
                let rings: Vec<Vec<Vec2>> = feature
                    .geometry
                    .iter()
                    .map(|ring| ring.iter().map(|p| p.xy()).collect())
                    .collect();
                for polygon in classify_rings(&rings) {
                    let pole = pole_of_inaccessibility(&polygon, POLE_PRECISION).ok_or_else(|| {
                        PackError::Geometry {
                            feature: feature.index,
                            reason: "polygon without an outer ring".to_string(),
                        }
                    })?;
                    let pole = pole.round();
                    if tile.contains(pole) {
                        anchors.push(Anchor::at(pole, 0.0));
                    }
                }
            }
            GeometryType::LineString => {
                for line in &feature.geometry {
                    if let Some(first) = line.first()
                        && tile.contains(first.xy())
                    {
                        anchors.push(Anchor::at(first.xy(), first.z));
                    }
                }
            }
            GeometryType::Point => {
                for p in feature.geometry.iter().flatten() {
                    if tile.contains(p.xy()) {
                        anchors.push(Anchor::at(p.xy(), p.z));
                    }
                }
            }
        }
        Ok(anchors)
    }

    /// Per-feature values of the dynamic attributes, in format order.
    fn fn_values(
        &self,
        feature: &TileFeature,
        ctx: &PackContext<'_>,
        out: &mut PackBuilder,
    ) -> Vec<f64> {
        let attributes = if is_text(ctx.symbol) {
            TEXT_FN_ATTRIBUTES
        } else {
            MARKER_FN_ATTRIBUTES
        };
        let mut values = Vec::new();
        for &(field, _, width, _) in attributes {
            if !ctx.is_dynamic(field) {
                continue;
            }
            if width == 4 {
                let fallback = if field == "textHaloFill" {
                    [255, 255, 255, 255]
                } else {
                    [0, 0, 0, 255]
                };
                let color = ctx
                    .value(field, feature)
                    .and_then(|v| parse_color(&v))
                    .map(to_rgba8)
                    .unwrap_or(fallback);
                values.extend(color.iter().map(|c| f64::from(*c)));
                continue;
            }
            let fallback = if field == "textSize" { DEFAULT_TEXT_SIZE } else { 0.0 };
            let value = ctx.number(field, feature).unwrap_or(fallback);
            if value != 0.0
                && let Some(flag) = flag_for(field)
            {
                out.set_flag(flag);
            }
            values.push(value);
        }
        values
    }
}

impl Placement for PointPlacement {
    type Vector = StyledPoint;

    fn format(&self, ctx: &PackContext<'_>) -> Format {
        point_format(ctx)
    }

    fn create_styled_vector(
        &mut self,
        feature: &TileFeature,
        ctx: &PackContext<'_>,
        requests: &mut AtlasRequests,
    ) -> Result<Option<StyledPoint>, PackError> {
        let Some(point) = StyledPoint::resolve(feature, ctx) else {
            return Ok(None);
        };
        if let Some(icon) = &point.icon {
            requests.request_icon(icon, point.size);
        }
        if let Some(text) = &point.text {
            requests.request_glyphs(&text.font, &text.text);
        }
        Ok(Some(point))
    }

    fn prepare_features(&self, features: Vec<TileFeature>, symbol: &Symbol) -> Vec<TileFeature> {
        match symbol.string("mergeOnProperty") {
            Some(key) if is_line_placed(symbol) => merge_line_features(features, key),
            _ => features,
        }
    }

    fn ready(&self, ctx: &PackContext<'_>) -> bool {
        ctx.icon_atlas.is_some() || ctx.glyph_atlas.is_some()
    }

    fn begin(&mut self) {
        self.line_vertex.clear();
    }

    fn place_vector(
        &mut self,
        point: &StyledPoint,
        feature: &TileFeature,
        scale: f64,
        ctx: &PackContext<'_>,
        out: &mut PackBuilder,
    ) -> Result<(), PackError> {
        let text_format = is_text(ctx.symbol);
        if text_format && point.text.is_none() {
            return Ok(());
        }
        let Some((shape, size)) = self.shape(point, feature, ctx) else {
            return Ok(());
        };
        let anchors = self.anchors(feature, shape.label_width(), size, scale, ctx)?;
        if anchors.is_empty() {
            return Ok(());
        }

        let along_line = text_format && is_along_line(ctx.symbol);
        let (quads, vertical) = match &shape {
            PointShape::Text {
                horizontal,
                positions,
                vertical_text,
                ..
            } => (glyph_quads(horizontal, along_line, positions), *vertical_text),
            PointShape::Icon { quads, .. } => (quads.clone(), false),
        };
        let count = quads.len() as f64;
        let fn_values = self.fn_values(feature, ctx, out);
        let altitude = ctx.property_altitude(feature);

        let mut row = Vec::with_capacity(out.format().width());
        for anchor in &anchors {
            let alt = altitude.unwrap_or(anchor.z);
            out.track_altitude(alt);
            for quad in &quads {
                let tex = quad.tex;
                let (x, y, w, h) = (
                    f64::from(tex.x),
                    f64::from(tex.y),
                    f64::from(tex.w),
                    f64::from(tex.h),
                );
                let corners = [
                    (quad.tl, [x, y + h]),
                    (quad.tr, [x + w, y + h]),
                    (quad.bl, [x, y]),
                    (quad.br, [x + w, y]),
                ];
                let first = out.vertex_count() as u32;
                for (offset, uv) in corners {
                    row.clear();
                    row.extend_from_slice(&[anchor.point.x, anchor.point.y, alt]);
                    row.extend_from_slice(&[offset.x * 10.0, offset.y * 10.0, uv[0], uv[1]]);
                    if text_format {
                        row.push(count);
                        if along_line {
                            let segment = anchor.segment.unwrap_or(0);
                            row.extend_from_slice(&[
                                quad.glyph_offset[0],
                                quad.glyph_offset[1],
                                (segment + anchor.start_index) as f64,
                                anchor.start_index as f64,
                                anchor.line_len as f64,
                                if vertical { 1.0 } else { 0.0 },
                            ]);
                        }
                    }
                    row.extend_from_slice(&fn_values);
                    out.push_vertex(&row);
                }
                out.add_triangle(first, first + 1, first + 2);
                out.add_triangle(first + 1, first + 2, first + 3);
            }
        }
        Ok(())
    }

    fn finish(
        &mut self,
        _builder: &PackBuilder,
        pack: &mut DataPack,
        ctx: &PackContext<'_>,
    ) -> Result<(), PackError> {
        if is_text(ctx.symbol) && is_along_line(ctx.symbol) {
            pack.line_vertex = Some(TypedBuffer::from_f64(NumericKind::I16, &self.line_vertex));
        }
        Ok(())
    }
}
