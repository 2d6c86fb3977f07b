//! Extruded lines: every line becomes a strip of top faces and side walls
//! standing on the feature's minimum height, with both open ends capped.

use crate::atlas::AtlasRequests;
use crate::buffer::{NumericKind, TypedBuffer, choose_position_type};
use crate::builder::PackBuilder;
use crate::data_pack::{DataPack, PackedAttribute};
use crate::format::Format;
use crate::line::{CrossSection, cross_sections};
use crate::normals::build_normals;
use crate::pack::{PackContext, PackError, Placement};
use formats::{GeometryType, TileFeature};
use foundation::math::Vec2;
use serde_json::Value;
use style::{Symbol, parse_color, to_rgba8};

/// `aPosition.z` of every top vertex; bottoms store a fraction of it.
pub const EXTRUDE_TOP: f64 = 32767.0;

/// Fixed-point scale of `aExtrude`.
pub const EXTRUDE_SCALE: f64 = 63.0;

pub const DEFAULT_LINE_WIDTH: f64 = 2.0;

/// Texture coordinate `u` advances by one every this many tile units.
const TEX_DISTANCE: f64 = 256.0;

/// Build-only attributes dropped once normals and UVs are derived.
const BUILD_ATTRIBUTES: &[&str] = &["aLinesofar", "aUp", "aExtrudedPosition"];

#[derive(Debug, Clone, PartialEq)]
pub struct StyledLine {
    pub width: f64,
    pub color: [u8; 4],
    pub altitude: f64,
    pub height: f64,
}

impl StyledLine {
    pub fn resolve(feature: &TileFeature, ctx: &PackContext<'_>) -> Self {
        let width = ctx
            .number("lineWidth", feature)
            .unwrap_or(DEFAULT_LINE_WIDTH);
        let color = ctx
            .value("lineColor", feature)
            .and_then(|v| parse_color(&v))
            .map(to_rgba8)
            .unwrap_or([0, 0, 0, 255]);

        let options = ctx.options;
        let number = |key: &str| feature.property(key).and_then(Value::as_f64);
        let altitude = options
            .altitude_property
            .as_deref()
            .and_then(number)
            .unwrap_or(options.default_altitude);
        let height = if let Some(key) = options.height_property.as_deref() {
            number(key).unwrap_or(options.default_height)
        } else if let Some(key) = options.min_height_property.as_deref() {
            altitude - number(key).unwrap_or(0.0)
        } else {
            altitude
        };
        Self {
            width,
            color,
            altitude: altitude * options.altitude_scale,
            height: height * options.altitude_scale,
        }
    }

    /// Bottom `aPosition.z`: the wall's base as a fraction of the top.
    fn min_height(&self) -> f64 {
        if self.altitude == 0.0 {
            return 0.0;
        }
        (self.altitude - self.height) / self.altitude * EXTRUDE_TOP
    }
}

fn has_texture(symbol: &Symbol) -> bool {
    let Some(material) = symbol.get("material").and_then(Value::as_object) else {
        return false;
    };
    material
        .iter()
        .any(|(key, value)| key.contains("Texture") && !matches!(value, Value::Null | Value::Bool(false)))
}

/// Vertex indices of one side of a cross section.
#[derive(Debug, Copy, Clone, Default)]
struct SideVertices {
    top: Option<u32>,
    wall_top: Option<u32>,
    wall_bottom: Option<u32>,
}

#[derive(Debug, Copy, Clone, Default)]
struct SectionVertices {
    down: SideVertices,
    up: SideVertices,
}

#[derive(Debug, Default)]
pub struct LineExtrusionPlacement;

impl LineExtrusionPlacement {
    #[allow(clippy::too_many_arguments)]
    fn push_side(
        &self,
        section: &CrossSection,
        up: bool,
        half_width: f64,
        line: &StyledLine,
        fn_values: &[f64],
        ctx: &PackContext<'_>,
        out: &mut PackBuilder,
    ) -> SideVertices {
        let extrude = if up { section.extrude } else { -section.extrude };
        let p = section.point;
        let extruded = p + extrude.scale(half_width);
        let mut row = Vec::with_capacity(out.format().width());
        let mut emit = |z: f64, wall_z: f64, out: &mut PackBuilder| {
            row.clear();
            row.extend_from_slice(&[p.x, p.y, z, section.distance, if up { 1.0 } else { 0.0 }]);
            row.extend_from_slice(&[extruded.x, extruded.y, wall_z]);
            row.extend_from_slice(&[extrude.x * EXTRUDE_SCALE, extrude.y * EXTRUDE_SCALE]);
            row.extend_from_slice(fn_values);
            out.push_vertex(&row)
        };

        let mut side = SideVertices::default();
        if ctx.options.top {
            side.top = Some(emit(EXTRUDE_TOP, 1.0, out));
        }
        if ctx.options.side {
            side.wall_top = Some(emit(EXTRUDE_TOP, 1.0, out));
            side.wall_bottom = Some(emit(line.min_height(), 0.0, out));
        }
        side
    }

    fn connect(&self, a: SectionVertices, b: SectionVertices, out: &mut PackBuilder) {
        if let (Some(da), Some(ua), Some(db), Some(ub)) = (a.down.top, a.up.top, b.down.top, b.up.top) {
            out.add_triangle(da, ua, db);
            out.add_triangle(ua, ub, db);
        }
        if let (Some(ta), Some(ba), Some(tb), Some(bb)) =
            (a.up.wall_top, a.up.wall_bottom, b.up.wall_top, b.up.wall_bottom)
        {
            out.add_triangle(ta, ba, tb);
            out.add_triangle(tb, ba, bb);
        }
        if let (Some(ta), Some(ba), Some(tb), Some(bb)) =
            (a.down.wall_top, a.down.wall_bottom, b.down.wall_top, b.down.wall_bottom)
        {
            out.add_triangle(ta, tb, ba);
            out.add_triangle(tb, bb, ba);
        }
    }

    /// Close an open line end with copies of its wall vertices.
    fn cap(&self, section: SectionVertices, start: bool, out: &mut PackBuilder) {
        let (Some(dt), Some(db), Some(ut), Some(ub)) = (
            section.down.wall_top,
            section.down.wall_bottom,
            section.up.wall_top,
            section.up.wall_bottom,
        ) else {
            return;
        };
        let (dt, db, ut, ub) = (
            out.copy_vertex(dt),
            out.copy_vertex(db),
            out.copy_vertex(ut),
            out.copy_vertex(ub),
        );
        if start {
            out.add_triangle(dt, db, ut);
            out.add_triangle(ut, db, ub);
        } else {
            out.add_triangle(dt, ut, db);
            out.add_triangle(ut, ub, db);
        }
    }
}

impl Placement for LineExtrusionPlacement {
    type Vector = StyledLine;

    fn format(&self, ctx: &PackContext<'_>) -> Format {
        let mut format = Format::with_position(false)
            .with("aLinesofar", 1, NumericKind::U16)
            .with("aUp", 1, NumericKind::U8)
            .with("aExtrudedPosition", 3, NumericKind::I16)
            .with("aExtrude", 2, NumericKind::I8);
        if ctx.is_dynamic("lineColor") {
            format.push("aColor", 4, NumericKind::U8);
        }
        if ctx.is_dynamic("lineWidth") {
            format.push("aLineWidth", 1, NumericKind::U8);
        }
        if ctx.options.altitude_property.is_some() {
            format.push("aLineHeight", 1, NumericKind::F32);
        }
        format
    }

    fn position_size(&self, _separate_altitude: bool) -> usize {
        3
    }

    fn create_styled_vector(
        &mut self,
        feature: &TileFeature,
        ctx: &PackContext<'_>,
        _requests: &mut AtlasRequests,
    ) -> Result<Option<StyledLine>, PackError> {
        if feature.kind == GeometryType::Point {
            return Ok(None);
        }
        Ok(Some(StyledLine::resolve(feature, ctx)))
    }

    fn place_vector(
        &mut self,
        line: &StyledLine,
        feature: &TileFeature,
        _scale: f64,
        ctx: &PackContext<'_>,
        out: &mut PackBuilder,
    ) -> Result<(), PackError> {
        let closed = feature.kind == GeometryType::Polygon;
        let half_width = line.width / 2.0 * ctx.extent() / ctx.options.tile_size;

        let mut fn_values = Vec::new();
        if ctx.is_dynamic("lineColor") {
            fn_values.extend(line.color.iter().map(|c| f64::from(*c)));
        }
        if ctx.is_dynamic("lineWidth") {
            fn_values.push((line.width * 2.0).round());
        }
        if ctx.options.altitude_property.is_some() {
            fn_values.push(line.altitude);
            out.track_altitude(line.altitude);
        }

        for part in &feature.geometry {
            if closed && part.is_empty() {
                return Err(PackError::Geometry {
                    feature: feature.index,
                    reason: "empty polygon ring".to_string(),
                });
            }
            let points: Vec<Vec2> = part.iter().map(|p| p.xy()).collect();
            let sections = cross_sections(&points, closed, ctx.options.miter_limit);
            if sections.len() < 2 {
                continue;
            }

            let mut previous: Option<SectionVertices> = None;
            let mut first = SectionVertices::default();
            for section in &sections {
                let vertices = SectionVertices {
                    down: self.push_side(section, false, half_width, line, &fn_values, ctx, out),
                    up: self.push_side(section, true, half_width, line, &fn_values, ctx, out),
                };
                match previous {
                    Some(prev) => self.connect(prev, vertices, out),
                    None => first = vertices,
                }
                previous = Some(vertices);
            }
            if !closed
                && let Some(last) = previous
            {
                self.cap(first, true, out);
                self.cap(last, false, out);
            }
        }
        Ok(())
    }

    fn finish(
        &mut self,
        builder: &PackBuilder,
        pack: &mut DataPack,
        ctx: &PackContext<'_>,
    ) -> Result<(), PackError> {
        let extruded = builder.column("aExtrudedPosition").unwrap_or(&[]);
        let normals: Vec<f64> = build_normals(extruded, builder.elements())
            .into_iter()
            .map(|n| -n)
            .collect();
        let kind = if normals.iter().all(|n| n.fract() == 0.0) {
            NumericKind::I8
        } else {
            NumericKind::F32
        };
        pack.data.insert(
            "aNormal".to_string(),
            PackedAttribute::new(3, TypedBuffer::from_f64(kind, &normals)),
        );

        if ctx.options.top && has_texture(ctx.symbol) {
            let distances = builder.column("aLinesofar").unwrap_or(&[]);
            let ups = builder.column("aUp").unwrap_or(&[]);
            let uv: Vec<f64> = distances
                .iter()
                .zip(ups)
                .flat_map(|(d, up)| [d / TEX_DISTANCE, *up])
                .collect();
            pack.data.insert(
                "aTexCoord0".to_string(),
                PackedAttribute::new(2, TypedBuffer::from_f64(NumericKind::F32, &uv)),
            );
        }

        for name in BUILD_ATTRIBUTES {
            pack.data.remove(*name);
        }
        if let Some(heights) = builder.column("aLineHeight") {
            let kind = choose_position_type(builder.max_altitude());
            pack.data.insert(
                "aLineHeight".to_string(),
                PackedAttribute::new(1, TypedBuffer::from_f64(kind, heights)),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LineExtrusionPlacement;
    use crate::buffer::{NumericKind, TypedBuffer};
    use crate::data_pack::DataPack;
    use crate::pack::{PackOptions, VectorPack};
    use formats::{Feature, GeometryType};
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use style::Symbol;

    fn line(points: &[(f64, f64)]) -> Feature {
        Feature::from_parts(
            GeometryType::LineString,
            vec![points.iter().map(|&(x, y)| Vec3::new(x, y, 0.0)).collect()],
        )
    }

    fn build(features: Vec<Feature>, symbol: Symbol, options: PackOptions) -> Option<DataPack> {
        let mut pack: VectorPack<LineExtrusionPlacement> =
            VectorPack::new(features, symbol, options).expect("valid pack");
        pack.style_features().expect("styling");
        pack.pack(1.0).expect("data pack")
    }

    fn column(data: &DataPack, name: &str) -> Vec<f64> {
        data.attribute(name)
            .map(|a| a.buffer.to_f64_vec())
            .unwrap_or_default()
    }

    #[test]
    fn one_segment_is_a_closed_box() {
        let symbol = Symbol::new().with("lineWidth", 2);
        let Some(data) = build(vec![line(&[(0.0, 0.0), (100.0, 0.0)])], symbol, PackOptions::default())
        else {
            panic!("expected a data pack");
        };
        // 2 sections x (top + 2 wall) x 2 sides, plus 4 per cap
        assert_eq!(data.vertex_count(), 20);
        // 2 top + 4 wall + 4 cap triangles
        assert_eq!(data.index_count(), 30);
        assert_eq!(data.position_size, 3);

        let names: Vec<&str> = data.data.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["aExtrude", "aNormal", "aPickingId", "aPosition"]);
        for attribute in data.data.values() {
            assert_eq!(attribute.vertex_count(), 20);
        }

        let normals = data.attribute("aNormal").map(|a| a.buffer.clone());
        assert_eq!(normals.as_ref().map(TypedBuffer::kind), Some(NumericKind::I8));
        let normals = column(&data, "aNormal");
        // first vertex is the down-side top, second the down-side wall top
        assert_eq!(&normals[..6], &[0.0, 0.0, 1.0, 0.0, -1.0, 0.0]);
        // up-side wall top faces +y
        assert_eq!(&normals[12..15], &[0.0, 1.0, 0.0]);
        // start cap faces back along the line
        assert_eq!(&normals[36..39], &[-1.0, 0.0, 0.0]);

        let positions = column(&data, "aPosition");
        assert_eq!(&positions[..3], &[0.0, 0.0, 32767.0]);
        assert_eq!(&positions[6..9], &[0.0, 0.0, 0.0]);
        let extrude = column(&data, "aExtrude");
        assert_eq!(&extrude[..2], &[0.0, -63.0]);
        assert_eq!(&extrude[6..8], &[0.0, 63.0]);
    }

    #[test]
    fn side_triangles_grow_with_segments() {
        let options = PackOptions {
            top: false,
            ..PackOptions::default()
        };
        for n in 1..5usize {
            let points: Vec<(f64, f64)> = (0..=n).map(|i| (i as f64 * 50.0, (i % 2) as f64 * 20.0)).collect();
            let Some(data) = build(vec![line(&points)], Symbol::new(), options.clone()) else {
                panic!("expected a data pack");
            };
            assert_eq!(data.index_count() / 3, 4 * n + 4, "{n} segments");
            let max_index = data
                .indices
                .as_ref()
                .map(|i| i.to_f64_vec().into_iter().fold(0.0f64, f64::max))
                .unwrap_or(0.0);
            assert!((max_index as usize) < data.vertex_count());
        }
    }

    #[test]
    fn polygon_rings_close_without_caps() {
        let ring = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::new(100.0, 100.0, 0.0),
            Vec3::new(0.0, 100.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
        ];
        let polygon = Feature::from_parts(GeometryType::Polygon, vec![ring]);
        let options = PackOptions {
            top: false,
            ..PackOptions::default()
        };
        let Some(data) = build(vec![polygon], Symbol::new(), options) else {
            panic!("expected a data pack");
        };
        // 4 segments, 2 wall triangles per side each
        assert_eq!(data.index_count() / 3, 16);
        assert_eq!(data.vertex_count(), 5 * 4);
    }

    #[test]
    fn dynamic_color_and_heights() {
        let feature = line(&[(0.0, 0.0), (100.0, 0.0)])
            .with_property("color", "#ff0000")
            .with_property("levels", 10)
            .with_property("base", 4);
        let symbol = Symbol::new().with("lineColor", json!({ "property": "color", "type": "identity" }));
        let options = PackOptions {
            altitude_property: Some("levels".to_string()),
            min_height_property: Some("base".to_string()),
            ..PackOptions::default()
        };
        let Some(data) = build(vec![feature], symbol, options) else {
            panic!("expected a data pack");
        };
        assert_eq!(&column(&data, "aColor")[..4], &[255.0, 0.0, 0.0, 255.0]);
        assert_eq!(
            data.attribute("aLineHeight").map(|a| a.buffer.clone()),
            Some(TypedBuffer::I8(vec![10; 20]))
        );
        assert_eq!(data.max_altitude, 10.0);
        // wall bottom sits at (10 - 6) / 10 of the top
        let positions = column(&data, "aPosition");
        assert_eq!(positions[8], 13106.0);
    }

    #[test]
    fn textured_material_gets_uvs() {
        let symbol = Symbol::new().with("material", json!({ "baseColorTexture": { "url": "a.png" } }));
        let Some(data) = build(vec![line(&[(0.0, 0.0), (512.0, 0.0)])], symbol, PackOptions::default())
        else {
            panic!("expected a data pack");
        };
        let uv = column(&data, "aTexCoord0");
        assert_eq!(uv.len(), data.vertex_count() * 2);
        assert_eq!(&uv[..2], &[0.0, 0.0]);
        // up-side top of the second section
        assert_eq!(&uv[18..20], &[2.0, 1.0]);
    }

    #[test]
    fn points_produce_nothing() {
        let point = Feature::from_parts(GeometryType::Point, vec![vec![Vec3::new(1.0, 1.0, 0.0)]]);
        assert_eq!(build(vec![point], Symbol::new(), PackOptions::default()), None);
    }
}
