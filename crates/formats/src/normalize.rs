use crate::feature::{Coordinates, Feature, Geometry, GeometryType, TileFeature};
use foundation::math::Vec3;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub features: Vec<TileFeature>,
    /// Largest `|z|` over every normalized vertex.
    pub max_abs_z: f64,
}

/// Bring canonical and GeoJSON-shaped features into single-type records.
///
/// Multi-polygons and geometry collections are split into one record per
/// member; all derived records keep the source feature index. Features with
/// no geometry or no vertices are dropped.
pub fn normalize(features: Vec<Feature>) -> Normalized {
    let mut out = Normalized::default();
    for (position, feature) in features.into_iter().enumerate() {
        let Feature {
            geometry,
            properties,
            id,
            layer,
            index,
            extent,
        } = feature;
        let Some(geometry) = geometry else {
            continue;
        };
        let index = index.unwrap_or(position);

        let mut records = Vec::new();
        match geometry {
            Geometry::Parts { kind, parts } => records.push((kind, parts)),
            Geometry::Coordinates(coords) => decompose(coords, &mut records),
        }

        for (kind, parts) in records {
            if parts.iter().all(Vec::is_empty) {
                continue;
            }
            for p in parts.iter().flatten() {
                out.max_abs_z = out.max_abs_z.max(p.z.abs());
            }
            out.features.push(TileFeature {
                kind,
                geometry: parts,
                properties: properties.clone(),
                id: id.clone(),
                layer: layer.clone(),
                index,
                extent,
            });
        }
    }
    out
}

fn decompose(coords: Coordinates, out: &mut Vec<(GeometryType, Vec<Vec<Vec3>>)>) {
    match coords {
        Coordinates::Point(p) => out.push((GeometryType::Point, vec![vec![p]])),
        Coordinates::MultiPoint(ps) => out.push((
            GeometryType::Point,
            ps.into_iter().map(|p| vec![p]).collect(),
        )),
        Coordinates::LineString(line) => out.push((GeometryType::LineString, vec![line])),
        Coordinates::MultiLineString(lines) => out.push((GeometryType::LineString, lines)),
        Coordinates::Polygon(rings) => out.push((GeometryType::Polygon, rings)),
        Coordinates::MultiPolygon(polys) => {
            for rings in polys {
                out.push((GeometryType::Polygon, rings));
            }
        }
        Coordinates::GeometryCollection(members) => {
            for member in members {
                decompose(member, out);
            }
        }
    }
}
