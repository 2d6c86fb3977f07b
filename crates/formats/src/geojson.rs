use crate::feature::{Coordinates, DEFAULT_EXTENT, Feature, FeatureId, Geometry};
use foundation::math::Vec3;
use serde_json::Value;

#[derive(Debug)]
pub enum GeoJsonError {
    Json(serde_json::Error),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoJsonError::Json(e) => write!(f, "JSON parse error: {e}"),
            GeoJsonError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection or feature array")
            }
            GeoJsonError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for GeoJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoJsonError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GeoJsonError {
    fn from(e: serde_json::Error) -> Self {
        GeoJsonError::Json(e)
    }
}

/// Parse tile-local GeoJSON features from a string.
pub fn features_from_str(payload: &str) -> Result<Vec<Feature>, GeoJsonError> {
    let value: Value = serde_json::from_str(payload)?;
    features_from_value(&value)
}

/// Accepts a `FeatureCollection` object or a bare array of features.
/// A feature's `geometry` may be `null`; such features are kept and later
/// dropped by normalization.
pub fn features_from_value(value: &Value) -> Result<Vec<Feature>, GeoJsonError> {
    let features_val = match value {
        Value::Array(items) => items,
        Value::Object(obj) => {
            let ty = obj
                .get("type")
                .and_then(|v| v.as_str())
                .ok_or(GeoJsonError::NotAFeatureCollection)?;
            if ty != "FeatureCollection" {
                return Err(GeoJsonError::NotAFeatureCollection);
            }
            obj.get("features")
                .and_then(|v| v.as_array())
                .ok_or(GeoJsonError::NotAFeatureCollection)?
        }
        _ => return Err(GeoJsonError::NotAFeatureCollection),
    };

    let mut features = Vec::with_capacity(features_val.len());
    for (index, feat_val) in features_val.iter().enumerate() {
        let feature = parse_feature(feat_val)
            .map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?;
        features.push(feature);
    }
    Ok(features)
}

fn parse_feature(value: &Value) -> Result<Feature, String> {
    let obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;
    if let Some(ty) = obj.get("type").and_then(|v| v.as_str())
        && ty != "Feature"
    {
        return Err(format!("unexpected feature type: {ty}"));
    }

    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(FeatureId::Str(s.clone())),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => Some(FeatureId::Int(v)),
            None => Some(FeatureId::Str(n.to_string())),
        },
        _ => None,
    };

    let properties = obj
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    let geometry = match obj.get("geometry") {
        None | Some(Value::Null) => None,
        Some(g) => Some(Geometry::Coordinates(parse_geometry(g)?)),
    };

    let extent = obj
        .get("extent")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(DEFAULT_EXTENT);

    Ok(Feature {
        geometry,
        properties,
        id,
        layer: obj.get("layer").and_then(|v| v.as_str()).map(str::to_string),
        index: obj
            .get("index")
            .and_then(|v| v.as_u64())
            .and_then(|v| usize::try_from(v).ok()),
        extent,
    })
}

fn parse_geometry(value: &Value) -> Result<Coordinates, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;

    if ty == "GeometryCollection" {
        let members = obj
            .get("geometries")
            .and_then(|v| v.as_array())
            .ok_or("GeometryCollection missing geometries".to_string())?;
        let mut out = Vec::with_capacity(members.len());
        for member in members {
            out.push(parse_geometry(member)?);
        }
        return Ok(Coordinates::GeometryCollection(out));
    }

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Coordinates::Point(parse_point(coords)?)),
        "MultiPoint" => Ok(Coordinates::MultiPoint(parse_points(coords)?)),
        "LineString" => Ok(Coordinates::LineString(parse_points(coords)?)),
        "MultiLineString" => Ok(Coordinates::MultiLineString(parse_nested(coords)?)),
        "Polygon" => Ok(Coordinates::Polygon(parse_nested(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
            let mut out = Vec::with_capacity(polys.len());
            for poly in polys {
                out.push(parse_nested(poly)?);
            }
            Ok(Coordinates::MultiPolygon(out))
        }
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_point(coords: &Value) -> Result<Vec3, String> {
    let arr = coords
        .as_array()
        .ok_or("point coordinates must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("point coordinates must have [x, y]".to_string());
    }
    let x = arr[0].as_f64().ok_or("point x must be a number".to_string())?;
    let y = arr[1].as_f64().ok_or("point y must be a number".to_string())?;
    let z = match arr.get(2) {
        Some(v) => v.as_f64().ok_or("point z must be a number".to_string())?,
        None => 0.0,
    };
    Ok(Vec3::new(x, y, z))
}

fn parse_points(coords: &Value) -> Result<Vec<Vec3>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array".to_string())?;
    arr.iter().map(parse_point).collect()
}

fn parse_nested(coords: &Value) -> Result<Vec<Vec<Vec3>>, String> {
    let arr = coords
        .as_array()
        .ok_or("coordinates must be an array of point arrays".to_string())?;
    arr.iter().map(parse_points).collect()
}

#[cfg(test)]
mod tests {
    use super::{GeoJsonError, features_from_str};
    use crate::feature::{Coordinates, FeatureId, Geometry};
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_feature_collection() {
        let payload = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 3, "properties": {"name": "a"},
                 "geometry": {"type": "Point", "coordinates": [10, 20, 5]}},
                {"type": "Feature", "id": "road-1", "properties": {},
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [4, 0]]}},
                {"type": "Feature", "properties": {}, "geometry": null}
            ]
        }"#;
        let features = features_from_str(payload).expect("parse");
        assert_eq!(features.len(), 3);
        assert_eq!(features[0].id, Some(FeatureId::Int(3)));
        assert_eq!(
            features[0].geometry,
            Some(Geometry::Coordinates(Coordinates::Point(Vec3::new(10.0, 20.0, 5.0))))
        );
        assert_eq!(features[1].id, Some(FeatureId::Str("road-1".to_string())));
        assert!(features[2].geometry.is_none());
    }

    #[test]
    fn accepts_bare_arrays_and_collections() {
        let payload = r#"[{"properties": {}, "geometry": {"type": "GeometryCollection",
            "geometries": [
                {"type": "Point", "coordinates": [1, 1]},
                {"type": "MultiPolygon", "coordinates": [[[[0,0],[1,0],[1,1],[0,0]]]]}
            ]}}]"#;
        let features = features_from_str(payload).expect("parse");
        let Some(Geometry::Coordinates(Coordinates::GeometryCollection(members))) =
            &features[0].geometry
        else {
            panic!("expected a geometry collection");
        };
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn reports_feature_position() {
        let payload = r#"[{"geometry": {"type": "Point", "coordinates": [1]}}]"#;
        let err = features_from_str(payload).expect_err("short point");
        assert!(matches!(err, GeoJsonError::InvalidFeature { index: 0, .. }));

        let err = features_from_str(r#"{"type": "Feature"}"#).expect_err("not a collection");
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection));
    }
}
