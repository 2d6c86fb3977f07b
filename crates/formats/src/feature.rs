use foundation::math::Vec3;
use serde_json::{Map, Value};

/// Default coordinate-space size of a vector tile.
pub const DEFAULT_EXTENT: u32 = 8192;

pub type Properties = Map<String, Value>;

/// Vector tile geometry type tag (MVT numbering).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point = 1,
    LineString = 2,
    Polygon = 3,
}

impl GeometryType {
    pub fn name(self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureId {
    Int(i64),
    Str(String),
}

impl FeatureId {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            FeatureId::Int(v) => Some(*v),
            FeatureId::Str(_) => None,
        }
    }
}

/// GeoJSON-shaped coordinates, already expressed in tile-local units.
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinates {
    Point(Vec3),
    MultiPoint(Vec<Vec3>),
    LineString(Vec<Vec3>),
    MultiLineString(Vec<Vec<Vec3>>),
    Polygon(Vec<Vec<Vec3>>),
    MultiPolygon(Vec<Vec<Vec<Vec3>>>),
    GeometryCollection(Vec<Coordinates>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Canonical form: point sequences as decoded from a vector tile.
    /// Points are `[[p], [p], ..]` or `[[p, p, ..]]`, lines one sequence per
    /// line, polygons one sequence per ring.
    Parts {
        kind: GeometryType,
        parts: Vec<Vec<Vec3>>,
    },
    Coordinates(Coordinates),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub properties: Properties,
    pub id: Option<FeatureId>,
    pub layer: Option<String>,
    /// Feature key assigned by the tile worker; picking ids point here.
    pub index: Option<usize>,
    pub extent: u32,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Properties::new(),
            id: None,
            layer: None,
            index: None,
            extent: DEFAULT_EXTENT,
        }
    }

    pub fn from_parts(kind: GeometryType, parts: Vec<Vec<Vec3>>) -> Self {
        Self::new(Geometry::Parts { kind, parts })
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_id(mut self, id: FeatureId) -> Self {
        self.id = Some(id);
        self
    }
}

/// A single-type record produced by normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFeature {
    pub kind: GeometryType,
    pub geometry: Vec<Vec<Vec3>>,
    pub properties: Properties,
    pub id: Option<FeatureId>,
    pub layer: Option<String>,
    /// Index of the source feature this record was derived from.
    pub index: usize,
    pub extent: u32,
}

impl TileFeature {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Property lookup that also answers the `$layer` and `$type` keys.
    pub fn property_or_meta(&self, key: &str) -> Option<Value> {
        match key {
            "$layer" => self.layer.clone().map(Value::String),
            "$type" => Some(Value::String(self.kind.name().to_string())),
            _ => self.properties.get(key).cloned(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.geometry.iter().map(Vec::len).sum()
    }
}
