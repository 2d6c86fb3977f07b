use crate::atlas::{AtlasError, AtlasRequestor, AtlasRequests, AtlasResponse, GlyphAtlas, IconAtlas};
use crate::buffer::{
    NumericKind, TypedBuffer, choose_position_type, choose_unsigned_type,
};
use crate::builder::PackBuilder;
use crate::data_pack::{DataPack, PackedAttribute};
use crate::extrusion::LineExtrusionPlacement;
use crate::format::Format;
use crate::point::PointPlacement;
use formats::{Feature, FeatureId, TileFeature, normalize};
use foundation::ScratchPool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use style::{FnTypes, StyleError, Symbol};
use tracing::{debug, trace};

/// Altitudes at or above this need their own `f32` channel.
pub const SEPARATE_ALTITUDE_THRESHOLD: f64 = 131_072.0;

/// Default maximum label bend inside the angle window.
pub const TEXT_MAX_ANGLE: f64 = 45.0 * std::f64::consts::PI / 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    pub zoom: f64,
    pub extent: u32,
    pub tile_size: f64,
    /// Subtracted from every `x, y` after placement.
    pub center: Option<[f64; 2]>,
    pub altitude_property: Option<String>,
    pub default_altitude: f64,
    pub altitude_scale: f64,
    pub height_property: Option<String>,
    pub default_height: f64,
    pub min_height_property: Option<String>,
    pub force_altitude_attribute: bool,
    /// Overrides the sized `aPosition` kind.
    pub position_type: Option<NumericKind>,
    pub top: bool,
    pub side: bool,
    pub max_angle: f64,
    pub miter_limit: f64,
    pub symbol_index: usize,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            zoom: 0.0,
            extent: formats::DEFAULT_EXTENT,
            tile_size: 512.0,
            center: None,
            altitude_property: None,
            default_altitude: 0.0,
            altitude_scale: 1.0,
            height_property: None,
            default_height: 0.0,
            min_height_property: None,
            force_altitude_attribute: false,
            position_type: None,
            top: true,
            side: true,
            max_angle: TEXT_MAX_ANGLE,
            miter_limit: 2.0,
            symbol_index: 0,
        }
    }
}

#[derive(Debug)]
pub enum PackError {
    Style(StyleError),
    Atlas(AtlasError),
    InvalidScale(f64),
    Geometry { feature: usize, reason: String },
}

impl std::fmt::Display for PackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackError::Style(e) => write!(f, "style error: {e}"),
            PackError::Atlas(e) => write!(f, "{e}"),
            PackError::InvalidScale(scale) => {
                write!(f, "layout scale must be finite and positive, got {scale}")
            }
            PackError::Geometry { feature, reason } => {
                write!(f, "malformed geometry in feature {feature}: {reason}")
            }
        }
    }
}

impl std::error::Error for PackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PackError::Style(e) => Some(e),
            PackError::Atlas(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StyleError> for PackError {
    fn from(e: StyleError) -> Self {
        PackError::Style(e)
    }
}

impl From<AtlasError> for PackError {
    fn from(e: AtlasError) -> Self {
        PackError::Atlas(e)
    }
}

/// Read-only state shared with a placement strategy during one pass.
pub struct PackContext<'a> {
    pub symbol: &'a Symbol,
    pub fn_types: &'a FnTypes,
    pub options: &'a PackOptions,
    pub icon_atlas: Option<&'a IconAtlas>,
    pub glyph_atlas: Option<&'a GlyphAtlas>,
    pub separate_altitude: bool,
}

impl PackContext<'_> {
    pub fn zoom(&self) -> f64 {
        self.options.zoom
    }

    pub fn extent(&self) -> f64 {
        f64::from(self.options.extent)
    }

    pub fn is_dynamic(&self, name: &str) -> bool {
        self.fn_types.is_dynamic(name)
    }

    pub fn value(&self, name: &str, feature: &TileFeature) -> Option<Value> {
        self.fn_types.value(self.symbol, name, self.zoom(), feature)
    }

    pub fn number(&self, name: &str, feature: &TileFeature) -> Option<f64> {
        self.fn_types.number(self.symbol, name, self.zoom(), feature)
    }

    pub fn string(&self, name: &str, feature: &TileFeature) -> Option<String> {
        self.fn_types.string(self.symbol, name, self.zoom(), feature)
    }

    pub fn boolean(&self, name: &str, feature: &TileFeature) -> Option<bool> {
        self.fn_types.boolean(self.symbol, name, self.zoom(), feature)
    }

    /// Scaled `altitude_property` value (or default); `None` when the pack
    /// takes altitude from geometry.
    pub fn property_altitude(&self, feature: &TileFeature) -> Option<f64> {
        let key = self.options.altitude_property.as_deref()?;
        let value = feature
            .property(key)
            .and_then(Value::as_f64)
            .unwrap_or(self.options.default_altitude);
        Some(value * self.options.altitude_scale)
    }
}

/// One pack specialization: how features are styled and turned into
/// vertices.
pub trait Placement {
    type Vector;

    fn format(&self, ctx: &PackContext<'_>) -> Format;

    /// Resolve a feature's style; `None` skips the feature.
    fn create_styled_vector(
        &mut self,
        feature: &TileFeature,
        ctx: &PackContext<'_>,
        requests: &mut AtlasRequests,
    ) -> Result<Option<Self::Vector>, PackError>;

    fn place_vector(
        &mut self,
        vector: &Self::Vector,
        feature: &TileFeature,
        scale: f64,
        ctx: &PackContext<'_>,
        out: &mut PackBuilder,
    ) -> Result<(), PackError>;

    /// Feature preprocessing before styling (e.g. merging).
    fn prepare_features(&self, features: Vec<TileFeature>, _symbol: &Symbol) -> Vec<TileFeature> {
        features
    }

    fn position_size(&self, separate_altitude: bool) -> usize {
        if separate_altitude { 2 } else { 3 }
    }

    fn has_elements(&self) -> bool {
        true
    }

    /// Whether a data pack can be built at all (e.g. an atlas is present).
    fn ready(&self, _ctx: &PackContext<'_>) -> bool {
        true
    }

    /// Reset per-build state.
    fn begin(&mut self) {}

    /// Post-process the converted pack with access to the raw columns.
    fn finish(
        &mut self,
        _builder: &PackBuilder,
        _pack: &mut DataPack,
        _ctx: &PackContext<'_>,
    ) -> Result<(), PackError> {
        Ok(())
    }
}

/// Base packer: normalizes features, resolves style, places every styled
/// vector through its strategy and sizes the resulting buffers.
pub struct VectorPack<P: Placement> {
    features: Vec<TileFeature>,
    symbol: Symbol,
    fn_types: FnTypes,
    options: PackOptions,
    max_abs_z: f64,
    placement: P,
    styled: Vec<(usize, P::Vector)>,
    requests: AtlasRequests,
    icon_atlas: Option<IconAtlas>,
    glyph_atlas: Option<GlyphAtlas>,
    atlas_supplied: bool,
    pool: ScratchPool,
}

impl<P: Placement + Default> VectorPack<P> {
    pub fn new(features: Vec<Feature>, symbol: Symbol, options: PackOptions) -> Result<Self, PackError> {
        Self::with_pool(features, symbol, options, ScratchPool::new())
    }

    pub fn with_pool(
        features: Vec<Feature>,
        symbol: Symbol,
        options: PackOptions,
        pool: ScratchPool,
    ) -> Result<Self, PackError> {
        Self::with_placement(features, symbol, options, pool, P::default())
    }
}

impl<P: Placement> VectorPack<P> {
    pub fn with_placement(
        features: Vec<Feature>,
        symbol: Symbol,
        options: PackOptions,
        pool: ScratchPool,
        placement: P,
    ) -> Result<Self, PackError> {
        let symbol = symbol.at_zoom(options.zoom)?;
        let fn_types = FnTypes::compile(&symbol)?;
        let normalized = normalize(features);
        let features = placement.prepare_features(normalized.features, &symbol);
        Ok(Self {
            features,
            symbol,
            fn_types,
            options,
            max_abs_z: normalized.max_abs_z,
            placement,
            styled: Vec::new(),
            requests: AtlasRequests::default(),
            icon_atlas: None,
            glyph_atlas: None,
            atlas_supplied: false,
            pool,
        })
    }

    /// Use prepared atlases instead of fetching.
    pub fn with_atlas(mut self, icon_atlas: Option<IconAtlas>, glyph_atlas: Option<GlyphAtlas>) -> Self {
        self.icon_atlas = icon_atlas;
        self.glyph_atlas = glyph_atlas;
        self.atlas_supplied = true;
        self
    }

    pub fn features(&self) -> &[TileFeature] {
        &self.features
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn fn_types(&self) -> &FnTypes {
        &self.fn_types
    }

    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    pub fn requests(&self) -> &AtlasRequests {
        &self.requests
    }

    pub fn max_abs_z(&self) -> f64 {
        self.max_abs_z
    }

    pub fn styled_count(&self) -> usize {
        self.styled.len()
    }

    /// Altitude gets its own channel when forced or when geometry is too tall
    /// for the packed `aPosition` integer range.
    pub fn separate_altitude(&self) -> bool {
        self.options.force_altitude_attribute || self.max_abs_z >= SEPARATE_ALTITUDE_THRESHOLD
    }

    pub fn into_pool(self) -> ScratchPool {
        self.pool
    }

    /// Style every feature, then fetch the atlas once if anything was
    /// requested, then pack.
    pub async fn load<R: AtlasRequestor>(
        &mut self,
        requestor: &R,
        scale: f64,
    ) -> Result<Option<DataPack>, PackError> {
        self.style_features()?;
        if !self.atlas_supplied && !self.requests.is_empty() {
            let response = requestor
                .fetch(&self.requests.icons, &self.requests.glyphs)
                .await?;
            self.apply_atlas(&response)?;
        }
        self.pack(scale)
    }

    pub fn apply_atlas(&mut self, response: &AtlasResponse) -> Result<(), PackError> {
        if !response.icons.is_empty() {
            self.icon_atlas = Some(IconAtlas::new(&response.icons)?);
        }
        if !response.glyphs.is_empty() {
            self.glyph_atlas = Some(GlyphAtlas::new(&response.glyphs)?);
        }
        Ok(())
    }

    /// Resolve every feature into a styled vector, collecting atlas requests.
    pub fn style_features(&mut self) -> Result<usize, PackError> {
        self.styled.clear();
        self.requests = AtlasRequests::default();
        let separate_altitude = self.separate_altitude();
        let ctx = PackContext {
            symbol: &self.symbol,
            fn_types: &self.fn_types,
            options: &self.options,
            icon_atlas: self.icon_atlas.as_ref(),
            glyph_atlas: self.glyph_atlas.as_ref(),
            separate_altitude,
        };
        for (i, feature) in self.features.iter().enumerate() {
            match self
                .placement
                .create_styled_vector(feature, &ctx, &mut self.requests)?
            {
                Some(vector) => self.styled.push((i, vector)),
                None => trace!(feature = feature.index, "feature resolved to nothing"),
            }
        }
        Ok(self.styled.len())
    }

    pub fn pack(&mut self, scale: f64) -> Result<Option<DataPack>, PackError> {
        if self.styled.is_empty() {
            return Ok(None);
        }
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PackError::InvalidScale(scale));
        }
        let Some(mut pack) = self.create_data_pack(scale)? else {
            return Ok(None);
        };
        pack.icon_atlas = self.icon_atlas.clone();
        pack.glyph_atlas = self.glyph_atlas.clone();
        Ok(Some(pack))
    }

    fn create_data_pack(&mut self, scale: f64) -> Result<Option<DataPack>, PackError> {
        let separate_altitude = self.separate_altitude();
        let ctx = PackContext {
            symbol: &self.symbol,
            fn_types: &self.fn_types,
            options: &self.options,
            icon_atlas: self.icon_atlas.as_ref(),
            glyph_atlas: self.glyph_atlas.as_ref(),
            separate_altitude,
        };
        if !self.placement.ready(&ctx) {
            debug!("no atlas available; nothing to pack");
            return Ok(None);
        }

        let format = self.placement.format(&ctx);
        let position_size = self.placement.position_size(separate_altitude);
        let mut builder = PackBuilder::new(format, &mut self.pool);
        self.placement.begin();

        let hidden = self.symbol.boolean("visible") == Some(false);
        let mut picking: Vec<f64> = Vec::new();
        let mut max_feature_index = 0usize;
        let mut ids: Vec<Option<i64>> = Vec::new();

        for (feature_pos, vector) in &self.styled {
            let feature = &self.features[*feature_pos];
            if hidden
                || (ctx.is_dynamic("visible") && ctx.boolean("visible", feature) == Some(false))
            {
                trace!(feature = feature.index, "feature hidden");
                continue;
            }
            let before = builder.vertex_count();
            self.placement
                .place_vector(vector, feature, scale, &ctx, &mut builder)?;
            let added = builder.vertex_count() - before;
            if added == 0 {
                continue;
            }
            picking.extend(std::iter::repeat_n(feature.index as f64, added));
            max_feature_index = max_feature_index.max(feature.index);
            let id = feature.id.as_ref().and_then(FeatureId::as_number);
            ids.extend(std::iter::repeat_n(id, added));
        }

        if builder.vertex_count() == 0
            || (self.placement.has_elements() && builder.elements().is_empty())
        {
            builder.recycle(&mut self.pool);
            return Ok(None);
        }

        let position_width = builder
            .format()
            .get("aPosition")
            .map(|e| e.width)
            .unwrap_or(position_size);
        if let Some([cx, cy]) = self.options.center
            && (cx != 0.0 || cy != 0.0)
            && let Some(positions) = builder.column_mut("aPosition")
        {
            for chunk in positions.chunks_mut(position_width) {
                chunk[0] -= cx;
                chunk[1] -= cy;
            }
        }
        let max_position = builder
            .column("aPosition")
            .map(|c| c.iter().fold(0.0f64, |m, v| m.max(v.abs())))
            .unwrap_or(0.0);
        let position_kind = self
            .options
            .position_type
            .unwrap_or_else(|| choose_position_type(max_position));

        let mut data = BTreeMap::new();
        for entry in builder.format().iter() {
            let kind = if entry.name == "aPosition" {
                position_kind
            } else {
                entry.kind
            };
            let values = builder.column(&entry.name).unwrap_or(&[]);
            data.insert(
                entry.name.clone(),
                PackedAttribute::new(entry.width, TypedBuffer::from_f64(kind, values)),
            );
        }
        data.insert(
            "aPickingId".to_string(),
            PackedAttribute::new(
                1,
                TypedBuffer::from_f64(choose_unsigned_type(max_feature_index as f64), &picking),
            ),
        );

        let feature_ids = if ids.iter().any(Option::is_some) {
            let values: Vec<f64> = ids.iter().map(|id| id.unwrap_or(0) as f64).collect();
            let max_id = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            let kind = if values.iter().any(|v| *v < 0.0) {
                choose_position_type(max_id)
            } else {
                choose_unsigned_type(max_id)
            };
            Some(TypedBuffer::from_f64(kind, &values))
        } else {
            None
        };

        let mut pack = DataPack {
            data,
            indices: self
                .placement
                .has_elements()
                .then(|| TypedBuffer::from_indices(builder.elements())),
            position_size,
            feature_ids,
            max_altitude: builder.max_altitude(),
            symbol_index: self.options.symbol_index,
            properties: builder.properties().clone(),
            line_vertex: None,
            icon_atlas: None,
            glyph_atlas: None,
        };
        self.placement.finish(&builder, &mut pack, &ctx)?;
        debug!(
            vertices = builder.vertex_count(),
            indices = builder.elements().len(),
            position_kind = position_kind.name(),
            "data pack created"
        );
        builder.recycle(&mut self.pool);
        Ok(Some(pack))
    }
}

/// Which specialization to build when the choice is made at runtime.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackKind {
    Point,
    LineExtrusion,
}

pub enum AnyPack {
    Point(VectorPack<PointPlacement>),
    LineExtrusion(VectorPack<LineExtrusionPlacement>),
}

impl AnyPack {
    pub fn new(
        kind: PackKind,
        features: Vec<Feature>,
        symbol: Symbol,
        options: PackOptions,
    ) -> Result<Self, PackError> {
        Self::with_pool(kind, features, symbol, options, ScratchPool::new())
    }

    pub fn with_pool(
        kind: PackKind,
        features: Vec<Feature>,
        symbol: Symbol,
        options: PackOptions,
        pool: ScratchPool,
    ) -> Result<Self, PackError> {
        Ok(match kind {
            PackKind::Point => AnyPack::Point(VectorPack::with_pool(features, symbol, options, pool)?),
            PackKind::LineExtrusion => {
                AnyPack::LineExtrusion(VectorPack::with_pool(features, symbol, options, pool)?)
            }
        })
    }

    pub fn kind(&self) -> PackKind {
        match self {
            AnyPack::Point(_) => PackKind::Point,
            AnyPack::LineExtrusion(_) => PackKind::LineExtrusion,
        }
    }

    pub async fn load<R: AtlasRequestor>(
        &mut self,
        requestor: &R,
        scale: f64,
    ) -> Result<Option<DataPack>, PackError> {
        match self {
            AnyPack::Point(pack) => pack.load(requestor, scale).await,
            AnyPack::LineExtrusion(pack) => pack.load(requestor, scale).await,
        }
    }

    pub fn style_features(&mut self) -> Result<usize, PackError> {
        match self {
            AnyPack::Point(pack) => pack.style_features(),
            AnyPack::LineExtrusion(pack) => pack.style_features(),
        }
    }

    pub fn requests(&self) -> &AtlasRequests {
        match self {
            AnyPack::Point(pack) => pack.requests(),
            AnyPack::LineExtrusion(pack) => pack.requests(),
        }
    }

    pub fn pack(&mut self, scale: f64) -> Result<Option<DataPack>, PackError> {
        match self {
            AnyPack::Point(pack) => pack.pack(scale),
            AnyPack::LineExtrusion(pack) => pack.pack(scale),
        }
    }

    pub fn into_pool(self) -> ScratchPool {
        match self {
            AnyPack::Point(pack) => pack.into_pool(),
            AnyPack::LineExtrusion(pack) => pack.into_pool(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AnyPack, PackError, PackKind, PackOptions, VectorPack};
    use crate::atlas::{AtlasResponse, IconAtlas, IconImage, StaticRequestor};
    use crate::buffer::{NumericKind, TypedBuffer};
    use crate::data_pack::DataPack;
    use crate::point::PointPlacement;
    use formats::{Feature, FeatureId, GeometryType};
    use foundation::ScratchPool;
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;
    use style::Symbol;

    fn point(x: f64, y: f64, z: f64) -> Feature {
        Feature::from_parts(GeometryType::Point, vec![vec![Vec3::new(x, y, z)]])
    }

    fn pin_atlas() -> IconAtlas {
        let mut icons = BTreeMap::new();
        icons.insert(
            "pin".to_string(),
            IconImage {
                width: 16,
                height: 16,
                data: vec![255; 16 * 16 * 4],
                pixel_ratio: 1.0,
            },
        );
        IconAtlas::new(&icons).expect("icon atlas")
    }

    fn pin_pack(features: Vec<Feature>, symbol: Symbol, options: PackOptions) -> VectorPack<PointPlacement> {
        let pack = VectorPack::new(features, symbol.with("markerFile", "pin"), options).expect("valid pack");
        let mut pack = pack.with_atlas(Some(pin_atlas()), None);
        pack.style_features().expect("styling");
        pack
    }

    fn packed(features: Vec<Feature>, symbol: Symbol, options: PackOptions) -> DataPack {
        match pin_pack(features, symbol, options).pack(1.0) {
            Ok(Some(data)) => data,
            other => panic!("expected a data pack, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_packs_to_nothing() {
        let mut pack = pin_pack(Vec::new(), Symbol::new(), PackOptions::default());
        assert!(matches!(pack.pack(1.0), Ok(None)));

        let requestor = StaticRequestor::new(AtlasResponse::default());
        let mut pack: VectorPack<PointPlacement> =
            VectorPack::new(Vec::new(), Symbol::new(), PackOptions::default()).expect("valid pack");
        assert!(matches!(pollster::block_on(pack.load(&requestor, 1.0)), Ok(None)));
    }

    #[test]
    fn scale_must_be_positive() {
        let mut pack = pin_pack(vec![point(1.0, 1.0, 0.0)], Symbol::new(), PackOptions::default());
        for scale in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(pack.pack(scale), Err(PackError::InvalidScale(_))), "{scale}");
        }
    }

    #[test]
    fn malformed_symbol_is_a_style_error() {
        let symbol = Symbol::new().with("markerWidth", json!({ "stops": "nope" }));
        let result: Result<VectorPack<PointPlacement>, PackError> =
            VectorPack::new(vec![point(1.0, 1.0, 0.0)], symbol, PackOptions::default());
        assert!(matches!(result, Err(PackError::Style(_))));
    }

    #[test]
    fn every_attribute_covers_every_vertex() {
        let features = vec![point(1.0, 1.0, 0.0), point(300.0, 20.0, 0.0), point(40.0, 5000.0, 0.0)];
        let symbol = Symbol::new().with("markerWidth", json!({ "property": "w", "type": "identity" }));
        let data = packed(features, symbol, PackOptions::default());
        assert_eq!(data.vertex_count(), 12);
        for (name, attribute) in &data.data {
            assert_eq!(attribute.buffer.len(), attribute.width * data.vertex_count(), "{name}");
        }
        let indices = data.indices.as_ref().map(TypedBuffer::to_f64_vec).unwrap_or_default();
        assert_eq!(indices.len(), 18);
        assert!(indices.iter().all(|i| (*i as usize) < data.vertex_count()));
        // 5000 does not fit i8
        assert_eq!(data.attribute("aPosition").map(|a| a.buffer.kind()), Some(NumericKind::I16));
        assert_eq!(
            data.attribute("aPickingId").map(|a| a.buffer.to_f64_vec()),
            Some([0.0; 4].into_iter().chain([1.0; 4]).chain([2.0; 4]).collect())
        );
    }

    #[test]
    fn hidden_features_are_skipped() {
        let hidden = Symbol::new().with("visible", false);
        let mut pack = pin_pack(vec![point(1.0, 1.0, 0.0)], hidden, PackOptions::default());
        assert!(matches!(pack.pack(1.0), Ok(None)));

        let by_property = Symbol::new().with(
            "visible",
            json!({ "property": "show", "type": "categorical", "stops": [[true, true]], "default": false }),
        );
        let features = vec![
            point(1.0, 1.0, 0.0).with_property("show", true),
            point(2.0, 2.0, 0.0).with_property("show", false),
        ];
        let data = packed(features, by_property, PackOptions::default());
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(
            data.attribute("aPickingId").map(|a| a.buffer.to_f64_vec()),
            Some(vec![0.0; 4])
        );
    }

    #[test]
    fn tall_geometry_gets_an_altitude_channel() {
        let data = packed(vec![point(1.0, 1.0, 200_000.0)], Symbol::new(), PackOptions::default());
        assert_eq!(data.position_size, 2);
        assert_eq!(data.attribute("aPosition").map(|a| a.width), Some(2));
        assert_eq!(
            data.attribute("aAltitude").map(|a| a.buffer.clone()),
            Some(TypedBuffer::F32(vec![200_000.0; 4]))
        );
        assert_eq!(data.max_altitude, 200_000.0);

        let forced = PackOptions {
            force_altitude_attribute: true,
            ..PackOptions::default()
        };
        let data = packed(vec![point(1.0, 1.0, 5.0)], Symbol::new(), forced);
        assert_eq!(data.position_size, 2);
    }

    #[test]
    fn altitude_property_overrides_geometry() {
        let options = PackOptions {
            altitude_property: Some("alt".to_string()),
            altitude_scale: 2.0,
            ..PackOptions::default()
        };
        let data = packed(
            vec![point(1.0, 1.0, 7.0).with_property("alt", 30)],
            Symbol::new(),
            options,
        );
        let positions = data.attribute("aPosition").map(|a| a.buffer.to_f64_vec()).unwrap_or_default();
        assert_eq!(&positions[..3], &[1.0, 1.0, 60.0]);
    }

    #[test]
    fn center_is_subtracted() {
        let options = PackOptions {
            center: Some([100.0, 100.0]),
            ..PackOptions::default()
        };
        let data = packed(vec![point(300.0, 90.0, 0.0)], Symbol::new(), options);
        let positions = data.attribute("aPosition").map(|a| a.buffer.clone());
        assert_eq!(
            positions.map(|p| p.to_f64_vec()[..3].to_vec()),
            Some(vec![200.0, -10.0, 0.0])
        );
    }

    #[test]
    fn feature_ids_follow_vertices() {
        let features = vec![
            point(1.0, 1.0, 0.0).with_id(FeatureId::Int(300)),
            point(2.0, 2.0, 0.0).with_id(FeatureId::Str("a".into())),
        ];
        let data = packed(features, Symbol::new(), PackOptions::default());
        let ids = data.feature_ids.as_ref().map(TypedBuffer::to_f64_vec);
        assert_eq!(ids, Some([300.0; 4].into_iter().chain([0.0; 4]).collect()));
        assert_eq!(data.feature_ids.as_ref().map(TypedBuffer::kind), Some(NumericKind::U16));

        let anonymous = packed(vec![point(1.0, 1.0, 0.0)], Symbol::new(), PackOptions::default());
        assert_eq!(anonymous.feature_ids, None);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: PackOptions =
            serde_json::from_value(json!({ "zoom": 14, "position_type": "f32" })).expect("options");
        assert_eq!(options.zoom, 14.0);
        assert_eq!(options.position_type, Some(NumericKind::F32));
        assert_eq!(options.extent, 8192);
        assert!(options.top && options.side);
    }

    #[test]
    fn any_pack_selects_by_kind() {
        let line = Feature::from_parts(
            GeometryType::LineString,
            vec![vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)]],
        );
        let mut pack = AnyPack::with_pool(
            PackKind::LineExtrusion,
            vec![line],
            Symbol::new(),
            PackOptions::default(),
            ScratchPool::new(),
        )
        .expect("valid pack");
        assert_eq!(pack.kind(), PackKind::LineExtrusion);
        let requestor = StaticRequestor::new(AtlasResponse::default());
        let result = pollster::block_on(pack.load(&requestor, 1.0));
        assert!(matches!(&result, Ok(Some(data)) if data.vertex_count() == 20), "{result:?}");
        assert!(pack.requests().is_empty());
        assert!(!pack.into_pool().is_empty());
    }
}
