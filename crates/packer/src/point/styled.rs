use crate::pack::PackContext;
use formats::TileFeature;
use serde_json::{Map, Value};
use style::replace_template;

pub const DEFAULT_TEXT_SIZE: f64 = 14.0;

/// Marker fields that distinguish one generated vector marker from another.
const VECTOR_MARKER_FIELDS: &[&str] = &[
    "markerWidth",
    "markerHeight",
    "markerFill",
    "markerFillPatternFile",
    "markerFillOpacity",
    "markerLineColor",
    "markerLineWidth",
    "markerLineOpacity",
    "markerLineDasharray",
    "markerLinePatternFile",
];

#[derive(Debug, Clone, PartialEq)]
pub struct StyledText {
    pub font: String,
    pub text: String,
}

/// A feature's resolved icon and/or label for one placement pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledPoint {
    pub icon: Option<String>,
    pub text: Option<StyledText>,
    /// Requested size; unsized icons take their atlas display size.
    pub size: Option<[f64; 2]>,
}

/// CSS-like font key used to request glyphs.
pub fn font_name(face: Option<&str>, style: Option<&str>, weight: Option<&str>) -> String {
    format!(
        "{} {} 24px {}",
        style.unwrap_or("normal"),
        weight.unwrap_or("normal"),
        face.unwrap_or("monospace")
    )
}

impl StyledPoint {
    pub fn resolve(feature: &TileFeature, ctx: &PackContext<'_>) -> Option<Self> {
        let icon = resolve_icon(feature, ctx);
        let text = if ctx.symbol.get("textName").is_some() {
            resolve_text(feature, ctx)
        } else {
            None
        };
        if icon.is_none() && text.is_none() {
            return None;
        }

        let size = if text.is_some() {
            let size = ctx
                .number("textSize", feature)
                .unwrap_or(DEFAULT_TEXT_SIZE);
            Some([size, size])
        } else {
            let width = ctx.number("markerWidth", feature);
            let height = ctx.number("markerHeight", feature);
            match (width, height) {
                (Some(w), Some(h)) => Some([w, h]),
                (Some(w), None) => Some([w, w]),
                (None, Some(h)) => Some([h, h]),
                (None, None) => None,
            }
        };
        Some(Self { icon, text, size })
    }
}

fn resolve_icon(feature: &TileFeature, ctx: &PackContext<'_>) -> Option<String> {
    if let Some(marker_type) = ctx.string("markerType", feature) {
        let mut key = Map::new();
        key.insert("markerType".to_string(), Value::String(marker_type));
        for field in VECTOR_MARKER_FIELDS {
            if let Some(value) = ctx.value(field, feature) {
                key.insert((*field).to_string(), value);
            }
        }
        return Some(format!("vector://{}", Value::Object(key)));
    }
    let file = ctx.string("markerFile", feature)?;
    Some(replace_template(&file, feature, "default"))
}

fn resolve_text(feature: &TileFeature, ctx: &PackContext<'_>) -> Option<StyledText> {
    let name = ctx.string("textName", feature)?;
    let text = replace_template(&name, feature, "");
    if text.is_empty() {
        return None;
    }
    let face = ctx.string("textFaceName", feature);
    let style = ctx.string("textStyle", feature);
    let weight = ctx.string("textWeight", feature);
    Some(StyledText {
        font: font_name(face.as_deref(), style.as_deref(), weight.as_deref()),
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::{StyledPoint, StyledText, font_name};
    use crate::pack::{PackContext, PackOptions};
    use formats::{GeometryType, TileFeature, DEFAULT_EXTENT};
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};
    use style::{FnTypes, Symbol};

    fn feature(props: &[(&str, serde_json::Value)]) -> TileFeature {
        let properties: Map<String, serde_json::Value> =
            props.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        TileFeature {
            kind: GeometryType::Point,
            geometry: vec![vec![Vec3::new(1.0, 1.0, 0.0)]],
            properties,
            id: None,
            layer: None,
            index: 0,
            extent: DEFAULT_EXTENT,
        }
    }

    fn resolve(symbol: Symbol, feature: &TileFeature) -> Option<StyledPoint> {
        let fn_types = FnTypes::compile(&symbol).unwrap_or_default();
        let options = PackOptions::default();
        let ctx = PackContext {
            symbol: &symbol,
            fn_types: &fn_types,
            options: &options,
            icon_atlas: None,
            glyph_atlas: None,
            separate_altitude: false,
        };
        StyledPoint::resolve(feature, &ctx)
    }

    #[test]
    fn marker_file_template() {
        let symbol = Symbol::new().with("markerFile", "icons/{kind}.png");
        let point = resolve(symbol.clone(), &feature(&[("kind", json!("bar"))]));
        assert_eq!(point.and_then(|p| p.icon), Some("icons/bar.png".to_string()));

        let point = resolve(symbol, &feature(&[]));
        assert_eq!(point.and_then(|p| p.icon), Some("icons/default.png".to_string()));
    }

    #[test]
    fn vector_marker_key_is_stable() {
        let symbol = Symbol::new()
            .with("markerType", "ellipse")
            .with("markerWidth", 10)
            .with("markerFill", "#f00");
        let Some(point) = resolve(symbol, &feature(&[])) else {
            panic!("marker resolved to nothing");
        };
        assert_eq!(
            point.icon.as_deref(),
            Some(r##"vector://{"markerFill":"#f00","markerType":"ellipse","markerWidth":10}"##)
        );
        assert_eq!(point.size, Some([10.0, 10.0]));
    }

    #[test]
    fn text_and_font() {
        let symbol = Symbol::new()
            .with("textName", "{name}")
            .with("textFaceName", "sans-serif")
            .with("textSize", 20);
        let point = resolve(symbol.clone(), &feature(&[("name", json!("Oslo"))]));
        assert_eq!(
            point.as_ref().and_then(|p| p.text.clone()),
            Some(StyledText {
                font: "normal normal 24px sans-serif".to_string(),
                text: "Oslo".to_string(),
            })
        );
        assert_eq!(point.and_then(|p| p.size), Some([20.0, 20.0]));

        // missing label property leaves nothing to draw
        assert_eq!(resolve(symbol, &feature(&[])), None);
        assert_eq!(font_name(None, None, None), "normal normal 24px monospace");
    }
}
