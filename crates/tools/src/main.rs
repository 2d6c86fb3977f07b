use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use packer::{AnyPack, AtlasResponse, PackKind, PackOptions, PackSummary, StaticRequestor};
use style::Symbol;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Point,
    LineExtrusion,
}

impl From<KindArg> for PackKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Point => PackKind::Point,
            KindArg::LineExtrusion => PackKind::LineExtrusion,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Pack tile-local GeoJSON features into GPU-ready buffers")]
struct Args {
    /// GeoJSON FeatureCollection in tile coordinates
    features: PathBuf,

    /// Symbol (style) JSON object
    symbol: PathBuf,

    #[arg(long, value_enum, default_value_t = KindArg::Point)]
    kind: KindArg,

    /// PackOptions JSON; missing fields take their defaults
    #[arg(long)]
    options: Option<PathBuf>,

    /// Overrides the zoom from --options
    #[arg(long)]
    zoom: Option<f64>,

    /// Layout scale (tile pixel ratio)
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Prepared atlas response JSON served to the pack
    #[arg(long, conflicts_with = "synthetic_atlas")]
    atlas: Option<PathBuf>,

    /// Serve placeholder icons and glyphs for every request
    #[arg(long)]
    synthetic_atlas: bool,
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()).into())
}

fn load_options(args: &Args) -> Result<PackOptions, Box<dyn std::error::Error>> {
    let mut options = match &args.options {
        Some(path) => serde_json::from_str(&read(path)?)?,
        None => PackOptions::default(),
    };
    if let Some(zoom) = args.zoom {
        options.zoom = zoom;
    }
    Ok(options)
}

/// Build one pack; `None` when the input produced no geometry.
fn run(
    features: &str,
    symbol: &str,
    kind: PackKind,
    options: PackOptions,
    scale: f64,
    atlas: AtlasSource,
) -> Result<Option<PackSummary>, Box<dyn std::error::Error>> {
    let features = formats::features_from_str(features)?;
    let symbol = Symbol::from_value(serde_json::from_str(symbol)?)?;
    info!(features = features.len(), ?kind, "packing");

    let mut pack = AnyPack::new(kind, features, symbol, options)?;
    let response = match atlas {
        AtlasSource::Prepared(response) => response,
        AtlasSource::Synthetic => {
            pack.style_features()?;
            AtlasResponse::synthetic(pack.requests())
        }
        AtlasSource::None => AtlasResponse::default(),
    };
    let requestor = StaticRequestor::new(response);
    let data = pollster::block_on(pack.load(&requestor, scale))?;
    Ok(data.map(|d| d.summary()))
}

enum AtlasSource {
    Prepared(AtlasResponse),
    Synthetic,
    None,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let options = load_options(&args)?;
    let atlas = match &args.atlas {
        Some(path) => AtlasSource::Prepared(serde_json::from_str(&read(path)?)?),
        None if args.synthetic_atlas => AtlasSource::Synthetic,
        None => AtlasSource::None,
    };
    let summary = run(
        &read(&args.features)?,
        &read(&args.symbol)?,
        args.kind.into(),
        options,
        args.scale,
        atlas,
    )?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AtlasSource, run};
    use packer::{NumericKind, PackKind, PackOptions};
    use pretty_assertions::assert_eq;

    const POINTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "name": "Harbour" },
              "geometry": { "type": "Point", "coordinates": [100, 200] } }
        ]
    }"#;

    #[test]
    fn synthetic_atlas_labels() {
        let summary = run(
            POINTS,
            r#"{ "textName": "{name}", "textSize": 16 }"#,
            PackKind::Point,
            PackOptions::default(),
            1.0,
            AtlasSource::Synthetic,
        );
        let Ok(Some(summary)) = summary else {
            panic!("expected a summary, got {summary:?}");
        };
        // one quad per glyph of "Harbour"
        assert_eq!(summary.vertex_count, 7 * 4);
        assert_eq!(summary.index_count, 7 * 6);
        assert_eq!(summary.index_kind, Some(NumericKind::U16));
        assert_eq!(summary.position_size, 3);
    }

    #[test]
    fn missing_atlas_gives_null() {
        let summary = run(
            POINTS,
            r#"{ "markerFile": "pin.png" }"#,
            PackKind::Point,
            PackOptions::default(),
            1.0,
            AtlasSource::None,
        );
        assert!(matches!(summary, Ok(None)), "{summary:?}");
    }

    #[test]
    fn bad_symbol_is_reported() {
        let summary = run(
            POINTS,
            "[1, 2]",
            PackKind::LineExtrusion,
            PackOptions::default(),
            1.0,
            AtlasSource::None,
        );
        let Err(e) = summary else {
            panic!("expected an error");
        };
        assert_eq!(e.to_string(), "symbol must be a JSON object");
    }
}
