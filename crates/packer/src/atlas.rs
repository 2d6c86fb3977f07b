use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

/// Transparent border kept around every atlas entry.
pub const ATLAS_PADDING: u32 = 1;

/// SDF border baked around every glyph bitmap.
pub const GLYPH_BORDER: u32 = 3;

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IconRequest {
    pub min_width: f64,
    pub min_height: f64,
}

pub type IconRequests = BTreeMap<String, IconRequest>;
pub type GlyphRequests = BTreeMap<String, BTreeSet<u32>>;

/// Icons and glyphs collected while styling features.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtlasRequests {
    pub icons: IconRequests,
    pub glyphs: GlyphRequests,
}

impl AtlasRequests {
    pub fn request_icon(&mut self, key: &str, size: Option<[f64; 2]>) {
        let entry = self.icons.entry(key.to_string()).or_default();
        if let Some([w, h]) = size {
            entry.min_width = entry.min_width.max(w);
            entry.min_height = entry.min_height.max(h);
        }
    }

    pub fn request_glyphs(&mut self, font: &str, text: &str) {
        self.glyphs
            .entry(font.to_string())
            .or_default()
            .extend(text.chars().map(u32::from));
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty() && self.glyphs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconImage {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels, row-major.
    pub data: Vec<u8>,
    pub pixel_ratio: f64,
}

impl Default for IconImage {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
            pixel_ratio: 1.0,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphMetrics {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
    pub advance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    /// Alpha (SDF) pixels, row-major.
    pub data: Vec<u8>,
    pub metrics: GlyphMetrics,
}

/// What the atlas collaborator returns for one request round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasResponse {
    pub icons: BTreeMap<String, IconImage>,
    pub glyphs: BTreeMap<String, BTreeMap<u32, GlyphBitmap>>,
}

impl AtlasResponse {
    /// Solid placeholder images for every request: icons at their requested
    /// size (16 px when unsized) and fixed-metric glyphs.
    pub fn synthetic(requests: &AtlasRequests) -> Self {
        let mut out = AtlasResponse::default();
        for (key, req) in &requests.icons {
            let width = if req.min_width > 0.0 { req.min_width.ceil() as u32 } else { 16 };
            let height = if req.min_height > 0.0 { req.min_height.ceil() as u32 } else { 16 };
            out.icons.insert(
                key.clone(),
                IconImage {
                    width,
                    height,
                    data: vec![255; (width * height * 4) as usize],
                    pixel_ratio: 1.0,
                },
            );
        }
        for (font, codes) in &requests.glyphs {
            let glyphs = out.glyphs.entry(font.clone()).or_default();
            for &code in codes {
                let blank = char::from_u32(code).is_some_and(char::is_whitespace);
                let (w, h) = if blank { (0, 0) } else { (14, 18) };
                let (bw, bh) = if blank { (0, 0) } else { (w + 2 * GLYPH_BORDER, h + 2 * GLYPH_BORDER) };
                glyphs.insert(
                    code,
                    GlyphBitmap {
                        width: bw,
                        height: bh,
                        data: vec![200; (bw * bh) as usize],
                        metrics: GlyphMetrics {
                            width: f64::from(w),
                            height: f64::from(h),
                            left: 1.0,
                            top: -6.0,
                            advance: if blank { 6.0 } else { 16.0 },
                        },
                    },
                );
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtlasError {
    Fetch(String),
    InvalidImage { key: String, reason: String },
}

impl std::fmt::Display for AtlasError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtlasError::Fetch(reason) => write!(f, "atlas fetch failed: {reason}"),
            AtlasError::InvalidImage { key, reason } => {
                write!(f, "invalid atlas image {key}: {reason}")
            }
        }
    }
}

impl std::error::Error for AtlasError {}

/// Collaborator that resolves icon and glyph requests into images.
pub trait AtlasRequestor {
    fn fetch(
        &self,
        icons: &IconRequests,
        glyphs: &GlyphRequests,
    ) -> impl Future<Output = Result<AtlasResponse, AtlasError>>;
}

/// Serves a prepared response, filtered to what was requested.
#[derive(Debug, Clone, Default)]
pub struct StaticRequestor {
    response: AtlasResponse,
}

impl StaticRequestor {
    pub fn new(response: AtlasResponse) -> Self {
        Self { response }
    }
}

impl AtlasRequestor for StaticRequestor {
    fn fetch(
        &self,
        icons: &IconRequests,
        glyphs: &GlyphRequests,
    ) -> impl Future<Output = Result<AtlasResponse, AtlasError>> {
        let mut out = AtlasResponse::default();
        for key in icons.keys() {
            if let Some(image) = self.response.icons.get(key) {
                out.icons.insert(key.clone(), image.clone());
            }
        }
        for (font, codes) in glyphs {
            let Some(available) = self.response.glyphs.get(font) else {
                continue;
            };
            let picked: BTreeMap<u32, GlyphBitmap> = codes
                .iter()
                .filter_map(|code| available.get(code).map(|g| (*code, g.clone())))
                .collect();
            out.glyphs.insert(font.clone(), picked);
        }
        std::future::ready(Ok(out))
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Rgba,
    Alpha,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtlasImage {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

impl AtlasImage {
    fn blank(width: u32, height: u32, format: ImageFormat) -> Self {
        let channels = match format {
            ImageFormat::Rgba => 4,
            ImageFormat::Alpha => 1,
        };
        Self {
            width,
            height,
            data: vec![0; (width * height * channels) as usize],
            format,
        }
    }

    fn channels(&self) -> usize {
        match self.format {
            ImageFormat::Rgba => 4,
            ImageFormat::Alpha => 1,
        }
    }

    fn blit(&mut self, src: &[u8], src_width: u32, src_height: u32, x: u32, y: u32) {
        let c = self.channels();
        let row_len = src_width as usize * c;
        for row in 0..src_height as usize {
            let src_start = row * row_len;
            let dst_start = ((y as usize + row) * self.width as usize + x as usize) * c;
            self.data[dst_start..dst_start + row_len]
                .copy_from_slice(&src[src_start..src_start + row_len]);
        }
    }
}

/// Place `sizes` on horizontal shelves; returns the top-left corners and
/// the atlas size.
fn shelf_pack(sizes: &[(u32, u32)]) -> (Vec<(u32, u32)>, u32, u32) {
    let area: u64 = sizes.iter().map(|&(w, h)| u64::from(w) * u64::from(h)).sum();
    let widest = sizes.iter().map(|&(w, _)| w).max().unwrap_or(0);
    let side = ((area as f64).sqrt().ceil() as u32).next_power_of_two();
    let width = side.max(widest).max(1);

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| sizes[b].1.cmp(&sizes[a].1).then(a.cmp(&b)));

    let mut out = vec![(0, 0); sizes.len()];
    let (mut x, mut y, mut shelf_h) = (0u32, 0u32, 0u32);
    for i in order {
        let (w, h) = sizes[i];
        if x + w > width {
            y += shelf_h;
            x = 0;
            shelf_h = 0;
        }
        out[i] = (x, y);
        x += w;
        shelf_h = shelf_h.max(h);
    }
    (out, width, (y + shelf_h).max(1))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePosition {
    pub padded_rect: Rect,
    pub pixel_ratio: f64,
    pub tl: [f64; 2],
    pub br: [f64; 2],
    pub display_size: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconAtlas {
    pub image: AtlasImage,
    pub positions: BTreeMap<String, ImagePosition>,
}

impl IconAtlas {
    pub fn new(icons: &BTreeMap<String, IconImage>) -> Result<Self, AtlasError> {
        for (key, icon) in icons {
            let expected = icon.width as usize * icon.height as usize * 4;
            if icon.data.len() != expected {
                return Err(AtlasError::InvalidImage {
                    key: key.clone(),
                    reason: format!("expected {expected} RGBA bytes, got {}", icon.data.len()),
                });
            }
        }
        let sizes: Vec<(u32, u32)> = icons
            .values()
            .map(|i| (i.width + 2 * ATLAS_PADDING, i.height + 2 * ATLAS_PADDING))
            .collect();
        let (corners, width, height) = shelf_pack(&sizes);
        let mut image = AtlasImage::blank(width, height, ImageFormat::Rgba);
        let mut positions = BTreeMap::new();
        for ((key, icon), (x, y)) in icons.iter().zip(corners) {
            image.blit(&icon.data, icon.width, icon.height, x + ATLAS_PADDING, y + ATLAS_PADDING);
            let ratio = if icon.pixel_ratio > 0.0 { icon.pixel_ratio } else { 1.0 };
            let tl = [f64::from(x + ATLAS_PADDING), f64::from(y + ATLAS_PADDING)];
            positions.insert(
                key.clone(),
                ImagePosition {
                    padded_rect: Rect {
                        x,
                        y,
                        w: icon.width + 2 * ATLAS_PADDING,
                        h: icon.height + 2 * ATLAS_PADDING,
                    },
                    pixel_ratio: ratio,
                    tl,
                    br: [tl[0] + f64::from(icon.width), tl[1] + f64::from(icon.height)],
                    display_size: [f64::from(icon.width) / ratio, f64::from(icon.height) / ratio],
                },
            );
        }
        Ok(Self { image, positions })
    }

    pub fn get(&self, key: &str) -> Option<&ImagePosition> {
        self.positions.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphPosition {
    pub rect: Rect,
    pub metrics: GlyphMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphAtlas {
    pub image: AtlasImage,
    pub positions: BTreeMap<String, BTreeMap<u32, GlyphPosition>>,
}

impl GlyphAtlas {
    pub fn new(glyphs: &BTreeMap<String, BTreeMap<u32, GlyphBitmap>>) -> Result<Self, AtlasError> {
        let mut entries = Vec::new();
        for (font, codes) in glyphs {
            for (code, glyph) in codes {
                let expected = glyph.width as usize * glyph.height as usize;
                if glyph.data.len() != expected {
                    return Err(AtlasError::InvalidImage {
                        key: format!("{font}/{code}"),
                        reason: format!("expected {expected} alpha bytes, got {}", glyph.data.len()),
                    });
                }
                entries.push((font, *code, glyph));
            }
        }
        let sizes: Vec<(u32, u32)> = entries
            .iter()
            .map(|(_, _, g)| (g.width + 2 * ATLAS_PADDING, g.height + 2 * ATLAS_PADDING))
            .collect();
        let (corners, width, height) = shelf_pack(&sizes);
        let mut image = AtlasImage::blank(width, height, ImageFormat::Alpha);
        let mut positions: BTreeMap<String, BTreeMap<u32, GlyphPosition>> = BTreeMap::new();
        for ((font, code, glyph), (x, y)) in entries.into_iter().zip(corners) {
            image.blit(&glyph.data, glyph.width, glyph.height, x + ATLAS_PADDING, y + ATLAS_PADDING);
            positions.entry(font.clone()).or_default().insert(
                code,
                GlyphPosition {
                    rect: Rect {
                        x: x + ATLAS_PADDING,
                        y: y + ATLAS_PADDING,
                        w: glyph.width,
                        h: glyph.height,
                    },
                    metrics: glyph.metrics,
                },
            );
        }
        Ok(Self { image, positions })
    }

    pub fn font(&self, font: &str) -> Option<&BTreeMap<u32, GlyphPosition>> {
        self.positions.get(font)
    }
}
