use crate::atlas::{GlyphAtlas, IconAtlas};
use crate::buffer::{NumericKind, TypedBuffer};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PackedAttribute {
    pub width: usize,
    pub buffer: TypedBuffer,
}

impl PackedAttribute {
    pub fn new(width: usize, buffer: TypedBuffer) -> Self {
        Self { width, buffer }
    }

    pub fn vertex_count(&self) -> usize {
        if self.width == 0 {
            return 0;
        }
        self.buffer.len() / self.width
    }
}

/// GPU-ready output of one pack build.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPack {
    pub data: BTreeMap<String, PackedAttribute>,
    pub indices: Option<TypedBuffer>,
    /// 3 when altitude rides in `aPosition`, 2 when it has its own channel.
    pub position_size: usize,
    pub feature_ids: Option<TypedBuffer>,
    pub max_altitude: f64,
    pub symbol_index: usize,
    pub properties: BTreeMap<String, bool>,
    /// Clipped label lines as `x, y, 0` triples (along-line text only).
    pub line_vertex: Option<TypedBuffer>,
    pub icon_atlas: Option<IconAtlas>,
    pub glyph_atlas: Option<GlyphAtlas>,
}

impl DataPack {
    pub fn attribute(&self, name: &str) -> Option<&PackedAttribute> {
        self.data.get(name)
    }

    pub fn vertex_count(&self) -> usize {
        self.data
            .get("aPickingId")
            .map(PackedAttribute::vertex_count)
            .unwrap_or(0)
    }

    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map(TypedBuffer::len).unwrap_or(0)
    }

    /// Raw views of every buffer that would be moved to the caller.
    pub fn transfer_buffers(&self) -> Vec<&[u8]> {
        let mut out: Vec<&[u8]> = self.data.values().map(|a| a.buffer.as_bytes()).collect();
        if let Some(indices) = &self.indices {
            out.push(indices.as_bytes());
        }
        if let Some(ids) = &self.feature_ids {
            out.push(ids.as_bytes());
        }
        if let Some(lines) = &self.line_vertex {
            out.push(lines.as_bytes());
        }
        if let Some(atlas) = &self.icon_atlas {
            out.push(&atlas.image.data);
        }
        if let Some(atlas) = &self.glyph_atlas {
            out.push(&atlas.image.data);
        }
        out
    }

    pub fn summary(&self) -> PackSummary {
        PackSummary {
            vertex_count: self.vertex_count(),
            index_count: self.index_count(),
            index_kind: self.indices.as_ref().map(TypedBuffer::kind),
            position_size: self.position_size,
            max_altitude: self.max_altitude,
            attributes: self
                .data
                .iter()
                .map(|(name, a)| AttributeSummary {
                    name: name.clone(),
                    width: a.width,
                    kind: a.buffer.kind(),
                    len: a.buffer.len(),
                })
                .collect(),
            feature_id_kind: self.feature_ids.as_ref().map(TypedBuffer::kind),
            line_vertex_len: self.line_vertex.as_ref().map(TypedBuffer::len),
            properties: self.properties.clone(),
            transfer_bytes: self.transfer_buffers().iter().map(|b| b.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeSummary {
    pub name: String,
    pub width: usize,
    pub kind: NumericKind,
    pub len: usize,
}

/// Serializable overview of a pack, without the buffer contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackSummary {
    pub vertex_count: usize,
    pub index_count: usize,
    pub index_kind: Option<NumericKind>,
    pub position_size: usize,
    pub max_altitude: f64,
    pub attributes: Vec<AttributeSummary>,
    pub feature_id_kind: Option<NumericKind>,
    pub line_vertex_len: Option<usize>,
    pub properties: BTreeMap<String, bool>,
    pub transfer_bytes: usize,
}
