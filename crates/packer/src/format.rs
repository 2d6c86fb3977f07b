use crate::buffer::NumericKind;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeFormat {
    pub name: String,
    pub width: usize,
    pub kind: NumericKind,
}

/// Ordered attribute layout of one vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Format {
    entries: Vec<AttributeFormat>,
}

impl Format {
    pub fn new() -> Self {
        Self::default()
    }

    /// `aPosition` as `[x, y, altitude]`, or `[x, y]` plus a separate `f32`
    /// `aAltitude` channel.
    pub fn with_position(separate_altitude: bool) -> Self {
        let format = Format::new();
        if separate_altitude {
            format
                .with("aPosition", 2, NumericKind::I16)
                .with("aAltitude", 1, NumericKind::F32)
        } else {
            format.with("aPosition", 3, NumericKind::I16)
        }
    }

    pub fn with(mut self, name: &str, width: usize, kind: NumericKind) -> Self {
        self.push(name, width, kind);
        self
    }

    pub fn push(&mut self, name: &str, width: usize, kind: NumericKind) {
        self.entries.push(AttributeFormat {
            name: name.to_string(),
            width,
            kind,
        });
    }

    /// Number of values in one vertex row.
    pub fn width(&self) -> usize {
        self.entries.iter().map(|e| e.width).sum()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeFormat> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeFormat> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}
