use foundation::math::fits_f32_exactly;
use serde::{Deserialize, Serialize};

/// Element type of a packed attribute buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl NumericKind {
    pub fn byte_size(self) -> usize {
        match self {
            NumericKind::I8 | NumericKind::U8 => 1,
            NumericKind::I16 | NumericKind::U16 => 2,
            NumericKind::I32 | NumericKind::U32 | NumericKind::F32 => 4,
            NumericKind::F64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NumericKind::I8 => "i8",
            NumericKind::U8 => "u8",
            NumericKind::I16 => "i16",
            NumericKind::U16 => "u16",
            NumericKind::I32 => "i32",
            NumericKind::U32 => "u32",
            NumericKind::F32 => "f32",
            NumericKind::F64 => "f64",
        }
    }
}

/// Smallest signed kind for coordinates bounded by `|max|`.
///
/// 32-bit integers are never chosen; past `i16` everything is `f32`, which is
/// exact up to 2^24.
pub fn choose_position_type(max: f64) -> NumericKind {
    let max = max.abs();
    if max < 128.0 {
        NumericKind::I8
    } else if max < 32768.0 {
        NumericKind::I16
    } else {
        if !fits_f32_exactly(max) {
            tracing::debug!(max, "coordinates exceed the exact f32 integer range");
        }
        NumericKind::F32
    }
}

/// `u16` indices unless some index reaches 65536.
pub fn choose_index_type(max_index: usize) -> NumericKind {
    if max_index < 65536 {
        NumericKind::U16
    } else {
        NumericKind::U32
    }
}

pub fn choose_unsigned_type(max: f64) -> NumericKind {
    let max = max.abs();
    if max < 256.0 {
        NumericKind::U8
    } else if max < 65536.0 {
        NumericKind::U16
    } else if max < 4_294_967_296.0 {
        NumericKind::U32
    } else {
        NumericKind::F64
    }
}

/// Fixed-width attribute storage converted once from an `f64` accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedBuffer {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl TypedBuffer {
    /// Convert with Rust's saturating float casts; fractions truncate toward
    /// zero and NaN becomes 0 for integer kinds.
    pub fn from_f64(kind: NumericKind, values: &[f64]) -> Self {
        match kind {
            NumericKind::I8 => TypedBuffer::I8(values.iter().map(|&v| v as i8).collect()),
            NumericKind::U8 => TypedBuffer::U8(values.iter().map(|&v| v as u8).collect()),
            NumericKind::I16 => TypedBuffer::I16(values.iter().map(|&v| v as i16).collect()),
            NumericKind::U16 => TypedBuffer::U16(values.iter().map(|&v| v as u16).collect()),
            NumericKind::I32 => TypedBuffer::I32(values.iter().map(|&v| v as i32).collect()),
            NumericKind::U32 => TypedBuffer::U32(values.iter().map(|&v| v as u32).collect()),
            NumericKind::F32 => TypedBuffer::F32(values.iter().map(|&v| v as f32).collect()),
            NumericKind::F64 => TypedBuffer::F64(values.to_vec()),
        }
    }

    pub fn from_indices(indices: &[u32]) -> Self {
        let max = indices.iter().copied().max().unwrap_or(0) as usize;
        match choose_index_type(max) {
            NumericKind::U16 => TypedBuffer::U16(indices.iter().map(|&i| i as u16).collect()),
            _ => TypedBuffer::U32(indices.to_vec()),
        }
    }

    pub fn kind(&self) -> NumericKind {
        match self {
            TypedBuffer::I8(_) => NumericKind::I8,
            TypedBuffer::U8(_) => NumericKind::U8,
            TypedBuffer::I16(_) => NumericKind::I16,
            TypedBuffer::U16(_) => NumericKind::U16,
            TypedBuffer::I32(_) => NumericKind::I32,
            TypedBuffer::U32(_) => NumericKind::U32,
            TypedBuffer::F32(_) => NumericKind::F32,
            TypedBuffer::F64(_) => NumericKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedBuffer::I8(v) => v.len(),
            TypedBuffer::U8(v) => v.len(),
            TypedBuffer::I16(v) => v.len(),
            TypedBuffer::U16(v) => v.len(),
            TypedBuffer::I32(v) => v.len(),
            TypedBuffer::U32(v) => v.len(),
            TypedBuffer::F32(v) => v.len(),
            TypedBuffer::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        match self {
            TypedBuffer::I8(v) => v.get(i).map(|&x| f64::from(x)),
            TypedBuffer::U8(v) => v.get(i).map(|&x| f64::from(x)),
            TypedBuffer::I16(v) => v.get(i).map(|&x| f64::from(x)),
            TypedBuffer::U16(v) => v.get(i).map(|&x| f64::from(x)),
            TypedBuffer::I32(v) => v.get(i).map(|&x| f64::from(x)),
            TypedBuffer::U32(v) => v.get(i).map(|&x| f64::from(x)),
            TypedBuffer::F32(v) => v.get(i).map(|&x| f64::from(x)),
            TypedBuffer::F64(v) => v.get(i).copied(),
        }
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    /// Raw little-endian view for zero-copy hand-off.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TypedBuffer::I8(v) => bytemuck::cast_slice(v),
            TypedBuffer::U8(v) => v,
            TypedBuffer::I16(v) => bytemuck::cast_slice(v),
            TypedBuffer::U16(v) => bytemuck::cast_slice(v),
            TypedBuffer::I32(v) => bytemuck::cast_slice(v),
            TypedBuffer::U32(v) => bytemuck::cast_slice(v),
            TypedBuffer::F32(v) => bytemuck::cast_slice(v),
            TypedBuffer::F64(v) => bytemuck::cast_slice(v),
        }
    }
}
