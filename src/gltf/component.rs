//! Accessor component and element types.

use std::fmt;

/// Numeric type of one accessor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl ComponentType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            5120 => Some(Self::Byte),
            5121 => Some(Self::UnsignedByte),
            5122 => Some(Self::Short),
            5123 => Some(Self::UnsignedShort),
            5125 => Some(Self::UnsignedInt),
            5126 => Some(Self::Float),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Byte => 5120,
            Self::UnsignedByte => 5121,
            Self::Short => 5122,
            Self::UnsignedShort => 5123,
            Self::UnsignedInt => 5125,
            Self::Float => 5126,
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::UnsignedInt | Self::Float => 4,
        }
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            Self::UnsignedByte | Self::UnsignedShort | Self::UnsignedInt
        )
    }

    /// Decode one little-endian component.
    pub(crate) fn decode(&self, bytes: &[u8]) -> f64 {
        match self {
            Self::Byte => bytes[0] as i8 as f64,
            Self::UnsignedByte => bytes[0] as f64,
            Self::Short => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::UnsignedShort => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::UnsignedInt => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            Self::Float => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        }
    }

    /// Map a raw integer to `[0, 1]` or `[-1, 1]`.
    pub(crate) fn normalize(&self, raw: f64) -> f64 {
        match self {
            Self::Byte => (raw / 127.0).max(-1.0),
            Self::UnsignedByte => raw / 255.0,
            Self::Short => (raw / 32767.0).max(-1.0),
            Self::UnsignedShort => raw / 65535.0,
            Self::UnsignedInt => raw / u32::MAX as f64,
            Self::Float => raw,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Byte => "BYTE",
            Self::UnsignedByte => "UNSIGNED_BYTE",
            Self::Short => "SHORT",
            Self::UnsignedShort => "UNSIGNED_SHORT",
            Self::UnsignedInt => "UNSIGNED_INT",
            Self::Float => "FLOAT",
        };
        f.write_str(name)
    }
}

/// Shape of one accessor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT2" => Some(Self::Mat2),
            "MAT3" => Some(Self::Mat3),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    pub fn components(&self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }

    /// Rows per column of a matrix type.
    pub fn rows(&self) -> Option<usize> {
        match self {
            Self::Mat2 => Some(2),
            Self::Mat3 => Some(3),
            Self::Mat4 => Some(4),
            _ => None,
        }
    }

    /// Bytes per matrix column. Columns start on 4-byte boundaries.
    fn column_stride(&self, component_size: usize) -> Option<usize> {
        self.rows().map(|rows| (rows * component_size + 3) / 4 * 4)
    }

    /// Bytes one element occupies, including matrix column padding.
    pub fn element_size(&self, component_size: usize) -> usize {
        match (self.rows(), self.column_stride(component_size)) {
            (Some(rows), Some(column)) => rows * column,
            _ => self.components() * component_size,
        }
    }

    /// Byte offset of component `c` within one element.
    pub fn component_offset(&self, c: usize, component_size: usize) -> usize {
        match (self.rows(), self.column_stride(component_size)) {
            (Some(rows), Some(column)) => (c / rows) * column + (c % rows) * component_size,
            _ => c * component_size,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
            Self::Vec4 => "VEC4",
            Self::Mat2 => "MAT2",
            Self::Mat3 => "MAT3",
            Self::Mat4 => "MAT4",
        }
    }
}

/// GPU usage hint of a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// `ARRAY_BUFFER` (34962).
    Vertex,
    /// `ELEMENT_ARRAY_BUFFER` (34963).
    Index,
}

impl Target {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            34962 => Some(Self::Vertex),
            34963 => Some(Self::Index),
            _ => None,
        }
    }
}
