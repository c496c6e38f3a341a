//! Reflected shader variables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Base data type of a shader variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    /// Texture sampler. Occupies a texture unit, not buffer storage.
    Sampler2D,
}

impl DataType {
    /// Number of scalar components.
    pub fn components(&self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Sampler2D => 1,
            Self::Vec2 | Self::IVec2 => 2,
            Self::Vec3 | Self::IVec3 => 3,
            Self::Vec4 | Self::IVec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }

    /// Size in bytes of one element. Every component is 4 bytes wide.
    pub fn size(&self) -> usize {
        match self {
            Self::Sampler2D => 0,
            _ => self.components() * 4,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int | Self::IVec2 | Self::IVec3 | Self::IVec4)
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::Mat2 | Self::Mat3 | Self::Mat4)
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, Self::Sampler2D)
    }

    /// Float vector type with the given component count.
    pub fn float_vector(components: usize) -> Option<Self> {
        match components {
            1 => Some(Self::Float),
            2 => Some(Self::Vec2),
            3 => Some(Self::Vec3),
            4 => Some(Self::Vec4),
            _ => None,
        }
    }

    /// Integer vector type with the given component count.
    pub fn int_vector(components: usize) -> Option<Self> {
        match components {
            1 => Some(Self::Int),
            2 => Some(Self::IVec2),
            3 => Some(Self::IVec3),
            4 => Some(Self::IVec4),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Mat2 => "mat2",
            Self::Mat3 => "mat3",
            Self::Mat4 => "mat4",
            Self::Int => "int",
            Self::IVec2 => "ivec2",
            Self::IVec3 => "ivec3",
            Self::IVec4 => "ivec4",
            Self::Sampler2D => "sampler2D",
        };
        f.write_str(name)
    }
}

/// Whether a variable is fed per vertex or per draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableRole {
    Attribute,
    Uniform,
}

impl VariableRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::Uniform => "uniform",
        }
    }
}

/// A variable as reported by the backend for a linked program.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveVariable {
    pub name: String,
    pub role: VariableRole,
    pub data_type: DataType,
    /// Array length, 1 for non-arrays.
    pub array_size: usize,
    /// Backend location (attribute location or uniform binding).
    pub location: u32,
}

impl ActiveVariable {
    pub fn attribute(name: impl Into<String>, data_type: DataType, location: u32) -> Self {
        Self {
            name: name.into(),
            role: VariableRole::Attribute,
            data_type,
            array_size: 1,
            location,
        }
    }

    pub fn uniform(name: impl Into<String>, data_type: DataType, location: u32) -> Self {
        Self {
            name: name.into(),
            role: VariableRole::Uniform,
            data_type,
            array_size: 1,
            location,
        }
    }

    pub fn with_array_size(mut self, array_size: usize) -> Self {
        self.array_size = array_size.max(1);
        self
    }
}

/// Identity of a compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramId(pub u64);

/// A compiled and linked program together with its reflected variables.
///
/// This is the boundary to whatever compiled the shader; the registry never
/// looks at source text.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub id: ProgramId,
    pub name: String,
    pub active: Vec<ActiveVariable>,
}

impl CompiledProgram {
    pub fn new(id: ProgramId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: Vec::new(),
        }
    }

    pub fn with_variable(mut self, variable: ActiveVariable) -> Self {
        self.active.push(variable);
        self
    }
}

/// A reflected variable bound to its declared mapping.
///
/// Offsets are not stored here; they live in the [`BufferLayout`](crate::layout::BufferLayout)
/// computed from the registry, keyed by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderVariable {
    name: String,
    role: VariableRole,
    data_type: DataType,
    array_size: usize,
    slot: Option<u32>,
    location: u32,
    index: usize,
}

impl ShaderVariable {
    pub(crate) fn new(active: &ActiveVariable, slot: Option<u32>, index: usize) -> Self {
        Self {
            name: active.name.clone(),
            role: active.role,
            data_type: active.data_type,
            array_size: active.array_size,
            slot,
            location: active.location,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> VariableRole {
        self.role
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn array_size(&self) -> usize {
        self.array_size
    }

    /// Vertex buffer slot, `None` for uniforms.
    pub fn slot(&self) -> Option<u32> {
        self.slot
    }

    pub fn location(&self) -> u32 {
        self.location
    }

    /// Position in declaration order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total components including array length.
    pub fn components(&self) -> usize {
        self.data_type.components() * self.array_size
    }

    /// Total byte size including array length.
    pub fn size(&self) -> usize {
        self.data_type.size() * self.array_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DataType::Float, 1, 4)]
    #[case(DataType::Vec2, 2, 8)]
    #[case(DataType::Vec3, 3, 12)]
    #[case(DataType::Vec4, 4, 16)]
    #[case(DataType::Mat2, 4, 16)]
    #[case(DataType::Mat3, 9, 36)]
    #[case(DataType::Mat4, 16, 64)]
    #[case(DataType::IVec4, 4, 16)]
    #[case(DataType::Sampler2D, 1, 0)]
    fn test_data_type_sizes(#[case] ty: DataType, #[case] components: usize, #[case] size: usize) {
        assert_eq!(ty.components(), components);
        assert_eq!(ty.size(), size);
    }

    #[test]
    fn test_shader_variable_array_size() {
        let active = ActiveVariable::uniform("u_lights", DataType::Vec4, 0).with_array_size(8);
        let var = ShaderVariable::new(&active, None, 0);
        assert_eq!(var.components(), 32);
        assert_eq!(var.size(), 128);
    }

    #[test]
    fn test_data_type_from_json() {
        let types: Vec<DataType> = serde_json::from_str(r#"["Vec3", "Mat4", "Sampler2D"]"#).unwrap();
        assert_eq!(types, [DataType::Vec3, DataType::Mat4, DataType::Sampler2D]);
        let role: VariableRole = serde_json::from_str(r#""Attribute""#).unwrap();
        assert_eq!(role, VariableRole::Attribute);
    }
}
