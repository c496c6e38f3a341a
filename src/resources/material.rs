//! Material definitions

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

use crate::gltf::document::{self, AlphaMode};
use crate::layout::UniformLayout;
use crate::pipeline::{BlendMode, CullMode, DepthTest, FixedFunctionState};
use crate::shader::ProgramId;

/// Uniform names the material writes into a program's uniform table
pub const BASE_COLOR_UNIFORM: &str = "base_color";
pub const METALLIC_ROUGHNESS_UNIFORM: &str = "metallic_roughness";
pub const EMISSIVE_UNIFORM: &str = "emissive";

/// Shading model, carrying only the parameters it needs
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    PbrMetallicRoughness {
        base_color: Vec4,
        metallic: f32,
        roughness: f32,
        emissive: Vec3,
    },
    Unlit {
        color: Vec4,
    },
}

impl Default for MaterialKind {
    fn default() -> Self {
        Self::PbrMetallicRoughness {
            base_color: Vec4::ONE,
            metallic: 1.0,
            roughness: 1.0,
            emissive: Vec3::ZERO,
        }
    }
}

/// A texture bound to a sampler uniform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    /// Sampler uniform name in the program
    pub sampler: String,
    /// Texture index in the scene
    pub texture: usize,
    /// Texture coordinate set
    pub tex_coord: u32,
}

/// Program, textures and parameters used to draw a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub program: ProgramId,
    pub kind: MaterialKind,
    pub textures: Vec<TextureRef>,
    pub blend: BlendMode,
    pub alpha_cutoff: Option<f32>,
    pub double_sided: bool,
}

impl Material {
    pub fn new(name: &str, program: ProgramId) -> Self {
        Self {
            name: name.to_string(),
            program,
            kind: MaterialKind::default(),
            textures: Vec::new(),
            blend: BlendMode::Opaque,
            alpha_cutoff: None,
            double_sided: false,
        }
    }

    pub fn with_kind(mut self, kind: MaterialKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_texture(mut self, sampler: &str, texture: usize) -> Self {
        self.textures.push(TextureRef {
            sampler: sampler.to_string(),
            texture,
            tex_coord: 0,
        });
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }

    pub fn unlit(name: &str, program: ProgramId, color: Vec4) -> Self {
        Self::new(name, program).with_kind(MaterialKind::Unlit { color })
    }

    /// Convert a glTF material; `base_color_sampler` names the sampler uniform
    /// its base color texture binds to.
    pub fn from_gltf(
        material: &document::Material,
        program: ProgramId,
        base_color_sampler: &str,
    ) -> Self {
        let pbr = material.pbr_metallic_roughness.clone().unwrap_or_default();
        let base_color = Vec4::from_array(pbr.base_color_factor);
        let kind = if material.is_unlit() {
            MaterialKind::Unlit { color: base_color }
        } else {
            MaterialKind::PbrMetallicRoughness {
                base_color,
                metallic: pbr.metallic_factor,
                roughness: pbr.roughness_factor,
                emissive: material.emissive_factor.map_or(Vec3::ZERO, Vec3::from_array),
            }
        };

        let mut textures = Vec::new();
        if let Some(info) = pbr.base_color_texture {
            textures.push(TextureRef {
                sampler: base_color_sampler.to_string(),
                texture: info.index,
                tex_coord: info.tex_coord,
            });
        }

        Self {
            name: material.name.clone().unwrap_or_else(|| "material".to_string()),
            program,
            kind,
            textures,
            blend: match material.alpha_mode {
                AlphaMode::Blend => BlendMode::Alpha,
                AlphaMode::Opaque | AlphaMode::Mask => BlendMode::Opaque,
            },
            alpha_cutoff: match material.alpha_mode {
                AlphaMode::Mask => Some(material.alpha_cutoff.unwrap_or(0.5)),
                _ => None,
            },
            double_sided: material.double_sided,
        }
    }

    /// Pipeline state implied by blending and sidedness
    pub fn fixed_function_state(&self) -> FixedFunctionState {
        let translucent = self.blend != BlendMode::Opaque;
        FixedFunctionState::default()
            .with_blend(self.blend)
            .with_depth(
                if translucent {
                    DepthTest::LessEqual
                } else {
                    DepthTest::Less
                },
                !translucent,
            )
            .with_cull(if self.double_sided {
                CullMode::None
            } else {
                CullMode::Back
            })
    }

    /// Create a uniform data struct for GPU
    pub fn uniform_data(&self) -> MaterialUniformData {
        match self.kind {
            MaterialKind::PbrMetallicRoughness {
                base_color,
                metallic,
                roughness,
                emissive,
            } => MaterialUniformData {
                base_color,
                metallic_roughness: [metallic, roughness, self.alpha_cutoff.unwrap_or(0.0), 0.0],
                emissive: emissive.extend(1.0),
            },
            MaterialKind::Unlit { color } => MaterialUniformData {
                base_color: color,
                metallic_roughness: [0.0, 1.0, self.alpha_cutoff.unwrap_or(0.0), 0.0],
                emissive: Vec4::ZERO,
            },
        }
    }

    /// Write parameters into the uniform entries the program declares.
    ///
    /// Returns the number of uniforms written.
    pub fn apply_uniforms(&self, uniforms: &UniformLayout, storage: &mut [f32]) -> usize {
        let data = self.uniform_data();
        let values: [(&str, &[f32]); 3] = [
            (BASE_COLOR_UNIFORM, bytemuck::cast_slice(std::slice::from_ref(&data.base_color))),
            (METALLIC_ROUGHNESS_UNIFORM, &data.metallic_roughness),
            (EMISSIVE_UNIFORM, bytemuck::cast_slice(std::slice::from_ref(&data.emissive))),
        ];
        values
            .iter()
            .filter(|(name, _)| uniforms.entry(name).is_some())
            .filter(|(name, values)| uniforms.write(storage, name, values).is_ok())
            .count()
    }
}

/// Material uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniformData {
    pub base_color: Vec4,
    pub metallic_roughness: [f32; 4], // x=metallic, y=roughness, z=alpha cutoff
    pub emissive: Vec4,
}
