//! Turning document meshes and materials into assembly jobs.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::FormatError;
use crate::layout::BufferLayout;
use crate::resources::{AttributeSource, DrawMode, IndexSource, Material, MeshJob, VertexSource};
use crate::shader::ProgramId;

use super::document::Document;
use super::resolver::SceneBinaryResolver;

const POSITION: &str = "POSITION";

/// glTF attribute semantic to shader variable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticMap {
    entries: BTreeMap<String, String>,
}

impl Default for SemanticMap {
    fn default() -> Self {
        Self::empty()
            .with("POSITION", "a_position")
            .with("NORMAL", "a_normal")
            .with("TANGENT", "a_tangent")
            .with("TEXCOORD_0", "a_uv0")
            .with("TEXCOORD_1", "a_uv1")
            .with("COLOR_0", "a_color")
            .with("JOINTS_0", "a_joints")
            .with("WEIGHTS_0", "a_weights")
    }
}

impl SemanticMap {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Map `semantic` to `variable`, replacing any previous mapping.
    pub fn with(mut self, semantic: &str, variable: &str) -> Self {
        self.entries.insert(semantic.to_string(), variable.to_string());
        self
    }

    pub fn get(&self, semantic: &str) -> Option<&str> {
        self.entries.get(semantic).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, v)| (s.as_str(), v.as_str()))
    }
}

/// Convert every document material for `program`.
pub fn import_materials(
    document: &Document,
    program: ProgramId,
    base_color_sampler: &str,
) -> Vec<Arc<Material>> {
    document
        .materials
        .iter()
        .map(|m| Arc::new(Material::from_gltf(m, program, base_color_sampler)))
        .collect()
}

/// One job per primitive of every mesh in the document.
///
/// Only attributes that `semantics` maps to an entry of `layout` are fed;
/// `POSITION` is always kept for bounds. Primitives without a material use
/// `fallback`.
pub fn import_meshes<'a>(
    resolver: SceneBinaryResolver<'a>,
    semantics: &SemanticMap,
    layout: &Arc<BufferLayout>,
    materials: &[Arc<Material>],
    fallback: &Arc<Material>,
) -> Result<Vec<MeshJob<'a>>, FormatError> {
    let document = resolver.document();
    let mut jobs = Vec::new();

    for (mesh_index, mesh) in document.meshes.iter().enumerate() {
        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            let mode = DrawMode::from_gltf(primitive.mode)?;

            let mut vertices = VertexSource::new();
            for (semantic, &accessor) in &primitive.attributes {
                let semantic = semantic.as_str();
                let name = semantics.get(semantic).unwrap_or(semantic);
                let fed = layout.entry(name).is_some();
                if !fed && semantic != POSITION {
                    log::debug!(
                        "Mesh {} primitive {}: '{}' not in layout, skipped",
                        mesh_index,
                        primitive_index,
                        semantic
                    );
                    continue;
                }
                let source = AttributeSource::Accessor(resolver.resolve(accessor)?);
                vertices = if semantic == POSITION {
                    vertices.with_position(name, source)
                } else {
                    vertices.with(name, source)
                };
            }

            let indices = match primitive.indices {
                Some(index) => Some(IndexSource::Accessor(resolver.resolve(index)?)),
                None => None,
            };

            let material = match primitive.material {
                Some(index) => materials
                    .get(index)
                    .cloned()
                    .ok_or(FormatError::MissingReference {
                        kind: "material",
                        index,
                    })?,
                None => fallback.clone(),
            };

            let base = mesh
                .name
                .clone()
                .unwrap_or_else(|| format!("mesh{mesh_index}"));
            let name = if mesh.primitives.len() > 1 {
                format!("{base}#{primitive_index}")
            } else {
                base
            };

            jobs.push(MeshJob {
                name,
                layout: layout.clone(),
                vertices,
                indices,
                material,
                mode,
            });
        }
    }

    log::info!("Imported {} primitives from {} meshes", jobs.len(), document.meshes.len());
    Ok(jobs)
}
