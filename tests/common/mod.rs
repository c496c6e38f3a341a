//! Shared fixtures for integration tests.
//!
//! Scenes are written as glTF JSON with the binary payload inlined as a
//! base64 data URI, so every test is self-contained.

#![allow(dead_code)]

use base64::Engine;
use serde_json::{json, Value};

use graphics_layout::shader::{ActiveVariable, CompiledProgram, DataType, ProgramId};
use graphics_layout::{MappingSet, VariableMapping, VariableRegistry};

pub const FLOAT: u32 = 5126;
pub const UNSIGNED_SHORT: u32 = 5123;
pub const VERTEX_TARGET: u32 = 34962;
pub const INDEX_TARGET: u32 = 34963;

pub const LIT_PROGRAM: ProgramId = ProgramId(1);

/// Install a test logger once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Incrementally built glTF document with a single embedded buffer.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    bytes: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
    meshes: Vec<Value>,
    nodes: Vec<Value>,
    materials: Vec<Value>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `data` as a new buffer view, 4-byte aligned.
    pub fn view(&mut self, data: &[u8], stride: Option<usize>, target: u32) -> usize {
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.bytes.len(),
            "byteLength": data.len(),
            "target": target,
        });
        if let Some(stride) = stride {
            view["byteStride"] = json!(stride);
        }
        self.bytes.extend_from_slice(data);
        self.views.push(view);
        self.views.len() - 1
    }

    /// View with an explicit byte length, for malformed-range cases.
    pub fn raw_view(&mut self, offset: usize, length: usize) -> usize {
        self.views.push(json!({ "buffer": 0, "byteOffset": offset, "byteLength": length }));
        self.views.len() - 1
    }

    pub fn accessor(
        &mut self,
        view: usize,
        offset: usize,
        component_type: u32,
        element_type: &str,
        count: usize,
    ) -> usize {
        self.accessors.push(json!({
            "bufferView": view,
            "byteOffset": offset,
            "componentType": component_type,
            "type": element_type,
            "count": count,
        }));
        self.accessors.len() - 1
    }

    pub fn floats(&mut self, values: &[f32], element_type: &str, components: usize) -> usize {
        let view = self.view(bytemuck::cast_slice(values), None, VERTEX_TARGET);
        self.accessor(view, 0, FLOAT, element_type, values.len() / components)
    }

    pub fn u16_indices(&mut self, indices: &[u16]) -> usize {
        let view = self.view(bytemuck::cast_slice(indices), None, INDEX_TARGET);
        self.accessor(view, 0, UNSIGNED_SHORT, "SCALAR", indices.len())
    }

    pub fn material(&mut self, material: Value) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn mesh(&mut self, name: &str, attributes: Value, indices: Option<usize>, material: Option<usize>) -> usize {
        let mut primitive = json!({ "attributes": attributes });
        if let Some(indices) = indices {
            primitive["indices"] = json!(indices);
        }
        if let Some(material) = material {
            primitive["material"] = json!(material);
        }
        self.meshes.push(json!({ "name": name, "primitives": [primitive] }));
        self.meshes.len() - 1
    }

    pub fn node(&mut self, node: Value) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Serialize to `.gltf` JSON bytes. Every node without a parent is a scene root.
    pub fn build(&self) -> Vec<u8> {
        let children: Vec<u64> = self
            .nodes
            .iter()
            .filter_map(|n| n.get("children").and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_u64)
            .collect();
        let roots: Vec<usize> = (0..self.nodes.len())
            .filter(|i| !children.contains(&(*i as u64)))
            .collect();

        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        );
        let document = json!({
            "asset": { "version": "2.0", "generator": "graphics-layout tests" },
            "buffers": [{ "byteLength": self.bytes.len(), "uri": uri }],
            "bufferViews": self.views,
            "accessors": self.accessors,
            "materials": self.materials,
            "meshes": self.meshes,
            "nodes": self.nodes,
            "scenes": [{ "nodes": roots }],
            "scene": 0,
        });
        serde_json::to_vec(&document).unwrap()
    }
}

/// Program with position, normal and uv in slot 0, plus a small uniform table.
pub fn lit_program() -> CompiledProgram {
    CompiledProgram::new(LIT_PROGRAM, "lit")
        .with_variable(ActiveVariable::uniform("u_mvp", DataType::Mat4, 0))
        .with_variable(ActiveVariable::attribute("a_uv0", DataType::Vec2, 2))
        .with_variable(ActiveVariable::attribute("a_normal", DataType::Vec3, 1))
        .with_variable(ActiveVariable::attribute("a_position", DataType::Vec3, 0))
        .with_variable(ActiveVariable::uniform("base_color", DataType::Vec4, 1))
        .with_variable(ActiveVariable::uniform("u_albedo", DataType::Sampler2D, 2))
}

pub fn lit_mappings() -> Vec<VariableMapping> {
    vec![
        VariableMapping::attribute("a_position", 0),
        VariableMapping::attribute("a_normal", 0),
        VariableMapping::attribute("a_uv0", 0),
        VariableMapping::uniform("u_mvp"),
        VariableMapping::uniform("base_color"),
        VariableMapping::uniform("u_albedo"),
    ]
}

pub fn lit_registry() -> VariableRegistry {
    let mappings = MappingSet::new(lit_mappings()).unwrap();
    VariableRegistry::reflect(&lit_program(), &mappings).unwrap()
}
