//! Graphics Layout - shader variable reflection and vertex buffer layout
//!
//! Turns a compiled program's active variables and a glTF scene into
//! correctly strided vertex and element buffers, and binds them to one of two
//! backend styles:
//! - **Bind-per-draw**: attribute locations resolved once, re-bound on every draw
//! - **Explicit pipeline**: immutable pipeline objects created at compile time
//!
//! # Flow
//! 1. [`VariableRegistry::reflect`] orders active variables by the author's mappings
//! 2. [`compute_layout`] derives slot strides, attribute offsets and a uniform table
//! 3. [`SceneBinaryResolver`] validates glTF accessors into typed views
//! 4. [`MeshAssembler`] interleaves accessors or procedural arrays into slot buffers
//! 5. A [`PipelineCompiler`] from [`compiler_for`] binds layouts to the device
//!
//! Steps 1 to 4 are pure CPU work and may run on worker threads. Only step 5
//! and mesh upload touch the [`GpuDevice`].

pub mod backend;
pub mod error;
pub mod gltf;
pub mod layout;
pub mod pipeline;
pub mod resources;
pub mod shader;

use serde::{Deserialize, Serialize};

pub use backend::{DummyDevice, GpuDevice};
pub use error::{ConsistencyError, Error, FormatError, LayoutError, PipelineError, Result};
pub use gltf::{AccessorView, GltfAsset, SceneBinaryResolver, SemanticMap};
pub use layout::{compute_layout, BufferLayout, LayoutOptions, DEFAULT_MAX_UNIFORM_BYTES};
pub use pipeline::{compiler_for, BackendKind, FixedFunctionState, PipelineCompiler, PipelineState};
pub use resources::{GpuMesh, IndexType, Material, Mesh, MeshAssembler};
pub use shader::{CompiledProgram, MappingSet, VariableMapping, VariableRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration passed explicitly by the render loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Which backend style to compile for
    pub backend: BackendKind,
    /// Maximum size of the uniform float buffer, in bytes
    pub max_uniform_bytes: usize,
    /// Narrowest index type element buffers may use
    pub min_index_type: IndexType,
    /// Assemble meshes on the rayon pool
    pub parallel_assembly: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::BindPerDraw,
            max_uniform_bytes: DEFAULT_MAX_UNIFORM_BYTES,
            min_index_type: IndexType::U8,
            parallel_assembly: true,
        }
    }
}

impl RenderConfig {
    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions::new().with_max_uniform_bytes(self.max_uniform_bytes)
    }

    pub fn assembler(&self) -> MeshAssembler {
        MeshAssembler::new()
            .with_min_index_type(self.min_index_type)
            .with_parallel(self.parallel_assembly)
    }

    pub fn compiler(&self) -> Box<dyn PipelineCompiler> {
        compiler_for(self.backend)
    }
}
