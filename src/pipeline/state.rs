//! Fixed-function state and compiled pipeline state.

use serde::{Deserialize, Serialize};

use crate::backend::{AttributeBinding, PipelineHandle, SlotBinding};
use crate::layout::{LayoutId, UniformLayout};
use crate::shader::ProgramId;

/// Color blending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Opaque,
    /// Source-alpha, one-minus-source-alpha.
    Alpha,
    Additive,
}

/// Depth comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthTest {
    Disabled,
    #[default]
    Less,
    LessEqual,
    Always,
}

/// Face culling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

/// Blend, depth and cull state baked into a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedFunctionState {
    pub blend: BlendMode,
    pub depth_test: DepthTest,
    pub depth_write: bool,
    pub cull: CullMode,
}

impl Default for FixedFunctionState {
    fn default() -> Self {
        Self {
            blend: BlendMode::Opaque,
            depth_test: DepthTest::Less,
            depth_write: true,
            cull: CullMode::Back,
        }
    }
}

impl FixedFunctionState {
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_depth(mut self, test: DepthTest, write: bool) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self
    }

    pub fn with_cull(mut self, cull: CullMode) -> Self {
        self.cull = cull;
        self
    }
}

/// Cache key: identical combinations share one compiled pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: ProgramId,
    pub layout: LayoutId,
    pub state: FixedFunctionState,
}

/// A compiled pipeline. Immutable once created; shared read-only via `Arc`.
#[derive(Debug)]
pub struct PipelineState {
    pub(crate) key: PipelineKey,
    pub(crate) program_name: String,
    /// Device object, present only for explicit-pipeline backends.
    pub(crate) handle: Option<PipelineHandle>,
    pub(crate) slots: Vec<SlotBinding>,
    pub(crate) attributes: Vec<AttributeBinding>,
    pub(crate) uniforms: UniformLayout,
}

impl PipelineState {
    pub fn key(&self) -> PipelineKey {
        self.key
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn handle(&self) -> Option<PipelineHandle> {
        self.handle
    }

    /// Attribute locations resolved at compile time.
    pub fn attributes(&self) -> &[AttributeBinding] {
        &self.attributes
    }

    pub fn slots(&self) -> &[SlotBinding] {
        &self.slots
    }

    pub fn uniforms(&self) -> &UniformLayout {
        &self.uniforms
    }
}
