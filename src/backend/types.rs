//! Descriptors and draw calls passed across the device boundary

use crate::backend::traits::{BufferHandle, PipelineHandle};
use crate::layout::LayoutId;
use crate::pipeline::FixedFunctionState;
use crate::resources::{DrawMode, IndexType};
use crate::shader::{DataType, ProgramId};

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

/// Buffer creation parameters
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub usage: BufferUsage,
    pub size: usize,
}

/// One attribute as the device sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeBinding {
    pub location: u32,
    pub slot: u32,
    pub offset: usize,
    pub data_type: DataType,
}

/// Stride of one vertex buffer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotBinding {
    pub slot: u32,
    pub stride: usize,
}

/// Everything an explicit backend needs to build a pipeline object
#[derive(Debug, Clone)]
pub struct PipelineDescriptor {
    pub program: ProgramId,
    pub label: String,
    pub layout: LayoutId,
    pub slots: Vec<SlotBinding>,
    pub attributes: Vec<AttributeBinding>,
    pub state: FixedFunctionState,
}

/// A vertex buffer bound to a slot for one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferBinding {
    pub slot: u32,
    pub buffer: BufferHandle,
    pub stride: usize,
}

/// Index buffer bound for one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBinding {
    pub buffer: BufferHandle,
    pub index_type: IndexType,
}

/// A single draw.
///
/// Explicit backends pass a pipeline handle and no attributes; bind-per-draw
/// backends pass no pipeline and re-specify every attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ProgramId,
    pub pipeline: Option<PipelineHandle>,
    pub state: FixedFunctionState,
    pub vertex_buffers: Vec<VertexBufferBinding>,
    pub attributes: Vec<AttributeBinding>,
    pub index: Option<IndexBinding>,
    pub mode: DrawMode,
    /// Vertices, or indices when `index` is set.
    pub count: usize,
}
