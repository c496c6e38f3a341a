//! Assembled meshes and their GPU counterparts

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::backend::{
    BackendResult, BufferDescriptor, BufferHandle, BufferUsage, GpuDevice, IndexBinding,
    VertexBufferBinding,
};
use crate::error::FormatError;
use crate::gltf::ComponentType;
use crate::layout::LayoutId;
use crate::resources::Material;

/// Primitive assembly mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl DrawMode {
    /// Map a glTF primitive `mode`.
    pub fn from_gltf(mode: u32) -> Result<Self, FormatError> {
        match mode {
            0 => Ok(Self::Points),
            1 => Ok(Self::Lines),
            2 => Ok(Self::LineLoop),
            3 => Ok(Self::LineStrip),
            4 => Ok(Self::Triangles),
            5 => Ok(Self::TriangleStrip),
            6 => Ok(Self::TriangleFan),
            other => Err(FormatError::UnsupportedDrawMode(other)),
        }
    }

    /// Number of primitives drawn from `count` vertices or indices.
    pub fn primitive_count(&self, count: usize) -> usize {
        match self {
            Self::Points => count,
            Self::Lines => count / 2,
            Self::LineLoop => {
                if count < 2 {
                    0
                } else {
                    count
                }
            }
            Self::LineStrip => count.saturating_sub(1),
            Self::Triangles => count / 3,
            Self::TriangleStrip | Self::TriangleFan => count.saturating_sub(2),
        }
    }
}

/// Element buffer index width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexType {
    #[default]
    U8,
    U16,
    U32,
}

impl IndexType {
    pub fn size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Narrowest type able to address `vertex_count` vertices.
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count <= 1 << 8 {
            Self::U8
        } else if vertex_count <= 1 << 16 {
            Self::U16
        } else {
            Self::U32
        }
    }

    pub fn from_component(component: ComponentType) -> Option<Self> {
        match component {
            ComponentType::UnsignedByte => Some(Self::U8),
            ComponentType::UnsignedShort => Some(Self::U16),
            ComponentType::UnsignedInt => Some(Self::U32),
            _ => None,
        }
    }

    pub(crate) fn encode(&self, index: u32, out: &mut Vec<u8>) {
        match self {
            Self::U8 => out.push(index as u8),
            Self::U16 => out.extend_from_slice(&(index as u16).to_le_bytes()),
            Self::U32 => out.extend_from_slice(&index.to_le_bytes()),
        }
    }
}

/// Interleaved vertex data for one slot
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer {
    pub slot: u32,
    pub stride: usize,
    pub data: Vec<u8>,
}

/// Packed index data
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBuffer {
    pub index_type: IndexType,
    pub count: usize,
    pub data: Vec<u8>,
}

impl ElementBuffer {
    pub fn get(&self, i: usize) -> Option<u32> {
        let size = self.index_type.size();
        let bytes = self.data.get(i * size..(i + 1) * size)?;
        Some(match self.index_type {
            IndexType::U8 => bytes[0] as u32,
            IndexType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
            IndexType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.count).filter_map(move |i| self.get(i))
    }
}

/// Axis-aligned bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(
            Self {
                min: first,
                max: first,
            },
            |b, p| Self {
                min: b.min.min(p),
                max: b.max.max(p),
            },
        ))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// A renderable unit: vertex buffers per slot, optional indices, a material
/// and a draw mode
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub(crate) vertex_buffers: Vec<VertexBuffer>,
    pub(crate) element_buffer: Option<ElementBuffer>,
    pub(crate) material: Arc<Material>,
    pub(crate) mode: DrawMode,
    pub(crate) vertex_count: usize,
    pub(crate) layout: LayoutId,
    pub(crate) bounds: Option<Bounds>,
}

impl Mesh {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.element_buffer.as_ref().map_or(0, |e| e.count)
    }

    /// Elements submitted per draw: indices if present, else vertices
    pub fn draw_count(&self) -> usize {
        self.element_buffer
            .as_ref()
            .map_or(self.vertex_count, |e| e.count)
    }

    pub fn primitive_count(&self) -> usize {
        self.mode.primitive_count(self.draw_count())
    }

    pub fn vertex_buffers(&self) -> &[VertexBuffer] {
        &self.vertex_buffers
    }

    pub fn vertex_buffer(&self, slot: u32) -> Option<&VertexBuffer> {
        self.vertex_buffers.iter().find(|b| b.slot == slot)
    }

    pub fn element_buffer(&self) -> Option<&ElementBuffer> {
        self.element_buffer.as_ref()
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn layout_id(&self) -> LayoutId {
        self.layout
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Create device buffers for every slot and the element buffer.
    ///
    /// Must run on the thread that owns `device`. Buffers created before a
    /// failure are destroyed again.
    pub fn upload(&self, device: &dyn GpuDevice) -> BackendResult<GpuMesh> {
        let mut gpu = GpuMesh {
            name: self.name.clone(),
            layout: self.layout,
            mode: self.mode,
            count: self.draw_count(),
            vertex_buffers: Vec::with_capacity(self.vertex_buffers.len()),
            index: None,
            released: false,
        };

        for buffer in &self.vertex_buffers {
            let descriptor = BufferDescriptor {
                label: Some(format!("{} slot {}", self.name, buffer.slot)),
                usage: BufferUsage::Vertex,
                size: buffer.data.len(),
            };
            match device.create_buffer(&descriptor, &buffer.data) {
                Ok(handle) => gpu.vertex_buffers.push(VertexBufferBinding {
                    slot: buffer.slot,
                    buffer: handle,
                    stride: buffer.stride,
                }),
                Err(e) => {
                    gpu.release(device);
                    return Err(e);
                }
            }
        }

        if let Some(elements) = &self.element_buffer {
            let descriptor = BufferDescriptor {
                label: Some(format!("{} indices", self.name)),
                usage: BufferUsage::Index,
                size: elements.data.len(),
            };
            match device.create_buffer(&descriptor, &elements.data) {
                Ok(handle) => {
                    gpu.index = Some(IndexBinding {
                        buffer: handle,
                        index_type: elements.index_type,
                    })
                }
                Err(e) => {
                    gpu.release(device);
                    return Err(e);
                }
            }
        }

        log::debug!(
            "Uploaded mesh '{}' ({} vertex buffers, {} indices)",
            self.name,
            gpu.vertex_buffers.len(),
            self.index_count()
        );
        Ok(gpu)
    }
}

/// Device buffers of an uploaded mesh.
///
/// Released exactly once through [`GpuMesh::release`], which consumes it.
#[derive(Debug)]
pub struct GpuMesh {
    name: String,
    layout: LayoutId,
    mode: DrawMode,
    count: usize,
    vertex_buffers: Vec<VertexBufferBinding>,
    index: Option<IndexBinding>,
    released: bool,
}

impl GpuMesh {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout_id(&self) -> LayoutId {
        self.layout
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn vertex_buffers(&self) -> &[VertexBufferBinding] {
        &self.vertex_buffers
    }

    pub fn index(&self) -> Option<IndexBinding> {
        self.index
    }

    pub fn buffer_handles(&self) -> impl Iterator<Item = BufferHandle> + '_ {
        self.vertex_buffers
            .iter()
            .map(|b| b.buffer)
            .chain(self.index.map(|i| i.buffer))
    }

    /// Destroy every device buffer.
    pub fn release(mut self, device: &dyn GpuDevice) {
        for handle in self.buffer_handles() {
            device.destroy_buffer(handle);
        }
        self.released = true;
    }
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        if !self.released {
            log::warn!(
                "GpuMesh '{}' dropped without release; {} device buffers leaked",
                self.name,
                self.buffer_handles().count()
            );
        }
    }
}
