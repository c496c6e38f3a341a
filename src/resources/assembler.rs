//! Mesh assembly: interleaving attribute sources into slot buffers
//!
//! Assembly is pure CPU work. [`MeshAssembler::build_all`] spreads jobs over
//! the rayon pool and returns once every job is done, so its result can be
//! handed straight to the thread that owns the device.

use std::sync::Arc;

use glam::Vec3;
use rayon::prelude::*;

use crate::error::{ConsistencyError, Result};
use crate::gltf::AccessorView;
use crate::layout::{AttributeEntry, BufferLayout, SlotLayout};
use crate::resources::{Bounds, DrawMode, ElementBuffer, IndexType, Material, Mesh, VertexBuffer};

/// Values used for components a source does not provide.
const PADDING: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Where one attribute's values come from
#[derive(Debug, Clone, Copy)]
pub enum AttributeSource<'a> {
    /// A resolved scene accessor
    Accessor(AccessorView<'a>),
    /// A raw float array. `stride` and `offset` are counted in floats.
    Floats {
        values: &'a [f32],
        components: usize,
        stride: usize,
        offset: usize,
    },
}

impl<'a> AttributeSource<'a> {
    /// Tightly packed floats, `components` per vertex.
    pub fn floats(values: &'a [f32], components: usize) -> Self {
        Self::Floats {
            values,
            components,
            stride: components,
            offset: 0,
        }
    }

    /// One attribute out of an interleaved float array.
    pub fn interleaved(values: &'a [f32], components: usize, stride: usize, offset: usize) -> Self {
        Self::Floats {
            values,
            components,
            stride,
            offset,
        }
    }

    pub fn components(&self) -> usize {
        match self {
            Self::Accessor(view) => view.components(),
            Self::Floats { components, .. } => *components,
        }
    }

    /// Number of vertices this source provides.
    pub fn count(&self, attribute: &str) -> std::result::Result<usize, ConsistencyError> {
        match *self {
            Self::Accessor(view) => Ok(view.count()),
            Self::Floats {
                values,
                components,
                stride,
                offset,
            } => {
                if stride == 0 || offset + components > stride || values.len() % stride != 0 {
                    return Err(ConsistencyError::RaggedSource {
                        attribute: attribute.to_string(),
                        len: values.len(),
                        components: stride.max(components),
                    });
                }
                Ok(values.len() / stride)
            }
        }
    }

    /// Read vertex `i` into `out`, returning the number of components written.
    fn read(&self, i: usize, out: &mut [f32]) -> Result<usize> {
        match *self {
            Self::Accessor(view) => Ok(view.read_into(i, out)?),
            Self::Floats {
                values,
                components,
                stride,
                offset,
            } => {
                let start = i * stride + offset;
                let n = components.min(out.len());
                out[..n].copy_from_slice(&values[start..start + n]);
                Ok(n)
            }
        }
    }

    fn overflow(&self, attribute: &str, capacity: usize) -> crate::error::Error {
        match self {
            Self::Accessor(view) => view.component_mismatch(capacity).into(),
            Self::Floats { components, .. } => ConsistencyError::ComponentOverflow {
                attribute: attribute.to_string(),
                components: *components,
                capacity,
            }
            .into(),
        }
    }
}

/// Named attribute sources for one mesh
#[derive(Debug, Clone, Default)]
pub struct VertexSource<'a> {
    pub attributes: Vec<(String, AttributeSource<'a>)>,
    /// Attribute used to compute bounds
    pub position: Option<String>,
}

impl<'a> VertexSource<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: AttributeSource<'a>) -> Self {
        self.attributes.push((name.into(), source));
        self
    }

    /// Add a source and use it for bounds.
    pub fn with_position(mut self, name: impl Into<String>, source: AttributeSource<'a>) -> Self {
        let name = name.into();
        self.position = Some(name.clone());
        self.attributes.push((name, source));
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSource<'a>> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, source)| source)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Where indices come from
#[derive(Debug, Clone, Copy)]
pub enum IndexSource<'a> {
    Accessor(AccessorView<'a>),
    Values(&'a [u32]),
}

/// Everything needed to assemble one mesh
#[derive(Debug, Clone)]
pub struct MeshJob<'a> {
    pub name: String,
    pub layout: Arc<BufferLayout>,
    pub vertices: VertexSource<'a>,
    pub indices: Option<IndexSource<'a>>,
    pub material: Arc<Material>,
    pub mode: DrawMode,
}

/// Builds [`Mesh`]es from attribute sources and a computed layout
#[derive(Debug, Clone, Copy)]
pub struct MeshAssembler {
    /// Narrowest index type the element buffer may use
    pub min_index_type: IndexType,
    /// Spread [`MeshAssembler::build_all`] over the rayon pool
    pub parallel: bool,
}

impl Default for MeshAssembler {
    fn default() -> Self {
        Self {
            min_index_type: IndexType::U8,
            parallel: true,
        }
    }
}

impl MeshAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_index_type(mut self, index_type: IndexType) -> Self {
        self.min_index_type = index_type;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Assemble one mesh.
    ///
    /// Every source feeding the layout must report the same vertex count.
    /// Layout attributes without a source are left zeroed; sources the layout
    /// has no entry for are ignored.
    pub fn build(
        &self,
        layout: &BufferLayout,
        vertices: &VertexSource<'_>,
        indices: Option<IndexSource<'_>>,
        material: Arc<Material>,
        mode: DrawMode,
    ) -> Result<Mesh> {
        for (name, _) in &vertices.attributes {
            if layout.entry(name).is_none() {
                log::debug!("Source '{}' has no layout entry, ignored", name);
            }
        }

        let vertex_count = self.vertex_count(layout, vertices)?;

        let mut vertex_buffers = Vec::with_capacity(layout.slots().len());
        for slot in layout.slots() {
            vertex_buffers.push(fill_slot(slot, vertices, vertex_count)?);
        }

        let element_buffer = match indices {
            Some(source) => Some(self.build_indices(source, vertex_count)?),
            None => None,
        };

        let bounds = match vertices.position.as_deref() {
            Some(name) => match vertices.get(name) {
                Some(source) => bounds_of(source, vertex_count)?,
                None => None,
            },
            None => None,
        };

        log::debug!(
            "Assembled mesh: {} vertices over {} slots, {} indices",
            vertex_count,
            vertex_buffers.len(),
            element_buffer.as_ref().map_or(0, |e| e.count)
        );

        Ok(Mesh {
            name: String::new(),
            vertex_buffers,
            element_buffer,
            material,
            mode,
            vertex_count,
            layout: layout.id(),
            bounds,
        })
    }

    /// Assemble a single job.
    pub fn build_job(&self, job: MeshJob<'_>) -> Result<Mesh> {
        let mesh = self.build(
            &job.layout,
            &job.vertices,
            job.indices,
            job.material,
            job.mode,
        )?;
        Ok(mesh.with_name(job.name))
    }

    /// Assemble every job, in parallel unless disabled.
    ///
    /// Returns after all jobs have finished; the first failure is returned.
    pub fn build_all(&self, jobs: Vec<MeshJob<'_>>) -> Result<Vec<Mesh>> {
        if self.parallel {
            jobs.into_par_iter().map(|job| self.build_job(job)).collect()
        } else {
            jobs.into_iter().map(|job| self.build_job(job)).collect()
        }
    }

    /// Check per-slot then cross-slot agreement and return the shared count.
    fn vertex_count(&self, layout: &BufferLayout, vertices: &VertexSource<'_>) -> Result<usize> {
        let mut mesh_count: Option<(u32, usize)> = None;
        for slot in layout.slots() {
            let mut slot_count: Option<usize> = None;
            for entry in &slot.attributes {
                let Some(source) = vertices.get(&entry.name) else {
                    continue;
                };
                if source.components() > entry.components {
                    return Err(source.overflow(&entry.name, entry.components));
                }
                let count = source.count(&entry.name)?;
                match slot_count {
                    None => slot_count = Some(count),
                    Some(expected) if expected != count => {
                        return Err(ConsistencyError::VertexCountMismatch {
                            slot: slot.slot,
                            attribute: entry.name.clone(),
                            expected,
                            found: count,
                        }
                        .into());
                    }
                    Some(_) => {}
                }
            }

            let (Some(count), Some(first)) = (slot_count, slot.attributes.first()) else {
                continue;
            };
            match mesh_count {
                None => mesh_count = Some((slot.slot, count)),
                Some((_, expected)) if expected != count => {
                    return Err(ConsistencyError::VertexCountMismatch {
                        slot: slot.slot,
                        attribute: first.name.clone(),
                        expected,
                        found: count,
                    }
                    .into());
                }
                Some(_) => {}
            }
        }

        // A bounds-only position source still has to cover every vertex.
        let position = vertices
            .position
            .as_deref()
            .filter(|name| layout.entry(name).is_none())
            .and_then(|name| vertices.get(name).map(|source| (name, source)));
        if let Some((name, source)) = position {
            let count = source.count(name)?;
            match mesh_count {
                None => return Ok(count),
                Some((slot, expected)) if expected != count => {
                    return Err(ConsistencyError::VertexCountMismatch {
                        slot,
                        attribute: name.to_string(),
                        expected,
                        found: count,
                    }
                    .into());
                }
                Some(_) => {}
            }
        }
        Ok(mesh_count.map_or(0, |(_, count)| count))
    }

    fn build_indices(&self, source: IndexSource<'_>, vertex_count: usize) -> Result<ElementBuffer> {
        match source {
            IndexSource::Values(values) => {
                let index_type = IndexType::for_vertex_count(vertex_count).max(self.min_index_type);
                let mut data = Vec::with_capacity(values.len() * index_type.size());
                for (position, &index) in values.iter().enumerate() {
                    if index as usize >= vertex_count {
                        return Err(ConsistencyError::IndexOutOfRange {
                            accessor: None,
                            position,
                            index,
                            vertex_count,
                        }
                        .into());
                    }
                    index_type.encode(index, &mut data);
                }
                Ok(ElementBuffer {
                    index_type,
                    count: values.len(),
                    data,
                })
            }
            IndexSource::Accessor(view) => {
                let decoded = view.indices(vertex_count)?;
                let index_type = IndexType::from_component(view.component_type())
                    .unwrap_or(IndexType::U32)
                    .max(self.min_index_type);
                let mut data = Vec::with_capacity(view.count() * index_type.size());
                for index in decoded {
                    index_type.encode(index?, &mut data);
                }
                Ok(ElementBuffer {
                    index_type,
                    count: view.count(),
                    data,
                })
            }
        }
    }
}

fn fill_slot(slot: &SlotLayout, vertices: &VertexSource<'_>, vertex_count: usize) -> Result<VertexBuffer> {
    let mut data = slot.allocate(vertex_count);
    for entry in &slot.attributes {
        match vertices.get(&entry.name) {
            Some(source) => fill_attribute(slot, entry, source, &mut data, vertex_count)?,
            None => log::debug!(
                "No source for '{}' in slot {}, left zeroed",
                entry.name,
                slot.slot
            ),
        }
    }
    Ok(VertexBuffer {
        slot: slot.slot,
        stride: slot.stride,
        data,
    })
}

fn fill_attribute(
    slot: &SlotLayout,
    entry: &AttributeEntry,
    source: &AttributeSource<'_>,
    data: &mut [u8],
    vertex_count: usize,
) -> Result<()> {
    let mut values = vec![0.0; entry.components];
    for vertex in 0..vertex_count {
        for (c, value) in values.iter_mut().enumerate() {
            *value = PADDING.get(c).copied().unwrap_or(0.0);
        }
        source.read(vertex, &mut values)?;
        slot.write(data, entry, vertex, &values)?;
    }
    Ok(())
}

fn bounds_of(source: &AttributeSource<'_>, vertex_count: usize) -> Result<Option<Bounds>> {
    let mut points = Vec::with_capacity(vertex_count);
    for vertex in 0..vertex_count {
        let mut xyz = [0.0; 3];
        source.read(vertex, &mut xyz)?;
        points.push(Vec3::from_array(xyz));
    }
    Ok(Bounds::from_points(points))
}
