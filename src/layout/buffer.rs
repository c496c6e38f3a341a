//! Computed vertex and uniform buffer layouts.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::LayoutError;
use crate::shader::DataType;

/// Identity of a layout, derived from its contents.
///
/// Two layouts with the same slots, strides and entries share an id, which
/// lets pipeline caches reuse compiled state across meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(pub u64);

/// One attribute within a vertex buffer slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeEntry {
    pub name: String,
    /// Byte offset from the start of a vertex.
    pub offset: usize,
    /// Total components, including array length.
    pub components: usize,
    pub data_type: DataType,
    /// Backend attribute location.
    pub location: u32,
}

impl AttributeEntry {
    pub fn size(&self) -> usize {
        self.components * 4
    }

    pub fn end(&self) -> usize {
        self.offset + self.size()
    }
}

/// Stride and attribute placement for one vertex buffer slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotLayout {
    pub slot: u32,
    pub stride: usize,
    pub attributes: Vec<AttributeEntry>,
}

impl SlotLayout {
    pub fn attribute(&self, name: &str) -> Option<&AttributeEntry> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Sum of attribute sizes, excluding any reserved extra stride.
    pub fn packed_size(&self) -> usize {
        self.attributes.iter().map(AttributeEntry::size).sum()
    }

    /// Zeroed storage for `vertex_count` vertices.
    pub fn allocate(&self, vertex_count: usize) -> Vec<u8> {
        vec![0; self.stride * vertex_count]
    }

    /// Write `values` for one vertex at the attribute's offset.
    ///
    /// Integer attributes are stored as little-endian `i32`. Fails without
    /// writing anything if the vertex lies past the end of `buffer`.
    pub fn write(
        &self,
        buffer: &mut [u8],
        entry: &AttributeEntry,
        vertex: usize,
        values: &[f32],
    ) -> Result<(), LayoutError> {
        let base = vertex * self.stride + entry.offset;
        let count = values.len().min(entry.components);
        let maximum = buffer.len();
        let target = buffer
            .get_mut(base..base + count * 4)
            .ok_or(LayoutError::LayoutOverflow {
                required: base + count * 4,
                maximum,
            })?;
        for (chunk, &value) in target.chunks_exact_mut(4).zip(values) {
            let bytes = if entry.data_type.is_integer() {
                (value as i32).to_le_bytes()
            } else {
                value.to_le_bytes()
            };
            chunk.copy_from_slice(&bytes);
        }
        Ok(())
    }

    /// Read one vertex's components for the named attribute.
    pub fn read(&self, buffer: &[u8], name: &str, vertex: usize) -> Option<Vec<f32>> {
        let entry = self.attribute(name)?;
        let base = vertex * self.stride + entry.offset;
        let end = base + entry.size();
        let bytes = buffer.get(base..end)?;
        Some(
            bytes
                .chunks_exact(4)
                .map(|c| {
                    let raw = [c[0], c[1], c[2], c[3]];
                    if entry.data_type.is_integer() {
                        i32::from_le_bytes(raw) as f32
                    } else {
                        f32::from_le_bytes(raw)
                    }
                })
                .collect(),
        )
    }
}

/// A uniform within the flat uniform float buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformEntry {
    pub name: String,
    /// Byte offset, always 4-byte aligned.
    pub offset: usize,
    pub data_type: DataType,
    pub array_size: usize,
}

impl UniformEntry {
    pub fn size(&self) -> usize {
        self.data_type.size() * self.array_size
    }

    /// Offset in floats.
    pub fn float_offset(&self) -> usize {
        self.offset / 4
    }
}

/// A sampler bound to a texture unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SamplerEntry {
    pub name: String,
    pub unit: u32,
}

/// Flat offset table for the uniform float buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UniformLayout {
    pub entries: Vec<UniformEntry>,
    pub samplers: Vec<SamplerEntry>,
    /// Total byte size.
    pub size: usize,
}

impl UniformLayout {
    pub fn entry(&self, name: &str) -> Option<&UniformEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn sampler_unit(&self, name: &str) -> Option<u32> {
        self.samplers.iter().find(|s| s.name == name).map(|s| s.unit)
    }

    pub fn allocate(&self) -> Vec<f32> {
        vec![0.0; self.size / 4]
    }

    pub fn write(&self, storage: &mut [f32], name: &str, values: &[f32]) -> Result<(), LayoutError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| LayoutError::InvalidLayout(format!("No uniform named '{name}'")))?;
        let len = entry.size() / 4;
        if values.len() > len {
            return Err(LayoutError::LayoutOverflow {
                required: values.len() * 4,
                maximum: entry.size(),
            });
        }
        let start = entry.float_offset();
        let maximum = storage.len() * 4;
        let target = storage
            .get_mut(start..start + values.len())
            .ok_or(LayoutError::LayoutOverflow {
                required: entry.offset + values.len() * 4,
                maximum,
            })?;
        target.copy_from_slice(values);
        Ok(())
    }
}

/// Vertex slots and uniform table computed from one variable set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferLayout {
    id: LayoutId,
    slots: Vec<SlotLayout>,
    uniforms: UniformLayout,
}

impl BufferLayout {
    pub(crate) fn new(slots: Vec<SlotLayout>, uniforms: UniformLayout) -> Self {
        let mut hasher = DefaultHasher::new();
        slots.hash(&mut hasher);
        let id = LayoutId(hasher.finish());
        Self {
            id,
            slots,
            uniforms,
        }
    }

    pub fn id(&self) -> LayoutId {
        self.id
    }

    /// Slots in ascending slot order.
    pub fn slots(&self) -> &[SlotLayout] {
        &self.slots
    }

    pub fn slot(&self, slot: u32) -> Option<&SlotLayout> {
        self.slots.iter().find(|s| s.slot == slot)
    }

    pub fn uniforms(&self) -> &UniformLayout {
        &self.uniforms
    }

    /// Find an attribute and the slot that holds it.
    pub fn entry(&self, name: &str) -> Option<(&SlotLayout, &AttributeEntry)> {
        self.slots
            .iter()
            .find_map(|s| s.attribute(name).map(|a| (s, a)))
    }

    pub fn stride(&self, slot: u32) -> Option<usize> {
        self.slot(slot).map(|s| s.stride)
    }

    pub fn allocate(&self, slot: u32, vertex_count: usize) -> Option<Vec<u8>> {
        self.slot(slot).map(|s| s.allocate(vertex_count))
    }

    /// Read back the named attribute of one vertex from a slot buffer.
    pub fn read_floats(&self, buffer: &[u8], name: &str, vertex: usize) -> Option<Vec<f32>> {
        let (slot, _) = self.entry(name)?;
        slot.read(buffer, name, vertex)
    }

    /// Check offset and stride invariants.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for slot in &self.slots {
            let mut end = 0;
            for (i, attr) in slot.attributes.iter().enumerate() {
                if attr.offset % 4 != 0 {
                    return Err(LayoutError::InvalidLayout(format!(
                        "Attribute '{}' in slot {} has unaligned offset {}",
                        attr.name, slot.slot, attr.offset
                    )));
                }
                if i > 0 && attr.offset < end {
                    return Err(LayoutError::InvalidLayout(format!(
                        "Attribute '{}' in slot {} overlaps its predecessor",
                        attr.name, slot.slot
                    )));
                }
                end = attr.end();
            }
            if slot.stride < slot.packed_size() || slot.stride < end {
                return Err(LayoutError::InvalidLayout(format!(
                    "Slot {} stride {} is smaller than its attributes ({} bytes)",
                    slot.slot,
                    slot.stride,
                    slot.packed_size()
                )));
            }
        }

        let mut end = 0;
        for entry in &self.uniforms.entries {
            if entry.offset % 4 != 0 || entry.offset < end {
                return Err(LayoutError::InvalidLayout(format!(
                    "Uniform '{}' at offset {} is unaligned or overlapping",
                    entry.name, entry.offset
                )));
            }
            end = entry.offset + entry.size();
        }
        if end > self.uniforms.size {
            return Err(LayoutError::InvalidLayout(format!(
                "Uniform table size {} is smaller than its entries ({end} bytes)",
                self.uniforms.size
            )));
        }
        Ok(())
    }
}
