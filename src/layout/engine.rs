//! Stride and offset computation.
//!
//! Pure CPU arithmetic, safe to run on worker threads ahead of any GPU work.

use std::collections::{BTreeMap, HashMap};

use crate::error::LayoutError;
use crate::shader::{ShaderVariable, VariableRegistry, VariableRole};

use super::buffer::{AttributeEntry, BufferLayout, SamplerEntry, SlotLayout, UniformEntry, UniformLayout};

/// Default maximum size of the uniform float buffer.
pub const DEFAULT_MAX_UNIFORM_BYTES: usize = 16 * 1024;

/// Caller options for [`compute_layout`].
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Bytes reserved after the reflected attributes of a slot.
    pub extra_stride: HashMap<u32, usize>,
    /// Stride an existing buffer already uses for a slot.
    pub existing_stride: HashMap<u32, usize>,
    pub max_uniform_bytes: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            extra_stride: HashMap::new(),
            existing_stride: HashMap::new(),
            max_uniform_bytes: DEFAULT_MAX_UNIFORM_BYTES,
        }
    }
}

impl LayoutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `bytes` of per-vertex space in `slot` for data the shader does not reflect.
    pub fn with_extra_stride(mut self, slot: u32, bytes: usize) -> Self {
        self.extra_stride.insert(slot, bytes);
        self
    }

    pub fn with_existing_stride(mut self, slot: u32, stride: usize) -> Self {
        self.existing_stride.insert(slot, stride);
        self
    }

    pub fn with_max_uniform_bytes(mut self, bytes: usize) -> Self {
        self.max_uniform_bytes = bytes;
        self
    }
}

fn align4(bytes: usize) -> usize {
    (bytes + 3) & !3
}

/// Lay out `variables` into vertex slots and a flat uniform table.
///
/// Attributes are packed in the order given, each taking `components * 4`
/// bytes. Samplers take consecutive texture units instead of buffer space.
pub fn compute_layout(
    variables: &[ShaderVariable],
    options: &LayoutOptions,
) -> Result<BufferLayout, LayoutError> {
    let mut slots: BTreeMap<u32, Vec<AttributeEntry>> = BTreeMap::new();
    let mut uniforms = UniformLayout::default();

    for var in variables {
        match var.role() {
            VariableRole::Attribute => {
                let slot = var.slot().unwrap_or(0);
                let attributes = slots.entry(slot).or_default();
                let offset = attributes.last().map_or(0, AttributeEntry::end);
                attributes.push(AttributeEntry {
                    name: var.name().to_string(),
                    offset,
                    components: var.components(),
                    data_type: var.data_type(),
                    location: var.location(),
                });
            }
            VariableRole::Uniform if var.data_type().is_sampler() => {
                let unit = uniforms.samplers.len() as u32;
                uniforms.samplers.push(SamplerEntry {
                    name: var.name().to_string(),
                    unit,
                });
            }
            VariableRole::Uniform => {
                uniforms.entries.push(UniformEntry {
                    name: var.name().to_string(),
                    offset: uniforms.size,
                    data_type: var.data_type(),
                    array_size: var.array_size(),
                });
                uniforms.size += var.size();
            }
        }
    }

    if uniforms.size > options.max_uniform_bytes {
        return Err(LayoutError::LayoutOverflow {
            required: uniforms.size,
            maximum: options.max_uniform_bytes,
        });
    }

    let mut slot_layouts = Vec::with_capacity(slots.len());
    for (slot, attributes) in slots {
        let packed: usize = attributes.iter().map(AttributeEntry::size).sum();
        let extra = options.extra_stride.get(&slot).copied().unwrap_or(0);
        let mut stride = align4(packed + extra);
        if let Some(&existing) = options.existing_stride.get(&slot) {
            if existing < stride {
                return Err(LayoutError::LayoutOverflow {
                    required: stride,
                    maximum: existing,
                });
            }
            stride = existing;
        }
        slot_layouts.push(SlotLayout {
            slot,
            stride,
            attributes,
        });
    }

    let layout = BufferLayout::new(slot_layouts, uniforms);
    log::debug!(
        "Computed layout {:?}: {} slots, {} uniform bytes",
        layout.id(),
        layout.slots().len(),
        layout.uniforms().size
    );
    Ok(layout)
}

impl BufferLayout {
    /// Lay out every variable of a reflected program.
    pub fn from_registry(
        registry: &VariableRegistry,
        options: &LayoutOptions,
    ) -> Result<Self, LayoutError> {
        compute_layout(registry.variables(), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{
        ActiveVariable, CompiledProgram, DataType, MappingSet, ProgramId, VariableMapping,
    };
    use rstest::rstest;

    fn registry(program: CompiledProgram, mappings: Vec<VariableMapping>) -> VariableRegistry {
        VariableRegistry::reflect(&program, &MappingSet::new(mappings).unwrap()).unwrap()
    }

    fn lit_program() -> VariableRegistry {
        let program = CompiledProgram::new(ProgramId(1), "lit")
            .with_variable(ActiveVariable::attribute("a_position", DataType::Vec3, 0))
            .with_variable(ActiveVariable::attribute("a_normal", DataType::Vec3, 1))
            .with_variable(ActiveVariable::attribute("a_uv", DataType::Vec2, 2))
            .with_variable(ActiveVariable::attribute("a_color", DataType::Vec4, 3))
            .with_variable(ActiveVariable::uniform("u_mvp", DataType::Mat4, 0))
            .with_variable(ActiveVariable::uniform("u_normal", DataType::Mat3, 1))
            .with_variable(ActiveVariable::uniform("u_alpha", DataType::Float, 2))
            .with_variable(ActiveVariable::uniform("u_albedo", DataType::Sampler2D, 3));
        registry(
            program,
            vec![
                VariableMapping::attribute("a_position", 0),
                VariableMapping::attribute("a_normal", 0),
                VariableMapping::attribute("a_uv", 0),
                VariableMapping::attribute("a_color", 1),
                VariableMapping::uniform("u_mvp"),
                VariableMapping::uniform("u_normal"),
                VariableMapping::uniform("u_alpha"),
                VariableMapping::uniform("u_albedo"),
            ],
        )
    }

    #[test]
    fn test_stride_is_exact_sum() {
        let layout = BufferLayout::from_registry(&lit_program(), &LayoutOptions::new()).unwrap();
        layout.validate().unwrap();

        let slot0 = layout.slot(0).unwrap();
        assert_eq!(slot0.stride, 12 + 12 + 8);
        let offsets: Vec<_> = slot0.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 24]);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));

        let slot1 = layout.slot(1).unwrap();
        assert_eq!(slot1.stride, 16);
        assert_eq!(slot1.attributes[0].offset, 0);
    }

    #[test]
    fn test_uniform_table() {
        let layout = BufferLayout::from_registry(&lit_program(), &LayoutOptions::new()).unwrap();
        let uniforms = layout.uniforms();
        assert_eq!(uniforms.entry("u_mvp").unwrap().offset, 0);
        assert_eq!(uniforms.entry("u_normal").unwrap().offset, 64);
        assert_eq!(uniforms.entry("u_alpha").unwrap().offset, 100);
        assert_eq!(uniforms.size, 104);
        assert_eq!(uniforms.sampler_unit("u_albedo"), Some(0));
        assert!(uniforms.entries.iter().all(|e| e.offset % 4 == 0));
    }

    #[rstest]
    #[case(4, 36)]
    #[case(6, 40)]
    #[case(0, 32)]
    fn test_extra_stride(#[case] extra: usize, #[case] expected: usize) {
        let options = LayoutOptions::new().with_extra_stride(0, extra);
        let layout = BufferLayout::from_registry(&lit_program(), &options).unwrap();
        assert_eq!(layout.stride(0), Some(expected));
        assert_eq!(layout.stride(1), Some(16));
    }

    #[test]
    fn test_existing_stride() {
        let options = LayoutOptions::new().with_existing_stride(0, 48);
        let layout = BufferLayout::from_registry(&lit_program(), &options).unwrap();
        assert_eq!(layout.stride(0), Some(48));

        let options = LayoutOptions::new().with_existing_stride(0, 16);
        let err = BufferLayout::from_registry(&lit_program(), &options).unwrap_err();
        assert_eq!(
            err,
            LayoutError::LayoutOverflow {
                required: 32,
                maximum: 16
            }
        );
    }

    #[test]
    fn test_uniform_overflow() {
        let options = LayoutOptions::new().with_max_uniform_bytes(64);
        let err = BufferLayout::from_registry(&lit_program(), &options).unwrap_err();
        assert_eq!(
            err,
            LayoutError::LayoutOverflow {
                required: 104,
                maximum: 64
            }
        );
    }

    #[test]
    fn test_uniform_arrays() {
        let program = CompiledProgram::new(ProgramId(2), "lights").with_variable(
            ActiveVariable::uniform("u_lights", DataType::Vec4, 0).with_array_size(4),
        );
        let registry = registry(program, vec![VariableMapping::uniform("u_lights")]);
        let layout = BufferLayout::from_registry(&registry, &LayoutOptions::new()).unwrap();
        assert_eq!(layout.uniforms().size, 64);
        assert!(layout.slots().is_empty());
    }
}
