//! Vertex and uniform buffer layouts.
//!
//! [`compute_layout`] turns an ordered variable set into per-slot strides and
//! offsets plus a flat uniform offset table. Each slot is one interleaved
//! vertex buffer; attributes keep the order the author declared them in.
//!
//! # Example
//!
//! ```ignore
//! let registry = VariableRegistry::reflect(&program, &mappings)?;
//! let layout = BufferLayout::from_registry(&registry, &LayoutOptions::new())?;
//! let mut vertices = layout.allocate(0, vertex_count).unwrap();
//! ```

mod buffer;
mod engine;

pub use buffer::{
    AttributeEntry, BufferLayout, LayoutId, SamplerEntry, SlotLayout, UniformEntry, UniformLayout,
};
pub use engine::{compute_layout, LayoutOptions, DEFAULT_MAX_UNIFORM_BYTES};
