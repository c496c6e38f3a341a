//! Shader variable reflection.
//!
//! A [`CompiledProgram`] carries the active variables a backend reports for a
//! linked program. [`VariableRegistry::reflect`] checks them against the
//! author's [`MappingSet`] and orders them by declaration, so every layout
//! computed from the registry is identical across drivers.

mod mapping;
mod registry;
mod variable;

#[cfg(feature = "naga-reflect")]
pub mod reflect;

pub use mapping::{MappingSet, VariableMapping};
pub use registry::VariableRegistry;
pub use variable::{
    ActiveVariable, CompiledProgram, DataType, ProgramId, ShaderVariable, VariableRole,
};

#[cfg(feature = "naga-reflect")]
pub use reflect::reflect_wgsl;
