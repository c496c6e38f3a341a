//! Pipeline compilation
//!
//! A [`PipelineCompiler`] binds a reflected program to a computed
//! [`BufferLayout`] and fixed-function state. Two implementations exist:
//! 1. [`BindPerDrawCompiler`] - validates once, re-binds attributes on every draw
//! 2. [`ExplicitPipelineCompiler`] - creates an immutable device pipeline object
//!
//! Both check the layout against the program before touching the device, so a
//! missing slot or attribute fails at compile time rather than at draw time.

pub mod bind_per_draw;
pub mod explicit;
mod state;

pub use bind_per_draw::BindPerDrawCompiler;
pub use explicit::ExplicitPipelineCompiler;
pub use state::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{AttributeBinding, BackendError, DrawCall, GpuDevice, SlotBinding};
use crate::error::PipelineError;
use crate::layout::BufferLayout;
use crate::resources::GpuMesh;
use crate::shader::VariableRegistry;

/// Backend style a compiler targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Classic bind-buffers-and-draw
    #[default]
    BindPerDraw,
    /// Immutable pipeline objects created up front
    ExplicitPipeline,
}

/// Compiles and draws pipelines for one backend style.
///
/// Compiled states are cached by [`PipelineKey`]; compiling the same program,
/// layout and state twice returns the same `Arc`.
pub trait PipelineCompiler: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Validate `layout` against `registry` and produce a pipeline.
    fn compile(
        &self,
        device: &dyn GpuDevice,
        registry: &VariableRegistry,
        layout: &BufferLayout,
        state: FixedFunctionState,
    ) -> Result<Arc<PipelineState>, PipelineError>;

    /// Draw an uploaded mesh. Its layout must be the one the pipeline was compiled for.
    fn draw(
        &self,
        device: &dyn GpuDevice,
        pipeline: &PipelineState,
        mesh: &GpuMesh,
    ) -> Result<(), PipelineError>;

    /// Release `pipeline`. Repeated calls are ignored.
    fn destroy(&self, device: &dyn GpuDevice, pipeline: &PipelineState);

    /// Release every cached pipeline.
    fn destroy_all(&self, device: &dyn GpuDevice);

    /// Number of cached pipelines.
    fn cached(&self) -> usize;
}

/// Create the compiler for `kind`.
pub fn compiler_for(kind: BackendKind) -> Box<dyn PipelineCompiler> {
    log::info!("Creating {:?} pipeline compiler", kind);
    match kind {
        BackendKind::BindPerDraw => Box::new(BindPerDrawCompiler::new()),
        BackendKind::ExplicitPipeline => Box::new(ExplicitPipelineCompiler::new()),
    }
}

/// Resolve every attribute the program consumes against `layout`.
pub(crate) fn resolve_bindings(
    registry: &VariableRegistry,
    layout: &BufferLayout,
) -> Result<(Vec<SlotBinding>, Vec<AttributeBinding>), PipelineError> {
    let fail = |diagnostic: String| PipelineError::Compilation {
        program: registry.program_name().to_string(),
        diagnostic,
    };

    let mut attributes = Vec::new();
    for var in registry.attributes() {
        let slot = var.slot().unwrap_or(0);
        let slot_layout = layout.slot(slot).ok_or_else(|| {
            fail(format!(
                "attribute '{}' reads vertex slot {} which the layout does not provide",
                var.name(),
                slot
            ))
        })?;
        let entry = slot_layout.attribute(var.name()).ok_or_else(|| {
            fail(format!(
                "attribute '{}' has no entry in vertex slot {}",
                var.name(),
                slot
            ))
        })?;
        if entry.data_type != var.data_type() || entry.components != var.components() {
            return Err(fail(format!(
                "attribute '{}' is {} x{} in the program but {} x{} in vertex slot {}",
                var.name(),
                var.data_type(),
                var.array_size(),
                entry.data_type,
                entry.components / entry.data_type.components().max(1),
                slot
            )));
        }
        attributes.push(AttributeBinding {
            location: var.location(),
            slot,
            offset: entry.offset,
            data_type: entry.data_type,
        });
    }

    let slots = layout
        .slots()
        .iter()
        .map(|s| SlotBinding {
            slot: s.slot,
            stride: s.stride,
        })
        .collect();
    Ok((slots, attributes))
}

pub(crate) fn key(
    registry: &VariableRegistry,
    layout: &BufferLayout,
    state: FixedFunctionState,
) -> PipelineKey {
    PipelineKey {
        program: registry.program(),
        layout: layout.id(),
        state,
    }
}

/// Draw call for `mesh` with `pipeline`, without device-specific parts.
pub(crate) fn draw_call(pipeline: &PipelineState, mesh: &GpuMesh) -> Result<DrawCall, PipelineError> {
    if mesh.layout_id() != pipeline.key.layout {
        return Err(BackendError::DrawFailed(format!(
            "mesh '{}' was built for layout {:?}, pipeline '{}' expects {:?}",
            mesh.name(),
            mesh.layout_id(),
            pipeline.program_name,
            pipeline.key.layout
        ))
        .into());
    }
    Ok(DrawCall {
        program: pipeline.key.program,
        pipeline: None,
        state: pipeline.key.state,
        vertex_buffers: mesh.vertex_buffers().to_vec(),
        attributes: Vec::new(),
        index: mesh.index(),
        mode: mesh.mode(),
        count: mesh.count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{compute_layout, LayoutOptions};
    use crate::shader::{
        ActiveVariable, CompiledProgram, DataType, MappingSet, ProgramId, VariableMapping,
    };

    fn registry() -> VariableRegistry {
        let program = CompiledProgram::new(ProgramId(3), "lit")
            .with_variable(ActiveVariable::attribute("a_position", DataType::Vec3, 0))
            .with_variable(ActiveVariable::attribute("a_normal", DataType::Vec3, 1));
        let mappings = MappingSet::new(vec![
            VariableMapping::attribute("a_position", 0),
            VariableMapping::attribute("a_normal", 1),
        ])
        .unwrap();
        VariableRegistry::reflect(&program, &mappings).unwrap()
    }

    #[test]
    fn test_resolve_bindings() {
        let registry = registry();
        let layout = compute_layout(registry.variables(), &LayoutOptions::new()).unwrap();
        let (slots, attributes) = resolve_bindings(&registry, &layout).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(attributes[1].slot, 1);
        assert_eq!(attributes[1].offset, 0);
        assert_eq!(attributes[1].location, 1);
    }

    #[test]
    fn test_missing_slot_fails() {
        let registry = registry();
        // Layout computed from slot 0 only.
        let layout = compute_layout(&registry.variables()[..1], &LayoutOptions::new()).unwrap();
        match resolve_bindings(&registry, &layout) {
            Err(PipelineError::Compilation { program, diagnostic }) => {
                assert_eq!(program, "lit");
                assert!(diagnostic.contains("slot 1"));
            }
            other => panic!("expected compilation error, got {other:?}"),
        }
    }

    #[test]
    fn test_factory() {
        assert_eq!(compiler_for(BackendKind::default()).kind(), BackendKind::BindPerDraw);
        assert_eq!(
            compiler_for(BackendKind::ExplicitPipeline).kind(),
            BackendKind::ExplicitPipeline
        );
    }
}
