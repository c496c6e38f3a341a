//! Explicit pipeline compiler
//!
//! Compilation creates a device pipeline object holding the vertex layout and
//! fixed-function state. Each object is destroyed exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{BackendError, GpuDevice, PipelineDescriptor};
use crate::error::PipelineError;
use crate::layout::BufferLayout;
use crate::resources::GpuMesh;
use crate::shader::VariableRegistry;

use super::{
    draw_call, key, resolve_bindings, BackendKind, FixedFunctionState, PipelineCompiler,
    PipelineKey, PipelineState,
};

/// Compiler for backends with immutable pipeline objects
#[derive(Debug, Default)]
pub struct ExplicitPipelineCompiler {
    cache: RwLock<HashMap<PipelineKey, Arc<PipelineState>>>,
}

impl ExplicitPipelineCompiler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineCompiler for ExplicitPipelineCompiler {
    fn kind(&self) -> BackendKind {
        BackendKind::ExplicitPipeline
    }

    fn compile(
        &self,
        device: &dyn GpuDevice,
        registry: &VariableRegistry,
        layout: &BufferLayout,
        state: FixedFunctionState,
    ) -> Result<Arc<PipelineState>, PipelineError> {
        let key = key(registry, layout, state);
        if let Some(cached) = self.cache.read().get(&key) {
            return Ok(cached.clone());
        }

        let (slots, attributes) = resolve_bindings(registry, layout)?;

        // Held across creation so a key never gets two device objects.
        let mut cache = self.cache.write();
        if let Some(cached) = cache.get(&key) {
            return Ok(cached.clone());
        }

        let descriptor = PipelineDescriptor {
            program: key.program,
            label: registry.program_name().to_string(),
            layout: key.layout,
            slots: slots.clone(),
            attributes: attributes.clone(),
            state,
        };
        let handle = device
            .create_pipeline(&descriptor)
            .map_err(|e| match e {
                BackendError::PipelineCreationFailed(diagnostic) => PipelineError::Compilation {
                    program: registry.program_name().to_string(),
                    diagnostic,
                },
                other => PipelineError::Backend(other),
            })?;

        log::debug!(
            "Created pipeline {} for '{}' on {}",
            handle.raw(),
            registry.program_name(),
            device.name()
        );
        let pipeline = Arc::new(PipelineState {
            key,
            program_name: registry.program_name().to_string(),
            handle: Some(handle),
            slots,
            attributes,
            uniforms: layout.uniforms().clone(),
        });
        cache.insert(key, pipeline.clone());
        Ok(pipeline)
    }

    fn draw(
        &self,
        device: &dyn GpuDevice,
        pipeline: &PipelineState,
        mesh: &GpuMesh,
    ) -> Result<(), PipelineError> {
        let handle = pipeline.handle.ok_or_else(|| {
            BackendError::DrawFailed(format!(
                "pipeline '{}' has no device object",
                pipeline.program_name
            ))
        })?;
        let mut call = draw_call(pipeline, mesh)?;
        call.pipeline = Some(handle);
        device.draw(&call)?;
        Ok(())
    }

    fn destroy(&self, device: &dyn GpuDevice, pipeline: &PipelineState) {
        let removed = {
            let mut cache = self.cache.write();
            // A later compile under the same key owns a different object.
            let current = cache.get(&pipeline.key).map(|cached| cached.handle);
            if current == Some(pipeline.handle) {
                cache.remove(&pipeline.key)
            } else {
                None
            }
        };
        match removed.and_then(|p| p.handle) {
            Some(handle) => device.destroy_pipeline(handle),
            None => log::warn!(
                "Pipeline '{}' already destroyed, ignoring",
                pipeline.program_name
            ),
        }
    }

    fn destroy_all(&self, device: &dyn GpuDevice) {
        let drained: Vec<_> = self.cache.write().drain().map(|(_, p)| p).collect();
        log::debug!("Destroying {} pipelines", drained.len());
        for pipeline in drained {
            if let Some(handle) = pipeline.handle {
                device.destroy_pipeline(handle);
            }
        }
    }

    fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

impl Drop for ExplicitPipelineCompiler {
    fn drop(&mut self) {
        let live = self.cache.get_mut().len();
        if live > 0 {
            log::warn!("Pipeline compiler dropped with {} live pipelines", live);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyDevice;
    use crate::layout::{compute_layout, LayoutOptions};
    use crate::pipeline::CullMode;
    use crate::shader::{
        ActiveVariable, CompiledProgram, DataType, MappingSet, ProgramId, VariableMapping,
    };

    fn registry() -> VariableRegistry {
        let program = CompiledProgram::new(ProgramId(9), "skinned")
            .with_variable(ActiveVariable::attribute("a_position", DataType::Vec3, 0))
            .with_variable(ActiveVariable::attribute("a_joints", DataType::IVec4, 1));
        let mappings = MappingSet::new(vec![
            VariableMapping::attribute("a_position", 0),
            VariableMapping::attribute("a_joints", 1),
        ])
        .unwrap();
        VariableRegistry::reflect(&program, &mappings).unwrap()
    }

    #[test]
    fn test_compile_creates_once() {
        let device = DummyDevice::new();
        let registry = registry();
        let layout = compute_layout(registry.variables(), &LayoutOptions::new()).unwrap();
        let compiler = ExplicitPipelineCompiler::new();

        let a = compiler
            .compile(&device, &registry, &layout, FixedFunctionState::default())
            .unwrap();
        let b = compiler
            .compile(&device, &registry, &layout, FixedFunctionState::default())
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.handle().is_some());
        assert_eq!(device.pipelines_created(), 1);

        compiler.destroy(&device, &a);
        compiler.destroy(&device, &b);
        assert_eq!(device.pipelines_destroyed(), 1);
        assert_eq!(device.invalid_destroys(), 0);
        assert_eq!(compiler.cached(), 0);
    }

    #[test]
    fn test_device_diagnostic_is_verbatim() {
        let device = DummyDevice::new();
        let registry = registry();
        let layout = compute_layout(registry.variables(), &LayoutOptions::new()).unwrap();
        let compiler = ExplicitPipelineCompiler::new();

        device.fail_next_pipeline("0:12(4): error: `a_joints' type mismatch");
        match compiler.compile(&device, &registry, &layout, FixedFunctionState::default()) {
            Err(PipelineError::Compilation { program, diagnostic }) => {
                assert_eq!(program, "skinned");
                assert_eq!(diagnostic, "0:12(4): error: `a_joints' type mismatch");
            }
            other => panic!("expected compilation error, got {other:?}"),
        }
        assert_eq!(compiler.cached(), 0);
    }

    #[test]
    fn test_missing_slot_fails_before_device() {
        let device = DummyDevice::new();
        let registry = registry();
        let layout = compute_layout(&registry.variables()[..1], &LayoutOptions::new()).unwrap();
        let compiler = ExplicitPipelineCompiler::new();

        assert!(matches!(
            compiler.compile(&device, &registry, &layout, FixedFunctionState::default()),
            Err(PipelineError::Compilation { .. })
        ));
        assert_eq!(device.pipelines_created(), 0);
    }

    #[test]
    fn test_destroy_all() {
        let device = DummyDevice::new();
        let registry = registry();
        let layout = compute_layout(registry.variables(), &LayoutOptions::new()).unwrap();
        let compiler = ExplicitPipelineCompiler::new();
        for cull in [CullMode::Back, CullMode::None] {
            compiler
                .compile(
                    &device,
                    &registry,
                    &layout,
                    FixedFunctionState::default().with_cull(cull),
                )
                .unwrap();
        }
        compiler.destroy_all(&device);
        assert_eq!(device.live_pipelines(), 0);
        assert_eq!(device.pipelines_destroyed(), 2);
    }
}
