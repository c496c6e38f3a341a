//! Bind-per-draw compiler
//!
//! No device object exists. Compilation resolves attribute locations once;
//! every draw re-specifies each attribute pointer from that cached table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::GpuDevice;
use crate::error::PipelineError;
use crate::layout::BufferLayout;
use crate::resources::GpuMesh;
use crate::shader::VariableRegistry;

use super::{
    draw_call, key, resolve_bindings, BackendKind, FixedFunctionState, PipelineCompiler,
    PipelineKey, PipelineState,
};

/// Compiler for backends that bind buffers and attributes on every draw
#[derive(Debug, Default)]
pub struct BindPerDrawCompiler {
    cache: RwLock<HashMap<PipelineKey, Arc<PipelineState>>>,
}

impl BindPerDrawCompiler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineCompiler for BindPerDrawCompiler {
    fn kind(&self) -> BackendKind {
        BackendKind::BindPerDraw
    }

    fn compile(
        &self,
        _device: &dyn GpuDevice,
        registry: &VariableRegistry,
        layout: &BufferLayout,
        state: FixedFunctionState,
    ) -> Result<Arc<PipelineState>, PipelineError> {
        let key = key(registry, layout, state);
        if let Some(cached) = self.cache.read().get(&key) {
            return Ok(cached.clone());
        }

        let (slots, attributes) = resolve_bindings(registry, layout)?;
        let pipeline = Arc::new(PipelineState {
            key,
            program_name: registry.program_name().to_string(),
            handle: None,
            slots,
            attributes,
            uniforms: layout.uniforms().clone(),
        });

        log::debug!(
            "Resolved {} attribute locations for '{}'",
            pipeline.attributes.len(),
            pipeline.program_name
        );
        Ok(self.cache.write().entry(key).or_insert(pipeline).clone())
    }

    fn draw(
        &self,
        device: &dyn GpuDevice,
        pipeline: &PipelineState,
        mesh: &GpuMesh,
    ) -> Result<(), PipelineError> {
        let mut call = draw_call(pipeline, mesh)?;
        call.attributes = pipeline.attributes.clone();
        device.draw(&call)?;
        Ok(())
    }

    fn destroy(&self, _device: &dyn GpuDevice, pipeline: &PipelineState) {
        if self.cache.write().remove(&pipeline.key).is_none() {
            log::warn!("Pipeline '{}' already destroyed", pipeline.program_name);
        }
    }

    fn destroy_all(&self, _device: &dyn GpuDevice) {
        let mut cache = self.cache.write();
        log::debug!("Evicting {} cached pipelines", cache.len());
        cache.clear();
    }

    fn cached(&self) -> usize {
        self.cache.read().len()
    }
}
