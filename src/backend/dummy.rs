//! Dummy GPU device for testing and headless runs.
//!
//! Performs no GPU work. Every call is logged at trace level and recorded so
//! tests can assert on what the core asked the device to do.

use std::collections::HashSet;

use parking_lot::Mutex;

use super::traits::*;
use super::types::*;

#[derive(Debug, Default)]
struct DummyState {
    next_handle: u64,
    live_buffers: HashSet<u64>,
    live_pipelines: HashSet<u64>,
    pipelines_created: usize,
    pipelines_destroyed: usize,
    invalid_destroys: usize,
    draws: Vec<DrawCall>,
    fail_next_pipeline: Option<String>,
}

/// Dummy GPU device.
#[derive(Debug, Default)]
pub struct DummyDevice {
    state: Mutex<DummyState>,
}

impl DummyDevice {
    /// Create a new dummy device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_pipeline` fail with `diagnostic`.
    pub fn fail_next_pipeline(&self, diagnostic: impl Into<String>) {
        self.state.lock().fail_next_pipeline = Some(diagnostic.into());
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.state.lock().draws.clone()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.lock().live_buffers.len()
    }

    pub fn live_pipelines(&self) -> usize {
        self.state.lock().live_pipelines.len()
    }

    pub fn pipelines_created(&self) -> usize {
        self.state.lock().pipelines_created
    }

    pub fn pipelines_destroyed(&self) -> usize {
        self.state.lock().pipelines_destroyed
    }

    /// Destroys of handles that were not live.
    pub fn invalid_destroys(&self) -> usize {
        self.state.lock().invalid_destroys
    }

    fn next_handle(state: &mut DummyState) -> u64 {
        state.next_handle += 1;
        state.next_handle
    }
}

impl GpuDevice for DummyDevice {
    fn name(&self) -> &'static str {
        "Dummy Device"
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        contents: &[u8],
    ) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyDevice: creating {:?} buffer {:?} (size: {})",
            descriptor.usage,
            descriptor.label,
            descriptor.size
        );
        if contents.len() > descriptor.size {
            return Err(BackendError::BufferCreationFailed(format!(
                "{} bytes of contents for a {}-byte buffer",
                contents.len(),
                descriptor.size
            )));
        }
        let mut state = self.state.lock();
        let id = Self::next_handle(&mut state);
        state.live_buffers.insert(id);
        Ok(BufferHandle(id))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        log::trace!("DummyDevice: destroying buffer {}", buffer.0);
        let mut state = self.state.lock();
        if !state.live_buffers.remove(&buffer.0) {
            log::warn!("DummyDevice: buffer {} is not live", buffer.0);
            state.invalid_destroys += 1;
        }
    }

    fn create_pipeline(&self, descriptor: &PipelineDescriptor) -> BackendResult<PipelineHandle> {
        log::trace!(
            "DummyDevice: creating pipeline '{}' ({} attributes, {} slots)",
            descriptor.label,
            descriptor.attributes.len(),
            descriptor.slots.len()
        );
        let mut state = self.state.lock();
        if let Some(diagnostic) = state.fail_next_pipeline.take() {
            return Err(BackendError::PipelineCreationFailed(diagnostic));
        }
        let id = Self::next_handle(&mut state);
        state.live_pipelines.insert(id);
        state.pipelines_created += 1;
        Ok(PipelineHandle(id))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        log::trace!("DummyDevice: destroying pipeline {}", pipeline.0);
        let mut state = self.state.lock();
        if state.live_pipelines.remove(&pipeline.0) {
            state.pipelines_destroyed += 1;
        } else {
            log::warn!("DummyDevice: pipeline {} is not live", pipeline.0);
            state.invalid_destroys += 1;
        }
    }

    fn draw(&self, call: &DrawCall) -> BackendResult<()> {
        log::trace!(
            "DummyDevice: draw {:?} x{} (pipeline: {:?})",
            call.mode,
            call.count,
            call.pipeline
        );
        let mut state = self.state.lock();
        if let Some(pipeline) = call.pipeline {
            if !state.live_pipelines.contains(&pipeline.0) {
                return Err(BackendError::InvalidHandle(pipeline.0));
            }
        }
        for binding in &call.vertex_buffers {
            if !state.live_buffers.contains(&binding.buffer.0) {
                return Err(BackendError::InvalidHandle(binding.buffer.0));
            }
        }
        state.draws.push(call.clone());
        Ok(())
    }
}
