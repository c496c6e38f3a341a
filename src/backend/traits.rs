//! Device boundary.
//!
//! The core calls a [`GpuDevice`] to create buffers and pipelines and to issue
//! draws. Concrete devices live outside this crate; [`DummyDevice`](super::DummyDevice)
//! records calls for tests and headless runs.

use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Draw rejected: {0}")]
    DrawFailed(String),
    #[error("Unknown handle {0}")]
    InvalidHandle(u64),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a compiled pipeline object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub(crate) u64);

impl BufferHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl PipelineHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A GPU device as seen by the core.
///
/// All calls are issued from the thread that owns the device.
pub trait GpuDevice: Send + Sync {
    /// Device name for logging.
    fn name(&self) -> &'static str;

    /// Create a buffer initialised with `contents`.
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        contents: &[u8],
    ) -> BackendResult<BufferHandle>;

    fn destroy_buffer(&self, buffer: BufferHandle);

    /// Compile and link a pipeline object.
    ///
    /// Failures return [`BackendError::PipelineCreationFailed`] carrying the
    /// driver's diagnostic text.
    fn create_pipeline(&self, descriptor: &PipelineDescriptor) -> BackendResult<PipelineHandle>;

    fn destroy_pipeline(&self, pipeline: PipelineHandle);

    fn draw(&self, call: &DrawCall) -> BackendResult<()>;
}
