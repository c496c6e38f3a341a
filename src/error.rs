//! Error types for layout computation, scene resolution and pipeline compilation.
//!
//! Errors are grouped by the stage that detects them. None of them are
//! transient; every failure is deterministic for a given input.

use thiserror::Error;

use crate::backend::BackendError;

/// Malformed or unsupported interchange data. Fatal for the asset being loaded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Malformed accessor {accessor}: {reason}")]
    MalformedAccessor { accessor: usize, reason: String },
    #[error("Malformed buffer view {view}: {reason}")]
    MalformedBufferView { view: usize, reason: String },
    #[error("Malformed buffer {buffer}: {reason}")]
    MalformedBuffer { buffer: usize, reason: String },
    #[error("Malformed node {node}: {reason}")]
    MalformedNode { node: usize, reason: String },
    #[error(
        "Unsupported component type on accessor {accessor} (componentType {component_type}, type {element_type}): {reason}"
    )]
    UnsupportedComponentType {
        accessor: usize,
        component_type: u32,
        element_type: String,
        reason: String,
    },
    #[error("Unsupported draw mode {0}")]
    UnsupportedDrawMode(u32),
    #[error("Unsupported asset version '{0}'")]
    UnsupportedVersion(String),
    #[error("Missing {kind} {index}")]
    MissingReference { kind: &'static str, index: usize },
    #[error("Invalid document: {0}")]
    Document(String),
    #[error("Invalid container: {0}")]
    Container(String),
}

impl From<serde_json::Error> for FormatError {
    fn from(e: serde_json::Error) -> Self {
        FormatError::Document(e.to_string())
    }
}

/// Mapping or offset computation failure. Raised before any draw is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Program '{program}' has active variable '{name}' with no declared mapping")]
    UnmappedVariable { program: String, name: String },
    #[error("Variable mapping '{name}' declared more than once")]
    DuplicateMapping { name: String },
    #[error("Variable '{name}' is mapped as {declared} but reflected as {reflected}")]
    RoleMismatch {
        name: String,
        declared: &'static str,
        reflected: &'static str,
    },
    #[error("Layout overflow: {required} bytes required, {maximum} available")]
    LayoutOverflow { required: usize, maximum: usize },
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
}

/// Inconsistent mesh input. Fatal for the mesh being built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error(
        "Vertex count mismatch in slot {slot}: '{attribute}' has {found} vertices, expected {expected}"
    )]
    VertexCountMismatch {
        slot: u32,
        attribute: String,
        expected: usize,
        found: usize,
    },
    #[error(
        "Index {index} at position {position} is out of range for {vertex_count} vertices (accessor {accessor:?})"
    )]
    IndexOutOfRange {
        accessor: Option<usize>,
        position: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("Source for '{attribute}' has {components} components, layout entry holds {capacity}")]
    ComponentOverflow {
        attribute: String,
        components: usize,
        capacity: usize,
    },
    #[error("Source for '{attribute}' has {len} values, not a multiple of {components}")]
    RaggedSource {
        attribute: String,
        len: usize,
        components: usize,
    },
}

/// Pipeline compilation failure. The diagnostic is kept verbatim.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pipeline compilation failed for program '{program}': {diagnostic}")]
    Compilation { program: String, diagnostic: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Crate-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Format(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::from(FormatError::MalformedAccessor {
            accessor: 3,
            reason: "element 24 out of bounds".into(),
        });
        assert_eq!(
            err.to_string(),
            "Malformed accessor 3: element 24 out of bounds"
        );

        let err = Error::from(LayoutError::LayoutOverflow {
            required: 80,
            maximum: 64,
        });
        assert!(err.to_string().contains("80 bytes required"));
    }

    #[test]
    fn test_backend_diagnostic_is_verbatim() {
        let err = PipelineError::Compilation {
            program: "lit".into(),
            diagnostic: "error: 0:12: 'a_normal' undeclared".into(),
        };
        assert!(err
            .to_string()
            .ends_with("error: 0:12: 'a_normal' undeclared"));
    }
}
