//! glTF 2.0 binary resolution.
//!
//! [`GltfAsset`] parses the JSON document and gathers buffer bytes from GLB
//! chunks, data URIs or a [`BufferSource`]. [`SceneBinaryResolver`] turns
//! accessor indices into bounds-checked [`AccessorView`]s over those bytes;
//! nothing is copied until a view is decoded.

mod component;
pub mod document;
mod import;
mod resolver;
mod scene;
mod source;

pub use component::{ComponentType, ElementType, Target};
pub use document::Document;
pub use import::{import_materials, import_meshes, SemanticMap};
pub use resolver::{AccessorView, Indices, SceneBinaryResolver, Vectors};
pub use scene::MeshInstance;
pub use source::{BufferSource, FsBufferSource, GltfAsset, NoExternalBuffers};
