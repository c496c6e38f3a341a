//! Mesh resources
//!
//! Assembles interleaved vertex and element buffers from a computed layout,
//! and holds the materials and procedural geometry that feed them.

mod assembler;
pub mod builders;
mod material;
mod mesh;

pub use assembler::*;
pub use material::*;
pub use mesh::*;
