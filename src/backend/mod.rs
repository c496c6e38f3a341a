//! Backend abstraction layer
//!
//! Provides the device trait and the descriptor types both backend styles
//! submit through.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::DummyDevice;
pub use traits::*;
pub use types::*;
