//! Dataset append and point welding
//!
//! Unions the geometry and (conditionally) the attributes of N input
//! meshes into one output mesh, with optional point unification by
//! spatial tolerance or by global id.

pub mod append;
pub mod weld;

pub use append::*;
pub use weld::*;
