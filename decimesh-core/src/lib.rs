//! Core data structures and traits for decimesh
//!
//! This crate provides the fundamental types for triangle mesh
//! processing: points, attribute bundles, the triangle mesh itself,
//! and the mutable adjacency structure the decimation engine edits
//! in place.

pub mod point;
pub mod attributes;
pub mod mesh;
pub mod topology;
pub mod traits;
pub mod error;

pub use point::*;
pub use attributes::*;
pub use mesh::*;
pub use topology::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};

/// Common result type for decimesh operations
pub type Result<T> = std::result::Result<T, Error>;

// Type aliases for easier imports
pub type Point = Point3f;
pub type Mesh = TriangleMesh;
