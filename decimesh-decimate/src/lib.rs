//! Quadric error metric mesh decimation
//!
//! This crate implements edge-collapse mesh simplification driven by
//! per-point error quadrics:
//! - quadric accumulation with optional attribute functionals
//! - an edge table keyed by unordered point-id pairs
//! - a priority-queue-driven collapse loop

pub mod quadric;
pub mod edge_table;
pub mod decimate;

pub use quadric::*;
pub use edge_table::*;
pub use decimate::*;
