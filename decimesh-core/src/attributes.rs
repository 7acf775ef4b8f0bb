//! Named attribute arrays and the per-point / per-cell attribute bundle
//!
//! Attributes are stored as flat, tuple-major `f32` arrays with a fixed
//! component count, discovered once at the start of a run. The bundle
//! additionally carries "active" designations (which array currently
//! plays the role of scalars, vectors, normals, texture coordinates or
//! tensors) and an optional global-id array with integer identity
//! semantics.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A named attribute array with a fixed number of components per tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeArray {
    pub name: String,
    pub components: usize,
    pub values: Vec<f32>,
}

impl AttributeArray {
    /// Create a new empty attribute array
    pub fn new(name: impl Into<String>, components: usize) -> Self {
        Self {
            name: name.into(),
            components,
            values: Vec::new(),
        }
    }

    /// Create an attribute array from flat tuple-major values
    pub fn from_values(name: impl Into<String>, components: usize, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            components,
            values,
        }
    }

    /// Number of tuples in the array
    pub fn len(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.values.len() / self.components
        }
    }

    /// Check if the array has no tuples
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the i-th tuple as a slice
    pub fn tuple(&self, i: usize) -> &[f32] {
        &self.values[i * self.components..(i + 1) * self.components]
    }

    /// Overwrite the i-th tuple
    pub fn set_tuple(&mut self, i: usize, tuple: &[f32]) {
        debug_assert_eq!(tuple.len(), self.components);
        self.values[i * self.components..(i + 1) * self.components].copy_from_slice(tuple);
    }

    /// Append a tuple
    pub fn push_tuple(&mut self, tuple: &[f32]) {
        debug_assert_eq!(tuple.len(), self.components);
        self.values.extend_from_slice(tuple);
    }
}

/// An integer identity array (global point or cell ids).
///
/// Kept apart from the float attribute arrays because ids carry exact
/// identity semantics, not interpolatable values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalIds {
    pub name: String,
    pub values: Vec<u64>,
}

impl GlobalIds {
    pub fn new(name: impl Into<String>, values: Vec<u64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// The attribute bundle attached to the points or cells of a mesh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeSet {
    pub arrays: Vec<AttributeArray>,
    /// Name of the array playing the active-scalars role, if any
    pub active_scalars: Option<String>,
    pub active_vectors: Option<String>,
    pub active_normals: Option<String>,
    pub active_tcoords: Option<String>,
    pub active_tensors: Option<String>,
    /// Global ids, preserved through concatenation but invalidated by welding
    pub global_ids: Option<GlobalIds>,
}

impl AttributeSet {
    /// Create a new empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an array by name
    pub fn array(&self, name: &str) -> Option<&AttributeArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    /// Look up an array by name, mutably
    pub fn array_mut(&mut self, name: &str) -> Option<&mut AttributeArray> {
        self.arrays.iter_mut().find(|a| a.name == name)
    }

    /// Add an array, replacing any existing array of the same name
    pub fn add_array(&mut self, array: AttributeArray) {
        if let Some(existing) = self.array_mut(&array.name) {
            *existing = array;
        } else {
            self.arrays.push(array);
        }
    }

    /// Total number of components summed over all arrays
    pub fn total_components(&self) -> usize {
        self.arrays.iter().map(|a| a.components).sum()
    }

    /// Check if the set carries no arrays and no global ids
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty() && self.global_ids.is_none()
    }

    /// Offset (in components) of a named array within the
    /// interleaved tuple formed by concatenating all arrays in order.
    pub fn component_offset(&self, name: &str) -> Option<(usize, usize)> {
        let mut offset = 0;
        for a in &self.arrays {
            if a.name == name {
                return Some((offset, a.components));
            }
            offset += a.components;
        }
        None
    }

    /// Validate that every array (and the global-id array) has exactly
    /// `expected` tuples and that active designations name real arrays.
    pub fn validate(&self, expected: usize) -> Result<()> {
        for a in &self.arrays {
            if a.components == 0 {
                return Err(Error::InvalidData(format!(
                    "attribute array '{}' has zero components",
                    a.name
                )));
            }
            if a.values.len() != expected * a.components {
                return Err(Error::InvalidData(format!(
                    "attribute array '{}' has {} values, expected {} ({} tuples x {} components)",
                    a.name,
                    a.values.len(),
                    expected * a.components,
                    expected,
                    a.components
                )));
            }
        }
        if let Some(ids) = &self.global_ids {
            if ids.values.len() != expected {
                return Err(Error::InvalidData(format!(
                    "global id array '{}' has {} values, expected {}",
                    ids.name,
                    ids.values.len(),
                    expected
                )));
            }
        }
        for active in [
            &self.active_scalars,
            &self.active_vectors,
            &self.active_normals,
            &self.active_tcoords,
            &self.active_tensors,
        ]
        .into_iter()
        .flatten()
        {
            if self.array(active).is_none() {
                return Err(Error::InvalidData(format!(
                    "active attribute designation '{active}' names no array"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_tuples() {
        let mut a = AttributeArray::new("uv", 2);
        a.push_tuple(&[0.0, 1.0]);
        a.push_tuple(&[0.5, 0.25]);
        assert_eq!(a.len(), 2);
        assert_eq!(a.tuple(1), &[0.5, 0.25]);

        a.set_tuple(0, &[2.0, 3.0]);
        assert_eq!(a.tuple(0), &[2.0, 3.0]);
    }

    #[test]
    fn test_add_array_replaces_by_name() {
        let mut set = AttributeSet::new();
        set.add_array(AttributeArray::from_values("t", 1, vec![1.0]));
        set.add_array(AttributeArray::from_values("t", 1, vec![2.0]));
        assert_eq!(set.arrays.len(), 1);
        assert_eq!(set.array("t").unwrap().values, vec![2.0]);
    }

    #[test]
    fn test_component_offset() {
        let mut set = AttributeSet::new();
        set.add_array(AttributeArray::new("s", 1));
        set.add_array(AttributeArray::new("n", 3));
        set.add_array(AttributeArray::new("uv", 2));
        assert_eq!(set.component_offset("s"), Some((0, 1)));
        assert_eq!(set.component_offset("n"), Some((1, 3)));
        assert_eq!(set.component_offset("uv"), Some((4, 2)));
        assert_eq!(set.component_offset("missing"), None);
        assert_eq!(set.total_components(), 6);
    }

    #[test]
    fn test_validate_lengths() {
        let mut set = AttributeSet::new();
        set.add_array(AttributeArray::from_values("s", 1, vec![1.0, 2.0, 3.0]));
        assert!(set.validate(3).is_ok());
        assert!(set.validate(4).is_err());

        set.global_ids = Some(GlobalIds::new("gid", vec![10, 20]));
        assert!(set.validate(3).is_err());
    }

    #[test]
    fn test_validate_active_designation() {
        let mut set = AttributeSet::new();
        set.add_array(AttributeArray::from_values("temp", 1, vec![0.0]));
        set.active_scalars = Some("temp".to_string());
        assert!(set.validate(1).is_ok());

        set.active_normals = Some("missing".to_string());
        assert!(set.validate(1).is_err());
    }
}
