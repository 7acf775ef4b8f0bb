//! Mesh data structures and functionality

use crate::attributes::AttributeSet;
use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with per-point and per-cell attribute bundles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub points: Vec<Point3f>,
    pub triangles: Vec<[usize; 3]>,
    pub point_data: AttributeSet,
    pub cell_data: AttributeSet,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from point positions and triangle connectivity
    pub fn from_points_and_triangles(points: Vec<Point3f>, triangles: Vec<[usize; 3]>) -> Self {
        Self {
            points,
            triangles,
            point_data: AttributeSet::new(),
            cell_data: AttributeSet::new(),
        }
    }

    /// Get the number of points
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check if the mesh has no points or no triangles
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() || self.triangles.is_empty()
    }

    /// Add a point, returning its index
    pub fn add_point(&mut self, point: Point3f) -> usize {
        let index = self.points.len();
        self.points.push(point);
        index
    }

    /// Add a triangle
    pub fn add_triangle(&mut self, triangle: [usize; 3]) {
        self.triangles.push(triangle);
    }

    /// Calculate per-triangle unit normals
    pub fn triangle_normals(&self) -> Vec<Vector3f> {
        self.triangles
            .iter()
            .map(|tri| {
                let v0 = self.points[tri[0]];
                let v1 = self.points[tri[1]];
                let v2 = self.points[tri[2]];
                (v1 - v0).cross(&(v2 - v0)).normalize()
            })
            .collect()
    }

    /// Validate connectivity and attribute consistency.
    ///
    /// Every triangle must reference three distinct, in-range point
    /// ids, and every attribute array must have one tuple per point
    /// (or per cell for cell data).
    pub fn validate(&self) -> Result<()> {
        let np = self.points.len();
        for (ci, tri) in self.triangles.iter().enumerate() {
            for &p in tri {
                if p >= np {
                    return Err(Error::InvalidData(format!(
                        "triangle {ci} references point {p} but the mesh has {np} points"
                    )));
                }
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[2] == tri[0] {
                return Err(Error::InvalidData(format!(
                    "triangle {ci} has repeated point ids {tri:?}"
                )));
            }
        }
        self.point_data.validate(self.points.len())?;
        self.cell_data.validate(self.triangles.len())?;
        Ok(())
    }
}
