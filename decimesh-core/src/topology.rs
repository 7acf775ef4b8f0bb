//! Mutable triangle adjacency structure
//!
//! `MeshTopology` keeps cell->point and point->cell adjacency in both
//! directions: an arena of 3-point cell records plus one incidence list
//! per point. Cells can be removed and a cell's point reference can be
//! swapped to another point id; the incidence lists are updated in the
//! same operation, so the two directions never disagree. The mutators
//! carry `debug_assert` checks for that invariant.

use crate::error::{Error, Result};
use crate::mesh::TriangleMesh;

/// One cell record in the arena. Dead cells stay in place so cell ids
/// remain stable for the lifetime of the structure.
#[derive(Debug, Clone, Copy)]
struct Cell {
    points: [usize; 3],
    alive: bool,
}

/// Point/cell adjacency for a triangle mesh, mutable in place.
#[derive(Debug, Clone)]
pub struct MeshTopology {
    cells: Vec<Cell>,
    point_cells: Vec<Vec<usize>>,
    live_count: usize,
}

impl MeshTopology {
    /// Build adjacency from a mesh's connectivity.
    ///
    /// Fails if any triangle references an out-of-range point or has
    /// repeated point ids.
    pub fn from_mesh(mesh: &TriangleMesh) -> Result<Self> {
        Self::from_triangles(mesh.point_count(), &mesh.triangles)
    }

    /// Build adjacency from raw triangle connectivity.
    pub fn from_triangles(point_count: usize, triangles: &[[usize; 3]]) -> Result<Self> {
        let mut cells = Vec::with_capacity(triangles.len());
        let mut point_cells = vec![Vec::new(); point_count];

        for (ci, tri) in triangles.iter().enumerate() {
            for &p in tri {
                if p >= point_count {
                    return Err(Error::InvalidData(format!(
                        "triangle {ci} references point {p} but only {point_count} points exist"
                    )));
                }
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[2] == tri[0] {
                return Err(Error::InvalidData(format!(
                    "triangle {ci} has repeated point ids {tri:?}"
                )));
            }
            cells.push(Cell {
                points: *tri,
                alive: true,
            });
            for &p in tri {
                point_cells[p].push(ci);
            }
        }

        Ok(Self {
            live_count: cells.len(),
            cells,
            point_cells,
        })
    }

    /// Number of points the structure was built over
    pub fn point_count(&self) -> usize {
        self.point_cells.len()
    }

    /// Number of live cells
    pub fn live_cell_count(&self) -> usize {
        self.live_count
    }

    /// Whether a cell is still live
    pub fn is_live(&self, cell: usize) -> bool {
        self.cells.get(cell).is_some_and(|c| c.alive)
    }

    /// Point ids of a live cell
    pub fn cell_points(&self, cell: usize) -> Option<[usize; 3]> {
        let c = self.cells.get(cell)?;
        c.alive.then_some(c.points)
    }

    /// Live cells incident to a point
    pub fn point_cells(&self, point: usize) -> &[usize] {
        &self.point_cells[point]
    }

    /// Iterate over (cell id, point ids) of all live cells in id order
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, [usize; 3])> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.alive)
            .map(|(i, c)| (i, c.points))
    }

    /// Distinct point ids adjacent to `point` through live cells
    pub fn point_neighbors(&self, point: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for &ci in &self.point_cells[point] {
            for p in self.cells[ci].points {
                if p != point && !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// Live cells containing both endpoints of an edge
    pub fn cells_with_edge(&self, a: usize, b: usize) -> Vec<usize> {
        self.point_cells[a]
            .iter()
            .copied()
            .filter(|&ci| self.cells[ci].points.contains(&b))
            .collect()
    }

    /// Find a live cell whose point set equals the given triangle,
    /// ignoring winding, excluding `skip`.
    pub fn find_triangle(&self, tri: [usize; 3], skip: usize) -> Option<usize> {
        self.point_cells[tri[0]]
            .iter()
            .copied()
            .find(|&ci| {
                ci != skip
                    && tri.iter().all(|p| self.cells[ci].points.contains(p))
            })
    }

    /// Remove a cell, dropping it from its points' incidence lists.
    pub fn remove_cell(&mut self, cell: usize) {
        debug_assert!(self.cells[cell].alive, "remove_cell on dead cell {cell}");
        let points = self.cells[cell].points;
        self.cells[cell].alive = false;
        self.live_count -= 1;
        for p in points {
            let list = &mut self.point_cells[p];
            if let Some(pos) = list.iter().position(|&ci| ci == cell) {
                list.swap_remove(pos);
            } else {
                debug_assert!(false, "cell {cell} missing from incidence list of point {p}");
            }
        }
    }

    /// Rewrite one point reference of a live cell from `old` to `new`,
    /// moving the incidence entry along with it.
    pub fn replace_cell_point(&mut self, cell: usize, old: usize, new: usize) {
        debug_assert!(self.cells[cell].alive, "replace_cell_point on dead cell");
        debug_assert_ne!(old, new);
        let c = &mut self.cells[cell];
        let Some(slot) = c.points.iter().position(|&p| p == old) else {
            debug_assert!(false, "cell {cell} does not reference point {old}");
            return;
        };
        c.points[slot] = new;

        let list = &mut self.point_cells[old];
        if let Some(pos) = list.iter().position(|&ci| ci == cell) {
            list.swap_remove(pos);
        } else {
            debug_assert!(false, "cell {cell} missing from incidence list of point {old}");
        }
        self.point_cells[new].push(cell);
    }

    /// Check that incidence lists and cell records agree. Debug builds
    /// only; compiles to nothing in release.
    pub fn debug_validate(&self) {
        #[cfg(debug_assertions)]
        {
            let mut live = 0;
            for (ci, cell) in self.cells.iter().enumerate() {
                if !cell.alive {
                    continue;
                }
                live += 1;
                for p in cell.points {
                    assert!(
                        self.point_cells[p].contains(&ci),
                        "cell {ci} not listed for point {p}"
                    );
                }
            }
            assert_eq!(live, self.live_count);
            for (p, list) in self.point_cells.iter().enumerate() {
                for &ci in list {
                    assert!(self.cells[ci].alive, "dead cell {ci} listed for point {p}");
                    assert!(self.cells[ci].points.contains(&p));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> MeshTopology {
        // Quad split along the diagonal 1-2
        MeshTopology::from_triangles(4, &[[0, 1, 2], [1, 3, 2]]).unwrap()
    }

    #[test]
    fn test_construction() {
        let topo = two_triangles();
        assert_eq!(topo.live_cell_count(), 2);
        assert_eq!(topo.point_cells(1), &[0, 1]);
        assert_eq!(topo.point_cells(0), &[0]);
        assert_eq!(topo.cell_points(1), Some([1, 3, 2]));
        topo.debug_validate();
    }

    #[test]
    fn test_invalid_input() {
        assert!(MeshTopology::from_triangles(3, &[[0, 1, 3]]).is_err());
        assert!(MeshTopology::from_triangles(3, &[[0, 1, 1]]).is_err());
    }

    #[test]
    fn test_cells_with_edge() {
        let topo = two_triangles();
        assert_eq!(topo.cells_with_edge(1, 2).len(), 2);
        assert_eq!(topo.cells_with_edge(0, 1), vec![0]);
        assert!(topo.cells_with_edge(0, 3).is_empty());
    }

    #[test]
    fn test_point_neighbors() {
        let topo = two_triangles();
        let mut n = topo.point_neighbors(1);
        n.sort_unstable();
        assert_eq!(n, vec![0, 2, 3]);
    }

    #[test]
    fn test_remove_cell() {
        let mut topo = two_triangles();
        topo.remove_cell(0);
        assert_eq!(topo.live_cell_count(), 1);
        assert!(!topo.is_live(0));
        assert!(topo.cell_points(0).is_none());
        assert!(topo.point_cells(0).is_empty());
        assert_eq!(topo.point_cells(1), &[1]);
        topo.debug_validate();
    }

    #[test]
    fn test_replace_cell_point() {
        let mut topo = two_triangles();
        // Collapse point 3 into point 0: cell 1 becomes [1, 0, 2]
        topo.replace_cell_point(1, 3, 0);
        assert_eq!(topo.cell_points(1), Some([1, 0, 2]));
        assert!(topo.point_cells(3).is_empty());
        assert!(topo.point_cells(0).contains(&1));
        topo.debug_validate();
    }

    #[test]
    fn test_find_triangle() {
        let mut topo = two_triangles();
        // Rewriting cell 1's point 3 to 0 duplicates cell 0's point set
        topo.replace_cell_point(1, 3, 0);
        assert_eq!(topo.find_triangle([1, 0, 2], 1), Some(0));
        assert_eq!(topo.find_triangle([1, 0, 2], 0), Some(1));
    }
}
