//! Priority-queue-driven edge collapse
//!
//! The engine repeatedly pops the cheapest edge, relocates its first
//! endpoint to the precomputed target point, merges the endpoint
//! quadrics, rewrites the incident cells, and eagerly refreshes every
//! edge whose cost the collapse invalidated. It stops when the queue
//! empties, the next cost reaches `max_cost`, or the collapse budget
//! is spent.

use crate::edge_table::EdgeTable;
use crate::quadric::{
    build_point_quadrics, solve_collapse, AttributeBuffer, CollapseTarget, Quadric,
};
use decimesh_core::{
    AttributeArray, AttributeSet, Error, GlobalIds, MeshTopology, Point3f, Result, TriangleMesh,
};
use nalgebra::Vector3;
use priority_queue::PriorityQueue;
use std::cmp::Ordering;

const INVALID: usize = usize::MAX;

// ============================================================
// Collapse Cost for Priority Queue
// ============================================================

#[derive(Debug, Clone, Copy)]
struct CollapseCost {
    cost: f64,
}

impl PartialEq for CollapseCost {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}
impl Eq for CollapseCost {}

impl PartialOrd for CollapseCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollapseCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest cost first
        other.cost.total_cmp(&self.cost)
    }
}

// ============================================================
// Configuration & Result
// ============================================================

/// Quadric error metric decimation filter.
///
/// A pure function from (input mesh + this configuration) to an output
/// mesh: the input is never modified.
#[derive(Debug, Clone)]
pub struct QuadricDecimation {
    /// Stop once the cheapest remaining collapse costs at least this much
    pub max_cost: f64,
    /// Hard ceiling on the number of collapses; `None` means 3x the
    /// input triangle count
    pub max_collapsed_edges: Option<usize>,
    /// Fold point attributes into the error metric and solve merged
    /// attribute values alongside merged positions
    pub attribute_errors: bool,
}

impl Default for QuadricDecimation {
    fn default() -> Self {
        Self {
            max_cost: 0.1,
            max_collapsed_edges: None,
            attribute_errors: false,
        }
    }
}

impl QuadricDecimation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(
        max_cost: f64,
        max_collapsed_edges: Option<usize>,
        attribute_errors: bool,
    ) -> Self {
        Self {
            max_cost,
            max_collapsed_edges,
            attribute_errors,
        }
    }

    /// Run the decimation. Fails if the input has no triangle cells or
    /// is otherwise inconsistent; on failure no output is produced.
    pub fn execute(&self, mesh: &TriangleMesh) -> Result<DecimationResult> {
        if mesh.triangles.is_empty() {
            return Err(Error::InvalidData(
                "input mesh has no triangle cells".to_string(),
            ));
        }
        mesh.validate()?;

        let mut engine = CollapseEngine::prepare(mesh, self.attribute_errors)?;

        let limit = self
            .max_collapsed_edges
            .unwrap_or(3 * mesh.triangle_count());
        let mut collapse_costs = Vec::new();
        let mut debug_edges = Vec::new();

        while let Some((edge, priority)) = engine.queue.pop() {
            let cost = priority.cost;
            if cost >= self.max_cost || collapse_costs.len() >= limit {
                break;
            }
            let (a, b) = engine.table.endpoints(edge);
            if !engine.alive[a] || !engine.alive[b] || engine.table.get(a, b) != Some(edge) {
                // Superseded entry that eager maintenance could not
                // reach through cell adjacency
                continue;
            }
            engine.collapse(edge, a, b, &mut debug_edges);
            collapse_costs.push(cost);
        }

        let mesh = engine.build_output(mesh);
        Ok(DecimationResult {
            mesh,
            collapsed_edges: collapse_costs.len(),
            collapse_costs,
            debug_edges,
        })
    }
}

/// Output of one decimation run.
#[derive(Debug, Clone)]
pub struct DecimationResult {
    /// The reduced mesh
    pub mesh: TriangleMesh,
    /// Number of edge collapses performed
    pub collapsed_edges: usize,
    /// Cost of each accepted collapse, in execution order
    pub collapse_costs: Vec<f64>,
    /// Diagnostic line set: the edges refreshed by the most recent
    /// collapse, as endpoint position pairs
    pub debug_edges: Vec<(Point3f, Point3f)>,
}

// ============================================================
// Engine
// ============================================================

struct CollapseEngine {
    topology: MeshTopology,
    positions: Vec<Vector3<f64>>,
    attributes: Option<AttributeBuffer>,
    /// (offset, components) of the active-normals array within the
    /// interleaved attribute row
    normals_span: Option<(usize, usize)>,
    quadrics: Vec<Quadric>,
    table: EdgeTable,
    /// Solved target point per edge id
    targets: Vec<CollapseTarget>,
    queue: PriorityQueue<usize, CollapseCost>,
    alive: Vec<bool>,
}

impl CollapseEngine {
    /// Build the per-point state, edge table and initial queue for a
    /// validated mesh.
    fn prepare(mesh: &TriangleMesh, attribute_errors: bool) -> Result<Self> {
        let topology = MeshTopology::from_mesh(mesh)?;
        let positions: Vec<Vector3<f64>> = mesh
            .points
            .iter()
            .map(|p| Vector3::new(p.x as f64, p.y as f64, p.z as f64))
            .collect();
        let attributes = if attribute_errors && mesh.point_data.total_components() > 0 {
            Some(AttributeBuffer::gather(&mesh.point_data, mesh.point_count())?)
        } else {
            None
        };
        let normals_span = mesh
            .point_data
            .active_normals
            .as_deref()
            .and_then(|name| mesh.point_data.component_offset(name));
        let quadrics = build_point_quadrics(&positions, &topology, attributes.as_ref())?;

        let alive = vec![true; mesh.point_count()];
        let mut engine = Self {
            topology,
            positions,
            attributes,
            normals_span,
            quadrics,
            table: EdgeTable::new(),
            targets: Vec::new(),
            queue: PriorityQueue::new(),
            alive,
        };
        engine.register_initial_edges();
        Ok(engine)
    }

    /// Discover the edge set from triangle connectivity and schedule
    /// every edge for cost evaluation.
    fn register_initial_edges(&mut self) {
        let mut pairs = Vec::new();
        for (_, tri) in self.topology.live_cells() {
            pairs.push((tri[0], tri[1]));
            pairs.push((tri[1], tri[2]));
            pairs.push((tri[2], tri[0]));
        }
        for (a, b) in pairs {
            self.table.insert(a, b);
        }
        for id in 0..self.table.allocated() {
            self.push_edge(id);
        }
    }

    /// Solve cost and target for an edge and (re)insert it into the
    /// queue, remembering the target under the edge id.
    fn push_edge(&mut self, id: usize) {
        let (a, b) = self.table.endpoints(id);
        let mut target = solve_collapse(
            &self.quadrics[a],
            &self.quadrics[b],
            &self.positions[a],
            &self.positions[b],
        );
        if let Some((offset, len)) = self.normals_span {
            if !target.attributes.is_empty() {
                renormalize(&mut target.attributes[offset..offset + len]);
            }
        }
        let cost = target.cost;
        if self.targets.len() <= id {
            self.targets.resize_with(id + 1, || CollapseTarget {
                position: Vector3::zeros(),
                attributes: Vec::new(),
                cost: 0.0,
            });
        }
        self.targets[id] = target;
        self.queue.push(id, CollapseCost { cost });
    }

    /// Collapse `edge`, merging `p2` into `p1`.
    fn collapse(
        &mut self,
        edge: usize,
        p1: usize,
        p2: usize,
        debug_edges: &mut Vec<(Point3f, Point3f)>,
    ) {
        // Edges whose cost this collapse invalidates, gathered before
        // any topology mutation
        let mut affected: Vec<usize> = Vec::new();
        for v in [p1, p2] {
            for u in self.topology.point_neighbors(v) {
                if let Some(id) = self.table.get(v, u) {
                    if id != edge && !affected.contains(&id) {
                        affected.push(id);
                    }
                }
            }
        }

        // Relocate the surviving endpoint and merge the quadrics
        let target = self.targets[edge].clone();
        self.positions[p1] = target.position;
        if let Some(buffer) = self.attributes.as_mut() {
            buffer.set_row(p1, &target.attributes);
        }
        let q2 = self.quadrics[p2].clone();
        self.quadrics[p1] += &q2;
        self.alive[p2] = false;

        // Cells spanning the collapsed edge degenerate to zero area
        for ci in self.topology.cells_with_edge(p1, p2) {
            self.topology.remove_cell(ci);
        }
        // Remaining cells of p2 get their point reference rewritten;
        // rewrites that duplicate an existing triangle are dropped
        let cells: Vec<usize> = self.topology.point_cells(p2).to_vec();
        for ci in cells {
            self.topology.replace_cell_point(ci, p2, p1);
            if let Some(tri) = self.topology.cell_points(ci) {
                if self.topology.find_triangle(tri, ci).is_some() {
                    self.topology.remove_cell(ci);
                }
            }
        }
        self.topology.debug_validate();

        // Queue maintenance: drop the consumed edge, then re-key or
        // refresh every affected edge
        self.table.remove(p1, p2);
        debug_edges.clear();
        for id in affected {
            self.queue.remove(&id);
            let (a, b) = self.table.endpoints(id);
            let refreshed = if a == p2 || b == p2 {
                let other = if a == p2 { b } else { a };
                self.table.remove(a, b);
                if other == p1 || self.table.get(other, p1).is_some() {
                    // The re-keyed adjacency already exists; this edge
                    // is superseded and simply disappears
                    None
                } else if self.topology.cells_with_edge(other, p1).is_empty() {
                    None
                } else {
                    Some(self.table.insert(other, p1).0)
                }
            } else if self.topology.cells_with_edge(a, b).is_empty() {
                // An edge stripped of its last supporting cell is
                // unregistered; its cost could never be refreshed
                // through cell adjacency again
                self.table.remove(a, b);
                None
            } else {
                Some(id)
            };
            if let Some(id) = refreshed {
                self.push_edge(id);
                let (a, b) = self.table.endpoints(id);
                debug_edges.push((to_point3f(&self.positions[a]), to_point3f(&self.positions[b])));
            }
        }
    }

    /// Copy the surviving cells and the points they reference into a
    /// fresh mesh, remapping connectivity and subsetting attributes.
    fn build_output(&self, input: &TriangleMesh) -> TriangleMesh {
        let n = self.positions.len();
        let mut used = vec![false; n];
        let mut survivors: Vec<(usize, [usize; 3])> = Vec::new();
        for (ci, tri) in self.topology.live_cells() {
            for p in tri {
                used[p] = true;
            }
            survivors.push((ci, tri));
        }

        let mut remap = vec![INVALID; n];
        let mut points = Vec::new();
        for p in 0..n {
            if used[p] {
                remap[p] = points.len();
                points.push(to_point3f(&self.positions[p]));
            }
        }
        let triangles: Vec<[usize; 3]> = survivors
            .iter()
            .map(|(_, tri)| [remap[tri[0]], remap[tri[1]], remap[tri[2]]])
            .collect();

        let mut out = TriangleMesh::from_points_and_triangles(points, triangles);

        // Point attributes: from the interleaved buffer when attribute
        // tracking rewrote them, otherwise from the input arrays
        let mut offset = 0;
        for array in &input.point_data.arrays {
            let mut values = Vec::new();
            for p in 0..n {
                if !used[p] {
                    continue;
                }
                match &self.attributes {
                    Some(buffer) => {
                        let row = buffer.row(p);
                        values.extend(
                            row[offset..offset + array.components]
                                .iter()
                                .map(|&v| v as f32),
                        );
                    }
                    None => values.extend_from_slice(array.tuple(p)),
                }
            }
            out.point_data.arrays.push(AttributeArray::from_values(
                array.name.clone(),
                array.components,
                values,
            ));
            offset += array.components;
        }
        copy_designations(&input.point_data, &mut out.point_data);
        if let Some(ids) = &input.point_data.global_ids {
            let values = (0..n).filter(|&p| used[p]).map(|p| ids.values[p]).collect();
            out.point_data.global_ids = Some(GlobalIds::new(ids.name.clone(), values));
        }

        // Cell attributes: subset the surviving rows in output order
        for array in &input.cell_data.arrays {
            let mut values = Vec::new();
            for (ci, _) in &survivors {
                values.extend_from_slice(array.tuple(*ci));
            }
            out.cell_data.arrays.push(AttributeArray::from_values(
                array.name.clone(),
                array.components,
                values,
            ));
        }
        copy_designations(&input.cell_data, &mut out.cell_data);
        if let Some(ids) = &input.cell_data.global_ids {
            let values = survivors.iter().map(|(ci, _)| ids.values[*ci]).collect();
            out.cell_data.global_ids = Some(GlobalIds::new(ids.name.clone(), values));
        }

        out
    }
}

fn copy_designations(from: &AttributeSet, to: &mut AttributeSet) {
    to.active_scalars = from.active_scalars.clone();
    to.active_vectors = from.active_vectors.clone();
    to.active_normals = from.active_normals.clone();
    to.active_tcoords = from.active_tcoords.clone();
    to.active_tensors = from.active_tensors.clone();
}

fn renormalize(v: &mut [f64]) {
    let norm = v.iter().map(|c| c * c).sum::<f64>().sqrt();
    if norm > 1e-12 {
        for c in v.iter_mut() {
            *c /= norm;
        }
    }
}

fn to_point3f(v: &Vector3<f64>) -> Point3f {
    Point3f::new(v.x as f32, v.y as f32, v.z as f32)
}
