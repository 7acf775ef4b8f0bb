//! Error quadrics
//!
//! Each point carries an accumulated error quadric: a symmetric 3x3
//! geometric block, a linear term, a scalar term, the accumulated
//! triangle weight, the incidence count, and (when attribute tracking
//! is on) one homogeneous 4-vector per attribute component describing
//! the area-weighted linear functional position -> attribute value.
//!
//! Merging two points sums their quadrics field-wise, so the quadric of
//! a merged point is exactly the sum of its ancestors'.

use decimesh_core::{AttributeSet, MeshTopology, Result, Error};
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use std::ops::AddAssign;

/// Squared-length threshold below which a face normal is treated as
/// degenerate and the triangle contributes nothing.
const DEGENERATE_NORMAL2: f64 = 1e-30;

/// Per-point error accumulator.
#[derive(Debug, Clone)]
pub struct Quadric {
    /// Symmetric geometric block, sum of weighted n*n^T (plus attribute
    /// gradient outer products when attributes are tracked)
    pub a: Matrix3<f64>,
    /// Linear term, sum of weighted d*n
    pub b: Vector3<f64>,
    /// Scalar term, sum of weighted d^2
    pub c: f64,
    /// Accumulated triangle weight (quarter squared areas)
    pub weight: f64,
    /// Number of incident triangles accumulated
    pub count: u32,
    /// One weighted homogeneous functional per attribute component
    pub attr: Vec<Vector4<f64>>,
}

impl Quadric {
    /// Zero quadric tracking `components` attribute components
    pub fn new(components: usize) -> Self {
        Self {
            a: Matrix3::zeros(),
            b: Vector3::zeros(),
            c: 0.0,
            weight: 0.0,
            count: 0,
            attr: vec![Vector4::zeros(); components],
        }
    }

    /// Evaluate the accumulated squared error at a position, with the
    /// attribute components eliminated at their per-position optimum.
    pub fn evaluate(&self, x: &Vector3<f64>) -> f64 {
        let mut cost = (x.transpose() * self.a * x)[0] + 2.0 * self.b.dot(x) + self.c;
        if !self.attr.is_empty() && self.weight > 0.0 {
            for v in &self.attr {
                let f = v.xyz().dot(x) + v.w;
                cost -= f * f / self.weight;
            }
        }
        cost.max(0.0)
    }

    /// Optimal value of each attribute component at a position
    pub fn attribute_values(&self, x: &Vector3<f64>) -> Vec<f64> {
        if self.weight <= 0.0 {
            return vec![0.0; self.attr.len()];
        }
        self.attr
            .iter()
            .map(|v| (v.xyz().dot(x) + v.w) / self.weight)
            .collect()
    }
}

impl AddAssign<&Quadric> for Quadric {
    fn add_assign(&mut self, rhs: &Quadric) {
        debug_assert_eq!(self.attr.len(), rhs.attr.len());
        self.a += rhs.a;
        self.b += rhs.b;
        self.c += rhs.c;
        self.weight += rhs.weight;
        self.count += rhs.count;
        for (v, r) in self.attr.iter_mut().zip(&rhs.attr) {
            *v += *r;
        }
    }
}

/// Interleaved per-point attribute values in accumulation precision.
///
/// One row per point, `width` components per row, laid out by
/// concatenating the attribute set's arrays in order.
#[derive(Debug, Clone)]
pub struct AttributeBuffer {
    pub width: usize,
    pub values: Vec<f64>,
}

impl AttributeBuffer {
    /// Gather an attribute set into interleaved rows.
    pub fn gather(set: &AttributeSet, point_count: usize) -> Result<Self> {
        set.validate(point_count)?;
        let width = set.total_components();
        let mut values = vec![0.0; point_count * width];
        let mut offset = 0;
        for array in &set.arrays {
            for i in 0..point_count {
                let row = i * width + offset;
                for (k, &v) in array.tuple(i).iter().enumerate() {
                    values[row + k] = v as f64;
                }
            }
            offset += array.components;
        }
        Ok(Self { width, values })
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.width..(i + 1) * self.width]
    }

    pub fn set_row(&mut self, i: usize, row: &[f64]) {
        debug_assert_eq!(row.len(), self.width);
        self.values[i * self.width..(i + 1) * self.width].copy_from_slice(row);
    }
}

/// Compute the initial error quadric of every point.
///
/// For each live triangle the fundamental plane quadric, scaled by the
/// squared-area proxy `0.25 * |n_raw|^2`, is accumulated into all three
/// corner quadrics. When an attribute buffer is supplied, the linear
/// functional of each attribute component over the triangle is solved
/// from the 4x4 system (three vertex rows plus the normal row) and
/// accumulated alongside.
pub fn build_point_quadrics(
    positions: &[Vector3<f64>],
    topology: &MeshTopology,
    attributes: Option<&AttributeBuffer>,
) -> Result<Vec<Quadric>> {
    if positions.len() != topology.point_count() {
        return Err(Error::InvalidData(format!(
            "{} positions for a topology over {} points",
            positions.len(),
            topology.point_count()
        )));
    }
    let width = attributes.map_or(0, |a| a.width);
    let mut quadrics = vec![Quadric::new(width); positions.len()];

    for (_, tri) in topology.live_cells() {
        let v0 = positions[tri[0]];
        let v1 = positions[tri[1]];
        let v2 = positions[tri[2]];

        let raw = (v1 - v0).cross(&(v2 - v0));
        let norm2 = raw.norm_squared();
        if norm2 < DEGENERATE_NORMAL2 {
            // Zero-area triangle: zero weight, nothing to accumulate
            continue;
        }
        let area2 = 0.25 * norm2;
        let n = raw / norm2.sqrt();
        let d = -n.dot(&v0);

        let mut contrib = Quadric::new(width);
        contrib.a = area2 * n * n.transpose();
        contrib.b = area2 * d * n;
        contrib.c = area2 * d * d;
        contrib.weight = area2;
        contrib.count = 1;

        if let Some(buffer) = attributes {
            if width > 0 {
                accumulate_attribute_functionals(
                    &mut contrib,
                    &[v0, v1, v2],
                    &n,
                    [buffer.row(tri[0]), buffer.row(tri[1]), buffer.row(tri[2])],
                    area2,
                );
            }
        }

        for p in tri {
            quadrics[p] += &contrib;
        }
    }
    Ok(quadrics)
}

/// Solve, per attribute component, the linear functional f(x) = g.x + d
/// matching the three vertex values with zero gradient along the
/// normal, and fold it into the triangle's contribution quadric.
fn accumulate_attribute_functionals(
    contrib: &mut Quadric,
    verts: &[Vector3<f64>; 3],
    normal: &Vector3<f64>,
    rows: [&[f64]; 3],
    area2: f64,
) {
    let m = Matrix4::new(
        verts[0].x, verts[0].y, verts[0].z, 1.0,
        verts[1].x, verts[1].y, verts[1].z, 1.0,
        verts[2].x, verts[2].y, verts[2].z, 1.0,
        normal.x, normal.y, normal.z, 0.0,
    );
    let lu = m.lu();

    for k in 0..contrib.attr.len() {
        let rhs = Vector4::new(rows[0][k], rows[1][k], rows[2][k], 0.0);
        let Some(sol) = lu.solve(&rhs) else {
            // Ill-conditioned vertex frame: skip this component
            continue;
        };
        let g = sol.xyz();
        let d = sol.w;
        contrib.a += area2 * g * g.transpose();
        contrib.b += area2 * d * g;
        contrib.c += area2 * d * d;
        contrib.attr[k] += area2 * Vector4::new(g.x, g.y, g.z, d);
    }
}

/// Result of the cost/target solve for one edge.
#[derive(Debug, Clone)]
pub struct CollapseTarget {
    /// Optimal merged position
    pub position: Vector3<f64>,
    /// Merged attribute vector (empty when attributes are not tracked)
    pub attributes: Vec<f64>,
    /// Expected squared error of collapsing to `position`
    pub cost: f64,
}

/// Solve for the optimal merged point of an edge and its collapse cost.
///
/// The two endpoint quadrics are summed into a local scratch quadric;
/// the stored per-point quadrics are never mutated here. When the
/// reduced 3x3 system is singular the cheapest of endpoint1, midpoint
/// and endpoint2 is used instead.
pub fn solve_collapse(
    q1: &Quadric,
    q2: &Quadric,
    p1: &Vector3<f64>,
    p2: &Vector3<f64>,
) -> CollapseTarget {
    let mut quad = q1.clone();
    quad += q2;

    let mut m = quad.a;
    let mut rhs = -quad.b;
    if !quad.attr.is_empty() && quad.weight > 0.0 {
        for v in &quad.attr {
            let g = v.xyz();
            m -= g * g.transpose() / quad.weight;
            rhs += v.w * g / quad.weight;
        }
    }

    let solved = m
        .try_inverse()
        .map(|inv| inv * rhs)
        .filter(|x| x.iter().all(|c| c.is_finite()));

    let position = match solved {
        Some(x) => x,
        None => {
            // Singular system: pick the cheapest of the three obvious
            // candidates rather than rejecting the edge.
            let mid = (p1 + p2) * 0.5;
            let mut best = *p1;
            let mut best_cost = quad.evaluate(p1);
            for cand in [mid, *p2] {
                let cost = quad.evaluate(&cand);
                if cost < best_cost {
                    best = cand;
                    best_cost = cost;
                }
            }
            best
        }
    };

    let cost = quad.evaluate(&position);
    let attributes = quad.attribute_values(&position);
    CollapseTarget {
        position,
        attributes,
        cost,
    }
}
