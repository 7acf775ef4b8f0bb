//! Append filter
//!
//! Concatenates the geometry of N meshes in input order, carrying an
//! attribute array through only when every input provides it under the
//! same name with the same component count. Dropped arrays and other
//! non-fatal conditions are reported through the returned warning list
//! rather than any global state.

use crate::weld::{weld_by_global_ids, weld_by_tolerance};
use decimesh_core::{
    AttributeArray, AttributeSet, Bounded, Error, GlobalIds, Result, TriangleMesh,
};

/// How appended points are unified.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PointMerging {
    /// Plain concatenation, no points are merged
    #[default]
    None,
    /// Weld points within a spatial tolerance, absolute or relative to
    /// the bounding-box diagonal of the combined input
    Tolerance { tolerance: f64, relative: bool },
    /// Weld points sharing the same global id
    GlobalIds,
}

/// Appends N triangle meshes into one.
#[derive(Debug, Clone, Default)]
pub struct AppendFilter {
    pub merging: PointMerging,
}

/// Output mesh plus the non-fatal diagnostics gathered along the way.
#[derive(Debug, Clone)]
pub struct AppendOutput {
    pub mesh: TriangleMesh,
    pub warnings: Vec<String>,
}

impl AppendFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merging(merging: PointMerging) -> Self {
        Self { merging }
    }

    /// Append the inputs in order. Zero inputs produce an empty mesh.
    pub fn execute(&self, inputs: &[&TriangleMesh]) -> Result<AppendOutput> {
        let mut warnings = Vec::new();
        if inputs.is_empty() {
            return Ok(AppendOutput {
                mesh: TriangleMesh::new(),
                warnings,
            });
        }
        for (i, input) in inputs.iter().enumerate() {
            input
                .validate()
                .map_err(|e| Error::InvalidData(format!("append input {i}: {e}")))?;
        }

        let mut mesh = TriangleMesh::new();
        for input in inputs {
            let offset = mesh.points.len();
            mesh.points.extend_from_slice(&input.points);
            mesh.triangles.extend(
                input
                    .triangles
                    .iter()
                    .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
            );
        }

        mesh.point_data = intersect_attributes(inputs, |m| &m.point_data, "point", &mut warnings);
        mesh.cell_data = intersect_attributes(inputs, |m| &m.cell_data, "cell", &mut warnings);
        mesh.point_data.global_ids =
            concat_global_ids(inputs, |m| &m.point_data, "point", &mut warnings);
        mesh.cell_data.global_ids =
            concat_global_ids(inputs, |m| &m.cell_data, "cell", &mut warnings);

        match self.merging {
            PointMerging::None => {}
            PointMerging::Tolerance {
                tolerance,
                relative,
            } => {
                let tolerance = if relative {
                    tolerance * mesh.diagonal_length() as f64
                } else {
                    tolerance
                };
                let rep = weld_by_tolerance(&mesh.points, tolerance);
                apply_point_merge(&mut mesh, &rep);
                // Merged point identity invalidates the original ids
                mesh.point_data.global_ids = None;
            }
            PointMerging::GlobalIds => match mesh.point_data.global_ids.take() {
                Some(ids) => {
                    let rep = weld_by_global_ids(&ids.values);
                    apply_point_merge(&mut mesh, &rep);
                }
                None => {
                    warnings.push(
                        "point merging by global ids requested but not every input carries \
                         point global ids; appended without merging"
                            .to_string(),
                    );
                }
            },
        }

        Ok(AppendOutput { mesh, warnings })
    }
}

/// Keep only the arrays every input provides under the same name and
/// component count, concatenated in input order. Active designations
/// propagate only on unanimous agreement.
fn intersect_attributes<'a, F>(
    inputs: &'a [&TriangleMesh],
    accessor: F,
    kind: &str,
    warnings: &mut Vec<String>,
) -> AttributeSet
where
    F: Fn(&'a TriangleMesh) -> &'a AttributeSet,
{
    let mut out = AttributeSet::new();
    let first = accessor(inputs[0]);

    for array in &first.arrays {
        let compatible = inputs.iter().all(|&m| {
            accessor(m)
                .array(&array.name)
                .is_some_and(|a| a.components == array.components)
        });
        if !compatible {
            warnings.push(format!(
                "{kind} array '{}' dropped: missing or mismatched in some input",
                array.name
            ));
            continue;
        }
        let mut values = Vec::new();
        for &m in inputs {
            if let Some(a) = accessor(m).array(&array.name) {
                values.extend_from_slice(&a.values);
            }
        }
        out.arrays.push(AttributeArray::from_values(
            array.name.clone(),
            array.components,
            values,
        ));
    }
    // Arrays that only later inputs carry cannot survive either
    for &m in inputs.iter().skip(1) {
        for array in &accessor(m).arrays {
            if first.array(&array.name).is_none() && out.array(&array.name).is_none() {
                let message = format!(
                    "{kind} array '{}' dropped: missing or mismatched in some input",
                    array.name
                );
                if !warnings.contains(&message) {
                    warnings.push(message);
                }
            }
        }
    }

    out.active_scalars = unanimous(inputs, &accessor, |s| &s.active_scalars, &out);
    out.active_vectors = unanimous(inputs, &accessor, |s| &s.active_vectors, &out);
    out.active_normals = unanimous(inputs, &accessor, |s| &s.active_normals, &out);
    out.active_tcoords = unanimous(inputs, &accessor, |s| &s.active_tcoords, &out);
    out.active_tensors = unanimous(inputs, &accessor, |s| &s.active_tensors, &out);
    out
}

/// An active designation survives only if every input names the same
/// array and that array survived the intersection.
fn unanimous<'a, F, G>(
    inputs: &'a [&TriangleMesh],
    accessor: &F,
    pick: G,
    out: &AttributeSet,
) -> Option<String>
where
    F: Fn(&'a TriangleMesh) -> &'a AttributeSet,
    G: Fn(&AttributeSet) -> &Option<String>,
{
    let name = pick(accessor(inputs[0])).clone()?;
    let agreed = inputs
        .iter()
        .all(|&m| pick(accessor(m)).as_deref() == Some(name.as_str()));
    (agreed && out.array(&name).is_some()).then_some(name)
}

/// Global ids survive concatenation only when every input carries them
/// under the same name.
fn concat_global_ids<'a, F>(
    inputs: &'a [&TriangleMesh],
    accessor: F,
    kind: &str,
    warnings: &mut Vec<String>,
) -> Option<GlobalIds>
where
    F: Fn(&'a TriangleMesh) -> &'a AttributeSet,
{
    let first = accessor(inputs[0]).global_ids.as_ref();
    let any_present = inputs.iter().any(|&m| accessor(m).global_ids.is_some());
    let Some(first) = first else {
        if any_present {
            warnings.push(format!("{kind} global ids dropped: not present in every input"));
        }
        return None;
    };
    let all_same = inputs
        .iter()
        .all(|&m| accessor(m).global_ids.as_ref().is_some_and(|g| g.name == first.name));
    if !all_same {
        warnings.push(format!("{kind} global ids dropped: not present in every input"));
        return None;
    }
    let mut values = Vec::new();
    for &m in inputs {
        if let Some(g) = &accessor(m).global_ids {
            values.extend_from_slice(&g.values);
        }
    }
    Some(GlobalIds::new(first.name.clone(), values))
}

/// Rewrite the mesh in place under a point representative map: compact
/// points in first-appearance order, remap connectivity, and drop
/// triangles left with fewer than three distinct points.
fn apply_point_merge(mesh: &mut TriangleMesh, rep: &[usize]) {
    const INVALID: usize = usize::MAX;
    let n = mesh.points.len();
    let mut remap = vec![INVALID; n];
    let mut kept_points = Vec::new();
    for i in 0..n {
        let r = rep[i];
        if remap[r] == INVALID {
            remap[r] = kept_points.len();
            kept_points.push(r);
        }
        remap[i] = remap[r];
    }

    mesh.points = kept_points.iter().map(|&r| mesh.points[r]).collect();
    for array in &mut mesh.point_data.arrays {
        let mut values = Vec::with_capacity(kept_points.len() * array.components);
        for &r in &kept_points {
            values.extend_from_slice(array.tuple(r));
        }
        array.values = values;
    }
    if let Some(ids) = &mut mesh.point_data.global_ids {
        ids.values = kept_points.iter().map(|&r| ids.values[r]).collect();
    }

    let triangles = std::mem::take(&mut mesh.triangles);
    let mut kept_cells = Vec::new();
    for (ci, tri) in triangles.into_iter().enumerate() {
        let t = [remap[tri[0]], remap[tri[1]], remap[tri[2]]];
        if t[0] == t[1] || t[1] == t[2] || t[2] == t[0] {
            continue;
        }
        mesh.triangles.push(t);
        kept_cells.push(ci);
    }
    for array in &mut mesh.cell_data.arrays {
        let mut values = Vec::with_capacity(kept_cells.len() * array.components);
        for &ci in &kept_cells {
            values.extend_from_slice(array.tuple(ci));
        }
        array.values = values;
    }
    if let Some(ids) = &mut mesh.cell_data.global_ids {
        ids.values = kept_cells.iter().map(|&ci| ids.values[ci]).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decimesh_core::Point3f;

    fn mesh_a() -> TriangleMesh {
        let mut mesh = TriangleMesh::from_points_and_triangles(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        mesh.point_data
            .add_array(AttributeArray::from_values("X", 1, vec![1.0, 2.0, 3.0]));
        mesh.point_data.add_array(AttributeArray::from_values(
            "only_a",
            1,
            vec![9.0, 9.0, 9.0],
        ));
        mesh
    }

    fn mesh_b() -> TriangleMesh {
        // Shares the edge (1,0,0)-(0,1,0) with mesh_a geometrically
        let mut mesh = TriangleMesh::from_points_and_triangles(
            vec![
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
            ],
            vec![[0, 2, 1]],
        );
        mesh.point_data
            .add_array(AttributeArray::from_values("X", 1, vec![4.0, 5.0, 6.0]));
        mesh
    }

    #[test]
    fn test_default_merging_is_none() {
        assert_eq!(AppendFilter::default().merging, PointMerging::None);
        assert_eq!(AppendFilter::new().merging, PointMerging::None);
    }

    #[test]
    fn test_empty_input_list() {
        let out = AppendFilter::new().execute(&[]).unwrap();
        assert!(out.mesh.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_concatenation_order_and_offsets() {
        let a = mesh_a();
        let b = mesh_b();
        let out = AppendFilter::new().execute(&[&a, &b]).unwrap();

        assert_eq!(out.mesh.point_count(), 6);
        assert_eq!(out.mesh.triangle_count(), 2);
        assert_eq!(out.mesh.triangles[0], [0, 1, 2]);
        assert_eq!(out.mesh.triangles[1], [3, 5, 4]);
        out.mesh.validate().unwrap();
    }

    #[test]
    fn test_attribute_intersection() {
        let a = mesh_a();
        let b = mesh_b();
        let out = AppendFilter::new().execute(&[&a, &b]).unwrap();

        // "X" is present in both inputs: concatenated in input order
        let x = out.mesh.point_data.array("X").unwrap();
        assert_eq!(x.values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        // "only_a" fails the every-input rule and is dropped, with a warning
        assert!(out.mesh.point_data.array("only_a").is_none());
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("only_a"));
    }

    #[test]
    fn test_component_count_mismatch_drops_array() {
        let a = mesh_a();
        let mut b = mesh_b();
        b.point_data.array_mut("X").unwrap().components = 3;
        b.point_data.array_mut("X").unwrap().values =
            vec![0.0; 9];
        let out = AppendFilter::new().execute(&[&a, &b]).unwrap();
        assert!(out.mesh.point_data.array("X").is_none());
    }

    #[test]
    fn test_active_designation_unanimity() {
        let mut a = mesh_a();
        let mut b = mesh_b();
        a.point_data.active_scalars = Some("X".to_string());
        b.point_data.active_scalars = Some("X".to_string());
        let out = AppendFilter::new().execute(&[&a, &b]).unwrap();
        assert_eq!(out.mesh.point_data.active_scalars.as_deref(), Some("X"));

        b.point_data.active_scalars = Some("only_a".to_string());
        let out = AppendFilter::new().execute(&[&a, &b]).unwrap();
        assert!(out.mesh.point_data.active_scalars.is_none());
    }

    #[test]
    fn test_global_ids_concatenated_without_merging() {
        let mut a = mesh_a();
        let mut b = mesh_b();
        a.point_data.global_ids = Some(GlobalIds::new("gid", vec![10, 11, 12]));
        b.point_data.global_ids = Some(GlobalIds::new("gid", vec![11, 12, 13]));
        let out = AppendFilter::new().execute(&[&a, &b]).unwrap();
        let ids = out.mesh.point_data.global_ids.unwrap();
        assert_eq!(ids.values, vec![10, 11, 12, 11, 12, 13]);
    }

    #[test]
    fn test_global_ids_dropped_when_welding() {
        let mut a = mesh_a();
        let mut b = mesh_b();
        a.point_data.global_ids = Some(GlobalIds::new("gid", vec![10, 11, 12]));
        b.point_data.global_ids = Some(GlobalIds::new("gid", vec![11, 12, 13]));
        a.cell_data.global_ids = Some(GlobalIds::new("cgid", vec![100]));
        b.cell_data.global_ids = Some(GlobalIds::new("cgid", vec![200]));

        let filter = AppendFilter::with_merging(PointMerging::Tolerance {
            tolerance: 1e-6,
            relative: false,
        });
        let out = filter.execute(&[&a, &b]).unwrap();

        // Welded point identity invalidates point ids; cells are never
        // merged so their ids survive
        assert!(out.mesh.point_data.global_ids.is_none());
        assert_eq!(
            out.mesh.cell_data.global_ids.unwrap().values,
            vec![100, 200]
        );
    }

    #[test]
    fn test_weld_by_tolerance_unifies_shared_edge() {
        let a = mesh_a();
        let b = mesh_b();
        let filter = AppendFilter::with_merging(PointMerging::Tolerance {
            tolerance: 1e-6,
            relative: false,
        });
        let out = filter.execute(&[&a, &b]).unwrap();

        assert_eq!(out.mesh.point_count(), 4);
        assert_eq!(out.mesh.triangle_count(), 2);
        assert_eq!(out.mesh.triangles[0], [0, 1, 2]);
        assert_eq!(out.mesh.triangles[1], [1, 3, 2]);
        // First occurrence wins for welded attributes
        let x = out.mesh.point_data.array("X").unwrap();
        assert_eq!(x.values, vec![1.0, 2.0, 3.0, 6.0]);
        out.mesh.validate().unwrap();
    }

    #[test]
    fn test_relative_tolerance() {
        let a = mesh_a();
        let b = mesh_b();
        // Combined bbox diagonal is sqrt(2); 1e-3 of that still only
        // captures coincident points
        let filter = AppendFilter::with_merging(PointMerging::Tolerance {
            tolerance: 1e-3,
            relative: true,
        });
        let out = filter.execute(&[&a, &b]).unwrap();
        assert_eq!(out.mesh.point_count(), 4);
    }

    #[test]
    fn test_merge_by_global_ids() {
        let mut a = mesh_a();
        let mut b = mesh_b();
        a.point_data.global_ids = Some(GlobalIds::new("gid", vec![10, 11, 12]));
        b.point_data.global_ids = Some(GlobalIds::new("gid", vec![11, 12, 13]));

        let filter = AppendFilter::with_merging(PointMerging::GlobalIds);
        let out = filter.execute(&[&a, &b]).unwrap();
        assert_eq!(out.mesh.point_count(), 4);
        assert_eq!(out.mesh.triangle_count(), 2);
        assert!(out.mesh.point_data.global_ids.is_none());
    }

    #[test]
    fn test_merge_by_global_ids_without_ids_warns() {
        let a = mesh_a();
        let b = mesh_b();
        let filter = AppendFilter::with_merging(PointMerging::GlobalIds);
        let out = filter.execute(&[&a, &b]).unwrap();
        // Falls back to plain concatenation
        assert_eq!(out.mesh.point_count(), 6);
        assert!(out.warnings.iter().any(|w| w.contains("global ids")));
    }

    #[test]
    fn test_degenerate_triangles_dropped_by_weld() {
        // A sliver triangle whose points all weld together disappears
        let mut sliver = TriangleMesh::from_points_and_triangles(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1e-8, 0.0, 0.0),
                Point3f::new(0.0, 1e-8, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        sliver
            .cell_data
            .add_array(AttributeArray::from_values("tag", 1, vec![7.0]));
        let a = mesh_a();

        let filter = AppendFilter::with_merging(PointMerging::Tolerance {
            tolerance: 1e-4,
            relative: false,
        });
        let out = filter.execute(&[&a, &sliver]).unwrap();
        assert_eq!(out.mesh.triangle_count(), 1);
        out.mesh.validate().unwrap();
    }
}
