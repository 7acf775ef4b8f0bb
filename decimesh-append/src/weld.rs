//! Point unification
//!
//! Maps every point to a representative: the first earlier point within
//! tolerance (spatial welding) or the first point carrying the same
//! global id. Representatives always map to themselves, so the result
//! composes directly into a remap table.

use decimesh_core::Point3f;
use std::collections::HashMap;

/// Representative index per point under a spatial tolerance.
///
/// A uniform grid with `tolerance`-sized cells limits candidate checks
/// to the 27 surrounding cells. With a non-positive tolerance only
/// exactly coincident points are unified.
pub fn weld_by_tolerance(points: &[Point3f], tolerance: f64) -> Vec<usize> {
    if tolerance <= 0.0 {
        return weld_exact(points);
    }

    let inv = 1.0 / tolerance;
    let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
    let mut rep = Vec::with_capacity(points.len());

    for (i, p) in points.iter().enumerate() {
        let key = cell_key(p, inv);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbor = (key.0 + dx, key.1 + dy, key.2 + dz);
                    if let Some(bucket) = grid.get(&neighbor) {
                        for &j in bucket {
                            if distance(&points[j], p) <= tolerance {
                                found = Some(j);
                                break 'search;
                            }
                        }
                    }
                }
            }
        }
        match found {
            Some(j) => rep.push(j),
            None => {
                rep.push(i);
                grid.entry(key).or_default().push(i);
            }
        }
    }
    rep
}

/// Representative index per point under exact coordinate equality
fn weld_exact(points: &[Point3f]) -> Vec<usize> {
    let mut seen: HashMap<(u32, u32, u32), usize> = HashMap::new();
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let key = (p.x.to_bits(), p.y.to_bits(), p.z.to_bits());
            *seen.entry(key).or_insert(i)
        })
        .collect()
}

/// Representative index per point under global-id equality
pub fn weld_by_global_ids(ids: &[u64]) -> Vec<usize> {
    let mut seen: HashMap<u64, usize> = HashMap::new();
    ids.iter()
        .enumerate()
        .map(|(i, &id)| *seen.entry(id).or_insert(i))
        .collect()
}

#[inline]
fn cell_key(p: &Point3f, inv: f64) -> (i64, i64, i64) {
    (
        (p.x as f64 * inv).floor() as i64,
        (p.y as f64 * inv).floor() as i64,
        (p.z as f64 * inv).floor() as i64,
    )
}

#[inline]
fn distance(a: &Point3f, b: &Point3f) -> f64 {
    (a - b).norm() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weld_exact_duplicates() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 0.0, 0.0),
        ];
        assert_eq!(weld_by_tolerance(&points, 0.0), vec![0, 1, 0]);
    }

    #[test]
    fn test_weld_within_tolerance() {
        let points = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(0.005, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 0.009, 0.0),
        ];
        assert_eq!(weld_by_tolerance(&points, 0.01), vec![0, 0, 2, 2]);
        // Tighter tolerance keeps them apart
        assert_eq!(weld_by_tolerance(&points, 0.001), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_weld_across_cell_boundary() {
        // Two points straddling a grid cell boundary must still weld
        let points = vec![
            Point3f::new(0.999, 0.0, 0.0),
            Point3f::new(1.001, 0.0, 0.0),
        ];
        assert_eq!(weld_by_tolerance(&points, 0.01), vec![0, 0]);
    }

    #[test]
    fn test_weld_by_global_ids() {
        assert_eq!(weld_by_global_ids(&[7, 3, 7, 9, 3]), vec![0, 1, 0, 3, 1]);
    }
}
