//! Edge registry keyed by unordered point-id pairs
//!
//! Every undirected edge gets a unique integer id on first
//! registration; ids are never reused, so an adjacency re-created after
//! a collapse is a new edge with a fresh id. Endpoints are kept in
//! parallel arrays indexed by edge id.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    index: HashMap<(usize, usize), usize>,
    end1: Vec<usize>,
    end2: Vec<usize>,
}

#[inline]
fn key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

impl EdgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an edge, returning `(id, newly_created)`. An already
    /// registered pair keeps its existing id.
    pub fn insert(&mut self, a: usize, b: usize) -> (usize, bool) {
        debug_assert_ne!(a, b, "edge endpoints must differ");
        let k = key(a, b);
        if let Some(&id) = self.index.get(&k) {
            return (id, false);
        }
        let id = self.end1.len();
        self.end1.push(k.0);
        self.end2.push(k.1);
        self.index.insert(k, id);
        (id, true)
    }

    /// Id of a live edge between two points, if registered
    pub fn get(&self, a: usize, b: usize) -> Option<usize> {
        self.index.get(&key(a, b)).copied()
    }

    /// Endpoints of an edge id (smaller id first)
    pub fn endpoints(&self, id: usize) -> (usize, usize) {
        (self.end1[id], self.end2[id])
    }

    /// Unregister the pair so the adjacency can be re-created under a
    /// fresh id later. The old id's endpoint entries stay behind.
    pub fn remove(&mut self, a: usize, b: usize) -> Option<usize> {
        self.index.remove(&key(a, b))
    }

    /// Number of currently registered pairs
    pub fn live_count(&self) -> usize {
        self.index.len()
    }

    /// Total number of ids ever allocated
    pub fn allocated(&self) -> usize {
        self.end1.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_unordered() {
        let mut table = EdgeTable::new();
        let (id, fresh) = table.insert(3, 1);
        assert!(fresh);
        assert_eq!(table.insert(1, 3), (id, false));
        assert_eq!(table.get(1, 3), Some(id));
        assert_eq!(table.get(3, 1), Some(id));
        assert_eq!(table.endpoints(id), (1, 3));
        assert_eq!(table.live_count(), 1);
    }

    #[test]
    fn test_sequential_ids() {
        let mut table = EdgeTable::new();
        assert_eq!(table.insert(0, 1).0, 0);
        assert_eq!(table.insert(1, 2).0, 1);
        assert_eq!(table.insert(2, 0).0, 2);
        assert_eq!(table.allocated(), 3);
    }

    #[test]
    fn test_remove_and_fresh_id() {
        let mut table = EdgeTable::new();
        let (id0, _) = table.insert(0, 1);
        assert_eq!(table.remove(1, 0), Some(id0));
        assert_eq!(table.get(0, 1), None);
        assert_eq!(table.remove(0, 1), None);

        // Re-created adjacency gets a new id; the old id keeps its
        // endpoint record
        let (id1, fresh) = table.insert(0, 1);
        assert!(fresh);
        assert_ne!(id0, id1);
        assert_eq!(table.endpoints(id0), (0, 1));
        assert_eq!(table.allocated(), 2);
        assert_eq!(table.live_count(), 1);
    }
}
