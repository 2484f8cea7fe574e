//! The active set: clusters that have not been merged yet.
//!
//! Keyed by cluster id in a `BTreeMap`. Ids are handed out monotonically
//! (leaves first, then one per merge), so key order is insertion order and
//! every scan over the set visits clusters in the same order on every run.

use std::collections::BTreeMap;

/// Cached nearest neighbor of an active cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Nearest {
    /// Id of the neighbor. Only meaningful while that id is still active.
    pub id: usize,
    /// `distance_to` the neighbor when the cache was filled.
    pub distance: f64,
}

/// Per-cluster state held while the cluster is active.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// Input indices of every leaf under this cluster, left to right.
    pub leaves: Vec<usize>,
    pub nearest: Option<Nearest>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveSet {
    entries: BTreeMap<usize, Entry>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, id: usize, leaves: Vec<usize>) {
        let _ = self.entries.insert(
            id,
            Entry {
                leaves,
                nearest: None,
            },
        );
    }

    pub fn remove(&mut self, id: usize) -> Option<Entry> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: usize) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn set_nearest(&mut self, id: usize, nearest: Option<Nearest>) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.nearest = nearest;
        }
    }

    /// Active entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Entry)> + '_ {
        self.entries.iter().map(|(&id, entry)| (id, entry))
    }

    /// Active ids in id order.
    pub fn ids(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }

    /// The cluster with the smallest cached distance, paired with its cached
    /// neighbor. Ties go to the lowest id.
    ///
    /// Returns `None` if no active cluster has a cached neighbor.
    pub fn closest_pair(&self) -> Option<(usize, Nearest)> {
        let mut best: Option<(usize, Nearest)> = None;
        for (id, entry) in self.iter() {
            let Some(nearest) = entry.nearest else {
                continue;
            };
            if best.map_or(true, |(_, b)| nearest.distance < b.distance) {
                best = Some((id, nearest));
            }
        }
        best
    }

    /// Ids whose cached neighbor is one of `merged`, in id order.
    pub fn stale(&self, merged: [usize; 2]) -> Vec<usize> {
        self.iter()
            .filter(|(_, entry)| {
                entry
                    .nearest
                    .is_some_and(|n| n.id == merged[0] || n.id == merged[1])
            })
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nearest(id: usize, distance: f64) -> Option<Nearest> {
        Some(Nearest { id, distance })
    }

    #[test]
    fn test_iteration_follows_id_order() {
        let mut active = ActiveSet::new();
        active.insert(4, vec![1, 2]);
        active.insert(0, vec![0]);
        active.insert(3, vec![3]);

        assert_eq!(active.ids(), vec![0, 3, 4]);
        assert_eq!(active.len(), 3);
        assert_eq!(active.remove(3).map(|e| e.leaves), Some(vec![3]));
        assert_eq!(active.ids(), vec![0, 4]);
    }

    #[test]
    fn test_closest_pair_first_minimum_wins() {
        let mut active = ActiveSet::new();
        for id in 0..4 {
            active.insert(id, vec![id]);
        }
        active.set_nearest(0, nearest(1, 1.0));
        active.set_nearest(1, nearest(2, 0.5));
        active.set_nearest(2, nearest(1, 0.5));
        active.set_nearest(3, nearest(2, 3.0));

        let (id, n) = active.closest_pair().unwrap();
        assert_eq!(id, 1);
        assert_eq!(n, Nearest { id: 2, distance: 0.5 });
    }

    #[test]
    fn test_closest_pair_skips_nan_cache() {
        let mut active = ActiveSet::new();
        for id in 0..4 {
            active.insert(id, vec![id]);
        }
        active.set_nearest(0, nearest(1, 0.5));
        active.set_nearest(1, nearest(0, 0.5));
        active.set_nearest(2, nearest(0, f64::NAN));
        active.set_nearest(3, nearest(1, 24.0));

        let (id, n) = active.closest_pair().unwrap();
        assert_eq!(id, 0);
        assert_eq!(n, Nearest { id: 1, distance: 0.5 });
    }

    #[test]
    fn test_closest_pair_without_caches() {
        let mut active = ActiveSet::new();
        active.insert(0, vec![0]);
        assert!(active.closest_pair().is_none());
    }

    #[test]
    fn test_stale_lists_dependents() {
        let mut active = ActiveSet::new();
        for id in [0, 3, 4] {
            active.insert(id, vec![id]);
        }
        active.set_nearest(0, nearest(1, 1.0));
        active.set_nearest(3, nearest(2, 3.0));
        active.set_nearest(4, nearest(0, 1.6));

        assert_eq!(active.stale([1, 2]), vec![0, 3]);
        assert!(active.stale([7, 8]).is_empty());
    }
}
