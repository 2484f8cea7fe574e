//! UPGMA clustering with incremental nearest-neighbor caching.
//!
//! Bottom-up: every item starts as its own cluster, and the two closest
//! clusters are merged until one remains. The distance between clusters is
//! the sum of item distances over all leaf pairs, divided by the sum of the
//! two leaf counts:
//!
//! ```text
//! d(A, B) = Σ_{a ∈ A} Σ_{b ∈ B} d(a, b) / (|A| + |B|)
//! ```
//!
//! Note the divisor is `|A| + |B|`, not the `|A| × |B|` of textbook average
//! linkage. Trees built here keep that normalization.
//!
//! # Incremental nearest neighbors
//!
//! Following Gronau & Moran, each active cluster caches its nearest neighbor.
//! After a merge only the new cluster and the clusters whose cached neighbor
//! was consumed are rescanned; everyone else keeps their cache. The initial
//! pass is O(n²) distance evaluations; each later step costs one scan per
//! invalidated cache instead of a full rebuild.
//!
//! # Determinism
//!
//! Active clusters are scanned in ascending id order (leaves in input order,
//! then merge results in creation order) and a candidate only replaces the
//! current best when strictly closer. The same input and distance function
//! always give the same tree.
//!
//! # References
//!
//! Gronau, I. & Moran, S. (2007). "Optimal implementations of UPGMA and
//! other common clustering algorithms." Information Processing Letters.

use super::active::{ActiveSet, Nearest};
use super::traits::{Distance, FnDistance, TryFnDistance};
use crate::error::{Error, Result};
use crate::hierarchy::{Cluster, Dendrogram, UpgmaTree, DEFAULT_SEPARATOR};
use tracing::{debug, error, info, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// UPGMA tree builder.
#[derive(Debug, Clone)]
pub struct Upgma {
    /// Separator used when rendering the finished tree.
    separator: String,
    /// Reject negative and non-finite distances.
    check_distances: bool,
}

impl Default for Upgma {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            check_distances: true,
        }
    }
}

impl Upgma {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the separator used by [`UpgmaTree::to_display_string`].
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Enable or disable validation of distance values (on by default).
    ///
    /// With validation on, a negative, NaN or infinite distance aborts the
    /// build with [`Error::InvalidDistance`].
    pub fn with_distance_check(mut self, enabled: bool) -> Self {
        self.check_distances = enabled;
        self
    }

    /// Separator used when rendering.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Build a tree using an infallible distance closure.
    pub fn build<T, F>(
        &self,
        items: impl IntoIterator<Item = T>,
        distance: F,
    ) -> Result<UpgmaTree<T>>
    where
        F: Fn(&T, &T) -> f64,
    {
        self.build_with(items, FnDistance(distance))
    }

    /// Build a tree using a fallible distance closure.
    ///
    /// The first error returned by `distance` aborts the build and comes
    /// back as [`Error::Distance`].
    pub fn try_build<T, E, F>(
        &self,
        items: impl IntoIterator<Item = T>,
        distance: F,
    ) -> Result<UpgmaTree<T>, E>
    where
        F: Fn(&T, &T) -> std::result::Result<f64, E>,
    {
        self.build_with(items, TryFnDistance(distance))
    }

    /// Build a tree using any [`Distance`] implementation.
    pub fn build_with<T, D>(
        &self,
        items: impl IntoIterator<Item = T>,
        distance: D,
    ) -> Result<UpgmaTree<T>, D::Error>
    where
        D: Distance<T>,
    {
        let items: Vec<T> = items.into_iter().collect();
        let mut engine = Engine::new(items, distance, self.check_distances)?;
        engine.initialize()?;
        engine.run(self.separator.clone())
    }

    /// Like [`Upgma::build_with`], with the initial nearest-neighbor pass
    /// spread over the rayon thread pool. Merges stay sequential, so the
    /// resulting tree is identical to the sequential build.
    #[cfg(feature = "parallel")]
    pub fn build_par<T, D>(
        &self,
        items: impl IntoIterator<Item = T>,
        distance: D,
    ) -> Result<UpgmaTree<T>, D::Error>
    where
        T: Sync,
        D: Distance<T> + Sync,
        D::Error: Send,
    {
        let items: Vec<T> = items.into_iter().collect();
        let mut engine = Engine::new(items, distance, self.check_distances)?;
        engine.initialize_par()?;
        engine.run(self.separator.clone())
    }
}

/// Build a UPGMA tree with default settings.
///
/// ```rust
/// let tree = upgma::upgma(vec![0, 2, 3, 9], |a: &i32, b: &i32| f64::from((a - b).abs())).unwrap();
/// assert_eq!(tree.leaf_count(), 4);
/// assert_eq!(tree.largest_branch().map(|c| c.leaf_count()), Some(3));
/// ```
pub fn upgma<T, F>(items: impl IntoIterator<Item = T>, distance: F) -> Result<UpgmaTree<T>>
where
    F: Fn(&T, &T) -> f64,
{
    Upgma::new().build(items, distance)
}

/// Arena record of every cluster ever created, indexed by cluster id.
#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Leaf `id` holds input item `id`.
    Leaf,
    Merged { left: usize, right: usize, height: f64 },
}

/// Merge loop state. Consumed by [`Engine::run`], so a finished tree is the
/// only thing callers ever see.
struct Engine<T, D> {
    items: Vec<T>,
    distance: D,
    check_distances: bool,
    slots: Vec<Slot>,
    /// Nearest-neighbor cache of each cluster as it left the active set.
    frozen: Vec<Option<Nearest>>,
    active: ActiveSet,
    dendrogram: Dendrogram,
}

impl<T, D> Engine<T, D>
where
    D: Distance<T>,
{
    fn new(items: Vec<T>, distance: D, check_distances: bool) -> Result<Self, D::Error> {
        if items.is_empty() {
            return Err(Error::EmptyInput);
        }

        let n = items.len();
        let mut active = ActiveSet::new();
        for id in 0..n {
            active.insert(id, vec![id]);
        }

        Ok(Self {
            items,
            distance,
            check_distances,
            slots: vec![Slot::Leaf; n],
            frozen: vec![None; n],
            active,
            dendrogram: Dendrogram::new(n),
        })
    }

    /// Distance between two clusters given their leaf indices.
    fn linkage(&self, a: &[usize], b: &[usize]) -> Result<f64, D::Error> {
        let mut total = 0.0;
        for &i in a {
            for &j in b {
                let d = self
                    .distance
                    .distance(&self.items[i], &self.items[j])
                    .map_err(Error::Distance)?;
                if self.check_distances && !(d.is_finite() && d >= 0.0) {
                    return Err(Error::InvalidDistance {
                        left: i,
                        right: j,
                        value: d,
                    });
                }
                total += d;
            }
        }
        Ok(total / (a.len() + b.len()) as f64)
    }

    /// Scan every other active cluster for the closest one to `id`.
    fn nearest_for(&self, id: usize) -> Result<Option<Nearest>, D::Error> {
        let Some(entry) = self.active.get(id) else {
            return Ok(None);
        };

        let mut best: Option<Nearest> = None;
        for (other, candidate) in self.active.iter() {
            if other == id {
                continue;
            }
            let d = self.linkage(&entry.leaves, &candidate.leaves)?;
            if best.map_or(true, |b| d < b.distance) {
                best = Some(Nearest {
                    id: other,
                    distance: d,
                });
            }
        }
        Ok(best)
    }

    fn update_nearest_neighbor(&mut self, id: usize) -> Result<(), D::Error> {
        let nearest = self.nearest_for(id)?;
        trace!(
            cluster = id,
            nearest = ?nearest.map(|n| n.id),
            distance = ?nearest.map(|n| n.distance),
            "nearest neighbor updated"
        );
        self.active.set_nearest(id, nearest);
        Ok(())
    }

    /// Fill every cache. A single cluster has no peers and nothing to do.
    fn initialize(&mut self) -> Result<(), D::Error> {
        if self.active.len() < 2 {
            return Ok(());
        }
        for id in self.active.ids() {
            self.update_nearest_neighbor(id)?;
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn initialize_par(&mut self) -> Result<(), D::Error>
    where
        T: Sync,
        D: Sync,
        D::Error: Send,
    {
        if self.active.len() < 2 {
            return Ok(());
        }
        let ids = self.active.ids();
        let found = {
            let engine = &*self;
            ids.par_iter()
                .map(|&id| engine.nearest_for(id))
                .collect::<Result<Vec<_>, D::Error>>()?
        };
        for (id, nearest) in ids.into_iter().zip(found) {
            self.active.set_nearest(id, nearest);
        }
        Ok(())
    }

    /// Remove a cluster from the active set, freezing its cache.
    fn retire(&mut self, id: usize) -> Result<Vec<usize>, D::Error> {
        let Some(entry) = self.active.remove(id) else {
            error!(cluster = id, "merge partner is not active");
            return Err(Error::InvariantViolation {
                remaining: self.active.len(),
            });
        };
        if let Some(slot) = self.frozen.get_mut(id) {
            *slot = entry.nearest;
        }
        Ok(entry.leaves)
    }

    /// Merge the globally closest pair and repair the invalidated caches.
    fn merge_step(&mut self) -> Result<(), D::Error> {
        let Some((first, nearest)) = self.active.closest_pair() else {
            error!(
                remaining = self.active.len(),
                "no active cluster has a nearest neighbor"
            );
            return Err(Error::InvariantViolation {
                remaining: self.active.len(),
            });
        };
        let second = nearest.id;

        let mut leaves = self.retire(first)?;
        leaves.extend(self.retire(second)?);
        let size = leaves.len();

        let id = self.dendrogram.add_merge(first, second, nearest.distance, size);
        self.slots.push(Slot::Merged {
            left: first,
            right: second,
            height: nearest.distance,
        });
        self.frozen.push(None);
        self.active.insert(id, leaves);
        debug!(
            left = first,
            right = second,
            cluster = id,
            distance = nearest.distance,
            size,
            "merged clusters"
        );

        self.update_nearest_neighbor(id)?;
        let stale = self.active.stale([first, second]);
        trace!(count = stale.len(), "recomputing invalidated neighbors");
        for other in stale {
            self.update_nearest_neighbor(other)?;
        }
        Ok(())
    }

    fn run(mut self, separator: String) -> Result<UpgmaTree<T>, D::Error> {
        let n = self.items.len();
        for _ in 1..n {
            self.merge_step()?;
        }

        let remaining = self.active.len();
        let root_id = match self.active.iter().next() {
            Some((id, _)) if remaining == 1 => id,
            _ => {
                error!(remaining, "merge loop did not end with a single root");
                return Err(Error::InvariantViolation { remaining });
            }
        };
        let _ = self.retire(root_id)?;

        let dendrogram = std::mem::replace(&mut self.dendrogram, Dendrogram::new(0));
        let root = self.assemble(root_id)?;
        info!(
            items = n,
            merges = dendrogram.n_merges(),
            height = root.height(),
            "upgma tree built"
        );
        Ok(UpgmaTree::new(root, dendrogram, separator))
    }

    /// Turn the arena into an owned tree. Children always have smaller ids
    /// than their parent, so one forward pass suffices.
    fn assemble(self, root_id: usize) -> Result<Cluster<T>, D::Error> {
        let Engine {
            items,
            slots,
            frozen,
            ..
        } = self;

        let total = slots.len();
        let mut items: Vec<Option<T>> = items.into_iter().map(Some).collect();
        let mut built: Vec<Option<Cluster<T>>> = Vec::with_capacity(total);

        for (id, slot) in slots.into_iter().enumerate() {
            let cluster = match slot {
                Slot::Leaf => items
                    .get_mut(id)
                    .and_then(Option::take)
                    .map(|item| Cluster::leaf(id, item)),
                Slot::Merged {
                    left,
                    right,
                    height,
                } => {
                    let l = built.get_mut(left).and_then(Option::take);
                    let r = built.get_mut(right).and_then(Option::take);
                    l.zip(r).map(|(l, r)| Cluster::merged(id, l, r, height))
                }
            };
            let nearest = frozen.get(id).copied().flatten();
            built.push(cluster.map(|c| c.with_nearest(nearest.map(|n| (n.id, n.distance)))));
        }

        match built.get_mut(root_id).and_then(Option::take) {
            Some(root) => Ok(root),
            None => {
                error!(root = root_id, "root cluster missing from arena");
                Err(Error::InvariantViolation {
                    remaining: built.iter().filter(|c| c.is_some()).count(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::AbsoluteDifference;
    use std::cell::Cell;

    fn abs(a: &i32, b: &i32) -> f64 {
        f64::from((a - b).abs())
    }

    #[test]
    fn test_empty_input_error() {
        let items: Vec<i32> = vec![];
        let result = upgma(items, abs);
        assert_eq!(result.unwrap_err(), Error::EmptyInput);
    }

    #[test]
    fn test_single_item_is_root() {
        let calls = Cell::new(0usize);
        let tree = upgma(vec![42], |a, b| {
            calls.set(calls.get() + 1);
            abs(a, b)
        })
        .unwrap();

        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().item(), Some(&42));
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.dendrogram().n_merges(), 0);
        assert!(tree.largest_branch().is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_two_items() {
        let tree = upgma(vec![1, 4], abs).unwrap();
        let root = tree.root();
        let (left, right) = root.children().unwrap();

        assert_eq!(left.item(), Some(&1));
        assert_eq!(right.item(), Some(&4));
        assert_eq!(root.height(), 1.5);
        assert_eq!(left.nearest_neighbor(), Some(1));
        assert_eq!(right.nearest_neighbor(), Some(0));
        assert_eq!(left.nearest_neighbor_distance(), Some(1.5));
        assert_eq!(right.nearest_neighbor_distance(), Some(1.5));
        assert_eq!(left.nearest_neighbor_distance(), Some(left.distance_to(right, abs)));
        assert!(root.nearest_neighbor().is_none());
    }

    #[test]
    fn test_worked_example() {
        let tree = upgma(vec![0, 2, 3, 9], abs).unwrap();
        let merges: Vec<_> = tree.dendrogram().merges().copied().collect();

        assert_eq!(merges.len(), 3);
        assert_eq!((merges[0].left, merges[0].right, merges[0].size), (1, 2, 2));
        assert_eq!(merges[0].distance, 0.5);
        assert_eq!((merges[1].left, merges[1].right, merges[1].size), (0, 4, 3));
        assert!((merges[1].distance - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!((merges[2].left, merges[2].right, merges[2].size), (3, 5, 4));
        assert_eq!(merges[2].distance, 5.5);

        let root = tree.root();
        assert_eq!(root.id(), 6);
        assert_eq!(root.leaf_count(), 4);
        assert_eq!(tree.to_display_string(), "9-0-2-3");

        let branch = tree.largest_branch().unwrap();
        assert_eq!(branch.id(), 5);
        assert_eq!(branch.leaf_count(), 3);
        let mut members: Vec<i32> = branch.flatten().copied().collect();
        members.sort_unstable();
        assert_eq!(members, vec![0, 2, 3]);
    }

    #[test]
    fn test_worked_example_distance_calls() {
        // 12 for the initial pass, 10 after the first merge, 6 after the second.
        let calls = Cell::new(0usize);
        let _ = upgma(vec![0, 2, 3, 9], |a, b| {
            calls.set(calls.get() + 1);
            abs(a, b)
        })
        .unwrap();
        assert_eq!(calls.get(), 28);
    }

    #[test]
    fn test_ties_resolve_to_lowest_id() {
        // All pairs equidistant: every merge picks the first active cluster
        // and its first-scanned neighbor.
        let tree = upgma(vec!['a', 'b', 'c', 'd'], |_, _| 1.0).unwrap();
        let pairs: Vec<(usize, usize)> = tree
            .dendrogram()
            .merges()
            .map(|m| (m.left, m.right))
            .collect();
        assert_eq!(pairs, vec![(0, 1), (2, 3), (4, 5)]);
        assert_eq!(tree.to_display_string(), "a-b-c-d");
    }

    #[test]
    fn test_deterministic_across_runs() {
        let items = vec![17, 3, 88, 41, 41, 5, 120, 64, 9, 33];
        let a = upgma(items.clone(), abs).unwrap();
        let b = upgma(items, abs).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dendrogram().distances(), b.dendrogram().distances());
    }

    #[test]
    fn test_distance_error_propagates() {
        #[derive(Debug, PartialEq)]
        struct Unreachable(i32);

        let result = Upgma::new().try_build(vec![1, 2, 13], |a: &i32, b: &i32| {
            if *a == 13 || *b == 13 {
                Err(Unreachable(13))
            } else {
                Ok(abs(a, b))
            }
        });
        assert_eq!(result.unwrap_err(), Error::Distance(Unreachable(13)));
    }

    #[test]
    fn test_invalid_distance_rejected() {
        let result = upgma(vec![1.0, f64::NAN, 3.0], |a: &f64, b: &f64| (a - b).abs());
        match result {
            Err(Error::InvalidDistance { left, right, value }) => {
                assert_eq!((left, right), (0, 1));
                assert!(value.is_nan());
            }
            other => panic!("expected InvalidDistance, got {other:?}"),
        }

        let negative = upgma(vec![1, 2], |_, _| -1.0);
        assert!(matches!(
            negative,
            Err(Error::InvalidDistance { value, .. }) if value == -1.0
        ));
    }

    #[test]
    fn test_distance_check_can_be_disabled() {
        let tree = Upgma::new()
            .with_distance_check(false)
            .build(vec![1, 2, 3], |a: &i32, b: &i32| -abs(a, b))
            .unwrap();
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.dendrogram().n_merges(), 2);
    }

    #[test]
    fn test_unchecked_nan_does_not_displace_closest_pair() {
        let tree = Upgma::new()
            .with_distance_check(false)
            .build(vec![1.0, 2.0, f64::NAN, 50.0], |a: &f64, b: &f64| (a - b).abs())
            .unwrap();
        let first = tree.dendrogram().get(0).copied().unwrap();
        assert_eq!((first.left, first.right), (0, 1));
        assert_eq!(first.distance, 0.5);
        assert_eq!(tree.leaf_count(), 4);
    }

    #[test]
    fn test_build_with_trait_and_separator() {
        let tree = Upgma::new()
            .with_separator(" | ")
            .build_with(vec![10u8, 200, 12], AbsoluteDifference)
            .unwrap();
        assert_eq!(tree.to_display_string(), "200 | 10 | 12");
        assert_eq!(tree.root().to_display_string(), "200-10-12");
    }

    #[test]
    fn test_strings_with_custom_distance() {
        let words = vec!["kitten", "sitting", "mitten", "fitting", "cat"];
        let tree = upgma(words.clone(), |a: &&str, b: &&str| {
            let diff = a
                .chars()
                .zip(b.chars())
                .filter(|(x, y)| x != y)
                .count();
            (diff + a.len().abs_diff(b.len())) as f64
        })
        .unwrap();

        assert_eq!(tree.leaf_count(), words.len());
        assert_eq!(tree.root().internal_count(), words.len() - 1);
        let mut leaves: Vec<&str> = tree.flatten().copied().collect();
        leaves.sort_unstable();
        let mut expected = words;
        expected.sort_unstable();
        assert_eq!(leaves, expected);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let items: Vec<i32> = (0..60).map(|i| (i * 37) % 101).collect();
        let seq = Upgma::new().build_with(items.clone(), AbsoluteDifference).unwrap();
        let par = Upgma::new().build_par(items, AbsoluteDifference).unwrap();
        assert_eq!(seq, par);
    }
}
