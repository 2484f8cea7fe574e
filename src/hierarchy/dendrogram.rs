//! Merge history of a UPGMA build.
//!
//! Ids follow the SciPy/MATLAB linkage convention:
//! - leaves: `0..n-1`, in input order
//! - the `i`-th merge creates cluster `n + i`

/// A dendrogram recording every merge performed while building a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_items: usize,
}

/// A single merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Cluster that was found closest to its cached neighbor (becomes `left`).
    pub left: usize,
    /// Its cached nearest neighbor (becomes `right`).
    pub right: usize,
    /// Distance at which the merge occurred.
    pub distance: f64,
    /// Leaf count of the resulting cluster.
    pub size: usize,
}

impl Dendrogram {
    /// Create an empty dendrogram for n items.
    pub fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
        }
    }

    /// Record a merge. Returns the id of the new cluster.
    pub(crate) fn add_merge(
        &mut self,
        left: usize,
        right: usize,
        distance: f64,
        size: usize,
    ) -> usize {
        let id = self.n_items + self.merges.len();
        self.merges.push(Merge {
            left,
            right,
            distance,
            size,
        });
        id
    }

    /// Number of original items.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// Iterate over merges in the order they were performed.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }

    /// Merge `i`, which created cluster `n_items + i`.
    pub fn get(&self, i: usize) -> Option<&Merge> {
        self.merges.get(i)
    }

    /// Merge distances in merge order.
    pub fn distances(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }
}
