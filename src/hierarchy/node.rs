//! Binary cluster tree.

use core::fmt;
use core::mem::ManuallyDrop;

/// Separator used by [`Cluster::to_display_string`].
pub const DEFAULT_SEPARATOR: &str = "-";

/// A node of a UPGMA tree.
///
/// Either a leaf holding one original item, or an internal node (an OTU)
/// owning exactly two child clusters. Parents own their children outright;
/// there is no sharing and no back edge. Dropping a cluster walks the
/// subtree with an explicit stack, so deep trees are released without
/// recursion.
#[derive(Clone, PartialEq)]
pub struct Cluster<T> {
    /// Leaves are `0..n` in input order; the `i`-th merge creates `n + i`.
    id: usize,
    /// Taken exactly once, in `Drop` or `into_content`.
    content: ManuallyDrop<ClusterContent<T>>,
    leaf_count: usize,
    /// `distance_to` between the two children when they were merged.
    height: f64,
    /// Nearest-neighbor cache as it stood when the cluster left the active set.
    nearest: Option<(usize, f64)>,
}

/// Content of a cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterContent<T> {
    /// A single input item.
    Leaf(T),
    /// Union of two earlier clusters.
    Merged {
        /// First-found cluster of the merged pair.
        left: Box<Cluster<T>>,
        /// Nearest neighbor of `left` at merge time.
        right: Box<Cluster<T>>,
    },
}

impl<T> Cluster<T> {
    pub(crate) fn leaf(id: usize, item: T) -> Self {
        Self {
            id,
            content: ManuallyDrop::new(ClusterContent::Leaf(item)),
            leaf_count: 1,
            height: 0.0,
            nearest: None,
        }
    }

    pub(crate) fn merged(id: usize, left: Cluster<T>, right: Cluster<T>, height: f64) -> Self {
        Self {
            id,
            leaf_count: left.leaf_count + right.leaf_count,
            content: ManuallyDrop::new(ClusterContent::Merged {
                left: Box::new(left),
                right: Box::new(right),
            }),
            height,
            nearest: None,
        }
    }

    pub(crate) fn with_nearest(mut self, nearest: Option<(usize, f64)>) -> Self {
        self.nearest = nearest;
        self
    }

    /// Cluster id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Content of this cluster.
    pub fn content(&self) -> &ClusterContent<T> {
        &self.content
    }

    /// Consume the cluster, returning its content.
    pub fn into_content(self) -> ClusterContent<T> {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so `content` is taken only here.
        unsafe { ManuallyDrop::take(&mut this.content) }
    }

    /// Check if this is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(*self.content, ClusterContent::Leaf(_))
    }

    /// The item if this is a leaf.
    pub fn item(&self) -> Option<&T> {
        match self.content() {
            ClusterContent::Leaf(item) => Some(item),
            ClusterContent::Merged { .. } => None,
        }
    }

    /// Both children if this is an internal cluster.
    pub fn children(&self) -> Option<(&Cluster<T>, &Cluster<T>)> {
        match self.content() {
            ClusterContent::Leaf(_) => None,
            ClusterContent::Merged { left, right } => Some((left, right)),
        }
    }

    /// Left child if this is an internal cluster.
    pub fn left(&self) -> Option<&Cluster<T>> {
        self.children().map(|(left, _)| left)
    }

    /// Right child if this is an internal cluster.
    pub fn right(&self) -> Option<&Cluster<T>> {
        self.children().map(|(_, right)| right)
    }

    /// Number of leaves under this cluster. O(1).
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Merge distance of an internal cluster; `0.0` for a leaf.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Id of the nearest neighbor cached when this cluster left the active
    /// set. `None` for the root and for single-item trees.
    pub fn nearest_neighbor(&self) -> Option<usize> {
        self.nearest.map(|(id, _)| id)
    }

    /// Distance paired with [`Cluster::nearest_neighbor`].
    pub fn nearest_neighbor_distance(&self) -> Option<f64> {
        self.nearest.map(|(_, d)| d)
    }

    /// The child with more leaves; the left child on a tie.
    ///
    /// `None` for a leaf, which has no branches.
    pub fn largest_branch(&self) -> Option<&Cluster<T>> {
        let (left, right) = self.children()?;
        if right.leaf_count > left.leaf_count {
            Some(right)
        } else {
            Some(left)
        }
    }

    /// Leaf items, left to right. Internal clusters are skipped.
    ///
    /// Calling `flatten` again restarts the sequence.
    pub fn flatten(&self) -> Leaves<'_, T> {
        Leaves {
            stack: vec![self],
            remaining: self.leaf_count,
        }
    }

    /// Every cluster of this subtree, parents before children, left before
    /// right.
    pub fn iter(&self) -> Clusters<'_, T> {
        Clusters { stack: vec![self] }
    }

    /// Number of internal clusters in this subtree.
    pub fn internal_count(&self) -> usize {
        self.iter().filter(|c| !c.is_leaf()).count()
    }

    /// Average-linkage distance to `other`: the sum of `distance` over all
    /// leaf pairs, divided by the sum of both leaf counts.
    pub fn distance_to<F>(&self, other: &Cluster<T>, distance: F) -> f64
    where
        F: Fn(&T, &T) -> f64,
    {
        let mut total = 0.0;
        for a in self.flatten() {
            for b in other.flatten() {
                total += distance(a, b);
            }
        }
        total / (self.leaf_count + other.leaf_count) as f64
    }

    /// Fallible variant of [`Cluster::distance_to`]. The first error is
    /// returned as-is.
    pub fn try_distance_to<F, E>(&self, other: &Cluster<T>, distance: F) -> Result<f64, E>
    where
        F: Fn(&T, &T) -> Result<f64, E>,
    {
        let mut total = 0.0;
        for a in self.flatten() {
            for b in other.flatten() {
                total += distance(a, b)?;
            }
        }
        Ok(total / (self.leaf_count + other.leaf_count) as f64)
    }
}

impl<T> Drop for Cluster<T> {
    fn drop(&mut self) {
        // SAFETY: the cluster is going away and `content` is not read again.
        let content = unsafe { ManuallyDrop::take(&mut self.content) };
        let mut pending = Vec::new();
        detach_children(content, &mut pending);
        while let Some(child) = pending.pop() {
            let child = *child;
            detach_children(child.into_content(), &mut pending);
        }
    }
}

/// Move the children of `content` onto `pending`; a leaf item is dropped.
fn detach_children<T>(content: ClusterContent<T>, pending: &mut Vec<Box<Cluster<T>>>) {
    if let ClusterContent::Merged { left, right } = content {
        pending.push(left);
        pending.push(right);
    }
}

impl<T: fmt::Debug> fmt::Debug for Cluster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("id", &self.id)
            .field("content", self.content())
            .field("leaf_count", &self.leaf_count)
            .field("height", &self.height)
            .field("nearest", &self.nearest)
            .finish()
    }
}

impl<T: fmt::Display> Cluster<T> {
    /// Leaves joined with `separator`.
    pub fn display_with(&self, separator: &str) -> String {
        let mut out = String::new();
        for (i, item) in self.flatten().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.push_str(&item.to_string());
        }
        out
    }

    /// Leaves joined with [`DEFAULT_SEPARATOR`].
    pub fn to_display_string(&self) -> String {
        self.display_with(DEFAULT_SEPARATOR)
    }
}

impl<T: fmt::Display> fmt::Display for Cluster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.flatten().enumerate() {
            if i > 0 {
                f.write_str(DEFAULT_SEPARATOR)?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Iterator over the leaf items of a cluster. See [`Cluster::flatten`].
#[derive(Debug)]
pub struct Leaves<'a, T> {
    stack: Vec<&'a Cluster<T>>,
    remaining: usize,
}

impl<T> Clone for Leaves<'_, T> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, T> Iterator for Leaves<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node.content() {
                ClusterContent::Leaf(item) => {
                    self.remaining -= 1;
                    return Some(item);
                }
                ClusterContent::Merged { left, right } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Leaves<'_, T> {}

/// Pre-order iterator over every cluster of a subtree. See [`Cluster::iter`].
#[derive(Debug)]
pub struct Clusters<'a, T> {
    stack: Vec<&'a Cluster<T>>,
}

impl<'a, T> Iterator for Clusters<'a, T> {
    type Item = &'a Cluster<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let ClusterContent::Merged { left, right } = node.content() {
            self.stack.push(right);
            self.stack.push(left);
        }
        Some(node)
    }
}

impl<'a, T> IntoIterator for &'a Cluster<T> {
    type Item = &'a Cluster<T>;
    type IntoIter = Clusters<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
