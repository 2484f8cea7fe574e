//! A finished UPGMA tree.

use core::fmt;

use super::dendrogram::Dendrogram;
use super::node::{Cluster, Leaves};

/// Result of a UPGMA build: the root cluster plus its merge history.
///
/// Only ever produced by a completed build, so every query here runs on a
/// tree with exactly one root.
#[derive(Debug, Clone, PartialEq)]
pub struct UpgmaTree<T> {
    root: Cluster<T>,
    dendrogram: Dendrogram,
    separator: String,
}

impl<T> UpgmaTree<T> {
    pub(crate) fn new(root: Cluster<T>, dendrogram: Dendrogram, separator: String) -> Self {
        Self {
            root,
            dendrogram,
            separator,
        }
    }

    /// The root cluster.
    pub fn root(&self) -> &Cluster<T> {
        &self.root
    }

    /// Consume the tree, keeping only the root cluster.
    pub fn into_root(self) -> Cluster<T> {
        self.root
    }

    /// Merges performed while building, in order.
    pub fn dendrogram(&self) -> &Dendrogram {
        &self.dendrogram
    }

    /// The root's child with more leaves, left on a tie.
    ///
    /// `None` when the tree is a single leaf.
    pub fn largest_branch(&self) -> Option<&Cluster<T>> {
        self.root.largest_branch()
    }

    /// Leaf items, left to right.
    pub fn flatten(&self) -> Leaves<'_, T> {
        self.root.flatten()
    }

    /// Number of input items.
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    /// Separator used for rendering.
    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl<T: fmt::Display> UpgmaTree<T> {
    /// Leaves joined with the configured separator.
    pub fn to_display_string(&self) -> String {
        self.root.display_with(&self.separator)
    }
}

impl<T: fmt::Display> fmt::Display for UpgmaTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_accessors() {
        let mut dendro = Dendrogram::new(2);
        let id = dendro.add_merge(0, 1, 0.5, 2);
        let root = Cluster::merged(id, Cluster::leaf(0, "ape"), Cluster::leaf(1, "bat"), 0.5);
        let tree = UpgmaTree::new(root, dendro, "/".into());

        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.to_string(), "ape/bat");
        assert_eq!(tree.root().to_string(), "ape-bat");
        assert_eq!(tree.largest_branch().and_then(Cluster::item), Some(&"ape"));
        assert_eq!(tree.flatten().count(), 2);
        assert_eq!(tree.separator(), "/");
        assert_eq!(tree.dendrogram().n_merges(), 1);
        assert_eq!(tree.into_root().id(), 2);
    }
}
