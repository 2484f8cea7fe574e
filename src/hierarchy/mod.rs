//! Cluster trees produced by agglomerative clustering.
//!
//! # Structure
//!
//! A UPGMA tree is a strict binary tree. Leaves hold the original items;
//! every internal cluster (an OTU) owns exactly two children and records the
//! distance at which they were merged:
//!
//! ```text
//!              6 (height 5.5)
//!             / \
//!            9   5 (height 1.67)
//!               / \
//!              0   4 (height 0.5)
//!                 / \
//!                2   3
//! ```
//!
//! Ids follow the SciPy linkage convention: leaves are numbered `0..n` in
//! input order and the `i`-th merge creates cluster `n + i`. The same ids
//! appear in the [`Dendrogram`] merge log, so the tree and the log can be
//! cross-referenced.
//!
//! # Queries
//!
//! | Query | Returns |
//! |-------|---------|
//! | [`Cluster::flatten`] | leaf items, left to right |
//! | [`Cluster::largest_branch`] | child with more leaves (left on a tie) |
//! | [`Cluster::to_display_string`] | leaves joined with `-` |
//! | [`HealthCheck::health_check`] | structural invariant report |

mod dendrogram;
mod node;
mod tree;
mod validate;

pub use dendrogram::{Dendrogram, Merge};
pub use node::{Cluster, ClusterContent, Clusters, Leaves, DEFAULT_SEPARATOR};
pub use tree::UpgmaTree;
pub use validate::{
    validate_cluster, HealthCheck, HealthReport, Severity, ValidationIssue, ValidationReport,
};
