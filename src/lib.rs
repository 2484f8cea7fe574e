//! # upgma
//!
//! UPGMA hierarchical clustering over arbitrary items and a pluggable pairwise
//! distance, using incremental nearest-neighbor caching so a merge only
//! rescans the clusters it invalidated.
//!
//! ```rust
//! use upgma::Upgma;
//!
//! let taxa = vec![0, 2, 3, 9];
//! let tree = Upgma::new()
//!     .build(taxa, |a: &i32, b: &i32| f64::from((a - b).abs()))
//!     .unwrap();
//!
//! println!("{tree}"); // 9-0-2-3
//! for merge in tree.dendrogram().merges() {
//!     println!("{} + {} at {:.3}", merge.left, merge.right, merge.distance);
//! }
//! ```
//!
//! The parallel initial pass is opt-in via the `parallel` feature.

pub mod cluster;
/// Error types used across `upgma`.
pub mod error;
pub mod hierarchy;


pub use cluster::{upgma, AbsoluteDifference, Distance, FnDistance, TryFnDistance, Upgma};
pub use error::{Error, Result};
pub use hierarchy::{
    Cluster, ClusterContent, Dendrogram, HealthCheck, HealthReport, Merge, UpgmaTree,
};
