//! UPGMA clustering.
//!
//! UPGMA (Unweighted Pair Group Method with Arithmetic mean) is bottom-up
//! clustering: start with each item as its own cluster, repeatedly merge
//! the two closest clusters until one remains. The merge history forms a
//! **dendrogram**, a binary tree commonly read as a taxonomy.
//!
//! ## Distances
//!
//! Items only need a pairwise [`Distance`]. Plain closures work through
//! [`Upgma::build`], fallible ones through [`Upgma::try_build`], and any
//! [`Distance`] implementation through [`Upgma::build_with`].
//!
//! ## Cost
//!
//! | Phase | Distance evaluations |
//! |-------|----------------------|
//! | Initial nearest neighbors | O(n²) leaf pairs |
//! | Per merge | one scan per cluster whose cached neighbor was merged |
//!
//! With the `parallel` feature, [`Upgma::build_par`] spreads the initial
//! pass over rayon. Merges are always sequential.
//!
//! ## Usage
//!
//! ```rust
//! use upgma::{AbsoluteDifference, Upgma};
//!
//! let tree = Upgma::new().build_with(vec![0, 2, 3, 9], AbsoluteDifference).unwrap();
//!
//! assert_eq!(tree.leaf_count(), 4);
//! assert_eq!(tree.to_display_string(), "9-0-2-3");
//! assert_eq!(tree.largest_branch().unwrap().leaf_count(), 3);
//! ```

mod active;
mod traits;
mod upgma;

pub use traits::{AbsoluteDifference, Distance, FnDistance, TryFnDistance};
pub use self::upgma::{upgma, Upgma};
