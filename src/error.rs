use std::convert::Infallible;

use thiserror::Error;

/// Result alias for `upgma`.
///
/// `E` is the error type of the distance function; infallible distance
/// functions leave it at [`Infallible`].
pub type Result<T, E = Infallible> = std::result::Result<T, Error<E>>;

/// Errors returned by tree construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error<E = Infallible> {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// The distance function failed. The error is passed through untouched.
    #[error("distance function failed: {0}")]
    Distance(#[source] E),

    /// The distance function returned a negative or non-finite value.
    #[error("invalid distance {value} between items {left} and {right}")]
    InvalidDistance {
        /// Index of the first item in the input sequence.
        left: usize,
        /// Index of the second item in the input sequence.
        right: usize,
        /// Offending value.
        value: f64,
    },

    /// Construction did not converge to a single root.
    ///
    /// This is a logic defect in the engine, not a recoverable input error.
    #[error("tree construction failed: {remaining} clusters left active")]
    InvariantViolation {
        /// Number of clusters still active when construction stopped.
        remaining: usize,
    },
}

impl<E> Error<E> {
    /// Returns the distance function's error, if that is what failed.
    pub fn into_distance_error(self) -> Option<E> {
        match self {
            Error::Distance(e) => Some(e),
            _ => None,
        }
    }
}
