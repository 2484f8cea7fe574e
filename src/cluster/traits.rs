//! Distance traits.

use std::convert::Infallible;

/// A pairwise distance between items.
///
/// Implementations must be pure: the engine calls them any number of
/// times, in any order, and expects the same value for the same pair.
/// Values must be non-negative and finite.
pub trait Distance<T: ?Sized> {
    /// Error produced by a failed distance evaluation.
    type Error;

    /// Distance between `a` and `b`.
    fn distance(&self, a: &T, b: &T) -> Result<f64, Self::Error>;
}

impl<T: ?Sized, D: Distance<T> + ?Sized> Distance<T> for &D {
    type Error = D::Error;

    fn distance(&self, a: &T, b: &T) -> Result<f64, Self::Error> {
        (**self).distance(a, b)
    }
}

/// Absolute difference `|a - b|` for numeric items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsoluteDifference;

impl<T: Copy + Into<f64>> Distance<T> for AbsoluteDifference {
    type Error = Infallible;

    #[inline]
    fn distance(&self, a: &T, b: &T) -> Result<f64, Self::Error> {
        let (a, b): (f64, f64) = ((*a).into(), (*b).into());
        Ok((a - b).abs())
    }
}

/// Adapter for an infallible closure `Fn(&T, &T) -> f64`.
#[derive(Debug, Clone, Copy)]
pub struct FnDistance<F>(pub F);

impl<T, F> Distance<T> for FnDistance<F>
where
    F: Fn(&T, &T) -> f64,
{
    type Error = Infallible;

    #[inline]
    fn distance(&self, a: &T, b: &T) -> Result<f64, Self::Error> {
        Ok((self.0)(a, b))
    }
}

/// Adapter for a fallible closure `Fn(&T, &T) -> Result<f64, E>`.
#[derive(Debug, Clone, Copy)]
pub struct TryFnDistance<F>(pub F);

impl<T, E, F> Distance<T> for TryFnDistance<F>
where
    F: Fn(&T, &T) -> Result<f64, E>,
{
    type Error = E;

    #[inline]
    fn distance(&self, a: &T, b: &T) -> Result<f64, Self::Error> {
        (self.0)(a, b)
    }
}
