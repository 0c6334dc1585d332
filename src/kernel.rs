use std::ops::{Add, Mul};

use crate::error::ShapeError;
use crate::neighborhood::{Filled, Neighborhood};

/// A neighborhood paired with one weight per offset, for weighted reduction.
///
/// The product has scalar dot-product semantics: each weight scales its
/// neighbor value and the scaled values are summed. Vector-valued cells are
/// scaled elementwise and summed as vectors, never contracted.
#[derive(Clone, Debug)]
pub struct Kernel<H, const N: usize> {
    hood: H,
    weights: Vec<f64>,
}

impl<H, const N: usize> Kernel<H, N>
where
    H: Neighborhood<N>,
{
    /// The weight count must match the neighborhood length.
    pub fn new(hood: H, weights: Vec<f64>) -> Result<Self, ShapeError> {
        if weights.len() != hood.len() {
            return Err(ShapeError::WeightCount {
                weights: weights.len(),
                len: hood.len(),
            });
        }
        Ok(Kernel { hood, weights })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn hood(&self) -> &H {
        &self.hood
    }

    /// Weighted sum of `values`, which must be in offset order.
    pub fn product<T>(&self, values: &[T]) -> T
    where
        T: Copy + Default + Mul<f64, Output = T> + Add<Output = T>,
    {
        values
            .iter()
            .zip(&self.weights)
            .map(|(&v, &w)| v * w)
            .fold(T::default(), Add::add)
    }
}

impl<H, const N: usize> Neighborhood<N> for Kernel<H, N>
where
    H: Neighborhood<N>,
{
    #[inline]
    fn offsets(&self) -> &[[isize; N]] {
        self.hood.offsets()
    }

    #[inline]
    fn radius(&self) -> usize {
        self.hood.radius()
    }
}

impl<'a, H, T, const N: usize> Filled<'a, Kernel<H, N>, T>
where
    H: Neighborhood<N>,
    T: Copy + Default + Mul<f64, Output = T> + Add<Output = T>,
{
    /// Weighted reduction of the values behind this read.
    pub fn kernel_product(&self) -> T {
        self.shape().product(self.values())
    }
}
