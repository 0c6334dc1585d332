use crate::neighborhood::{is_center, window_offsets, Neighborhood};

/// All cells within Chebyshev distance `radius` of the center, excluding the
/// center, in raster order.
///
/// Radius 1 in two dimensions is the classic 8-cell neighborhood.
#[derive(Clone, Debug)]
pub struct Moore<const N: usize> {
    radius: usize,
    offsets: Vec<[isize; N]>,
}

impl<const N: usize> Moore<N> {
    pub fn new(radius: usize) -> Self {
        let offsets = window_offsets(radius)
            .into_iter()
            .filter(|o| !is_center(o))
            .collect();
        Moore { radius, offsets }
    }
}

impl<const N: usize> Neighborhood<N> for Moore<N> {
    #[inline]
    fn offsets(&self) -> &[[isize; N]] {
        &self.offsets
    }

    #[inline]
    fn radius(&self) -> usize {
        self.radius
    }
}
