use crate::neighborhood::{is_center, window_offsets, Neighborhood};

/// All cells within Manhattan distance `radius` of the center, excluding the
/// center, in raster order.
///
/// Radius 1 in two dimensions is the 4-cell orthogonal neighborhood.
#[derive(Clone, Debug)]
pub struct VonNeumann<const N: usize> {
    radius: usize,
    offsets: Vec<[isize; N]>,
}

impl<const N: usize> VonNeumann<N> {
    pub fn new(radius: usize) -> Self {
        let offsets = window_offsets(radius)
            .into_iter()
            .filter(|o: &[isize; N]| {
                !is_center(o) && o.iter().map(|d| d.unsigned_abs()).sum::<usize>() <= radius
            })
            .collect();
        VonNeumann { radius, offsets }
    }
}

impl<const N: usize> Neighborhood<N> for VonNeumann<N> {
    #[inline]
    fn offsets(&self) -> &[[isize; N]] {
        &self.offsets
    }

    #[inline]
    fn radius(&self) -> usize {
        self.radius
    }
}
