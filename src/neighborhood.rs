use std::sync::Arc;

use float_ord::FloatOrd;
use itertools::Itertools;

/// A fixed pattern of relative offsets around a center cell.
///
/// A shape is immutable: its offset list is fixed at construction and must be
/// identical across instances of the same parameterization. The center offset
/// (all zeros) is never included. Values read through a shape live in
/// [`Filled`], never in the shape itself, so one shape serves every coordinate
/// of a grid without reallocation.
pub trait Neighborhood<const N: usize>: Send + Sync {
    /// The ordered relative offsets of every neighbor.
    fn offsets(&self) -> &[[isize; N]];

    /// The maximum absolute coordinate over all offsets.
    fn radius(&self) -> usize;

    /// The number of neighbors.
    fn len(&self) -> usize {
        self.offsets().len()
    }

    fn is_empty(&self) -> bool {
        self.offsets().is_empty()
    }

    /// Cells spanned per axis.
    fn diameter(&self) -> usize {
        2 * self.radius() + 1
    }

    /// Euclidean center-to-center distance of every offset, in offset order.
    fn distances(&self) -> Vec<f64> {
        self.offsets()
            .iter()
            .map(|o| o.iter().map(|&d| (d * d) as f64).sum::<f64>().sqrt())
            .collect()
    }

    /// Classifies each offset by the product of its coordinates: zero for
    /// axis-aligned offsets, signed quadrant parity otherwise.
    fn distance_zones(&self) -> Vec<isize> {
        self.offsets().iter().map(|o| o.iter().product()).collect()
    }

    /// The largest Euclidean offset distance.
    fn max_distance(&self) -> f64 {
        self.distances()
            .into_iter()
            .map(FloatOrd)
            .max()
            .map(|d| d.0)
            .unwrap_or(0.0)
    }

    /// Absolute coordinates of every neighbor around `center`, in offset
    /// order. The results may leave the domain; boundary policy is applied by
    /// the grid, not here.
    fn indices(&self, center: [usize; N]) -> Vec<[isize; N]> {
        self.offsets()
            .iter()
            .map(|o| {
                let mut c = [0isize; N];
                for i in 0..N {
                    c[i] = center[i] as isize + o[i];
                }
                c
            })
            .collect()
    }
}

impl<const N: usize, H> Neighborhood<N> for Box<H>
where
    H: Neighborhood<N> + ?Sized,
{
    fn offsets(&self) -> &[[isize; N]] {
        (**self).offsets()
    }

    fn radius(&self) -> usize {
        (**self).radius()
    }
}

impl<const N: usize, H> Neighborhood<N> for Arc<H>
where
    H: Neighborhood<N> + ?Sized,
{
    fn offsets(&self) -> &[[isize; N]] {
        (**self).offsets()
    }

    fn radius(&self) -> usize {
        (**self).radius()
    }
}

/// Every offset within Chebyshev `radius` in raster order, center included.
/// Shapes filter the center out; windowed reads keep it.
pub(crate) fn window_offsets<const N: usize>(radius: usize) -> Vec<[isize; N]> {
    let r = radius as isize;
    (0..N)
        .map(|_| -r..=r)
        .multi_cartesian_product()
        .map(|v| {
            let mut o = [0isize; N];
            o.copy_from_slice(&v);
            o
        })
        .collect()
}

pub(crate) fn is_center<const N: usize>(offset: &[isize; N]) -> bool {
    offset.iter().all(|&d| d == 0)
}

fn max_abs<const N: usize>(offsets: &[[isize; N]]) -> usize {
    offsets
        .iter()
        .flat_map(|o| o.iter())
        .map(|d| d.unsigned_abs())
        .max()
        .unwrap_or(0)
}

/// The full square/cube of cells within `radius` of the center, in raster
/// order. The center itself is excluded from `offsets()` like every other
/// shape; use [`NeighborhoodGrid::windowed_at`](crate::NeighborhoodGrid::windowed_at)
/// to read the window with the center in place.
#[derive(Clone, Debug)]
pub struct Window<const N: usize> {
    radius: usize,
    offsets: Vec<[isize; N]>,
}

impl<const N: usize> Window<N> {
    pub fn new(radius: usize) -> Self {
        let offsets = window_offsets(radius)
            .into_iter()
            .filter(|o| !is_center(o))
            .collect();
        Window { radius, offsets }
    }
}

impl<const N: usize> Neighborhood<N> for Window<N> {
    #[inline]
    fn offsets(&self) -> &[[isize; N]] {
        &self.offsets
    }

    #[inline]
    fn radius(&self) -> usize {
        self.radius
    }
}

/// An explicit list of arbitrary offsets. The zero tuple is filtered out and
/// the radius is derived from the largest coordinate.
#[derive(Clone, Debug)]
pub struct Positional<const N: usize> {
    radius: usize,
    offsets: Vec<[isize; N]>,
}

impl<const N: usize> Positional<N> {
    pub fn new(offsets: impl IntoIterator<Item = [isize; N]>) -> Self {
        let offsets: Vec<_> = offsets.into_iter().filter(|o| !is_center(o)).collect();
        let radius = max_abs(&offsets);
        Positional { radius, offsets }
    }
}

impl<const N: usize> Neighborhood<N> for Positional<N> {
    #[inline]
    fn offsets(&self) -> &[[isize; N]] {
        &self.offsets
    }

    #[inline]
    fn radius(&self) -> usize {
        self.radius
    }
}

/// An ordered union of sub-neighborhoods. The combined offset list is
/// flattened at construction, layer by layer, so reads stay a single pass.
#[derive(Clone)]
pub struct Layered<const N: usize> {
    radius: usize,
    offsets: Vec<[isize; N]>,
    layers: Vec<Arc<dyn Neighborhood<N>>>,
}

impl<const N: usize> Layered<N> {
    pub fn new() -> Self {
        Layered {
            radius: 0,
            offsets: Vec::new(),
            layers: Vec::new(),
        }
    }

    pub fn with<H: Neighborhood<N> + 'static>(mut self, layer: H) -> Self {
        self.offsets.extend_from_slice(layer.offsets());
        self.radius = self.radius.max(layer.radius());
        self.layers.push(Arc::new(layer));
        self
    }

    /// The sub-neighborhoods in layering order.
    pub fn layers(&self) -> &[Arc<dyn Neighborhood<N>>] {
        &self.layers
    }
}

impl<const N: usize> Default for Layered<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Neighborhood<N> for Layered<N> {
    #[inline]
    fn offsets(&self) -> &[[isize; N]] {
        &self.offsets
    }

    #[inline]
    fn radius(&self) -> usize {
        self.radius
    }
}

/// A neighborhood shape paired with the values just read around one
/// coordinate, ordered consistently with `offsets()`.
///
/// Produced by [`NeighborhoodGrid::neighborhood_at`](crate::NeighborhoodGrid::neighborhood_at).
/// Reading again produces a new `Filled`; the shape itself is never mutated.
#[derive(Clone, Debug)]
pub struct Filled<'a, H, T> {
    shape: &'a H,
    values: Vec<T>,
}

impl<'a, H, T> Filled<'a, H, T> {
    pub(crate) fn new(shape: &'a H, values: Vec<T>) -> Self {
        Filled { shape, values }
    }

    pub fn shape(&self) -> &H {
        self.shape
    }

    /// The last-read neighbor values, in offset order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    /// The values paired with the offsets that produced them.
    pub fn offset_values<const N: usize>(&self) -> impl Iterator<Item = (&[isize; N], &T)>
    where
        H: Neighborhood<N>,
    {
        self.shape.offsets().iter().zip(self.values.iter())
    }
}
