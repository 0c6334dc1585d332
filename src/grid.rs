use boolinator::Boolinator;

use crate::boundary::{Boundary, Padding};
use crate::error::ShapeError;
use crate::neighborhood::{window_offsets, Filled, Neighborhood};

/// Cell element bound used across the engine.
pub trait Cell: Clone + Default + PartialEq + Send + Sync + 'static {}

impl<T: Clone + Default + PartialEq + Send + Sync + 'static> Cell for T {}

/// Cell count of a raster-ordered region with the given extents.
pub(crate) fn total<const N: usize>(extents: &[usize; N]) -> usize {
    extents.iter().product()
}

/// Raster (row-major) index of `coord`, last axis fastest.
pub(crate) fn ravel<const N: usize>(coord: &[usize; N], extents: &[usize; N]) -> usize {
    let mut ix = 0;
    for i in 0..N {
        ix = ix * extents[i] + coord[i];
    }
    ix
}

/// Inverse of [`ravel`].
pub(crate) fn unravel<const N: usize>(mut ix: usize, extents: &[usize; N]) -> [usize; N] {
    let mut coord = [0usize; N];
    for i in (0..N).rev() {
        coord[i] = ix % extents[i];
        ix /= extents[i];
    }
    coord
}

/// A backing grid composed with a neighborhood shape, a boundary policy and a
/// padding strategy, indexable in logical coordinates.
///
/// The stored shape describes offsets only; neighbor values are read fresh on
/// every [`neighborhood_at`](Self::neighborhood_at) call. With [`Padding::Halo`]
/// the storage is enlarged by `radius` cells per side and
/// [`update_boundary`](Self::update_boundary) keeps the band in sync once per
/// step; with [`Padding::Conditional`] logical and storage coordinates
/// coincide and every neighbor read resolves the boundary on its own.
#[derive(Clone, Debug)]
pub struct NeighborhoodGrid<T, H, const N: usize> {
    cells: Vec<T>,
    extents: [usize; N],
    storage_extents: [usize; N],
    radius: usize,
    shape: H,
    boundary: Boundary<T>,
    padding: Padding,
}

impl<T, H, const N: usize> NeighborhoodGrid<T, H, N>
where
    T: Cell,
    H: Neighborhood<N>,
{
    /// Grid of default cells.
    pub fn new(
        extents: [usize; N],
        shape: H,
        boundary: Boundary<T>,
        padding: Padding,
    ) -> Result<Self, ShapeError> {
        let cells = vec![T::default(); total(&extents)];
        Self::from_cells(cells, extents, shape, boundary, padding)
    }

    /// Wraps existing cells given in raster order. Wraps in place for
    /// Conditional padding; allocates the enlarged copy and fills the border
    /// for Halo.
    pub fn from_cells(
        cells: Vec<T>,
        extents: [usize; N],
        shape: H,
        boundary: Boundary<T>,
        padding: Padding,
    ) -> Result<Self, ShapeError> {
        let radius = shape.radius();
        for (axis, &extent) in extents.iter().enumerate() {
            if radius > extent {
                return Err(ShapeError::RadiusExceedsExtent {
                    radius,
                    extent,
                    axis,
                });
            }
        }
        let expected = total(&extents);
        if cells.len() != expected {
            return Err(ShapeError::CellCount {
                cells: cells.len(),
                expected,
            });
        }
        let mut grid = match padding {
            Padding::Conditional => NeighborhoodGrid {
                cells,
                extents,
                storage_extents: extents,
                radius,
                shape,
                boundary,
                padding,
            },
            Padding::Halo => {
                let mut storage_extents = extents;
                for e in storage_extents.iter_mut() {
                    *e += 2 * radius;
                }
                let mut storage = vec![T::default(); total(&storage_extents)];
                for (ix, cell) in cells.into_iter().enumerate() {
                    let mut sc = unravel(ix, &extents);
                    for c in sc.iter_mut() {
                        *c += radius;
                    }
                    storage[ravel(&sc, &storage_extents)] = cell;
                }
                NeighborhoodGrid {
                    cells: storage,
                    extents,
                    storage_extents,
                    radius,
                    shape,
                    boundary,
                    padding,
                }
            }
        };
        grid.update_boundary();
        Ok(grid)
    }

    /// Grid built by evaluating each coordinate with a closure.
    pub fn from_fn(
        extents: [usize; N],
        shape: H,
        boundary: Boundary<T>,
        padding: Padding,
        mut f: impl FnMut([usize; N]) -> T,
    ) -> Result<Self, ShapeError> {
        let cells = (0..total(&extents)).map(|ix| f(unravel(ix, &extents))).collect();
        Self::from_cells(cells, extents, shape, boundary, padding)
    }

    /// Grid built by evaluating each centered signed coordinate with a
    /// closure, the origin at the middle of the grid.
    pub fn from_coord_map(
        extents: [usize; N],
        shape: H,
        boundary: Boundary<T>,
        padding: Padding,
        mut f: impl FnMut([isize; N]) -> T,
    ) -> Result<Self, ShapeError> {
        Self::from_fn(extents, shape, boundary, padding, |coord| {
            let mut centered = [0isize; N];
            for i in 0..N {
                centered[i] = coord[i] as isize - (extents[i] / 2) as isize;
            }
            f(centered)
        })
    }

    /// Logical (unpadded) extents.
    pub fn extents(&self) -> [usize; N] {
        self.extents
    }

    /// Logical cell count.
    pub fn len(&self) -> usize {
        total(&self.extents)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> &H {
        &self.shape
    }

    pub fn boundary(&self) -> &Boundary<T> {
        &self.boundary
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    fn storage_index(&self, coord: [usize; N]) -> usize {
        match self.padding {
            Padding::Conditional => ravel(&coord, &self.storage_extents),
            Padding::Halo => {
                let mut sc = coord;
                for c in sc.iter_mut() {
                    *c += self.radius;
                }
                ravel(&sc, &self.storage_extents)
            }
        }
    }

    /// Reads one cell at a logical coordinate. Panics when the coordinate is
    /// out of range, like slice indexing.
    pub fn get(&self, coord: [usize; N]) -> &T {
        &self.cells[self.storage_index(coord)]
    }

    /// Writes one cell at a logical coordinate. Panics when the coordinate is
    /// out of range, like slice indexing.
    pub fn set(&mut self, coord: [usize; N], value: T) {
        let ix = self.storage_index(coord);
        self.cells[ix] = value;
    }

    /// The logical cells in raster order, halo excluded.
    pub fn logical_cells(&self) -> Vec<T> {
        match self.padding {
            Padding::Conditional => self.cells.clone(),
            Padding::Halo => (0..self.len())
                .map(|ix| self.get(unravel(ix, &self.extents)).clone())
                .collect(),
        }
    }

    pub(crate) fn storage(&self) -> &[T] {
        &self.cells
    }

    /// Overwrites this grid's storage from another grid of identical layout.
    pub(crate) fn clone_cells_from(&mut self, other: &Self) {
        self.cells.clone_from(&other.cells);
    }

    /// One neighbor value under the grid's boundary and padding policy.
    fn read_offset(&self, center: [usize; N], offset: &[isize; N]) -> T {
        match self.padding {
            Padding::Halo => {
                // center + radius + offset stays inside storage for any
                // in-radius offset.
                let mut sc = [0usize; N];
                for i in 0..N {
                    sc[i] = ((center[i] + self.radius) as isize + offset[i]) as usize;
                }
                self.cells[ravel(&sc, &self.storage_extents)].clone()
            }
            Padding::Conditional => match &self.boundary {
                Boundary::Wrap => {
                    let mut c = [0usize; N];
                    for i in 0..N {
                        let extent = self.extents[i] as isize;
                        let mut v = center[i] as isize + offset[i];
                        // radius <= extent, so one correction suffices
                        if v < 0 {
                            v += extent;
                        } else if v >= extent {
                            v -= extent;
                        }
                        c[i] = v as usize;
                    }
                    self.cells[ravel(&c, &self.storage_extents)].clone()
                }
                Boundary::Remove(fill) => {
                    let mut c = [0usize; N];
                    let inside = (0..N).all(|i| {
                        let v = center[i] as isize + offset[i];
                        if v < 0 || v >= self.extents[i] as isize {
                            false
                        } else {
                            c[i] = v as usize;
                            true
                        }
                    });
                    inside
                        .as_some_from(|| self.cells[ravel(&c, &self.storage_extents)].clone())
                        .unwrap_or_else(|| fill.clone())
                }
            },
        }
    }

    /// The neighbor values around `coord`, in offset order.
    pub fn neighbors_at(&self, coord: [usize; N]) -> Vec<T> {
        self.shape
            .offsets()
            .iter()
            .map(|o| self.read_offset(coord, o))
            .collect()
    }

    /// The neighbor values wrapped together with the shape that read them.
    pub fn neighborhood_at(&self, coord: [usize; N]) -> Filled<'_, H, T> {
        Filled::new(&self.shape, self.neighbors_at(coord))
    }

    /// Every value in the full `diameter()`-wide window around `coord`,
    /// center included, in raster order.
    pub fn windowed_at(&self, coord: [usize; N]) -> Vec<T> {
        window_offsets::<N>(self.radius)
            .iter()
            .map(|o| self.read_offset(coord, o))
            .collect()
    }

    /// Refreshes the halo band from the boundary policy: wrapped copies of
    /// the opposite edge for [`Boundary::Wrap`] (corners come from the
    /// diagonally opposite corner), the fill value for [`Boundary::Remove`].
    /// No-op for Conditional padding. Idempotent while the interior is
    /// unchanged.
    pub fn update_boundary(&mut self) {
        if self.padding != Padding::Halo || self.radius == 0 {
            return;
        }
        for ix in 0..self.cells.len() {
            let sc = unravel(ix, &self.storage_extents);
            let interior =
                (0..N).all(|i| sc[i] >= self.radius && sc[i] < self.radius + self.extents[i]);
            if interior {
                continue;
            }
            match &self.boundary {
                Boundary::Wrap => {
                    let mut src = [0usize; N];
                    for i in 0..N {
                        let extent = self.extents[i] as isize;
                        let logical = sc[i] as isize - self.radius as isize;
                        src[i] = logical.rem_euclid(extent) as usize + self.radius;
                    }
                    let value = self.cells[ravel(&src, &self.storage_extents)].clone();
                    self.cells[ix] = value;
                }
                Boundary::Remove(fill) => {
                    let fill = fill.clone();
                    self.cells[ix] = fill;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moore::Moore;
    use enum_iterator::IntoEnumIterator;

    fn line(boundary: Boundary<i32>, padding: Padding) -> NeighborhoodGrid<i32, Moore<1>, 1> {
        NeighborhoodGrid::from_cells(vec![1, 2, 3, 4], [4], Moore::new(1), boundary, padding)
            .unwrap()
    }

    #[test]
    fn wrap_halo_round_trip() {
        let grid = line(Boundary::Wrap, Padding::Halo);
        // pad cells mirror the opposite interior edge
        assert_eq!(grid.storage(), &[4, 1, 2, 3, 4, 1]);
        assert_eq!(grid.neighbors_at([0]), vec![4, 2]);
        assert_eq!(grid.neighbors_at([3]), vec![3, 1]);
    }

    #[test]
    fn remove_conditional_fills_out_of_domain() {
        let grid = NeighborhoodGrid::from_cells(
            vec![1, 2, 3, 4],
            [2, 2],
            Moore::<2>::new(1),
            Boundary::Remove(0),
            Padding::Conditional,
        )
        .unwrap();
        let neighbors = grid.neighbors_at([0, 0]);
        // first offset is (-1, -1)
        assert_eq!(neighbors[0], 0);
        assert_eq!(neighbors, vec![0, 0, 0, 0, 2, 0, 3, 4]);
    }

    #[test]
    fn interior_reads_agree_across_paddings() {
        for boundary in [Boundary::Wrap, Boundary::Remove(-1)] {
            let grids: Vec<_> = Padding::into_enum_iter()
                .map(|padding| {
                    NeighborhoodGrid::from_fn(
                        [5, 5],
                        Moore::<2>::new(1),
                        boundary.clone(),
                        padding,
                        |c| (c[0] * 5 + c[1]) as i32,
                    )
                    .unwrap()
                })
                .collect();
            for row in 1..4 {
                for col in 1..4 {
                    assert_eq!(
                        grids[0].neighbors_at([row, col]),
                        grids[1].neighbors_at([row, col]),
                        "interior coordinate ({row}, {col})"
                    );
                }
            }
        }
    }

    #[test]
    fn boundary_refresh_is_idempotent() {
        for boundary in [Boundary::Wrap, Boundary::Remove(9)] {
            let mut grid = line(boundary, Padding::Halo);
            let once = grid.storage().to_vec();
            grid.update_boundary();
            assert_eq!(grid.storage(), &once[..]);
        }
    }

    #[test]
    fn radius_must_fit_the_extents() {
        let err = NeighborhoodGrid::<i32, _, 2>::new(
            [8, 2],
            Moore::<2>::new(3),
            Boundary::Wrap,
            Padding::Conditional,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ShapeError::RadiusExceedsExtent {
                radius: 3,
                extent: 2,
                axis: 1
            }
        );
    }

    #[test]
    fn cell_count_must_fill_the_extents() {
        let err = NeighborhoodGrid::from_cells(
            vec![0; 5],
            [2, 3],
            Moore::<2>::new(1),
            Boundary::Wrap,
            Padding::Conditional,
        )
        .unwrap_err();
        assert_eq!(err, ShapeError::CellCount { cells: 5, expected: 6 });
    }

    #[test]
    fn get_and_set_use_logical_coordinates() {
        for padding in Padding::into_enum_iter() {
            let mut grid = NeighborhoodGrid::from_fn(
                [3, 3],
                Moore::<2>::new(1),
                Boundary::Remove(0),
                padding,
                |c| (c[0] * 3 + c[1]) as i32,
            )
            .unwrap();
            assert_eq!(*grid.get([1, 2]), 5);
            grid.set([1, 2], 50);
            assert_eq!(*grid.get([1, 2]), 50);
            assert_eq!(grid.logical_cells(), vec![0, 1, 2, 3, 4, 50, 6, 7, 8]);
        }
    }

    #[test]
    fn windowed_read_includes_the_center() {
        let grid = NeighborhoodGrid::from_fn(
            [3, 3],
            Moore::<2>::new(1),
            Boundary::Remove(0),
            Padding::Conditional,
            |c| (c[0] * 3 + c[1]) as i32,
        )
        .unwrap();
        assert_eq!(grid.windowed_at([1, 1]), vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn paddings_agree_at_every_coordinate() {
        for boundary in [Boundary::Wrap, Boundary::Remove(7)] {
            let grids: Vec<_> = Padding::into_enum_iter()
                .map(|padding| {
                    NeighborhoodGrid::from_fn(
                        [4, 4],
                        Moore::<2>::new(1),
                        boundary.clone(),
                        padding,
                        |c| (c[0] * 4 + c[1]) as i32,
                    )
                    .unwrap()
                })
                .collect();
            for ix in 0..16 {
                let coord = unravel(ix, &[4, 4]);
                assert_eq!(
                    grids[0].neighbors_at(coord),
                    grids[1].neighbors_at(coord),
                    "coordinate {coord:?}"
                );
            }
        }
    }
}
