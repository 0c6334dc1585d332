use itertools::Itertools;

use crate::grid::{ravel, total, unravel};

/// Block-level activity tracking for sparse sweeps.
///
/// The logical grid is tiled into cubes of `edge` cells per axis (edge blocks
/// are clipped to the domain). A block is active when any of its cells
/// changed value in the previous step. A dense pass over a stencil of radius
/// up to `edge` can only change cells within one block of an active block, so
/// a sweep over [`visited_cells`](Self::visited_cells) produces the same
/// result as visiting every cell.
///
/// Every block starts active, so the first step after construction is always
/// a full sweep.
#[derive(Clone, Debug)]
pub struct ActivityMask<const N: usize> {
    edge: usize,
    extents: [usize; N],
    blocks: [usize; N],
    active: Vec<bool>,
    pending: Vec<bool>,
}

impl<const N: usize> ActivityMask<N> {
    /// `edge` must be at least the stencil radius for the skip contract to
    /// hold; the engine enforces this at configuration time.
    pub(crate) fn new(extents: [usize; N], edge: usize) -> Self {
        let mut blocks = [0usize; N];
        for i in 0..N {
            blocks[i] = (extents[i] + edge - 1) / edge;
        }
        let count = total(&blocks);
        ActivityMask {
            edge,
            extents,
            blocks,
            active: vec![true; count],
            pending: vec![false; count],
        }
    }

    fn block_of(&self, coord: &[usize; N]) -> usize {
        let mut b = [0usize; N];
        for i in 0..N {
            b[i] = coord[i] / self.edge;
        }
        ravel(&b, &self.blocks)
    }

    /// Records that the cell at `coord` changed during the current pass. The
    /// mark takes effect after the next [`advance`](Self::advance).
    pub(crate) fn mark(&mut self, coord: &[usize; N]) {
        let b = self.block_of(coord);
        self.pending[b] = true;
    }

    /// Raster-ordered indices of every cell that the next pass must visit:
    /// the cells of each active block and of its adjacent blocks, corners
    /// included.
    pub(crate) fn visited_cells(&self) -> Vec<usize> {
        let visited = self.visited_blocks();
        let mut cells = Vec::new();
        for (bix, is_visited) in visited.iter().enumerate() {
            if !is_visited {
                continue;
            }
            let block = unravel(bix, &self.blocks);
            let ranges = (0..N).map(|i| {
                let lo = block[i] * self.edge;
                let hi = ((block[i] + 1) * self.edge).min(self.extents[i]);
                lo..hi
            });
            for coord in ranges.multi_cartesian_product() {
                let mut c = [0usize; N];
                c.copy_from_slice(&coord);
                cells.push(ravel(&c, &self.extents));
            }
        }
        cells.sort_unstable();
        cells
    }

    fn visited_blocks(&self) -> Vec<bool> {
        let mut visited = vec![false; self.active.len()];
        for (bix, is_active) in self.active.iter().enumerate() {
            if !is_active {
                continue;
            }
            let block = unravel(bix, &self.blocks);
            // dilate by one block per axis, wrapping around the block grid
            // so changes crossing a toroidal boundary stay covered; for
            // Remove boundaries the extra edge visits are harmless
            let deltas = (0..N).map(|_| -1isize..=1);
            for delta in deltas.multi_cartesian_product() {
                let mut b = [0usize; N];
                for i in 0..N {
                    let m = self.blocks[i] as isize;
                    b[i] = (block[i] as isize + delta[i]).rem_euclid(m) as usize;
                }
                visited[ravel(&b, &self.blocks)] = true;
            }
        }
        visited
    }

    /// Promotes the marks gathered during the finished pass to the active
    /// set for the next one.
    pub(crate) fn advance(&mut self) {
        std::mem::swap(&mut self.active, &mut self.pending);
        self.pending.iter_mut().for_each(|p| *p = false);
    }

    #[cfg(test)]
    fn active_blocks(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }
}
