//! Stencil and cellular-automaton simulation on n-dimensional grids.
//!
//! A simulation composes three ingredients:
//!
//! - a [`NeighborhoodGrid`]: raster-ordered cells with a [`Neighborhood`]
//!   shape, a [`Boundary`] policy for reads past the edge and a [`Padding`]
//!   strategy for resolving them,
//! - a [`Ruleset`] of [`Rule`]s, each a pass over the grid per step: plain
//!   cell rules, neighborhood rules, or partial rules that write selectively
//!   across several named grids,
//! - a [`SimData`] driver that double-buffers each grid, advances the clock
//!   and fans rule passes out across cells with rayon.
//!
//! Grids are dense by default; [`SimData::enable_sparse`] switches a grid to
//! block-skipping sweeps that only visit regions near recent changes, with
//! output identical to the dense sweep.

mod boundary;
mod engine;
mod error;
mod grid;
mod kernel;
mod moore;
mod neighborhood;
mod neumann;
mod rule;
mod sparse;

pub use boundary::*;
pub use engine::*;
pub use error::*;
pub use grid::*;
pub use kernel::*;
pub use moore::*;
pub use neighborhood::*;
pub use neumann::*;
pub use rule::*;
