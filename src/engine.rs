use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{ConfigError, RuleError, ShapeError, SimError};
use crate::grid::{total, unravel, Cell, NeighborhoodGrid};
use crate::neighborhood::{Filled, Neighborhood};
use crate::rule::{GridName, Rule, Ruleset, StepContext, DEFAULT_GRID};
use crate::sparse::ActivityMask;

/// A shared stop switch for a running simulation.
///
/// Clones observe the same flag, so a controlling thread can stop a stepping
/// loop without holding a reference to the simulation itself.
#[derive(Clone, Debug)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        RunFlag(Arc::new(AtomicBool::new(true)))
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Double buffer for one named grid: rules read `source`, write `dest`, and
/// the two swap roles after each pass so the freshly written buffer becomes
/// the next pass's source.
struct GridPair<T, H, const N: usize> {
    source: NeighborhoodGrid<T, H, N>,
    dest: NeighborhoodGrid<T, H, N>,
    activity: Option<ActivityMask<N>>,
}

impl<T, H, const N: usize> GridPair<T, H, N>
where
    T: Cell,
    H: Neighborhood<N> + Clone,
{
    fn new(grid: NeighborhoodGrid<T, H, N>) -> Self {
        let dest = grid.clone();
        GridPair {
            source: grid,
            dest,
            activity: None,
        }
    }
}

/// The logical cells of one named grid at one point in time.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Snapshot<T, const N: usize> {
    pub name: GridName,
    pub extents: [usize; N],
    pub cells: Vec<T>,
}

/// A completed step: the frame time and a snapshot of every grid.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Frame<T, const N: usize> {
    pub time: u64,
    pub grids: Vec<Snapshot<T, N>>,
}

impl<T, const N: usize> Frame<T, N> {
    /// The cells of the named grid, if present.
    pub fn grid(&self, name: GridName) -> Option<&[T]> {
        self.grids
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.cells.as_slice())
    }
}

/// A consumer of completed frames during a [`SimData::run`].
pub trait FrameSink<T, const N: usize> {
    fn push(&mut self, frame: Frame<T, N>);
}

impl<T, const N: usize> FrameSink<T, N> for Vec<Frame<T, N>> {
    fn push(&mut self, frame: Frame<T, N>) {
        Vec::push(self, frame);
    }
}

/// A stepping simulation: named grids, an ordered ruleset, and a clock.
///
/// Each [`step`](Self::step) advances the clock, lets every rule derive its
/// per-step state, then applies the rules in order, one full pass each.
/// Cell and neighborhood passes fan out across cells with rayon; partial
/// passes run serially because they take a mutable view of their write grids.
pub struct SimData<T, H, const N: usize> {
    time: u64,
    grids: Vec<(GridName, GridPair<T, H, N>)>,
    rules: Ruleset<T, H, N>,
    running: RunFlag,
}

impl<T, H, const N: usize> SimData<T, H, N>
where
    T: Cell,
    H: Neighborhood<N> + Clone,
{
    /// Assembles a simulation, checking every rule's grid bindings against
    /// the provided grids. All grids must share one set of extents.
    pub fn new(
        grids: Vec<(GridName, NeighborhoodGrid<T, H, N>)>,
        rules: Ruleset<T, H, N>,
    ) -> Result<Self, SimError> {
        let (first_name, first) = grids.first().ok_or(ConfigError::NoGrids)?;
        let first_name = *first_name;
        let extents = first.extents();
        for (ix, (name, grid)) in grids.iter().enumerate() {
            if grids[..ix].iter().any(|(n, _)| n == name) {
                return Err(ConfigError::DuplicateGrid(name).into());
            }
            if grid.extents() != extents {
                return Err(ShapeError::MismatchedGrids {
                    a: first_name,
                    b: name,
                }
                .into());
            }
        }
        for rule in rules.iter() {
            for name in rule.reads() {
                if !grids.iter().any(|(n, _)| *n == name) {
                    return Err(ConfigError::UnknownReadGrid(name).into());
                }
            }
            for name in rule.writes() {
                if !grids.iter().any(|(n, _)| *n == name) {
                    return Err(ConfigError::UnknownWriteGrid(name).into());
                }
            }
        }
        Ok(SimData {
            time: 0,
            grids: grids
                .into_iter()
                .map(|(name, grid)| (name, GridPair::new(grid)))
                .collect(),
            rules,
            running: RunFlag::new(),
        })
    }

    /// A simulation over a single grid bound to [`DEFAULT_GRID`].
    pub fn single(
        grid: NeighborhoodGrid<T, H, N>,
        rules: Ruleset<T, H, N>,
    ) -> Result<Self, SimError> {
        Self::new(vec![(DEFAULT_GRID, grid)], rules)
    }

    /// Starts the clock at `time` instead of zero. The first produced frame
    /// carries `time + 1`.
    pub fn with_time(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    /// Switches the named grid to sparse stepping with cubic blocks of
    /// `block_edge` cells per axis. The edge must be at least the grid's
    /// stencil radius, otherwise changes could escape the visited band.
    pub fn enable_sparse(&mut self, name: GridName, block_edge: usize) -> Result<(), ConfigError> {
        let pair = self
            .grids
            .iter_mut()
            .find(|(n, _)| *n == name)
            .map(|(_, pair)| pair)
            .ok_or(ConfigError::UnknownGrid(name))?;
        let radius = pair.source.radius();
        if block_edge == 0 || block_edge < radius {
            return Err(ConfigError::BlockEdge {
                edge: block_edge,
                radius,
            });
        }
        pair.activity = Some(ActivityMask::new(pair.source.extents(), block_edge));
        Ok(())
    }

    /// The time of the last completed step.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// A handle onto the stop switch, sharable across threads.
    pub fn run_flag(&self) -> RunFlag {
        self.running.clone()
    }

    /// The current state of a named grid.
    pub fn grid(&self, name: GridName) -> Option<&NeighborhoodGrid<T, H, N>> {
        self.grids
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, pair)| &pair.source)
    }

    fn advance(&mut self) -> StepContext {
        self.time += 1;
        let ctx = StepContext::new(self.time);
        for rule in self.rules.iter_mut() {
            rule.precalc(&ctx);
        }
        ctx
    }

    /// Runs one step. Returns `Ok(false)` without stepping when the run flag
    /// has been stopped. On a rule error the step is abandoned, the run flag
    /// is lowered and the grids keep the last completed step's state.
    pub fn step(&mut self) -> Result<bool, SimError> {
        if !self.running.is_running() {
            return Ok(false);
        }
        let ctx = self.advance();
        for ix in 0..self.rules.len() {
            if let Some(rule) = self.rules.get(ix) {
                if let Err(e) = apply_rule(rule, &mut self.grids, &ctx) {
                    self.running.stop();
                    return Err(e);
                }
            }
        }
        Ok(true)
    }

    /// The current state of every grid as a frame stamped with the current
    /// time.
    pub fn snapshot(&self) -> Frame<T, N> {
        Frame {
            time: self.time,
            grids: self
                .grids
                .iter()
                .map(|(name, pair)| Snapshot {
                    name: *name,
                    extents: pair.source.extents(),
                    cells: pair.source.logical_cells(),
                })
                .collect(),
        }
    }

    /// Steps `span` times, pushing each completed frame into `sink`. Stops
    /// early without error when the run flag is lowered.
    pub fn run(&mut self, span: u64, sink: &mut impl FrameSink<T, N>) -> Result<(), SimError> {
        for _ in 0..span {
            if !self.step()? {
                break;
            }
            sink.push(self.snapshot());
        }
        Ok(())
    }

    /// An iterator of at most `span` frames, stepping lazily. Ends early when
    /// the run flag is lowered and after yielding the first error.
    pub fn frames(&mut self, span: u64) -> Frames<'_, T, H, N> {
        Frames {
            sim: self,
            remaining: span,
            halted: false,
        }
    }
}

/// See [`SimData::frames`].
pub struct Frames<'a, T, H, const N: usize> {
    sim: &'a mut SimData<T, H, N>,
    remaining: u64,
    halted: bool,
}

impl<T, H, const N: usize> Iterator for Frames<'_, T, H, N>
where
    T: Cell,
    H: Neighborhood<N> + Clone,
{
    type Item = Result<Frame<T, N>, SimError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        match self.sim.step() {
            Ok(true) => Some(Ok(self.sim.snapshot())),
            Ok(false) => None,
            Err(e) => {
                self.halted = true;
                Some(Err(e))
            }
        }
    }
}

/// The mutable view of a partial pass: read access to the rule's declared
/// read grids (the step's source buffers) and write access to its declared
/// write grids. Cells the rule never writes keep their prior value.
pub struct PartialPass<'a, T, H, const N: usize> {
    sources: Vec<(GridName, &'a NeighborhoodGrid<T, H, N>)>,
    dests: Vec<(
        GridName,
        &'a mut NeighborhoodGrid<T, H, N>,
        Option<&'a mut ActivityMask<N>>,
    )>,
}

impl<T, H, const N: usize> PartialPass<'_, T, H, N>
where
    T: Cell,
    H: Neighborhood<N>,
{
    fn source(&self, name: GridName) -> Result<&NeighborhoodGrid<T, H, N>, RuleError> {
        self.sources
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, grid)| *grid)
            .ok_or_else(|| RuleError::new(format!("rule read undeclared grid `{name}`")))
    }

    /// One cell of a declared read grid, as of the start of the step.
    pub fn get(&self, name: GridName, coord: [usize; N]) -> Result<T, RuleError> {
        Ok(self.source(name)?.get(coord).clone())
    }

    /// The neighborhood around `coord` in a declared read grid.
    pub fn neighborhood(
        &self,
        name: GridName,
        coord: [usize; N],
    ) -> Result<Filled<'_, H, T>, RuleError> {
        Ok(self.source(name)?.neighborhood_at(coord))
    }

    /// Writes one cell of a declared write grid. Writing an unchanged value
    /// is a no-op.
    pub fn write(&mut self, name: GridName, coord: [usize; N], value: T) -> Result<(), RuleError> {
        let (_, dest, mask) = self
            .dests
            .iter_mut()
            .find(|(n, _, _)| *n == name)
            .ok_or_else(|| RuleError::new(format!("rule wrote undeclared grid `{name}`")))?;
        if *dest.get(coord) != value {
            if let Some(mask) = mask {
                mask.mark(&coord);
            }
            dest.set(coord, value);
        }
        Ok(())
    }
}

fn pair_ref<'a, T, H, const N: usize>(
    grids: &'a [(GridName, GridPair<T, H, N>)],
    name: GridName,
) -> Result<&'a GridPair<T, H, N>, ConfigError> {
    grids
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, pair)| pair)
        .ok_or(ConfigError::UnknownReadGrid(name))
}

fn pair_mut<'a, T, H, const N: usize>(
    grids: &'a mut [(GridName, GridPair<T, H, N>)],
    name: GridName,
) -> Result<&'a mut GridPair<T, H, N>, ConfigError> {
    grids
        .iter_mut()
        .find(|(n, _)| *n == name)
        .map(|(_, pair)| pair)
        .ok_or(ConfigError::UnknownWriteGrid(name))
}

/// The cells the pass must visit, or `None` for a dense sweep. Sparse
/// skipping only applies when the pass reads and writes the same grid, since
/// the mask tracks that one grid's changes.
fn sparse_visited<T, H, const N: usize>(
    grids: &[(GridName, GridPair<T, H, N>)],
    read: GridName,
    write: GridName,
) -> Result<Option<Vec<usize>>, ConfigError> {
    if read != write {
        return Ok(None);
    }
    Ok(pair_ref(grids, write)?
        .activity
        .as_ref()
        .map(|mask| mask.visited_cells()))
}

/// Commits a completed cell or neighborhood pass: writes the computed values
/// into the dest buffer, refreshes its halo, swaps it in as the new source
/// and rotates the activity mask.
fn finish_pass<T, H, const N: usize>(
    pair: &mut GridPair<T, H, N>,
    values: Vec<(usize, T)>,
    extents: &[usize; N],
    sparse: bool,
) where
    T: Cell,
    H: Neighborhood<N>,
{
    if sparse {
        // unvisited cells keep their prior value
        pair.dest.clone_cells_from(&pair.source);
    }
    for (ix, value) in values {
        let coord = unravel(ix, extents);
        if let Some(mask) = pair.activity.as_mut() {
            if value != *pair.source.get(coord) {
                mask.mark(&coord);
            }
        }
        pair.dest.set(coord, value);
    }
    pair.dest.update_boundary();
    mem::swap(&mut pair.source, &mut pair.dest);
    if let Some(mask) = pair.activity.as_mut() {
        mask.advance();
    }
}

fn apply_rule<T, H, const N: usize>(
    rule: &Rule<T, H, N>,
    grids: &mut Vec<(GridName, GridPair<T, H, N>)>,
    ctx: &StepContext,
) -> Result<(), SimError>
where
    T: Cell,
    H: Neighborhood<N> + Clone,
{
    match rule {
        Rule::Cell(rule) => {
            let read = rule.reads();
            let write = rule.writes();
            let visited = sparse_visited(grids, read, write)?;
            let source = &pair_ref(grids, read)?.source;
            let extents = source.extents();
            let values = match &visited {
                Some(cells) => cells
                    .par_iter()
                    .map(|&ix| {
                        let coord = unravel(ix, &extents);
                        rule.apply(ctx, coord, source.get(coord)).map(|v| (ix, v))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                None => (0..source.len())
                    .into_par_iter()
                    .map(|ix| {
                        let coord = unravel(ix, &extents);
                        rule.apply(ctx, coord, source.get(coord)).map(|v| (ix, v))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            };
            finish_pass(pair_mut(grids, write)?, values, &extents, visited.is_some());
        }
        Rule::Neighborhood(rule) => {
            let read = rule.reads();
            let write = rule.writes();
            let visited = sparse_visited(grids, read, write)?;
            let source = &pair_ref(grids, read)?.source;
            let extents = source.extents();
            let values = match &visited {
                Some(cells) => cells
                    .par_iter()
                    .map(|&ix| {
                        let coord = unravel(ix, &extents);
                        let hood = source.neighborhood_at(coord);
                        rule.apply(ctx, coord, source.get(coord), &hood)
                            .map(|v| (ix, v))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                None => (0..source.len())
                    .into_par_iter()
                    .map(|ix| {
                        let coord = unravel(ix, &extents);
                        let hood = source.neighborhood_at(coord);
                        rule.apply(ctx, coord, source.get(coord), &hood)
                            .map(|v| (ix, v))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            };
            finish_pass(pair_mut(grids, write)?, values, &extents, visited.is_some());
        }
        Rule::Partial(rule) => {
            let reads = rule.reads();
            let writes = rule.writes();
            let extents = grids
                .first()
                .map(|(_, pair)| pair.source.extents())
                .ok_or(ConfigError::NoGrids)?;
            for name in &writes {
                let pair = pair_mut(grids, name)?;
                pair.dest.clone_cells_from(&pair.source);
            }
            let mut sources = Vec::new();
            let mut dests = Vec::new();
            for (name, pair) in grids.iter_mut() {
                let GridPair {
                    source,
                    dest,
                    activity,
                } = pair;
                if reads.contains(name) {
                    sources.push((*name, &*source));
                }
                if writes.contains(name) {
                    dests.push((*name, dest, activity.as_mut()));
                }
            }
            let mut pass = PartialPass { sources, dests };
            for ix in 0..total(&extents) {
                let coord = unravel(ix, &extents);
                rule.apply(ctx, &mut pass, coord)?;
            }
            drop(pass);
            for name in &writes {
                let pair = pair_mut(grids, name)?;
                pair.dest.update_boundary();
                mem::swap(&mut pair.source, &mut pair.dest);
                if let Some(mask) = pair.activity.as_mut() {
                    mask.advance();
                }
            }
        }
    }
    Ok(())
}
