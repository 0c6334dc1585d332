use crate::error::RuleError;
use crate::grid::Cell;
use crate::neighborhood::{Filled, Neighborhood};

/// Name of a grid within a simulation.
pub type GridName = &'static str;

/// The grid name used by single-grid simulations.
pub const DEFAULT_GRID: GridName = "grid";

/// Step-wide state handed to every rule before a pass, once per step.
#[derive(Clone, Copy, Debug)]
pub struct StepContext {
    time: u64,
}

impl StepContext {
    pub(crate) fn new(time: u64) -> Self {
        StepContext { time }
    }

    /// The time the frame being produced will carry.
    pub fn time(&self) -> u64 {
        self.time
    }
}

/// A rule over a single cell value.
pub trait CellRule<T, const N: usize>: Send + Sync
where
    T: Cell,
{
    /// Grid the rule reads from.
    fn reads(&self) -> GridName {
        DEFAULT_GRID
    }

    /// Grid the rule writes to.
    fn writes(&self) -> GridName {
        DEFAULT_GRID
    }

    /// Runs once per step before any cell is visited. Rules that depend on
    /// the step number derive their per-step state here.
    fn precalc(&mut self, _ctx: &StepContext) {}

    fn apply(&self, ctx: &StepContext, coord: [usize; N], state: &T) -> Result<T, RuleError>;
}

/// A rule over a cell and the values of its neighborhood.
pub trait NeighborhoodRule<T, H, const N: usize>: Send + Sync
where
    T: Cell,
    H: Neighborhood<N>,
{
    fn reads(&self) -> GridName {
        DEFAULT_GRID
    }

    fn writes(&self) -> GridName {
        DEFAULT_GRID
    }

    fn precalc(&mut self, _ctx: &StepContext) {}

    fn apply(
        &self,
        ctx: &StepContext,
        coord: [usize; N],
        state: &T,
        neighborhood: &Filled<'_, H, T>,
    ) -> Result<T, RuleError>;
}

/// A rule that visits every coordinate but writes only where it chooses, into
/// any of its declared write grids. Unwritten cells keep their prior value.
pub trait PartialRule<T, H, const N: usize>: Send + Sync
where
    T: Cell,
    H: Neighborhood<N>,
{
    fn reads(&self) -> Vec<GridName> {
        vec![DEFAULT_GRID]
    }

    fn writes(&self) -> Vec<GridName> {
        vec![DEFAULT_GRID]
    }

    fn precalc(&mut self, _ctx: &StepContext) {}

    fn apply(
        &self,
        ctx: &StepContext,
        pass: &mut crate::engine::PartialPass<'_, T, H, N>,
        coord: [usize; N],
    ) -> Result<(), RuleError>;
}

/// A pipeline of cell rules applied in order within one pass. Each stage sees
/// the previous stage's output; the grid is written once, after the last
/// stage.
pub struct Chain<T, const N: usize> {
    rules: Vec<Box<dyn CellRule<T, N>>>,
}

impl<T, const N: usize> Chain<T, N>
where
    T: Cell,
{
    pub fn new() -> Self {
        Chain { rules: Vec::new() }
    }

    pub fn with<R: CellRule<T, N> + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T, const N: usize> Default for Chain<T, N>
where
    T: Cell,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> CellRule<T, N> for Chain<T, N>
where
    T: Cell,
{
    fn reads(&self) -> GridName {
        self.rules.first().map(|r| r.reads()).unwrap_or(DEFAULT_GRID)
    }

    fn writes(&self) -> GridName {
        self.rules.last().map(|r| r.writes()).unwrap_or(DEFAULT_GRID)
    }

    fn precalc(&mut self, ctx: &StepContext) {
        for rule in self.rules.iter_mut() {
            rule.precalc(ctx);
        }
    }

    fn apply(&self, ctx: &StepContext, coord: [usize; N], state: &T) -> Result<T, RuleError> {
        let mut state = state.clone();
        for rule in self.rules.iter() {
            state = rule.apply(ctx, coord, &state)?;
        }
        Ok(state)
    }
}

/// One pass of a simulation step: a rule of any flavor, boxed.
pub enum Rule<T, H, const N: usize> {
    Cell(Box<dyn CellRule<T, N>>),
    Neighborhood(Box<dyn NeighborhoodRule<T, H, N>>),
    Partial(Box<dyn PartialRule<T, H, N>>),
}

impl<T, H, const N: usize> Rule<T, H, N>
where
    T: Cell,
    H: Neighborhood<N>,
{
    pub fn cell<R: CellRule<T, N> + 'static>(rule: R) -> Self {
        Rule::Cell(Box::new(rule))
    }

    pub fn neighborhood<R: NeighborhoodRule<T, H, N> + 'static>(rule: R) -> Self {
        Rule::Neighborhood(Box::new(rule))
    }

    pub fn partial<R: PartialRule<T, H, N> + 'static>(rule: R) -> Self {
        Rule::Partial(Box::new(rule))
    }

    /// Grids this rule reads from.
    pub fn reads(&self) -> Vec<GridName> {
        match self {
            Rule::Cell(r) => vec![r.reads()],
            Rule::Neighborhood(r) => vec![r.reads()],
            Rule::Partial(r) => r.reads(),
        }
    }

    /// Grids this rule writes to.
    pub fn writes(&self) -> Vec<GridName> {
        match self {
            Rule::Cell(r) => vec![r.writes()],
            Rule::Neighborhood(r) => vec![r.writes()],
            Rule::Partial(r) => r.writes(),
        }
    }

    pub(crate) fn precalc(&mut self, ctx: &StepContext) {
        match self {
            Rule::Cell(r) => r.precalc(ctx),
            Rule::Neighborhood(r) => r.precalc(ctx),
            Rule::Partial(r) => r.precalc(ctx),
        }
    }
}

/// The ordered rules of a simulation, applied one pass each per step.
pub struct Ruleset<T, H, const N: usize> {
    rules: Vec<Rule<T, H, N>>,
}

impl<T, H, const N: usize> Ruleset<T, H, N>
where
    T: Cell,
    H: Neighborhood<N>,
{
    pub fn new() -> Self {
        Ruleset { rules: Vec::new() }
    }

    pub fn with(mut self, rule: Rule<T, H, N>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push(&mut self, rule: Rule<T, H, N>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, ix: usize) -> Option<&Rule<T, H, N>> {
        self.rules.get(ix)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule<T, H, N>> {
        self.rules.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Rule<T, H, N>> {
        self.rules.iter_mut()
    }
}

impl<T, H, const N: usize> Default for Ruleset<T, H, N>
where
    T: Cell,
    H: Neighborhood<N>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Add(i32);

    impl CellRule<i32, 1> for Add {
        fn apply(&self, _: &StepContext, _: [usize; 1], state: &i32) -> Result<i32, RuleError> {
            Ok(state + self.0)
        }
    }

    struct Double;

    impl CellRule<i32, 1> for Double {
        fn apply(&self, _: &StepContext, _: [usize; 1], state: &i32) -> Result<i32, RuleError> {
            Ok(state * 2)
        }
    }

    #[test]
    fn chain_applies_stages_in_order() {
        let chain = Chain::new().with(Add(3)).with(Double);
        let ctx = StepContext::new(1);
        // (1 + 3) * 2, not 1 * 2 + 3
        assert_eq!(chain.apply(&ctx, [0], &1).unwrap(), 8);
    }

    #[test]
    fn chain_stops_at_the_first_error() {
        struct Fail;
        impl CellRule<i32, 1> for Fail {
            fn apply(&self, _: &StepContext, _: [usize; 1], _: &i32) -> Result<i32, RuleError> {
                Err(RuleError::new("stage failed"))
            }
        }
        let chain = Chain::new().with(Fail).with(Add(1));
        assert!(chain.apply(&StepContext::new(1), [0], &0).is_err());
    }

    #[test]
    fn default_grid_bindings() {
        let chain: Chain<i32, 1> = Chain::new().with(Add(1));
        assert_eq!(chain.reads(), DEFAULT_GRID);
        assert_eq!(chain.writes(), DEFAULT_GRID);
    }
}
