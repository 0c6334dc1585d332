use stencilgrid::*;

fn line(cells: Vec<i64>) -> NeighborhoodGrid<i64, Moore<1>, 1> {
    NeighborhoodGrid::from_cells(
        cells,
        [4],
        Moore::new(1),
        Boundary::Remove(0),
        Padding::Conditional,
    )
    .unwrap()
}

struct Triple;

impl CellRule<i64, 1> for Triple {
    fn apply(&self, _: &StepContext, _: [usize; 1], state: &i64) -> Result<i64, RuleError> {
        Ok(state * 3)
    }
}

struct Square;

impl CellRule<i64, 1> for Square {
    fn apply(&self, _: &StepContext, _: [usize; 1], state: &i64) -> Result<i64, RuleError> {
        Ok(state * state)
    }
}

struct Zero;

impl CellRule<i64, 1> for Zero {
    fn apply(&self, _: &StepContext, _: [usize; 1], _: &i64) -> Result<i64, RuleError> {
        Ok(0)
    }
}

#[test]
fn a_constant_rule_blanks_the_grid() {
    let mut sim = SimData::single(
        line(vec![17, -3, 0, 8]),
        Ruleset::new().with(Rule::cell(Zero)),
    )
    .unwrap();
    sim.step().unwrap();
    assert_eq!(sim.snapshot().grid(DEFAULT_GRID).unwrap(), &[0, 0, 0, 0]);
}

#[test]
fn chained_rules_share_one_pass() {
    let rules = Ruleset::new().with(Rule::cell(Chain::new().with(Triple).with(Square)));
    let mut sim = SimData::single(line(vec![0, 1, 2, 3]), rules).unwrap();
    sim.step().unwrap();
    let frame = sim.snapshot();
    assert_eq!(frame.grid(DEFAULT_GRID).unwrap(), &[0, 9, 36, 81]);
}

#[test]
fn separate_rules_are_separate_passes() {
    // same stages as the chain test, so the result must agree
    let rules = Ruleset::new()
        .with(Rule::cell(Triple))
        .with(Rule::cell(Square));
    let mut sim = SimData::single(line(vec![0, 1, 2, 3]), rules).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.snapshot().grid(DEFAULT_GRID).unwrap(), &[0, 9, 36, 81]);
}

#[derive(Default)]
struct TimeFill {
    value: i64,
}

impl CellRule<i64, 1> for TimeFill {
    fn precalc(&mut self, ctx: &StepContext) {
        self.value = ctx.time() as i64;
    }

    fn apply(&self, _: &StepContext, _: [usize; 1], _: &i64) -> Result<i64, RuleError> {
        Ok(self.value)
    }
}

#[test]
fn precalc_runs_before_each_pass() {
    let rules = Ruleset::new().with(Rule::cell(TimeFill::default()));
    let mut sim = SimData::single(line(vec![0; 4]), rules)
        .unwrap()
        .with_time(1);
    let frames: Vec<_> = sim.frames(2).collect::<Result<_, _>>().unwrap();
    assert_eq!(frames[0].time, 2);
    assert_eq!(frames[0].grid(DEFAULT_GRID).unwrap(), &[2, 2, 2, 2]);
    assert_eq!(frames[1].time, 3);
    assert_eq!(frames[1].grid(DEFAULT_GRID).unwrap(), &[3, 3, 3, 3]);
}

struct SecondColumn;

impl PartialRule<i64, Moore<2>, 2> for SecondColumn {
    fn apply(
        &self,
        _: &StepContext,
        pass: &mut PartialPass<'_, i64, Moore<2>, 2>,
        coord: [usize; 2],
    ) -> Result<(), RuleError> {
        if coord[1] == 2 {
            let current = pass.get(DEFAULT_GRID, coord)?;
            pass.write(DEFAULT_GRID, coord, current + 100)?;
        }
        Ok(())
    }
}

#[test]
fn partial_rules_leave_unwritten_cells_alone() {
    let grid = NeighborhoodGrid::from_fn(
        [5, 4],
        Moore::new(1),
        Boundary::Remove(0),
        Padding::Halo,
        |c| (c[0] * 4 + c[1]) as i64,
    )
    .unwrap();
    let rules = Ruleset::new().with(Rule::partial(SecondColumn));
    let mut sim = SimData::single(grid, rules).unwrap();
    sim.step().unwrap();
    let cells = sim.snapshot().grids[0].cells.clone();
    for (ix, &value) in cells.iter().enumerate() {
        let expected = if ix % 4 == 2 { ix as i64 + 100 } else { ix as i64 };
        assert_eq!(value, expected, "cell {ix}");
    }
}

struct Copy2;

impl CellRule<i64, 1> for Copy2 {
    fn reads(&self) -> GridName {
        "a"
    }

    fn writes(&self) -> GridName {
        "b"
    }

    fn apply(&self, _: &StepContext, _: [usize; 1], state: &i64) -> Result<i64, RuleError> {
        Ok(state * 2)
    }
}

#[test]
fn rules_can_read_one_grid_and_write_another() {
    let rules = Ruleset::new().with(Rule::cell(Copy2));
    let mut sim = SimData::new(
        vec![("a", line(vec![1, 2, 3, 4])), ("b", line(vec![0; 4]))],
        rules,
    )
    .unwrap();
    sim.step().unwrap();
    let frame = sim.snapshot();
    assert_eq!(frame.grid("a").unwrap(), &[1, 2, 3, 4], "read grid untouched");
    assert_eq!(frame.grid("b").unwrap(), &[2, 4, 6, 8]);
}

struct FailAtSeven;

impl CellRule<i64, 1> for FailAtSeven {
    fn apply(&self, _: &StepContext, _: [usize; 1], state: &i64) -> Result<i64, RuleError> {
        if *state == 7 {
            Err(RuleError::new("seven is right out"))
        } else {
            Ok(state + 1)
        }
    }
}

#[test]
fn a_failing_rule_aborts_the_run_and_keeps_the_last_state() {
    let rules = Ruleset::new().with(Rule::cell(FailAtSeven));
    let mut sim = SimData::single(line(vec![5, 5, 5, 5]), rules).unwrap();
    let mut frames = Vec::new();
    let err = sim.run(10, &mut frames).unwrap_err();
    assert!(matches!(err, SimError::Rule(_)));
    // steps to 6 and 7 complete, the step to 8 fails
    assert_eq!(frames.len(), 2);
    assert_eq!(sim.snapshot().grid(DEFAULT_GRID).unwrap(), &[7, 7, 7, 7]);
    // the abort lowers the run flag, so direct stepping stays halted too
    assert!(!sim.run_flag().is_running());
    assert!(!sim.step().unwrap());
    assert_eq!(sim.time(), 3);
}

#[test]
fn the_frames_iterator_yields_the_error_once() {
    let rules = Ruleset::new().with(Rule::cell(FailAtSeven));
    let mut sim = SimData::single(line(vec![7, 7, 7, 7]), rules).unwrap();
    let results: Vec<_> = sim.frames(5).collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn a_lowered_run_flag_stops_stepping() {
    let rules = Ruleset::new().with(Rule::cell(Triple));
    let mut sim = SimData::single(line(vec![1, 1, 1, 1]), rules).unwrap();
    sim.run_flag().stop();
    let mut frames = Vec::new();
    sim.run(10, &mut frames).unwrap();
    assert!(frames.is_empty());
    assert_eq!(sim.time(), 0);
}

struct Blur;

impl NeighborhoodRule<f64, VonNeumann<1>, 1> for Blur {
    fn apply(
        &self,
        _: &StepContext,
        _: [usize; 1],
        state: &f64,
        hood: &Filled<'_, VonNeumann<1>, f64>,
    ) -> Result<f64, RuleError> {
        let sum: f64 = hood.iter().sum();
        Ok((state + sum) / 3.0)
    }
}

#[test]
fn a_wrapped_blur_conserves_mass() {
    let grid = NeighborhoodGrid::from_cells(
        vec![9.0, 0.0, 0.0],
        [3],
        VonNeumann::new(1),
        Boundary::Wrap,
        Padding::Halo,
    )
    .unwrap();
    let rules = Ruleset::new().with(Rule::neighborhood(Blur));
    let mut sim = SimData::single(grid, rules).unwrap();
    sim.step().unwrap();
    let cells = sim.snapshot().grids[0].cells.clone();
    assert_eq!(cells, vec![3.0, 3.0, 3.0]);
}
