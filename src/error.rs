use thiserror::Error;

/// A shape is structurally incompatible with the grid it was attached to.
///
/// Shape problems are caught at construction so that per-cell access never has
/// to re-check them.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    /// The neighborhood reaches further than the grid extends on some axis.
    #[error("neighborhood radius {radius} exceeds grid extent {extent} on axis {axis}")]
    RadiusExceedsExtent {
        radius: usize,
        extent: usize,
        axis: usize,
    },
    /// The provided cell vector does not fill the declared extents.
    #[error("{cells} cells provided but the grid extents require {expected}")]
    CellCount { cells: usize, expected: usize },
    /// A kernel's weight vector and its neighborhood disagree in length.
    #[error("{weights} kernel weights provided for a neighborhood of length {len}")]
    WeightCount { weights: usize, len: usize },
    /// Two named grids of the same simulation have different extents.
    #[error("grid `{a}` and grid `{b}` have different extents")]
    MismatchedGrids {
        a: &'static str,
        b: &'static str,
    },
}

/// The simulation was assembled incorrectly. Raised before the first step and
/// never during one.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A rule declares a read grid that the simulation does not hold.
    #[error("rule reads unknown grid `{0}`")]
    UnknownReadGrid(&'static str),
    /// A rule declares a write grid that the simulation does not hold.
    #[error("rule writes unknown grid `{0}`")]
    UnknownWriteGrid(&'static str),
    /// No initial grids were provided.
    #[error("no grids were provided")]
    NoGrids,
    /// The same grid name was provided twice.
    #[error("duplicate grid name `{0}`")]
    DuplicateGrid(&'static str),
    /// Sparse stepping was requested for a grid the simulation does not hold.
    #[error("cannot enable sparse stepping on unknown grid `{0}`")]
    UnknownGrid(&'static str),
    /// The sparse block edge cannot contain the stencil.
    #[error("sparse block edge {edge} is smaller than the stencil radius {radius}")]
    BlockEdge { edge: usize, radius: usize },
}

/// A rule's per-cell logic failed.
///
/// Never retried: the error aborts the step and the run, leaving the last
/// fully-completed step's source buffers as the valid state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("rule evaluation failed: {message}")]
pub struct RuleError {
    message: String,
}

impl RuleError {
    pub fn new(message: impl Into<String>) -> Self {
        RuleError {
            message: message.into(),
        }
    }
}

/// Any failure the engine can surface.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rule(#[from] RuleError),
}
