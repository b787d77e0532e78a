/// Battle configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleConfig {
    /// Number of columns on each side's half of the grid.
    pub grid_width: i32,

    /// Number of rows on each side's half of the grid. Row 0 is the
    /// frontier row, facing the opposing side.
    pub grid_height: i32,

    /// Maximum trigger cascade depth (action → event → reaction → ...).
    /// Exceeding it aborts the operation with an engine fault instead of
    /// letting a cyclic definition recurse forever.
    pub max_cascade_depth: u32,
}

impl BattleConfig {
    /// Turn meter value at which a combatant is ready to act.
    pub const TURN_METER_FULL: f32 = 100.0;

    /// Turn meter cost of taking one turn.
    pub const TURN_METER_COST: f32 = 100.0;

    /// Fraction of the speed stat generated as turn meter per idle tick.
    pub const NATURAL_METER_RATE: f32 = 0.01;

    pub const DEFAULT_GRID_WIDTH: i32 = 5;
    pub const DEFAULT_GRID_HEIGHT: i32 = 3;
    pub const DEFAULT_MAX_CASCADE_DEPTH: u32 = 32;

    pub fn new() -> Self {
        Self {
            grid_width: Self::DEFAULT_GRID_WIDTH,
            grid_height: Self::DEFAULT_GRID_HEIGHT,
            max_cascade_depth: Self::DEFAULT_MAX_CASCADE_DEPTH,
        }
    }

    pub fn with_grid(grid_width: i32, grid_height: i32) -> Self {
        Self {
            grid_width,
            grid_height,
            ..Self::new()
        }
    }

    /// Returns true if the given row/column pair lies on the grid.
    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        0 <= row && row < self.grid_height && 0 <= col && col < self.grid_width
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self::new()
    }
}
