use std::ops::Index;

use strum::{Display, EnumIter, FromRepr};

use crate::error::ConfigError;

/// Cell coordinates as `(row, col)`
pub type Pos = (usize, usize);

/// Reward for reaching the goal
pub const GOAL_REWARD: f64 = 10.0;
/// Reward for reaching the negative terminal
pub const NEGATIVE_TERMINAL_REWARD: f64 = -10.0;
/// Cost of occupying any other traversable cell
pub const STEP_REWARD: f64 = -0.1;

/// The default 4x4 layout
///
/// `0` = normal, `1` = obstacle, `2` = goal, `3` = negative terminal
pub const DEFAULT_LAYOUT: [[u8; 4]; 4] = [
    [0, 0, 0, 0],
    [0, 1, 0, 2],
    [0, 0, 0, 0],
    [3, 0, 0, 0],
];

/// The kind of a grid cell, which alone determines its reward and terminality
#[derive(EnumIter, FromRepr, Display, Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[repr(u8)]
pub enum CellKind {
    Normal = 0,
    Obstacle = 1,
    Goal = 2,
    NegativeTerminal = 3,
}

/// Map a raw layout code to its cell kind, or `None` for an undefined code
pub fn classify(code: u8) -> Option<CellKind> {
    CellKind::from_repr(code)
}

/// Immediate reward for occupying a cell of the given kind
///
/// Obstacles are never occupied, they share the step cost only so the mapping is total.
pub fn reward(kind: CellKind) -> f64 {
    match kind {
        CellKind::Goal => GOAL_REWARD,
        CellKind::NegativeTerminal => NEGATIVE_TERMINAL_REWARD,
        CellKind::Normal | CellKind::Obstacle => STEP_REWARD,
    }
}

pub fn is_terminal(kind: CellKind) -> bool {
    matches!(kind, CellKind::Goal | CellKind::NegativeTerminal)
}

/// Check signed coordinates against a square grid of side `size`
pub fn in_bounds(row: isize, col: isize, size: usize) -> bool {
    row >= 0 && col >= 0 && (row as usize) < size && (col as usize) < size
}

pub fn is_obstacle(pos: Pos, grid: &Grid) -> bool {
    grid[pos] == CellKind::Obstacle
}

/// An immutable, square grid-world layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Vec<CellKind>>,
}

impl Grid {
    /// Build a grid from rows of raw cell codes
    ///
    /// Fails if the layout is empty, ragged or not square, or holds a code outside `0..=3`.
    pub fn from_layout<R: AsRef<[u8]>>(layout: &[R]) -> Result<Self, ConfigError> {
        let size = layout.len();
        if size == 0 {
            return Err(ConfigError::EmptyLayout);
        }

        let mut cells = Vec::with_capacity(size);
        for (row, codes) in layout.iter().enumerate() {
            let codes = codes.as_ref();
            if codes.len() != size {
                return Err(ConfigError::NotSquare {
                    row,
                    expected: size,
                    got: codes.len(),
                });
            }

            let kinds = codes
                .iter()
                .enumerate()
                .map(|(col, &code)| {
                    classify(code).ok_or(ConfigError::InvalidCellCode { row, col, code })
                })
                .collect::<Result<Vec<_>, _>>()?;
            cells.push(kinds);
        }

        Ok(Self { cells })
    }

    /// Side length of the grid
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn kind(&self, pos: Pos) -> CellKind {
        self.cells[pos.0][pos.1]
    }

    /// Iterate over every cell position in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Pos> {
        let size = self.size();
        (0..size).flat_map(move |row| (0..size).map(move |col| (row, col)))
    }

    /// Whether a decision is made in this cell, i.e. it is neither terminal nor an obstacle
    pub fn is_decision_cell(&self, pos: Pos) -> bool {
        self.kind(pos) == CellKind::Normal
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::from_layout(&DEFAULT_LAYOUT).expect("default layout only holds valid codes")
    }
}

impl Index<Pos> for Grid {
    type Output = CellKind;

    fn index(&self, index: Pos) -> &Self::Output {
        &self.cells[index.0][index.1]
    }
}
