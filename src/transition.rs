use strum::{Display, EnumIter, IntoEnumIterator, VariantArray};

use crate::grid::{in_bounds, is_obstacle, Grid, Pos};

/// Probability that an action moves the agent in the intended direction
pub const INTENDED_PROB: f64 = 0.8;
/// Probability mass shared evenly by the three unintended directions
pub const SLIP_PROB: f64 = 0.2;

/// A cardinal move
///
/// Variant order is the order in which solvers search for the best action.
#[derive(EnumIter, VariantArray, Display, Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    /// Unit displacement as `(d_row, d_col)`
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }

    pub fn arrow(self) -> char {
        match self {
            Action::Up => '↑',
            Action::Down => '↓',
            Action::Left => '←',
            Action::Right => '→',
        }
    }
}

/// One possible outcome of attempting an action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next: Pos,
    pub prob: f64,
}

/// Where the agent ends up moving from `pos` in direction `dir`, staying put if blocked
fn destination(pos: Pos, dir: Action, grid: &Grid) -> Pos {
    let (dr, dc) = dir.delta();
    let (row, col) = (pos.0 as isize + dr, pos.1 as isize + dc);
    if !in_bounds(row, col, grid.size()) {
        return pos;
    }

    let next = (row as usize, col as usize);
    if is_obstacle(next, grid) {
        pos
    } else {
        next
    }
}

/// The distribution over next cells for attempting `action` from `pos`
///
/// Always yields four entries: the intended direction first, then the other three in
/// [`Action`] order. Blocked moves bounce back to `pos`, so several entries may share a
/// destination. They are deliberately not merged.
pub fn transitions(pos: Pos, action: Action, grid: &Grid) -> Vec<Transition> {
    let slip = SLIP_PROB / (Action::VARIANTS.len() - 1) as f64;

    std::iter::once(Transition {
        next: destination(pos, action, grid),
        prob: INTENDED_PROB,
    })
    .chain(Action::iter().filter(|&a| a != action).map(|a| Transition {
        next: destination(pos, a, grid),
        prob: slip,
    }))
    .collect()
}

/// Probability-weighted value of the cells reached by attempting `action` from `pos`
///
/// Returns Σ p·V(next) without discounting. The caller applies the discount when it adds
/// the immediate reward.
pub fn expected_value(pos: Pos, action: Action, values: &[Vec<f64>], grid: &Grid) -> f64 {
    transitions(pos, action, grid)
        .into_iter()
        .map(|Transition { next, prob }| prob * values[next.0][next.1])
        .sum()
}
