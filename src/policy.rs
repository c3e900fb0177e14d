use std::ops::{Index, IndexMut};

use rand::{rngs::StdRng, seq::IteratorRandom, Rng, SeedableRng};
use strum::IntoEnumIterator;

use crate::{
    grid::{Grid, Pos},
    transition::Action,
};

/// Strategy for choosing the action a decision cell starts out with
pub trait PolicyInit {
    fn choose(&mut self, pos: Pos) -> Action;
}

/// Pick each starting action uniformly at random
#[derive(Debug, Clone)]
pub struct UniformRandom<R: Rng = StdRng> {
    rng: R,
}

impl UniformRandom {
    /// Random source seeded from the OS
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic random source, useful for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> UniformRandom<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> PolicyInit for UniformRandom<R> {
    fn choose(&mut self, _pos: Pos) -> Action {
        Action::iter()
            .choose(&mut self.rng)
            .expect("Action set is not empty")
    }
}

/// Start every decision cell with the same action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant(pub Action);

impl PolicyInit for Constant {
    fn choose(&mut self, _pos: Pos) -> Action {
        self.0
    }
}

impl<F: FnMut(Pos) -> Action> PolicyInit for F {
    fn choose(&mut self, pos: Pos) -> Action {
        self(pos)
    }
}

/// An action per cell, `None` for terminal and obstacle cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    actions: Vec<Vec<Option<Action>>>,
}

impl Policy {
    /// Build a starting policy shaped like `grid`, asking `init` for every decision cell
    pub fn initial<I: PolicyInit + ?Sized>(grid: &Grid, init: &mut I) -> Self {
        let size = grid.size();
        let mut actions = vec![vec![None; size]; size];
        for pos in grid.positions().filter(|&pos| grid.is_decision_cell(pos)) {
            actions[pos.0][pos.1] = Some(init.choose(pos));
        }
        Self { actions }
    }

    pub fn size(&self) -> usize {
        self.actions.len()
    }

    pub fn rows(&self) -> &[Vec<Option<Action>>] {
        &self.actions
    }

    /// Render as lines of arrows, with `·` for cells that have no action
    pub fn arrows(&self) -> String {
        self.actions
            .iter()
            .map(|row| {
                row.iter()
                    .map(|a| a.map_or('·', Action::arrow))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Index<Pos> for Policy {
    type Output = Option<Action>;

    fn index(&self, index: Pos) -> &Self::Output {
        &self.actions[index.0][index.1]
    }
}

impl IndexMut<Pos> for Policy {
    fn index_mut(&mut self, index: Pos) -> &mut Self::Output {
        &mut self.actions[index.0][index.1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellKind;

    #[test]
    fn initial_policy_only_covers_decision_cells() {
        let grid = Grid::default();
        let policy = Policy::initial(&grid, &mut UniformRandom::new());
        assert_eq!(policy.size(), grid.size());
        for pos in grid.positions() {
            match grid[pos] {
                CellKind::Normal => assert!(policy[pos].is_some(), "{pos:?} has an action"),
                _ => assert_eq!(policy[pos], None, "{pos:?} has no action"),
            }
        }
    }

    #[test]
    fn seeded_init_is_reproducible() {
        let grid = Grid::default();
        let a = Policy::initial(&grid, &mut UniformRandom::seeded(7));
        let b = Policy::initial(&grid, &mut UniformRandom::seeded(7));
        assert_eq!(a, b);
    }

    #[test]
    fn closures_and_constants_as_strategies() {
        let grid = Grid::default();
        let policy = Policy::initial(&grid, &mut Constant(Action::Left));
        assert_eq!(policy[(0, 0)], Some(Action::Left));

        let mut by_row = |(row, _): Pos| if row == 0 { Action::Down } else { Action::Up };
        let policy = Policy::initial(&grid, &mut by_row);
        assert_eq!(policy[(0, 2)], Some(Action::Down));
        assert_eq!(policy[(2, 2)], Some(Action::Up));
    }

    #[test]
    fn arrows() {
        let grid = Grid::default();
        let policy = Policy::initial(&grid, &mut Constant(Action::Right));
        assert_eq!(policy.arrows(), "→→→→\n→·→·\n→→→→\n·→→→");
    }
}
