use strum::{Display, EnumIter};

use crate::{
    error::{ConfigError, SolveError},
    grid::{is_terminal, reward, Grid, Pos},
    policy::Policy,
    transition::{expected_value, Action},
};

pub mod policy_iteration;
pub mod value_iteration;

pub use policy_iteration::PolicyIteration;
pub use value_iteration::ValueIteration;

/// Configuration shared by both solvers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Discount factor γ, must lie in the open interval `(0, 1)`
    ///
    /// **Default**: `0.9`
    pub discount: f64,
    /// Convergence threshold θ on the largest per-sweep value change
    ///
    /// **Default**: `0.001`
    pub theta: f64,
    /// Safety cap on the sweeps a single policy evaluation may take. `None` evaluates until
    /// convergence however long that takes. Ignored by value iteration.
    ///
    /// **Default**: `None`
    pub max_evaluation_sweeps: Option<u32>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            discount: 0.9,
            theta: 0.001,
            max_evaluation_sweeps: None,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discount(self.discount)?;
        if !(self.theta.is_finite() && self.theta > 0.0) {
            return Err(ConfigError::InvalidTheta(self.theta));
        }
        if self.max_evaluation_sweeps == Some(0) {
            return Err(ConfigError::InvalidSweepCap);
        }
        Ok(())
    }
}

pub(crate) fn validate_discount(discount: f64) -> Result<(), ConfigError> {
    if discount > 0.0 && discount < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDiscount(discount))
    }
}

/// An independent copy of a solver's observable state
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub values: Vec<Vec<f64>>,
    pub policy: Policy,
    /// Completed steps since construction or the last reset
    pub iteration: u32,
    pub converged: bool,
    /// Largest value change in the most recent sweep, `0.0` before any sweep
    pub delta: f64,
    /// Cumulative policy evaluation sweeps, only reported by policy iteration
    pub evaluation_iterations: Option<u32>,
    /// Cells whose action changed in the most recent improvement, only reported by policy iteration
    pub policy_changes: Option<u32>,
}

/// The stepping contract both dynamic programming solvers expose
pub trait Solver {
    /// Perform one discrete unit of work
    ///
    /// **Returns** whether further stepping is useful. Once converged this is a no-op
    /// returning `Ok(false)`.
    fn step(&mut self) -> Result<bool, SolveError>;

    /// Start over from the initial values and a fresh starting policy
    fn reset(&mut self);

    /// Copy out the current values, policy and counters
    fn state(&self) -> Snapshot;

    /// Change the discount factor, which restarts the solver from scratch
    fn update_discount(&mut self, discount: f64) -> Result<(), ConfigError>;

    fn discount(&self) -> f64;

    fn converged(&self) -> bool;

    fn grid(&self) -> &Grid;

    fn algorithm(&self) -> Algorithm;

    /// Step until converged, giving up after `max_steps` steps
    ///
    /// **Returns** the number of steps taken by this call
    fn run(&mut self, max_steps: u32) -> Result<u32, SolveError> {
        let mut steps = 0;
        while !self.converged() {
            if steps == max_steps {
                log::warn!("{} did not converge within {max_steps} steps", self.algorithm());
                return Err(SolveError::DidNotConverge {
                    steps,
                    delta: self.state().delta,
                });
            }
            self.step()?;
            steps += 1;
        }

        Ok(steps)
    }
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn step(&mut self) -> Result<bool, SolveError> {
        (**self).step()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn state(&self) -> Snapshot {
        (**self).state()
    }

    fn update_discount(&mut self, discount: f64) -> Result<(), ConfigError> {
        (**self).update_discount(discount)
    }

    fn discount(&self) -> f64 {
        (**self).discount()
    }

    fn converged(&self) -> bool {
        (**self).converged()
    }

    fn grid(&self) -> &Grid {
        (**self).grid()
    }

    fn algorithm(&self) -> Algorithm {
        (**self).algorithm()
    }

    fn run(&mut self, max_steps: u32) -> Result<u32, SolveError> {
        (**self).run(max_steps)
    }
}

/// The available solvers
#[derive(EnumIter, Display, Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Algorithm {
    #[strum(to_string = "value iteration")]
    ValueIteration,
    #[strum(to_string = "policy iteration")]
    PolicyIteration,
}

impl Algorithm {
    /// Construct a fresh solver with a randomly initialized policy
    pub fn build(
        self,
        grid: Grid,
        config: SolverConfig,
    ) -> Result<Box<dyn Solver + Send>, ConfigError> {
        Ok(match self {
            Algorithm::ValueIteration => Box::new(ValueIteration::new(grid, config)?),
            Algorithm::PolicyIteration => Box::new(PolicyIteration::new(grid, config)?),
        })
    }
}

/// Largest absolute elementwise difference between two value arrays
pub(crate) fn max_abs_diff(a: &[Vec<f64>], b: &[Vec<f64>]) -> f64 {
    a.iter()
        .flatten()
        .zip(b.iter().flatten())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

pub(crate) fn zeros(size: usize) -> Vec<Vec<f64>> {
    vec![vec![0.0; size]; size]
}

/// Starting values: terminal cells hold their reward, everything else zero
pub(crate) fn initial_values(grid: &Grid) -> Vec<Vec<f64>> {
    let mut values = zeros(grid.size());
    for pos in grid.positions().filter(|&pos| is_terminal(grid[pos])) {
        values[pos.0][pos.1] = reward(grid[pos]);
    }
    values
}

/// r(s) + γ Σ p·V(s') for attempting `action` from `pos`
pub(crate) fn action_value(
    grid: &Grid,
    values: &[Vec<f64>],
    pos: Pos,
    action: Action,
    discount: f64,
) -> f64 {
    reward(grid[pos]) + discount * expected_value(pos, action, values, grid)
}
