use strum::IntoEnumIterator;

use crate::{
    error::{ConfigError, SolveError},
    grid::{is_terminal, reward, CellKind, Grid},
    policy::{Policy, PolicyInit, UniformRandom},
    transition::Action,
};

use super::{
    action_value, initial_values, max_abs_diff, validate_discount, zeros, Algorithm, Snapshot,
    Solver, SolverConfig,
};

/// A policy iteration solver
///
/// Each step evaluates the current policy until the value function settles, then improves the
/// policy greedily with respect to those values. The solver converges once an improvement
/// leaves every action in place.
///
/// Evaluation runs until its own delta drops below θ. With
/// [`max_evaluation_sweeps`](SolverConfig::max_evaluation_sweeps) set, a step that exceeds the
/// cap fails with [`SolveError::EvaluationDidNotConverge`] instead. The partially evaluated
/// values are kept and the next step resumes evaluating from them.
pub struct PolicyIteration<I: PolicyInit = UniformRandom> {
    grid: Grid,
    discount: f64,
    theta: f64,
    max_evaluation_sweeps: Option<u32>,
    init: I,
    values: Vec<Vec<f64>>,
    policy: Policy,
    iteration: u32,
    evaluation_iterations: u32,
    policy_changes: u32,
    converged: bool,
    delta: f64,
}

impl PolicyIteration {
    /// Initialize a solver with a uniformly random starting policy
    pub fn new(grid: Grid, config: SolverConfig) -> Result<Self, ConfigError> {
        Self::with_policy_init(grid, config, UniformRandom::new())
    }
}

impl<I: PolicyInit> PolicyIteration<I> {
    /// Initialize a solver with a custom starting policy strategy
    pub fn with_policy_init(
        grid: Grid,
        config: SolverConfig,
        mut init: I,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            values: initial_values(&grid),
            policy: Policy::initial(&grid, &mut init),
            grid,
            discount: config.discount,
            theta: config.theta,
            max_evaluation_sweeps: config.max_evaluation_sweeps,
            init,
            iteration: 0,
            evaluation_iterations: 0,
            policy_changes: 0,
            converged: false,
            delta: 0.0,
        })
    }

    /// Sweep the Bellman expectation update under the fixed policy until delta < θ
    fn evaluate(&mut self) -> Result<(), SolveError> {
        let mut sweeps = 0;
        loop {
            let mut next = zeros(self.grid.size());
            for pos in self.grid.positions() {
                next[pos.0][pos.1] = match self.grid[pos] {
                    CellKind::Obstacle => continue,
                    kind if is_terminal(kind) => reward(kind),
                    _ => self.policy[pos].map_or(0.0, |action| {
                        action_value(&self.grid, &self.values, pos, action, self.discount)
                    }),
                };
            }

            self.delta = max_abs_diff(&next, &self.values);
            self.values = next;
            self.evaluation_iterations += 1;
            sweeps += 1;

            if self.delta < self.theta {
                log::debug!("policy evaluated in {sweeps} sweeps");
                return Ok(());
            }

            if self.max_evaluation_sweeps.is_some_and(|cap| sweeps >= cap) {
                log::warn!(
                    "policy evaluation stopped after {sweeps} sweeps with delta {:.6}",
                    self.delta
                );
                return Err(SolveError::EvaluationDidNotConverge {
                    sweeps,
                    delta: self.delta,
                });
            }
        }
    }

    /// Make the policy greedy with respect to the current values
    ///
    /// The search starts from each cell's current action and only switches on a strictly
    /// better value, so ties never count as a change.
    ///
    /// **Returns** the number of cells whose action changed
    fn improve(&mut self) -> u32 {
        let mut changes = 0;
        for pos in self.grid.positions() {
            let Some(current) = self.policy[pos] else {
                continue;
            };

            let value = |action| action_value(&self.grid, &self.values, pos, action, self.discount);
            let mut best = (current, value(current));
            for action in Action::iter() {
                let v = value(action);
                if v > best.1 {
                    best = (action, v);
                }
            }

            if best.0 != current {
                self.policy[pos] = Some(best.0);
                changes += 1;
            }
        }
        changes
    }
}

impl<I: PolicyInit> Solver for PolicyIteration<I> {
    fn step(&mut self) -> Result<bool, SolveError> {
        if self.converged {
            return Ok(false);
        }

        self.evaluate()?;
        self.policy_changes = self.improve();
        self.iteration += 1;
        log::debug!(
            "iteration {}: {} actions changed",
            self.iteration,
            self.policy_changes
        );

        if self.policy_changes == 0 {
            self.converged = true;
            log::info!(
                "policy iteration converged after {} iterations ({} evaluation sweeps)",
                self.iteration,
                self.evaluation_iterations
            );
        }

        Ok(!self.converged)
    }

    fn reset(&mut self) {
        self.values = initial_values(&self.grid);
        self.policy = Policy::initial(&self.grid, &mut self.init);
        self.iteration = 0;
        self.evaluation_iterations = 0;
        self.policy_changes = 0;
        self.converged = false;
        self.delta = 0.0;
        log::trace!("policy iteration reset (discount {})", self.discount);
    }

    fn state(&self) -> Snapshot {
        Snapshot {
            values: self.values.clone(),
            policy: self.policy.clone(),
            iteration: self.iteration,
            converged: self.converged,
            delta: self.delta,
            evaluation_iterations: Some(self.evaluation_iterations),
            policy_changes: Some(self.policy_changes),
        }
    }

    fn update_discount(&mut self, discount: f64) -> Result<(), ConfigError> {
        validate_discount(discount)?;
        self.discount = discount;
        self.reset();
        Ok(())
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    fn converged(&self) -> bool {
        self.converged
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::PolicyIteration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algo::ValueIteration, policy::Constant};

    fn solver(config: SolverConfig) -> PolicyIteration<Constant> {
        PolicyIteration::with_policy_init(Grid::default(), config, Constant(Action::Up)).unwrap()
    }

    #[test]
    fn converges_to_the_known_policy() {
        let mut pi = solver(SolverConfig::default());
        let steps = pi.run(100).unwrap();
        let state = pi.state();

        assert_eq!(steps, 4);
        assert_eq!(state.iteration, 4);
        assert!(state.converged);
        assert_eq!(state.policy_changes, Some(0));
        assert_eq!(state.policy[(0, 3)], Some(Action::Down));
        assert_eq!(state.policy[(1, 2)], Some(Action::Right));
        assert_eq!(state.policy.arrows(), "→→→↓\n↑·→·\n→→↑↑\n·→↑↑");
    }

    #[test]
    fn evaluation_sweeps_accumulate() {
        let mut pi = solver(SolverConfig::default());
        let mut last = 0;
        while pi.step().unwrap() {
            let sweeps = pi.state().evaluation_iterations.unwrap();
            assert!(sweeps > last, "every step evaluates at least once");
            last = sweeps;
        }
        assert!(pi.state().evaluation_iterations.unwrap() > pi.state().iteration);
    }

    #[test]
    fn stepping_after_convergence_is_a_no_op() {
        let mut pi = solver(SolverConfig::default());
        pi.run(100).unwrap();
        let before = pi.state();
        assert_eq!(pi.step(), Ok(false));
        assert_eq!(pi.state(), before);
    }

    #[test]
    fn ties_keep_the_current_action() {
        // a lone cell: every move bounces back, so all actions are worth the same
        let grid = Grid::from_layout(&[[0u8]]).unwrap();
        let config = SolverConfig::default();

        let mut pi =
            PolicyIteration::with_policy_init(grid.clone(), config, Constant(Action::Left))
                .unwrap();
        assert_eq!(pi.step(), Ok(false));
        let state = pi.state();
        assert!(state.converged);
        assert_eq!(state.policy[(0, 0)], Some(Action::Left));
        assert!((state.values[0][0] + 1.0).abs() < 0.02, "-0.1 / (1 - 0.9)");

        let mut vi = ValueIteration::with_policy_init(grid, config, Constant(Action::Left)).unwrap();
        vi.step().unwrap();
        assert_eq!(
            vi.state().policy[(0, 0)],
            Some(Action::Up),
            "value iteration takes the first maximum instead"
        );
    }

    #[test]
    fn evaluation_cap_surfaces_non_convergence() {
        let config = SolverConfig {
            max_evaluation_sweeps: Some(5),
            ..Default::default()
        };
        let mut pi = solver(config);
        assert!(matches!(
            pi.step(),
            Err(SolveError::EvaluationDidNotConverge { sweeps: 5, .. })
        ));
        let state = pi.state();
        assert_eq!(state.iteration, 0);
        assert_eq!(state.evaluation_iterations, Some(5));
        assert!(!state.converged);
        assert!(state.values[0][3] > 0.0, "partial evaluation is kept");
    }

    #[test]
    fn reset_and_update_discount_zero_counters() {
        let mut pi = solver(SolverConfig::default());
        pi.run(100).unwrap();

        pi.reset();
        let once = pi.state();
        pi.reset();
        assert_eq!(pi.state(), once);
        assert_eq!(once.iteration, 0);
        assert_eq!(once.evaluation_iterations, Some(0));
        assert!(!once.converged);

        pi.step().unwrap();
        pi.update_discount(0.95).unwrap();
        let state = pi.state();
        assert_eq!(pi.discount(), 0.95);
        assert_eq!(state.iteration, 0);
        assert_eq!(state.evaluation_iterations, Some(0));
        assert!(!state.converged);
    }

    #[test]
    fn random_start_covers_decision_cells() {
        let mut pi = PolicyIteration::new(Grid::default(), SolverConfig::default()).unwrap();
        for _ in 0..3 {
            pi.reset();
            let state = pi.state();
            for pos in pi.grid().positions() {
                assert_eq!(
                    state.policy[pos].is_some(),
                    pi.grid().is_decision_cell(pos),
                    "{pos:?}"
                );
            }
        }
    }
}
