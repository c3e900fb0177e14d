use strum::IntoEnumIterator;

use crate::{
    error::{ConfigError, SolveError},
    grid::{is_terminal, reward, CellKind, Grid, Pos},
    policy::{Policy, PolicyInit, UniformRandom},
    transition::Action,
};

use super::{
    action_value, initial_values, max_abs_diff, validate_discount, zeros, Algorithm, Snapshot,
    Solver, SolverConfig,
};

/// A value iteration solver
///
/// Each step is one synchronous sweep of the Bellman optimality update
///
/// V<sub>k+1</sub>(s) = r(s) + γ max<sub>a</sub> Σ<sub>s'</sub> P(s'|s,a) V<sub>k</sub>(s')
///
/// computed entirely from the previous sweep's values. Terminal cells are pinned to their
/// reward. The greedy action is recorded alongside each update, and the solver converges once
/// the largest change in a sweep drops below θ.
///
/// ### Generics
/// - `I` - The [`PolicyInit`] strategy used for the starting policy, only visible until the
///   first sweep overwrites it
pub struct ValueIteration<I: PolicyInit = UniformRandom> {
    grid: Grid,
    discount: f64,
    theta: f64,
    init: I,
    values: Vec<Vec<f64>>,
    policy: Policy,
    iteration: u32,
    converged: bool,
    delta: f64,
}

impl ValueIteration {
    /// Initialize a solver with a uniformly random starting policy
    pub fn new(grid: Grid, config: SolverConfig) -> Result<Self, ConfigError> {
        Self::with_policy_init(grid, config, UniformRandom::new())
    }
}

impl<I: PolicyInit> ValueIteration<I> {
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
            init,
            iteration: 0,
            converged: false,
            delta: 0.0,
        })
    }

    /// Best action from `pos` under the current values
    ///
    /// Actions are tried in [`Action`] order and only a strictly greater value replaces the
    /// incumbent, so the first action to reach the maximum wins ties.
    fn greedy(&self, pos: Pos) -> (Action, f64) {
        let mut best = (Action::Up, f64::NEG_INFINITY);
        for action in Action::iter() {
            let value = action_value(&self.grid, &self.values, pos, action, self.discount);
            if value > best.1 {
                best = (action, value);
            }
        }
        best
    }
}

impl<I: PolicyInit> Solver for ValueIteration<I> {
    fn step(&mut self) -> Result<bool, SolveError> {
        if self.converged {
            return Ok(false);
        }

        let mut next = zeros(self.grid.size());
        for pos in self.grid.positions() {
            next[pos.0][pos.1] = match self.grid[pos] {
                CellKind::Obstacle => continue,
                kind if is_terminal(kind) => reward(kind),
                _ => {
                    let (action, value) = self.greedy(pos);
                    self.policy[pos] = Some(action);
                    value
                }
            };
        }

        self.delta = max_abs_diff(&next, &self.values);
        self.values = next;
        self.iteration += 1;
        log::debug!("sweep {}: delta = {:.6}", self.iteration, self.delta);

        if self.delta < self.theta {
            self.converged = true;
            log::info!("value iteration converged after {} sweeps", self.iteration);
        }

        Ok(!self.converged)
    }

    fn reset(&mut self) {
        self.values = initial_values(&self.grid);
        self.policy = Policy::initial(&self.grid, &mut self.init);
        self.iteration = 0;
        self.converged = false;
        self.delta = 0.0;
        log::trace!("value iteration reset (discount {})", self.discount);
    }

    fn state(&self) -> Snapshot {
        Snapshot {
            values: self.values.clone(),
            policy: self.policy.clone(),
            iteration: self.iteration,
            converged: self.converged,
            delta: self.delta,
            evaluation_iterations: None,
            policy_changes: None,
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
        Algorithm::ValueIteration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Constant;

    const EPS: f64 = 1e-9;

    fn solver() -> ValueIteration<Constant> {
        ValueIteration::with_policy_init(
            Grid::default(),
            SolverConfig::default(),
            Constant(Action::Left),
        )
        .unwrap()
    }

    #[test]
    fn first_sweep_uses_previous_values_only() {
        let mut vi = solver();
        assert!(vi.step().unwrap());
        let state = vi.state();

        assert_eq!(state.iteration, 1);
        assert!((state.values[0][3] - 7.1).abs() < EPS, "0.8 * 10 discounted");
        assert_eq!(state.policy[(0, 3)], Some(Action::Down));
        assert!((state.values[1][2] - 7.1).abs() < EPS);
        assert_eq!(state.policy[(1, 2)], Some(Action::Right));

        // (1, 2) already improved this sweep, but (2, 2) must not see it yet
        assert!((state.values[2][2] + 0.1).abs() < EPS);
        assert!((state.delta - 7.1).abs() < EPS);
    }

    #[test]
    fn ties_go_to_the_first_action() {
        let mut vi = solver();
        vi.step().unwrap();
        // every neighbour of (0, 0) is still zero, so all four actions tie
        assert_eq!(vi.state().policy[(0, 0)], Some(Action::Up));
    }

    #[test]
    fn converges_to_the_known_policy() {
        let mut vi = solver();
        let sweeps = vi.run(1000).unwrap();
        let state = vi.state();

        assert!(sweeps < 50, "took {sweeps} sweeps");
        assert_eq!(state.iteration, sweeps);
        assert!(state.converged);
        assert!(state.delta < 0.001);
        assert_eq!(state.policy[(0, 3)], Some(Action::Down));
        assert_eq!(state.policy[(1, 2)], Some(Action::Right));
        assert_eq!(state.policy.arrows(), "→→→↓\n↑·→·\n→→↑↑\n·→↑↑");
        assert!((state.values[0][3] - 8.573).abs() < 0.01);
    }

    #[test]
    fn stepping_after_convergence_is_a_no_op() {
        let mut vi = solver();
        vi.run(1000).unwrap();
        let before = vi.state();
        assert_eq!(vi.step(), Ok(false));
        assert_eq!(vi.step(), Ok(false));
        assert_eq!(vi.state(), before);
    }

    #[test]
    fn obstacles_keep_placeholder_value() {
        let mut vi = solver();
        vi.run(1000).unwrap();
        let state = vi.state();
        assert_eq!(state.values[1][1], 0.0);
        assert_eq!(state.policy[(1, 1)], None);
        assert_eq!(state.policy[(1, 3)], None);
        assert_eq!(state.policy[(3, 0)], None);
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let mut vi = solver();
        vi.step().unwrap();
        let mut state = vi.state();
        state.values[0][0] = 123.0;
        state.policy[(0, 0)] = None;
        assert_ne!(vi.state(), state);
        assert_eq!(vi.state().policy[(0, 0)], Some(Action::Up));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut vi = solver();
        vi.run(1000).unwrap();
        vi.reset();
        let once = vi.state();
        vi.reset();
        assert_eq!(vi.state(), once);
        assert_eq!(once.iteration, 0);
        assert!(!once.converged);
        assert_eq!(once.values, initial_values(vi.grid()));

        let mut random = ValueIteration::new(Grid::default(), SolverConfig::default()).unwrap();
        random.reset();
        let state = random.state();
        for pos in random.grid().positions() {
            assert_eq!(
                state.policy[pos].is_some(),
                random.grid().is_decision_cell(pos),
                "{pos:?}"
            );
        }
    }

    #[test]
    fn update_discount_restarts() {
        let mut vi = solver();
        vi.run(1000).unwrap();
        vi.update_discount(0.5).unwrap();
        let state = vi.state();
        assert_eq!(vi.discount(), 0.5);
        assert_eq!(state.iteration, 0);
        assert!(!state.converged);

        vi.step().unwrap();
        assert_eq!(
            vi.update_discount(1.0),
            Err(ConfigError::InvalidDiscount(1.0))
        );
        assert_eq!(vi.discount(), 0.5, "rejected discount leaves the solver untouched");
        assert_eq!(vi.state().iteration, 1);
    }

    #[test]
    fn rejects_bad_config() {
        let config = SolverConfig {
            theta: 0.0,
            ..Default::default()
        };
        assert!(ValueIteration::new(Grid::default(), config).is_err());
    }
}
