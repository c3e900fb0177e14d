/// Value iteration and policy iteration solvers
pub mod algo;

/// Configuration and solver errors
pub mod error;

/// Grid layout, cell kinds and rewards
pub mod grid;

/// Policies and starting policy strategies
pub mod policy;

/// Background stepping of a solver
pub mod runner;

/// Stochastic action outcomes
pub mod transition;

pub use algo::{Algorithm, PolicyIteration, Snapshot, Solver, SolverConfig, ValueIteration};
pub use error::{ConfigError, SolveError};
pub use grid::{CellKind, Grid, Pos};
pub use policy::Policy;
pub use transition::Action;
