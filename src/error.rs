use thiserror::Error;

/// Misconfiguration caught when a grid or solver is constructed
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("grid layout has no cells")]
    EmptyLayout,

    #[error("grid layout is not square: row {row} has {got} cells, expected {expected}")]
    NotSquare {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("invalid cell code {code} at ({row}, {col}), expected 0..=3")]
    InvalidCellCode { row: usize, col: usize, code: u8 },

    #[error("invalid discount {0}, must be in the open interval (0, 1)")]
    InvalidDiscount(f64),

    #[error("invalid convergence threshold {0}, must be positive and finite")]
    InvalidTheta(f64),

    #[error("evaluation sweep cap must be at least 1")]
    InvalidSweepCap,
}

/// A solver gave up before reaching its convergence threshold
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SolveError {
    #[error("did not converge after {steps} steps (last delta {delta})")]
    DidNotConverge { steps: u32, delta: f64 },

    #[error("policy evaluation did not converge after {sweeps} sweeps (last delta {delta})")]
    EvaluationDidNotConverge { sweeps: u32, delta: f64 },
}
