use thiserror::Error;

/// Errors raised by the engine itself, as opposed to a non-optimal status
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("{what} has {found} coefficients, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite coefficient in {0}")]
    NonFiniteCoefficient(String),
    #[error("Worker for {0} panicked")]
    WorkerPanicked(String),
    #[error("No problem has been solved in this session")]
    NoSolution,
}
