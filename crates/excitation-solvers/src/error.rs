//! Solver error types.

use crate::problem::EvalError;

/// Errors returned by a [`Solver`](crate::Solver).
///
/// Constraint violations and infeasible starting points are not errors;
/// they show up in the [`SolveReport`](crate::SolveReport).
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),

    /// The problem's evaluation failed; the run is aborted.
    #[error("evaluation failed: {0}")]
    Evaluation(#[source] EvalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            SolverError::DimensionMismatch { expected: 3, got: 2 }.to_string(),
            "dimension mismatch: expected 3, got 2"
        );
        assert_eq!(
            SolverError::InvalidConfig("swarm_size must be >= 2".into()).to_string(),
            "invalid solver configuration: swarm_size must be >= 2"
        );
        let inner: EvalError = "simulation crashed".into();
        assert_eq!(
            SolverError::Evaluation(inner).to_string(),
            "evaluation failed: simulation crashed"
        );
    }
}
