use excitation_core::{ConfigError, SimulationError};
use excitation_solvers::SolverError;
use excitation_trajectory::TrajectoryError;
use thiserror::Error;

/// Errors that abort an optimization run.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

impl From<TrajectoryError> for OptimizerError {
    fn from(err: TrajectoryError) -> Self {
        match err {
            TrajectoryError::Config(e) => Self::Config(e),
            other => Self::Config(ConfigError::invalid("trajectory", other.to_string())),
        }
    }
}
