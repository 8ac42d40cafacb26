//! Error types for trajectory construction and queries.

use excitation_core::ConfigError;

/// Errors that can occur while building or querying a trajectory.
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    /// Inconsistent or invalid trajectory parameters.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A DOF index outside `[0, dofs)` was queried.
    #[error("DOF index {dof} out of range (trajectory has {dofs} DOFs)")]
    DofOutOfRange { dof: usize, dofs: usize },
}
