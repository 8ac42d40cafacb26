//! Excitation trajectory optimization.
//!
//! [`TrajectoryOptimizer`] searches the Fourier parameter space for the
//! trajectory whose simulated base regressor is best conditioned, while the
//! simulated motion stays inside the joint position, velocity and torque
//! limits. Simulation is a collaborator behind the [`Simulator`] trait; the
//! search itself is delegated to the backends in `excitation-solvers`.

pub mod conditioning;
pub mod constraints;
pub mod error;
pub mod optimizer;
pub mod simulation;

pub use conditioning::{condition_number, nan_abs_max};
pub use constraints::{
    BoundDiagnostics, ConstraintBlock, ConstraintReport, ParameterClass, Violation,
    constraint_vector, test_bounds, test_constraints, torque_deficit,
};
pub use error::OptimizerError;
pub use optimizer::{
    BestSolution, OptimizationOutcome, PENALTY_CONSTRAINT, PENALTY_OBJECTIVE, SolutionSource,
    TrajectoryOptimizer,
};
pub use simulation::{MotionData, SimulationOutput, Simulator};
