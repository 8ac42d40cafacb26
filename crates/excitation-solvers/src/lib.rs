//! Constrained nonlinear solvers for the excitation trajectory search.
//!
//! Every backend minimizes a black-box objective over a box, subject to
//! inequality constraints `g(x) <= 0`, through the same [`Solver`] contract.
//! The caller only ever sees a [`Problem`] going in and a [`SolveReport`]
//! coming out; switching backend changes the path through parameter space,
//! never the meaning of objective or constraints.
//!
//! | Backend | Stage | Derivatives |
//! |---|---|---|
//! | [`ParticleSwarm`] | global | none |
//! | [`Sqp`] | local | forward differences |
//! | [`SimplexLagrangian`] | local | none |

pub mod error;
pub mod jacobian;
mod lagrangian;
pub mod plan;
pub mod problem;
mod qp;
pub mod simplex;
pub mod sqp;
pub mod swarm;
mod tracker;

pub use error::SolverError;
pub use jacobian::{FiniteDifference, numerical_gradient, numerical_jacobian};
pub use plan::SolverPlan;
pub use problem::{Bounds, EvalError, Evaluation, Problem, SolveReport, Solver, max_violation};
pub use simplex::SimplexLagrangian;
pub use sqp::Sqp;
pub use swarm::ParticleSwarm;
