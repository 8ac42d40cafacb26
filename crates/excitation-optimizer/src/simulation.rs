//! The forward-simulation collaborator.
//!
//! The optimizer never simulates anything itself. It hands the candidate
//! trajectory to a [`Simulator`] and reads back sampled joint motion plus
//! the base regressor of the identification problem.

use excitation_core::SimulationError;
use excitation_trajectory::TrajectoryGenerator;
use nalgebra::DMatrix;

/// Sampled joint motion, one row per sample and one column per DOF.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionData {
    /// Joint positions (rad).
    pub positions: DMatrix<f64>,
    /// Joint velocities (rad/s).
    pub velocities: DMatrix<f64>,
    /// Joint torques (N·m). NaN marks samples where the simulation broke down.
    pub torques: DMatrix<f64>,
}

impl MotionData {
    pub fn new(positions: DMatrix<f64>, velocities: DMatrix<f64>, torques: DMatrix<f64>) -> Self {
        Self {
            positions,
            velocities,
            torques,
        }
    }

    pub fn samples(&self) -> usize {
        self.positions.nrows()
    }

    pub fn dofs(&self) -> usize {
        self.positions.ncols()
    }

    /// Check that every series has `dofs` columns and the same row count.
    pub fn validate(&self, dofs: usize) -> Result<(), SimulationError> {
        let samples = self.samples();
        for (what, series) in [
            ("positions", &self.positions),
            ("velocities", &self.velocities),
            ("torques", &self.torques),
        ] {
            if series.ncols() != dofs {
                return Err(SimulationError::ShapeMismatch {
                    what,
                    expected: dofs,
                    got: series.ncols(),
                });
            }
            if series.nrows() != samples {
                return Err(SimulationError::ShapeMismatch {
                    what,
                    expected: samples,
                    got: series.nrows(),
                });
            }
        }
        if samples == 0 {
            return Err(SimulationError::ShapeMismatch {
                what: "samples",
                expected: 1,
                got: 0,
            });
        }
        Ok(())
    }
}

/// What one simulation run hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    pub motion: MotionData,
    /// Base regressor, rows = samples x outputs, cols = base parameters.
    pub base_regressor: DMatrix<f64>,
}

/// Runs a trajectory and reports the motion it produced.
///
/// Implementations must be deterministic for a given trajectory. Numerical
/// failure belongs in the returned series as NaN; an `Err` aborts the whole
/// optimization run.
pub trait Simulator {
    fn simulate(
        &mut self,
        trajectory: &mut TrajectoryGenerator,
    ) -> Result<SimulationOutput, SimulationError>;
}

impl<S: Simulator + ?Sized> Simulator for &mut S {
    fn simulate(
        &mut self,
        trajectory: &mut TrajectoryGenerator,
    ) -> Result<SimulationOutput, SimulationError> {
        (**self).simulate(trajectory)
    }
}

impl<S: Simulator + ?Sized> Simulator for Box<S> {
    fn simulate(
        &mut self,
        trajectory: &mut TrajectoryGenerator,
    ) -> Result<SimulationOutput, SimulationError> {
        (**self).simulate(trajectory)
    }
}
