//! Mock simulators for optimizer tests.
//!
//! None of these model real dynamics. They produce motion and regressors
//! that are cheap, deterministic and shaped the way the optimizer expects.

use excitation_core::SimulationError;
use excitation_optimizer::{MotionData, SimulationOutput, Simulator};
use excitation_trajectory::{FourierParams, TrajectoryGenerator};
use nalgebra::{DMatrix, DVector};

// ---------------------------------------------------------------------------
// ScriptedSimulator
// ---------------------------------------------------------------------------

/// Returns the same motion every call, with a regressor whose condition
/// number follows a script (cycling when exhausted).
#[derive(Debug, Clone)]
pub struct ScriptedSimulator {
    pub motion: MotionData,
    pub condition_numbers: Vec<f64>,
    pub calls: usize,
}

impl ScriptedSimulator {
    pub fn new(motion: MotionData, condition_numbers: Vec<f64>) -> Self {
        Self {
            motion,
            condition_numbers,
            calls: 0,
        }
    }

    /// Motion inside [`test_limits`](crate::test_limits) for `dofs` joints:
    /// positions within +-1 rad, peak speed 1.5 rad/s, peak torque 10 N·m.
    pub fn feasible(dofs: usize, condition_numbers: &[f64]) -> Self {
        let series = |values: [f64; 3]| DMatrix::from_fn(3, dofs, |r, _| values[r]);
        Self::new(
            MotionData::new(
                series([-1.0, 0.0, 1.0]),
                series([-1.5, 0.5, 1.0]),
                series([10.0, -4.0, 2.0]),
            ),
            condition_numbers.to_vec(),
        )
    }
}

impl Simulator for ScriptedSimulator {
    fn simulate(
        &mut self,
        _trajectory: &mut TrajectoryGenerator,
    ) -> Result<SimulationOutput, SimulationError> {
        if self.condition_numbers.is_empty() {
            return Err(SimulationError::Failed("empty script".into()));
        }
        let k = self.condition_numbers[self.calls % self.condition_numbers.len()];
        self.calls += 1;
        Ok(SimulationOutput {
            motion: self.motion.clone(),
            base_regressor: DMatrix::from_diagonal(&DVector::from_vec(vec![k, 1.0])),
        })
    }
}

// ---------------------------------------------------------------------------
// KinematicSimulator
// ---------------------------------------------------------------------------

/// Samples the trajectory itself and derives torques from a decoupled
/// `tau = inertia * ddq + damping * dq` model per joint.
///
/// The regressor is block diagonal, `[ddq_j, dq_j]` per joint, so its
/// condition number genuinely depends on the trajectory.
#[derive(Debug, Clone)]
pub struct KinematicSimulator {
    pub dt: f64,
    pub inertia: f64,
    pub damping: f64,
    /// Simulated time; one trajectory period if `None`.
    pub duration: Option<f64>,
    pub calls: usize,
}

impl KinematicSimulator {
    pub const fn new(dt: f64) -> Self {
        Self {
            dt,
            inertia: 1.0,
            damping: 0.5,
            duration: None,
            calls: 0,
        }
    }
}

impl Default for KinematicSimulator {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl Simulator for KinematicSimulator {
    fn simulate(
        &mut self,
        trajectory: &mut TrajectoryGenerator,
    ) -> Result<SimulationOutput, SimulationError> {
        self.calls += 1;
        let duration = self.duration.unwrap_or_else(|| trajectory.period_length());
        let samples = trajectory
            .sample(duration, self.dt)
            .map_err(|e| SimulationError::Failed(e.to_string()))?;

        let (n, dofs) = samples.positions.shape();
        let torques =
            &samples.accelerations * self.inertia + &samples.velocities * self.damping;

        let mut regressor = DMatrix::zeros(n * dofs, 2 * dofs);
        for k in 0..n {
            for j in 0..dofs {
                regressor[(k * dofs + j, 2 * j)] = samples.accelerations[(k, j)];
                regressor[(k * dofs + j, 2 * j + 1)] = samples.velocities[(k, j)];
            }
        }

        Ok(SimulationOutput {
            motion: MotionData::new(samples.positions, samples.velocities, torques),
            base_regressor: regressor,
        })
    }
}

// ---------------------------------------------------------------------------
// FailingSimulator
// ---------------------------------------------------------------------------

/// Delegates to `inner` for `successes` calls, then fails every call.
#[derive(Debug, Clone)]
pub struct FailingSimulator<S> {
    pub inner: S,
    pub successes: usize,
    pub calls: usize,
}

impl<S> FailingSimulator<S> {
    pub const fn new(inner: S, successes: usize) -> Self {
        Self {
            inner,
            successes,
            calls: 0,
        }
    }
}

impl<S: Simulator> Simulator for FailingSimulator<S> {
    fn simulate(
        &mut self,
        trajectory: &mut TrajectoryGenerator,
    ) -> Result<SimulationOutput, SimulationError> {
        self.calls += 1;
        if self.calls > self.successes {
            return Err(SimulationError::Failed(format!(
                "mock failure on call {}",
                self.calls
            )));
        }
        self.inner.simulate(trajectory)
    }
}

// ---------------------------------------------------------------------------
// CountingSimulator
// ---------------------------------------------------------------------------

/// Counts calls and records the parameters of every simulated trajectory.
#[derive(Debug, Clone)]
pub struct CountingSimulator<S> {
    pub inner: S,
    pub seen: Vec<FourierParams>,
}

impl<S> CountingSimulator<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            seen: Vec::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.len()
    }
}

impl<S: Simulator> Simulator for CountingSimulator<S> {
    fn simulate(
        &mut self,
        trajectory: &mut TrajectoryGenerator,
    ) -> Result<SimulationOutput, SimulationError> {
        self.seen.push(trajectory.params());
        self.inner.simulate(trajectory)
    }
}

// ---------------------------------------------------------------------------
// NanRegionSimulator
// ---------------------------------------------------------------------------

/// Delegates to `inner` below `max_pulsation`. Above it the motion is all
/// NaN, the way a diverged simulation reports, while the regressor is the
/// identity so the region looks perfectly conditioned.
#[derive(Debug, Clone)]
pub struct NanRegionSimulator<S> {
    pub inner: S,
    pub max_pulsation: f64,
    /// Calls answered with NaN motion.
    pub nan_calls: usize,
}

impl<S> NanRegionSimulator<S> {
    pub const fn new(inner: S, max_pulsation: f64) -> Self {
        Self {
            inner,
            max_pulsation,
            nan_calls: 0,
        }
    }
}

impl<S: Simulator> Simulator for NanRegionSimulator<S> {
    fn simulate(
        &mut self,
        trajectory: &mut TrajectoryGenerator,
    ) -> Result<SimulationOutput, SimulationError> {
        if trajectory.pulsation() <= self.max_pulsation {
            return self.inner.simulate(trajectory);
        }
        self.nan_calls += 1;
        let dofs = trajectory.dofs();
        let nan = || DMatrix::from_element(4, dofs, f64::NAN);
        Ok(SimulationOutput {
            motion: MotionData::new(nan(), nan(), nan()),
            base_regressor: DMatrix::identity(2 * dofs, 2 * dofs),
        })
    }
}
