//! Ready-made joint limits and run configurations.

use excitation_core::{ExcitationConfig, JointLimits};
use excitation_core::config::{OptimizerConfig, SimplexConfig, SqpConfig, SwarmConfig};

/// Generous limits for `dofs` joints: +-3 rad, 4 rad/s, 20 N·m.
pub fn test_limits(dofs: usize) -> Vec<JointLimits> {
    (0..dofs)
        .map(|j| JointLimits::new(format!("joint_{j}"), -3.0, 3.0, 4.0, 20.0))
        .collect()
}

/// Small-budget configuration over [`test_limits`].
///
/// The initial guess (coefficients 0.5, pulsation 1) is feasible for these
/// limits with a [`KinematicSimulator`](crate::KinematicSimulator).
pub fn test_config(dofs: usize, harmonics: usize) -> ExcitationConfig {
    let mut config = ExcitationConfig {
        joints: test_limits(dofs),
        optimizer: OptimizerConfig {
            seed: 42,
            swarm: SwarmConfig {
                swarm_size: 6,
                outer_iterations: 2,
                inner_iterations: 2,
                ..SwarmConfig::default()
            },
            sqp: SqpConfig {
                max_iterations: 3,
                ..SqpConfig::default()
            },
            simplex: SimplexConfig {
                max_evaluations: 40,
                outer_iterations: 2,
                ..SimplexConfig::default()
            },
            ..OptimizerConfig::default()
        },
        ..ExcitationConfig::default()
    };
    config.trajectory.harmonics = harmonics;
    config.constraints.min_velocity_fraction = 0.1;
    config
}
