use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{JointLimits, JointLimitsSource, ParameterBounds};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_harmonics() -> usize {
    4
}
const fn default_initial_pulsation() -> f64 {
    1.0
}
const fn default_speed() -> f64 {
    1.0
}
const fn default_seed_coefficient() -> f64 {
    0.5
}
const fn default_tolerance() -> f64 {
    1e-6
}
const fn default_min_velocity_fraction() -> f64 {
    0.25
}
const fn default_torque_excitation_fraction() -> f64 {
    0.1
}
const fn default_swarm_size() -> usize {
    40
}
const fn default_outer_iterations() -> usize {
    20
}
const fn default_inner_iterations() -> usize {
    10
}
const fn default_inertia() -> f64 {
    0.7
}
const fn default_acceleration() -> f64 {
    1.5
}
const fn default_initial_penalty() -> f64 {
    10.0
}
const fn default_penalty_growth() -> f64 {
    2.0
}
const fn default_sqp_iterations() -> usize {
    100
}
const fn default_step_tolerance() -> f64 {
    1e-6
}
const fn default_gradient_step() -> f64 {
    1e-6
}
const fn default_line_search_steps() -> usize {
    12
}
const fn default_qp_iterations() -> u32 {
    100
}
const fn default_simplex_evaluations() -> usize {
    400
}
const fn default_simplex_outer() -> usize {
    8
}
const fn default_simplex_step() -> f64 {
    0.1
}
const fn default_simplex_tolerance() -> f64 {
    1e-8
}

// ---------------------------------------------------------------------------
// TrajectoryConfig
// ---------------------------------------------------------------------------

/// Shape of the optimized Fourier trajectory and its starting point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Harmonics per DOF (`nf`), uniform across DOFs (default: 4).
    #[serde(default = "default_harmonics")]
    pub harmonics: usize,

    /// Starting global pulsation `w_f` in rad/s (default: 1.0).
    #[serde(default = "default_initial_pulsation")]
    pub initial_pulsation: f64,

    /// Trajectory speed factor scaling the initial coefficients (default: 1.0).
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Value every initial sine/cosine coefficient starts from, before
    /// scaling by `speed` (default: 0.5).
    #[serde(default = "default_seed_coefficient")]
    pub seed_coefficient: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            harmonics: default_harmonics(),
            initial_pulsation: default_initial_pulsation(),
            speed: default_speed(),
            seed_coefficient: default_seed_coefficient(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConstraintConfig
// ---------------------------------------------------------------------------

/// How simulated motion is checked against the joint limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintConfig {
    /// A constraint entry is satisfied when `g_k <= tolerance` (default: 1e-6).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Each joint must reach at least this fraction of its velocity limit
    /// (default: 0.25).
    #[serde(default = "default_min_velocity_fraction")]
    pub min_velocity_fraction: f64,

    /// Peak torque below this fraction of the torque limit is penalized in
    /// the objective (default: 0.1).
    #[serde(default = "default_torque_excitation_fraction")]
    pub torque_excitation_fraction: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            min_velocity_fraction: default_min_velocity_fraction(),
            torque_excitation_fraction: default_torque_excitation_fraction(),
        }
    }
}

// ---------------------------------------------------------------------------
// Solver configs
// ---------------------------------------------------------------------------

/// Augmented-Lagrangian particle swarm (global stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    #[serde(default = "default_swarm_size")]
    pub swarm_size: usize,
    /// Lagrange multiplier / penalty updates.
    #[serde(default = "default_outer_iterations")]
    pub outer_iterations: usize,
    /// Swarm moves per outer iteration.
    #[serde(default = "default_inner_iterations")]
    pub inner_iterations: usize,
    #[serde(default = "default_inertia")]
    pub inertia: f64,
    #[serde(default = "default_acceleration")]
    pub cognitive: f64,
    #[serde(default = "default_acceleration")]
    pub social: f64,
    #[serde(default = "default_initial_penalty")]
    pub initial_penalty: f64,
    #[serde(default = "default_penalty_growth")]
    pub penalty_growth: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            swarm_size: default_swarm_size(),
            outer_iterations: default_outer_iterations(),
            inner_iterations: default_inner_iterations(),
            inertia: default_inertia(),
            cognitive: default_acceleration(),
            social: default_acceleration(),
            initial_penalty: default_initial_penalty(),
            penalty_growth: default_penalty_growth(),
        }
    }
}

/// Sequential quadratic programming (gradient-based local stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqpConfig {
    #[serde(default = "default_sqp_iterations")]
    pub max_iterations: usize,
    /// Stop once the QP step's infinity norm falls below this.
    #[serde(default = "default_step_tolerance")]
    pub step_tolerance: f64,
    /// Forward-difference perturbation for gradients.
    #[serde(default = "default_gradient_step")]
    pub gradient_step: f64,
    /// Backtracking halvings per iteration.
    #[serde(default = "default_line_search_steps")]
    pub line_search_steps: usize,
    /// Iteration cap of the QP subproblem solver.
    #[serde(default = "default_qp_iterations")]
    pub max_qp_iterations: u32,
}

impl Default for SqpConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_sqp_iterations(),
            step_tolerance: default_step_tolerance(),
            gradient_step: default_gradient_step(),
            line_search_steps: default_line_search_steps(),
            max_qp_iterations: default_qp_iterations(),
        }
    }
}

/// Nelder-Mead on an augmented Lagrangian (derivative-free local stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplexConfig {
    /// Evaluation budget per outer iteration.
    #[serde(default = "default_simplex_evaluations")]
    pub max_evaluations: usize,
    #[serde(default = "default_simplex_outer")]
    pub outer_iterations: usize,
    /// Initial simplex edge, as a fraction of each bound's width.
    #[serde(default = "default_simplex_step")]
    pub initial_step: f64,
    /// Stop when the simplex's value spread falls below this.
    #[serde(default = "default_simplex_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_initial_penalty")]
    pub initial_penalty: f64,
    #[serde(default = "default_penalty_growth")]
    pub penalty_growth: f64,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            max_evaluations: default_simplex_evaluations(),
            outer_iterations: default_simplex_outer(),
            initial_step: default_simplex_step(),
            tolerance: default_simplex_tolerance(),
            initial_penalty: default_initial_penalty(),
            penalty_growth: default_penalty_growth(),
        }
    }
}

// ---------------------------------------------------------------------------
// SearchStrategy
// ---------------------------------------------------------------------------

/// Which optimization stages run, and with which local backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Particle swarm only.
    Global,
    /// SQP only.
    LocalSqp,
    /// Simplex augmented Lagrangian only.
    LocalSimplex,
    /// Particle swarm, then SQP refinement.
    #[default]
    GlobalSqp,
    /// Particle swarm, then simplex refinement.
    GlobalSimplex,
}

impl SearchStrategy {
    pub const fn uses_global(self) -> bool {
        matches!(self, Self::Global | Self::GlobalSqp | Self::GlobalSimplex)
    }

    pub const fn uses_local(self) -> bool {
        !matches!(self, Self::Global)
    }
}

/// Optimizer stage selection and backend settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default)]
    pub strategy: SearchStrategy,
    /// Root seed for every random draw in a run.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub swarm: SwarmConfig,
    #[serde(default)]
    pub sqp: SqpConfig,
    #[serde(default)]
    pub simplex: SimplexConfig,
}

// ---------------------------------------------------------------------------
// ExcitationConfig
// ---------------------------------------------------------------------------

/// Complete configuration of one excitation trajectory optimization run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExcitationConfig {
    #[serde(default)]
    pub trajectory: TrajectoryConfig,
    #[serde(default)]
    pub bounds: ParameterBounds,
    #[serde(default)]
    pub constraints: ConstraintConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Limits of the optimized joints, in DOF order.
    #[serde(default)]
    pub joints: Vec<JointLimits>,
}

impl ExcitationConfig {
    /// Number of optimized DOFs.
    pub fn dofs(&self) -> usize {
        self.joints.len()
    }

    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.joints.is_empty() {
            return Err(ConfigError::MissingJoints);
        }
        for joint in &self.joints {
            joint.validate()?;
        }
        self.validate_settings()
    }

    /// Validate everything except the `[[joints]]` table, for runs whose
    /// joint limits come from another source.
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        self.bounds.validate()?;

        let traj = &self.trajectory;
        if traj.harmonics == 0 {
            return Err(ConfigError::invalid("trajectory.harmonics", "must be >= 1"));
        }
        if !(traj.initial_pulsation > 0.0) {
            return Err(ConfigError::invalid(
                "trajectory.initial_pulsation",
                "must be > 0",
            ));
        }
        if !traj.speed.is_finite() || !traj.seed_coefficient.is_finite() {
            return Err(ConfigError::invalid(
                "trajectory.speed",
                "speed and seed coefficient must be finite",
            ));
        }

        let cons = &self.constraints;
        if !cons.tolerance.is_finite() || cons.tolerance < 0.0 {
            return Err(ConfigError::invalid("constraints.tolerance", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&cons.min_velocity_fraction) {
            return Err(ConfigError::invalid(
                "constraints.min_velocity_fraction",
                "must be in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&cons.torque_excitation_fraction) {
            return Err(ConfigError::invalid(
                "constraints.torque_excitation_fraction",
                "must be in [0, 1]",
            ));
        }

        let opt = &self.optimizer;
        if opt.strategy.uses_global() && opt.swarm.swarm_size < 2 {
            return Err(ConfigError::invalid(
                "optimizer.swarm.swarm_size",
                "must be >= 2",
            ));
        }
        if !(opt.sqp.gradient_step > 0.0) {
            return Err(ConfigError::invalid("optimizer.sqp.gradient_step", "must be > 0"));
        }
        if !(opt.simplex.initial_step > 0.0) {
            return Err(ConfigError::invalid(
                "optimizer.simplex.initial_step",
                "must be > 0",
            ));
        }
        Ok(())
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl JointLimitsSource for ExcitationConfig {
    fn joint_limits(&self) -> Result<Vec<JointLimits>, ConfigError> {
        if self.joints.is_empty() {
            return Err(ConfigError::MissingJoints);
        }
        Ok(self.joints.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
