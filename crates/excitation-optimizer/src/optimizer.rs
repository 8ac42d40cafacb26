//! The excitation trajectory optimizer.
//!
//! [`TrajectoryOptimizer`] owns everything one run mutates: the trajectory
//! generator handed to the simulator, the count of real evaluations and the
//! best feasible point seen so far. Backends see it only through the
//! [`Problem`] contract.

use std::path::Path;

use excitation_core::{AngleUnit, ConfigError, ExcitationConfig, JointLimits, JointLimitsSource};
use excitation_solvers::{
    Bounds, EvalError, Evaluation, Problem, SolveReport, SolverError, SolverPlan,
};
use excitation_trajectory::{FourierParams, ParameterLayout, TrajectoryFile, TrajectoryGenerator};
use tracing::{debug, info, warn};

use crate::conditioning::condition_number;
use crate::constraints::{self, constraint_vector, test_bounds, test_constraints, torque_deficit};
use crate::error::OptimizerError;
use crate::simulation::Simulator;

/// Objective returned for out-of-bounds parameter vectors.
pub const PENALTY_OBJECTIVE: f64 = 10_000.0;
/// Every constraint entry returned for out-of-bounds parameter vectors.
pub const PENALTY_CONSTRAINT: f64 = 10.0;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Lowest objective seen among feasible evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct BestSolution {
    pub objective: f64,
    pub vector: Vec<f64>,
}

/// Where the final parameter vector of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionSource {
    /// The best-feasible cache.
    BestFeasible,
    /// The last backend's reported point (no feasible point was seen).
    Backend,
    /// The initial guess (no backend ran).
    Initial,
}

/// Result of [`TrajectoryOptimizer::optimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub parameters: FourierParams,
    pub vector: Vec<f64>,
    /// Objective of the refresh evaluation of `vector`.
    pub objective: f64,
    pub feasible: bool,
    /// Real (in-bounds) evaluations performed by the search.
    pub evaluations: usize,
    pub source: SolutionSource,
}

// ---------------------------------------------------------------------------
// TrajectoryOptimizer
// ---------------------------------------------------------------------------

/// Searches Fourier parameters for the best-conditioned feasible trajectory.
pub struct TrajectoryOptimizer<S> {
    simulator: S,
    config: ExcitationConfig,
    limits: Vec<JointLimits>,
    layout: ParameterLayout,
    bounds: Bounds,
    generator: TrajectoryGenerator,
    iterations: usize,
    best: Option<BestSolution>,
    last_constraints: Vec<f64>,
}

impl<S: Simulator> TrajectoryOptimizer<S> {
    /// Build an optimizer whose joint limits are the config's `[[joints]]`.
    pub fn new(config: ExcitationConfig, simulator: S) -> Result<Self, OptimizerError> {
        let limits = config.joint_limits()?;
        Self::build(config, limits, simulator)
    }

    /// Build an optimizer reading joint limits from `source`, once.
    ///
    /// If the config also lists joints, the counts must agree.
    pub fn with_limits<L: JointLimitsSource + ?Sized>(
        config: ExcitationConfig,
        source: &L,
        simulator: S,
    ) -> Result<Self, OptimizerError> {
        let limits = source.joint_limits()?;
        if !config.joints.is_empty() && limits.len() != config.dofs() {
            return Err(ConfigError::dimension("joints", config.dofs(), limits.len()).into());
        }
        Self::build(config, limits, simulator)
    }

    fn build(
        config: ExcitationConfig,
        limits: Vec<JointLimits>,
        simulator: S,
    ) -> Result<Self, OptimizerError> {
        config.validate_settings()?;
        if limits.is_empty() {
            return Err(ConfigError::MissingJoints.into());
        }
        for limit in &limits {
            limit.validate()?;
        }

        let dofs = limits.len();
        let layout = ParameterLayout::new(dofs, config.trajectory.harmonics);
        let bounds = parameter_box(&layout, &config);
        let bounds = Bounds::new(bounds.0, bounds.1)?;
        let generator =
            TrajectoryGenerator::new(dofs, config.trajectory.initial_pulsation, AngleUnit::Radians)?;

        debug!(dofs, parameters = layout.len(), "trajectory optimizer configured");
        Ok(Self {
            simulator,
            config,
            limits,
            layout,
            bounds,
            generator,
            iterations: 0,
            best: None,
            last_constraints: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn dofs(&self) -> usize {
        self.limits.len()
    }

    pub const fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    pub const fn parameter_bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn limits(&self) -> &[JointLimits] {
        &self.limits
    }

    pub const fn config(&self) -> &ExcitationConfig {
        &self.config
    }

    /// Real (in-bounds) evaluations since the last reset.
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    pub const fn best(&self) -> Option<&BestSolution> {
        self.best.as_ref()
    }

    /// Constraint vector of the most recent evaluation.
    pub fn last_constraints(&self) -> &[f64] {
        &self.last_constraints
    }

    /// The trajectory of the most recent in-bounds evaluation.
    pub const fn trajectory(&self) -> &TrajectoryGenerator {
        &self.generator
    }

    pub const fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn into_simulator(self) -> S {
        self.simulator
    }

    // -----------------------------------------------------------------------
    // Encoding and bounds
    // -----------------------------------------------------------------------

    /// Split `x` into pulsation, offsets and coefficient rows.
    pub fn vector_to_params(&self, x: &[f64]) -> Result<FourierParams, OptimizerError> {
        Ok(self.layout.decode(x)?)
    }

    /// Whether every component of `x` lies inside its class bound.
    pub fn in_bounds(&self, x: &[f64]) -> bool {
        self.bounds.contains(x)
    }

    /// Uniform seed coefficients scaled by the trajectory speed, zero
    /// offsets and the configured pulsation, clamped into the bounds.
    pub fn initial_guess(&self) -> Result<Vec<f64>, OptimizerError> {
        let traj = &self.config.trajectory;
        let dofs = self.dofs();
        let coefficient = traj.seed_coefficient * traj.speed;
        let rows = vec![vec![coefficient; traj.harmonics]; dofs];
        let params = FourierParams::uniform(
            traj.initial_pulsation,
            vec![0.0; dofs],
            rows.clone(),
            rows,
            traj.harmonics,
        );
        let mut x = self.layout.encode(&params)?;
        self.bounds.clamp_in_place(&mut x);
        Ok(x)
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Objective and constraint vector at `x`.
    ///
    /// Out-of-bounds vectors get [`PENALTY_OBJECTIVE`] and an all-violated
    /// constraint vector without touching the simulator, and do not count as
    /// iterations. Feasible improvements update the best-feasible cache.
    pub fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, OptimizerError> {
        let constraint_count = constraints::BLOCKS * self.dofs();

        if !self.in_bounds(x) {
            let diagnostics = test_bounds(x, &self.layout, &self.config.bounds);
            debug!(
                out_of_range = diagnostics.violations.len(),
                wrong_length = diagnostics.wrong_length,
                "skipping simulation for out-of-bounds vector"
            );
            self.last_constraints = vec![PENALTY_CONSTRAINT; constraint_count];
            return Ok(Evaluation::new(
                PENALTY_OBJECTIVE,
                self.last_constraints.clone(),
            ));
        }

        self.iterations += 1;
        let params = self.layout.decode(x)?;
        self.generator.apply_params(&params)?;
        self.generator.set_time(0.0);

        let output = self.simulator.simulate(&mut self.generator)?;
        output.motion.validate(self.dofs())?;

        let cons = &self.config.constraints;
        let mut objective = condition_number(&output.base_regressor);
        let deficit = torque_deficit(&output.motion, &self.limits, cons.torque_excitation_fraction);
        if deficit > 0.0 {
            objective += deficit;
        }

        let g = constraint_vector(&output.motion, &self.limits, cons.min_velocity_fraction);
        let feasible = test_constraints(&g, self.dofs(), cons.tolerance).is_satisfied();

        if feasible
            && objective.is_finite()
            && self.best.as_ref().is_none_or(|best| objective < best.objective)
        {
            debug!(iteration = self.iterations, objective, "new best feasible trajectory");
            self.best = Some(BestSolution {
                objective,
                vector: x.to_vec(),
            });
        }

        debug!(
            iteration = self.iterations,
            objective,
            torque_deficit = deficit,
            feasible,
            "evaluated trajectory"
        );
        self.last_constraints.clone_from(&g);
        Ok(Evaluation::new(objective, g))
    }

    /// Objective alone, for callback-style backends.
    pub fn objective(&mut self, x: &[f64]) -> Result<f64, OptimizerError> {
        Ok(self.evaluate(x)?.objective)
    }

    /// Entry `index` of the constraint vector from the latest evaluation.
    pub fn constraint(&self, index: usize) -> Option<f64> {
        self.last_constraints.get(index).copied()
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Run the configured global and local stages and refresh the trajectory
    /// to the selected solution.
    pub fn optimize(&mut self) -> Result<OptimizationOutcome, OptimizerError> {
        let plan = SolverPlan::from_config(&self.config.optimizer);
        self.run(&plan)
    }

    /// [`optimize`](Self::optimize) with an explicit solver plan.
    pub fn run(&mut self, plan: &SolverPlan) -> Result<OptimizationOutcome, OptimizerError> {
        self.iterations = 0;
        self.best = None;

        let initial = self.initial_guess()?;
        info!(
            strategy = ?self.config.optimizer.strategy,
            dofs = self.dofs(),
            parameters = self.layout.len(),
            ?plan,
            "starting excitation trajectory optimization"
        );

        let mut candidate = initial;
        let mut backend_ran = false;

        if let Some(global) = &plan.global {
            info!(solver = global.name(), "global search");
            let report = global.minimize(self, &candidate).map_err(unwrap_evaluation)?;
            log_report(global.name(), &report, self.iterations);
            candidate = report.x;
            backend_ran = true;
        }

        if let Some(local) = &plan.local {
            let start = self
                .best
                .as_ref()
                .map_or_else(|| candidate.clone(), |best| best.vector.clone());
            info!(solver = local.name(), from_cache = self.best.is_some(), "local refinement");
            let report = local.minimize(self, &start).map_err(unwrap_evaluation)?;
            log_report(local.name(), &report, self.iterations);
            candidate = report.x;
            backend_ran = true;
        }

        let (mut vector, source) = match &self.best {
            Some(best) => (best.vector.clone(), SolutionSource::BestFeasible),
            None if backend_ran => (candidate, SolutionSource::Backend),
            None => (candidate, SolutionSource::Initial),
        };
        if source != SolutionSource::BestFeasible {
            warn!(?source, "no feasible trajectory found");
        }
        if !self.in_bounds(&vector) {
            warn!("selected vector out of bounds, clamping");
            self.bounds.clamp_in_place(&mut vector);
        }

        let evaluations = self.iterations;
        self.iterations = 0;
        let eval = self.evaluate(&vector)?;
        let tolerance = self.config.constraints.tolerance;
        let feasible = test_constraints(&eval.constraints, self.dofs(), tolerance).is_satisfied();
        let parameters = self.layout.decode(&vector)?;

        info!(
            objective = eval.objective,
            feasible,
            evaluations,
            ?source,
            "excitation trajectory optimization finished"
        );
        Ok(OptimizationOutcome {
            parameters,
            vector,
            objective: eval.objective,
            feasible,
            evaluations,
            source,
        })
    }

    /// Write the current trajectory's parameters as JSON.
    pub fn save_trajectory(&self, path: impl AsRef<Path>) -> Result<(), OptimizerError> {
        TrajectoryFile::from_params(&self.generator.params())?.save(path)?;
        Ok(())
    }
}

impl<S: Simulator> Problem for TrajectoryOptimizer<S> {
    fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    fn constraint_count(&self) -> usize {
        constraints::BLOCKS * self.dofs()
    }

    /// Solvers treat `g <= 0` as satisfied, so the tolerance is folded into
    /// the returned constraints.
    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, EvalError> {
        let tolerance = self.config.constraints.tolerance;
        let eval = TrajectoryOptimizer::evaluate(self, x).map_err(|e| Box::new(e) as EvalError)?;
        let shifted = eval.constraints.iter().map(|g| g - tolerance).collect();
        Ok(Evaluation {
            constraints: shifted,
            ..eval
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Elementwise lower/upper bounds of the parameter vector.
fn parameter_box(layout: &ParameterLayout, config: &ExcitationConfig) -> (Vec<f64>, Vec<f64>) {
    let mut lower = Vec::with_capacity(layout.len());
    let mut upper = Vec::with_capacity(layout.len());
    for index in 0..layout.len() {
        if let Some(class) = constraints::ParameterClass::of_index(layout, index) {
            let range = class.range(&config.bounds);
            lower.push(range.low);
            upper.push(range.high);
        }
    }
    (lower, upper)
}

/// Recover an optimizer error that travelled through a backend.
fn unwrap_evaluation(err: SolverError) -> OptimizerError {
    match err {
        SolverError::Evaluation(inner) => match inner.downcast::<OptimizerError>() {
            Ok(original) => *original,
            Err(other) => OptimizerError::Solver(SolverError::Evaluation(other)),
        },
        other => OptimizerError::Solver(other),
    }
}

fn log_report(solver: &str, report: &SolveReport, iterations: usize) {
    info!(
        solver,
        objective = report.objective,
        violation = report.max_violation,
        evaluations = report.evaluations,
        real_evaluations = iterations,
        converged = report.converged,
        "stage finished"
    );
}
