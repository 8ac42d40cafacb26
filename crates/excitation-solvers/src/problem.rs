//! The contract between an optimization problem and its solvers.

use crate::error::SolverError;

/// Error type a [`Problem`] may fail evaluation with.
pub type EvalError = Box<dyn std::error::Error + Send + Sync>;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Elementwise box `lower <= x <= upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, SolverError> {
        if lower.len() != upper.len() {
            return Err(SolverError::DimensionMismatch {
                expected: lower.len(),
                got: upper.len(),
            });
        }
        if let Some(i) = (0..lower.len()).find(|&i| !(lower[i] <= upper[i])) {
            return Err(SolverError::InvalidConfig(format!(
                "bound {i}: lower ({}) > upper ({})",
                lower[i], upper[i]
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn width(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.len()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }

    /// Project `x` onto the box in place. NaN components go to the center.
    pub fn clamp_in_place(&self, x: &mut [f64]) {
        for (i, v) in x.iter_mut().enumerate() {
            *v = if v.is_nan() {
                0.5 * (self.lower[i] + self.upper[i])
            } else {
                v.max(self.lower[i]).min(self.upper[i])
            };
        }
    }

    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        let mut out = x.to_vec();
        self.clamp_in_place(&mut out);
        out
    }
}

// ---------------------------------------------------------------------------
// Problem
// ---------------------------------------------------------------------------

/// Result of one objective/constraint evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub objective: f64,
    /// Inequality constraints, satisfied when `<= 0`.
    pub constraints: Vec<f64>,
    /// The evaluation produced no usable objective.
    pub failed: bool,
}

impl Evaluation {
    pub fn new(objective: f64, constraints: Vec<f64>) -> Self {
        Self {
            failed: !objective.is_finite(),
            objective,
            constraints,
        }
    }

    /// Largest constraint violation, `0` if feasible, `+inf` on NaN.
    pub fn max_violation(&self) -> f64 {
        max_violation(&self.constraints)
    }

    pub fn is_feasible(&self) -> bool {
        !self.failed && self.max_violation() <= 0.0
    }
}

/// Largest positive entry of `g`; `0` if none, `+inf` if any entry is NaN.
pub fn max_violation(g: &[f64]) -> f64 {
    g.iter().fold(0.0_f64, |acc, &v| {
        if v.is_nan() { f64::INFINITY } else { acc.max(v) }
    })
}

/// A bounded, inequality-constrained minimization problem.
pub trait Problem {
    fn bounds(&self) -> &Bounds;

    fn dim(&self) -> usize {
        self.bounds().len()
    }

    fn constraint_count(&self) -> usize;

    /// Evaluate objective and constraints at `x`.
    ///
    /// An `Err` aborts the solve.
    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, EvalError>;
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Outcome of a [`Solver::minimize`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// Best point the solver saw (feasible first, then lowest objective).
    pub x: Vec<f64>,
    pub objective: f64,
    pub max_violation: f64,
    /// Number of problem evaluations performed.
    pub evaluations: usize,
    /// Whether the solver's own stopping criterion was met.
    pub converged: bool,
}

impl SolveReport {
    pub fn is_feasible(&self) -> bool {
        self.objective.is_finite() && self.max_violation <= 0.0
    }
}

/// A minimization backend.
pub trait Solver {
    fn name(&self) -> &'static str;

    /// Minimize `problem` starting from `initial`.
    fn minimize(
        &self,
        problem: &mut dyn Problem,
        initial: &[f64],
    ) -> Result<SolveReport, SolverError>;
}
