//! Nelder-Mead on an augmented Lagrangian, for derivative-free refinement.

use excitation_core::SimplexConfig;
use tracing::debug;

use crate::error::SolverError;
use crate::lagrangian::Multipliers;
use crate::problem::{Bounds, Evaluation, Problem, SolveReport, Solver};
use crate::tracker::Tracker;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Local derivative-free solver: bounded Nelder-Mead inner loops with
/// multiplier updates in between.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexLagrangian {
    config: SimplexConfig,
}

struct Vertex {
    x: Vec<f64>,
    eval: Evaluation,
    score: f64,
}

impl SimplexLagrangian {
    pub const fn new(config: SimplexConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &SimplexConfig {
        &self.config
    }

    fn vertex(
        tracker: &mut Tracker<'_>,
        bounds: &Bounds,
        multipliers: &Multipliers,
        mut x: Vec<f64>,
    ) -> Result<Vertex, SolverError> {
        bounds.clamp_in_place(&mut x);
        let eval = tracker.evaluate(&x)?;
        let score = multipliers.value(&eval);
        Ok(Vertex { x, eval, score })
    }

    /// One bounded Nelder-Mead run from `start`. Returns the best vertex and
    /// whether the simplex collapsed below tolerance.
    fn nelder_mead(
        &self,
        tracker: &mut Tracker<'_>,
        bounds: &Bounds,
        multipliers: &Multipliers,
        start: &[f64],
    ) -> Result<(Vertex, bool), SolverError> {
        let cfg = &self.config;
        let dim = start.len();
        let budget = tracker.evaluations() + cfg.max_evaluations.max(dim + 1);

        let mut simplex = Vec::with_capacity(dim + 1);
        simplex.push(Self::vertex(tracker, bounds, multipliers, start.to_vec())?);
        for i in 0..dim {
            let mut x = start.to_vec();
            let step = cfg.initial_step * bounds.width(i);
            x[i] = if x[i] + step <= bounds.upper()[i] {
                x[i] + step
            } else {
                x[i] - step
            };
            simplex.push(Self::vertex(tracker, bounds, multipliers, x)?);
        }

        let mut collapsed = false;
        while tracker.evaluations() < budget {
            simplex.sort_by(|a, b| a.score.total_cmp(&b.score));
            let best = simplex[0].score;
            let worst = simplex[dim].score;
            if best.is_finite() && worst - best <= cfg.tolerance {
                collapsed = true;
                break;
            }

            let centroid: Vec<f64> = (0..dim)
                .map(|i| simplex[..dim].iter().map(|v| v.x[i]).sum::<f64>() / dim as f64)
                .collect();
            let toward = |from: &[f64], coeff: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(from)
                    .map(|(c, p)| c + coeff * (p - c))
                    .collect()
            };

            let reflected = Self::vertex(
                tracker,
                bounds,
                multipliers,
                toward(&simplex[dim].x, -REFLECTION),
            )?;

            if reflected.score < best {
                let expanded = Self::vertex(
                    tracker,
                    bounds,
                    multipliers,
                    toward(&reflected.x, EXPANSION),
                )?;
                simplex[dim] = if expanded.score < reflected.score {
                    expanded
                } else {
                    reflected
                };
                continue;
            }
            if reflected.score < simplex[dim - 1].score {
                simplex[dim] = reflected;
                continue;
            }

            let contracted = if reflected.score < worst {
                toward(&reflected.x, CONTRACTION)
            } else {
                toward(&simplex[dim].x, CONTRACTION)
            };
            let contracted = Self::vertex(tracker, bounds, multipliers, contracted)?;
            if contracted.score < reflected.score.min(worst) {
                simplex[dim] = contracted;
                continue;
            }

            let anchor = simplex[0].x.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let x = anchor
                    .iter()
                    .zip(&vertex.x)
                    .map(|(a, v)| a + SHRINK * (v - a))
                    .collect();
                *vertex = Self::vertex(tracker, bounds, multipliers, x)?;
            }
        }

        simplex.sort_by(|a, b| a.score.total_cmp(&b.score));
        let best = simplex.swap_remove(0);
        Ok((best, collapsed))
    }
}

impl Solver for SimplexLagrangian {
    fn name(&self) -> &'static str {
        "simplex-lagrangian"
    }

    fn minimize(
        &self,
        problem: &mut dyn Problem,
        initial: &[f64],
    ) -> Result<SolveReport, SolverError> {
        let cfg = &self.config;
        let mut tracker = Tracker::new(problem, initial)?;
        let bounds = tracker.problem().bounds().clone();
        let constraints = tracker.problem().constraint_count();
        let start = bounds.clamp(initial);

        if bounds.is_empty() {
            tracker.evaluate(&start)?;
            return Ok(tracker.report(&start, true));
        }

        let mut multipliers =
            Multipliers::new(constraints, cfg.initial_penalty, cfg.penalty_growth);
        let mut x = start.clone();
        let mut converged = false;

        for outer in 0..cfg.outer_iterations.max(1) {
            let (best, collapsed) = self.nelder_mead(&mut tracker, &bounds, &multipliers, &x)?;
            debug!(
                outer,
                objective = best.eval.objective,
                violation = best.eval.max_violation(),
                evaluations = tracker.evaluations(),
                "simplex inner loop finished"
            );
            let moved = x
                .iter()
                .zip(&best.x)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            x = best.x;
            if collapsed && best.eval.is_feasible() && moved <= cfg.tolerance.sqrt() {
                converged = true;
                break;
            }
            multipliers.update(&best.eval.constraints);
        }

        let report = tracker.report(&start, converged);
        debug!(
            objective = report.objective,
            violation = report.max_violation,
            evaluations = report.evaluations,
            converged,
            "simplex lagrangian finished"
        );
        Ok(report)
    }
}
