//! Sequential quadratic programming with a damped BFGS Hessian.
//!
//! Each iteration linearizes the constraints and solves
//!
//! ```text
//! min_d  0.5 d'Bd + grad_f'd
//! s.t.   g + J d <= 0,  lower <= x + d <= upper
//! ```
//!
//! with Clarabel, the constraint rows tightened by a small margin. If the
//! linearization is infeasible the constraint rows are relaxed to
//! `J d <= max(-g, 0)`, which `d = 0` always satisfies. The step is
//! globalized with an L1 merit function and backtracking.

use excitation_core::SqpConfig;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use crate::error::SolverError;
use crate::jacobian::FiniteDifference;
use crate::problem::{Bounds, Evaluation, Problem, SolveReport, Solver};
use crate::qp::{QpStep, solve_inequality_qp};
use crate::tracker::Tracker;

const ARMIJO: f64 = 1e-4;
/// Linearized constraints are targeted this far inside `g <= 0`, so
/// iterates on an active linear constraint stay strictly feasible.
const INTERIOR_MARGIN: f64 = 1e-7;

/// Gradient-based local solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Sqp {
    config: SqpConfig,
}

/// Objective gradient and constraint Jacobian at one point.
struct Linearization {
    gradient: DVector<f64>,
    jacobian: DMatrix<f64>,
}

impl Linearization {
    /// Gradient of the Lagrangian `f + lambda'g`.
    fn lagrangian_gradient(&self, lambda: &DVector<f64>) -> DVector<f64> {
        &self.gradient + self.jacobian.tr_mul(lambda)
    }
}

impl Sqp {
    pub const fn new(config: SqpConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &SqpConfig {
        &self.config
    }

    /// Forward differences of the stacked `[f; g]` at `x`.
    fn linearize(
        &self,
        tracker: &mut Tracker<'_>,
        bounds: &Bounds,
        x: &[f64],
        eval: &Evaluation,
    ) -> Result<Linearization, SolverError> {
        let m = eval.constraints.len();
        let stacked = |e: &Evaluation| {
            let mut v = DVector::zeros(m + 1);
            v[0] = e.objective;
            for (k, &g) in e.constraints.iter().enumerate() {
                v[k + 1] = g;
            }
            v
        };
        let at_x = stacked(eval);
        let fd = FiniteDifference::new(self.config.gradient_step);
        let mut jac = fd.jacobian(
            |p| tracker.evaluate(p).map(|e| stacked(&e)),
            x,
            &at_x,
            Some(bounds),
        )?;

        let mut dropped = 0usize;
        for v in jac.iter_mut() {
            if !v.is_finite() {
                *v = 0.0;
                dropped += 1;
            }
        }
        if dropped > 0 {
            trace!(dropped, "non-finite derivative entries zeroed");
        }

        Ok(Linearization {
            gradient: jac.row(0).transpose(),
            jacobian: jac.rows(1, m).into_owned(),
        })
    }

    /// Solve the QP subproblem, relaxing the linearized constraints if the
    /// exact linearization is infeasible.
    fn step(
        &self,
        hessian: &DMatrix<f64>,
        lin: &Linearization,
        g: &[f64],
        x: &[f64],
        bounds: &Bounds,
    ) -> Result<Option<QpStep>, SolverError> {
        let n = x.len();
        let m = g.len();

        let mut a = DMatrix::zeros(m + 2 * n, n);
        a.view_mut((0, 0), (m, n)).copy_from(&lin.jacobian);
        for i in 0..n {
            a[(m + i, i)] = 1.0;
            a[(m + n + i, i)] = -1.0;
        }

        let finite_g: Vec<f64> = g
            .iter()
            .map(|&v| if v.is_finite() { v } else { 0.0 })
            .collect();
        let mut b = Vec::with_capacity(m + 2 * n);
        b.extend(finite_g.iter().map(|v| -v - INTERIOR_MARGIN));
        b.extend((0..n).map(|i| (bounds.upper()[i] - x[i]).max(0.0)));
        b.extend((0..n).map(|i| (x[i] - bounds.lower()[i]).max(0.0)));

        let q: Vec<f64> = lin.gradient.iter().copied().collect();
        let max_iter = self.config.max_qp_iterations;

        if let Some(step) = solve_inequality_qp(hessian, &q, &a, &b, max_iter)? {
            return Ok(Some(step));
        }
        for (row, v) in b.iter_mut().zip(&finite_g) {
            *row = (-v).max(0.0);
        }
        debug!("linearized constraints infeasible, relaxing");
        solve_inequality_qp(hessian, &q, &a, &b, max_iter)
    }
}

/// L1 merit `f + mu * sum(max(g, 0))`; `+inf` on failure or NaN.
fn merit(eval: &Evaluation, mu: f64) -> f64 {
    if eval.failed {
        return f64::INFINITY;
    }
    let violation: f64 = eval
        .constraints
        .iter()
        .map(|&g| if g.is_nan() { f64::INFINITY } else { g.max(0.0) })
        .sum();
    eval.objective + mu * violation
}

/// Powell-damped BFGS update of `hessian` in place.
fn damped_bfgs(hessian: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
    let bs = &*hessian * s;
    let sbs = s.dot(&bs);
    if !(sbs > 1e-12) {
        return;
    }
    let sy = s.dot(y);
    let r = if sy >= 0.2 * sbs {
        y.clone()
    } else {
        let theta = 0.8 * sbs / (sbs - sy);
        y * theta + &bs * (1.0 - theta)
    };
    let sr = s.dot(&r);
    if !(sr > 1e-12) || r.iter().any(|v| !v.is_finite()) {
        return;
    }
    *hessian -= &bs * bs.transpose() / sbs;
    *hessian += &r * r.transpose() / sr;
}

impl Solver for Sqp {
    fn name(&self) -> &'static str {
        "sqp"
    }

    fn minimize(
        &self,
        problem: &mut dyn Problem,
        initial: &[f64],
    ) -> Result<SolveReport, SolverError> {
        let cfg = &self.config;
        let mut tracker = Tracker::new(problem, initial)?;
        let bounds = tracker.problem().bounds().clone();
        let n = bounds.len();

        let mut x = bounds.clamp(initial);
        let mut eval = tracker.evaluate(&x)?;
        if eval.failed {
            debug!("initial point failed to evaluate, sqp cannot start");
            return Ok(tracker.report(&x, false));
        }
        let m = eval.constraints.len();

        let mut lin = self.linearize(&mut tracker, &bounds, &x, &eval)?;
        let mut hessian = DMatrix::<f64>::identity(n, n);
        let mut mu = 1.0_f64;
        let mut converged = false;

        for iteration in 0..cfg.max_iterations {
            let Some(qp) = self.step(&hessian, &lin, &eval.constraints, &x, &bounds)? else {
                debug!(iteration, "qp subproblem failed, stopping");
                break;
            };
            let d = DVector::from_vec(qp.x);
            let lambda = DVector::from_iterator(m, qp.z.iter().take(m).copied());

            if d.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())) < cfg.step_tolerance {
                converged = true;
                trace!(iteration, "step below tolerance");
                break;
            }

            mu = mu.max(1.1 * lambda.iter().fold(0.0_f64, |acc, l| acc.max(l.abs())));
            let current = merit(&eval, mu);
            let decrease = lin.gradient.dot(&d)
                - mu * eval.constraints.iter().map(|g| g.max(0.0)).sum::<f64>();

            let mut alpha = 1.0;
            let mut accepted = None;
            for _ in 0..cfg.line_search_steps.max(1) {
                let mut trial: Vec<f64> =
                    x.iter().zip(d.iter()).map(|(xi, di)| xi + alpha * di).collect();
                bounds.clamp_in_place(&mut trial);
                let trial_eval = tracker.evaluate(&trial)?;
                if merit(&trial_eval, mu) <= current + ARMIJO * alpha * decrease.min(0.0) {
                    accepted = Some((trial, trial_eval));
                    break;
                }
                alpha *= 0.5;
            }
            let Some((next_x, next_eval)) = accepted else {
                debug!(iteration, "line search failed, stopping");
                break;
            };

            let next_lin = self.linearize(&mut tracker, &bounds, &next_x, &next_eval)?;
            let s = DVector::from_iterator(n, next_x.iter().zip(&x).map(|(a, b)| a - b));
            let y = next_lin.lagrangian_gradient(&lambda) - lin.lagrangian_gradient(&lambda);
            damped_bfgs(&mut hessian, &s, &y);

            trace!(
                iteration,
                alpha,
                objective = next_eval.objective,
                violation = next_eval.max_violation(),
                "sqp step accepted"
            );
            x = next_x;
            eval = next_eval;
            lin = next_lin;
        }

        let report = tracker.report(&x, converged);
        debug!(
            objective = report.objective,
            violation = report.max_violation,
            evaluations = report.evaluations,
            converged,
            "sqp finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::EvalError;
    use approx::assert_relative_eq;

    /// min (x-1)^2 + (y-2)^2  s.t.  x + y <= 2
    struct Constrained {
        bounds: Bounds,
    }

    impl Problem for Constrained {
        fn bounds(&self) -> &Bounds {
            &self.bounds
        }
        fn constraint_count(&self) -> usize {
            1
        }
        fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, EvalError> {
            let f = (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
            Ok(Evaluation::new(f, vec![x[0] + x[1] - 2.0]))
        }
    }

    fn constrained() -> Constrained {
        Constrained {
            bounds: Bounds::new(vec![-5.0, -5.0], vec![5.0, 5.0]).unwrap(),
        }
    }

    #[test]
    fn solves_linear_constrained_quadratic() {
        let report = Sqp::new(SqpConfig::default())
            .minimize(&mut constrained(), &[0.0, 0.0])
            .unwrap();
        assert!(report.max_violation < 1e-5);
        assert_relative_eq!(report.x[0], 0.5, epsilon = 1e-3);
        assert_relative_eq!(report.x[1], 1.5, epsilon = 1e-3);
        assert_relative_eq!(report.objective, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn infeasible_start_recovers() {
        let report = Sqp::new(SqpConfig::default())
            .minimize(&mut constrained(), &[4.0, 4.0])
            .unwrap();
        assert!(report.is_feasible());
        assert_relative_eq!(report.objective, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn respects_bounds_at_unconstrained_optimum_outside() {
        struct Shifted(Bounds);
        impl Problem for Shifted {
            fn bounds(&self) -> &Bounds {
                &self.0
            }
            fn constraint_count(&self) -> usize {
                0
            }
            fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, EvalError> {
                assert!(self.0.contains(x));
                Ok(Evaluation::new((x[0] - 3.0).powi(2), vec![]))
            }
        }
        let mut problem = Shifted(Bounds::new(vec![-1.0], vec![1.0]).unwrap());
        let report = Sqp::new(SqpConfig::default())
            .minimize(&mut problem, &[0.0])
            .unwrap();
        assert_relative_eq!(report.x[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn failed_start_reports_without_iterating() {
        struct Nan(Bounds);
        impl Problem for Nan {
            fn bounds(&self) -> &Bounds {
                &self.0
            }
            fn constraint_count(&self) -> usize {
                0
            }
            fn evaluate(&mut self, _: &[f64]) -> Result<Evaluation, EvalError> {
                Ok(Evaluation::new(f64::NAN, vec![]))
            }
        }
        let mut problem = Nan(Bounds::new(vec![0.0], vec![1.0]).unwrap());
        let report = Sqp::new(SqpConfig::default())
            .minimize(&mut problem, &[0.5])
            .unwrap();
        assert_eq!(report.evaluations, 1);
        assert!(!report.converged);
        assert_eq!(report.objective, f64::INFINITY);
    }

    #[test]
    fn damping_keeps_hessian_positive_definite() {
        let mut h = DMatrix::<f64>::identity(2, 2);
        let s = DVector::from_vec(vec![1.0, 0.0]);
        let y = DVector::from_vec(vec![-1.0, 0.0]);
        damped_bfgs(&mut h, &s, &y);
        let eig = h.symmetric_eigenvalues();
        assert!(eig.iter().all(|&e| e > 0.0), "{eig}");
    }

    #[test]
    fn merit_penalizes_violation() {
        let eval = Evaluation::new(1.0, vec![0.5, -2.0]);
        assert_relative_eq!(merit(&eval, 4.0), 3.0);
        assert_eq!(merit(&Evaluation::new(1.0, vec![f64::NAN]), 1.0), f64::INFINITY);
    }
}
