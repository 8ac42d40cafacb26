//! Evaluation bookkeeping shared by the backends.

use crate::error::SolverError;
use crate::problem::{Evaluation, Problem, SolveReport};

/// Wraps a problem, counts evaluations and remembers the best point.
///
/// "Best" is feasible-first: any feasible point beats any infeasible one,
/// feasible points compare by objective, infeasible ones by violation.
pub(crate) struct Tracker<'a> {
    problem: &'a mut dyn Problem,
    evaluations: usize,
    best: Option<(Vec<f64>, Evaluation)>,
}

impl<'a> Tracker<'a> {
    /// Wrap `problem`, checking that `initial` has the right dimension.
    pub(crate) fn new(problem: &'a mut dyn Problem, initial: &[f64]) -> Result<Self, SolverError> {
        let dim = problem.dim();
        if initial.len() != dim {
            return Err(SolverError::DimensionMismatch {
                expected: dim,
                got: initial.len(),
            });
        }
        Ok(Self {
            problem,
            evaluations: 0,
            best: None,
        })
    }

    pub(crate) fn problem(&self) -> &dyn Problem {
        &*self.problem
    }

    pub(crate) fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, SolverError> {
        let eval = self
            .problem
            .evaluate(x)
            .map_err(SolverError::Evaluation)?;
        self.evaluations += 1;

        let improves = self
            .best
            .as_ref()
            .is_none_or(|(_, best)| is_better(&eval, best));
        if improves {
            self.best = Some((x.to_vec(), eval.clone()));
        }
        Ok(eval)
    }

    pub(crate) const fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Build the report from the best point seen, or `fallback` if nothing
    /// was evaluated.
    pub(crate) fn report(self, fallback: &[f64], converged: bool) -> SolveReport {
        match self.best {
            Some((x, eval)) => SolveReport {
                max_violation: eval.max_violation(),
                objective: if eval.failed { f64::INFINITY } else { eval.objective },
                x,
                evaluations: self.evaluations,
                converged,
            },
            None => SolveReport {
                x: fallback.to_vec(),
                objective: f64::INFINITY,
                max_violation: f64::INFINITY,
                evaluations: self.evaluations,
                converged: false,
            },
        }
    }
}

/// Feasible-first ordering between two evaluations.
pub(crate) fn is_better(candidate: &Evaluation, incumbent: &Evaluation) -> bool {
    if candidate.failed {
        return false;
    }
    if incumbent.failed {
        return true;
    }
    match (candidate.is_feasible(), incumbent.is_feasible()) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => candidate.objective < incumbent.objective,
        (false, false) => candidate.max_violation() < incumbent.max_violation(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feasible_beats_infeasible() {
        let feasible = Evaluation::new(100.0, vec![-1.0]);
        let infeasible = Evaluation::new(1.0, vec![0.5]);
        assert!(is_better(&feasible, &infeasible));
        assert!(!is_better(&infeasible, &feasible));
    }

    #[test]
    fn feasible_compare_by_objective() {
        let a = Evaluation::new(1.0, vec![-1.0]);
        let b = Evaluation::new(2.0, vec![-1.0]);
        assert!(is_better(&a, &b));
        assert!(!is_better(&b, &a));
    }

    #[test]
    fn infeasible_compare_by_violation() {
        let a = Evaluation::new(10.0, vec![0.1]);
        let b = Evaluation::new(1.0, vec![0.3]);
        assert!(is_better(&a, &b));
    }

    #[test]
    fn failed_never_better() {
        let failed = Evaluation::new(f64::NAN, vec![-1.0]);
        let ok = Evaluation::new(5.0, vec![1.0]);
        assert!(!is_better(&failed, &ok));
        assert!(is_better(&ok, &failed));
    }
}
