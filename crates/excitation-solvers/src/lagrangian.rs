//! Augmented-Lagrangian scoring shared by the derivative-free backends.

use crate::problem::Evaluation;

const MIN_PENALTY: f64 = 1e-3;

/// Multipliers and penalty weights of `L(x) = f + sum(l*t + r*t^2)`,
/// with `t = max(g, -l / (2r))`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Multipliers {
    lambda: Vec<f64>,
    penalty: Vec<f64>,
    growth: f64,
}

impl Multipliers {
    pub(crate) fn new(constraints: usize, initial_penalty: f64, growth: f64) -> Self {
        Self {
            lambda: vec![0.0; constraints],
            penalty: vec![initial_penalty.max(MIN_PENALTY); constraints],
            growth: growth.max(1.0),
        }
    }

    /// Augmented Lagrangian of an evaluation.
    ///
    /// `+inf` if the evaluation failed or any constraint is NaN, so such a
    /// point never ranks ahead of a scored one.
    pub(crate) fn value(&self, eval: &Evaluation) -> f64 {
        if eval.failed || eval.constraints.iter().any(|g| g.is_nan()) {
            return f64::INFINITY;
        }
        let mut value = eval.objective;
        for ((&g, &l), &r) in eval.constraints.iter().zip(&self.lambda).zip(&self.penalty) {
            let t = g.max(-l / (2.0 * r));
            value += l * t + r * t * t;
        }
        if value.is_nan() { f64::INFINITY } else { value }
    }

    /// First-order multiplier update at `constraints`; penalties grow on
    /// violated entries and relax on satisfied ones.
    pub(crate) fn update(&mut self, constraints: &[f64]) {
        for ((&g, l), r) in constraints
            .iter()
            .zip(self.lambda.iter_mut())
            .zip(self.penalty.iter_mut())
        {
            // NaN counts as violated but carries no multiplier information.
            if !g.is_nan() {
                let t = g.max(-*l / (2.0 * *r));
                let next = *l + 2.0 * *r * t;
                if next.is_finite() {
                    *l = next;
                }
            }
            if g.is_nan() || g > 0.0 {
                *r *= self.growth;
            } else {
                *r = (*r / self.growth).max(MIN_PENALTY);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn lambda(&self) -> &[f64] {
        &self.lambda
    }

    #[cfg(test)]
    pub(crate) fn penalty(&self) -> &[f64] {
        &self.penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn satisfied_constraints_cost_nothing_initially() {
        let m = Multipliers::new(2, 10.0, 2.0);
        let eval = Evaluation::new(3.0, vec![-1.0, -0.5]);
        assert_relative_eq!(m.value(&eval), 3.0);
    }

    #[test]
    fn violation_is_penalized_quadratically() {
        let m = Multipliers::new(1, 10.0, 2.0);
        let eval = Evaluation::new(1.0, vec![0.5]);
        assert_relative_eq!(m.value(&eval), 1.0 + 10.0 * 0.25);
    }

    #[test]
    fn failed_and_nan_score_infinite() {
        let m = Multipliers::new(1, 10.0, 2.0);
        assert_eq!(m.value(&Evaluation::new(f64::NAN, vec![0.0])), f64::INFINITY);
        assert_eq!(m.value(&Evaluation::new(1.0, vec![f64::NAN])), f64::INFINITY);
        assert_eq!(
            m.value(&Evaluation::new(1.0, vec![-1.0, f64::NAN])),
            f64::INFINITY
        );
    }

    #[test]
    fn nan_score_ranks_after_finite_scores() {
        let m = Multipliers::new(1, 10.0, 2.0);
        let nan = m.value(&Evaluation::new(1.0, vec![f64::NAN]));
        let finite = m.value(&Evaluation::new(5.0, vec![-1.0]));
        assert!(!nan.is_sign_negative());
        assert!(finite.total_cmp(&nan).is_lt());
    }

    #[test]
    fn nan_constraint_grows_penalty_and_keeps_multiplier() {
        let mut m = Multipliers::new(2, 10.0, 2.0);
        m.update(&[f64::NAN, 0.5]);
        assert_relative_eq!(m.lambda()[0], 0.0);
        assert_relative_eq!(m.penalty()[0], 20.0);
        assert_relative_eq!(m.lambda()[1], 10.0);

        // a later finite value still updates the multiplier
        m.update(&[0.5, -1.0]);
        assert_relative_eq!(m.lambda()[0], 20.0);
        assert!(m.lambda().iter().all(|l| l.is_finite()));
    }

    #[test]
    fn update_grows_multiplier_and_penalty_on_violation() {
        let mut m = Multipliers::new(2, 10.0, 2.0);
        m.update(&[0.5, -1.0]);
        assert_relative_eq!(m.lambda()[0], 10.0);
        assert_relative_eq!(m.lambda()[1], 0.0);
        assert_relative_eq!(m.penalty()[0], 20.0);
        assert_relative_eq!(m.penalty()[1], 5.0);
    }

    #[test]
    fn multipliers_stay_non_negative() {
        let mut m = Multipliers::new(1, 1.0, 2.0);
        m.update(&[1.0]);
        m.update(&[-100.0]);
        assert!(m.lambda()[0] >= 0.0);
    }
}
