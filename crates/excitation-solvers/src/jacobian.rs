//! Forward-difference derivatives of black-box functions.
//!
//! Works for any `FnMut(&[f64]) -> Result<DVector<f64>, E>` (or the scalar
//! form), independent of which solver asks for the derivative.

use nalgebra::{DMatrix, DVector};

use crate::problem::Bounds;

/// Forward-difference settings.
///
/// Component `i` is perturbed by `step * max(1, |x_i|)`. When [`Bounds`]
/// are given and the forward point would leave the box, the difference is
/// taken backwards instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiniteDifference {
    pub step: f64,
}

impl Default for FiniteDifference {
    fn default() -> Self {
        Self { step: 1e-6 }
    }
}

impl FiniteDifference {
    pub const fn new(step: f64) -> Self {
        Self { step }
    }

    fn perturbation(&self, x: &[f64], i: usize, bounds: Option<&Bounds>) -> f64 {
        let h = self.step * x[i].abs().max(1.0);
        match bounds {
            Some(b) if x[i] + h > b.upper()[i] && x[i] - h >= b.lower()[i] => -h,
            _ => h,
        }
    }

    /// Jacobian of `f` at `x` (rows: outputs, cols: inputs), given `fx = f(x)`.
    pub fn jacobian<F, E>(
        &self,
        f: F,
        x: &[f64],
        fx: &DVector<f64>,
        bounds: Option<&Bounds>,
    ) -> Result<DMatrix<f64>, E>
    where
        F: FnMut(&[f64]) -> Result<DVector<f64>, E>,
    {
        let mut f = f;
        let mut jac = DMatrix::zeros(fx.len(), x.len());
        let mut probe = x.to_vec();
        for i in 0..x.len() {
            let h = self.perturbation(x, i, bounds);
            probe[i] = x[i] + h;
            let fp = f(&probe)?;
            probe[i] = x[i];
            let column = (fp - fx) / h;
            jac.set_column(i, &column);
        }
        Ok(jac)
    }

    /// Gradient of a scalar `f` at `x`, given `fx = f(x)`.
    pub fn gradient<F, E>(
        &self,
        mut f: F,
        x: &[f64],
        fx: f64,
        bounds: Option<&Bounds>,
    ) -> Result<DVector<f64>, E>
    where
        F: FnMut(&[f64]) -> Result<f64, E>,
    {
        let jac = self.jacobian(
            |p| f(p).map(|v| DVector::from_element(1, v)),
            x,
            &DVector::from_element(1, fx),
            bounds,
        )?;
        Ok(jac.row(0).transpose())
    }
}

/// Forward-difference Jacobian of `f` at `x` with perturbation `step`.
pub fn numerical_jacobian<F, E>(mut f: F, x: &[f64], step: f64) -> Result<DMatrix<f64>, E>
where
    F: FnMut(&[f64]) -> Result<DVector<f64>, E>,
{
    let fx = f(x)?;
    FiniteDifference::new(step).jacobian(f, x, &fx, None)
}

/// Forward-difference gradient of a scalar `f` at `x` with perturbation `step`.
pub fn numerical_gradient<F, E>(mut f: F, x: &[f64], step: f64) -> Result<DVector<f64>, E>
where
    F: FnMut(&[f64]) -> Result<f64, E>,
{
    let fx = f(x)?;
    FiniteDifference::new(step).gradient(f, x, fx, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::convert::Infallible;

    #[test]
    fn gradient_of_quadratic() {
        let f = |x: &[f64]| -> Result<f64, Infallible> { Ok(x[0] * x[0] + 3.0 * x[1]) };
        let g = numerical_gradient(f, &[2.0, -1.0], 1e-7).unwrap();
        assert_relative_eq!(g[0], 4.0, epsilon = 1e-4);
        assert_relative_eq!(g[1], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn jacobian_of_vector_function() {
        let f = |x: &[f64]| -> Result<DVector<f64>, Infallible> {
            Ok(DVector::from_vec(vec![x[0] * x[1], x[0].sin(), x[1]]))
        };
        let jac = numerical_jacobian(f, &[0.5, 2.0], 1e-7).unwrap();
        assert_eq!(jac.shape(), (3, 2));
        assert_relative_eq!(jac[(0, 0)], 2.0, epsilon = 1e-5);
        assert_relative_eq!(jac[(0, 1)], 0.5, epsilon = 1e-5);
        assert_relative_eq!(jac[(1, 0)], 0.5_f64.cos(), epsilon = 1e-5);
        assert_relative_eq!(jac[(1, 1)], 0.0, epsilon = 1e-9);
        assert_relative_eq!(jac[(2, 1)], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn backward_difference_at_upper_bound() {
        let bounds = Bounds::new(vec![0.0], vec![1.0]).unwrap();
        let mut probes = Vec::new();
        let f = |x: &[f64]| -> Result<f64, Infallible> {
            probes.push(x[0]);
            Ok(x[0] * x[0])
        };
        let g = FiniteDifference::new(1e-6)
            .gradient(f, &[1.0], 1.0, Some(&bounds))
            .unwrap();
        assert!(probes.iter().all(|&p| p <= 1.0));
        assert_relative_eq!(g[0], 2.0, epsilon = 1e-4);
    }

    #[test]
    fn errors_propagate() {
        let f = |_: &[f64]| -> Result<f64, &'static str> { Err("boom") };
        assert_eq!(numerical_gradient(f, &[0.0], 1e-6).unwrap_err(), "boom");
    }
}
