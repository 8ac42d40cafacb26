//! Regressor conditioning and NaN-tolerant reductions.

use nalgebra::{DMatrix, SVD};

const SVD_MAX_ITERATIONS: usize = 10_000;

/// 2-norm condition number `sigma_max / sigma_min`.
///
/// Any non-finite entry, an empty matrix, a rank-deficient matrix or an SVD
/// that fails to converge yields `+inf`.
pub fn condition_number(matrix: &DMatrix<f64>) -> f64 {
    if matrix.is_empty() || matrix.iter().any(|v| !v.is_finite()) {
        return f64::INFINITY;
    }
    let Some(svd) = SVD::try_new(matrix.clone(), false, false, f64::EPSILON, SVD_MAX_ITERATIONS)
    else {
        return f64::INFINITY;
    };
    let sigma = &svd.singular_values;
    let max = sigma.max();
    let min = sigma.min();
    if min <= 0.0 {
        f64::INFINITY
    } else {
        max / min
    }
}

/// Largest absolute value, ignoring NaNs. `None` if every value is NaN (or
/// there are none).
pub fn nan_abs_max<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<f64> {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .map(|v| v.abs())
        .reduce(f64::max)
}
