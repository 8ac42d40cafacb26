//! Dense inequality-constrained QP subproblems on top of Clarabel.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT::NonnegativeConeT,
};
use nalgebra::DMatrix;
use tracing::debug;

use crate::error::SolverError;

/// Primal and dual solution of a QP.
#[derive(Debug, Clone)]
pub(crate) struct QpStep {
    pub(crate) x: Vec<f64>,
    /// Multipliers of the `A x <= b` rows, all `>= 0`.
    pub(crate) z: Vec<f64>,
}

/// Solve `min 0.5 x'Px + q'x  s.t.  A x <= b`.
///
/// `P` must be symmetric. Returns `Ok(None)` when Clarabel does not reach a
/// (nearly) optimal point, e.g. on an infeasible subproblem.
pub(crate) fn solve_inequality_qp(
    p: &DMatrix<f64>,
    q: &[f64],
    a: &DMatrix<f64>,
    b: &[f64],
    max_iter: u32,
) -> Result<Option<QpStep>, SolverError> {
    let n = p.ncols();
    if p.nrows() != n || q.len() != n || a.ncols() != n || a.nrows() != b.len() {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let p_csc = to_csc(p, Pattern::UpperTriangle);
    let a_csc = to_csc(a, Pattern::Full);
    let cones = vec![NonnegativeConeT(b.len())];

    let settings = DefaultSettingsBuilder::default()
        .max_iter(max_iter)
        .verbose(false)
        .build()
        .map_err(|e| SolverError::InvalidConfig(format!("qp settings: {e:?}")))?;

    let mut solver = match DefaultSolver::new(&p_csc, q, &a_csc, b, &cones, settings) {
        Ok(solver) => solver,
        Err(e) => {
            debug!(error = ?e, "QP setup rejected");
            return Ok(None);
        }
    };
    solver.solve();
    let sol = &solver.solution;

    if matches!(sol.status, SolverStatus::Solved | SolverStatus::AlmostSolved) {
        Ok(Some(QpStep {
            x: sol.x.clone(),
            z: sol.z.clone(),
        }))
    } else {
        debug!(status = ?sol.status, "QP subproblem not solved");
        Ok(None)
    }
}

/// Minimum magnitude kept when converting to CSC.
const SPARSITY_EPS: f64 = 1e-15;

/// Which rows of a column enter the sparse matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Full,
    /// Rows `0..=j` of column `j`, for Clarabel's symmetric `P`.
    UpperTriangle,
}

/// Dense to CSC, column by column, skipping near-zero entries.
fn to_csc(m: &DMatrix<f64>, pattern: Pattern) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = Vec::with_capacity(ncols + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    colptr.push(0);

    for (j, column) in m.column_iter().enumerate() {
        let rows = match pattern {
            Pattern::Full => nrows,
            Pattern::UpperTriangle => (j + 1).min(nrows),
        };
        for (i, &v) in column.iter().take(rows).enumerate() {
            if v.abs() > SPARSITY_EPS {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr.push(rowval.len());
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}
