//! The inequality constraint vector and its diagnostics.
//!
//! For `D` joints the vector has `5 * D` entries, stacked in blocks of `D`:
//!
//! | Block | Entry for joint `j` |
//! |---|---|
//! | lower position | `lower_j - min(q_j)` |
//! | upper position | `max(q_j) - upper_j` |
//! | velocity | `max|dq_j| - velocity_j` |
//! | torque | `nanmax|tau_j| - torque_j` |
//! | minimum velocity | `fraction * velocity_j - max|dq_j|` |
//!
//! An entry is satisfied when `g_k <= tolerance`. NaN never satisfies.

use std::fmt;

use excitation_core::{JointLimits, ParameterBounds, ParameterRange};
use excitation_trajectory::ParameterLayout;
use nalgebra::DMatrix;
use tracing::debug;

use crate::conditioning::nan_abs_max;
use crate::simulation::MotionData;

/// Number of constraint blocks per joint.
pub const BLOCKS: usize = 5;

// ---------------------------------------------------------------------------
// Constraint blocks
// ---------------------------------------------------------------------------

/// Which physical limit a constraint entry guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintBlock {
    LowerPosition,
    UpperPosition,
    Velocity,
    Torque,
    MinimumVelocity,
}

impl ConstraintBlock {
    pub const ALL: [Self; BLOCKS] = [
        Self::LowerPosition,
        Self::UpperPosition,
        Self::Velocity,
        Self::Torque,
        Self::MinimumVelocity,
    ];

    /// Block and joint of entry `index` in a vector for `dofs` joints.
    pub fn locate(index: usize, dofs: usize) -> Option<(Self, usize)> {
        if dofs == 0 || index >= BLOCKS * dofs {
            return None;
        }
        Some((Self::ALL[index / dofs], index % dofs))
    }

    /// Diagnostic label. Both position blocks read "position limits".
    pub const fn label(self) -> &'static str {
        match self {
            Self::LowerPosition | Self::UpperPosition => "position limits",
            Self::Velocity => "velocity limits",
            Self::Torque => "torque limits",
            Self::MinimumVelocity => "minimum velocity",
        }
    }
}

impl fmt::Display for ConstraintBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Constraint vector
// ---------------------------------------------------------------------------

/// Column-wise reduction that lets a NaN through.
fn column_fold(m: &DMatrix<f64>, j: usize, init: f64, op: fn(f64, f64) -> f64) -> f64 {
    m.column(j).iter().fold(init, |acc, &v| {
        if acc.is_nan() || v.is_nan() { f64::NAN } else { op(acc, v) }
    })
}

fn column_abs_max(m: &DMatrix<f64>, j: usize) -> f64 {
    m.column(j).iter().fold(0.0, |acc: f64, &v| {
        if acc.is_nan() || v.is_nan() { f64::NAN } else { acc.max(v.abs()) }
    })
}

/// Build `g` from simulated motion. `motion` must hold one column per limit.
pub fn constraint_vector(
    motion: &MotionData,
    limits: &[JointLimits],
    min_velocity_fraction: f64,
) -> Vec<f64> {
    let dofs = limits.len();
    let mut g = vec![0.0; BLOCKS * dofs];

    for (j, limit) in limits.iter().enumerate() {
        let q_min = column_fold(&motion.positions, j, f64::INFINITY, f64::min);
        let q_max = column_fold(&motion.positions, j, f64::NEG_INFINITY, f64::max);
        let dq_max = column_abs_max(&motion.velocities, j);
        let tau_max = nan_abs_max(motion.torques.column(j).iter()).unwrap_or(f64::INFINITY);

        g[j] = limit.lower - q_min;
        g[dofs + j] = q_max - limit.upper;
        g[2 * dofs + j] = dq_max - limit.velocity;
        g[3 * dofs + j] = tau_max - limit.torque;
        g[4 * dofs + j] = min_velocity_fraction * limit.velocity - dq_max;
    }
    g
}

/// Sum over joints of `fraction * torque_limit - nanmax|tau|` where positive.
///
/// Joints whose torque series is entirely NaN contribute nothing; the torque
/// constraint already reports them.
pub fn torque_deficit(motion: &MotionData, limits: &[JointLimits], fraction: f64) -> f64 {
    limits
        .iter()
        .enumerate()
        .filter_map(|(j, limit)| {
            nan_abs_max(motion.torques.column(j).iter()).map(|peak| fraction * limit.torque - peak)
        })
        .filter(|deficit| *deficit > 0.0)
        .sum()
}

// ---------------------------------------------------------------------------
// Constraint diagnostics
// ---------------------------------------------------------------------------

/// One violated constraint entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    pub block: ConstraintBlock,
    pub joint: usize,
    pub value: f64,
}

/// Result of [`test_constraints`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstraintReport {
    pub violations: Vec<Violation>,
}

impl ConstraintReport {
    /// Every entry within tolerance.
    pub fn is_satisfied(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violated blocks in vector order, each listed once.
    pub fn violated_blocks(&self) -> Vec<ConstraintBlock> {
        let mut blocks: Vec<ConstraintBlock> = Vec::new();
        for v in &self.violations {
            if !blocks.contains(&v.block) {
                blocks.push(v.block);
            }
        }
        blocks
    }

    /// Violated diagnostic labels, each listed once.
    pub fn violated_labels(&self) -> Vec<&'static str> {
        let mut labels: Vec<&'static str> = Vec::new();
        for block in self.violated_blocks() {
            if !labels.contains(&block.label()) {
                labels.push(block.label());
            }
        }
        labels
    }

    pub fn flags(&self, block: ConstraintBlock) -> bool {
        self.violations.iter().any(|v| v.block == block)
    }
}

/// Classify the entries of `g` exceeding `tolerance`. Only logs.
pub fn test_constraints(g: &[f64], dofs: usize, tolerance: f64) -> ConstraintReport {
    let violations: Vec<Violation> = g
        .iter()
        .enumerate()
        .filter(|(_, v)| !(**v <= tolerance))
        .filter_map(|(k, &value)| {
            ConstraintBlock::locate(k, dofs).map(|(block, joint)| Violation {
                block,
                joint,
                value,
            })
        })
        .collect();

    let report = ConstraintReport { violations };
    if !report.is_satisfied() {
        debug!(blocks = ?report.violated_labels(), count = report.violations.len(), "constraints violated");
    }
    report
}

// ---------------------------------------------------------------------------
// Bound diagnostics
// ---------------------------------------------------------------------------

/// Class of a parameter-vector component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterClass {
    Pulsation,
    Offset,
    Sine,
    Cosine,
}

impl ParameterClass {
    /// Class of component `index` under `layout`.
    pub fn of_index(layout: &ParameterLayout, index: usize) -> Option<Self> {
        if index >= layout.len() {
            return None;
        }
        let coefficients = layout.dofs * layout.harmonics;
        Some(if index == layout.pulsation_index() {
            Self::Pulsation
        } else if index < 1 + layout.dofs {
            Self::Offset
        } else if index < 1 + layout.dofs + coefficients {
            Self::Sine
        } else {
            Self::Cosine
        })
    }

    pub const fn range(self, bounds: &ParameterBounds) -> ParameterRange {
        match self {
            Self::Pulsation => bounds.pulsation,
            Self::Offset => bounds.offset,
            Self::Sine => bounds.sine,
            Self::Cosine => bounds.cosine,
        }
    }
}

impl fmt::Display for ParameterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pulsation => "pulsation",
            Self::Offset => "offset",
            Self::Sine => "sine coefficient",
            Self::Cosine => "cosine coefficient",
        })
    }
}

/// Result of [`test_bounds`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundDiagnostics {
    /// `(class, vector index, value)` of every out-of-range component.
    pub violations: Vec<(ParameterClass, usize, f64)>,
    /// The vector had the wrong length.
    pub wrong_length: bool,
}

impl BoundDiagnostics {
    pub fn is_within(&self) -> bool {
        !self.wrong_length && self.violations.is_empty()
    }

    pub fn flags(&self, class: ParameterClass) -> bool {
        self.violations.iter().any(|(c, _, _)| *c == class)
    }
}

/// Per-component bound check of a parameter vector. Only logs.
pub fn test_bounds(x: &[f64], layout: &ParameterLayout, bounds: &ParameterBounds) -> BoundDiagnostics {
    if x.len() != layout.len() {
        debug!(expected = layout.len(), got = x.len(), "parameter vector has wrong length");
        return BoundDiagnostics {
            violations: Vec::new(),
            wrong_length: true,
        };
    }

    let violations: Vec<(ParameterClass, usize, f64)> = x
        .iter()
        .enumerate()
        .filter_map(|(k, &value)| {
            let class = ParameterClass::of_index(layout, k)?;
            (!class.range(bounds).contains(value)).then_some((class, k, value))
        })
        .collect();

    for (class, index, value) in &violations {
        debug!(%class, index, value, "parameter out of bounds");
    }
    BoundDiagnostics {
        violations,
        wrong_length: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn limits() -> Vec<JointLimits> {
        vec![
            JointLimits::new("j0", -1.0, 1.0, 2.0, 10.0),
            JointLimits::new("j1", -2.0, 2.0, 4.0, 20.0),
        ]
    }

    fn motion() -> MotionData {
        MotionData::new(
            DMatrix::from_row_slice(3, 2, &[-0.5, 0.0, 0.2, 1.0, 0.8, -1.5]),
            DMatrix::from_row_slice(3, 2, &[1.0, -3.0, -1.5, 0.5, 0.1, 2.0]),
            DMatrix::from_row_slice(3, 2, &[4.0, f64::NAN, -6.0, 12.0, 0.5, -1.0]),
        )
    }

    #[test]
    fn vector_layout_and_values() {
        let g = constraint_vector(&motion(), &limits(), 0.25);
        assert_eq!(g.len(), 10);
        // lower position
        assert_relative_eq!(g[0], -1.0 - (-0.5));
        assert_relative_eq!(g[1], -2.0 - (-1.5));
        // upper position
        assert_relative_eq!(g[2], 0.8 - 1.0);
        assert_relative_eq!(g[3], 1.0 - 2.0);
        // velocity
        assert_relative_eq!(g[4], 1.5 - 2.0);
        assert_relative_eq!(g[5], 3.0 - 4.0);
        // torque, NaN ignored
        assert_relative_eq!(g[6], 6.0 - 10.0);
        assert_relative_eq!(g[7], 12.0 - 20.0);
        // minimum velocity
        assert_relative_eq!(g[8], 0.5 - 1.5);
        assert_relative_eq!(g[9], 1.0 - 3.0);
    }

    #[test]
    fn all_nan_torque_is_violated() {
        let mut m = motion();
        m.torques.column_mut(0).fill(f64::NAN);
        let g = constraint_vector(&m, &limits(), 0.25);
        assert_eq!(g[6], f64::INFINITY);
        assert!(!test_constraints(&g, 2, 1e-6).is_satisfied());
    }

    #[test]
    fn nan_velocity_propagates_to_violation() {
        let mut m = motion();
        m.velocities[(1, 0)] = f64::NAN;
        let g = constraint_vector(&m, &limits(), 0.25);
        assert!(g[4].is_nan());
        let report = test_constraints(&g, 2, 1e-6);
        assert!(report.flags(ConstraintBlock::Velocity));
    }

    #[test]
    fn torque_block_violation_is_classified() {
        let mut g = vec![-1.0; 10];
        g[7] = 0.5;
        let report = test_constraints(&g, 2, 1e-6);
        assert!(!report.is_satisfied());
        assert_eq!(report.violated_blocks(), vec![ConstraintBlock::Torque]);
        assert_eq!(report.violated_labels(), vec!["torque limits"]);
        assert_eq!(report.violations[0].joint, 1);
    }

    #[test]
    fn tolerance_is_inclusive() {
        let g = vec![1e-6; 5];
        assert!(test_constraints(&g, 1, 1e-6).is_satisfied());
        let g = vec![-1.0, -1.0, -1.0, -1.0, 2e-6];
        let report = test_constraints(&g, 1, 1e-6);
        assert_eq!(report.violated_labels(), vec!["minimum velocity"]);
    }

    #[test]
    fn both_position_blocks_share_a_label() {
        let g = vec![0.1, 0.1, -1.0, -1.0, -1.0];
        let report = test_constraints(&g, 1, 0.0);
        assert_eq!(report.violated_blocks().len(), 2);
        assert_eq!(report.violated_labels(), vec!["position limits"]);
    }

    #[test]
    fn locate_entries() {
        assert_eq!(ConstraintBlock::locate(0, 3), Some((ConstraintBlock::LowerPosition, 0)));
        assert_eq!(ConstraintBlock::locate(10, 3), Some((ConstraintBlock::Torque, 1)));
        assert_eq!(ConstraintBlock::locate(14, 3), Some((ConstraintBlock::MinimumVelocity, 2)));
        assert_eq!(ConstraintBlock::locate(15, 3), None);
        assert_eq!(ConstraintBlock::locate(0, 0), None);
    }

    #[test]
    fn deficit_counts_weak_joints_only() {
        // peaks: j0 = 6, j1 = 12; 0.5 * limits = 5, 10 -> no deficit
        assert_eq!(torque_deficit(&motion(), &limits(), 0.5), 0.0);
        // 0.8 * limits = 8, 16 -> 2 + 4
        assert_relative_eq!(torque_deficit(&motion(), &limits(), 0.8), 6.0);
    }

    #[test]
    fn bound_classes_follow_layout() {
        let layout = ParameterLayout::new(2, 3);
        assert_eq!(layout.len(), 15);
        assert_eq!(ParameterClass::of_index(&layout, 0), Some(ParameterClass::Pulsation));
        assert_eq!(ParameterClass::of_index(&layout, 2), Some(ParameterClass::Offset));
        assert_eq!(ParameterClass::of_index(&layout, 3), Some(ParameterClass::Sine));
        assert_eq!(ParameterClass::of_index(&layout, 8), Some(ParameterClass::Sine));
        assert_eq!(ParameterClass::of_index(&layout, 9), Some(ParameterClass::Cosine));
        assert_eq!(ParameterClass::of_index(&layout, 15), None);
    }

    #[test]
    fn bound_diagnostics() {
        let layout = ParameterLayout::new(1, 1);
        let bounds = ParameterBounds::default();
        assert!(test_bounds(&[1.0, 0.0, 0.5, 0.5], &layout, &bounds).is_within());

        let diag = test_bounds(&[5.0, 0.0, 0.5, -2.0], &layout, &bounds);
        assert!(!diag.is_within());
        assert!(diag.flags(ParameterClass::Pulsation));
        assert!(diag.flags(ParameterClass::Cosine));
        assert!(!diag.flags(ParameterClass::Sine));

        assert!(test_bounds(&[1.0], &layout, &bounds).wrong_length);
    }
}
