//! Fourier trajectory parameters and their flat vector encoding.

use excitation_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Full parameter set of a multi-DOF Fourier trajectory.
///
/// Offsets are radians. `sine[i]` and `cosine[i]` hold `harmonics[i]`
/// coefficients each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourierParams {
    /// Global pulsation `w_f` (rad/s), shared by all DOFs.
    pub pulsation: f64,
    /// Per-DOF offset `q0` (rad).
    pub offsets: Vec<f64>,
    /// Per-DOF sine amplitudes `a`.
    pub sine: Vec<Vec<f64>>,
    /// Per-DOF cosine amplitudes `b`.
    pub cosine: Vec<Vec<f64>>,
    /// Per-DOF harmonic count `nf`.
    pub harmonics: Vec<usize>,
}

impl FourierParams {
    /// Parameters with the same harmonic count for every DOF.
    pub fn uniform(
        pulsation: f64,
        offsets: Vec<f64>,
        sine: Vec<Vec<f64>>,
        cosine: Vec<Vec<f64>>,
        harmonics: usize,
    ) -> Self {
        let dofs = offsets.len();
        Self {
            pulsation,
            offsets,
            sine,
            cosine,
            harmonics: vec![harmonics; dofs],
        }
    }

    pub fn dofs(&self) -> usize {
        self.offsets.len()
    }

    /// Check the shape invariants: every per-DOF list has `dofs` entries and
    /// every coefficient row has `nf[i]` entries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dofs = self.dofs();
        if self.harmonics.len() != dofs {
            return Err(ConfigError::dimension("nf", dofs, self.harmonics.len()));
        }
        if self.sine.len() != dofs {
            return Err(ConfigError::dimension("a", dofs, self.sine.len()));
        }
        if self.cosine.len() != dofs {
            return Err(ConfigError::dimension("b", dofs, self.cosine.len()));
        }
        for (i, &nf) in self.harmonics.iter().enumerate() {
            if nf == 0 {
                return Err(ConfigError::invalid(format!("nf[{i}]"), "must be >= 1"));
            }
            if self.sine[i].len() != nf {
                return Err(ConfigError::dimension(format!("a[{i}]"), nf, self.sine[i].len()));
            }
            if self.cosine[i].len() != nf {
                return Err(ConfigError::dimension(format!("b[{i}]"), nf, self.cosine[i].len()));
            }
        }
        if !(self.pulsation > 0.0) || !self.pulsation.is_finite() {
            return Err(ConfigError::invalid("w_f", "must be finite and > 0"));
        }
        Ok(())
    }
}

/// Layout of the flat parameter vector exchanged with solver backends:
///
/// ```text
/// [w_f, q0_0 .. q0_{D-1}, a_{0,0} .. a_{D-1,nf-1}, b_{0,0} .. b_{D-1,nf-1}]
/// ```
///
/// Coefficients are stored DOF-major: all harmonics of DOF 0, then DOF 1, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterLayout {
    pub dofs: usize,
    pub harmonics: usize,
}

impl ParameterLayout {
    pub const fn new(dofs: usize, harmonics: usize) -> Self {
        Self { dofs, harmonics }
    }

    /// Vector length: `1 + D + 2 * D * nf`.
    pub const fn len(&self) -> usize {
        1 + self.dofs + 2 * self.dofs * self.harmonics
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn pulsation_index(&self) -> usize {
        0
    }

    pub const fn offset_index(&self, dof: usize) -> usize {
        1 + dof
    }

    pub const fn sine_index(&self, dof: usize, harmonic: usize) -> usize {
        1 + self.dofs + dof * self.harmonics + harmonic
    }

    pub const fn cosine_index(&self, dof: usize, harmonic: usize) -> usize {
        1 + self.dofs + self.dofs * self.harmonics + dof * self.harmonics + harmonic
    }

    /// Flatten parameters into a vector.
    pub fn encode(&self, params: &FourierParams) -> Result<Vec<f64>, ConfigError> {
        params.validate()?;
        if params.dofs() != self.dofs {
            return Err(ConfigError::dimension("dofs", self.dofs, params.dofs()));
        }
        if let Some(&nf) = params.harmonics.iter().find(|&&nf| nf != self.harmonics) {
            return Err(ConfigError::dimension("nf", self.harmonics, nf));
        }

        let mut x = Vec::with_capacity(self.len());
        x.push(params.pulsation);
        x.extend_from_slice(&params.offsets);
        x.extend(params.sine.iter().flatten());
        x.extend(params.cosine.iter().flatten());
        Ok(x)
    }

    /// Split a vector into `(w_f, q, a, b)`, reshaping `a` and `b` into `D`
    /// rows of `nf` columns.
    pub fn decode(&self, x: &[f64]) -> Result<FourierParams, ConfigError> {
        if self.harmonics == 0 {
            return Err(ConfigError::invalid("nf", "must be >= 1"));
        }
        if x.len() != self.len() {
            return Err(ConfigError::dimension("parameter vector", self.len(), x.len()));
        }
        let (nf, dofs) = (self.harmonics, self.dofs);
        let coefficient_rows = |start: usize| -> Vec<Vec<f64>> {
            x[start..start + dofs * nf]
                .chunks(nf)
                .map(<[f64]>::to_vec)
                .collect()
        };

        Ok(FourierParams::uniform(
            x[0],
            x[1..=dofs].to_vec(),
            coefficient_rows(self.sine_index(0, 0)),
            coefficient_rows(self.cosine_index(0, 0)),
            nf,
        ))
    }
}
