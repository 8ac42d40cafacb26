//! Single-joint Fourier oscillation.
//!
//! The velocity of one joint is the truncated series
//!
//! ```text
//! dq(t) = Σ_{l=1..nf}  a_l cos(w_f l t) + b_l sin(w_f l t)
//! ```
//!
//! Position is its time integral plus an offset term `nf * q0`, acceleration
//! its time derivative. All three are closed form, so `dq` is the exact
//! derivative of `q` and `ddq` the exact derivative of `dq`.

use excitation_core::{AngleUnit, ConfigError};

/// Periodic oscillation of one joint from Fourier coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct OscillationGenerator {
    pulsation: f64,
    sine: Vec<f64>,
    cosine: Vec<f64>,
    /// Offset (center of oscillation), always radians.
    offset: f64,
    harmonics: usize,
    unit: AngleUnit,
}

impl OscillationGenerator {
    /// Create an oscillation.
    ///
    /// - `pulsation` is the base pulsation `w_f` (frequency is `w_f / 2π`)
    /// - `sine`/`cosine` are the `a`/`b` amplitudes, one per harmonic
    /// - `offset` is `q0`, given in `unit`; it is stored in radians
    /// - `harmonics` is `nf`, the number of series terms
    pub fn new(
        pulsation: f64,
        sine: Vec<f64>,
        cosine: Vec<f64>,
        offset: f64,
        harmonics: usize,
        unit: AngleUnit,
    ) -> Result<Self, ConfigError> {
        if !(pulsation > 0.0) || !pulsation.is_finite() {
            return Err(ConfigError::invalid("w_f", format!("must be finite and > 0, got {pulsation}")));
        }
        if harmonics == 0 {
            return Err(ConfigError::invalid("nf", "must be >= 1"));
        }
        if sine.len() != harmonics {
            return Err(ConfigError::dimension("a", harmonics, sine.len()));
        }
        if cosine.len() != harmonics {
            return Err(ConfigError::dimension("b", harmonics, cosine.len()));
        }
        Ok(Self::from_checked(pulsation, sine, cosine, unit.to_radians(offset), harmonics, unit))
    }

    /// Assemble an oscillation whose arguments already satisfy [`new`](Self::new):
    /// finite `pulsation > 0`, `harmonics >= 1`, and `sine`/`cosine` of
    /// length `harmonics`. `offset` is in radians.
    pub(crate) fn from_checked(
        pulsation: f64,
        sine: Vec<f64>,
        cosine: Vec<f64>,
        offset: f64,
        harmonics: usize,
        unit: AngleUnit,
    ) -> Self {
        debug_assert!(pulsation > 0.0 && pulsation.is_finite());
        debug_assert!(harmonics >= 1 && sine.len() == harmonics && cosine.len() == harmonics);
        Self {
            pulsation,
            sine,
            cosine,
            offset,
            harmonics,
            unit,
        }
    }

    /// Joint angle at time `t` (seconds), in the output unit.
    pub fn angle(&self, t: f64) -> f64 {
        let q: f64 = self
            .terms()
            .map(|(wl, a, b)| (a / wl) * (wl * t).sin() - (b / wl) * (wl * t).cos())
            .sum();
        self.unit
            .from_radians(q + self.harmonics as f64 * self.offset)
    }

    /// Joint velocity at time `t`, in the output unit per second.
    pub fn velocity(&self, t: f64) -> f64 {
        let dq: f64 = self
            .terms()
            .map(|(wl, a, b)| a * (wl * t).cos() + b * (wl * t).sin())
            .sum();
        self.unit.from_radians(dq)
    }

    /// Joint acceleration at time `t`, in the output unit per second squared.
    pub fn acceleration(&self, t: f64) -> f64 {
        let ddq: f64 = self
            .terms()
            .map(|(wl, a, b)| -a * wl * (wl * t).sin() + b * wl * (wl * t).cos())
            .sum();
        self.unit.from_radians(ddq)
    }

    /// `(w_f * l, a_l, b_l)` for `l = 1..=nf`.
    fn terms(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.sine
            .iter()
            .zip(&self.cosine)
            .enumerate()
            .map(|(i, (&a, &b))| (self.pulsation * (i + 1) as f64, a, b))
    }

    pub const fn pulsation(&self) -> f64 {
        self.pulsation
    }

    pub fn sine(&self) -> &[f64] {
        &self.sine
    }

    pub fn cosine(&self) -> &[f64] {
        &self.cosine
    }

    /// Offset `q0` in radians.
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    pub const fn harmonics(&self) -> usize {
        self.harmonics
    }

    pub const fn unit(&self) -> AngleUnit {
        self.unit
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn three_harmonic(unit: AngleUnit) -> OscillationGenerator {
        OscillationGenerator::new(
            1.3,
            vec![0.4, -0.2, 0.1],
            vec![-0.3, 0.25, 0.05],
            0.2,
            3,
            unit,
        )
        .unwrap()
    }

    #[test]
    fn single_harmonic_scenario() {
        let osc =
            OscillationGenerator::new(1.0, vec![1.0], vec![0.0], 0.0, 1, AngleUnit::Radians).unwrap();
        assert_relative_eq!(osc.angle(0.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(osc.velocity(0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(osc.acceleration(0.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(osc.angle(FRAC_PI_2), 1.0, epsilon = 1e-12);
        assert_relative_eq!(osc.velocity(FRAC_PI_2), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn velocity_is_derivative_of_angle() {
        let osc = three_harmonic(AngleUnit::Radians);
        let h = 1e-6;
        for k in 0..50 {
            let t = f64::from(k) * 0.37 - 3.0;
            let numeric = (osc.angle(t + h) - osc.angle(t - h)) / (2.0 * h);
            assert_relative_eq!(osc.velocity(t), numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn acceleration_is_derivative_of_velocity() {
        let osc = three_harmonic(AngleUnit::Radians);
        let h = 1e-6;
        for k in 0..50 {
            let t = f64::from(k) * 0.37 - 3.0;
            let numeric = (osc.velocity(t + h) - osc.velocity(t - h)) / (2.0 * h);
            assert_relative_eq!(osc.acceleration(t), numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn derivatives_hold_in_degrees() {
        let osc = three_harmonic(AngleUnit::Degrees);
        let h = 1e-6;
        let t = 0.8;
        let numeric = (osc.angle(t + h) - osc.angle(t - h)) / (2.0 * h);
        assert_relative_eq!(osc.velocity(t), numeric, epsilon = 1e-4);
    }

    #[test]
    fn offset_normalized_to_radians() {
        let osc =
            OscillationGenerator::new(1.0, vec![0.0], vec![0.0], 90.0, 1, AngleUnit::Degrees).unwrap();
        assert_relative_eq!(osc.offset(), FRAC_PI_2, epsilon = 1e-12);
        // zero coefficients: angle is just nf * q0, back in degrees
        assert_relative_eq!(osc.angle(3.0), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn offset_scales_with_harmonics() {
        let osc = OscillationGenerator::new(
            2.0,
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            0.1,
            2,
            AngleUnit::Radians,
        )
        .unwrap();
        assert_relative_eq!(osc.angle(0.5), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn degrees_output_matches_radians() {
        let rad = three_harmonic(AngleUnit::Radians);
        let deg = OscillationGenerator::new(
            1.3,
            vec![0.4, -0.2, 0.1],
            vec![-0.3, 0.25, 0.05],
            0.2_f64.to_degrees(),
            3,
            AngleUnit::Degrees,
        )
        .unwrap();
        let t = 1.7;
        assert_relative_eq!(deg.angle(t), rad.angle(t).to_degrees(), epsilon = 1e-9);
        assert_relative_eq!(deg.velocity(t), rad.velocity(t).to_degrees(), epsilon = 1e-9);
        assert_relative_eq!(
            deg.acceleration(t),
            rad.acceleration(t).to_degrees(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn periodic_in_base_period() {
        let osc = three_harmonic(AngleUnit::Radians);
        let period = 2.0 * PI / osc.pulsation();
        assert_relative_eq!(osc.angle(0.4), osc.angle(0.4 + period), epsilon = 1e-9);
        assert_relative_eq!(osc.velocity(0.4), osc.velocity(0.4 + period), epsilon = 1e-9);
    }

    #[test]
    fn rejects_mismatched_coefficients() {
        let err =
            OscillationGenerator::new(1.0, vec![1.0, 2.0], vec![0.0], 0.0, 2, AngleUnit::Radians)
                .unwrap_err();
        assert!(matches!(err, ConfigError::DimensionMismatch { .. }));
    }

    #[test]
    fn rejects_non_positive_pulsation() {
        assert!(
            OscillationGenerator::new(0.0, vec![1.0], vec![0.0], 0.0, 1, AngleUnit::Radians).is_err()
        );
        assert!(
            OscillationGenerator::new(f64::NAN, vec![1.0], vec![0.0], 0.0, 1, AngleUnit::Radians)
                .is_err()
        );
    }
}
