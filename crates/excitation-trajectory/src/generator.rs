//! Multi-DOF trajectory generator.
//!
//! Holds one [`OscillationGenerator`] per DOF and a "current time". Queries
//! evaluate the oscillators at that time; `set_time` is the only mutation
//! besides re-initializing the parameters.

use std::f64::consts::PI;

use excitation_core::{AngleUnit, ConfigError};
use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::error::TrajectoryError;
use crate::oscillation::OscillationGenerator;
use crate::params::FourierParams;

/// Velocity magnitude (deg/s) below which DOF 0 counts as standing still.
const ZERO_VELOCITY_THRESHOLD_DEG: f64 = 5.0;

/// Fourier trajectory for all DOFs of a robot.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryGenerator {
    oscillators: Vec<OscillationGenerator>,
    pulsation: f64,
    unit: AngleUnit,
    time: f64,
}

/// Trajectory sampled on a uniform time grid.
///
/// Matrices are `samples x dofs`, in the generator's output unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySamples {
    pub times: DVector<f64>,
    pub positions: DMatrix<f64>,
    pub velocities: DMatrix<f64>,
    pub accelerations: DMatrix<f64>,
}

impl TrajectoryGenerator {
    /// Create a generator with `dofs` idle oscillators (one harmonic, zero
    /// coefficients, zero offset).
    pub fn new(dofs: usize, pulsation: f64, unit: AngleUnit) -> Result<Self, TrajectoryError> {
        if dofs == 0 {
            return Err(ConfigError::invalid("dofs", "must be >= 1").into());
        }
        let oscillators = (0..dofs)
            .map(|_| OscillationGenerator::new(pulsation, vec![0.0], vec![0.0], 0.0, 1, unit))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            oscillators,
            pulsation,
            unit,
            time: 0.0,
        })
    }

    /// Create a generator from explicit parameters (offsets in radians).
    pub fn from_params(params: &FourierParams, unit: AngleUnit) -> Result<Self, TrajectoryError> {
        let mut generator = Self::new(params.dofs().max(1), params.pulsation, unit)?;
        generator.apply_params(params)?;
        Ok(generator)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn dofs(&self) -> usize {
        self.oscillators.len()
    }

    pub const fn unit(&self) -> AngleUnit {
        self.unit
    }

    /// Shared base pulsation `w_f` (rad/s).
    pub const fn pulsation(&self) -> f64 {
        self.pulsation
    }

    /// Current time in seconds.
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Set the current time in seconds.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Period length of the oscillation in seconds: `2π / w_f`.
    pub fn period_length(&self) -> f64 {
        2.0 * PI / self.pulsation
    }

    pub fn angle(&self, dof: usize) -> Result<f64, TrajectoryError> {
        Ok(self.oscillator(dof)?.angle(self.time))
    }

    pub fn velocity(&self, dof: usize) -> Result<f64, TrajectoryError> {
        Ok(self.oscillator(dof)?.velocity(self.time))
    }

    pub fn acceleration(&self, dof: usize) -> Result<f64, TrajectoryError> {
        Ok(self.oscillator(dof)?.acceleration(self.time))
    }

    /// Angles of every DOF at the current time.
    pub fn angles(&self) -> Vec<f64> {
        self.oscillators.iter().map(|o| o.angle(self.time)).collect()
    }

    /// Velocities of every DOF at the current time.
    pub fn velocities(&self) -> Vec<f64> {
        self.oscillators.iter().map(|o| o.velocity(self.time)).collect()
    }

    /// Accelerations of every DOF at the current time.
    pub fn accelerations(&self) -> Vec<f64> {
        self.oscillators
            .iter()
            .map(|o| o.acceleration(self.time))
            .collect()
    }

    pub fn oscillator(&self, dof: usize) -> Result<&OscillationGenerator, TrajectoryError> {
        self.oscillators
            .get(dof)
            .ok_or(TrajectoryError::DofOutOfRange {
                dof,
                dofs: self.dofs(),
            })
    }

    /// Set the time to `elapsed` and report whether DOF 0 moves slower than
    /// 5 deg/s, i.e. whether this is a safe point to start or stop.
    pub fn wait_for_zero_velocity(&mut self, elapsed: f64) -> bool {
        self.set_time(elapsed);
        let threshold = self
            .unit
            .from_radians(ZERO_VELOCITY_THRESHOLD_DEG.to_radians());
        self.oscillators[0].velocity(self.time).abs() < threshold
    }

    /// Current parameters, offsets in radians.
    pub fn params(&self) -> FourierParams {
        FourierParams {
            pulsation: self.pulsation,
            offsets: self.oscillators.iter().map(OscillationGenerator::offset).collect(),
            sine: self.oscillators.iter().map(|o| o.sine().to_vec()).collect(),
            cosine: self.oscillators.iter().map(|o| o.cosine().to_vec()).collect(),
            harmonics: self
                .oscillators
                .iter()
                .map(OscillationGenerator::harmonics)
                .collect(),
        }
    }

    /// Sample every DOF on `t = 0, dt, 2dt, ... <= duration`.
    ///
    /// The current time is restored afterwards.
    pub fn sample(&mut self, duration: f64, dt: f64) -> Result<TrajectorySamples, TrajectoryError> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(ConfigError::invalid("dt", "must be finite and > 0").into());
        }
        if !(duration >= 0.0) || !duration.is_finite() {
            return Err(ConfigError::invalid("duration", "must be finite and >= 0").into());
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = (duration / dt + 1e-9).floor() as usize + 1;
        let dofs = self.dofs();
        let saved_time = self.time;

        let mut samples = TrajectorySamples {
            times: DVector::zeros(n),
            positions: DMatrix::zeros(n, dofs),
            velocities: DMatrix::zeros(n, dofs),
            accelerations: DMatrix::zeros(n, dofs),
        };
        for k in 0..n {
            let t = k as f64 * dt;
            self.set_time(t);
            samples.times[k] = t;
            for (dof, osc) in self.oscillators.iter().enumerate() {
                samples.positions[(k, dof)] = osc.angle(t);
                samples.velocities[(k, dof)] = osc.velocity(t);
                samples.accelerations[(k, dof)] = osc.acceleration(t);
            }
        }

        self.set_time(saved_time);
        Ok(samples)
    }

    // -----------------------------------------------------------------------
    // (Re)initialization
    // -----------------------------------------------------------------------

    /// Draw random parameters for every DOF.
    ///
    /// Per DOF: `nf ∈ [1, 4)`, `q0 ∈ [-1, 1)` rad, and `a`, `b` uniform in
    /// `[-(2 - |q0|)/2, (2 - |q0|)/2]`. The pulsation is kept.
    pub fn init_with_random_params<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let unit = self.unit;
        // Validated at construction and on every re-initialization.
        let pulsation = self.pulsation;
        for osc in &mut self.oscillators {
            let nf = rng.gen_range(1..4);
            let q0: f64 = rng.gen_range(-1.0..1.0);
            let max = (2.0 - q0.abs()) / 2.0;
            let sine = (0..nf).map(|_| rng.gen_range(-max..=max)).collect();
            let cosine = (0..nf).map(|_| rng.gen_range(-max..=max)).collect();
            *osc = OscillationGenerator::from_checked(pulsation, sine, cosine, q0, nf, unit);
        }
    }

    /// Rebuild every oscillator from explicit per-DOF arrays.
    ///
    /// `offsets` are in the generator's unit. Fails without touching the
    /// current oscillators if `nf` or `offsets` (or the coefficient rows)
    /// do not match the DOF count, or if `pulsation` is not positive.
    pub fn init_with_params(
        &mut self,
        sine: &[Vec<f64>],
        cosine: &[Vec<f64>],
        offsets: &[f64],
        harmonics: &[usize],
        pulsation: Option<f64>,
    ) -> Result<(), TrajectoryError> {
        let dofs = self.dofs();
        if harmonics.len() != dofs {
            return Err(ConfigError::dimension("nf", dofs, harmonics.len()).into());
        }
        if offsets.len() != dofs {
            return Err(ConfigError::dimension("q", dofs, offsets.len()).into());
        }
        if sine.len() != dofs {
            return Err(ConfigError::dimension("a", dofs, sine.len()).into());
        }
        if cosine.len() != dofs {
            return Err(ConfigError::dimension("b", dofs, cosine.len()).into());
        }

        let pulsation = pulsation.unwrap_or(self.pulsation);
        let oscillators = (0..dofs)
            .map(|i| {
                OscillationGenerator::new(
                    pulsation,
                    sine[i].clone(),
                    cosine[i].clone(),
                    offsets[i],
                    harmonics[i],
                    self.unit,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.oscillators = oscillators;
        self.pulsation = pulsation;
        Ok(())
    }

    /// Rebuild from a [`FourierParams`] set (offsets in radians).
    pub fn apply_params(&mut self, params: &FourierParams) -> Result<(), TrajectoryError> {
        params.validate()?;
        let offsets: Vec<f64> = params
            .offsets
            .iter()
            .map(|&q| self.unit.from_radians(q))
            .collect();
        self.init_with_params(
            &params.sine,
            &params.cosine,
            &offsets,
            &params.harmonics,
            Some(params.pulsation),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::f64::consts::FRAC_PI_2;

    fn two_dof() -> TrajectoryGenerator {
        let mut generator = TrajectoryGenerator::new(2, 1.0, AngleUnit::Radians).unwrap();
        generator
            .init_with_params(
                &[vec![1.0], vec![0.5, -0.2]],
                &[vec![0.0], vec![0.3, 0.1]],
                &[0.0, 0.25],
                &[1, 2],
                None,
            )
            .unwrap();
        generator
    }

    #[test]
    fn period_length_exact() {
        let generator = TrajectoryGenerator::new(3, 0.5, AngleUnit::Radians).unwrap();
        assert_eq!(generator.period_length(), 2.0 * PI / 0.5);
    }

    #[test]
    fn queries_use_current_time() {
        let mut generator = two_dof();
        generator.set_time(0.0);
        assert_relative_eq!(generator.angle(0).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(generator.velocity(0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(generator.acceleration(0).unwrap(), 0.0, epsilon = 1e-12);

        generator.set_time(FRAC_PI_2);
        assert_relative_eq!(generator.angle(0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(generator.velocity(0).unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(generator.angles().len(), 2);
    }

    #[test]
    fn out_of_range_dof_fails() {
        let generator = two_dof();
        let err = generator.angle(2).unwrap_err();
        assert!(matches!(err, TrajectoryError::DofOutOfRange { dof: 2, dofs: 2 }));
        assert!(generator.velocity(5).is_err());
        assert!(generator.acceleration(2).is_err());
    }

    #[test]
    fn mismatched_nf_leaves_oscillators_untouched() {
        let mut generator = two_dof();
        let before = generator.clone();
        let err = generator
            .init_with_params(&[vec![1.0], vec![1.0]], &[vec![0.0], vec![0.0]], &[0.0, 0.0], &[1], None)
            .unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::Config(ConfigError::DimensionMismatch { .. })
        ));
        assert_eq!(generator, before);
    }

    #[test]
    fn mismatched_offsets_fail() {
        let mut generator = two_dof();
        let before = generator.clone();
        let err = generator
            .init_with_params(&[vec![1.0], vec![1.0]], &[vec![0.0], vec![0.0]], &[0.0], &[1, 1], None)
            .unwrap_err();
        assert!(matches!(err, TrajectoryError::Config(_)));
        assert_eq!(generator, before);
    }

    #[test]
    fn short_coefficient_row_fails_atomically() {
        let mut generator = two_dof();
        let before = generator.clone();
        // second DOF claims two harmonics but supplies one coefficient
        let result = generator.init_with_params(
            &[vec![1.0], vec![1.0]],
            &[vec![0.0], vec![0.0]],
            &[0.0, 0.0],
            &[1, 2],
            Some(3.0),
        );
        assert!(result.is_err());
        assert_eq!(generator, before);
    }

    #[test]
    fn pulsation_updated_when_given() {
        let mut generator = two_dof();
        generator
            .init_with_params(&[vec![1.0], vec![1.0]], &[vec![0.0], vec![0.0]], &[0.0, 0.0], &[1, 1], Some(2.5))
            .unwrap();
        assert_eq!(generator.pulsation(), 2.5);
        assert_relative_eq!(generator.period_length(), 2.0 * PI / 2.5);
    }

    #[test]
    fn random_params_respect_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut generator = TrajectoryGenerator::new(6, 1.0, AngleUnit::Radians).unwrap();
        for _ in 0..200 {
            generator.init_with_random_params(&mut rng);
            let params = generator.params();
            for i in 0..generator.dofs() {
                let q0 = params.offsets[i];
                assert!(q0.abs() <= 1.0);
                let nf = params.harmonics[i];
                assert!((1..4).contains(&nf));
                let max = (2.0 - q0.abs()) / 2.0;
                assert!(params.sine[i].iter().all(|a| a.abs() <= max));
                assert!(params.cosine[i].iter().all(|b| b.abs() <= max));
            }
        }
    }

    #[test]
    fn random_params_replace_every_oscillator() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut generator = TrajectoryGenerator::new(4, 1.7, AngleUnit::Degrees).unwrap();
        let idle = generator.params();
        generator.init_with_random_params(&mut rng);
        let params = generator.params();

        assert_eq!(generator.pulsation(), 1.7);
        for i in 0..generator.dofs() {
            assert_ne!(params.offsets[i], idle.offsets[i]);
            assert_eq!(params.sine[i].len(), params.harmonics[i]);
            assert_eq!(params.cosine[i].len(), params.harmonics[i]);
            assert_relative_eq!(generator.oscillator(i).unwrap().pulsation(), 1.7);
        }
    }

    #[test]
    fn random_params_in_degrees_store_radian_offsets() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut generator = TrajectoryGenerator::new(3, 1.0, AngleUnit::Degrees).unwrap();
        generator.init_with_random_params(&mut rng);
        assert!(generator.params().offsets.iter().all(|q| q.abs() <= 1.0));
    }

    #[test]
    fn zero_velocity_detection() {
        let mut generator = two_dof();
        // DOF 0 velocity is cos(t): zero at π/2, one at 0
        assert!(generator.wait_for_zero_velocity(FRAC_PI_2));
        assert_relative_eq!(generator.time(), FRAC_PI_2);
        assert!(!generator.wait_for_zero_velocity(0.0));
    }

    #[test]
    fn zero_velocity_threshold_in_degrees() {
        let mut generator = TrajectoryGenerator::new(1, 1.0, AngleUnit::Degrees).unwrap();
        // 0.07 rad/s ≈ 4.0 deg/s: below the threshold
        generator
            .init_with_params(&[vec![0.07]], &[vec![0.0]], &[0.0], &[1], None)
            .unwrap();
        assert!(generator.wait_for_zero_velocity(0.0));
        // 0.1 rad/s ≈ 5.7 deg/s: above
        generator
            .init_with_params(&[vec![0.1]], &[vec![0.0]], &[0.0], &[1], None)
            .unwrap();
        assert!(!generator.wait_for_zero_velocity(0.0));
    }

    #[test]
    fn params_roundtrip_through_generator() {
        let generator = two_dof();
        let params = generator.params();
        let rebuilt = TrajectoryGenerator::from_params(&params, AngleUnit::Radians).unwrap();
        assert_eq!(rebuilt.params(), params);
    }

    #[test]
    fn sample_grid_and_time_restore() {
        let mut generator = two_dof();
        generator.set_time(0.7);
        let samples = generator.sample(1.0, 0.25).unwrap();
        assert_eq!(samples.times.len(), 5);
        assert_eq!(samples.positions.shape(), (5, 2));
        assert_relative_eq!(samples.times[4], 1.0);
        assert_relative_eq!(samples.velocities[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(generator.time(), 0.7);
    }

    #[test]
    fn sample_rejects_bad_step() {
        let mut generator = two_dof();
        assert!(generator.sample(1.0, 0.0).is_err());
        assert!(generator.sample(-1.0, 0.1).is_err());
    }

    #[test]
    fn zero_dofs_rejected() {
        assert!(TrajectoryGenerator::new(0, 1.0, AngleUnit::Radians).is_err());
    }
}
