//! Periodic joint-space trajectories built from finite Fourier series.
//!
//! Each DOF follows the Swevers–Gansemann parameterization: the joint
//! velocity is a truncated sine/cosine series of a shared base pulsation
//! `w_f`, and position and acceleration are its closed-form integral and
//! derivative.
//!
//! # Architecture
//!
//! ```text
//! FourierParams ──► TrajectoryGenerator ──► OscillationGenerator (per DOF)
//!       ▲                                          │
//!       │ ParameterLayout (flat vector)            ▼
//!   optimizer                              q, dq, ddq at time t
//! ```

pub mod error;
pub mod file;
pub mod generator;
pub mod oscillation;
pub mod params;

pub use error::TrajectoryError;
pub use file::TrajectoryFile;
pub use generator::{TrajectoryGenerator, TrajectorySamples};
pub use oscillation::OscillationGenerator;
pub use params::{FourierParams, ParameterLayout};
