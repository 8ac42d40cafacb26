//! Shared test fixtures and utilities for the excitation crates.
//!
//! Provides deterministic RNG setup, a tracing subscriber for test output,
//! ready-made joint limits and configurations, and mock simulators.

pub mod fixtures;
pub mod logging;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{test_config, test_limits};
pub use logging::init_tracing;
pub use mocks::{
    CountingSimulator, FailingSimulator, KinematicSimulator, NanRegionSimulator, ScriptedSimulator,
};
pub use rng::{deterministic_vec, seeded_rng};
