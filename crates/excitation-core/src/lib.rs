// excitation-core: errors, joint limits, bounds, configuration and seeding
// shared by the excitation trajectory crates.

pub mod config;
pub mod error;
pub mod seed;
pub mod types;

pub use config::{
    ConstraintConfig, ExcitationConfig, SearchStrategy, SimplexConfig, SqpConfig, SwarmConfig,
    TrajectoryConfig,
};
pub use error::{ConfigError, ExcitationError, SimulationError};
pub use seed::SeedStreams;
pub use types::{AngleUnit, JointLimits, JointLimitsSource, ParameterBounds, ParameterRange};
