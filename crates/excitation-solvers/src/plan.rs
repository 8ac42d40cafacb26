//! Backend selection from configuration.

use std::fmt;

use excitation_core::SearchStrategy;
use excitation_core::config::OptimizerConfig;
use excitation_core::seed::SeedStreams;

use crate::problem::Solver;
use crate::simplex::SimplexLagrangian;
use crate::sqp::Sqp;
use crate::swarm::ParticleSwarm;

/// Seed stream name of the particle swarm.
pub const SWARM_STREAM: &str = "swarm";

/// The solver stages one optimization runs: an optional global search
/// followed by an optional local refinement.
pub struct SolverPlan {
    pub global: Option<Box<dyn Solver>>,
    pub local: Option<Box<dyn Solver>>,
}

impl SolverPlan {
    pub fn from_config(config: &OptimizerConfig) -> Self {
        let global: Option<Box<dyn Solver>> = if config.strategy.uses_global() {
            let seed = SeedStreams::new(config.seed).stream_seed(SWARM_STREAM);
            Some(Box::new(ParticleSwarm::new(config.swarm.clone(), seed)))
        } else {
            None
        };

        let local: Option<Box<dyn Solver>> = match config.strategy {
            SearchStrategy::Global => None,
            SearchStrategy::LocalSqp | SearchStrategy::GlobalSqp => {
                Some(Box::new(Sqp::new(config.sqp.clone())))
            }
            SearchStrategy::LocalSimplex | SearchStrategy::GlobalSimplex => {
                Some(Box::new(SimplexLagrangian::new(config.simplex.clone())))
            }
        };

        Self { global, local }
    }

    pub fn global_name(&self) -> Option<&'static str> {
        self.global.as_ref().map(|s| s.name())
    }

    pub fn local_name(&self) -> Option<&'static str> {
        self.local.as_ref().map(|s| s.name())
    }
}

impl fmt::Debug for SolverPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverPlan")
            .field("global", &self.global_name())
            .field("local", &self.local_name())
            .finish()
    }
}
