//! Augmented-Lagrangian particle swarm optimization (ALPSO).
//!
//! The swarm minimizes the augmented Lagrangian for a fixed set of
//! multipliers for `inner_iterations` moves, then updates multipliers and
//! penalties at the swarm's best point. Personal bests keep their
//! [`Evaluation`]s, so a multiplier update only re-scores them; it never
//! re-evaluates the problem.

use excitation_core::SwarmConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::error::SolverError;
use crate::lagrangian::Multipliers;
use crate::problem::{Evaluation, Problem, SolveReport, Solver};
use crate::tracker::Tracker;

/// Maximum particle speed per dimension, as a fraction of the bound width.
const MAX_SPEED_FRACTION: f64 = 0.5;

/// Seeded ALPSO global search.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSwarm {
    config: SwarmConfig,
    seed: u64,
}

struct Particle {
    position: Vec<f64>,
    velocity: Vec<f64>,
    best: Vec<f64>,
    best_eval: Evaluation,
}

impl ParticleSwarm {
    pub const fn new(config: SwarmConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    pub const fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl Solver for ParticleSwarm {
    fn name(&self) -> &'static str {
        "particle-swarm"
    }

    fn minimize(
        &self,
        problem: &mut dyn Problem,
        initial: &[f64],
    ) -> Result<SolveReport, SolverError> {
        let cfg = &self.config;
        if cfg.swarm_size < 2 {
            return Err(SolverError::InvalidConfig(format!(
                "swarm_size must be >= 2, got {}",
                cfg.swarm_size
            )));
        }

        let mut tracker = Tracker::new(problem, initial)?;
        let bounds = tracker.problem().bounds().clone();
        let constraints = tracker.problem().constraint_count();
        let dim = bounds.len();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let start = bounds.clamp(initial);

        let max_speed: Vec<f64> = (0..dim)
            .map(|i| MAX_SPEED_FRACTION * bounds.width(i))
            .collect();

        let mut swarm = Vec::with_capacity(cfg.swarm_size);
        for k in 0..cfg.swarm_size {
            let position: Vec<f64> = if k == 0 {
                start.clone()
            } else {
                (0..dim)
                    .map(|i| bounds.lower()[i] + rng.r#gen::<f64>() * bounds.width(i))
                    .collect()
            };
            let velocity = (0..dim)
                .map(|i| rng.gen_range(-0.1..=0.1) * bounds.width(i))
                .collect();
            let eval = tracker.evaluate(&position)?;
            swarm.push(Particle {
                best: position.clone(),
                position,
                velocity,
                best_eval: eval,
            });
        }

        let mut multipliers =
            Multipliers::new(constraints, cfg.initial_penalty, cfg.penalty_growth);

        for outer in 0..cfg.outer_iterations {
            for _ in 0..cfg.inner_iterations {
                let leader = leader_index(&swarm, &multipliers);
                let global_best = swarm[leader].best.clone();

                for particle in &mut swarm {
                    for i in 0..dim {
                        let r1: f64 = rng.r#gen();
                        let r2: f64 = rng.r#gen();
                        let x = particle.position[i];
                        let v = cfg.inertia * particle.velocity[i]
                            + cfg.cognitive * r1 * (particle.best[i] - x)
                            + cfg.social * r2 * (global_best[i] - x);
                        let v = v.clamp(-max_speed[i], max_speed[i]);
                        let next = x + v;
                        if next < bounds.lower()[i] || next > bounds.upper()[i] {
                            particle.position[i] = next.clamp(bounds.lower()[i], bounds.upper()[i]);
                            particle.velocity[i] = 0.0;
                        } else {
                            particle.position[i] = next;
                            particle.velocity[i] = v;
                        }
                    }

                    let eval = tracker.evaluate(&particle.position)?;
                    if multipliers.value(&eval) < multipliers.value(&particle.best_eval) {
                        particle.best.clone_from(&particle.position);
                        particle.best_eval = eval;
                    }
                }
            }

            let leader = &swarm[leader_index(&swarm, &multipliers)];
            multipliers.update(&leader.best_eval.constraints);
            debug!(
                outer,
                objective = leader.best_eval.objective,
                violation = leader.best_eval.max_violation(),
                evaluations = tracker.evaluations(),
                "swarm multiplier update"
            );
            trace!(?multipliers, "swarm multipliers");
        }

        let report = tracker.report(&start, true);
        let converged = report.is_feasible();
        debug!(
            objective = report.objective,
            violation = report.max_violation,
            evaluations = report.evaluations,
            "particle swarm finished"
        );
        Ok(SolveReport { converged, ..report })
    }
}

/// Particle whose personal best has the lowest augmented Lagrangian.
fn leader_index(swarm: &[Particle], multipliers: &Multipliers) -> usize {
    swarm
        .iter()
        .map(|p| multipliers.value(&p.best_eval))
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0, |(i, _)| i)
}
