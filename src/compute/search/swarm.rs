//! Particle swarm search over vocabulary indices.
//!
//! Each gene position carries a real-valued velocity over the *index* of its
//! token in the vocabulary ordering:
//!
//! ```text
//! v = w*v + c1*r1*(personal_best - current) + c2*r2*(global_best - current)
//! x = clamp(round(current + v), 0, |V| - 1)
//! ```

use crate::schema::{Pattern, SwarmConfig, TokenId};

use super::{PatternSearch, SearchContext};

/// A particle: current position, velocity and personal best.
#[derive(Debug, Clone)]
pub struct Particle {
    pub pattern: Pattern,
    pub velocity: Vec<f64>,
    pub best_pattern: Pattern,
    pub best_fitness: usize,
}

/// Particle swarm optimisation with inertia, cognitive and social terms.
#[derive(Debug, Clone, Default)]
pub struct SwarmSearch {
    config: SwarmConfig,
}

impl SwarmSearch {
    pub fn new(config: SwarmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Update velocity and position of one particle.
    ///
    /// Without a global best yet, the social term contributes nothing.
    fn fly(&self, particle: &mut Particle, global_best: Option<&Pattern>, ctx: &mut SearchContext<'_>) {
        let size = ctx.vocabulary_size();
        let SwarmConfig {
            inertia,
            cognitive,
            social,
            ..
        } = self.config;

        for i in 0..particle.pattern.len() {
            let r1 = ctx.rng.unit();
            let r2 = ctx.rng.unit();

            let current = particle.pattern.0[i] as f64;
            let personal = particle.best_pattern.0[i] as f64;
            let social_pull = global_best.map_or(0.0, |g| g.0[i] as f64 - current);

            particle.velocity[i] = inertia * particle.velocity[i]
                + cognitive * r1 * (personal - current)
                + social * r2 * social_pull;

            let next = (current + particle.velocity[i]).round() as i64;
            particle.pattern.0[i] = next.clamp(0, size as i64 - 1) as TokenId;
        }
    }
}

impl PatternSearch for SwarmSearch {
    type Population = Vec<Particle>;

    fn name(&self) -> &'static str {
        "swarm"
    }

    fn generations(&self) -> usize {
        self.config.generations
    }

    fn initialize(&self, length: usize, ctx: &mut SearchContext<'_>) -> Vec<Particle> {
        let size = ctx.vocabulary_size();
        let mut swarm = Vec::with_capacity(self.config.swarm_size);
        for _ in 0..self.config.swarm_size {
            let mut pattern = Vec::with_capacity(length);
            let mut velocity = Vec::with_capacity(length);
            for _ in 0..length {
                pattern.push(ctx.rng.gene(size));
                velocity.push(ctx.rng.uniform(-1.0, 1.0));
            }
            let pattern = Pattern(pattern);
            swarm.push(Particle {
                best_pattern: pattern.clone(),
                pattern,
                velocity,
                best_fitness: 0,
            });
        }

        let positions: Vec<Pattern> = swarm.iter().map(|p| p.pattern.clone()).collect();
        let fitness = ctx.fitness_batch(&positions);
        for (particle, fitness) in swarm.iter_mut().zip(fitness) {
            particle.best_fitness = fitness;
            ctx.offer(&particle.pattern, fitness);
        }

        swarm
    }

    fn step(&self, swarm: &mut Vec<Particle>, ctx: &mut SearchContext<'_>) {
        let positions: Vec<Pattern> = swarm.iter().map(|p| p.pattern.clone()).collect();
        let fitness = ctx.fitness_batch(&positions);

        for (particle, fitness) in swarm.iter_mut().zip(fitness) {
            if fitness > particle.best_fitness {
                particle.best_fitness = fitness;
                particle.best_pattern = particle.pattern.clone();
            }
            ctx.offer(&particle.pattern, fitness);
        }

        let global_best = ctx.best.pattern().cloned();
        for particle in swarm.iter_mut() {
            self.fly(particle, global_best.as_ref(), ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::FitnessEvaluator;
    use crate::compute::search::GeneRng;
    use crate::schema::{Dataset, VocabularyOrder};

    fn dataset() -> Dataset {
        Dataset::from_text(
            "t",
            "a b c a b c d\na b c e a b\nd e a b c",
            VocabularyOrder::Sorted,
        )
    }

    #[test]
    fn test_positions_stay_in_vocabulary() {
        let ds = dataset();
        let mut evaluator = FitnessEvaluator::new(false);
        let mut rng = GeneRng::new(5);
        let mut ctx = SearchContext::new(&ds.original, &ds.vocabulary, &mut evaluator, &mut rng);

        let search = SwarmSearch::default();
        let mut swarm = search.initialize(3, &mut ctx);
        assert_eq!(swarm.len(), 30);

        for _ in 0..10 {
            search.step(&mut swarm, &mut ctx);
            for particle in &swarm {
                assert_eq!(particle.pattern.len(), 3);
                assert!(particle.pattern.0.iter().all(|&g| (g as usize) < ds.vocabulary.len()));
            }
        }
    }

    #[test]
    fn test_personal_best_never_regresses() {
        let ds = dataset();
        let mut evaluator = FitnessEvaluator::new(false);
        let mut rng = GeneRng::new(8);
        let mut ctx = SearchContext::new(&ds.original, &ds.vocabulary, &mut evaluator, &mut rng);

        let search = SwarmSearch::default();
        let mut swarm = search.initialize(2, &mut ctx);
        let mut previous: Vec<usize> = swarm.iter().map(|p| p.best_fitness).collect();

        for _ in 0..20 {
            search.step(&mut swarm, &mut ctx);
            for (particle, before) in swarm.iter().zip(&previous) {
                assert!(particle.best_fitness >= *before);
            }
            previous = swarm.iter().map(|p| p.best_fitness).collect();
        }
    }

    #[test]
    fn test_result_frequency_is_exact() {
        let ds = dataset();
        let mut evaluator = FitnessEvaluator::new(true);
        let mut rng = GeneRng::new(42);
        let mut ctx = SearchContext::new(&ds.original, &ds.vocabulary, &mut evaluator, &mut rng);

        let result = SwarmSearch::default().search(2, &mut ctx).unwrap();
        let recount =
            crate::compute::count_occurrences(result.pattern.tokens(), &ds.original);
        assert_eq!(result.frequency, recount);
        assert!(result.frequency > 0);
    }

    #[test]
    fn test_single_token_vocabulary() {
        let ds = Dataset::from_text("t", "x x x x x", VocabularyOrder::Sorted);
        let mut evaluator = FitnessEvaluator::new(false);
        let mut rng = GeneRng::new(1);
        let mut ctx = SearchContext::new(&ds.original, &ds.vocabulary, &mut evaluator, &mut rng);

        let result = SwarmSearch::default().search(2, &mut ctx).unwrap();
        assert_eq!(result.frequency, 2);
    }
}
