//! Three-phase population search over vocabulary indices.
//!
//! Every generation, each agent runs three moves in order, each pulling every
//! gene index a random fraction of the way toward a target:
//!
//! 1. Foraging: toward a freshly drawn random position.
//! 2. Territory: toward a randomly chosen agent's current position.
//! 3. Leadership: toward the global best.
//!
//! The agent is re-evaluated after every move.

use std::collections::HashMap;

use crate::schema::{Pattern, PhaseConfig};

use super::{PatternSearch, SearchContext, approach};

/// A search agent.
#[derive(Debug, Clone)]
pub struct Agent {
    pub pattern: Pattern,
    pub fitness: usize,
}

/// Agents plus the generation-scoped visited map.
#[derive(Debug, Clone)]
pub struct PhasePopulation {
    agents: Vec<Agent>,
    /// Patterns already scored this generation, keyed by exact token sequence.
    visited: HashMap<Pattern, usize>,
}

/// Foraging / territory / leadership search.
#[derive(Debug, Clone, Default)]
pub struct PhaseSearch {
    config: PhaseConfig,
}

impl PhaseSearch {
    pub fn new(config: PhaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PhaseConfig {
        &self.config
    }

    /// Pull every gene toward `target` by `factor` with a fresh random weight
    /// per gene.
    fn pull(&self, pattern: &mut Pattern, target: &Pattern, factor: f64, ctx: &mut SearchContext<'_>) {
        let size = ctx.vocabulary_size();
        for (gene, &goal) in pattern.0.iter_mut().zip(target.tokens()) {
            let r = ctx.rng.unit();
            *gene = approach(*gene, goal, r, factor, size);
        }
    }

    /// Score an agent, consulting the visited map before the evaluator, and
    /// offer it to the global best.
    fn score(agent: &mut Agent, visited: &mut HashMap<Pattern, usize>, ctx: &mut SearchContext<'_>) {
        agent.fitness = match visited.get(&agent.pattern) {
            Some(&fitness) => fitness,
            None => {
                let fitness = ctx.fitness(&agent.pattern);
                visited.insert(agent.pattern.clone(), fitness);
                fitness
            }
        };
        ctx.offer(&agent.pattern, agent.fitness);
    }
}

impl PatternSearch for PhaseSearch {
    type Population = PhasePopulation;

    fn name(&self) -> &'static str {
        "phase"
    }

    fn generations(&self) -> usize {
        self.config.generations
    }

    fn initialize(&self, length: usize, ctx: &mut SearchContext<'_>) -> PhasePopulation {
        let size = ctx.vocabulary_size();
        let mut visited = HashMap::new();
        let mut agents = Vec::with_capacity(self.config.population_size);

        for _ in 0..self.config.population_size {
            let mut agent = Agent {
                pattern: ctx.rng.random_pattern(length, size),
                fitness: 0,
            };
            Self::score(&mut agent, &mut visited, ctx);
            agents.push(agent);
        }

        PhasePopulation { agents, visited }
    }

    fn step(&self, population: &mut PhasePopulation, ctx: &mut SearchContext<'_>) {
        let size = ctx.vocabulary_size();
        let count = population.agents.len();

        for i in 0..count {
            let length = population.agents[i].pattern.len();

            // Foraging
            let food = ctx.rng.random_pattern(length, size);
            let mut agent = population.agents[i].clone();
            self.pull(&mut agent.pattern, &food, self.config.foraging_factor, ctx);
            Self::score(&mut agent, &mut population.visited, ctx);
            population.agents[i] = agent;

            // Territory
            let neighbor = population.agents[ctx.rng.index(count)].pattern.clone();
            let mut agent = population.agents[i].clone();
            self.pull(&mut agent.pattern, &neighbor, self.config.territory_factor, ctx);
            Self::score(&mut agent, &mut population.visited, ctx);
            population.agents[i] = agent;

            // Leadership; without a global best there is nothing to follow.
            if let Some(leader) = ctx.best.pattern().cloned() {
                let mut agent = population.agents[i].clone();
                self.pull(&mut agent.pattern, &leader, self.config.leadership_factor, ctx);
                Self::score(&mut agent, &mut population.visited, ctx);
                population.agents[i] = agent;
            }
        }

        population.visited.clear();
    }
}
