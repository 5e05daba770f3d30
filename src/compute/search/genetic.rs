//! Genetic algorithm over fixed-length token patterns.

use crate::schema::{GeneticAlgorithmConfig, Pattern};

use super::{GeneRng, PatternSearch, SearchContext};

/// A candidate individual in the population.
#[derive(Debug, Clone)]
pub struct Individual {
    /// The pattern (genome).
    pub pattern: Pattern,
    /// Fitness score.
    pub fitness: usize,
}

/// Population state carried between generations.
#[derive(Debug, Clone)]
pub struct GeneticPopulation {
    individuals: Vec<Individual>,
    /// Elite individual, copied unchanged into every new generation.
    elite: Individual,
}

/// Standard GA with tournament selection, two-point crossover and per-gene
/// mutation.
#[derive(Debug, Clone, Default)]
pub struct GeneticSearch {
    config: GeneticAlgorithmConfig,
}

impl GeneticSearch {
    pub fn new(config: GeneticAlgorithmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneticAlgorithmConfig {
        &self.config
    }

    /// Tournament selection: sample `tournament_size` individuals uniformly,
    /// keep the fittest (first sampled wins ties).
    fn select<'p>(&self, population: &'p [Individual], rng: &mut GeneRng) -> &'p Individual {
        let mut best = &population[rng.index(population.len())];
        for _ in 1..self.config.tournament_size {
            let candidate = &population[rng.index(population.len())];
            if candidate.fitness > best.fitness {
                best = candidate;
            }
        }
        best
    }

    /// Per-gene mutation: each gene is replaced by a random token with
    /// probability `mutation_rate`.
    fn mutate(&self, pattern: &mut Pattern, rng: &mut GeneRng, vocabulary_size: usize) {
        for gene in pattern.0.iter_mut() {
            if rng.unit() < self.config.mutation_rate {
                *gene = rng.gene(vocabulary_size);
            }
        }
    }
}

/// Two-point crossover.
///
/// Cut points satisfy `1 <= p1 < len` and `p1 <= p2 < len`; genes in
/// `[p1, p2)` are swapped between the parents. `p1 == p2` swaps nothing.
pub fn two_point_crossover(p1: &Pattern, p2: &Pattern, rng: &mut GeneRng) -> (Pattern, Pattern) {
    let size = p1.len();
    if size < 2 {
        return (p1.clone(), p2.clone());
    }

    let point1 = rng.index_in(1, size);
    let point2 = rng.index_in(point1, size);

    let mut c1 = p1.clone();
    let mut c2 = p2.clone();
    for i in point1..point2 {
        c1.0[i] = p2.0[i];
        c2.0[i] = p1.0[i];
    }
    (c1, c2)
}

impl PatternSearch for GeneticSearch {
    type Population = GeneticPopulation;

    fn name(&self) -> &'static str {
        "genetic"
    }

    fn generations(&self) -> usize {
        self.config.generations
    }

    fn initialize(&self, length: usize, ctx: &mut SearchContext<'_>) -> GeneticPopulation {
        let size = ctx.vocabulary_size();
        let patterns: Vec<Pattern> = (0..self.config.population_size)
            .map(|_| ctx.rng.random_pattern(length, size))
            .collect();
        let fitness = ctx.fitness_batch(&patterns);

        let individuals: Vec<Individual> = patterns
            .into_iter()
            .zip(fitness)
            .map(|(pattern, fitness)| Individual { pattern, fitness })
            .collect();

        // The elite starts as the first individual and is only replaced by a
        // strictly fitter one.
        let mut elite = individuals[0].clone();
        for individual in &individuals {
            ctx.offer(&individual.pattern, individual.fitness);
            if individual.fitness > elite.fitness {
                elite = individual.clone();
            }
        }

        GeneticPopulation { individuals, elite }
    }

    fn step(&self, population: &mut GeneticPopulation, ctx: &mut SearchContext<'_>) {
        let target = self.config.population_size;
        let size = ctx.vocabulary_size();

        // Breed every child first so the random stream does not depend on
        // evaluation order, then score the whole brood in one batch.
        let mut children: Vec<Pattern> = Vec::with_capacity(target + 1);
        while 1 + children.len() < target {
            let parent1 = self.select(&population.individuals, ctx.rng);
            let parent2 = self.select(&population.individuals, ctx.rng);

            let (mut c1, mut c2) = two_point_crossover(&parent1.pattern, &parent2.pattern, ctx.rng);
            self.mutate(&mut c1, ctx.rng, size);
            self.mutate(&mut c2, ctx.rng, size);

            children.push(c1);
            children.push(c2);
        }

        let fitness = ctx.fitness_batch(&children);

        let mut next = Vec::with_capacity(target);
        next.push(population.elite.clone());

        for (pattern, fitness) in children.into_iter().zip(fitness) {
            ctx.offer(&pattern, fitness);
            let child = Individual { pattern, fitness };
            if child.fitness > population.elite.fitness {
                population.elite = child.clone();
            }
            // The odd child of the final pair is scored but does not fit.
            if next.len() < target {
                next.push(child);
            }
        }

        population.individuals = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::FitnessEvaluator;
    use crate::schema::{Dataset, VocabularyOrder};

    fn dataset() -> Dataset {
        Dataset::from_text(
            "t",
            "1 2 3 4 1 2 1 2\n4 1 2 3 1 2\n3 3 1 2 4 4\n1 2 2 1",
            VocabularyOrder::Sorted,
        )
    }

    #[test]
    fn test_crossover_preserves_genes_per_position() {
        let mut rng = GeneRng::new(42);
        let a = Pattern(vec![0, 0, 0, 0]);
        let b = Pattern(vec![1, 1, 1, 1]);
        for _ in 0..50 {
            let (c1, c2) = two_point_crossover(&a, &b, &mut rng);
            assert_eq!(c1.len(), 4);
            for i in 0..4 {
                // Each position is a swap or a copy.
                assert_ne!(c1.0[i], c2.0[i]);
            }
            // The first gene is never inside the swapped segment.
            assert_eq!(c1.0[0], 0);
            assert_eq!(c2.0[0], 1);
        }
    }

    #[test]
    fn test_population_size_is_stable() {
        let ds = dataset();
        let mut evaluator = FitnessEvaluator::new(false);
        let mut rng = GeneRng::new(3);
        let mut ctx = SearchContext::new(&ds.original, &ds.vocabulary, &mut evaluator, &mut rng);

        let search = GeneticSearch::new(GeneticAlgorithmConfig {
            population_size: 11,
            ..Default::default()
        });
        let mut population = search.initialize(2, &mut ctx);
        assert_eq!(population.individuals.len(), 11);

        search.step(&mut population, &mut ctx);
        assert_eq!(population.individuals.len(), 11);
        assert!(population.individuals[0].fitness <= population.elite.fitness);
    }

    #[test]
    fn test_finds_most_frequent_pair() {
        let ds = dataset();
        let mut evaluator = FitnessEvaluator::new(true);
        let mut rng = GeneRng::new(42);
        let mut ctx = SearchContext::new(&ds.original, &ds.vocabulary, &mut evaluator, &mut rng);

        let result = GeneticSearch::default().search(2, &mut ctx).unwrap();

        // "1 2" occurs 7 times; nothing else comes close.
        assert_eq!(result.pattern.key(&ds.vocabulary), "1 2");
        assert_eq!(result.frequency, 7);
        assert_eq!(result.length, 2);
    }

    #[test]
    fn test_seeded_search_is_reproducible() {
        let ds = dataset();
        let run = |seed| {
            let mut evaluator = FitnessEvaluator::new(true);
            let mut rng = GeneRng::new(seed);
            let mut ctx =
                SearchContext::new(&ds.original, &ds.vocabulary, &mut evaluator, &mut rng);
            GeneticSearch::default().search(3, &mut ctx)
        };
        assert_eq!(run(11), run(11));
    }
}
