//! Population-based search for the most frequent pattern of a fixed length.
//!
//! The three strategies share one contract: draw candidate genes from the
//! vocabulary, evolve a fixed-size population for a fixed number of
//! generations, and report the candidate with the strictly highest
//! non-overlapping frequency (ties keep the one found first). They differ only
//! in how a population is represented and moved, which is what
//! [`PatternSearch`] abstracts.
//!
//! - `GeneticSearch`: tournament selection, two-point crossover, per-gene mutation
//! - `SwarmSearch`: particle swarm over vocabulary indices
//! - `PhaseSearch`: foraging / territory / leadership moves over vocabulary indices

mod genetic;
mod phase;
mod swarm;

use rand::prelude::*;

use crate::schema::{Corpus, Pattern, PatternResult, TokenId, Vocabulary};

use super::fitness::FitnessEvaluator;

pub use genetic::{GeneticSearch, Individual};
pub use phase::{Agent, PhaseSearch};
pub use swarm::{Particle, SwarmSearch};

/// Random source shared by the scheduler and the search strategies.
///
/// A single sequential stream: given the same seed, the same dataset and the
/// same configuration, a run is reproducible.
pub struct GeneRng {
    rng: StdRng,
    seed: u64,
}

impl GeneRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create from an optional seed, drawing one from entropy when absent.
    ///
    /// The drawn seed is kept so the run can be replayed.
    pub fn from_option(seed: Option<u64>) -> Self {
        Self::new(seed.unwrap_or_else(rand::random))
    }

    /// Seed this stream was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Uniform draw in `[low, high)`.
    #[inline]
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..high)
    }

    /// Uniform index in `[0, n)`.
    #[inline]
    pub fn index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Uniform index in `[low, high)`.
    #[inline]
    pub fn index_in(&mut self, low: usize, high: usize) -> usize {
        self.rng.gen_range(low..high)
    }

    /// Uniformly random token from a vocabulary of `size` tokens.
    #[inline]
    pub fn gene(&mut self, size: usize) -> TokenId {
        self.rng.gen_range(0..size) as TokenId
    }

    /// Pattern of `length` uniformly random genes.
    pub fn random_pattern(&mut self, length: usize, vocabulary_size: usize) -> Pattern {
        Pattern((0..length).map(|_| self.gene(vocabulary_size)).collect())
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

/// Best pattern seen so far in one search invocation.
///
/// Only strictly greater frequencies replace the record, and the record
/// starts at frequency 0 with no pattern, so a search that never finds an
/// occurring pattern reports nothing.
#[derive(Debug, Clone, Default)]
pub struct BestTracker {
    best: Option<Pattern>,
    fitness: usize,
}

impl BestTracker {
    /// Offer a candidate. Returns true if it became the new best.
    pub fn offer(&mut self, pattern: &Pattern, fitness: usize) -> bool {
        if fitness > self.fitness {
            self.fitness = fitness;
            self.best = Some(pattern.clone());
            true
        } else {
            false
        }
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        self.best.as_ref()
    }

    pub fn fitness(&self) -> usize {
        self.fitness
    }

    /// Convert into a result, if any occurring pattern was found.
    pub fn into_result(self) -> Option<PatternResult> {
        self.best
            .and_then(|pattern| PatternResult::new(pattern, self.fitness))
    }
}

/// Everything a strategy needs during one search invocation.
pub struct SearchContext<'a> {
    /// Current working corpus (read-only during a search).
    pub corpus: &'a Corpus,
    /// Vocabulary of the original corpus; token ids index into it.
    pub vocabulary: &'a Vocabulary,
    /// Trial-scoped fitness evaluator.
    pub evaluator: &'a mut FitnessEvaluator,
    /// Random source.
    pub rng: &'a mut GeneRng,
    /// Global best of this search.
    pub best: BestTracker,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        corpus: &'a Corpus,
        vocabulary: &'a Vocabulary,
        evaluator: &'a mut FitnessEvaluator,
        rng: &'a mut GeneRng,
    ) -> Self {
        Self {
            corpus,
            vocabulary,
            evaluator,
            rng,
            best: BestTracker::default(),
        }
    }

    /// Fitness of one pattern, memoized.
    #[inline]
    pub fn fitness(&mut self, pattern: &Pattern) -> usize {
        self.evaluator.evaluate(pattern, self.corpus)
    }

    /// Fitness of a whole generation, memoized and possibly parallel.
    #[inline]
    pub fn fitness_batch(&mut self, patterns: &[Pattern]) -> Vec<usize> {
        self.evaluator.evaluate_batch(patterns, self.corpus)
    }

    /// Offer a candidate to the global best.
    #[inline]
    pub fn offer(&mut self, pattern: &Pattern, fitness: usize) -> bool {
        self.best.offer(pattern, fitness)
    }

    /// Vocabulary size as the upper bound for gene draws.
    #[inline]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// A population-based search for the highest-frequency pattern of a given
/// length.
pub trait PatternSearch {
    /// Strategy-local population state.
    type Population;

    /// Human-readable strategy name.
    fn name(&self) -> &'static str;

    /// Number of generations to run.
    fn generations(&self) -> usize;

    /// Build and evaluate the initial population, offering every evaluated
    /// candidate to `ctx.best`.
    fn initialize(&self, length: usize, ctx: &mut SearchContext<'_>) -> Self::Population;

    /// Advance the population by one generation.
    fn step(&self, population: &mut Self::Population, ctx: &mut SearchContext<'_>);

    /// Run the full search. Returns `None` if no candidate ever occurred in
    /// the corpus.
    fn search(&self, length: usize, ctx: &mut SearchContext<'_>) -> Option<PatternResult> {
        if length == 0 || ctx.vocabulary.is_empty() || !ctx.corpus.has_window(length) {
            return None;
        }

        let mut population = self.initialize(length, ctx);
        for _ in 0..self.generations() {
            self.step(&mut population, ctx);
        }

        std::mem::take(&mut ctx.best).into_result()
    }
}

/// Move an index a random fraction of the way toward a target index.
///
/// `new = trunc(current + r * factor * (target - current))`, clamped to the
/// vocabulary. Shared by the phase-based moves.
#[inline]
pub(crate) fn approach(current: TokenId, target: TokenId, r: f64, factor: f64, size: usize) -> TokenId {
    let current = current as f64;
    let moved = (current + r * factor * (target as f64 - current)) as i64;
    moved.clamp(0, size as i64 - 1) as TokenId
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Dataset, VocabularyOrder};

    #[test]
    fn test_gene_rng_deterministic() {
        let mut a = GeneRng::new(42);
        let mut b = GeneRng::new(42);
        for _ in 0..10 {
            assert_eq!(a.gene(100), b.gene(100));
        }
        assert_eq!(a.seed(), 42);
    }

    #[test]
    fn test_from_option_keeps_seed() {
        let rng = GeneRng::from_option(Some(9));
        assert_eq!(rng.seed(), 9);
    }

    #[test]
    fn test_best_tracker_strict_improvement() {
        let mut best = BestTracker::default();
        assert!(!best.offer(&Pattern(vec![0, 0]), 0));
        assert!(best.offer(&Pattern(vec![0, 1]), 3));
        // Tie keeps the earlier pattern.
        assert!(!best.offer(&Pattern(vec![1, 1]), 3));
        assert_eq!(best.pattern(), Some(&Pattern(vec![0, 1])));

        let result = best.into_result().unwrap();
        assert_eq!(result.frequency, 3);
    }

    #[test]
    fn test_empty_tracker_has_no_result() {
        assert!(BestTracker::default().into_result().is_none());
    }

    #[test]
    fn test_approach_clamps() {
        assert_eq!(approach(5, 0, 1.0, 0.5, 10), 2);
        assert_eq!(approach(5, 9, 1.0, 0.5, 10), 7);
        assert_eq!(approach(5, 9, 0.0, 0.5, 10), 5);
        assert_eq!(approach(9, 9, 1.0, 0.5, 10), 9);
    }

    #[test]
    fn test_search_short_circuits_without_windows() {
        let ds = Dataset::from_text("t", "1\n2\n3", VocabularyOrder::Sorted);
        let mut evaluator = FitnessEvaluator::new(false);
        let mut rng = GeneRng::new(1);
        let mut ctx = SearchContext::new(&ds.original, &ds.vocabulary, &mut evaluator, &mut rng);

        let search = GeneticSearch::default();
        assert!(search.search(2, &mut ctx).is_none());
        assert_eq!(evaluator.misses(), 0);
    }
}
