//! Greedy covering loop: search, accept, remove, repeat.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::schema::{
    CoveringBudget, Corpus, Dataset, MiningConfig, PatternResult, SearchAlgorithm,
};

use super::fitness::FitnessEvaluator;
use super::scheduler::LengthScheduler;
use super::search::{GeneRng, GeneticSearch, PatternSearch, PhaseSearch, SearchContext, SwarmSearch};

/// Which limit stopped a trial before it reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLimit {
    /// The attempt budget ran out.
    Attempts,
    /// The wall-clock budget ran out.
    Time,
    /// The working corpus no longer holds a window of the minimum length.
    CorpusExhausted,
}

impl fmt::Display for BudgetLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempts => write!(f, "attempt budget exhausted"),
            Self::Time => write!(f, "time budget exhausted"),
            Self::CorpusExhausted => write!(f, "corpus has no window left to search"),
        }
    }
}

/// Covering loop errors.
#[derive(Debug, thiserror::Error)]
pub enum CoveringError {
    #[error("Target of {target} patterns unreachable: found {found} after {attempts} attempts ({limit})", found = .accepted.len())]
    TargetUnreachable {
        target: usize,
        /// Patterns accepted before the limit was hit.
        accepted: Vec<PatternResult>,
        attempts: usize,
        limit: BudgetLimit,
    },
}

/// Result of a successful covering trial.
#[derive(Debug, Clone)]
pub struct CoveringOutcome {
    /// Accepted patterns, in discovery order.
    pub patterns: Vec<PatternResult>,
    /// Search attempts made (successful and failed).
    pub attempts: usize,
    /// Length weights when the trial ended.
    pub final_weights: Vec<f64>,
    /// Seed of the random stream, for replay.
    pub seed: u64,
    /// Wall-clock duration of the trial.
    pub elapsed: Duration,
    /// Fitness cache hits.
    pub cache_hits: u64,
    /// Fitness cache misses (corpus scans).
    pub cache_misses: u64,
}

/// State of one covering trial.
///
/// Everything that must not leak between trials lives here: the shrinking
/// working corpus, the fitness cache and the length weights.
pub struct SearchSession<'d> {
    dataset: &'d Dataset,
    corpus: Corpus,
    evaluator: FitnessEvaluator,
    scheduler: LengthScheduler,
    rng: GeneRng,
    accepted: Vec<PatternResult>,
    attempts: usize,
}

impl<'d> SearchSession<'d> {
    /// Start a trial on a fresh copy of the dataset's original corpus.
    pub fn new(dataset: &'d Dataset, config: &MiningConfig, rng: GeneRng) -> Self {
        Self {
            dataset,
            corpus: dataset.original.clone(),
            evaluator: FitnessEvaluator::new(config.parallel_evaluation),
            scheduler: LengthScheduler::new(&config.lengths),
            rng,
            accepted: Vec::new(),
            attempts: 0,
        }
    }

    /// Current working corpus.
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Patterns accepted so far.
    pub fn accepted(&self) -> &[PatternResult] {
        &self.accepted
    }

    pub fn scheduler(&self) -> &LengthScheduler {
        &self.scheduler
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Whether the working corpus can still yield a pattern of some allowed
    /// length.
    pub fn can_progress(&self) -> bool {
        self.corpus.has_window(self.scheduler.min_length())
    }

    /// One iteration of the covering loop: sample a length, search, and
    /// either accept the result or penalize the length.
    pub fn attempt<S: PatternSearch>(&mut self, strategy: &S) -> Option<&PatternResult> {
        self.attempts += 1;
        let length = self.scheduler.sample(&mut self.rng);
        debug!(
            "Finding pattern #{} of size {} ({} attempt {})",
            self.accepted.len() + 1,
            length,
            strategy.name(),
            self.attempts
        );

        let result = {
            let mut ctx = SearchContext::new(
                &self.corpus,
                &self.dataset.vocabulary,
                &mut self.evaluator,
                &mut self.rng,
            );
            strategy.search(length, &mut ctx)
        };

        match result {
            Some(result) if result.frequency > 0 => {
                self.accept(result);
                self.scheduler.reward(length);
                self.accepted.last()
            }
            _ => {
                self.scheduler.penalize(length);
                None
            }
        }
    }

    /// Remove the pattern's occurrences and drop every cached frequency.
    fn accept(&mut self, result: PatternResult) {
        let removed = self.corpus.remove_occurrences(result.pattern.tokens());
        self.evaluator.invalidate();
        debug!(
            "Accepted {} ({} occurrences removed)",
            result.display(&self.dataset.vocabulary),
            removed
        );
        self.accepted.push(result);
    }

    fn into_outcome(self, seed: u64, elapsed: Duration) -> CoveringOutcome {
        CoveringOutcome {
            patterns: self.accepted,
            attempts: self.attempts,
            final_weights: self.scheduler.weights().to_vec(),
            seed,
            elapsed,
            cache_hits: self.evaluator.hits(),
            cache_misses: self.evaluator.misses(),
        }
    }
}

/// Drives a search strategy until the target pattern count is reached or the
/// budget runs out.
pub struct CoveringLoop<S> {
    strategy: S,
    config: MiningConfig,
}

impl<S: PatternSearch> CoveringLoop<S> {
    pub fn new(strategy: S, config: MiningConfig) -> Self {
        Self { strategy, config }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Find `target` patterns in the dataset.
    pub fn run(
        &self,
        target: usize,
        dataset: &Dataset,
        rng: GeneRng,
    ) -> Result<CoveringOutcome, CoveringError> {
        let start = Instant::now();
        let seed = rng.seed();
        let mut session = SearchSession::new(dataset, &self.config, rng);
        let budget: &CoveringBudget = &self.config.budget;
        // Unrepresentable limits are rejected by validation; here they mean no limit.
        let deadline = budget
            .max_seconds
            .and_then(|s| Duration::try_from_secs_f64(s).ok());

        while session.accepted().len() < target {
            let limit = if !session.can_progress() {
                Some(BudgetLimit::CorpusExhausted)
            } else if session.attempts() >= budget.max_attempts {
                Some(BudgetLimit::Attempts)
            } else if deadline.is_some_and(|d| start.elapsed() >= d) {
                Some(BudgetLimit::Time)
            } else {
                None
            };

            if let Some(limit) = limit {
                return Err(CoveringError::TargetUnreachable {
                    target,
                    attempts: session.attempts(),
                    accepted: session.accepted,
                    limit,
                });
            }

            session.attempt(&self.strategy);
        }

        let outcome = session.into_outcome(seed, start.elapsed());
        info!(
            "{}: found {} patterns for CTL={} in {} attempts ({:.2}s, seed {})",
            dataset.name,
            outcome.patterns.len(),
            target,
            outcome.attempts,
            outcome.elapsed.as_secs_f64(),
            seed
        );
        Ok(outcome)
    }
}

/// Run a covering trial with the strategy named in the configuration.
pub fn run_configured(
    config: &MiningConfig,
    target: usize,
    dataset: &Dataset,
    rng: GeneRng,
) -> Result<CoveringOutcome, CoveringError> {
    match &config.algorithm {
        SearchAlgorithm::GeneticAlgorithm(ga) => {
            CoveringLoop::new(GeneticSearch::new(ga.clone()), config.clone()).run(target, dataset, rng)
        }
        SearchAlgorithm::ParticleSwarm(pso) => {
            CoveringLoop::new(SwarmSearch::new(pso.clone()), config.clone()).run(target, dataset, rng)
        }
        SearchAlgorithm::PhaseBased(phase) => {
            CoveringLoop::new(PhaseSearch::new(phase.clone()), config.clone())
                .run(target, dataset, rng)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        GeneticAlgorithmConfig, PhaseConfig, SwarmConfig, VocabularyOrder,
    };

    fn dataset() -> Dataset {
        Dataset::from_text(
            "toy.dat",
            "1 2 3 4 5 1 2 3 4 5\n\
             6 7 1 2 6 7 8 9\n\
             1 2 3 8 9 6 7 4 5\n\
             9 8 7 6 5 4 3 2 1\n\
             1 2 3 4 5 6 7 8 9",
            VocabularyOrder::Sorted,
        )
    }

    fn config(algorithm: SearchAlgorithm) -> MiningConfig {
        MiningConfig {
            algorithm,
            random_seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_target_is_empty() {
        let ds = dataset();
        let outcome = run_configured(&config(SearchAlgorithm::default()), 0, &ds, GeneRng::new(1))
            .unwrap();
        assert!(outcome.patterns.is_empty());
        assert_eq!(outcome.attempts, 0);
    }

    #[test]
    fn test_each_strategy_reaches_target() {
        let ds = dataset();
        let algorithms = [
            SearchAlgorithm::GeneticAlgorithm(GeneticAlgorithmConfig::default()),
            SearchAlgorithm::ParticleSwarm(SwarmConfig::default()),
            SearchAlgorithm::PhaseBased(PhaseConfig::default()),
        ];

        for algorithm in algorithms {
            let name = algorithm.name();
            let outcome = run_configured(&config(algorithm), 3, &ds, GeneRng::new(42))
                .unwrap_or_else(|e| panic!("{} failed: {}", name, e));

            assert_eq!(outcome.patterns.len(), 3, "{}", name);
            for result in &outcome.patterns {
                assert!(result.frequency > 0);
                assert_eq!(result.length, result.pattern.len());
                assert!((2..=4).contains(&result.length));
            }
            let sum: f64 = outcome.final_weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_accepted_patterns_are_distinct() {
        let ds = dataset();
        let outcome = run_configured(&config(SearchAlgorithm::default()), 4, &ds, GeneRng::new(7))
            .unwrap();
        for (i, a) in outcome.patterns.iter().enumerate() {
            for b in &outcome.patterns[i + 1..] {
                assert_ne!(a.pattern, b.pattern);
            }
        }
    }

    #[test]
    fn test_session_invalidates_cache_on_accept() {
        let ds = dataset();
        let config = config(SearchAlgorithm::default());
        let mut session = SearchSession::new(&ds, &config, GeneRng::new(3));
        let search = GeneticSearch::default();

        let tokens_before = session.corpus().total_tokens();
        let accepted = session.attempt(&search).cloned();
        let result = accepted.expect("toy corpus always yields a pattern");

        assert_eq!(
            session.corpus().total_tokens(),
            tokens_before - result.frequency * result.length
        );
        assert_eq!(session.evaluator.cached(), 0);
        // Original corpus untouched.
        assert_eq!(ds.original.total_tokens(), tokens_before);
    }

    #[test]
    fn test_unreachable_target_is_reported() {
        let ds = Dataset::from_text("tiny", "1 2", VocabularyOrder::Sorted);
        let err = run_configured(&config(SearchAlgorithm::default()), 5, &ds, GeneRng::new(1))
            .unwrap_err();

        let CoveringError::TargetUnreachable {
            target,
            accepted,
            limit,
            ..
        } = err;
        assert_eq!(target, 5);
        assert_eq!(accepted.len(), 1);
        assert_eq!(limit, BudgetLimit::CorpusExhausted);
    }

    #[test]
    fn test_attempt_budget_is_enforced() {
        let ds = dataset();
        let mut config = config(SearchAlgorithm::GeneticAlgorithm(GeneticAlgorithmConfig {
            population_size: 4,
            generations: 2,
            ..Default::default()
        }));
        config.budget.max_attempts = 5;

        let err = run_configured(&config, 1000, &ds, GeneRng::new(1)).unwrap_err();
        let CoveringError::TargetUnreachable { attempts, limit, .. } = err;
        assert!(attempts <= 5);
        if limit == BudgetLimit::Attempts {
            assert_eq!(attempts, 5);
        }
    }

    #[test]
    fn test_time_budget_is_enforced() {
        let ds = dataset();
        let mut config = config(SearchAlgorithm::default());
        config.budget.max_seconds = Some(0.0);

        let err = run_configured(&config, 3, &ds, GeneRng::new(1)).unwrap_err();
        let CoveringError::TargetUnreachable { attempts, limit, .. } = err;
        assert_eq!(limit, BudgetLimit::Time);
        assert_eq!(attempts, 0);
    }

    #[test]
    fn test_unrepresentable_time_budget_is_ignored() {
        let ds = dataset();
        let mut config = config(SearchAlgorithm::default());
        config.budget.max_seconds = Some(-1.0);

        let outcome = run_configured(&config, 3, &ds, GeneRng::new(1)).unwrap();
        assert_eq!(outcome.patterns.len(), 3);
    }
}
