//! Pattern fitness: non-overlapping occurrence counting with a trial-scoped
//! memo cache.
//!
//! Every component that needs to know "where does this pattern match" goes
//! through [`GreedyMatches`]: the evaluator counts its matches, corpus removal
//! cuts them out and the encoder substitutes them. If these ever disagreed,
//! frequencies computed after a removal would no longer describe the corpus.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::schema::{Corpus, Pattern, TokenId};

/// Batches smaller than this are evaluated on the calling thread.
const PARALLEL_BATCH_THRESHOLD: usize = 8;

/// Iterator over the start positions of greedy, leftmost, non-overlapping
/// matches of a pattern in one sequence.
///
/// Scanning is left to right; after a match the scan resumes just past it.
/// This is not guaranteed to maximise the match count when a pattern can
/// overlap itself, and is kept that way on purpose.
pub struct GreedyMatches<'a> {
    sequence: &'a [TokenId],
    pattern: &'a [TokenId],
    pos: usize,
}

impl<'a> GreedyMatches<'a> {
    pub fn new(sequence: &'a [TokenId], pattern: &'a [TokenId]) -> Self {
        Self {
            sequence,
            pattern,
            pos: 0,
        }
    }
}

impl Iterator for GreedyMatches<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let k = self.pattern.len();
        if k == 0 {
            return None;
        }
        while self.pos + k <= self.sequence.len() {
            let start = self.pos;
            if &self.sequence[start..start + k] == self.pattern {
                self.pos = start + k;
                return Some(start);
            }
            self.pos += 1;
        }
        None
    }
}

/// Count greedy non-overlapping occurrences of `pattern` in a single sequence.
#[inline]
pub fn count_in_sequence(sequence: &[TokenId], pattern: &[TokenId]) -> usize {
    GreedyMatches::new(sequence, pattern).count()
}

/// Count greedy non-overlapping occurrences of `pattern` across a corpus.
pub fn count_occurrences(pattern: &[TokenId], corpus: &Corpus) -> usize {
    corpus
        .sequences()
        .iter()
        .map(|s| count_in_sequence(s, pattern))
        .sum()
}

/// Evaluates pattern fitness against the current working corpus.
///
/// The cache is only valid for the corpus it was filled against. Callers that
/// mutate the corpus must call [`FitnessEvaluator::invalidate`].
#[derive(Debug, Default)]
pub struct FitnessEvaluator {
    cache: HashMap<Pattern, usize>,
    parallel: bool,
    hits: u64,
    misses: u64,
}

impl FitnessEvaluator {
    /// Create a new fitness evaluator.
    pub fn new(parallel: bool) -> Self {
        Self {
            cache: HashMap::new(),
            parallel,
            hits: 0,
            misses: 0,
        }
    }

    /// Fitness of a single pattern.
    pub fn evaluate(&mut self, pattern: &Pattern, corpus: &Corpus) -> usize {
        if let Some(&fitness) = self.cache.get(pattern) {
            self.hits += 1;
            return fitness;
        }

        self.misses += 1;
        let fitness = count_occurrences(pattern.tokens(), corpus);
        self.cache.insert(pattern.clone(), fitness);
        fitness
    }

    /// Fitness of many patterns, in input order.
    ///
    /// Uncached patterns are scanned in parallel when enabled. The corpus is
    /// only read here, so the results are identical to calling
    /// [`FitnessEvaluator::evaluate`] for each pattern in turn.
    pub fn evaluate_batch(&mut self, patterns: &[Pattern], corpus: &Corpus) -> Vec<usize> {
        let mut pending: Vec<&Pattern> = Vec::new();
        for pattern in patterns {
            if !self.cache.contains_key(pattern) && !pending.contains(&pattern) {
                pending.push(pattern);
            }
        }

        let computed: Vec<usize> = if self.parallel && pending.len() >= PARALLEL_BATCH_THRESHOLD {
            pending
                .par_iter()
                .map(|p| count_occurrences(p.tokens(), corpus))
                .collect()
        } else {
            pending
                .iter()
                .map(|p| count_occurrences(p.tokens(), corpus))
                .collect()
        };

        self.misses += pending.len() as u64;
        self.hits += (patterns.len() - pending.len()) as u64;
        for (pattern, fitness) in pending.into_iter().zip(computed) {
            self.cache.insert(pattern.clone(), fitness);
        }

        patterns
            .iter()
            .map(|p| self.cache.get(p).copied().unwrap_or(0))
            .collect()
    }

    /// Drop every cached frequency. Must follow any corpus mutation.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Number of cached patterns.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Cache hits since creation.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Cache misses (actual corpus scans) since creation.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Dataset, VocabularyOrder};

    fn pattern(ds: &Dataset, tokens: &[&str]) -> Pattern {
        Pattern(
            tokens
                .iter()
                .map(|t| ds.vocabulary.id(t).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_count_two_matches_with_remainder() {
        let ds = Dataset::from_text("t", "1 2 3 1 2 3 4", VocabularyOrder::Sorted);
        let p = pattern(&ds, &["1", "2", "3"]);
        assert_eq!(count_occurrences(p.tokens(), &ds.original), 2);
    }

    #[test]
    fn test_count_is_non_overlapping() {
        let ds = Dataset::from_text("t", "1 1 1\n1 1 1 1", VocabularyOrder::Sorted);
        let p = pattern(&ds, &["1", "1"]);
        // "1 1 1" -> one match, "1 1 1 1" -> two matches
        assert_eq!(count_occurrences(p.tokens(), &ds.original), 3);
    }

    #[test]
    fn test_greedy_is_leftmost_not_optimal() {
        // "a b a b a": pattern "a b a" matches at 0, then resumes at 3.
        let ds = Dataset::from_text("t", "a b a b a", VocabularyOrder::Sorted);
        let p = pattern(&ds, &["a", "b", "a"]);
        let starts: Vec<_> = GreedyMatches::new(&ds.original.sequences()[0], p.tokens()).collect();
        assert_eq!(starts, vec![0]);
    }

    #[test]
    fn test_pattern_longer_than_sequence() {
        let ds = Dataset::from_text("t", "1 2", VocabularyOrder::Sorted);
        let p = Pattern(vec![0, 1, 0]);
        assert_eq!(count_occurrences(p.tokens(), &ds.original), 0);
    }

    #[test]
    fn test_cache_and_invalidate() {
        let ds = Dataset::from_text("t", "1 2 1 2 3", VocabularyOrder::Sorted);
        let p = pattern(&ds, &["1", "2"]);
        let mut evaluator = FitnessEvaluator::new(false);

        assert_eq!(evaluator.evaluate(&p, &ds.original), 2);
        assert_eq!(evaluator.evaluate(&p, &ds.original), 2);
        assert_eq!(evaluator.hits(), 1);
        assert_eq!(evaluator.misses(), 1);

        let mut corpus = ds.original.clone();
        corpus.remove_occurrences(p.tokens());
        evaluator.invalidate();
        assert_eq!(evaluator.cached(), 0);
        assert_eq!(evaluator.evaluate(&p, &corpus), 0);
    }

    #[test]
    fn test_batch_matches_sequential() {
        let ds = Dataset::from_text(
            "t",
            "1 2 3 4 1 2 3 4\n4 3 2 1 1 2\n2 2 2 2 2",
            VocabularyOrder::Sorted,
        );
        let patterns: Vec<Pattern> = (0..4u32)
            .flat_map(|a| (0..4u32).map(move |b| Pattern(vec![a, b])))
            .chain(std::iter::once(Pattern(vec![1, 1])))
            .collect();

        let mut batch = FitnessEvaluator::new(true);
        let mut single = FitnessEvaluator::new(false);

        let batched = batch.evaluate_batch(&patterns, &ds.original);
        let sequential: Vec<usize> = patterns
            .iter()
            .map(|p| single.evaluate(p, &ds.original))
            .collect();

        assert_eq!(batched, sequential);
        assert_eq!(batch.misses(), 16);
        assert_eq!(batch.hits(), 1);
    }

    #[test]
    fn test_removal_agrees_with_count() {
        let ds = Dataset::from_text("t", "5 5 5 6 5 5\n5 5 5 5 5", VocabularyOrder::Sorted);
        let p = pattern(&ds, &["5", "5"]);
        let counted = count_occurrences(p.tokens(), &ds.original);

        let mut corpus = ds.original.clone();
        let removed = corpus.remove_occurrences(p.tokens());
        assert_eq!(counted, removed);
        assert_eq!(corpus.to_lines(&ds.vocabulary), vec!["5 6", "5"]);
    }
}
