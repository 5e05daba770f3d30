//! Corpus, vocabulary and pattern types.
//!
//! Tokens are interned once per dataset. A [`TokenId`] is the token's position
//! in the [`Vocabulary`] ordering, which makes "index in the vocabulary" and
//! "token identity" the same number. The search strategies rely on this for
//! their index arithmetic, so the ordering is fixed when the dataset is built
//! and never recomputed.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compute::GreedyMatches;

/// Interned token identifier (position in the vocabulary ordering).
pub type TokenId = u32;

/// How the vocabulary is ordered (and therefore how token ids are assigned).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum VocabularyOrder {
    /// Lexicographic order of the token text.
    #[default]
    Sorted,
    /// Order of first appearance in the corpus.
    FirstSeen,
}

/// Distinct tokens of an original corpus, in a fixed order.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, TokenId>,
}

impl Vocabulary {
    /// Build a vocabulary from tokenized lines.
    pub fn from_lines<I, L, T>(lines: I, order: VocabularyOrder) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[T]>,
        T: AsRef<str>,
    {
        let mut tokens: Vec<String> = Vec::new();
        let mut seen: HashMap<String, TokenId> = HashMap::new();

        for line in lines {
            for token in line.as_ref() {
                let token = token.as_ref();
                if token.is_empty() || seen.contains_key(token) {
                    continue;
                }
                seen.insert(token.to_string(), tokens.len() as TokenId);
                tokens.push(token.to_string());
            }
        }

        if order == VocabularyOrder::Sorted {
            tokens.sort();
        }

        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as TokenId))
            .collect();

        Self { tokens, index }
    }

    /// Number of distinct tokens.
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Look up the id of a token.
    #[inline]
    pub fn id(&self, token: &str) -> Option<TokenId> {
        self.index.get(token).copied()
    }

    /// Token text for an id.
    #[inline]
    pub fn token(&self, id: TokenId) -> &str {
        &self.tokens[id as usize]
    }

    /// Whether the vocabulary contains the given token text.
    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Iterate over tokens in vocabulary order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Largest value among the tokens that parse as integers.
    ///
    /// Non-numeric tokens are ignored. Returns 0 when nothing parses or every
    /// parsed value is negative.
    pub fn max_numeric(&self) -> u64 {
        self.tokens
            .iter()
            .filter_map(|t| t.parse::<i64>().ok())
            .fold(0u64, |acc, v| acc.max(v.max(0) as u64))
    }
}

/// An ordered collection of interned token sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    sequences: Vec<Vec<TokenId>>,
}

impl Corpus {
    pub fn new(sequences: Vec<Vec<TokenId>>) -> Self {
        Self { sequences }
    }

    /// Number of sequences.
    #[inline]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Total number of tokens across all sequences.
    pub fn total_tokens(&self) -> usize {
        self.sequences.iter().map(Vec::len).sum()
    }

    /// All sequences, in order.
    #[inline]
    pub fn sequences(&self) -> &[Vec<TokenId>] {
        &self.sequences
    }

    /// Whether any sequence is long enough to hold a window of `length` tokens.
    pub fn has_window(&self, length: usize) -> bool {
        length > 0 && self.sequences.iter().any(|s| s.len() >= length)
    }

    /// Remove every greedy, non-overlapping occurrence of `pattern`.
    ///
    /// Sequences left empty are dropped. Returns the number of occurrences
    /// removed, which equals the pattern's fitness before the call.
    pub fn remove_occurrences(&mut self, pattern: &[TokenId]) -> usize {
        let mut removed = 0;

        for sequence in &mut self.sequences {
            let starts: Vec<usize> = GreedyMatches::new(sequence, pattern).collect();
            if starts.is_empty() {
                continue;
            }
            removed += starts.len();

            let mut kept = Vec::with_capacity(sequence.len() - starts.len() * pattern.len());
            let mut cursor = 0;
            for start in starts {
                kept.extend_from_slice(&sequence[cursor..start]);
                cursor = start + pattern.len();
            }
            kept.extend_from_slice(&sequence[cursor..]);
            *sequence = kept;
        }

        self.sequences.retain(|s| !s.is_empty());
        removed
    }

    /// Render the corpus back to token text, one line per sequence.
    pub fn to_lines(&self, vocabulary: &Vocabulary) -> Vec<String> {
        self.sequences
            .iter()
            .map(|s| {
                s.iter()
                    .map(|&id| vocabulary.token(id))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

/// A loaded dataset: the pristine corpus and its vocabulary.
///
/// The original corpus is never mutated; covering trials work on a clone.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Dataset name (usually the file name).
    pub name: String,
    /// Original, unshrunk corpus.
    pub original: Corpus,
    /// Vocabulary of the original corpus.
    pub vocabulary: Vocabulary,
}

impl Dataset {
    /// Build a dataset from raw lines, tokenizing on whitespace.
    pub fn from_lines<S: AsRef<str>>(name: &str, lines: &[S], order: VocabularyOrder) -> Self {
        let tokenized: Vec<Vec<&str>> = lines
            .iter()
            .map(|l| l.as_ref().split_whitespace().collect())
            .collect();

        let vocabulary = Vocabulary::from_lines(&tokenized, order);

        let sequences = tokenized
            .iter()
            .map(|line| {
                line.iter()
                    .filter_map(|t| vocabulary.id(t))
                    .collect::<Vec<TokenId>>()
            })
            .collect();

        Self {
            name: name.to_string(),
            original: Corpus::new(sequences),
            vocabulary,
        }
    }

    /// Build a dataset from a block of text, one sequence per line.
    pub fn from_text(name: &str, text: &str, order: VocabularyOrder) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        Self::from_lines(name, &lines, order)
    }
}

/// A fixed-length ordered tuple of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pattern(pub Vec<TokenId>);

impl Pattern {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn tokens(&self) -> &[TokenId] {
        &self.0
    }

    /// Canonical text key: tokens joined by a single space.
    pub fn key(&self, vocabulary: &Vocabulary) -> String {
        self.0
            .iter()
            .map(|&id| vocabulary.token(id))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<TokenId>> for Pattern {
    fn from(tokens: Vec<TokenId>) -> Self {
        Self(tokens)
    }
}

/// A pattern accepted by a search, with its frequency in the corpus it was
/// found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternResult {
    pub pattern: Pattern,
    pub frequency: usize,
    pub length: usize,
}

impl PatternResult {
    /// Returns `None` unless the pattern is non-empty and occurs at least once.
    pub fn new(pattern: Pattern, frequency: usize) -> Option<Self> {
        if frequency == 0 || pattern.is_empty() {
            return None;
        }
        let length = pattern.len();
        Some(Self {
            pattern,
            frequency,
            length,
        })
    }

    /// Displayable view resolving token ids through a vocabulary.
    pub fn display<'a>(&'a self, vocabulary: &'a Vocabulary) -> PatternResultDisplay<'a> {
        PatternResultDisplay {
            result: self,
            vocabulary,
        }
    }
}

/// Helper returned by [`PatternResult::display`].
pub struct PatternResultDisplay<'a> {
    result: &'a PatternResult,
    vocabulary: &'a Vocabulary,
}

impl fmt::Display for PatternResultDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Size {}: {} (Frequency: {})",
            self.result.length,
            self.result.pattern.key(self.vocabulary),
            self.result.frequency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_sorted() {
        let ds = Dataset::from_text("t", "b a c\na d", VocabularyOrder::Sorted);
        let tokens: Vec<_> = ds.vocabulary.tokens().collect();
        assert_eq!(tokens, vec!["a", "b", "c", "d"]);
        assert_eq!(ds.vocabulary.id("c"), Some(2));
    }

    #[test]
    fn test_vocabulary_first_seen() {
        let ds = Dataset::from_text("t", "b a c\na d", VocabularyOrder::FirstSeen);
        let tokens: Vec<_> = ds.vocabulary.tokens().collect();
        assert_eq!(tokens, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_blank_lines_preserved_in_original() {
        let ds = Dataset::from_text("t", "1 2\n\n  3  ", VocabularyOrder::Sorted);
        assert_eq!(ds.original.len(), 3);
        assert!(ds.original.sequences()[1].is_empty());
        assert_eq!(ds.original.total_tokens(), 3);
        assert_eq!(ds.vocabulary.len(), 3);
    }

    #[test]
    fn test_max_numeric_skips_text() {
        let ds = Dataset::from_text("t", "a 17 -40 b 3", VocabularyOrder::Sorted);
        assert_eq!(ds.vocabulary.max_numeric(), 17);

        let ds = Dataset::from_text("t", "x y", VocabularyOrder::Sorted);
        assert_eq!(ds.vocabulary.max_numeric(), 0);
    }

    #[test]
    fn test_remove_occurrences() {
        let ds = Dataset::from_text("t", "1 2 3 1 2 3 4\n1 2 3", VocabularyOrder::Sorted);
        let v = &ds.vocabulary;
        let pattern: Vec<TokenId> = ["1", "2", "3"].iter().filter_map(|t| v.id(t)).collect();

        let mut corpus = ds.original.clone();
        let removed = corpus.remove_occurrences(&pattern);

        assert_eq!(removed, 3);
        // Second sequence becomes empty and is dropped.
        assert_eq!(corpus.to_lines(v), vec!["4".to_string()]);
        // Original untouched.
        assert_eq!(ds.original.total_tokens(), 10);
    }

    #[test]
    fn test_has_window() {
        let ds = Dataset::from_text("t", "1 2\n3", VocabularyOrder::Sorted);
        assert!(ds.original.has_window(2));
        assert!(!ds.original.has_window(3));
        assert!(!ds.original.has_window(0));
    }

    #[test]
    fn test_pattern_result_rejects_zero() {
        assert!(PatternResult::new(Pattern(vec![0, 1]), 0).is_none());
        assert!(PatternResult::new(Pattern(vec![]), 3).is_none());

        let r = PatternResult::new(Pattern(vec![0, 1]), 3).unwrap();
        assert_eq!(r.length, 2);
    }

    #[test]
    fn test_pattern_display() {
        let ds = Dataset::from_text("t", "7 8 9", VocabularyOrder::Sorted);
        let r = PatternResult::new(Pattern(vec![0, 1]), 4).unwrap();
        assert_eq!(
            r.display(&ds.vocabulary).to_string(),
            "Size 2: 7 8 (Frequency: 4)"
        );
    }
}
