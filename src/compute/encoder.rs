//! Code assignment and longest-first substitution over the original corpus.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::schema::{Corpus, Dataset, Pattern, PatternResult, TokenId, Vocabulary};

use super::fitness::GreedyMatches;

/// One element of an encoded sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// An original token that no accepted pattern covered.
    Token(TokenId),
    /// A code standing in for one occurrence of a pattern.
    Code(u64),
}

/// Code table parse errors.
#[derive(Debug, thiserror::Error)]
pub enum CodeTableError {
    #[error("line {line}: expected `code:tokens`")]
    MissingSeparator { line: usize },

    #[error("line {line}: invalid code `{code}`")]
    InvalidCode { line: usize, code: String },

    #[error("line {line}: duplicate code {code}")]
    DuplicateCode { line: usize, code: u64 },

    #[error("line {line}: code {code} has an empty pattern")]
    EmptyPattern { line: usize, code: u64 },

    #[error("line {line}: token `{token}` is not in the vocabulary")]
    UnknownToken { line: usize, token: String },
}

/// A code and the pattern it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: u64,
    pub pattern: Pattern,
}

/// Code table in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    entries: Vec<CodeEntry>,
    by_code: HashMap<u64, usize>,
}

impl CodeTable {
    fn push(&mut self, code: u64, pattern: Pattern) {
        self.by_code.insert(code, self.entries.len());
        self.entries.push(CodeEntry { code, pattern });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CodeEntry] {
        &self.entries
    }

    /// Pattern for a code.
    pub fn get(&self, code: u64) -> Option<&Pattern> {
        self.by_code.get(&code).map(|&i| &self.entries[i].pattern)
    }

    /// Serialize as `code:token token …` lines.
    pub fn to_text(&self, vocabulary: &Vocabulary) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            // Writing into a String cannot fail.
            let _ = writeln!(out, "{}:{}", entry.code, entry.pattern.key(vocabulary));
        }
        out
    }

    /// Parse a table written by [`CodeTable::to_text`]. Blank lines are
    /// ignored.
    pub fn parse(text: &str, vocabulary: &Vocabulary) -> Result<Self, CodeTableError> {
        let mut table = Self::default();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            if raw.trim().is_empty() {
                continue;
            }

            let (code, tokens) = raw
                .split_once(':')
                .ok_or(CodeTableError::MissingSeparator { line })?;
            let code: u64 = code.trim().parse().map_err(|_| CodeTableError::InvalidCode {
                line,
                code: code.to_string(),
            })?;
            if table.by_code.contains_key(&code) {
                return Err(CodeTableError::DuplicateCode { line, code });
            }

            let pattern = tokens
                .split_whitespace()
                .map(|t| {
                    vocabulary.id(t).ok_or_else(|| CodeTableError::UnknownToken {
                        line,
                        token: t.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if pattern.is_empty() {
                return Err(CodeTableError::EmptyPattern { line, code });
            }

            table.push(code, Pattern(pattern));
        }

        Ok(table)
    }
}

/// The original corpus with pattern occurrences replaced by codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedCorpus {
    sequences: Vec<Vec<Symbol>>,
}

impl EncodedCorpus {
    pub fn sequences(&self) -> &[Vec<Symbol>] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Total symbols (tokens plus codes).
    pub fn symbol_count(&self) -> usize {
        self.sequences.iter().map(Vec::len).sum()
    }

    /// One line per sequence, symbols joined by single spaces.
    pub fn to_text(&self, vocabulary: &Vocabulary) -> String {
        let mut out = String::new();
        for sequence in &self.sequences {
            for (i, symbol) in sequence.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                match *symbol {
                    Symbol::Token(id) => out.push_str(vocabulary.token(id)),
                    Symbol::Code(code) => {
                        let _ = write!(out, "{}", code);
                    }
                }
            }
            out.push('\n');
        }
        out
    }

    /// Parse encoded text back into symbols. Codes never alias vocabulary
    /// tokens, so every word resolves one way only.
    pub fn parse(
        text: &str,
        vocabulary: &Vocabulary,
        table: &CodeTable,
    ) -> Result<Self, CodeTableError> {
        let sequences = text
            .lines()
            .enumerate()
            .map(|(i, line)| {
                line.split_whitespace()
                    .map(|word| {
                        if let Some(id) = vocabulary.id(word) {
                            return Ok(Symbol::Token(id));
                        }
                        match word.parse::<u64>() {
                            Ok(code) if table.get(code).is_some() => Ok(Symbol::Code(code)),
                            _ => Err(CodeTableError::UnknownToken {
                                line: i + 1,
                                token: word.to_string(),
                            }),
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { sequences })
    }

    /// Expand every code back into its pattern.
    ///
    /// Codes missing from the table are dropped; a table produced alongside
    /// this corpus always has them all.
    pub fn decode(&self, table: &CodeTable) -> Corpus {
        let sequences = self
            .sequences
            .iter()
            .map(|sequence| {
                let mut tokens = Vec::with_capacity(sequence.len());
                for symbol in sequence {
                    match *symbol {
                        Symbol::Token(id) => tokens.push(id),
                        Symbol::Code(code) => {
                            if let Some(pattern) = table.get(code) {
                                tokens.extend_from_slice(pattern.tokens());
                            }
                        }
                    }
                }
                tokens
            })
            .collect();
        Corpus::new(sequences)
    }
}

/// Code table plus encoded corpus.
#[derive(Debug, Clone, Default)]
pub struct Encoding {
    pub table: CodeTable,
    pub corpus: EncodedCorpus,
}

/// Rewrites a dataset's original corpus with the accepted patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder;

impl Encoder {
    /// Assign one code per pattern in discovery order.
    ///
    /// Codes start one above the largest numeric token (at least 1) and skip
    /// any value whose text is already a vocabulary token.
    pub fn assign_codes(vocabulary: &Vocabulary, patterns: &[PatternResult]) -> CodeTable {
        let mut table = CodeTable::default();
        let mut next = vocabulary.max_numeric().saturating_add(1);

        for result in patterns {
            while vocabulary.contains(&next.to_string()) {
                next += 1;
            }
            table.push(next, result.pattern.clone());
            next += 1;
        }

        table
    }

    /// Encode the dataset's original corpus.
    pub fn encode(dataset: &Dataset, patterns: &[PatternResult]) -> Encoding {
        let table = Self::assign_codes(&dataset.vocabulary, patterns);

        // Longest first; the stable sort keeps discovery order among ties.
        let mut order: Vec<&CodeEntry> = table.entries().iter().collect();
        order.sort_by_key(|e| Reverse(e.pattern.len()));

        let sequences = dataset
            .original
            .sequences()
            .iter()
            .map(|sequence| {
                let mut symbols: Vec<Symbol> = sequence.iter().map(|&t| Symbol::Token(t)).collect();
                for entry in &order {
                    symbols = substitute(&symbols, entry.pattern.tokens(), entry.code);
                }
                symbols
            })
            .collect();

        Encoding {
            table,
            corpus: EncodedCorpus { sequences },
        }
    }
}

/// Replace greedy occurrences of `pattern` with `code`.
///
/// Matching only happens inside runs of plain tokens; a code already placed
/// is never part of a later match.
fn substitute(symbols: &[Symbol], pattern: &[TokenId], code: u64) -> Vec<Symbol> {
    let mut out = Vec::with_capacity(symbols.len());
    let mut run: Vec<TokenId> = Vec::new();

    let flush = |run: &mut Vec<TokenId>, out: &mut Vec<Symbol>| {
        let mut cursor = 0;
        for start in GreedyMatches::new(run.as_slice(), pattern) {
            out.extend(run[cursor..start].iter().map(|&t| Symbol::Token(t)));
            out.push(Symbol::Code(code));
            cursor = start + pattern.len();
        }
        out.extend(run[cursor..].iter().map(|&t| Symbol::Token(t)));
        run.clear();
    };

    for symbol in symbols {
        match *symbol {
            Symbol::Token(t) => run.push(t),
            Symbol::Code(_) => {
                flush(&mut run, &mut out);
                out.push(*symbol);
            }
        }
    }
    flush(&mut run, &mut out);

    out
}
