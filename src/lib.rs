//! Seq Cover - Metaheuristic mining of frequent contiguous token patterns.
//!
//! A covering loop repeatedly asks a search strategy (genetic algorithm,
//! particle swarm or phase-based search) for the most frequent pattern of an
//! adaptively chosen length, removes its occurrences from a working copy of
//! the corpus and continues until a target number of patterns is found. The
//! accepted patterns become a code table used to rewrite the original corpus.
//!
//! # Architecture
//!
//! - `schema`: Corpus, vocabulary and pattern types; configuration
//! - `compute`: Fitness evaluation, length scheduling, search strategies,
//!   covering loop and encoder
//! - `dataset`: Dataset files, encoded output and batch runs
//!
//! # Example
//!
//! ```rust,no_run
//! use seq_cover::{
//!     compute::{Encoder, GeneRng, run_configured},
//!     schema::{Dataset, MiningConfig, VocabularyOrder},
//! };
//!
//! let dataset = Dataset::load("data/retail.dat", VocabularyOrder::Sorted).unwrap();
//! let config = MiningConfig::default();
//!
//! let outcome = run_configured(&config, 4, &dataset, GeneRng::new(42)).unwrap();
//! for result in &outcome.patterns {
//!     println!("{}", result.display(&dataset.vocabulary));
//! }
//!
//! let encoding = Encoder::encode(&dataset, &outcome.patterns);
//! print!("{}", encoding.table.to_text(&dataset.vocabulary));
//! ```

pub mod compute;
pub mod dataset;
pub mod schema;


// Re-export commonly used types
pub use compute::{CoveringLoop, CoveringOutcome, Encoder, run_configured};
pub use dataset::{BatchRunner, BatchSummary};
pub use schema::{BatchConfig, Dataset, MiningConfig, PatternResult};
