//! Quick mining performance test

use seq_cover::{
    compute::{Encoder, GeneRng, run_configured},
    schema::{
        Dataset, GeneticAlgorithmConfig, MiningConfig, PhaseConfig, SearchAlgorithm, SwarmConfig,
        VocabularyOrder,
    },
};
use std::time::Instant;

fn synthetic_dataset(sequences: usize) -> Dataset {
    let mut rng = GeneRng::new(11);
    let lines: Vec<String> = (0..sequences)
        .map(|i| {
            let mut items: Vec<String> = (0..15).map(|_| rng.index(60).to_string()).collect();
            // Every third sequence carries a shared basket.
            if i % 3 == 0 {
                items.extend(["7", "21", "42", "7", "21"].map(String::from));
            }
            items.join(" ")
        })
        .collect();
    Dataset::from_lines("synthetic", &lines, VocabularyOrder::Sorted)
}

fn main() {
    println!("=== Mining Performance Test ===\n");

    let algorithms = [
        SearchAlgorithm::GeneticAlgorithm(GeneticAlgorithmConfig::default()),
        SearchAlgorithm::ParticleSwarm(SwarmConfig::default()),
        SearchAlgorithm::PhaseBased(PhaseConfig::default()),
    ];

    for sequences in [200, 1000] {
        let ds = synthetic_dataset(sequences);
        println!(
            "Dataset: {} sequences, {} tokens, {} distinct",
            ds.original.len(),
            ds.original.total_tokens(),
            ds.vocabulary.len()
        );

        for algorithm in &algorithms {
            let config = MiningConfig {
                algorithm: algorithm.clone(),
                random_seed: Some(42),
                ..Default::default()
            };

            let start = Instant::now();
            match run_configured(&config, 6, &ds, GeneRng::new(42)) {
                Ok(outcome) => {
                    let encoding = Encoder::encode(&ds, &outcome.patterns);
                    let elapsed = start.elapsed();
                    let lookups = outcome.cache_hits + outcome.cache_misses;

                    println!("  {}:", algorithm.name());
                    println!("    Attempts:       {}", outcome.attempts);
                    println!("    Elapsed:        {:.2}s", elapsed.as_secs_f64());
                    println!(
                        "    Cache hit rate: {:.1}%",
                        100.0 * outcome.cache_hits as f64 / lookups.max(1) as f64
                    );
                    println!(
                        "    Symbols:        {} -> {}",
                        ds.original.total_tokens(),
                        encoding.corpus.symbol_count()
                    );
                    for result in &outcome.patterns {
                        println!("    {}", result.display(&ds.vocabulary));
                    }
                }
                Err(e) => println!("  {}: {}", algorithm.name(), e),
            }
        }
        println!();
    }
}
