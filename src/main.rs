//! Seq Cover CLI - Run batch pattern mining from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::time::Instant;

use seq_cover::dataset::SUMMARY_FILE;
use seq_cover::{BatchConfig, BatchRunner};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [input_dir]", args[0]);
        eprintln!();
        eprintln!("Mine frequent patterns from every dataset in a directory.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to batch configuration file");
        eprintln!("  input_dir    Overrides the configured input directory");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    let mut config = BatchConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    if let Some(input_dir) = args.get(2) {
        config.input_dir = PathBuf::from(input_dir);
    }

    println!("Seq Cover");
    println!("=========");
    println!("Input: {}", config.input_dir.display());
    println!("Output: {}", config.output_dir.display());
    println!("Algorithm: {}", config.mining.algorithm.name());
    println!(
        "Lengths: {}..={}",
        config.mining.lengths.min_length, config.mining.lengths.max_length
    );
    println!("CTL values: {:?}", config.ctl_values);
    println!();

    let runner = BatchRunner::new(config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let start = Instant::now();
    let summary = runner.run().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("{:<24} {:>4} {:>10} {:>10}", "Dataset", "CTL", "Ratio", "Time(ms)");
    for row in &summary.rows {
        println!(
            "{:<24} {:>4} {:>10.4} {:>10}",
            row.dataset, row.ctl, row.compression_ratio, row.execution_ms
        );
    }
    for unit in &summary.skipped {
        match unit.ctl {
            Some(ctl) => println!("Skipped {} CTL={}: {}", unit.dataset, ctl, unit.reason),
            None => println!("Skipped {}: {}", unit.dataset, unit.reason),
        }
    }

    println!();
    println!("Summary: {}", runner.config().output_dir.join(SUMMARY_FILE).display());
    println!(
        "Done in {:.2}s (seed {})",
        start.elapsed().as_secs_f32(),
        summary.seed
    );

    if !summary.is_complete() {
        std::process::exit(2);
    }
}

fn print_example_config() {
    let config = BatchConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
