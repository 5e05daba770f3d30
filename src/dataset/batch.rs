//! Batch runs: every dataset in a directory at every target pattern count.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::compute::{CoveringError, Encoder, GeneRng, run_configured};
use crate::schema::{BatchConfig, Dataset};

use super::{DatasetError, discover, write_encoding};

/// Name of the results file written into the output directory.
pub const RESULTS_FILE: &str = "results.csv";

/// Name of the JSON batch summary written next to the results file.
pub const SUMMARY_FILE: &str = "summary.json";

const RESULTS_HEADER: &str = "Dataset,CTL,CompressionRatio,ExecutionTime(ms)";

/// One row of the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub dataset: String,
    pub ctl: usize,
    pub compression_ratio: f64,
    pub execution_ms: u64,
}

/// A dataset (or one of its CTL values) that produced no row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub dataset: String,
    /// `None` when the whole dataset was skipped.
    pub ctl: Option<usize>,
    pub reason: String,
}

/// Appends rows to `results.csv`.
pub struct ResultsLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl ResultsLog {
    /// Create (truncating) the results file and write its header.
    pub fn create(path: &Path) -> Result<Self, DatasetError> {
        let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
        let mut log = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        };
        log.write_line(RESULTS_HEADER)?;
        Ok(log)
    }

    pub fn append(&mut self, row: &ResultRow) -> Result<(), DatasetError> {
        let line = format!(
            "{},{},{:.2},{}",
            row.dataset, row.ctl, row.compression_ratio, row.execution_ms
        );
        self.write_line(&line)
    }

    // Flushed per row so a crashed batch keeps what it finished.
    fn write_line(&mut self, line: &str) -> Result<(), DatasetError> {
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| DatasetError::io(&self.path, e))
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub rows: Vec<ResultRow>,
    pub skipped: Vec<SkippedUnit>,
    /// Seed the per-trial seeds were derived from.
    pub seed: u64,
}

impl BatchSummary {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Write the summary as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|e| DatasetError::io(path, e))
    }
}

/// Runs the covering loop and encoder over a directory of datasets.
pub struct BatchRunner {
    config: BatchConfig,
}

impl BatchRunner {
    /// Create a runner after validating the configuration.
    pub fn new(config: BatchConfig) -> Result<Self, DatasetError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run every discovered dataset at every CTL value.
    ///
    /// Only failures to discover inputs or to create the results file abort
    /// the batch; everything else is logged and recorded as skipped.
    pub fn run(&self) -> Result<BatchSummary, DatasetError> {
        let files = discover(&self.config.input_dir, &self.config.extension)?;
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| DatasetError::io(output_dir, e))?;
        let mut results = ResultsLog::create(&output_dir.join(RESULTS_FILE))?;

        let mut master = GeneRng::from_option(self.config.mining.random_seed);
        let mut summary = BatchSummary {
            seed: master.seed(),
            ..Default::default()
        };

        info!(
            "Batch: {} datasets, CTL {:?}, {} search, seed {}",
            files.len(),
            self.config.ctl_values,
            self.config.mining.algorithm.name(),
            summary.seed
        );

        for path in &files {
            self.run_file(path, &mut master, &mut results, &mut summary);
        }

        info!(
            "Batch finished: {} rows, {} skipped",
            summary.rows.len(),
            summary.skipped.len()
        );
        summary.save(&output_dir.join(SUMMARY_FILE))?;
        Ok(summary)
    }

    fn run_file(
        &self,
        path: &Path,
        master: &mut GeneRng,
        results: &mut ResultsLog,
        summary: &mut BatchSummary,
    ) {
        let loaded = Dataset::load(path, self.config.mining.vocabulary_order).and_then(|ds| {
            let bytes = fs::metadata(path).map_err(|e| DatasetError::io(path, e))?.len();
            Ok((ds, bytes))
        });
        let (dataset, original_bytes) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Skipping {}: {}", path.display(), e);
                summary.skipped.push(SkippedUnit {
                    dataset: path.display().to_string(),
                    ctl: None,
                    reason: e.to_string(),
                });
                return;
            }
        };

        info!(
            "{}: {} sequences, {} tokens, {} distinct",
            dataset.name,
            dataset.original.len(),
            dataset.original.total_tokens(),
            dataset.vocabulary.len()
        );

        for &ctl in &self.config.ctl_values {
            let rng = GeneRng::new(master.next_seed());
            match self.run_unit(&dataset, ctl, original_bytes, rng) {
                Ok(row) => {
                    if let Err(e) = results.append(&row) {
                        warn!("{}", e);
                    }
                    summary.rows.push(row);
                }
                Err(reason) => {
                    warn!("{} CTL={}: {}", dataset.name, ctl, reason);
                    summary.skipped.push(SkippedUnit {
                        dataset: dataset.name.clone(),
                        ctl: Some(ctl),
                        reason,
                    });
                }
            }
        }
    }

    /// Mine, encode and write one dataset at one CTL.
    fn run_unit(
        &self,
        dataset: &Dataset,
        ctl: usize,
        original_bytes: u64,
        rng: GeneRng,
    ) -> Result<ResultRow, String> {
        let start = Instant::now();

        let outcome = run_configured(&self.config.mining, ctl, dataset, rng)
            .map_err(|e: CoveringError| e.to_string())?;
        for result in &outcome.patterns {
            info!("{}", result.display(&dataset.vocabulary));
        }

        let encoding = Encoder::encode(dataset, &outcome.patterns);
        let written = write_encoding(
            &self.config.output_dir,
            ctl,
            &dataset.name,
            &encoding,
            &dataset.vocabulary,
        )
        .map_err(|e| e.to_string())?;

        let row = ResultRow {
            dataset: dataset.name.clone(),
            ctl,
            compression_ratio: written.compression_ratio(original_bytes),
            execution_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "{} CTL={}: ratio {:.4} in {} ms",
            row.dataset, row.ctl, row.compression_ratio, row.execution_ms
        );
        Ok(row)
    }
}
