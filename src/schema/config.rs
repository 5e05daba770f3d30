//! Configuration types for pattern mining runs.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::VocabularyOrder;

/// Top-level configuration for one covering trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Search strategy to use.
    #[serde(default)]
    pub algorithm: SearchAlgorithm,
    /// Candidate pattern lengths and the adaptive weighting between them.
    #[serde(default)]
    pub lengths: LengthSchedulerConfig,
    /// Attempt and time limits for the covering loop.
    #[serde(default)]
    pub budget: CoveringBudget,
    /// Vocabulary ordering used for index arithmetic.
    #[serde(default)]
    pub vocabulary_order: VocabularyOrder,
    /// Evaluate a generation's uncached candidates across threads.
    #[serde(default = "default_parallel_evaluation")]
    pub parallel_evaluation: bool,
    /// Random seed for reproducibility. Drawn (and logged) when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            algorithm: SearchAlgorithm::default(),
            lengths: LengthSchedulerConfig::default(),
            budget: CoveringBudget::default(),
            vocabulary_order: VocabularyOrder::default(),
            parallel_evaluation: default_parallel_evaluation(),
            random_seed: None,
        }
    }
}

fn default_parallel_evaluation() -> bool {
    true
}

/// Search algorithm selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SearchAlgorithm {
    /// Genetic algorithm with tournament selection and two-point crossover.
    GeneticAlgorithm(GeneticAlgorithmConfig),
    /// Particle swarm over vocabulary indices.
    ParticleSwarm(SwarmConfig),
    /// Foraging / territory / leadership phase search.
    PhaseBased(PhaseConfig),
}

impl Default for SearchAlgorithm {
    fn default() -> Self {
        Self::GeneticAlgorithm(GeneticAlgorithmConfig::default())
    }
}

impl SearchAlgorithm {
    /// Short name used in logs and output folders.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GeneticAlgorithm(_) => "genetic",
            Self::ParticleSwarm(_) => "swarm",
            Self::PhaseBased(_) => "phase",
        }
    }
}

/// Genetic Algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Number of individuals.
    #[serde(default = "default_ga_population")]
    pub population_size: usize,
    /// Number of generations.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Candidates sampled per tournament.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Mutation probability per gene (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            population_size: default_ga_population(),
            generations: default_generations(),
            tournament_size: default_tournament_size(),
            mutation_rate: default_mutation_rate(),
        }
    }
}

fn default_ga_population() -> usize {
    50
}
fn default_generations() -> usize {
    100
}
fn default_tournament_size() -> usize {
    3
}
fn default_mutation_rate() -> f64 {
    0.3
}

/// Particle swarm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Number of particles.
    #[serde(default = "default_swarm_size")]
    pub swarm_size: usize,
    /// Number of generations.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Inertia weight `w`.
    #[serde(default = "default_inertia")]
    pub inertia: f64,
    /// Cognitive coefficient `c1` (pull toward personal best).
    #[serde(default = "default_acceleration")]
    pub cognitive: f64,
    /// Social coefficient `c2` (pull toward global best).
    #[serde(default = "default_acceleration")]
    pub social: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            swarm_size: default_swarm_size(),
            generations: default_generations(),
            inertia: default_inertia(),
            cognitive: default_acceleration(),
            social: default_acceleration(),
        }
    }
}

fn default_swarm_size() -> usize {
    30
}
fn default_inertia() -> f64 {
    0.7
}
fn default_acceleration() -> f64 {
    2.0
}

/// Phase-based search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Number of agents.
    #[serde(default = "default_phase_population")]
    pub population_size: usize,
    /// Number of generations.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Fraction of the way toward a random position.
    #[serde(default = "default_foraging")]
    pub foraging_factor: f64,
    /// Fraction of the way toward a random other agent.
    #[serde(default = "default_territory")]
    pub territory_factor: f64,
    /// Fraction of the way toward the global best.
    #[serde(default = "default_leadership")]
    pub leadership_factor: f64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            population_size: default_phase_population(),
            generations: default_generations(),
            foraging_factor: default_foraging(),
            territory_factor: default_territory(),
            leadership_factor: default_leadership(),
        }
    }
}

fn default_phase_population() -> usize {
    50
}
fn default_foraging() -> f64 {
    0.6
}
fn default_territory() -> f64 {
    0.4
}
fn default_leadership() -> f64 {
    0.5
}

/// Candidate lengths and weight adaptation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthSchedulerConfig {
    /// Shortest pattern length tried.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Longest pattern length tried.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Weight change per reward or penalty.
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Floor every weight is kept above.
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
}

impl Default for LengthSchedulerConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            delta: default_delta(),
            min_weight: default_min_weight(),
        }
    }
}

fn default_min_length() -> usize {
    2
}
fn default_max_length() -> usize {
    4
}
fn default_delta() -> f64 {
    0.1
}
fn default_min_weight() -> f64 {
    0.1
}

/// Limits on the covering loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoveringBudget {
    /// Maximum search attempts (successful or not) per trial.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Optional wall-clock limit per trial, in seconds.
    #[serde(default)]
    pub max_seconds: Option<f64>,
}

impl Default for CoveringBudget {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_seconds: None,
        }
    }
}

fn default_max_attempts() -> usize {
    1000
}

/// Configuration of a batch run over a directory of datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory containing dataset files.
    pub input_dir: PathBuf,
    /// Directory receiving encoded files, code tables and the results CSV.
    pub output_dir: PathBuf,
    /// File extension of dataset files (without the dot).
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Target pattern counts (CTL values) to run for every dataset.
    #[serde(default = "default_ctl_values")]
    pub ctl_values: Vec<usize>,
    /// Mining parameters.
    #[serde(default)]
    pub mining: MiningConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data/out"),
            extension: default_extension(),
            ctl_values: default_ctl_values(),
            mining: MiningConfig::default(),
        }
    }
}

fn default_extension() -> String {
    "dat".to_string()
}
fn default_ctl_values() -> Vec<usize> {
    vec![0, 2, 4, 6, 8, 10]
}

// ============================================================================
// Validation
// ============================================================================

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Generation count must be positive")]
    InvalidGenerations,
    #[error("Tournament size must be positive")]
    InvalidTournament,
    #[error("Invalid rate or coefficient: {0}")]
    InvalidCoefficient(String),
    #[error("Pattern lengths must satisfy 1 <= min ({min}) <= max ({max})")]
    InvalidLengths { min: usize, max: usize },
    #[error("Weight floor {min_weight} leaves no room for {lengths} lengths")]
    InvalidWeightFloor { min_weight: f64, lengths: usize },
    #[error("Weight delta must be positive")]
    InvalidDelta,
    #[error("Attempt budget must be positive")]
    InvalidBudget,
    #[error("Time budget {0} must be a finite, non-negative number of seconds")]
    InvalidTimeBudget(f64),
    #[error("No target pattern counts specified")]
    NoTargets,
}

impl MiningConfig {
    /// Validate mining configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check_unit = |value: f64, name: &str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidCoefficient(format!(
                    "{} ({}) must be within [0, 1]",
                    name, value
                )))
            }
        };
        let check_non_negative = |value: f64, name: &str| {
            if value >= 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::InvalidCoefficient(format!(
                    "{} ({}) must be non-negative",
                    name, value
                )))
            }
        };

        match &self.algorithm {
            SearchAlgorithm::GeneticAlgorithm(ga) => {
                if ga.population_size < 2 {
                    return Err(ConfigError::PopulationTooSmall);
                }
                if ga.generations == 0 {
                    return Err(ConfigError::InvalidGenerations);
                }
                if ga.tournament_size == 0 {
                    return Err(ConfigError::InvalidTournament);
                }
                check_unit(ga.mutation_rate, "mutation_rate")?;
            }
            SearchAlgorithm::ParticleSwarm(pso) => {
                if pso.swarm_size < 2 {
                    return Err(ConfigError::PopulationTooSmall);
                }
                if pso.generations == 0 {
                    return Err(ConfigError::InvalidGenerations);
                }
                check_non_negative(pso.inertia, "inertia")?;
                check_non_negative(pso.cognitive, "cognitive")?;
                check_non_negative(pso.social, "social")?;
            }
            SearchAlgorithm::PhaseBased(phase) => {
                if phase.population_size < 2 {
                    return Err(ConfigError::PopulationTooSmall);
                }
                if phase.generations == 0 {
                    return Err(ConfigError::InvalidGenerations);
                }
                check_unit(phase.foraging_factor, "foraging_factor")?;
                check_unit(phase.territory_factor, "territory_factor")?;
                check_unit(phase.leadership_factor, "leadership_factor")?;
            }
        }

        let lengths = &self.lengths;
        if lengths.min_length == 0 || lengths.min_length > lengths.max_length {
            return Err(ConfigError::InvalidLengths {
                min: lengths.min_length,
                max: lengths.max_length,
            });
        }
        let count = lengths.max_length - lengths.min_length + 1;
        if !(lengths.min_weight > 0.0 && lengths.min_weight * count as f64 <= 1.0) {
            return Err(ConfigError::InvalidWeightFloor {
                min_weight: lengths.min_weight,
                lengths: count,
            });
        }
        if !(lengths.delta > 0.0) {
            return Err(ConfigError::InvalidDelta);
        }

        if self.budget.max_attempts == 0 {
            return Err(ConfigError::InvalidBudget);
        }
        if let Some(seconds) = self.budget.max_seconds {
            if Duration::try_from_secs_f64(seconds).is_err() {
                return Err(ConfigError::InvalidTimeBudget(seconds));
            }
        }

        Ok(())
    }
}

impl BatchConfig {
    /// Validate batch configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ctl_values.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        self.mining.validate()
    }
}
