//! Search settings for the rota engine.
//!
//! Load worker configuration from TOML or YAML files to control time and
//! iteration budgets, thread count, perturbation strength and the memetic
//! population without code changes.
//!
//! # Examples
//!
//! Load settings from a TOML string:
//!
//! ```
//! use rota_config::SearchSettings;
//! use std::time::Duration;
//!
//! let settings = SearchSettings::from_toml_str(r#"
//!     thread_count = 4
//!     time_limit_secs = 30
//!     restart_iterations = 80
//!     block_sizes = [1, 2, 3, 4]
//!     selection_policy = "best_improving"
//!
//!     [trace]
//!     record_best_found = true
//!     record_period_millis = 250
//! "#).unwrap();
//!
//! assert_eq!(settings.time_limit(), Some(Duration::from_secs(30)));
//! assert_eq!(settings.thread_count, 4);
//! ```
//!
//! Use defaults when the file is missing:
//!
//! ```
//! use rota_config::SearchSettings;
//!
//! let settings = SearchSettings::load("search.toml").unwrap_or_default();
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How a neighborhood picks among improving moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Apply the first strictly-improving move encountered.
    #[default]
    FirstImproving,
    /// Scan the whole neighborhood and apply the best improving move.
    BestImproving,
}

/// How the memetic pool replaces a member when full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionStrategy {
    /// Round-robin overwrite.
    ReplaceNext,
    /// Random pick among the members tied at the worst evaluation.
    ReplaceOneOfWorst,
    /// Random pick within the worst fraction of the pool.
    #[default]
    ReplaceInWorstSet,
}

/// Trace recording settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TraceSettings {
    /// Record the best-found value over time.
    #[serde(default)]
    pub record_best_found: bool,

    /// Record one entry per completed iteration (verbose).
    #[serde(default)]
    pub record_iterations: bool,

    /// Minimum period between unchanged best-found records.
    #[serde(default = "default_trace_period_millis")]
    pub record_period_millis: u64,
}

fn default_trace_period_millis() -> u64 {
    1_000
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            record_best_found: false,
            record_iterations: false,
            record_period_millis: default_trace_period_millis(),
        }
    }
}

impl TraceSettings {
    pub fn record_period(&self) -> Duration {
        Duration::from_millis(self.record_period_millis)
    }
}

/// Settings shared by the iterated-local-search and memetic workers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchSettings {
    /// Number of search threads per worker.
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,

    /// Wall-clock budget in seconds; unlimited when absent.
    #[serde(default)]
    pub time_limit_secs: Option<u64>,

    /// Total iteration budget across threads; unlimited when absent.
    #[serde(default)]
    pub max_iterations: Option<u64>,

    /// Seed for reproducible runs; thread `i` derives `seed + i`.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Iterations without a restart-best improvement before a restart.
    #[serde(default = "default_restart_iterations")]
    pub restart_iterations: u64,

    /// Probability of keeping a worse solution at acceptance time.
    #[serde(default = "default_worse_acceptance_rate")]
    pub worse_acceptance_rate: f64,

    /// Perturbation strength: fraction of cells to disturb per invocation.
    #[serde(default = "default_perturbation_strength")]
    pub perturbation_strength: f64,

    /// Ladder of swap block sizes explored by VND.
    #[serde(default = "default_block_sizes")]
    pub block_sizes: Vec<usize>,

    /// Move selection policy inside VND.
    #[serde(default)]
    pub selection_policy: SelectionPolicy,

    /// Memetic population size.
    #[serde(default = "default_population_size")]
    pub population_size: usize,

    /// Memetic pool replacement strategy.
    #[serde(default)]
    pub insertion_strategy: InsertionStrategy,

    /// Fraction of the pool considered "worst" by `replace_in_worst_set`.
    #[serde(default = "default_worst_set_ratio")]
    pub worst_set_ratio: f64,

    /// Block lengths drawn by the crossover interleave.
    #[serde(default = "default_crossover_block_sizes")]
    pub crossover_block_sizes: Vec<usize>,

    /// Feed the worker's best-found back into slower threads.
    #[serde(default = "default_share_best_found")]
    pub share_best_found: bool,

    /// Trace recording.
    #[serde(default)]
    pub trace: TraceSettings,
}

fn default_thread_count() -> usize {
    1
}

fn default_restart_iterations() -> u64 {
    60
}

fn default_worse_acceptance_rate() -> f64 {
    0.05
}

fn default_perturbation_strength() -> f64 {
    0.03
}

fn default_block_sizes() -> Vec<usize> {
    (1..=7).collect()
}

fn default_population_size() -> usize {
    10
}

fn default_worst_set_ratio() -> f64 {
    0.25
}

fn default_crossover_block_sizes() -> Vec<usize> {
    vec![1, 5, 7]
}

fn default_share_best_found() -> bool {
    true
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            thread_count: default_thread_count(),
            time_limit_secs: None,
            max_iterations: None,
            random_seed: None,
            restart_iterations: default_restart_iterations(),
            worse_acceptance_rate: default_worse_acceptance_rate(),
            perturbation_strength: default_perturbation_strength(),
            block_sizes: default_block_sizes(),
            selection_policy: SelectionPolicy::default(),
            population_size: default_population_size(),
            insertion_strategy: InsertionStrategy::default(),
            worst_set_ratio: default_worst_set_ratio(),
            crossover_block_sizes: default_crossover_block_sizes(),
            share_best_found: default_share_best_found(),
            trace: TraceSettings::default(),
        }
    }
}

impl SearchSettings {
    /// Creates default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads settings from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses settings from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Loads settings from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses settings from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Wall-clock budget as a duration.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    /// Sets the thread count.
    pub fn with_thread_count(mut self, threads: usize) -> Self {
        self.thread_count = threads;
        self
    }

    /// Sets the time limit in seconds.
    pub fn with_time_limit_secs(mut self, seconds: u64) -> Self {
        self.time_limit_secs = Some(seconds);
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the VND ladder.
    pub fn with_block_sizes(mut self, block_sizes: Vec<usize>) -> Self {
        self.block_sizes = block_sizes;
        self
    }

    /// Sets the memetic population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Checks value ranges. Workers call this before spawning threads.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_count == 0 {
            return Err(ConfigError::Invalid(
                "thread_count must be at least 1".into(),
            ));
        }
        if self.block_sizes.is_empty() {
            return Err(ConfigError::Invalid(
                "block_sizes must not be empty".into(),
            ));
        }
        if self.block_sizes.iter().any(|&b| b == 0) {
            return Err(ConfigError::Invalid(
                "block sizes must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.worse_acceptance_rate) {
            return Err(ConfigError::Invalid(format!(
                "worse_acceptance_rate must lie in [0, 1], got {}",
                self.worse_acceptance_rate
            )));
        }
        if self.perturbation_strength < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "perturbation_strength must be non-negative, got {}",
                self.perturbation_strength
            )));
        }
        if self.population_size == 0 {
            return Err(ConfigError::Invalid(
                "population_size must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.worst_set_ratio) {
            return Err(ConfigError::Invalid(format!(
                "worst_set_ratio must lie in [0, 1], got {}",
                self.worst_set_ratio
            )));
        }
        if self.crossover_block_sizes.is_empty()
            || self.crossover_block_sizes.iter().any(|&b| b == 0)
        {
            return Err(ConfigError::Invalid(
                "crossover_block_sizes must contain positive lengths".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
