//! Pipeline configuration
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or none at all) is a valid configuration. The database URL can be
//! overridden by the `DATABASE_URL` environment variable.

use crate::error::{ForecastError, Result};
use crate::retry::RetryPolicy;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the store URL
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Store connection string
    pub database_url: Option<String>,
    /// Daily trigger time, "HH:MM"
    pub schedule_at: String,
    /// Pipeline parameters
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            schedule_at: "05:00".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ForecastError::ConfigError(format!("reading {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the `DATABASE_URL` environment variable, if set
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database_url = Some(url);
            }
        }
        self
    }

    /// Parsed daily trigger time
    pub fn schedule_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.schedule_at, "%H:%M").map_err(|e| {
            ForecastError::ConfigError(format!("schedule_at '{}': {}", self.schedule_at, e))
        })
    }

    /// Store URL, required for store-backed runs
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            ForecastError::ConfigError(format!(
                "no database_url configured and {} is not set",
                DATABASE_URL_ENV
            ))
        })
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.schedule_time()?;
        self.pipeline.validate()
    }
}

/// Parameters of one pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Days forecast per run, starting at the as-of date
    pub horizon_days: u32,
    /// Days of history read before the as-of date
    pub lookback_days: u32,
    /// Minimum training samples per meal
    pub min_training_rows: usize,
    /// Trailing window `k` for rolling features
    pub rolling_window: usize,
    /// Tag written with every prediction
    pub model_version: String,
    /// Share of samples held out for validation
    pub validation_fraction: f64,
    pub forest: ForestConfig,
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            lookback_days: 365,
            min_training_rows: 14,
            rolling_window: 7,
            model_version: "v1_random_forest".to_string(),
            validation_fraction: 0.2,
            forest: ForestConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(ForecastError::ConfigError(
                "horizon_days must be positive".to_string(),
            ));
        }
        if self.lookback_days == 0 {
            return Err(ForecastError::ConfigError(
                "lookback_days must be positive".to_string(),
            ));
        }
        if self.min_training_rows < 2 {
            return Err(ForecastError::ConfigError(
                "min_training_rows must be at least 2".to_string(),
            ));
        }
        if self.rolling_window == 0 {
            return Err(ForecastError::ConfigError(
                "rolling_window must be positive".to_string(),
            ));
        }
        if self.model_version.trim().is_empty() {
            return Err(ForecastError::ConfigError(
                "model_version must not be empty".to_string(),
            ));
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(ForecastError::ConfigError(format!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        if self.forest.n_trees == 0 {
            return Err(ForecastError::ConfigError(
                "forest.n_trees must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ForecastError::ConfigError(
                "retry.max_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Candidate features per split; all features when unset
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
        }
    }
}

/// Store retry settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 250,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Policy used by store calls
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}
