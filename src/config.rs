//! Analysis configuration from environment variables

use crate::cohort::{AgeBucket, AgeBuckets, CohortBucket, CohortThresholds};
use crate::reconstruct::AnalysisWindow;
use crate::source::types::parse_period;
use chrono::NaiveDate;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Jsonl,
    Sqlite,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Jsonl => "jsonl",
            BackendType::Sqlite => "sqlite",
        }
    }

    /// Parse `--backend <jsonl|sqlite>` from the process arguments
    pub fn parse_backend_from_args() -> BackendType {
        let args: Vec<String> = env::args().collect();
        Self::parse_backend(&args)
    }

    pub fn parse_backend(args: &[String]) -> BackendType {
        if let Some(idx) = args.iter().position(|x| x == "--backend") {
            match args.get(idx + 1).map(|s| s.as_str()) {
                Some("sqlite") => return BackendType::Sqlite,
                Some("jsonl") => return BackendType::Jsonl,
                _ => {}
            }
        }

        BackendType::Jsonl // Default to JSONL
    }
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// SQLite database holding observations and role tables
    pub db_path: String,

    /// Directory for JSONL output, or SQLite file for the sqlite backend
    pub output_path: String,

    pub start_period: NaiveDate,
    pub end_period: NaiveDate,

    /// Minimum balance for a holder to count as significant
    pub significance_floor: f64,

    /// Fixed supply that per-day balances are normalized to
    pub known_total_quantity: f64,

    pub cohort_thresholds: CohortThresholds,
    pub age_buckets: AgeBuckets,

    /// Trailing days in the velocity baseline
    pub rolling_baseline_window_days: usize,

    /// Parallel reconstruction tasks
    pub shard_count: usize,
}

impl AnalysisConfig {
    /// Defaults for everything except the window
    pub fn new(start_period: NaiveDate, end_period: NaiveDate) -> Self {
        Self {
            db_path: "data/holdflow.db".to_string(),
            output_path: "data/reports".to_string(),
            start_period,
            end_period,
            significance_floor: 1.0,
            known_total_quantity: 1_000_000_000.0,
            cohort_thresholds: CohortThresholds::standard(),
            age_buckets: AgeBuckets::standard(),
            rolling_baseline_window_days: 30,
            shard_count: 4,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `HOLDFLOW_DB_PATH` (default: data/holdflow.db)
    /// - `HOLDFLOW_OUTPUT_PATH` (default: data/reports)
    /// - `ANALYSIS_START`, `ANALYSIS_END` (required, YYYY-MM-DD)
    /// - `SIGNIFICANCE_FLOOR` (default: 1.0)
    /// - `KNOWN_TOTAL_QUANTITY` (default: 1000000000)
    /// - `COHORT_THRESHOLDS` (e.g. `0.0001:shrimp,0.001:crab,1:whale`)
    /// - `AGE_BUCKETS` (e.g. `0:fresh,7:week,30:month`)
    /// - `BASELINE_WINDOW_DAYS` (default: 30)
    /// - `RECONSTRUCT_SHARDS` (default: 4)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env` over an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let start_period = required_period(&lookup, "ANALYSIS_START")?;
        let end_period = required_period(&lookup, "ANALYSIS_END")?;
        let mut config = Self::new(start_period, end_period);

        if let Some(path) = lookup("HOLDFLOW_DB_PATH") {
            config.db_path = path;
        }
        if let Some(path) = lookup("HOLDFLOW_OUTPUT_PATH") {
            config.output_path = path;
        }

        config.significance_floor =
            parsed_or(&lookup, "SIGNIFICANCE_FLOOR", config.significance_floor)?;
        config.known_total_quantity =
            parsed_or(&lookup, "KNOWN_TOTAL_QUANTITY", config.known_total_quantity)?;
        config.rolling_baseline_window_days = parsed_or(
            &lookup,
            "BASELINE_WINDOW_DAYS",
            config.rolling_baseline_window_days,
        )?;
        config.shard_count = parsed_or(&lookup, "RECONSTRUCT_SHARDS", config.shard_count)?;

        if let Some(raw) = lookup("COHORT_THRESHOLDS") {
            config.cohort_thresholds = parse_cohort_thresholds(&raw)?;
        }
        if let Some(raw) = lookup("AGE_BUCKETS") {
            config.age_buckets = parse_age_buckets(&raw)?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_period > self.end_period {
            return Err(ConfigError::InvalidValue(format!(
                "ANALYSIS_START {} is after ANALYSIS_END {}",
                self.start_period, self.end_period
            )));
        }

        if !(self.significance_floor >= 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "significance_floor must be >= 0, got {}",
                self.significance_floor
            )));
        }

        if !(self.known_total_quantity > 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "known_total_quantity must be > 0, got {}",
                self.known_total_quantity
            )));
        }

        if let Some(first) = self.cohort_thresholds.buckets().first() {
            if !(first.upper_bound > 0.0) {
                return Err(ConfigError::InvalidValue(
                    "cohort thresholds must be positive".to_string(),
                ));
            }
        }

        if self.rolling_baseline_window_days == 0 {
            return Err(ConfigError::InvalidValue(
                "rolling_baseline_window_days must be at least 1".to_string(),
            ));
        }

        if self.shard_count == 0 {
            return Err(ConfigError::InvalidValue(
                "shard_count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn window(&self) -> Result<AnalysisWindow, ConfigError> {
        AnalysisWindow::new(self.start_period, self.end_period).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "empty analysis window {}..{}",
                self.start_period, self.end_period
            ))
        })
    }
}

fn required_period<F>(lookup: &F, name: &str) -> Result<NaiveDate, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name).ok_or_else(|| ConfigError::MissingVariable(name.to_string()))?;
    parse_period(&raw)
        .ok_or_else(|| ConfigError::InvalidValue(format!("{} must be YYYY-MM-DD, got '{}'", name, raw)))
}

fn parsed_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}: cannot parse '{}'", name, raw))),
    }
}

/// Split `"bound:label,bound:label"` into pairs
fn parse_pairs<T: FromStr>(name: &str, raw: &str) -> Result<Vec<(T, String)>, ConfigError> {
    raw.split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (bound, label) = entry.split_once(':').ok_or_else(|| {
                ConfigError::InvalidValue(format!("{}: expected bound:label, got '{}'", name, entry))
            })?;
            let bound = bound.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(format!("{}: invalid bound in '{}'", name, entry))
            })?;
            Ok((bound, label.trim().to_string()))
        })
        .collect()
}

pub fn parse_cohort_thresholds(raw: &str) -> Result<CohortThresholds, ConfigError> {
    let buckets = parse_pairs::<f64>("COHORT_THRESHOLDS", raw)?
        .into_iter()
        .map(|(upper_bound, label)| CohortBucket { upper_bound, label })
        .collect();

    CohortThresholds::new(buckets).ok_or_else(|| {
        ConfigError::InvalidValue(
            "COHORT_THRESHOLDS must be non-empty and strictly ascending".to_string(),
        )
    })
}

pub fn parse_age_buckets(raw: &str) -> Result<AgeBuckets, ConfigError> {
    let buckets = parse_pairs::<i64>("AGE_BUCKETS", raw)?
        .into_iter()
        .map(|(max_days, label)| AgeBucket { max_days, label })
        .collect();

    AgeBuckets::new(buckets).ok_or_else(|| {
        ConfigError::InvalidValue(
            "AGE_BUCKETS must be non-empty and strictly ascending".to_string(),
        )
    })
}
