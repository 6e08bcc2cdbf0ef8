//! Triage configuration
//!
//! The three analyst-facing variants (interactive, upload, local) differ only
//! in how features are chosen, the contamination rate, and whether the input
//! is subsampled. They are expressed here as presets of one [`TriageConfig`].

use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Column required by the fixed-feature presets
pub const BYTES_TRANSFERRED: &str = "bytes_transferred";

/// Expected proportion of anomalous rows, strictly inside (0, 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ContaminationRate(f64);

impl ContaminationRate {
    /// Rate used by the fixed-feature variants
    pub const DEFAULT: ContaminationRate = ContaminationRate(0.02);
    /// Slider default of the interactive variant
    pub const INTERACTIVE_DEFAULT_PERCENT: u8 = 5;
    /// Bounds of the analyst control, in percent
    pub const MIN_PERCENT: u8 = 1;
    pub const MAX_PERCENT: u8 = 40;

    /// Create a rate from a fraction in (0, 1)
    pub fn new(rate: f64) -> Result<Self> {
        if rate.is_finite() && rate > 0.0 && rate < 1.0 {
            Ok(Self(rate))
        } else {
            Err(TriageError::invalid_parameter(
                "contamination",
                rate,
                "must be a fraction strictly between 0 and 1",
            ))
        }
    }

    /// Create a rate from the analyst's integer percent control (1..=40)
    pub fn from_percent(percent: u8) -> Result<Self> {
        if (Self::MIN_PERCENT..=Self::MAX_PERCENT).contains(&percent) {
            Ok(Self(f64::from(percent) / 100.0))
        } else {
            Err(TriageError::invalid_parameter(
                "contamination_percent",
                percent,
                format!("must be between {} and {}", Self::MIN_PERCENT, Self::MAX_PERCENT),
            ))
        }
    }

    /// Fraction value
    pub fn value(self) -> f64 {
        self.0
    }

    /// Rate rendered as a percentage
    pub fn percent(self) -> f64 {
        self.0 * 100.0
    }

    /// Number of rows to flag out of `n_rows`, rounded half away from zero
    pub fn outlier_count(self, n_rows: usize) -> usize {
        ((self.0 * n_rows as f64).round() as usize).min(n_rows)
    }
}

impl Default for ContaminationRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for ContaminationRate {
    type Error = TriageError;

    fn try_from(rate: f64) -> Result<Self> {
        Self::new(rate)
    }
}

impl From<ContaminationRate> for f64 {
    fn from(rate: ContaminationRate) -> Self {
        rate.0
    }
}

/// How the feature set is chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureMode {
    /// Every numeric column except a prior run's `anomaly` output
    AutoNumeric,
    /// A single named column, which must be present
    Fixed(String),
}

impl Default for FeatureMode {
    fn default() -> Self {
        FeatureMode::AutoNumeric
    }
}

/// Configuration for one triage run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Expected proportion of anomalous rows
    pub contamination: ContaminationRate,

    /// Feature selection mode
    pub feature_mode: FeatureMode,

    /// Columns that must exist before any computation starts
    pub required_columns: Vec<String>,

    /// Number of isolation trees
    pub n_estimators: usize,

    /// Subsample size per tree
    pub max_samples: usize,

    /// Seed for the forest and for collaborator subsampling
    pub seed: u64,

    /// Subsample the input down to this many rows before analysis
    pub sample_limit: Option<usize>,

    /// Stem of the exported report file name (`<stem>_report.csv`)
    pub report_stem: String,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            contamination: ContaminationRate::DEFAULT,
            feature_mode: FeatureMode::AutoNumeric,
            required_columns: Vec::new(),
            n_estimators: 100,
            max_samples: 256,
            seed: 42,
            sample_limit: None,
            report_stem: "forensic_analysis".to_string(),
        }
    }
}

impl TriageConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Interactive variant: all numeric columns, analyst-controlled rate (default 5%)
    pub fn interactive() -> Self {
        Self {
            contamination: ContaminationRate(
                f64::from(ContaminationRate::INTERACTIVE_DEFAULT_PERCENT) / 100.0,
            ),
            ..Self::default()
        }
    }

    /// Upload variant: `bytes_transferred` only, fixed 2%
    pub fn upload() -> Self {
        Self {
            feature_mode: FeatureMode::Fixed(BYTES_TRANSFERRED.to_string()),
            required_columns: vec![BYTES_TRANSFERRED.to_string()],
            report_stem: "upload".to_string(),
            ..Self::default()
        }
    }

    /// Local-file variant: as upload, but subsampled to 50 000 rows
    pub fn local() -> Self {
        Self {
            sample_limit: Some(50_000),
            report_stem: "local".to_string(),
            ..Self::upload()
        }
    }

    /// Builder method to set the contamination rate
    pub fn with_contamination(mut self, contamination: ContaminationRate) -> Self {
        self.contamination = contamination;
        self
    }

    /// Builder method to set the feature mode
    pub fn with_feature_mode(mut self, mode: FeatureMode) -> Self {
        self.feature_mode = mode;
        self
    }

    /// Builder method to require a column
    pub fn with_required_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.required_columns.contains(&column) {
            self.required_columns.push(column);
        }
        self
    }

    /// Builder method to set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set the per-tree subsample size
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n;
        self
    }

    /// Builder method to set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the subsampling limit
    pub fn with_sample_limit(mut self, limit: Option<usize>) -> Self {
        self.sample_limit = limit;
        self
    }

    /// Builder method to set the report stem
    pub fn with_report_stem(mut self, stem: impl Into<String>) -> Self {
        self.report_stem = stem.into();
        self
    }

    /// Apply `TRIAGE_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(percent) = env_parse::<u8>("TRIAGE_CONTAMINATION_PERCENT") {
            match ContaminationRate::from_percent(percent) {
                Ok(rate) => self.contamination = rate,
                Err(e) => warn!(error = %e, "Ignoring TRIAGE_CONTAMINATION_PERCENT"),
            }
        }
        if let Some(seed) = env_parse("TRIAGE_SEED") {
            self.seed = seed;
        }
        if let Some(n) = env_parse("TRIAGE_N_ESTIMATORS") {
            self.n_estimators = n;
        }
        if let Some(limit) = env_parse("TRIAGE_SAMPLE_LIMIT") {
            self.sample_limit = Some(limit);
        }
        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(TriageError::invalid_parameter(
                "n_estimators",
                self.n_estimators,
                "must be at least 1",
            ));
        }
        if self.max_samples == 0 {
            return Err(TriageError::invalid_parameter(
                "max_samples",
                self.max_samples,
                "must be at least 1",
            ));
        }
        if self.sample_limit == Some(0) {
            return Err(TriageError::invalid_parameter(
                "sample_limit",
                0,
                "must be at least 1 when set",
            ));
        }
        if let FeatureMode::Fixed(column) = &self.feature_mode {
            if column.trim().is_empty() {
                return Err(TriageError::invalid_parameter(
                    "feature",
                    column,
                    "fixed feature column must be named",
                ));
            }
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
