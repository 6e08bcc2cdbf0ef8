//! End-to-end triage pipeline
//!
//! required columns → feature selection → scaling → scoring → classification
//! → summary. Each run builds its own scaler and forest and keeps nothing
//! afterwards; repeated analysis is repeated calls to [`TriagePipeline::run`].

use crate::anomaly::{AnomalyDetector, IsolationForest};
use crate::config::TriageConfig;
use crate::dataset::{report_file_name, subsample};
use crate::error::Result;
use crate::preprocessing::{check_required_columns, select_features, FeatureSet, StandardScaler};
use crate::report::{self, ForensicSummary, SeverityDistribution};
use crate::severity::{classify, AugmentedDataset};
use polars::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything one run hands back to the front end
#[derive(Debug, Clone)]
pub struct TriageOutcome {
    /// Columns the scorer saw
    pub features: FeatureSet,
    /// Input rows plus `anomaly` and `severity`
    pub augmented: AugmentedDataset,
    pub summary: ForensicSummary,
    pub distribution: SeverityDistribution,
    /// Suggested export file name, `<stem>_report.csv`
    pub report_name: String,
    /// Wall-clock seconds spent in the run
    pub elapsed_secs: f64,
}

impl TriageOutcome {
    /// CSV bytes of the full augmented dataset
    ///
    /// A failure here leaves the outcome itself intact.
    pub fn export(&self) -> Result<Vec<u8>> {
        report::export(&self.augmented)
    }

    /// Serializable digest without the table itself
    pub fn digest(&self) -> OutcomeDigest {
        OutcomeDigest {
            features: self.features.columns().to_vec(),
            summary: self.summary,
            distribution: self.distribution,
            report_name: self.report_name.clone(),
        }
    }
}

/// Table-free view of an outcome
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeDigest {
    pub features: Vec<String>,
    pub summary: ForensicSummary,
    pub distribution: SeverityDistribution,
    pub report_name: String,
}

/// Configured triage pipeline
#[derive(Debug, Clone)]
pub struct TriagePipeline {
    config: TriageConfig,
}

impl TriagePipeline {
    /// Create a pipeline, rejecting invalid configuration
    pub fn new(config: TriageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    /// Subsample per the configured limit, then run the analysis
    pub fn run_sampled(&self, df: &DataFrame) -> Result<TriageOutcome> {
        match self.config.sample_limit {
            Some(limit) => self.run(&subsample(df, limit, self.config.seed)?),
            None => self.run(df),
        }
    }

    /// Analyze a fully materialized dataset
    pub fn run(&self, df: &DataFrame) -> Result<TriageOutcome> {
        let start = Instant::now();
        let config = &self.config;

        check_required_columns(df, &config.required_columns)?;
        let features = select_features(df, &config.feature_mode)?;
        info!(
            rows = df.height(),
            features = ?features.columns(),
            "Detected numeric features"
        );

        let labels = if df.height() == 0 {
            Vec::new()
        } else {
            let mut scaler = StandardScaler::new();
            let scaled = scaler.fit_transform(df, &features)?;
            debug!(shape = ?scaled.dim(), "Scaled feature matrix");

            let expected = config.contamination.outlier_count(df.height());
            if expected == 0 {
                warn!(
                    rows = df.height(),
                    contamination = config.contamination.value(),
                    "Contamination rounds to zero outliers for this dataset"
                );
            }

            let mut forest = IsolationForest::new()
                .with_n_estimators(config.n_estimators)
                .with_max_samples(config.max_samples)
                .with_contamination(config.contamination)
                .with_seed(config.seed);
            forest.fit_predict(&scaled)?
        };

        let augmented = classify(df, &labels)?;
        let distribution = report::distribution(&augmented)?;
        let summary = report::summarize(&augmented)?;
        let elapsed_secs = start.elapsed().as_secs_f64();

        info!(
            total_rows = summary.total_rows,
            suspicious_rows = summary.suspicious_rows,
            contamination = config.contamination.value(),
            elapsed_secs = elapsed_secs,
            "Triage run complete"
        );

        Ok(TriageOutcome {
            features,
            augmented,
            summary,
            distribution,
            report_name: report_file_name(&config.report_stem),
            elapsed_secs,
        })
    }
}

/// Run a one-off analysis with `config`
pub fn analyze(df: &DataFrame, config: &TriageConfig) -> Result<TriageOutcome> {
    TriagePipeline::new(config.clone())?.run(df)
}
