//! Forensic Triage - anomaly detection for tabular security logs
//!
//! This crate flags statistically anomalous rows in structured log data:
//! - Numeric feature selection and standard scaling
//! - Unsupervised Isolation Forest scoring under a contamination rate
//! - Severity labelling, summary counts and CSV report export
//!
//! # Modules
//!
//! ## Core
//! - [`preprocessing`] - Feature selection and scaling
//! - [`anomaly`] - Isolation Forest scoring
//! - [`severity`] - `anomaly` / `severity` columns
//! - [`report`] - Forensic summary and CSV export
//! - [`pipeline`] - The end-to-end run
//!
//! ## Front ends
//! - [`dataset`] - CSV loading and reproducible subsampling
//! - [`cli`] - Command-line interface
//! - [`server`] - HTTP upload API

// Core error handling
pub mod error;
pub mod config;

// Core pipeline
pub mod preprocessing;
pub mod anomaly;
pub mod severity;
pub mod report;
pub mod pipeline;

// Front ends
pub mod dataset;
pub mod cli;
pub mod server;

pub use error::{Result, TriageError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Result, TriageError};
    pub use crate::config::{ContaminationRate, FeatureMode, TriageConfig};
    pub use crate::preprocessing::{select_features, FeatureSet, StandardScaler};
    pub use crate::anomaly::{score, AnomalyDetector, AnomalyLabel, IsolationForest};
    pub use crate::severity::{classify, AugmentedDataset, Severity};
    pub use crate::report::{export, summarize, ForensicSummary, SeverityDistribution};
    pub use crate::pipeline::{analyze, TriageOutcome, TriagePipeline};
    pub use crate::dataset::{load_csv, parse_csv};
}
