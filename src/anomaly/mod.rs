//! Anomaly detection module
//!
//! Unsupervised outlier scoring over the scaled feature matrix. The detector
//! ranks rows by anomaly score and flags the configured contamination
//! fraction as outliers.

mod isolation_forest;

pub use isolation_forest::{IsolationForest, IsolationTree};

use crate::config::ContaminationRate;
use crate::error::Result;
use crate::severity::Severity;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 42;

/// Binary outcome of scoring one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyLabel {
    Inlier,
    Outlier,
}

impl AnomalyLabel {
    /// Encoding written to the `anomaly` column for inliers
    pub const INLIER_CODE: i32 = 1;
    /// Encoding written to the `anomaly` column for outliers
    pub const OUTLIER_CODE: i32 = -1;

    pub fn is_outlier(self) -> bool {
        self == AnomalyLabel::Outlier
    }

    /// `1` for inliers, `-1` for outliers
    pub fn encoding(self) -> i32 {
        match self {
            AnomalyLabel::Inlier => Self::INLIER_CODE,
            AnomalyLabel::Outlier => Self::OUTLIER_CODE,
        }
    }

    /// Decode an `anomaly` column value
    pub fn from_encoding(code: i64) -> Option<Self> {
        match code {
            1 => Some(AnomalyLabel::Inlier),
            -1 => Some(AnomalyLabel::Outlier),
            _ => None,
        }
    }

    /// Severity category derived from this label
    pub fn severity(self) -> Severity {
        match self {
            AnomalyLabel::Inlier => Severity::Normal,
            AnomalyLabel::Outlier => Severity::Suspicious,
        }
    }
}

/// Anomaly detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Anomaly scores (higher = more anomalous)
    pub scores: Array1<f64>,
    /// One label per row, in row order
    pub labels: Vec<AnomalyLabel>,
    /// Threshold used for classification
    pub threshold: f64,
    /// Number of anomalies detected
    pub n_anomalies: usize,
}

/// Trait for anomaly detectors
pub trait AnomalyDetector: Send + Sync {
    /// Fit the detector on training data
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Compute anomaly scores for new data
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Label rows against the fitted threshold
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<AnomalyLabel>>;

    /// Fit and label the training rows in one step
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Vec<AnomalyLabel>> {
        self.fit(x)?;
        self.predict(x)
    }

    /// Get detection results with scores and labels
    fn detect(&self, x: &Array2<f64>) -> Result<AnomalyResult> {
        let scores = self.score_samples(x)?;
        let labels = self.predict(x)?;
        let threshold = self.threshold();
        let n_anomalies = labels.iter().filter(|l| l.is_outlier()).count();

        Ok(AnomalyResult {
            scores,
            labels,
            threshold,
            n_anomalies,
        })
    }

    /// Get the decision threshold
    fn threshold(&self) -> f64;
}

/// Score a scaled matrix with the default forest and a fixed seed
///
/// Returns one label per row in row order. An empty matrix yields no labels.
pub fn score(x: &Array2<f64>, contamination: ContaminationRate) -> Result<Vec<AnomalyLabel>> {
    if x.nrows() == 0 {
        return Ok(Vec::new());
    }
    IsolationForest::new()
        .with_contamination(contamination)
        .with_seed(DEFAULT_SEED)
        .fit_predict(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_encoding_round_trip() {
        for label in [AnomalyLabel::Inlier, AnomalyLabel::Outlier] {
            assert_eq!(AnomalyLabel::from_encoding(i64::from(label.encoding())), Some(label));
        }
        assert_eq!(AnomalyLabel::from_encoding(0), None);
    }

    #[test]
    fn test_label_severity() {
        assert_eq!(AnomalyLabel::Inlier.severity(), Severity::Normal);
        assert_eq!(AnomalyLabel::Outlier.severity(), Severity::Suspicious);
    }

    #[test]
    fn test_score_empty_matrix() {
        let x = Array2::<f64>::zeros((0, 1));
        assert!(score(&x, ContaminationRate::DEFAULT).unwrap().is_empty());
    }

    #[test]
    fn test_detect_counts_anomalies() {
        let mut data: Vec<f64> = (0..40).map(|i| (i % 8) as f64).collect();
        data.push(1_000.0);
        let x = Array2::from_shape_vec((41, 1), data).unwrap();

        let mut forest = IsolationForest::new()
            .with_contamination(ContaminationRate::new(0.02).unwrap());
        forest.fit(&x).unwrap();
        let result = forest.detect(&x).unwrap();

        assert_eq!(result.labels.len(), 41);
        assert_eq!(result.scores.len(), 41);
        assert!(result.labels[40].is_outlier());
        assert_eq!(result.n_anomalies, result.labels.iter().filter(|l| l.is_outlier()).count());
    }
}
