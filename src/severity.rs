//! Severity classification
//!
//! Appends the `anomaly` and `severity` columns to a copy of the input
//! dataset. Both columns are written from the same [`AnomalyLabel`] so they
//! cannot disagree.

use crate::anomaly::AnomalyLabel;
use crate::error::{Result, TriageError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the appended label column
pub const ANOMALY_COLUMN: &str = "anomaly";
/// Name of the appended severity column
pub const SEVERITY_COLUMN: &str = "severity";

/// Analyst-facing category of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Normal,
    Suspicious,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "Normal",
            Severity::Suspicious => "Suspicious",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Normal" => Some(Severity::Normal),
            "Suspicious" => Some(Severity::Suspicious),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input dataset plus the two derived columns
#[derive(Debug, Clone)]
pub struct AugmentedDataset {
    frame: DataFrame,
    labels: Vec<AnomalyLabel>,
}

impl AugmentedDataset {
    /// The augmented table
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Labels in row order
    pub fn labels(&self) -> &[AnomalyLabel] {
        &self.labels
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Only the suspicious rows, in original order
    pub fn suspicious(&self) -> Result<DataFrame> {
        let mask: BooleanChunked = self
            .labels
            .iter()
            .map(|label| label.is_outlier())
            .collect();
        Ok(self.frame.filter(&mask)?)
    }
}

/// Append `anomaly` (1 / -1) and `severity` (Normal / Suspicious) columns
///
/// Existing columns with exactly these names (a re-analyzed report) are
/// replaced in place; otherwise both are appended after the original columns.
pub fn classify(df: &DataFrame, labels: &[AnomalyLabel]) -> Result<AugmentedDataset> {
    if labels.len() != df.height() {
        return Err(TriageError::ShapeError {
            expected: format!("{} labels", df.height()),
            actual: format!("{} labels", labels.len()),
        });
    }

    let codes: Vec<i32> = labels.iter().map(|l| l.encoding()).collect();
    let severities: Vec<&str> = labels.iter().map(|l| l.severity().as_str()).collect();

    let mut frame = df.clone();
    frame.with_column(Series::new(ANOMALY_COLUMN.into(), codes))?;
    frame.with_column(Series::new(SEVERITY_COLUMN.into(), severities))?;

    Ok(AugmentedDataset {
        frame,
        labels: labels.to_vec(),
    })
}
