//! Forensic report assembly: summary counts and CSV export

use crate::error::{Result, TriageError};
use crate::severity::{AugmentedDataset, Severity, SEVERITY_COLUMN};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row counts of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForensicSummary {
    pub total_rows: usize,
    pub suspicious_rows: usize,
}

impl ForensicSummary {
    pub fn normal_rows(&self) -> usize {
        self.total_rows.saturating_sub(self.suspicious_rows)
    }

    pub fn has_anomalies(&self) -> bool {
        self.suspicious_rows > 0
    }

    /// One-line verdict for the analyst
    pub fn verdict(&self) -> &'static str {
        if self.has_anomalies() {
            "Potential anomalies detected!"
        } else {
            "Dataset appears normal."
        }
    }
}

impl fmt::Display for ForensicSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows analyzed, {} suspicious",
            self.total_rows, self.suspicious_rows
        )
    }
}

/// Row count per severity category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    pub normal: usize,
    pub suspicious: usize,
}

impl SeverityDistribution {
    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Normal => self.normal,
            Severity::Suspicious => self.suspicious,
        }
    }

    /// Categories present, most frequent first
    pub fn ranked(&self) -> Vec<(Severity, usize)> {
        let mut entries: Vec<(Severity, usize)> = [Severity::Normal, Severity::Suspicious]
            .into_iter()
            .map(|s| (s, self.count(s)))
            .filter(|&(_, n)| n > 0)
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

/// Count rows per severity, read from the `severity` column
pub fn distribution(augmented: &AugmentedDataset) -> Result<SeverityDistribution> {
    let column = augmented.frame().column(SEVERITY_COLUMN)?;
    let values = column.str()?;

    let mut dist = SeverityDistribution::default();
    for value in values.into_iter().flatten() {
        match Severity::parse(value) {
            Some(Severity::Normal) => dist.normal += 1,
            Some(Severity::Suspicious) => dist.suspicious += 1,
            None => {
                return Err(TriageError::DataError(format!(
                    "unexpected severity value '{}'",
                    value
                )))
            }
        }
    }
    Ok(dist)
}

/// Total rows and rows whose severity is `Suspicious`
pub fn summarize(augmented: &AugmentedDataset) -> Result<ForensicSummary> {
    let dist = distribution(augmented)?;
    Ok(ForensicSummary {
        total_rows: augmented.height(),
        suspicious_rows: dist.suspicious,
    })
}

/// Serialize the full augmented dataset as CSV with a header row
pub fn export(augmented: &AugmentedDataset) -> Result<Vec<u8>> {
    let mut frame = augmented.frame().clone();
    let mut buf = Vec::new();

    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut frame)
        .map_err(|e| TriageError::SerializationFailure(e.to_string()))?;

    Ok(buf)
}
