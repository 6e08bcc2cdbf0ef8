//! Numeric feature selection

use super::ColumnType;
use crate::config::FeatureMode;
use crate::error::{Result, TriageError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the label column a prior run appends; never re-scored
pub const PRIOR_LABEL_COLUMN: &str = "anomaly";

/// Ordered, non-empty set of columns eligible for numeric analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    columns: Vec<String>,
}

impl FeatureSet {
    /// Build a feature set, rejecting an empty one
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(TriageError::NoNumericFeatures);
        }
        Ok(Self { columns })
    }

    /// Column names in dataset order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|s| s.as_str())
    }
}

/// Fail with `MissingRequiredColumn` for the first absent column
pub fn check_required_columns(df: &DataFrame, required: &[String]) -> Result<()> {
    for name in required {
        if df.column(name).is_err() {
            return Err(TriageError::MissingRequiredColumn(name.clone()));
        }
    }
    Ok(())
}

/// Select the feature set for a dataset
///
/// `AutoNumeric` keeps every integer or float column in original order,
/// dropping any column named `anomaly` (case-insensitive). `Fixed` keeps the
/// single named column, which must exist and be numeric.
pub fn select_features(df: &DataFrame, mode: &FeatureMode) -> Result<FeatureSet> {
    let columns = match mode {
        FeatureMode::AutoNumeric => df
            .get_columns()
            .iter()
            .filter(|col| ColumnType::of(col.dtype()).is_numeric())
            .map(|col| col.name().to_string())
            .filter(|name| !name.eq_ignore_ascii_case(PRIOR_LABEL_COLUMN))
            .collect(),
        FeatureMode::Fixed(name) => {
            let column = df
                .column(name)
                .map_err(|_| TriageError::MissingRequiredColumn(name.clone()))?;
            if ColumnType::of(column.dtype()).is_numeric() {
                vec![name.clone()]
            } else {
                Vec::new()
            }
        }
    };

    debug!(features = ?columns, "Selected numeric features");
    FeatureSet::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_frame() -> DataFrame {
        df!(
            "timestamp" => &["t1", "t2", "t3"],
            "bytes_transferred" => &[10i64, 20, 30],
            "protocol" => &["tcp", "udp", "tcp"],
            "duration" => &[0.5, 1.5, 2.5],
            "Anomaly" => &[1i32, -1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_auto_numeric_preserves_order_and_drops_prior_labels() {
        let features = select_features(&log_frame(), &FeatureMode::AutoNumeric).unwrap();
        assert_eq!(features.columns(), &["bytes_transferred", "duration"]);
    }

    #[test]
    fn test_text_only_rejected() {
        let df = df!("user" => &["a", "b"], "action" => &["login", "logout"]).unwrap();
        let err = select_features(&df, &FeatureMode::AutoNumeric).unwrap_err();
        assert!(matches!(err, TriageError::NoNumericFeatures));
    }

    #[test]
    fn test_fixed_mode() {
        let mode = FeatureMode::Fixed("bytes_transferred".to_string());
        let features = select_features(&log_frame(), &mode).unwrap();
        assert_eq!(features.len(), 1);

        let missing = FeatureMode::Fixed("packets".to_string());
        let err = select_features(&log_frame(), &missing).unwrap_err();
        assert!(matches!(err, TriageError::MissingRequiredColumn(c) if c == "packets"));

        let text = FeatureMode::Fixed("protocol".to_string());
        assert!(matches!(
            select_features(&log_frame(), &text),
            Err(TriageError::NoNumericFeatures)
        ));
    }

    #[test]
    fn test_required_columns() {
        let df = log_frame();
        assert!(check_required_columns(&df, &["duration".to_string()]).is_ok());
        let err = check_required_columns(&df, &["bytes_transferred".to_string(), "dst_port".to_string()])
            .unwrap_err();
        assert!(matches!(err, TriageError::MissingRequiredColumn(c) if c == "dst_port"));
    }
}
