//! Data preprocessing module
//!
//! Turns a raw log table into the numeric matrix the scorer consumes:
//! - Numeric feature selection (auto-detect or a fixed column)
//! - Missing value filling and standard scaling

pub mod feature_selection;
mod scaler;

pub use feature_selection::{check_required_columns, select_features, FeatureSet};
pub use scaler::{feature_matrix, StandardScaler};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column data type as seen by the triage pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Other,
}

impl ColumnType {
    /// Classify a polars dtype
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                ColumnType::Integer
            }
            DataType::Float32 | DataType::Float64 => ColumnType::Float,
            DataType::String => ColumnType::Text,
            _ => ColumnType::Other,
        }
    }

    /// Whether the column may feed the scorer
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_of() {
        assert_eq!(ColumnType::of(&DataType::Int64), ColumnType::Integer);
        assert_eq!(ColumnType::of(&DataType::UInt16), ColumnType::Integer);
        assert_eq!(ColumnType::of(&DataType::Float32), ColumnType::Float);
        assert_eq!(ColumnType::of(&DataType::String), ColumnType::Text);
        assert_eq!(ColumnType::of(&DataType::Boolean), ColumnType::Other);
        assert!(!ColumnType::Text.is_numeric());
    }

    #[test]
    fn test_column_type_serialize() {
        let json = serde_json::to_string(&ColumnType::Float).unwrap();
        assert_eq!(json, "\"Float\"");
    }
}
