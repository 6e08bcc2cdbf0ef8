//! Standard scaling of the feature matrix

use super::FeatureSet;
use crate::error::{Result, TriageError};
use ndarray::{Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fitted statistics for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    name: String,
    mean: f64,
    std: f64, // population std (ddof = 0)
}

/// Zero-mean, unit-variance scaler fitted once per run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

/// Extract the selected columns as an `f64` matrix, missing values filled with 0.0
pub fn feature_matrix(df: &DataFrame, features: &FeatureSet) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let mut matrix = Array2::<f64>::zeros((n_rows, features.len()));

    for (j, name) in features.iter().enumerate() {
        let column = df
            .column(name)
            .map_err(|_| TriageError::MissingRequiredColumn(name.to_string()))?
            .cast(&DataType::Float64)?;
        let ca = column.f64()?;

        for (i, value) in ca.into_iter().enumerate() {
            matrix[[i, j]] = match value {
                Some(v) if v.is_finite() => v,
                _ => 0.0,
            };
        }
    }

    Ok(matrix)
}

impl StandardScaler {
    /// Create a new, unfitted scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit per-column mean and population standard deviation
    pub fn fit(&mut self, df: &DataFrame, features: &FeatureSet) -> Result<&mut Self> {
        let x = feature_matrix(df, features)?;
        self.fit_matrix(&x, features)?;
        Ok(self)
    }

    /// Scale the selected columns of `df` with the fitted statistics
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(TriageError::DataError("scaler used before fit".to_string()));
        }
        let names: Vec<String> = self.params.iter().map(|p| p.name.clone()).collect();
        let features = FeatureSet::new(names)?;
        let x = feature_matrix(df, &features)?;
        Ok(self.apply(x))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, features: &FeatureSet) -> Result<Array2<f64>> {
        let x = feature_matrix(df, features)?;
        self.fit_matrix(&x, features)?;
        Ok(self.apply(x))
    }

    /// Fitted means in feature order
    pub fn means(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.mean).collect()
    }

    /// Fitted population standard deviations in feature order
    pub fn stds(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.std).collect()
    }

    fn fit_matrix(&mut self, x: &Array2<f64>, features: &FeatureSet) -> Result<()> {
        if x.ncols() != features.len() {
            return Err(TriageError::ShapeError {
                expected: format!("{} columns", features.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let n = x.nrows() as f64;
        self.params = features
            .iter()
            .zip(x.axis_iter(Axis(1)))
            .map(|(name, col)| {
                let (mean, std) = if col.is_empty() {
                    (0.0, 0.0)
                } else {
                    let mean = col.sum() / n;
                    let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                    // Variance within the accumulated rounding error of the mean is zero
                    let bound = n * f64::EPSILON * var + (n * mean * f64::EPSILON).powi(2);
                    (mean, if var <= bound { 0.0 } else { var.sqrt() })
                };
                ScalerParams {
                    name: name.to_string(),
                    mean,
                    std,
                }
            })
            .collect();
        self.is_fitted = true;

        debug!(
            means = ?self.means(),
            stds = ?self.stds(),
            "Fitted standard scaler"
        );
        Ok(())
    }

    fn apply(&self, mut x: Array2<f64>) -> Array2<f64> {
        for (mut col, params) in x.axis_iter_mut(Axis(1)).zip(&self.params) {
            if params.std != 0.0 && params.std.is_finite() {
                col.mapv_inplace(|v| (v - params.mean) / params.std);
            } else {
                // Constant column
                col.fill(0.0);
            }
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(names: &[&str]) -> FeatureSet {
        FeatureSet::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_standard_scaler() {
        let df = df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        let mut scaler = StandardScaler::new();
        let x = scaler.fit_transform(&df, &features(&["a"])).unwrap();

        let mean = x.column(0).sum() / 5.0;
        let var = x.column(0).iter().map(|v| v * v).sum::<f64>() / 5.0;
        assert!(mean.abs() < 1e-10);
        assert!((var - 1.0).abs() < 1e-10);
        // population std of 1..=5 is sqrt(2)
        assert!((scaler.stds()[0] - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let df = df!("flat" => &[7i64, 7, 7, 7], "b" => &[1.0, 2.0, 3.0, 4.0]).unwrap();

        let mut scaler = StandardScaler::new();
        let x = scaler.fit_transform(&df, &features(&["flat", "b"])).unwrap();

        assert!(x.column(0).iter().all(|&v| v == 0.0));
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_rounding_noise_treated_as_constant() {
        let df = df!("a" => &[0.1, 0.1, 0.1]).unwrap();
        let x = StandardScaler::new().fit_transform(&df, &features(&["a"])).unwrap();
        assert!(x.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_small_magnitude_column_is_scaled() {
        let df = df!("a" => &[0.0, 1e-13, 2e-13, 3e-13]).unwrap();
        let mut scaler = StandardScaler::new();
        let x = scaler.fit_transform(&df, &features(&["a"])).unwrap();

        assert!(scaler.stds()[0] > 0.0);
        assert!(x[[0, 0]] < 0.0 && x[[3, 0]] > 0.0);
        assert!((x[[3, 0]] + x[[0, 0]]).abs() < 1e-9);
    }

    #[test]
    fn test_large_mean_small_spread_is_scaled() {
        let df = df!("ts" => &[1.7e9, 1.7e9 + 1e-4, 1.7e9 + 2e-4, 1.7e9 + 3e-4]).unwrap();
        let mut scaler = StandardScaler::new();
        let x = scaler.fit_transform(&df, &features(&["ts"])).unwrap();

        assert!(scaler.stds()[0] > 0.0);
        let col = x.column(0).to_vec();
        assert!(col.windows(2).all(|w| w[0] < w[1]));
        assert!(col.iter().all(|v| v.abs() < 2.0));
    }

    #[test]
    fn test_missing_values_filled_with_zero() {
        let df = df!("a" => &[Some(4.0), None, Some(2.0)]).unwrap();
        let x = feature_matrix(&df, &features(&["a"])).unwrap();
        assert_eq!(x.column(0).to_vec(), vec![4.0, 0.0, 2.0]);
    }

    #[test]
    fn test_integer_columns_are_cast() {
        let df = df!("n" => &[1i32, 3]).unwrap();
        let x = feature_matrix(&df, &features(&["n"])).unwrap();
        assert_eq!(x.dim(), (2, 1));
        assert_eq!(x[[1, 0]], 3.0);
    }

    #[test]
    fn test_transform_reuses_fitted_statistics() {
        let train = df!("a" => &[0.0, 10.0]).unwrap();
        let other = df!("a" => &[5.0, 15.0]).unwrap();

        let mut scaler = StandardScaler::new();
        scaler.fit(&train, &features(&["a"])).unwrap();
        let x = scaler.transform(&other).unwrap();

        assert_eq!(x.column(0).to_vec(), vec![0.0, 2.0]);
    }

    #[test]
    fn test_transform_before_fit() {
        let df = df!("a" => &[1.0]).unwrap();
        assert!(StandardScaler::new().transform(&df).is_err());
    }
}
