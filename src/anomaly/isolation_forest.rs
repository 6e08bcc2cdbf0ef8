//! Isolation Forest anomaly detection

use crate::anomaly::{AnomalyDetector, AnomalyLabel};
use crate::config::ContaminationRate;
use crate::error::{Result, TriageError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Spread below which a feature is treated as constant
const MIN_SPREAD: f64 = 1e-10;

/// Isolation Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IsolationTree {
    /// Internal node with split
    Internal {
        /// Feature index for split
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Left subtree (values < threshold)
        left: Box<IsolationTree>,
        /// Right subtree (values >= threshold)
        right: Box<IsolationTree>,
    },
    /// External (leaf) node
    External {
        /// Number of samples in this node
        size: usize,
    },
}

impl IsolationTree {
    /// Build an isolation tree over the rows in `indices`
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = indices.len();

        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        // Only features that still vary within this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (lo, hi) = indices
                    .iter()
                    .map(|&i| x[[i, feature]])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
                (hi - lo >= MIN_SPREAD).then_some((feature, lo, hi))
            })
            .collect();

        let Some(&(feature, min_val, max_val)) = candidates.choose(rng) else {
            return IsolationTree::External { size: n_samples };
        };

        let threshold = rng.gen_range(min_val..max_val);

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] < threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let left = Box::new(Self::build(x, &left_indices, height + 1, max_height, rng));
        let right = Box::new(Self::build(x, &right_indices, height + 1, max_height, rng));

        IsolationTree::Internal {
            feature,
            threshold,
            left,
            right,
        }
    }

    /// Path length of a sample, with the leaf-size correction `c(size)`
    pub fn path_length(&self, sample: ArrayView1<f64>, current_height: usize) -> f64 {
        match self {
            IsolationTree::External { size } => current_height as f64 + Self::c(*size),
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, current_height + 1)
                } else {
                    right.path_length(sample, current_height + 1)
                }
            }
        }
    }

    /// Average path length of an unsuccessful BST search over `n` points:
    /// c(n) = 2 H(n-1) - 2(n-1)/n, with H(i) ~ ln(i) + gamma
    pub fn c(n: usize) -> f64 {
        match n {
            0 | 1 => 0.0,
            2 => 1.0,
            _ => {
                let n_f = n as f64;
                2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
            }
        }
    }
}

/// Isolation Forest anomaly detector
///
/// Every tree is grown on a subsample drawn without replacement from a single
/// `ChaCha8Rng` seeded from `seed`, so identical input and settings always
/// produce identical scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Number of trees
    n_estimators: usize,
    /// Maximum samples per tree
    max_samples: usize,
    /// Expected proportion of outliers
    contamination: ContaminationRate,
    /// Random seed
    seed: u64,
    /// Fitted trees
    trees: Option<Vec<IsolationTree>>,
    /// Decision threshold on the anomaly score
    threshold: Option<f64>,
    /// Subsample size used for fitting
    n_samples: Option<usize>,
    /// Labels assigned to the training rows
    fitted_labels: Option<Vec<AnomalyLabel>>,
}

impl IsolationForest {
    /// Create new Isolation Forest
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: ContaminationRate::DEFAULT,
            seed: super::DEFAULT_SEED,
            trees: None,
            threshold: None,
            n_samples: None,
            fitted_labels: None,
        }
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Set maximum samples per tree
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(1);
        self
    }

    /// Set contamination ratio
    pub fn with_contamination(mut self, contamination: ContaminationRate) -> Self {
        self.contamination = contamination;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of trees grown by `fit`
    pub fn n_trees(&self) -> usize {
        self.trees.as_ref().map_or(0, Vec::len)
    }

    /// Anomaly score s(x) = 2^(-E[h(x)] / c(psi)), in (0, 1], higher is more anomalous
    fn compute_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trees = self.trees.as_ref().ok_or_else(|| {
            TriageError::DataError("isolation forest used before fit".to_string())
        })?;

        let c_n = IsolationTree::c(self.n_samples.unwrap_or(self.max_samples));
        if c_n <= 0.0 {
            // A single training row carries no isolation information
            return Ok(Array1::from_elem(x.nrows(), 0.5));
        }

        let scores = x
            .axis_iter(Axis(0))
            .map(|row| {
                let avg_path_length = trees
                    .iter()
                    .map(|tree| tree.path_length(row, 0))
                    .sum::<f64>()
                    / trees.len() as f64;
                2.0_f64.powf(-avg_path_length / c_n)
            })
            .collect();

        Ok(scores)
    }

    /// Label the `outlier_count(n)` highest-scoring rows as outliers.
    /// Ties are broken by row order, so the count `fit_predict` returns is
    /// exact. The returned threshold is the score of the last flagged row.
    fn rank_labels(&self, scores: &Array1<f64>) -> (Vec<AnomalyLabel>, f64) {
        let n = scores.len();
        let k = self.contamination.outlier_count(n);
        let mut labels = vec![AnomalyLabel::Inlier; n];

        if k == 0 {
            return (labels, f64::INFINITY);
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });

        for &i in &order[..k] {
            labels[i] = AnomalyLabel::Outlier;
        }
        (labels, scores[order[k - 1]])
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

/// True when no feature varies across the rows, so no split is possible
fn is_degenerate(x: &Array2<f64>) -> bool {
    x.axis_iter(Axis(1)).all(|col| {
        let (lo, hi) = col
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        hi - lo < MIN_SPREAD
    })
}

impl AnomalyDetector for IsolationForest {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples == 0 || x.ncols() == 0 {
            return Err(TriageError::ShapeError {
                expected: "at least one row and one column".to_string(),
                actual: format!("{} x {}", n_samples, x.ncols()),
            });
        }

        let samples_per_tree = self.max_samples.min(n_samples);
        let max_height = (samples_per_tree as f64).log2().ceil().max(1.0) as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let trees: Vec<IsolationTree> = (0..self.n_estimators)
            .map(|_| {
                let indices = index::sample(&mut rng, n_samples, samples_per_tree).into_vec();
                IsolationTree::build(x, &indices, 0, max_height, &mut rng)
            })
            .collect();

        self.trees = Some(trees);
        self.n_samples = Some(samples_per_tree);

        let scores = self.compute_scores(x)?;
        let (labels, threshold) = if n_samples < 2 || is_degenerate(x) {
            // Nothing distinguishes the rows from one another
            (vec![AnomalyLabel::Inlier; n_samples], f64::INFINITY)
        } else {
            self.rank_labels(&scores)
        };

        debug!(
            n_trees = self.n_estimators,
            samples_per_tree = samples_per_tree,
            max_height = max_height,
            threshold = threshold,
            "Fitted isolation forest"
        );

        self.threshold = Some(threshold);
        self.fitted_labels = Some(labels);
        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.compute_scores(x)
    }

    /// Flag every row scoring at or above the fitted threshold
    ///
    /// Rows tied with the last ranked outlier are all flagged, so on the
    /// training rows this can exceed the exact count of `fit_predict`.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<AnomalyLabel>> {
        let scores = self.score_samples(x)?;
        let threshold = self.threshold();

        Ok(scores
            .iter()
            .map(|&s| {
                if s >= threshold {
                    AnomalyLabel::Outlier
                } else {
                    AnomalyLabel::Inlier
                }
            })
            .collect())
    }

    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Vec<AnomalyLabel>> {
        self.fit(x)?;
        self.fitted_labels
            .clone()
            .ok_or_else(|| TriageError::DataError("isolation forest produced no labels".to_string()))
    }

    fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(f64::INFINITY)
    }
}
