//! Gradient Boosting implementation
//!
//! Binary classifier boosting shallow regression trees on the log-loss
//! gradient. Each stage fits a tree to the residuals `y - p`, sets every
//! leaf to the Newton step `sum(y - p) / sum(p(1 - p))` over its rows and
//! shifts the log odds by `learning_rate` times the tree output.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decision_tree::DecisionTree;
use crate::error::{Result, TurnoverError};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio
    pub colsample_bytree: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 150,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

fn sigmoid(log_odds: f64) -> f64 {
    1.0 / (1.0 + (-log_odds).exp())
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial_log_odds: f64,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            col_indices_per_tree: Vec::new(),
            initial_log_odds: 0.0,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Fit binary classification; labels must be 0 or 1
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(TurnoverError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(TurnoverError::TrainingError(
                "gradient boosting expects 0/1 labels".to_string(),
            ));
        }
        self.validate_config()?;

        // Clamp so a single-class sample does not produce infinite log odds
        let p = y.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        self.initial_log_odds = (p / (1.0 - p)).ln();
        self.n_features = n_features;
        self.trees.clear();
        self.col_indices_per_tree.clear();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.feature_importances = vec![0.0; n_features];

        for _ in 0..self.config.n_estimators {
            let proba = log_odds.mapv(sigmoid);
            // Negative gradient of the log loss
            let residuals = y - &proba;

            let sample_indices = self.subsample_indices(n_samples, &mut rng);
            let col_indices = self.colsample_indices(n_features, &mut rng);

            let (x_sub, y_sub) = self.subsample_data(x, &residuals, &sample_indices, &col_indices);
            let hessian_sub: Vec<f64> = sample_indices
                .iter()
                .map(|&i| proba[i] * (1.0 - proba[i]))
                .collect();

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_sub, &y_sub)?;
            // One Newton step per leaf: sum(r) / sum(p(1 - p))
            tree.refit_leaves(&x_sub, |rows| {
                let numerator: f64 = rows.iter().map(|&i| y_sub[i]).sum();
                let denominator: f64 = rows.iter().map(|&i| hessian_sub[i]).sum();
                if denominator.abs() < 1e-150 {
                    0.0
                } else {
                    numerator / denominator
                }
            })?;

            // Every row moves, including rows left out of this stage's subsample
            let tree_pred = tree.predict(&x.select(Axis(1), &col_indices))?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);

            if let Some(tree_importance) = tree.feature_importances() {
                for (j, &col_idx) in col_indices.iter().enumerate() {
                    self.feature_importances[col_idx] += tree_importance[j];
                }
            }

            self.trees.push(tree);
            self.col_indices_per_tree.push(col_indices);
        }

        // Normalize feature importances
        let total: f64 = self.feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= total;
            }
        }

        debug!(
            stages = self.trees.len(),
            initial_log_odds = self.initial_log_odds,
            "Gradient boosting fitted"
        );

        Ok(())
    }

    fn validate_config(&self) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| TurnoverError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        };
        if self.config.n_estimators == 0 {
            return Err(invalid("n_estimators", "0".into(), "at least one stage is required"));
        }
        if !(self.config.learning_rate > 0.0) {
            return Err(invalid(
                "learning_rate",
                self.config.learning_rate.to_string(),
                "must be positive",
            ));
        }
        for (name, ratio) in [
            ("subsample", self.config.subsample),
            ("colsample_bytree", self.config.colsample_bytree),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(invalid(name, ratio.to_string(), "must be in (0, 1]"));
            }
        }
        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.iter().map(|&p| if p >= 0.5 { 1.0 } else { 0.0 }).collect())
    }

    /// Predict the probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(TurnoverError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(TurnoverError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for (tree, col_indices) in self.trees.iter().zip(self.col_indices_per_tree.iter()) {
            let tree_pred = tree.predict(&x.select(Axis(1), col_indices))?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);
        }

        Ok(log_odds.mapv(sigmoid))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Number of input features the model was fitted on
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of fitted stages
    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        if self.config.subsample >= 1.0 {
            return indices;
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil().max(2.0) as usize;
        indices.shuffle(rng);
        indices.truncate(sample_size.min(n));
        indices.sort_unstable();
        indices
    }

    fn colsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        if self.config.colsample_bytree >= 1.0 {
            return indices;
        }
        let sample_size = ((n as f64) * self.config.colsample_bytree).ceil().max(1.0) as usize;
        indices.shuffle(rng);
        indices.truncate(sample_size.min(n));
        indices.sort_unstable();
        indices
    }

    fn subsample_data(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        row_indices: &[usize],
        col_indices: &[usize],
    ) -> (Array2<f64>, Array1<f64>) {
        let x_sub = x.select(Axis(0), row_indices).select(Axis(1), col_indices);
        let y_sub = y.select(Axis(0), row_indices);
        (x_sub, y_sub)
    }
}
