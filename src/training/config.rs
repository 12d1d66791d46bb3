//! Training configuration

use super::decision_tree::Criterion;
use crate::error::{Result, TurnoverError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of classifier to train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Bagged decision trees
    #[default]
    RandomForest,
    /// Boosted shallow regression trees on the log loss
    GradientBoosting,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::RandomForest => "random_forest",
            ModelType::GradientBoosting => "gradient_boosting",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = TurnoverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" | "rf" => Ok(ModelType::RandomForest),
            "gradient_boosting" | "gb" => Ok(ModelType::GradientBoosting),
            other => Err(TurnoverError::ConfigError(format!(
                "unknown model type '{}', expected random_forest or gradient_boosting",
                other
            ))),
        }
    }
}

/// Configuration for model training.
///
/// `None` fields fall back to the per-model defaults: 200 trees of depth 10
/// for the forest, 150 stages of depth 3 at learning rate 0.1 for boosting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Model type to train
    pub model_type: ModelType,

    /// Random seed for reproducibility
    pub random_state: u64,

    /// Number of trees or boosting stages
    pub n_estimators: Option<usize>,

    /// Maximum depth of trees
    pub max_depth: Option<usize>,

    /// Learning rate (boosting only)
    pub learning_rate: Option<f64>,

    /// Split criterion (forest only)
    pub criterion: Criterion,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::RandomForest,
            random_state: 42,
            n_estimators: None,
            max_depth: None,
            learning_rate: None,
            criterion: Criterion::Gini,
        }
    }
}

impl TrainingConfig {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            ..Default::default()
        }
    }

    /// Builder method to set model type
    pub fn with_model(mut self, model_type: ModelType) -> Self {
        self.model_type = model_type;
        self
    }

    /// Builder method to set number of estimators
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = Some(n);
        self
    }

    /// Builder method to set max depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Builder method to set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = Some(lr);
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Builder method to set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn resolved_n_estimators(&self) -> usize {
        self.n_estimators.unwrap_or(match self.model_type {
            ModelType::RandomForest => 200,
            ModelType::GradientBoosting => 150,
        })
    }

    pub fn resolved_max_depth(&self) -> usize {
        self.max_depth.unwrap_or(match self.model_type {
            ModelType::RandomForest => 10,
            ModelType::GradientBoosting => 3,
        })
    }

    pub fn resolved_learning_rate(&self) -> f64 {
        self.learning_rate.unwrap_or(0.1)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.resolved_n_estimators() == 0 {
            return Err(TurnoverError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.resolved_max_depth() == 0 {
            return Err(TurnoverError::InvalidParameter {
                name: "max_depth".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let lr = self.resolved_learning_rate();
        if !(lr > 0.0 && lr <= 1.0) {
            return Err(TurnoverError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: lr.to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.model_type, ModelType::RandomForest);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.resolved_n_estimators(), 200);
        assert_eq!(config.resolved_max_depth(), 10);
    }

    #[test]
    fn test_boosting_defaults() {
        let config = TrainingConfig::new(ModelType::GradientBoosting);
        assert_eq!(config.resolved_n_estimators(), 150);
        assert_eq!(config.resolved_max_depth(), 3);
        assert_eq!(config.resolved_learning_rate(), 0.1);
    }

    #[test]
    fn test_builder_pattern() {
        let config = TrainingConfig::default()
            .with_model(ModelType::GradientBoosting)
            .with_n_estimators(20)
            .with_max_depth(2)
            .with_learning_rate(0.3)
            .with_random_state(7);

        assert_eq!(config.resolved_n_estimators(), 20);
        assert_eq!(config.resolved_max_depth(), 2);
        assert_eq!(config.resolved_learning_rate(), 0.3);
        assert_eq!(config.random_state, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_trees() {
        let config = TrainingConfig::default().with_n_estimators(0);
        assert!(matches!(config.validate(), Err(TurnoverError::InvalidParameter { .. })));
    }

    #[test]
    fn test_model_type_parsing() {
        assert_eq!("rf".parse::<ModelType>().unwrap(), ModelType::RandomForest);
        assert_eq!("gradient-boosting".parse::<ModelType>().unwrap(), ModelType::GradientBoosting);
        assert!("svm".parse::<ModelType>().is_err());
        assert_eq!(ModelType::GradientBoosting.to_string(), "gradient_boosting");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainingConfig = serde_json::from_str(r#"{"model_type": "gradient_boosting"}"#).unwrap();
        assert_eq!(config.model_type, ModelType::GradientBoosting);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.criterion, Criterion::Gini);
    }
}
