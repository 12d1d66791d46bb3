//! Pipeline configuration

use crate::error::{Result, TurnoverError};
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Columns fed to the classifier when none are configured
pub const DEFAULT_FEATURE_COLUMNS: [&str; 10] = [
    "age",
    "tenure_months",
    "department_encoded",
    "salary",
    "satisfaction_score",
    "last_review_score",
    "projects_count",
    "avg_hours_per_week",
    "promotion_due",
    "overworked",
];

/// End-to-end run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input CSV
    pub data_path: PathBuf,
    /// Where the trained model is written
    pub model_path: PathBuf,
    /// Binary label column
    pub target_column: String,
    /// Feature columns, in matrix order
    pub feature_columns: Vec<String>,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed for the split
    pub random_state: u64,
    /// Rows shown in the importance table
    pub top_k: usize,
    /// Classifier settings
    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/employee_data.csv"),
            model_path: PathBuf::from("models/turnover_model.bin"),
            target_column: "left".to_string(),
            feature_columns: DEFAULT_FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            test_size: 0.2,
            random_state: 42,
            top_k: 10,
            training: TrainingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TurnoverError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_feature_columns(mut self, columns: Vec<String>) -> Self {
        self.feature_columns = columns;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Seeds both the split and the model
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self.training.random_state = seed;
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(TurnoverError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must be strictly between 0 and 1".to_string(),
            });
        }
        if self.feature_columns.is_empty() {
            return Err(TurnoverError::ConfigError(
                "at least one feature column is required".to_string(),
            ));
        }
        if self.feature_columns.iter().any(|c| c == &self.target_column) {
            return Err(TurnoverError::ConfigError(format!(
                "target column '{}' is also listed as a feature",
                self.target_column
            )));
        }
        self.training.validate()
    }
}
