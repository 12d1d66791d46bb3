//! Turnover Predictor - employee attrition classifier
//!
//! This crate trains a binary classifier predicting whether an employee will
//! leave, from tabular HR records:
//! - CSV loading into polars DataFrames
//! - Pure, idempotent feature derivation (tenure, performance, workload)
//! - Stratified splitting and tree-ensemble training (random forest, gradient boosting)
//! - Accuracy, ROC-AUC and per-class evaluation, feature importance ranking
//! - A checksummed binary model format
//!
//! # Modules
//!
//! - [`utils`] - Data loading and small helpers
//! - [`feature_engineering`] - Derived turnover features
//! - [`training`] - Classifiers, splitting and metrics
//! - [`export`] - Model persistence
//! - [`pipeline`] - End-to-end run
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Pipeline stages
pub mod utils;
pub mod feature_engineering;
pub mod training;
pub mod export;
pub mod pipeline;

// Services
pub mod cli;

pub use error::{Result, TurnoverError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{PipelineConfig, DEFAULT_FEATURE_COLUMNS};
    pub use crate::error::{Result, TurnoverError};
    pub use crate::export::{load, persist, ModelMetadata};
    pub use crate::feature_engineering::{engineer_features, TenureCategory};
    pub use crate::pipeline::{evaluate_saved, PipelineReport, TurnoverPipeline};
    pub use crate::training::{
        evaluate, feature_matrix, label_vector, rank_importances, train, train_test_split,
        Evaluation, FeatureImportance, ModelType, TrainedModel, TrainingConfig,
    };
    pub use crate::utils::DataLoader;
}
