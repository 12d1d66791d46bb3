//! End-to-end turnover pipeline
//!
//! Load, engineer, split, train, evaluate, rank and persist, strictly in that
//! order. Any failing stage aborts the run before later stages execute.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::export::{self, ModelMetadata};
use crate::feature_engineering::{
    department_vocabulary, encode_department_with, engineer_features, DEPARTMENT_COLUMN,
};
use crate::training::{
    self, evaluate, feature_matrix, label_vector, rank_importances, train_test_split, Evaluation,
    FeatureImportance, ModelType,
};
use crate::utils::{DataLoader, Timer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of a full run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub n_records: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub model_type: ModelType,
    pub evaluation: Evaluation,
    pub importances: Vec<FeatureImportance>,
    pub model_path: PathBuf,
    pub model_bytes: u64,
    pub elapsed_secs: f64,
}

impl PipelineReport {
    /// The `k` most important features
    pub fn top_importances(&self, k: usize) -> &[FeatureImportance] {
        &self.importances[..k.min(self.importances.len())]
    }
}

/// Sequential train-and-persist driver
#[derive(Debug, Clone)]
pub struct TurnoverPipeline {
    config: PipelineConfig,
}

impl TurnoverPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<PipelineReport> {
        self.config.validate()?;
        let timer = Timer::start();
        let config = &self.config;

        let raw = DataLoader::load_auto(&config.data_path)?;
        let departments = department_vocabulary(&raw)?;
        let df = engineer_features(&raw)?;

        let x = feature_matrix(&df, &config.feature_columns)?;
        let y = label_vector(&df, &config.target_column)?;

        let split = train_test_split(&y, config.test_size, config.random_state)?;
        let (x_train, x_test, y_train, y_test) = split.apply(&x, &y);
        info!(
            n_train = split.n_train(),
            n_test = split.n_test(),
            positives = y.iter().filter(|&&v| v == 1.0).count(),
            "Split employee records"
        );

        let training_config = config.training.clone().with_random_state(config.random_state);
        let model = training::train(&x_train, &y_train, &training_config)?;

        let evaluation = evaluate(&model, &x_test, &y_test)?;
        let importances = rank_importances(&model, &config.feature_columns)?;

        let mut metadata = ModelMetadata::for_model(&model)
            .with_features(config.feature_columns.clone())
            .with_target(config.target_column.clone())
            .with_evaluation(&evaluation);
        if let Some(vocabulary) = departments {
            metadata = metadata.with_vocabulary(DEPARTMENT_COLUMN, vocabulary);
        }
        let model_bytes = export::persist(&model, &metadata, &config.model_path)?;

        let report = PipelineReport {
            n_records: df.height(),
            n_train: split.n_train(),
            n_test: split.n_test(),
            model_type: model.model_type(),
            evaluation,
            importances,
            model_path: config.model_path.clone(),
            model_bytes,
            elapsed_secs: timer.elapsed_secs(),
        };

        info!(
            accuracy = report.evaluation.accuracy,
            roc_auc = report.evaluation.roc_auc,
            elapsed_secs = report.elapsed_secs,
            "Pipeline finished"
        );

        Ok(report)
    }
}

/// Score a persisted model against a labelled CSV.
///
/// Features are engineered the same way as in training and selected using
/// the names stored in the model metadata. Departments are coded with the
/// training vocabulary; a department the model never saw is an error.
pub fn evaluate_saved(
    model_path: impl AsRef<Path>,
    data_path: impl AsRef<Path>,
) -> Result<(ModelMetadata, Evaluation)> {
    let (model, metadata) = export::load(model_path)?;

    let mut raw = DataLoader::load_auto(data_path)?;
    if let Some(vocabulary) = metadata.categorical_vocab.get(DEPARTMENT_COLUMN) {
        raw = encode_department_with(&raw, vocabulary)?;
    }
    let df = engineer_features(&raw)?;
    let x = feature_matrix(&df, &metadata.feature_names)?;
    let y = label_vector(&df, &metadata.target_name)?;

    let evaluation = evaluate(&model, &x, &y)?;
    Ok((metadata, evaluation))
}
