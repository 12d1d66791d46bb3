//! Training engine implementation

use super::config::{ModelType, TrainingConfig};
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::metrics::{self, ClassificationReport, ConfusionMatrix, Evaluation};
use super::random_forest::{MaxFeatures, RandomForest};
use crate::error::{Result, TurnoverError};
use crate::utils::{is_numeric, Timer};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Enum to hold trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
}

impl TrainedModel {
    pub fn model_type(&self) -> ModelType {
        match self {
            TrainedModel::RandomForest(_) => ModelType::RandomForest,
            TrainedModel::GradientBoosting(_) => ModelType::GradientBoosting,
        }
    }

    /// Number of input features the model expects
    pub fn n_features(&self) -> usize {
        match self {
            TrainedModel::RandomForest(m) => m.n_features(),
            TrainedModel::GradientBoosting(m) => m.n_features(),
        }
    }

    /// Predicted labels, 0 or 1
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::RandomForest(m) => m.predict(x),
            TrainedModel::GradientBoosting(m) => m.predict(x),
        }
    }

    /// Class probabilities as an `[n, 2]` matrix, columns ordered (0, 1)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let positive = self.positive_proba(x)?;
        let mut proba = Array2::zeros((positive.len(), 2));
        for (mut row, &p) in proba.rows_mut().into_iter().zip(positive.iter()) {
            row[0] = 1.0 - p;
            row[1] = p;
        }
        Ok(proba)
    }

    /// Probability of the positive class (`left = 1`)
    pub fn positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::RandomForest(m) => {
                let proba = m.predict_proba(x)?;
                match m.classes().iter().position(|&c| c == 1.0) {
                    Some(col) => Ok(proba.index_axis(Axis(1), col).to_owned()),
                    None => Ok(Array1::zeros(x.nrows())),
                }
            }
            TrainedModel::GradientBoosting(m) => m.predict_proba(x),
        }
    }

    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            TrainedModel::RandomForest(m) => m.feature_importances().cloned(),
            TrainedModel::GradientBoosting(m) => {
                let imp = m.feature_importances();
                if imp.is_empty() {
                    None
                } else {
                    Some(Array1::from_vec(imp.to_vec()))
                }
            }
        }
    }

    /// Hyperparameters as display strings, for metadata and logs
    pub fn hyperparameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        match self {
            TrainedModel::RandomForest(m) => {
                params.insert("n_estimators".to_string(), m.n_estimators.to_string());
                params.insert(
                    "max_depth".to_string(),
                    m.max_depth.map_or_else(|| "none".to_string(), |d| d.to_string()),
                );
                params.insert("max_features".to_string(), format!("{:?}", m.max_features).to_lowercase());
                params.insert("criterion".to_string(), format!("{:?}", m.criterion).to_lowercase());
                params.insert("bootstrap".to_string(), m.bootstrap.to_string());
                if let Some(seed) = m.random_state {
                    params.insert("random_state".to_string(), seed.to_string());
                }
            }
            TrainedModel::GradientBoosting(m) => {
                let c = m.config();
                params.insert("n_estimators".to_string(), c.n_estimators.to_string());
                params.insert("learning_rate".to_string(), c.learning_rate.to_string());
                params.insert("max_depth".to_string(), c.max_depth.to_string());
                params.insert("subsample".to_string(), c.subsample.to_string());
                if let Some(seed) = c.random_state {
                    params.insert("random_state".to_string(), seed.to_string());
                }
            }
        }
        params
    }
}

/// One feature and its normalized importance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

fn validate_training_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(TurnoverError::TrainingError(format!(
            "empty training input ({} rows, {} features)",
            x.nrows(),
            x.ncols()
        )));
    }
    if x.nrows() != y.len() {
        return Err(TurnoverError::TrainingError(format!(
            "feature matrix has {} rows but label vector has {}",
            x.nrows(),
            y.len()
        )));
    }
    if let Some(((row, col), v)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(TurnoverError::TrainingError(format!(
            "non-finite feature value {} at row {}, column {}",
            v, row, col
        )));
    }
    if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(TurnoverError::TrainingError(format!(
            "labels must be 0 or 1, found {}",
            bad
        )));
    }
    let n_pos = y.iter().filter(|&&v| v == 1.0).count();
    if n_pos == 0 || n_pos == y.len() {
        return Err(TurnoverError::TrainingError(
            "training labels contain a single class".to_string(),
        ));
    }
    Ok(())
}

/// Fit the configured classifier
pub fn train(x: &Array2<f64>, y: &Array1<f64>, config: &TrainingConfig) -> Result<TrainedModel> {
    config.validate()?;
    validate_training_input(x, y)?;

    let timer = Timer::start();
    let model = match config.model_type {
        ModelType::RandomForest => {
            let mut model = RandomForest::new(config.resolved_n_estimators())
                .with_max_depth(config.resolved_max_depth())
                .with_max_features(MaxFeatures::Sqrt)
                .with_bootstrap(true)
                .with_criterion(config.criterion)
                .with_random_state(config.random_state);
            model.fit(x, y)?;
            TrainedModel::RandomForest(model)
        }
        ModelType::GradientBoosting => {
            let gb_config = GradientBoostingConfig {
                n_estimators: config.resolved_n_estimators(),
                learning_rate: config.resolved_learning_rate(),
                max_depth: config.resolved_max_depth(),
                random_state: Some(config.random_state),
                ..Default::default()
            };
            let mut model = GradientBoostingClassifier::new(gb_config);
            model.fit(x, y)?;
            TrainedModel::GradientBoosting(model)
        }
    };

    info!(
        model = %config.model_type,
        n_samples = x.nrows(),
        n_features = x.ncols(),
        elapsed_secs = timer.elapsed_secs(),
        "Model trained"
    );

    Ok(model)
}

/// Score a fitted model on labelled rows
pub fn evaluate(model: &TrainedModel, x: &Array2<f64>, y: &Array1<f64>) -> Result<Evaluation> {
    let y_pred = model.predict(x)?;
    let scores = model.positive_proba(x)?;

    let accuracy = metrics::accuracy(y, &y_pred)?;
    let roc_auc = metrics::roc_auc(y, &scores)?;
    let confusion = ConfusionMatrix::from_predictions(y, &y_pred)?;
    let report = ClassificationReport::from_confusion(&confusion);

    info!(accuracy, roc_auc, n_samples = y.len(), "Model evaluated");

    Ok(Evaluation {
        accuracy,
        roc_auc,
        report,
        confusion,
    })
}

/// Pair importances with names, highest first; ties keep column order
pub fn rank_importances(model: &TrainedModel, feature_names: &[String]) -> Result<Vec<FeatureImportance>> {
    if feature_names.len() != model.n_features() {
        return Err(TurnoverError::ShapeError {
            expected: format!("{} feature names", model.n_features()),
            actual: format!("{} feature names", feature_names.len()),
        });
    }
    let importances = model.feature_importances().ok_or(TurnoverError::ModelNotFitted)?;

    let mut ranking: Vec<FeatureImportance> = feature_names
        .iter()
        .zip(importances.iter())
        .map(|(name, &importance)| FeatureImportance {
            feature: name.clone(),
            importance,
        })
        .collect();
    ranking.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    Ok(ranking)
}

fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name).map_err(|_| {
        TurnoverError::FeatureEngineeringError(format!("column '{}' not found", name))
    })?;
    if !is_numeric(column.dtype()) {
        return Err(TurnoverError::TrainingError(format!(
            "column '{}' has non-numeric type {}",
            name,
            column.dtype()
        )));
    }
    if column.null_count() > 0 {
        return Err(TurnoverError::TrainingError(format!(
            "column '{}' has {} missing values",
            name,
            column.null_count()
        )));
    }

    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| TurnoverError::TrainingError(e.to_string()))?;
    let values: Vec<f64> = casted
        .f64()
        .map_err(|e| TurnoverError::TrainingError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    if values.iter().any(|v| v.is_nan()) {
        return Err(TurnoverError::TrainingError(format!(
            "column '{}' contains NaN",
            name
        )));
    }
    Ok(values)
}

/// Extract named columns into a row-major matrix
pub fn feature_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let col_data: Vec<Vec<f64>> = columns
        .iter()
        .map(|name| numeric_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    debug!(rows = df.height(), cols = columns.len(), "Built feature matrix");

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((df.height(), columns.len()), |(r, c)| col_refs[c][r]))
}

/// Extract the label column
pub fn label_vector(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    Ok(Array1::from_vec(numeric_values(df, target)?))
}
