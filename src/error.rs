//! Error types for the turnover predictor

use thiserror::Error;

/// Result type alias for turnover operations
pub type Result<T> = std::result::Result<T, TurnoverError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum TurnoverError {
    #[error("Data load error: {0}")]
    DataLoadError(String),

    #[error("Feature engineering error: {0}")]
    FeatureEngineeringError(String),

    #[error("Insufficient data: {0}")]
    InsufficientDataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<serde_json::Error> for TurnoverError {
    fn from(err: serde_json::Error) -> Self {
        TurnoverError::ConfigError(err.to_string())
    }
}

impl From<bincode::Error> for TurnoverError {
    fn from(err: bincode::Error) -> Self {
        TurnoverError::PersistenceError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TurnoverError {
    fn from(err: ndarray::ShapeError) -> Self {
        TurnoverError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
