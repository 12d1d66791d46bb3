//! Model serialization utilities
//!
//! A persisted model is a bincode envelope: magic bytes, format version,
//! metadata, the bincode-encoded model and an FNV-1a checksum of that payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, TurnoverError};
use crate::training::{Evaluation, ModelType, TrainedModel};

/// Model metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,
    /// Model type
    pub model_type: ModelType,
    /// Training timestamp (RFC 3339)
    pub trained_at: String,
    /// Feature names, in matrix column order
    pub feature_names: Vec<String>,
    /// Target name
    pub target_name: String,
    /// Hyperparameters
    pub hyperparameters: BTreeMap<String, String>,
    /// Held-out metrics
    pub metrics: BTreeMap<String, f64>,
    /// Label encoding vocabulary per categorical column, in code order
    pub categorical_vocab: BTreeMap<String, Vec<String>>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: "turnover_model".to_string(),
            model_type: ModelType::default(),
            trained_at: String::new(),
            feature_names: Vec::new(),
            target_name: "left".to_string(),
            hyperparameters: BTreeMap::new(),
            metrics: BTreeMap::new(),
            categorical_vocab: BTreeMap::new(),
        }
    }
}

impl ModelMetadata {
    /// Create new metadata with name, stamped with the current time
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trained_at: chrono::Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }

    /// Metadata describing a freshly trained model
    pub fn for_model(model: &TrainedModel) -> Self {
        Self {
            model_type: model.model_type(),
            hyperparameters: model.hyperparameters(),
            ..Self::new("turnover_model")
        }
    }

    /// Set feature names
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.feature_names = features;
        self
    }

    /// Set target name
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_name = target.into();
        self
    }

    /// Record the vocabulary used to label encode `column`
    pub fn with_vocabulary(mut self, column: impl Into<String>, vocabulary: Vec<String>) -> Self {
        self.categorical_vocab.insert(column.into(), vocabulary);
        self
    }

    /// Add metric
    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    /// Record accuracy, ROC-AUC and the weighted F1
    pub fn with_evaluation(self, eval: &Evaluation) -> Self {
        self.add_metric("accuracy", eval.accuracy)
            .add_metric("roc_auc", eval.roc_auc)
            .add_metric("f1_weighted", eval.report.weighted_avg.f1)
    }
}

/// Serializable model wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedModel {
    /// Magic bytes for format detection
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    /// Model metadata
    pub metadata: ModelMetadata,
    /// Serialized model data
    pub model_data: Vec<u8>,
    /// Checksum for integrity verification
    pub checksum: u64,
}

impl SerializedModel {
    /// Magic bytes for turnover model files
    pub const MAGIC: [u8; 4] = [b'T', b'R', b'N', b'M'];
    /// Current format version
    pub const VERSION: u32 = 1;

    /// Create new serialized model
    pub fn new(metadata: ModelMetadata, model_data: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&model_data);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            model_data,
            checksum,
        }
    }

    /// Compute checksum using FNV-1a hash
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    /// Verify checksum
    pub fn verify_checksum(&self) -> bool {
        Self::compute_checksum(&self.model_data) == self.checksum
    }
}

fn persistence_error(context: &str, path: &Path, err: impl std::fmt::Display) -> TurnoverError {
    TurnoverError::PersistenceError(format!("{} {}: {}", context, path.display(), err))
}

/// Write a model and its metadata to `path`, replacing any existing file.
///
/// Missing parent directories are created. Returns the number of bytes written.
pub fn persist(model: &TrainedModel, metadata: &ModelMetadata, path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();

    let model_data = bincode::serialize(model)
        .map_err(|e| persistence_error("failed to encode model for", path, e))?;
    let envelope = SerializedModel::new(metadata.clone(), model_data);
    let bytes = bincode::serialize(&envelope)
        .map_err(|e| persistence_error("failed to encode envelope for", path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| persistence_error("failed to create directory for", path, e))?;
    }

    let file = File::create(path).map_err(|e| persistence_error("failed to create", path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| persistence_error("failed to write", path, e))?;

    info!(
        path = %path.display(),
        bytes = bytes.len(),
        model = %metadata.model_type,
        "Model saved"
    );

    Ok(bytes.len() as u64)
}

/// Read a model written by [`persist`]
pub fn load(path: impl AsRef<Path>) -> Result<(TrainedModel, ModelMetadata)> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| persistence_error("failed to read", path, e))?;

    if bytes.len() < 4 || bytes[..4] != SerializedModel::MAGIC {
        return Err(persistence_error(
            "not a turnover model file:",
            path,
            "bad magic bytes",
        ));
    }

    let envelope: SerializedModel = bincode::deserialize(&bytes)
        .map_err(|e| persistence_error("corrupt model file", path, e))?;

    if envelope.format_version != SerializedModel::VERSION {
        return Err(persistence_error(
            "unsupported format version in",
            path,
            envelope.format_version,
        ));
    }
    if !envelope.verify_checksum() {
        return Err(persistence_error("checksum mismatch in", path, "payload altered"));
    }

    let model: TrainedModel = bincode::deserialize(&envelope.model_data)
        .map_err(|e| persistence_error("failed to decode model in", path, e))?;

    debug!(
        path = %path.display(),
        model = %envelope.metadata.model_type,
        trained_at = %envelope.metadata.trained_at,
        "Model loaded"
    );

    Ok((model, envelope.metadata))
}
