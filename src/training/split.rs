//! Stratified train/test splitting

use crate::error::{Result, TurnoverError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::debug;

/// Disjoint row index partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl TrainTestSplit {
    pub fn n_train(&self) -> usize {
        self.train_indices.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_indices.len()
    }

    /// Select rows for both partitions: `(x_train, x_test, y_train, y_test)`
    pub fn apply(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> (Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>) {
        (
            x.select(Axis(0), &self.train_indices),
            x.select(Axis(0), &self.test_indices),
            y.select(Axis(0), &self.train_indices),
            y.select(Axis(0), &self.test_indices),
        )
    }
}

/// Split row indices so each class keeps its share in both partitions.
///
/// The test partition holds `ceil(n * test_size)` rows, spread over classes
/// by largest remainder (ties go to the lower class label).
pub fn train_test_split(y: &Array1<f64>, test_size: f64, random_state: u64) -> Result<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TurnoverError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }

    let n_samples = y.len();

    // Group samples by class, in label order
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        class_indices.entry(val.round() as i64).or_default().push(idx);
    }

    if class_indices.len() < 2 {
        return Err(TurnoverError::InsufficientDataError(format!(
            "stratified split needs at least two classes, found {}",
            class_indices.len()
        )));
    }

    // Small epsilon keeps 100 * 0.2 from rounding up to 21
    let n_test = ((n_samples as f64 * test_size) - 1e-9).ceil() as usize;

    let quotas: Vec<f64> = class_indices
        .values()
        .map(|rows| rows.len() as f64 * n_test as f64 / n_samples as f64)
        .collect();
    let mut allocation: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();

    let mut leftover = n_test - allocation.iter().sum::<usize>();
    let mut by_remainder: Vec<usize> = (0..quotas.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &class_pos in &by_remainder {
        if leftover == 0 {
            break;
        }
        allocation[class_pos] += 1;
        leftover -= 1;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(random_state);
    let mut train_indices = Vec::with_capacity(n_samples - n_test);
    let mut test_indices = Vec::with_capacity(n_test);

    for ((&label, rows), &k) in class_indices.iter_mut().zip(allocation.iter()) {
        if k == 0 || k >= rows.len() {
            return Err(TurnoverError::InsufficientDataError(format!(
                "class {} has {} rows, cannot place {} in test and the rest in train",
                label,
                rows.len(),
                k
            )));
        }
        rows.shuffle(&mut rng);
        test_indices.extend_from_slice(&rows[..k]);
        train_indices.extend_from_slice(&rows[k..]);
    }

    train_indices.shuffle(&mut rng);
    test_indices.shuffle(&mut rng);

    debug!(
        n_train = train_indices.len(),
        n_test = test_indices.len(),
        classes = class_indices.len(),
        "Stratified split"
    );

    Ok(TrainTestSplit {
        train_indices,
        test_indices,
    })
}
