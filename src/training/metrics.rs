//! Classification metrics

use crate::error::{Result, TurnoverError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

fn check_lengths(y_true: &Array1<f64>, other: &Array1<f64>) -> Result<()> {
    if y_true.len() != other.len() {
        return Err(TurnoverError::ShapeError {
            expected: format!("{} values", y_true.len()),
            actual: format!("{} values", other.len()),
        });
    }
    if y_true.is_empty() {
        return Err(TurnoverError::InsufficientDataError(
            "cannot score an empty label vector".to_string(),
        ));
    }
    Ok(())
}

/// Fraction of predictions equal to the true label
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Area under the ROC curve for positive-class scores.
///
/// Computed as the Mann-Whitney U statistic; tied scores share their
/// average rank.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, scores)?;

    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&l| l > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(TurnoverError::InsufficientDataError(
            "ROC-AUC needs both classes present in the labels".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Ascending ranks, 1-based
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        rank_sum_pos += order[i..j].iter().filter(|&&idx| y_true[idx] > 0.5).count() as f64 * avg_rank;
        i = j;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Binary confusion counts, positive class = 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        let mut cm = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => cm.tp += 1,
                (false, true) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>8} {:>8}", "", "pred 0", "pred 1")?;
        writeln!(f, "{:>14} {:>8} {:>8}", "actual 0", self.tn, self.fp)?;
        write!(f, "{:>14} {:>8} {:>8}", "actual 1", self.fn_, self.tp)
    }
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(label: &str, tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            label: label.to_string(),
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

/// Per-class report with macro and support-weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn new(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        let cm = ConfusionMatrix::from_predictions(y_true, y_pred)?;
        Ok(Self::from_confusion(&cm))
    }

    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        // Class 0 treats the negatives as its positives
        let classes = vec![
            ClassMetrics::from_counts("0", cm.tn, cm.fn_, cm.fp),
            ClassMetrics::from_counts("1", cm.tp, cm.fp, cm.fn_),
        ];

        let total = cm.total();
        let n_classes = classes.len() as f64;
        let mean = |f: fn(&ClassMetrics) -> f64| classes.iter().map(f).sum::<f64>() / n_classes;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };

        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: mean(|c| c.precision),
            recall: mean(|c| c.recall),
            f1: mean(|c| c.f1),
            support: total,
        };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };
        let accuracy = if total == 0 {
            0.0
        } else {
            (cm.tp + cm.tn) as f64 / total as f64
        };

        Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
        }
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        m.label, m.precision, m.recall, m.f1, m.support
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for class in &self.classes {
            write_row(f, class)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        write_row(f, &self.macro_avg)?;
        write_row(f, &self.weighted_avg)
    }
}

/// Everything reported for a held-out set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub roc_auc: f64,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
}
