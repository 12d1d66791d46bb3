//! Decision tree implementation
//!
//! CART trees grown depth first. Each candidate feature is scanned once in
//! sorted order, accumulating left/right statistics so a node costs
//! O(n log n) per feature. Classification leaves keep the class distribution
//! of their samples so ensembles can average probabilities.

use crate::error::{Result, TurnoverError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
        /// Class distribution (classification only, empty for regression)
        class_proba: Vec<f64>,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    MSE,
}

/// Running statistics for one side of a candidate split
#[derive(Debug, Clone)]
struct SideStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Vec<f64>,
}

impl SideStats {
    fn new(n_classes: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: vec![0.0; n_classes],
        }
    }

    fn add(&mut self, target: f64, class_idx: Option<usize>) {
        self.count += 1;
        self.sum += target;
        self.sq_sum += target * target;
        if let Some(c) = class_idx {
            self.class_counts[c] += 1.0;
        }
    }

    fn remove(&mut self, target: f64, class_idx: Option<usize>) {
        self.count -= 1;
        self.sum -= target;
        self.sq_sum -= target * target;
        if let Some(c) = class_idx {
            self.class_counts[c] -= 1.0;
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| (c / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -self
                .class_counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| {
                    let p = c / n;
                    p * p.ln()
                })
                .sum::<f64>(),
            // Var = E[X²] - E[X]²
            Criterion::MSE => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

/// Borrowed training data shared by the recursive builder
struct BuildContext<'a> {
    x: &'a Array2<f64>,
    targets: &'a [f64],
    class_idx: Option<&'a [usize]>,
    n_classes: usize,
    importances: Vec<f64>,
    rng: ChaCha8Rng,
}

impl BuildContext<'_> {
    fn class_of(&self, i: usize) -> Option<usize> {
        self.class_idx.map(|c| c[i])
    }

    fn stats(&self, indices: &[usize]) -> SideStats {
        let mut stats = SideStats::new(self.n_classes);
        for &i in indices {
            stats.add(self.targets[i], self.class_of(i));
        }
        stats
    }
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Number of features drawn at random per split (None = all)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature sampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Is classification task
    is_classification: bool,
    /// Sorted class labels (for classification)
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            feature_importances: None,
            is_classification: true,
            classes: Vec::new(),
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fix the class labels instead of inferring them from `y`.
    ///
    /// Ensembles use this so every tree reports probabilities over the same
    /// classes even when a bootstrap sample misses one.
    pub fn with_classes(mut self, mut classes: Vec<f64>) -> Self {
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        self.classes = classes;
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(TurnoverError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        if n_samples < self.min_samples_split.max(1) {
            return Err(TurnoverError::TrainingError(format!(
                "Need at least {} samples, got {}",
                self.min_samples_split, n_samples
            )));
        }

        if n_features == 0 {
            return Err(TurnoverError::TrainingError(
                "cannot fit a tree without features".to_string(),
            ));
        }

        self.n_features = n_features;
        let targets: Vec<f64> = y.to_vec();

        let class_idx = if self.is_classification {
            if self.classes.is_empty() {
                let mut classes = targets.clone();
                classes.sort_by(f64::total_cmp);
                classes.dedup();
                self.classes = classes;
            }
            let encoded = targets
                .iter()
                .map(|&v| {
                    self.classes.iter().position(|&c| c == v).ok_or_else(|| {
                        TurnoverError::TrainingError(format!("label {} is not a known class", v))
                    })
                })
                .collect::<Result<Vec<usize>>>()?;
            Some(encoded)
        } else {
            None
        };

        let mut ctx = BuildContext {
            x,
            targets: &targets,
            class_idx: class_idx.as_deref(),
            n_classes: self.classes.len(),
            importances: vec![0.0; n_features],
            rng: ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0)),
        };

        let indices: Vec<usize> = (0..n_samples).collect();
        let root = self.build_tree(&mut ctx, indices, 0);

        // Normalize feature importances
        let mut importances = ctx.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        self.root = Some(root);
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(self)
    }

    fn build_tree(&self, ctx: &mut BuildContext<'_>, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let stats = ctx.stats(&indices);
        let impurity = stats.impurity(self.criterion);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= 1e-12;

        if should_stop {
            return self.make_leaf(&stats);
        }

        let Some((feature_idx, threshold, gain)) = self.find_best_split(ctx, &indices, &stats) else {
            return self.make_leaf(&stats);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| ctx.x[[i, feature_idx]] <= threshold);

        ctx.importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(ctx, left_indices, depth + 1));
        let right = Box::new(self.build_tree(ctx, right_indices, depth + 1));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Best (feature, threshold, impurity decrease) over the sampled features
    fn find_best_split(
        &self,
        ctx: &mut BuildContext<'_>,
        indices: &[usize],
        parent: &SideStats,
    ) -> Option<(usize, f64, f64)> {
        let n_features = ctx.x.ncols();
        let n_features_to_try = self.max_features.unwrap_or(n_features).clamp(1, n_features);

        // Visit features in random order; constant ones do not use up the budget
        let features: Vec<usize> = if n_features_to_try < n_features {
            rand::seq::index::sample(&mut ctx.rng, n_features, n_features).into_vec()
        } else {
            (0..n_features).collect()
        };

        let n = indices.len() as f64;
        let parent_impurity = parent.impurity(self.criterion);
        let mut best: Option<(usize, f64, f64)> = None;
        let mut visited = 0;

        for feature_idx in features {
            if visited == n_features_to_try {
                break;
            }

            let mut sorted: Vec<(f64, usize)> =
                indices.iter().map(|&i| (ctx.x[[i, feature_idx]], i)).collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            if sorted[0].0 >= sorted[sorted.len() - 1].0 {
                continue;
            }
            visited += 1;

            let mut left = SideStats::new(ctx.n_classes);
            let mut right = parent.clone();

            for pos in 0..sorted.len() - 1 {
                let (value, i) = sorted[pos];
                left.add(ctx.targets[i], ctx.class_of(i));
                right.remove(ctx.targets[i], ctx.class_of(i));

                let next_value = sorted[pos + 1].0;
                if next_value <= value {
                    continue;
                }
                if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                    continue;
                }

                let weighted = (left.count as f64 * left.impurity(self.criterion)
                    + right.count as f64 * right.impurity(self.criterion))
                    / n;
                let gain = parent_impurity - weighted;

                if gain > best.map_or(1e-12, |b| b.2) {
                    let mut threshold = (value + next_value) / 2.0;
                    if threshold >= next_value {
                        threshold = value;
                    }
                    best = Some((feature_idx, threshold, gain));
                }
            }
        }

        best
    }

    fn make_leaf(&self, stats: &SideStats) -> TreeNode {
        let n = stats.count.max(1) as f64;
        if self.is_classification {
            let class_proba: Vec<f64> = stats.class_counts.iter().map(|&c| c / n).collect();
            // First maximum wins, so ties go to the lower class label
            let best = class_proba
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc })
                .0;
            TreeNode::Leaf {
                value: self.classes.get(best).copied().unwrap_or(0.0),
                n_samples: stats.count,
                class_proba,
            }
        } else {
            TreeNode::Leaf {
                value: stats.sum / n,
                n_samples: stats.count,
                class_proba: Vec::new(),
            }
        }
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<&TreeNode> {
        let root = self.root.as_ref().ok_or(TurnoverError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(TurnoverError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(root)
    }

    fn leaf_for<'a>(&self, mut node: &'a TreeNode, sample: ArrayView1<f64>) -> &'a TreeNode {
        while let TreeNode::Split { feature_idx, threshold, left, right, .. } = node {
            node = if sample[*feature_idx] <= *threshold {
                left.as_ref()
            } else {
                right.as_ref()
            };
        }
        node
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.check_input(x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| match self.leaf_for(root, row) {
                TreeNode::Leaf { value, .. } => *value,
                TreeNode::Split { .. } => unreachable!("leaf_for always stops at a leaf"),
            })
            .collect())
    }

    /// Predict class probabilities, one column per entry of [`classes`](Self::classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_classification {
            return Err(TurnoverError::TrainingError(
                "predict_proba is only available for classification".to_string(),
            ));
        }
        let root = self.check_input(x)?;
        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((x.nrows(), n_classes));

        for (i, row) in x.rows().into_iter().enumerate() {
            if let TreeNode::Leaf { class_proba, .. } = self.leaf_for(root, row) {
                for (j, &p) in class_proba.iter().enumerate() {
                    proba[[i, j]] = p;
                }
            }
        }

        Ok(proba)
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Sorted class labels seen during fitting
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Overwrite every leaf value with `leaf_value` applied to the rows of `x` reaching it.
    /// Leaves no row reaches keep their value.
    pub fn refit_leaves<F>(&mut self, x: &Array2<f64>, leaf_value: F) -> Result<()>
    where
        F: Fn(&[usize]) -> f64,
    {
        fn visit<F: Fn(&[usize]) -> f64>(
            node: &mut TreeNode,
            x: &Array2<f64>,
            indices: Vec<usize>,
            leaf_value: &F,
        ) {
            match node {
                TreeNode::Leaf { value, .. } => {
                    if !indices.is_empty() {
                        *value = leaf_value(&indices);
                    }
                }
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    let (feature, cut) = (*feature_idx, *threshold);
                    let (go_left, go_right): (Vec<usize>, Vec<usize>) =
                        indices.into_iter().partition(|&i| x[[i, feature]] <= cut);
                    visit(left, x, go_left, leaf_value);
                    visit(right, x, go_right, leaf_value);
                }
            }
        }

        let n_features = self.n_features;
        let root = self.root.as_mut().ok_or(TurnoverError::ModelNotFitted)?;
        if x.ncols() != n_features {
            return Err(TurnoverError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        visit(root, x, (0..x.nrows()).collect(), &leaf_value);
        Ok(())
    }

    #[cfg(test)]
    fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separable() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
        assert_eq!(tree.get_depth(), 1);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(1);
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 2);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fixed_classes_missing_from_sample() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 0.0];

        let mut tree = DecisionTree::new_classifier().with_classes(vec![1.0, 0.0]);
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.classes(), &[0.0, 1.0]);
        let proba = tree.predict_proba(&x).unwrap();
        assert_eq!(proba[[0, 0]], 1.0);
        assert_eq!(proba[[0, 1]], 0.0);
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 1e-9, "MSE too high: {}", mse);
    }

    #[test]
    fn test_refit_leaves_uses_rows_in_each_leaf() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_regressor().with_max_depth(1);
        tree.fit(&x, &y).unwrap();
        tree.refit_leaves(&x, |rows| rows.len() as f64).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), array![3.0, 3.0, 3.0, 2.0, 2.0]);
    }

    #[test]
    fn test_refit_leaves_before_fit() {
        let mut tree = DecisionTree::new_regressor();
        let result = tree.refit_leaves(&array![[1.0]], |_| 0.0);
        assert!(matches!(result, Err(TurnoverError::ModelNotFitted)));
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0], [5.0, 1.0], [6.0, 0.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 2);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_criterion(Criterion::Entropy);
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_feature_sampling_is_seeded() {
        let x = Array2::from_shape_fn((40, 5), |(i, j)| ((i * (j + 3)) % 11) as f64);
        let y: Array1<f64> = (0..40).map(|i| ((i * 7) % 3 == 0) as u8 as f64).collect();

        let fit = |seed| {
            let mut tree = DecisionTree::new_classifier()
                .with_max_features(2)
                .with_random_state(seed);
            tree.fit(&x, &y).unwrap();
            tree.predict_proba(&x).unwrap()
        };

        assert_eq!(fit(7), fit(7));
    }

    #[test]
    fn test_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 1.0, 1.0];
        let mut tree = DecisionTree::new_classifier();
        assert!(matches!(tree.fit(&x, &y), Err(TurnoverError::ShapeError { .. })));
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new_classifier();
        let x = array![[1.0]];
        assert!(matches!(tree.predict(&x), Err(TurnoverError::ModelNotFitted)));
    }
}
