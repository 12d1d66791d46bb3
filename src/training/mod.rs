//! Model training module
//!
//! Provides the classifiers and the train/evaluate workflow:
//! - CART decision trees (the base learner)
//! - Random Forest (bagged trees)
//! - Gradient boosting on the binary log loss
//! - Stratified train/test splitting
//! - Accuracy, ROC-AUC and per-class reports

mod config;
mod engine;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod metrics;
pub mod random_forest;
pub mod split;

pub use config::{ModelType, TrainingConfig};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{
    evaluate, feature_matrix, label_vector, rank_importances, train, FeatureImportance, TrainedModel,
};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use metrics::{accuracy, roc_auc, ClassMetrics, ClassificationReport, ConfusionMatrix, Evaluation};
pub use random_forest::{MaxFeatures, RandomForest};
pub use split::{train_test_split, TrainTestSplit};
