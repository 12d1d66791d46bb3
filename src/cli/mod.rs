//! Turnover predictor CLI module
//!
//! Runs the training pipeline with optional overrides, or scores a saved model.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::pipeline::{evaluate_saved, PipelineReport, TurnoverPipeline};
use crate::training::{Evaluation, FeatureImportance, ModelType};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "turnover")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and evaluate an employee turnover classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input CSV with employee records
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Where to write the trained model
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Classifier (random_forest, gradient_boosting)
    #[arg(short, long)]
    pub model: Option<ModelType>,

    /// Fraction of rows held out for evaluation
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Random seed for the split and the model
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of features shown in the importance table
    #[arg(long)]
    pub top_k: Option<usize>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a saved model on a labelled CSV
    Evaluate {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Labelled input data
        #[arg(short, long)]
        data: PathBuf,
    },
}

impl Cli {
    /// Merge the config file (if any) with command-line overrides
    pub fn pipeline_config(&self) -> crate::error::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(data) = &self.data {
            config = config.with_data_path(data.clone());
        }
        if let Some(output) = &self.output {
            config = config.with_model_path(output.clone());
        }
        if let Some(model) = self.model {
            config.training = config.training.with_model(model);
        }
        if let Some(test_size) = self.test_size {
            config = config.with_test_size(test_size);
        }
        if let Some(seed) = self.seed {
            config = config.with_random_state(seed);
        }
        if let Some(k) = self.top_k {
            config = config.with_top_k(k);
        }

        config.validate()?;
        Ok(config)
    }
}

// ─── Output ────────────────────────────────────────────────────────────────────

fn print_evaluation(eval: &Evaluation) {
    kv("Accuracy", &format!("{:.4}", eval.accuracy));
    kv("ROC-AUC", &format!("{:.4}", eval.roc_auc));

    section("Classification report");
    for line in eval.report.to_string().lines() {
        println!("  {}", line);
    }

    section("Confusion matrix");
    for line in eval.confusion.to_string().lines() {
        println!("  {}", line);
    }
}

fn print_importances(importances: &[FeatureImportance]) {
    section("Feature importance");
    println!("  {:<24} {:>10}", muted("Feature"), muted("Importance"));
    println!("  {}", dim(&"─".repeat(36)));
    for item in importances {
        println!("  {:<24} {:>10.4}", item.feature, item.importance);
    }
}

fn print_report(report: &PipelineReport, top_k: usize) {
    section("Train");
    step_ok(&format!("Loaded {} employee records", report.n_records));
    step_ok(&format!("Split {} train / {} test", report.n_train, report.n_test));
    step_ok(&format!("Trained {}", accent(report.model_type.as_str())));

    section("Evaluation");
    print_evaluation(&report.evaluation);

    print_importances(report.top_importances(top_k));

    println!();
    step_ok(&format!(
        "Model saved to {} {}",
        report.model_path.display().to_string().white().bold(),
        dim(&format!("({} bytes, {:.2}s)", report.model_bytes, report.elapsed_secs))
    ));
    println!();
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Train, evaluate and persist with the merged configuration
pub fn cmd_run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.pipeline_config()?;
    let top_k = config.top_k;
    let report = TurnoverPipeline::new(config).run()?;
    print_report(&report, top_k);
    Ok(())
}

pub fn cmd_evaluate(model: &PathBuf, data: &PathBuf) -> anyhow::Result<()> {
    let (metadata, evaluation) = evaluate_saved(model, data)?;

    section("Evaluate");
    kv("Model", &metadata.model_type.to_string());
    kv("Trained at", &metadata.trained_at);
    kv("Features", &metadata.feature_names.len().to_string());
    println!();
    print_evaluation(&evaluation);
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_uses_defaults() {
        let cli = Cli::parse_from(["turnover"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.pipeline_config().unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "turnover",
            "--data",
            "hr.csv",
            "--output",
            "out/model.bin",
            "--model",
            "gradient_boosting",
            "--test-size",
            "0.3",
            "--seed",
            "9",
            "--top-k",
            "5",
        ]);
        let config = cli.pipeline_config().unwrap();
        assert_eq!(config.data_path, PathBuf::from("hr.csv"));
        assert_eq!(config.model_path, PathBuf::from("out/model.bin"));
        assert_eq!(config.training.model_type, ModelType::GradientBoosting);
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.random_state, 9);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_bad_model_name_rejected() {
        assert!(Cli::try_parse_from(["turnover", "--model", "svm"]).is_err());
    }

    #[test]
    fn test_evaluate_subcommand() {
        let cli = Cli::parse_from(["turnover", "evaluate", "--model", "m.bin", "--data", "d.csv"]);
        match cli.command {
            Some(Commands::Evaluate { model, data }) => {
                assert_eq!(model, PathBuf::from("m.bin"));
                assert_eq!(data, PathBuf::from("d.csv"));
            }
            None => panic!("expected evaluate subcommand"),
        }
    }
}
