//! Integration test: Full pipeline (load → engineer → split → train → evaluate → persist)

use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tempfile::tempdir;
use turnover_predictor::prelude::*;

const DEPARTMENTS: [&str; 4] = ["Engineering", "Finance", "Sales", "Support"];

/// 100 employees, every fifth one has left
fn create_employee_dataset() -> DataFrame {
    let n = 100;
    let mut age = Vec::with_capacity(n);
    let mut tenure = Vec::with_capacity(n);
    let mut department = Vec::with_capacity(n);
    let mut salary = Vec::with_capacity(n);
    let mut satisfaction = Vec::with_capacity(n);
    let mut review = Vec::with_capacity(n);
    let mut rating = Vec::with_capacity(n);
    let mut projects = Vec::with_capacity(n);
    let mut hours = Vec::with_capacity(n);
    let mut since_promotion = Vec::with_capacity(n);
    let mut left = Vec::with_capacity(n);

    for i in 0..n {
        let leaver = i % 5 == 0;
        let wobble = ((i * 37) % 13) as f64 / 13.0;

        age.push(24 + (i % 30) as i64);
        tenure.push((3 + (i * 7) % 140) as i64);
        department.push(DEPARTMENTS[i % DEPARTMENTS.len()]);
        salary.push(42000.0 + 900.0 * ((i * 11) % 40) as f64);
        satisfaction.push(if leaver { 1.5 + wobble } else { 3.2 + wobble * 1.5 });
        review.push(2.5 + wobble * 2.5);
        rating.push(3.0 + wobble * 2.0);
        projects.push(2 + (i % 6) as i64);
        hours.push(if leaver { 52.0 + wobble * 10.0 } else { 38.0 + wobble * 10.0 });
        since_promotion.push(((i * 3) % 7) as f64);
        left.push(if leaver { 1i64 } else { 0 });
    }

    df!(
        "age" => &age,
        "tenure_months" => &tenure,
        "department" => &department,
        "salary" => &salary,
        "satisfaction_score" => &satisfaction,
        "last_review_score" => &review,
        "avg_project_rating" => &rating,
        "projects_count" => &projects,
        "avg_hours_per_week" => &hours,
        "years_since_promotion" => &since_promotion,
        "left" => &left
    )
    .unwrap()
}

fn write_csv(df: &mut DataFrame, path: &Path) {
    let mut file = File::create(path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
}

fn run_pipeline(model_type: ModelType) {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("employee_data.csv");
    let model_path = dir.path().join("models").join("turnover_model.bin");
    write_csv(&mut create_employee_dataset(), &data_path);

    let config = PipelineConfig::default()
        .with_data_path(&data_path)
        .with_model_path(&model_path)
        .with_training(TrainingConfig::new(model_type));

    let report = TurnoverPipeline::new(config).run().unwrap();

    assert_eq!(report.n_records, 100);
    assert_eq!(report.n_test, 20);
    assert_eq!(report.n_train, 80);
    assert_eq!(report.model_type, model_type);

    let eval = &report.evaluation;
    assert!((0.0..=1.0).contains(&eval.accuracy));
    assert!((0.0..=1.0).contains(&eval.roc_auc));
    assert_eq!(eval.confusion.total(), 20);
    assert_eq!(eval.report.classes[1].support, 4);

    assert_eq!(report.importances.len(), DEFAULT_FEATURE_COLUMNS.len());
    assert_eq!(report.top_importances(10).len(), 10);
    assert_eq!(report.top_importances(3).len(), 3);

    let size = std::fs::metadata(&model_path).unwrap().len();
    assert!(size > 0);
    assert_eq!(size, report.model_bytes);
}

#[test]
fn test_full_pipeline_random_forest() {
    run_pipeline(ModelType::RandomForest);
}

#[test]
fn test_full_pipeline_gradient_boosting() {
    run_pipeline(ModelType::GradientBoosting);
}

#[test]
fn test_pipeline_is_reproducible() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("employee_data.csv");
    write_csv(&mut create_employee_dataset(), &data_path);

    let run = |name: &str| {
        let config = PipelineConfig::default()
            .with_data_path(&data_path)
            .with_model_path(dir.path().join(name))
            .with_training(TrainingConfig::default().with_n_estimators(25));
        TurnoverPipeline::new(config).run().unwrap()
    };

    let a = run("a.bin");
    let b = run("b.bin");
    assert_eq!(a.evaluation, b.evaluation);
    assert_eq!(a.importances, b.importances);
}

#[test]
fn test_saved_model_can_be_rescored() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("employee_data.csv");
    let model_path = dir.path().join("model.bin");
    write_csv(&mut create_employee_dataset(), &data_path);

    let config = PipelineConfig::default()
        .with_data_path(&data_path)
        .with_model_path(&model_path)
        .with_training(TrainingConfig::new(ModelType::GradientBoosting).with_n_estimators(30));
    TurnoverPipeline::new(config).run().unwrap();

    let (metadata, eval) = evaluate_saved(&model_path, &data_path).unwrap();
    assert_eq!(metadata.model_type, ModelType::GradientBoosting);
    assert_eq!(metadata.target_name, "left");
    assert!(metadata.metrics.contains_key("roc_auc"));
    assert_eq!(eval.confusion.total(), 100);
    assert!(eval.roc_auc > 0.5);
}

fn train_gradient_boosting(data_path: &Path, model_path: &Path) {
    let config = PipelineConfig::default()
        .with_data_path(data_path)
        .with_model_path(model_path)
        .with_training(TrainingConfig::new(ModelType::GradientBoosting).with_n_estimators(30));
    TurnoverPipeline::new(config).run().unwrap();
}

#[test]
fn test_rescoring_keeps_training_department_codes() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("employee_data.csv");
    let model_path = dir.path().join("model.bin");
    let full = create_employee_dataset();
    write_csv(&mut full.clone(), &data_path);
    train_gradient_boosting(&data_path, &model_path);

    // Scoring file without any Engineering rows
    let keep: Vec<bool> = (0..100).map(|i| i % DEPARTMENTS.len() != 0).collect();
    let mask = BooleanChunked::from_slice("keep".into(), &keep);

    let text_only = dir.path().join("no_engineering.csv");
    write_csv(&mut full.filter(&mask).unwrap(), &text_only);

    let pre_coded = dir.path().join("no_engineering_coded.csv");
    let mut coded = engineer_features(&full).unwrap().filter(&mask).unwrap();
    write_csv(&mut coded, &pre_coded);

    let (metadata, from_text) = evaluate_saved(&model_path, &text_only).unwrap();
    let (_, from_codes) = evaluate_saved(&model_path, &pre_coded).unwrap();

    let expected: Vec<String> = DEPARTMENTS.iter().map(|d| d.to_string()).collect();
    assert_eq!(metadata.categorical_vocab.get("department"), Some(&expected));
    assert_eq!(from_text.confusion.total(), 75);
    assert_eq!(from_text, from_codes);
}

#[test]
fn test_rescoring_unseen_department_fails() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("employee_data.csv");
    let model_path = dir.path().join("model.bin");
    let mut df = create_employee_dataset();
    write_csv(&mut df, &data_path);
    train_gradient_boosting(&data_path, &model_path);

    let renamed: Vec<&str> = (0..100)
        .map(|i| if i == 3 { "Legal" } else { DEPARTMENTS[i % DEPARTMENTS.len()] })
        .collect();
    df.with_column(Series::new("department".into(), renamed)).unwrap();
    let scoring_path = dir.path().join("with_legal.csv");
    write_csv(&mut df, &scoring_path);

    let result = evaluate_saved(&model_path, &scoring_path);
    assert!(matches!(result, Err(TurnoverError::FeatureEngineeringError(_))));
}

#[test]
fn test_missing_data_file_fails() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig::default()
        .with_data_path(dir.path().join("absent.csv"))
        .with_model_path(dir.path().join("model.bin"));

    let result = TurnoverPipeline::new(config).run();
    assert!(matches!(result, Err(TurnoverError::DataLoadError(_))));
    assert!(!dir.path().join("model.bin").exists());
}

#[test]
fn test_missing_required_column_fails() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("employee_data.csv");
    let mut df = create_employee_dataset().drop("avg_hours_per_week").unwrap();
    write_csv(&mut df, &data_path);

    let config = PipelineConfig::default()
        .with_data_path(&data_path)
        .with_model_path(dir.path().join("model.bin"));

    let result = TurnoverPipeline::new(config).run();
    assert!(matches!(result, Err(TurnoverError::FeatureEngineeringError(_))));
    assert!(!dir.path().join("model.bin").exists());
}

#[test]
fn test_single_class_fails_split() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("employee_data.csv");
    let mut df = create_employee_dataset();
    df.with_column(Series::new("left".into(), vec![0i64; 100])).unwrap();
    write_csv(&mut df, &data_path);

    let config = PipelineConfig::default()
        .with_data_path(&data_path)
        .with_model_path(dir.path().join("model.bin"));

    let result = TurnoverPipeline::new(config).run();
    assert!(matches!(result, Err(TurnoverError::InsufficientDataError(_))));
}
