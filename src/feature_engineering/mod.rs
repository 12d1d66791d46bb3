//! Feature engineering for employee records
//!
//! Derives tenure, performance and workload indicators from raw HR columns.
//! Every derived column is a pure function of existing columns, so running
//! [`engineer_features`] on its own output reproduces the same table.

mod encoding;

pub use encoding::{
    department_vocabulary, encode_department, encode_department_with, DEPARTMENT_COLUMN,
    DEPARTMENT_ENCODED_COLUMN,
};

use crate::error::{Result, TurnoverError};
use crate::utils::is_numeric;
use polars::prelude::*;
use tracing::debug;

/// Raw columns every derivation depends on
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "tenure_months",
    "last_review_score",
    "avg_project_rating",
    "avg_hours_per_week",
    "years_since_promotion",
];

/// Columns added by [`engineer_features`]
pub const DERIVED_COLUMNS: [&str; 6] = [
    "tenure_years",
    "tenure_category",
    "performance_score",
    "high_performer",
    "overworked",
    "promotion_due",
];

const HIGH_PERFORMER_THRESHOLD: f64 = 4.0;
const OVERWORKED_HOURS: f64 = 50.0;
const PROMOTION_DUE_YEARS: f64 = 3.0;

/// Tenure bucket on half-open year intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenureCategory {
    /// [0, 1)
    UnderOneYear,
    /// [1, 3)
    OneToThreeYears,
    /// [3, 5)
    ThreeToFiveYears,
    /// [5, 10)
    FiveToTenYears,
    /// [10, 50)
    TenPlusYears,
}

impl TenureCategory {
    /// Bucket edges; a value v lands in bucket i when EDGES[i] <= v < EDGES[i + 1]
    pub const EDGES: [f64; 6] = [0.0, 1.0, 3.0, 5.0, 10.0, 50.0];

    const ORDERED: [TenureCategory; 5] = [
        TenureCategory::UnderOneYear,
        TenureCategory::OneToThreeYears,
        TenureCategory::ThreeToFiveYears,
        TenureCategory::FiveToTenYears,
        TenureCategory::TenPlusYears,
    ];

    /// Classify tenure in years. Values outside [0, 50) stay unclassified.
    pub fn from_years(years: f64) -> Option<Self> {
        Self::EDGES
            .windows(2)
            .position(|w| years >= w[0] && years < w[1])
            .map(|i| Self::ORDERED[i])
    }

    pub fn label(&self) -> &'static str {
        match self {
            TenureCategory::UnderOneYear => "<1yr",
            TenureCategory::OneToThreeYears => "1-3yr",
            TenureCategory::ThreeToFiveYears => "3-5yr",
            TenureCategory::FiveToTenYears => "5-10yr",
            TenureCategory::TenPlusYears => "10+yr",
        }
    }
}

impl std::fmt::Display for TenureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tenure in years from months
pub fn tenure_years(tenure_months: f64) -> f64 {
    tenure_months / 12.0
}

/// Mean of the last review and the average project rating
pub fn performance_score(last_review_score: f64, avg_project_rating: f64) -> f64 {
    (last_review_score + avg_project_rating) / 2.0
}

/// 1 when the performance score is strictly above 4.0
pub fn high_performer(performance_score: f64) -> i32 {
    (performance_score > HIGH_PERFORMER_THRESHOLD) as i32
}

/// 1 when the average week is strictly longer than 50 hours
pub fn overworked(avg_hours_per_week: f64) -> i32 {
    (avg_hours_per_week > OVERWORKED_HOURS) as i32
}

/// 1 when the last promotion is more than 3 years ago
pub fn promotion_due(years_since_promotion: f64) -> i32 {
    (years_since_promotion > PROMOTION_DUE_YEARS) as i32
}

/// Add the derived turnover features to a copy of `df`.
///
/// Existing derived columns are replaced, never duplicated. Null inputs give
/// null outputs. When only a textual `department` column exists, a label
/// encoded `department_encoded` column is added as well.
pub fn engineer_features(df: &DataFrame) -> Result<DataFrame> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| df.column(name).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(TurnoverError::FeatureEngineeringError(format!(
            "required columns missing: {}",
            missing.join(", ")
        )));
    }

    let tenure_months = numeric_column(df, "tenure_months")?;
    let last_review = numeric_column(df, "last_review_score")?;
    let project_rating = numeric_column(df, "avg_project_rating")?;
    let hours = numeric_column(df, "avg_hours_per_week")?;
    let since_promotion = numeric_column(df, "years_since_promotion")?;

    let years: Vec<Option<f64>> = tenure_months.iter().map(|m| m.map(tenure_years)).collect();

    let categories: Vec<Option<&str>> = years
        .iter()
        .map(|y| y.and_then(TenureCategory::from_years).map(|c| c.label()))
        .collect();

    let performance: Vec<Option<f64>> = last_review
        .iter()
        .zip(project_rating.iter())
        .map(|(r, p)| match (r, p) {
            (Some(r), Some(p)) => Some(performance_score(*r, *p)),
            _ => None,
        })
        .collect();

    let high: Vec<Option<i32>> = performance.iter().map(|p| p.map(high_performer)).collect();
    let over: Vec<Option<i32>> = hours.iter().map(|h| h.map(overworked)).collect();
    let due: Vec<Option<i32>> = since_promotion.iter().map(|y| y.map(promotion_due)).collect();

    let mut out = df.clone();
    let derived = [
        Series::new("tenure_years".into(), years),
        Series::new("tenure_category".into(), categories),
        Series::new("performance_score".into(), performance),
        Series::new("high_performer".into(), high),
        Series::new("overworked".into(), over),
        Series::new("promotion_due".into(), due),
    ];
    for series in derived {
        out.with_column(series)
            .map_err(|e| TurnoverError::FeatureEngineeringError(e.to_string()))?;
    }

    let out = encode_department(&out)?;

    debug!(rows = out.height(), columns = out.width(), "Engineered turnover features");
    Ok(out)
}

/// Read a required numeric column as nullable f64 values
fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name).map_err(|_| {
        TurnoverError::FeatureEngineeringError(format!("required column '{}' is missing", name))
    })?;

    if !is_numeric(column.dtype()) {
        return Err(TurnoverError::FeatureEngineeringError(format!(
            "column '{}' must be numeric, found {}",
            name,
            column.dtype()
        )));
    }

    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| TurnoverError::FeatureEngineeringError(e.to_string()))?;
    let values: Vec<Option<f64>> = casted
        .f64()
        .map_err(|e| TurnoverError::FeatureEngineeringError(e.to_string()))?
        .into_iter()
        .collect();
    Ok(values)
}
