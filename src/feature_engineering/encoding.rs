//! Department label encoding

use crate::error::{Result, TurnoverError};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Raw department name column
pub const DEPARTMENT_COLUMN: &str = "department";
/// Integer department code used as a model feature
pub const DEPARTMENT_ENCODED_COLUMN: &str = "department_encoded";

fn department_names(df: &DataFrame) -> Result<Option<&StringChunked>> {
    if df.column(DEPARTMENT_ENCODED_COLUMN).is_ok() {
        return Ok(None);
    }
    let Ok(column) = df.column(DEPARTMENT_COLUMN) else {
        return Ok(None);
    };
    column.str().map(Some).map_err(|_| {
        TurnoverError::FeatureEngineeringError(format!(
            "column '{}' must be text to be label encoded, found {}",
            DEPARTMENT_COLUMN,
            column.dtype()
        ))
    })
}

/// Sorted distinct department names that [`encode_department`] would code.
///
/// `None` when there is nothing to encode: no `department` column, or a
/// `department_encoded` column is already present.
pub fn department_vocabulary(df: &DataFrame) -> Result<Option<Vec<String>>> {
    let Some(names) = department_names(df)? else {
        return Ok(None);
    };
    let vocabulary: BTreeSet<&str> = names.into_iter().flatten().collect();
    Ok(Some(vocabulary.into_iter().map(str::to_string).collect()))
}

/// Derive `department_encoded` from `department` when only the text column exists.
///
/// Codes are assigned to the distinct names in lexicographic order, so the
/// mapping depends only on the set of names present. Nulls stay null.
pub fn encode_department(df: &DataFrame) -> Result<DataFrame> {
    match department_vocabulary(df)? {
        Some(vocabulary) => encode_department_with(df, &vocabulary),
        None => Ok(df.clone()),
    }
}

/// Like [`encode_department`], but codes are positions in a fixed `vocabulary`.
///
/// A name outside the vocabulary is a `FeatureEngineeringError`.
pub fn encode_department_with(df: &DataFrame, vocabulary: &[String]) -> Result<DataFrame> {
    let Some(names) = department_names(df)? else {
        return Ok(df.clone());
    };

    let codes = names
        .into_iter()
        .map(|name| match name {
            None => Ok(None),
            Some(n) => vocabulary
                .iter()
                .position(|v| v == n)
                .map(|idx| Some(idx as i32))
                .ok_or_else(|| {
                    TurnoverError::FeatureEngineeringError(format!(
                        "department '{}' was not seen during training",
                        n
                    ))
                }),
        })
        .collect::<Result<Vec<Option<i32>>>>()?;

    debug!(departments = vocabulary.len(), "Label encoded departments");

    let mut out = df.clone();
    out.with_column(Series::new(DEPARTMENT_ENCODED_COLUMN.into(), codes))
        .map_err(|e| TurnoverError::FeatureEngineeringError(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_sorted_names() {
        let df = df!(
            "department" => &[Some("sales"), Some("engineering"), None, Some("hr"), Some("sales")]
        )
        .unwrap();
        let out = encode_department(&df).unwrap();
        let codes: Vec<Option<i32>> = out
            .column(DEPARTMENT_ENCODED_COLUMN)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, vec![Some(2), Some(0), None, Some(1), Some(2)]);
    }

    #[test]
    fn test_existing_code_untouched() {
        let df = df!(
            "department" => &["sales", "hr"],
            "department_encoded" => &[7i64, 3]
        )
        .unwrap();
        let out = encode_department(&df).unwrap();
        assert!(out.equals(&df));
    }

    #[test]
    fn test_no_department_columns() {
        let df = df!("age" => &[30.0, 40.0]).unwrap();
        let out = encode_department(&df).unwrap();
        assert_eq!(out.width(), 1);
    }

    #[test]
    fn test_numeric_department_rejected() {
        let df = df!("department" => &[1.0, 2.0]).unwrap();
        assert!(matches!(
            encode_department(&df),
            Err(TurnoverError::FeatureEngineeringError(_))
        ));
    }

    #[test]
    fn test_fixed_vocabulary_keeps_codes() {
        let vocabulary = vec!["engineering".to_string(), "hr".to_string(), "sales".to_string()];
        let df = df!("department" => &["sales", "sales"]).unwrap();

        let out = encode_department_with(&df, &vocabulary).unwrap();
        let codes: Vec<Option<i32>> = out
            .column(DEPARTMENT_ENCODED_COLUMN)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, vec![Some(2), Some(2)]);
    }

    #[test]
    fn test_fixed_vocabulary_rejects_unseen_name() {
        let vocabulary = vec!["engineering".to_string(), "sales".to_string()];
        let df = df!("department" => &["sales", "legal"]).unwrap();
        assert!(matches!(
            encode_department_with(&df, &vocabulary),
            Err(TurnoverError::FeatureEngineeringError(_))
        ));
    }

    #[test]
    fn test_vocabulary_skipped_when_codes_supplied() {
        let df = df!(
            "department" => &["sales", "hr"],
            "department_encoded" => &[7i64, 3]
        )
        .unwrap();
        assert_eq!(department_vocabulary(&df).unwrap(), None);

        let df = df!("department" => &["sales", "hr", "sales"]).unwrap();
        assert_eq!(
            department_vocabulary(&df).unwrap(),
            Some(vec!["hr".to_string(), "sales".to_string()])
        );
    }
}
