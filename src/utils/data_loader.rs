//! Data loading utilities

use crate::error::{Result, TurnoverError};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Loader for delimited employee tables
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Field separator
    delimiter: u8,
    /// Rows scanned for dtype inference (None scans the whole file)
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new comma-separated loader
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: None,
        }
    }

    /// Set field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set how many rows are scanned to infer column types (None scans the whole file)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            TurnoverError::DataLoadError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| {
                TurnoverError::DataLoadError(format!("malformed file {}: {}", path.display(), e))
            })?;

        if df.width() == 0 {
            return Err(TurnoverError::DataLoadError(format!(
                "{} has no header row",
                path.display()
            )));
        }
        if df.height() == 0 {
            return Err(TurnoverError::DataLoadError(format!(
                "{} contains no records",
                path.display()
            )));
        }

        debug!(columns = ?df.get_column_names(), "Parsed header");
        info!(rows = df.height(), path = %path.display(), "Loaded {} employee records", df.height());

        Ok(df)
    }

    /// Detect the separator from the extension and load
    pub fn load_auto(path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let is_tsv = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("tsv"));

        let loader = if is_tsv {
            Self::new().with_delimiter(b'\t')
        } else {
            Self::new()
        };
        loader.load_csv(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = write_temp(".csv", "age,tenure_months,left\n30,24,0\n45,120,1\n28,6,0\n");
        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_load_tsv_auto() {
        let file = write_temp(".tsv", "age\tleft\n30\t0\n41\t1\n");
        let df = DataLoader::load_auto(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert!(df.column("left").is_ok());
    }

    #[test]
    fn test_late_fractional_value_keeps_column_numeric() {
        let mut contents = String::from("salary,left\n");
        for i in 0..150 {
            if i == 120 {
                contents.push_str("48000.5,0\n");
            } else {
                contents.push_str(&format!("{},{}\n", 40000 + i, i % 2));
            }
        }
        let file = write_temp(".csv", &contents);

        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 150);
        let salary = df.column("salary").unwrap().f64().unwrap();
        assert_eq!(salary.get(120), Some(48000.5));
        assert_eq!(salary.get(0), Some(40000.0));
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::new()
            .load_csv("does/not/exist/employee_data.csv")
            .unwrap_err();
        assert!(matches!(err, TurnoverError::DataLoadError(_)));
    }

    #[test]
    fn test_empty_file() {
        let file = write_temp(".csv", "");
        let err = DataLoader::new().load_csv(file.path()).unwrap_err();
        assert!(matches!(err, TurnoverError::DataLoadError(_)));
    }

    #[test]
    fn test_header_only() {
        let file = write_temp(".csv", "age,tenure_months,left\n");
        let err = DataLoader::new().load_csv(file.path()).unwrap_err();
        assert!(matches!(err, TurnoverError::DataLoadError(_)));
    }

    #[test]
    fn test_ragged_rows() {
        let file = write_temp(".csv", "age,left\n30,0\n45,1,extra,fields\n");
        let err = DataLoader::new().load_csv(file.path()).unwrap_err();
        assert!(matches!(err, TurnoverError::DataLoadError(_)));
    }
}
