//! Loading and validation of the raw patient table.

use std::path::Path;

use log::info;

use crate::{Error, Result};

/// A raw tabular dataset: one header row plus string cells.
///
/// Cells are kept untyped until feature extraction so that missing or
/// malformed values can be recovered instead of failing the load.
#[derive(Clone, Debug)]
pub struct VitalsTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl VitalsTable {
    /// Reads a CSV file with a header row.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ReadFile {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(false)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Err(Error::invalid(format!(
                "{} contains a header but no data rows",
                path.display()
            )));
        }

        info!(
            "loaded {} rows, {} columns from {}",
            rows.len(),
            headers.len(),
            path.display()
        );

        Ok(Self { headers, rows })
    }

    /// Builds a table directly from headers and rows.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(Error::invalid(format!(
                    "row {} has {} cells but the header declares {} columns",
                    i,
                    row.len(),
                    headers.len()
                )));
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fails fast when any required column is absent.
    pub fn validate_columns(&self, required: &[String]) -> Result<()> {
        let missing: Vec<String> = required
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(Error::MissingColumns {
                missing,
                available: self.headers.clone(),
            });
        }

        info!("column validation passed ({} required columns)", required.len());
        Ok(())
    }

    /// Returns a column parsed as numbers. Empty, unparseable and NaN cells
    /// come back as `None` so the caller can impute them.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.column_index(name).ok_or_else(|| Error::MissingColumns {
            missing: vec![name.to_string()],
            available: self.headers.clone(),
        })?;

        Ok(self
            .rows
            .iter()
            .map(|row| row[idx].parse::<f64>().ok().filter(|v| !v.is_nan()))
            .collect())
    }

    /// Returns a column as raw strings.
    pub fn string_column(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.column_index(name).ok_or_else(|| Error::MissingColumns {
            missing: vec![name.to_string()],
            available: self.headers.clone(),
        })?;

        Ok(self.rows.iter().map(|row| row[idx].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> VitalsTable {
        VitalsTable::from_rows(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_and_accessors() {
        let t = table(
            &["patient_id", "heart_rate_bpm"],
            &[&["p1", "72"], &["p2", "88"]],
        );
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.column_index("heart_rate_bpm"), Some(1));
        assert_eq!(t.column_index("absent"), None);
    }

    #[test]
    fn test_from_rows_ragged() {
        let result = VitalsTable::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string()]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_columns_missing() {
        let t = table(&["patient_id", "heart_rate_bpm"], &[&["p1", "72"]]);
        let err = t
            .validate_columns(&["patient_id".to_string(), "temperature_c".to_string()])
            .unwrap_err();
        match err {
            Error::MissingColumns { missing, .. } => {
                assert_eq!(missing, vec!["temperature_c".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_numeric_column_handles_bad_cells() {
        let t = table(
            &["v"],
            &[&["1.5"], &[""], &["abc"], &["NaN"], &["inf"]],
        );
        let col = t.numeric_column("v").unwrap();
        assert_eq!(col[0], Some(1.5));
        assert_eq!(col[1], None);
        assert_eq!(col[2], None);
        assert_eq!(col[3], None);
        assert_eq!(col[4], Some(f64::INFINITY));
    }

    #[test]
    fn test_missing_file() {
        let err = VitalsTable::from_csv_path("definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, Error::ReadFile { .. }));
    }
}
