//! Feature preparation: cleaning, imputation and standardization.

use std::collections::HashSet;

use log::{info, warn};

use crate::{Error, Matrix, Result, Vector};

/// Numeric features extracted from a [`crate::VitalsTable`], aligned with the
/// retained patient identifiers.
#[derive(Clone, Debug)]
pub struct FeatureSet {
    /// One identifier per retained row.
    pub ids: Vec<String>,
    /// Name of the identifier column, or `"index"` for the positional fallback.
    pub id_column: String,
    /// Feature column names, in matrix column order.
    pub columns: Vec<String>,
    /// Raw (unstandardized) feature values, finite everywhere.
    pub matrix: Matrix,
    /// Rows dropped because their identifier was already seen.
    pub duplicates_dropped: usize,
    /// Missing cells replaced with their column median.
    pub values_imputed: usize,
}

impl FeatureSet {
    pub fn n_samples(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.matrix.ncols()
    }
}

/// Cleans the table and extracts the feature matrix.
///
/// Duplicate identifiers are dropped keeping the first occurrence, missing
/// values are replaced with the column median computed over the
/// post-deduplication rows, and residual non-finite values are zeroed.
/// When the identifier column is absent the row position is used instead;
/// that is a recoverable condition, not an error.
pub fn extract_features(
    table: &crate::VitalsTable,
    feature_cols: &[String],
    id_col: &str,
) -> Result<FeatureSet> {
    if feature_cols.is_empty() {
        return Err(Error::invalid("feature column list is empty"));
    }
    table.validate_columns(feature_cols)?;

    let n_rows = table.n_rows();
    if n_rows == 0 {
        return Err(Error::invalid("table has no rows"));
    }

    // Identifiers, with positional fallback.
    let (raw_ids, id_column) = match table.string_column(id_col) {
        Ok(ids) => (ids, id_col.to_string()),
        Err(_) => {
            warn!("column {id_col} not found, falling back to positional indices");
            ((0..n_rows).map(|i| i.to_string()).collect(), "index".to_string())
        }
    };

    // Keep the first occurrence of each identifier.
    let mut seen = HashSet::new();
    let keep: Vec<usize> = (0..n_rows)
        .filter(|&i| seen.insert(raw_ids[i].clone()))
        .collect();
    let duplicates_dropped = n_rows - keep.len();
    if duplicates_dropped > 0 {
        warn!("{duplicates_dropped} duplicate rows dropped based on {id_column}");
    }

    let ids: Vec<String> = keep.iter().map(|&i| raw_ids[i].clone()).collect();
    let n_kept = keep.len();

    // Per-column median imputation over the deduplicated rows.
    let mut matrix = Matrix::zeros((n_kept, feature_cols.len()));
    let mut values_imputed = 0usize;
    for (j, col_name) in feature_cols.iter().enumerate() {
        let full = table.numeric_column(col_name)?;
        let col: Vec<Option<f64>> = keep.iter().map(|&i| full[i]).collect();

        let median = column_median(&col);
        for (row, value) in col.iter().enumerate() {
            matrix[[row, j]] = match value {
                Some(v) => *v,
                None => {
                    values_imputed += 1;
                    median.unwrap_or(f64::NAN)
                }
            };
        }
        if let Some(m) = median {
            if col.iter().any(|v| v.is_none()) {
                info!("column {col_name}: missing values replaced with median ({m:.2})");
            }
        }
    }
    if values_imputed > 0 {
        warn!("{values_imputed} missing values imputed");
    }

    // Residual infinities (and all-missing columns) become zero.
    let mut zeroed = 0usize;
    matrix.mapv_inplace(|v| {
        if v.is_finite() {
            v
        } else {
            zeroed += 1;
            0.0
        }
    });
    if zeroed > 0 {
        warn!("{zeroed} non-finite values replaced with 0");
    }

    info!("features prepared: {} rows x {} columns", n_kept, feature_cols.len());

    Ok(FeatureSet {
        ids,
        id_column,
        columns: feature_cols.to_vec(),
        matrix,
        duplicates_dropped,
        values_imputed,
    })
}

fn column_median(values: &[Option<f64>]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        Some((finite[mid - 1] + finite[mid]) / 2.0)
    } else {
        Some(finite[mid])
    }
}

/// Zero-mean / unit-variance transform, fitted once and reusable.
#[derive(Clone, Debug)]
pub struct StandardScaler {
    mean: Option<Vector>,
    std: Option<Vector>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self { mean: None, std: None }
    }

    pub fn fit(&mut self, data: &Matrix) -> Result<()> {
        let mean = data
            .mean_axis(ndarray::Axis(0))
            .ok_or_else(|| Error::invalid("cannot fit scaler on an empty matrix"))?;
        // Population standard deviation; constant columns get a unit divisor
        // so they standardize to zero instead of NaN.
        let std = data
            .std_axis(ndarray::Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    pub fn transform(&self, data: &Matrix) -> Result<Matrix> {
        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| Error::invalid("scaler not fitted, call fit() first"))?;
        let std = self
            .std
            .as_ref()
            .ok_or_else(|| Error::invalid("scaler not fitted, call fit() first"))?;

        if data.ncols() != mean.len() {
            return Err(Error::invalid(format!(
                "matrix has {} columns but the scaler was fitted on {}",
                data.ncols(),
                mean.len()
            )));
        }

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(ndarray::Axis(0)) {
            row -= mean;
            row /= std;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, data: &Matrix) -> Result<Matrix> {
        self.fit(data)?;
        self.transform(data)
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}
