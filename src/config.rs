//! Central configuration for an anomaly-detection run.

/// Parameters of the detection pipeline.
///
/// `eps: None` means the radius is suggested from the k-distance curve at
/// [`AnalysisConfig::k_distance_percentile`] before clustering.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Column holding the unique patient identifier.
    pub patient_id_col: String,
    /// Numeric vital-sign columns used as features.
    pub feature_cols: Vec<String>,
    /// Neighborhood radius for DBSCAN. Suggested automatically when `None`.
    pub eps: Option<f64>,
    /// Minimum number of neighbors for a core point.
    pub min_samples: usize,
    /// Percentile of the k-distance curve used to suggest `eps`.
    pub k_distance_percentile: f64,
    /// Subsample cap for the k-distance computation on large datasets.
    pub max_samples_k_distance: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            patient_id_col: "patient_id".to_string(),
            feature_cols: vec![
                "blood_pressure_systolic".to_string(),
                "blood_pressure_diastolic".to_string(),
                "temperature_c".to_string(),
                "heart_rate_bpm".to_string(),
            ],
            eps: None,
            min_samples: 5,
            k_distance_percentile: 50.0,
            max_samples_k_distance: 1000,
        }
    }
}

impl AnalysisConfig {
    /// Columns the input table must contain: the identifier plus every feature.
    pub fn required_columns(&self) -> Vec<String> {
        let mut cols = vec![self.patient_id_col.clone()];
        cols.extend(self.feature_cols.iter().cloned());
        cols
    }
}
