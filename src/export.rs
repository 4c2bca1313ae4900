//! CSV and text-report exports of a completed analysis.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::evaluation::{ClusteringMetrics, MetricInterpretation};
use crate::{Error, FeatureSet, Labels, Result, Vector};

/// Files produced by [`export_results`].
#[derive(Clone, Debug)]
pub struct ExportPaths {
    pub all_patients: PathBuf,
    pub anomalies: PathBuf,
}

/// Writes the labeled patient table and the anomalies-only subset.
pub fn export_results(
    features: &FeatureSet,
    labels: &Labels,
    output_dir: &Path,
) -> Result<ExportPaths> {
    if labels.len() != features.n_samples() {
        return Err(Error::invalid(format!(
            "{} labels but {} rows",
            labels.len(),
            features.n_samples()
        )));
    }

    fs::create_dir_all(output_dir).map_err(|source| Error::WriteFile {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let all_patients = output_dir.join("patients_with_clusters.csv");
    write_labeled_csv(features, labels, &all_patients, false)?;
    info!(
        "wrote {} ({} patients)",
        all_patients.display(),
        features.n_samples()
    );

    let anomalies = output_dir.join("patients_anomalies.csv");
    write_labeled_csv(features, labels, &anomalies, true)?;
    let n_anomalies = labels.iter().filter(|&&l| l == -1).count();
    info!("wrote {} ({} anomalies)", anomalies.display(), n_anomalies);

    Ok(ExportPaths {
        all_patients,
        anomalies,
    })
}

fn write_labeled_csv(
    features: &FeatureSet,
    labels: &Labels,
    path: &Path,
    anomalies_only: bool,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![features.id_column.clone()];
    header.extend(features.columns.iter().cloned());
    header.push("cluster_label".to_string());
    header.push("is_anomaly".to_string());
    writer.write_record(&header)?;

    for (i, id) in features.ids.iter().enumerate() {
        let label = labels[i];
        if anomalies_only && label != -1 {
            continue;
        }

        let mut record = vec![id.clone()];
        for j in 0..features.n_features() {
            record.push(features.matrix[[i, j]].to_string());
        }
        record.push(label.to_string());
        record.push((label == -1).to_string());
        writer.write_record(&record)?;
    }

    writer.flush().map_err(|source| Error::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Writes the sorted k-distance curve as a two-column CSV, one row per
/// point rank.
pub fn write_k_distance_curve(curve: &Vector, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["rank", "k_distance"])?;
    for (rank, distance) in curve.iter().enumerate() {
        writer.write_record([rank.to_string(), distance.to_string()])?;
    }
    writer.flush().map_err(|source| Error::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;

    info!("wrote {}", path.display());
    Ok(())
}

/// Writes a plain-text summary of the analysis.
pub fn write_summary_report(
    features: &FeatureSet,
    labels: &Labels,
    metrics: &ClusteringMetrics,
    interpretations: &MetricInterpretation,
    path: &Path,
) -> Result<()> {
    let n_total = labels.len();
    let n_anomalies = metrics.n_noise;
    let n_normal = n_total - n_anomalies;
    let pct = |count: usize| 100.0 * count as f64 / n_total.max(1) as f64;

    let mut report = String::new();
    let rule = "=".repeat(70);
    let line = "-".repeat(70);

    report.push_str(&format!("{rule}\nDBSCAN ANALYSIS REPORT - MEDICAL ANOMALY DETECTION\n{rule}\n\n"));

    report.push_str(&format!("OVERALL SUMMARY\n{line}\n"));
    report.push_str(&format!("Total patients analyzed: {n_total}\n"));
    report.push_str(&format!(
        "Normal patients (clustered): {n_normal} ({:.2}%)\n",
        pct(n_normal)
    ));
    report.push_str(&format!(
        "Anomalies detected: {n_anomalies} ({:.2}%)\n",
        pct(n_anomalies)
    ));
    report.push_str(&format!("Clusters identified: {}\n\n", metrics.n_clusters));

    report.push_str(&format!("ANOMALY STATISTICS\n{line}\n"));
    if n_anomalies > 0 {
        for (j, col) in features.columns.iter().enumerate() {
            let values: Vec<f64> = labels
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == -1)
                .map(|(i, _)| features.matrix[[i, j]])
                .collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let std = sample_std(&values, mean);
            report.push_str(&format!("{col}: mean={mean:.2}, std={std:.2}\n"));
        }
    } else {
        report.push_str("No anomalies detected.\n");
    }
    report.push('\n');

    report.push_str(&format!("CLUSTERING QUALITY\n{line}\n"));
    match metrics.silhouette {
        Some(s) => report.push_str(&format!("Silhouette score: {s:.4}\n")),
        None => report.push_str("Silhouette score: undefined\n"),
    }
    match metrics.calinski_harabasz {
        Some(s) => report.push_str(&format!("Calinski-Harabasz score: {s:.4}\n")),
        None => report.push_str("Calinski-Harabasz score: undefined\n"),
    }
    match metrics.davies_bouldin {
        Some(s) => report.push_str(&format!("Davies-Bouldin score: {s:.4}\n")),
        None => report.push_str("Davies-Bouldin score: undefined\n"),
    }
    report.push('\n');

    report.push_str(&format!("INTERPRETATION\n{line}\n"));
    report.push_str(&format!("{}\n", interpretations.silhouette));
    report.push_str(&format!("{}\n", interpretations.davies_bouldin));
    report.push_str(&format!("{}\n\n", interpretations.noise));

    report.push_str(
        "Patients flagged as anomalies (cluster = -1) have vital signs that\n\
         deviate significantly from the normal population and warrant\n\
         immediate medical review. The identified clusters group patients\n\
         with similar vital-sign profiles.\n",
    );

    fs::write(path, report).map_err(|source| Error::WriteFile {
        path: path.to_path_buf(),
        source,
    })?;

    info!("wrote {}", path.display());
    Ok(())
}

fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
        / (values.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Matrix;
    use crate::evaluation::{evaluate_clustering, interpret_metrics};

    fn feature_set() -> FeatureSet {
        FeatureSet {
            ids: vec!["p1".to_string(), "p2".to_string(), "p3".to_string()],
            id_column: "patient_id".to_string(),
            columns: vec!["heart_rate_bpm".to_string()],
            matrix: Matrix::from_shape_vec((3, 1), vec![70.0, 72.0, 180.0]).unwrap(),
            duplicates_dropped: 0,
            values_imputed: 0,
        }
    }

    #[test]
    fn test_export_results_files() {
        let dir = tempfile::tempdir().unwrap();
        let features = feature_set();
        let labels = Labels::from(vec![0, 0, -1]);

        let paths = export_results(&features, &labels, dir.path()).unwrap();

        let all = fs::read_to_string(&paths.all_patients).unwrap();
        let mut lines = all.lines();
        assert_eq!(
            lines.next().unwrap(),
            "patient_id,heart_rate_bpm,cluster_label,is_anomaly"
        );
        assert_eq!(all.lines().count(), 4);

        let anomalies = fs::read_to_string(&paths.anomalies).unwrap();
        assert_eq!(anomalies.lines().count(), 2);
        assert!(anomalies.contains("p3,180,-1,true"));
    }

    #[test]
    fn test_export_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let features = feature_set();
        let labels = Labels::from(vec![0, 0]);
        assert!(export_results(&features, &labels, dir.path()).is_err());
    }

    #[test]
    fn test_summary_report_contents() {
        let dir = tempfile::tempdir().unwrap();
        let features = feature_set();
        let labels = Labels::from(vec![0, 0, -1]);
        let metrics = evaluate_clustering(&features.matrix, &labels);
        let interp = interpret_metrics(&metrics);

        let path = dir.path().join("summary_report.txt");
        write_summary_report(&features, &labels, &metrics, &interp, &path).unwrap();

        let report = fs::read_to_string(&path).unwrap();
        assert!(report.contains("Total patients analyzed: 3"));
        assert!(report.contains("Anomalies detected: 1"));
        assert!(report.contains("heart_rate_bpm: mean=180.00, std=0.00"));
        assert!(report.contains("Silhouette score: undefined"));
    }

    #[test]
    fn test_k_distance_curve_export() {
        let dir = tempfile::tempdir().unwrap();
        let curve = Vector::from(vec![3.0, 2.0, 1.0]);
        let path = dir.path().join("k_distance_curve.csv");

        write_k_distance_curve(&curve, &path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4);
        assert!(contents.starts_with("rank,k_distance"));
    }
}
