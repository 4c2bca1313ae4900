use ndarray::Array2;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Normal;
use rand::SeedableRng;
use rand::rngs::StdRng;

use vitalscan::cluster::{DBSCAN, identify_anomalies};
use vitalscan::evaluation::{evaluate_clustering, interpret_metrics};
use vitalscan::neighbors::{k_distance_curve, suggest_eps};
use vitalscan::preprocessing::extract_features;
use vitalscan::{AnalysisConfig, StandardScaler, VitalsTable};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Medical Vitals Anomaly Detection ===\n");

    let config = AnalysisConfig::default();
    let table = synthetic_patients(60)?;
    println!(
        "Dataset: {} rows, {} columns (2 planted outliers, 1 duplicate id, 1 missing cell)",
        table.n_rows(),
        table.headers().len()
    );

    // Clean, extract and standardize.
    let features = extract_features(&table, &config.feature_cols, &config.patient_id_col)?;
    println!(
        "After cleaning: {} patients ({} duplicates dropped, {} values imputed)\n",
        features.n_samples(),
        features.duplicates_dropped,
        features.values_imputed
    );

    let mut scaler = StandardScaler::new();
    let x_scaled = scaler.fit_transform(&features.matrix)?;

    // Size the radius from the k-distance curve.
    let curve = k_distance_curve(&x_scaled, config.min_samples, config.max_samples_k_distance)?;
    let eps = suggest_eps(&curve, config.k_distance_percentile)?;
    println!("=== Radius Suggestion ===");
    println!(
        "k-distance curve (k={}): max={:.4}, min={:.4}",
        config.min_samples,
        curve[0],
        curve[curve.len() - 1]
    );
    println!("Suggested eps (median): {eps:.4}\n");

    // Cluster and inspect.
    let mut dbscan = DBSCAN::new(eps, config.min_samples);
    let labels = dbscan.fit_predict(&x_scaled)?;

    println!("=== Clustering Results ===");
    let metrics = evaluate_clustering(&x_scaled, &labels);
    println!("Clusters found: {}", metrics.n_clusters);
    println!(
        "Anomalies: {} of {} ({:.1}%)",
        metrics.n_noise,
        labels.len(),
        100.0 * metrics.noise_ratio
    );
    match metrics.silhouette {
        Some(s) => println!("Silhouette score: {s:.4}"),
        None => println!("Silhouette score: undefined (single cluster)"),
    }

    let interp = interpret_metrics(&metrics);
    println!("\n=== Interpretation ===");
    println!("{}", interp.silhouette);
    println!("{}", interp.davies_bouldin);
    println!("{}", interp.noise);

    let anomalies = identify_anomalies(&labels, &features.ids)?;
    println!("\nFlagged patients: {anomalies:?}");

    Ok(())
}

/// Builds a synthetic patient table: a normal cohort plus two extreme
/// outliers, one duplicated identifier and one missing temperature.
fn synthetic_patients(n: usize) -> Result<VitalsTable, Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(42);

    let systolic = Array2::random_using((n, 1), Normal::new(120.0, 9.0)?, &mut rng);
    let diastolic = Array2::random_using((n, 1), Normal::new(80.0, 7.0)?, &mut rng);
    let temperature = Array2::random_using((n, 1), Normal::new(36.8, 0.4)?, &mut rng);
    let heart_rate = Array2::random_using((n, 1), Normal::new(72.0, 8.0)?, &mut rng);

    let headers = vec![
        "patient_id".to_string(),
        "blood_pressure_systolic".to_string(),
        "blood_pressure_diastolic".to_string(),
        "temperature_c".to_string(),
        "heart_rate_bpm".to_string(),
    ];

    let mut rows = Vec::new();
    for i in 0..n {
        rows.push(vec![
            format!("P{:03}", i + 1),
            format!("{:.1}", systolic[[i, 0]]),
            format!("{:.1}", diastolic[[i, 0]]),
            format!("{:.2}", temperature[[i, 0]]),
            format!("{:.1}", heart_rate[[i, 0]]),
        ]);
    }

    // Two patients in crisis, far outside the cohort in every vital.
    rows.push(vec![
        "P900".to_string(),
        "210.0".to_string(),
        "130.0".to_string(),
        "40.1".to_string(),
        "150.0".to_string(),
    ]);
    rows.push(vec![
        "P901".to_string(),
        "75.0".to_string(),
        "45.0".to_string(),
        "33.9".to_string(),
        "38.0".to_string(),
    ]);

    // A re-admitted patient keyed twice and a dropped sensor reading.
    let mut duplicate = rows[0].clone();
    duplicate[1] = "119.0".to_string();
    rows.push(duplicate);
    rows[5][3] = String::new();

    Ok(VitalsTable::from_rows(headers, rows)?)
}
