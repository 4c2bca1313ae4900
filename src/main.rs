//! Command-line driver for the medical-vitals anomaly-detection pipeline.
//!
//! Usage:
//!   vitalscan --data data/patients.csv                # suggested eps
//!   vitalscan --data data/patients.csv --eps 0.5      # fixed eps
//!   vitalscan --data data/patients.csv --optimize     # grid search

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use vitalscan::cluster::{DBSCAN, identify_anomalies};
use vitalscan::evaluation::{evaluate_clustering, interpret_metrics};
use vitalscan::export::{export_results, write_k_distance_curve, write_summary_report};
use vitalscan::neighbors::{k_distance_curve, suggest_eps};
use vitalscan::optimize::{Objective, optimize_parameters};
use vitalscan::preprocessing::extract_features;
use vitalscan::{AnalysisConfig, StandardScaler, VitalsTable};

#[derive(Parser, Debug)]
#[command(name = "vitalscan")]
#[command(about = "Detect anomalous patient vital signs with density-based clustering")]
#[command(version)]
struct Args {
    /// CSV file with one row per patient
    #[arg(long, default_value = "data/patients.csv")]
    data: PathBuf,

    /// Neighborhood radius; suggested from the k-distance curve when omitted
    #[arg(long)]
    eps: Option<f64>,

    /// Minimum neighbors (itself included) for a core point
    #[arg(long, default_value_t = 5)]
    min_samples: usize,

    /// Grid-search (eps, min_samples) instead of using the k-distance suggestion
    #[arg(long)]
    optimize: bool,

    /// Scoring criterion for --optimize: "silhouette" or "clusters"
    #[arg(long, default_value = "silhouette")]
    objective: String,

    /// Percentile of the k-distance curve used to suggest eps
    #[arg(long, default_value_t = 50.0)]
    percentile: f64,

    /// Directory for result files
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,

    /// Skip writing CSV and report files
    #[arg(long)]
    no_export: bool,

    /// Log at debug level
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let config = AnalysisConfig {
        eps: args.eps,
        min_samples: args.min_samples,
        k_distance_percentile: args.percentile,
        ..AnalysisConfig::default()
    };

    info!("[step 1] loading data");
    let table = VitalsTable::from_csv_path(&args.data)
        .with_context(|| format!("loading {}", args.data.display()))?;
    table.validate_columns(&config.required_columns())?;

    info!("[step 2] preparing features");
    let features = extract_features(&table, &config.feature_cols, &config.patient_id_col)?;

    info!("[step 3] standardizing features");
    let mut scaler = StandardScaler::new();
    let x_scaled = scaler.fit_transform(&features.matrix)?;

    let (eps, min_samples) = if args.optimize {
        info!("[step 4] optimizing parameters");
        let objective: Objective = args.objective.parse()?;
        let outcome = optimize_parameters(&x_scaled, None, None, objective)?;
        (outcome.best.eps, outcome.best.min_samples)
    } else {
        info!("[step 4] computing k-distance curve");
        let curve = k_distance_curve(
            &x_scaled,
            config.min_samples,
            config.max_samples_k_distance,
        )?;
        if !args.no_export {
            std::fs::create_dir_all(&args.output_dir)
                .with_context(|| format!("creating {}", args.output_dir.display()))?;
            write_k_distance_curve(&curve, &args.output_dir.join("k_distance_curve.csv"))?;
        }
        let eps = match config.eps {
            Some(eps) => eps,
            None => suggest_eps(&curve, config.k_distance_percentile)?,
        };
        (eps, config.min_samples)
    };

    info!("[step 5] clustering (eps={eps:.4}, min_samples={min_samples})");
    let mut dbscan = DBSCAN::new(eps, min_samples);
    let labels = dbscan.fit_predict(&x_scaled)?;

    info!("[step 6] evaluating");
    let metrics = evaluate_clustering(&x_scaled, &labels);
    let interpretations = interpret_metrics(&metrics);

    info!("[step 7] identifying anomalies");
    let anomaly_ids = identify_anomalies(&labels, &features.ids)?;

    if !args.no_export {
        info!("[step 8] exporting results");
        let paths = export_results(&features, &labels, &args.output_dir)?;
        write_summary_report(
            &features,
            &labels,
            &metrics,
            &interpretations,
            &args.output_dir.join("summary_report.txt"),
        )?;
        info!("results: {}", paths.all_patients.display());
        info!("anomalies: {}", paths.anomalies.display());
    }

    println!("Patients analyzed: {}", labels.len());
    println!(
        "Anomalies detected: {} ({:.2}%)",
        anomaly_ids.len(),
        100.0 * anomaly_ids.len() as f64 / labels.len() as f64
    );
    println!("Clusters identified: {}", metrics.n_clusters);
    if let Some(s) = metrics.silhouette {
        println!("Silhouette score: {s:.4}");
    }
    println!("{}", interpretations.noise);

    Ok(())
}
