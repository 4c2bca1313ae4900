//! Density-based anomaly detection for medical vital signs.
//!
//! The pipeline goes from a raw patient table to per-patient anomaly labels:
//!
//! 1. [`dataset::VitalsTable`] loads and validates the tabular input.
//! 2. [`preprocessing::extract_features`] deduplicates patients, imputes
//!    missing vitals with the column median and builds the feature matrix;
//!    [`preprocessing::StandardScaler`] standardizes it.
//! 3. [`neighbors::k_distance_curve`] and [`neighbors::suggest_eps`] size the
//!    density radius, or [`optimize::optimize_parameters`] grid-searches
//!    (eps, min_samples) combinations.
//! 4. [`cluster::DBSCAN`] assigns cluster labels; `-1` marks an anomaly.
//! 5. [`evaluation::evaluate_clustering`] scores the result and
//!    [`evaluation::interpret_metrics`] turns the scores into plain language.
//!
//! # Examples
//!
//! ```rust
//! use vitalscan::{DBSCAN, StandardScaler};
//! use vitalscan::evaluation::evaluate_clustering;
//! use ndarray::array;
//!
//! let x = array![
//!     [80.0, 120.0],
//!     [82.0, 118.0],
//!     [79.0, 121.0],
//!     [81.0, 119.0],
//!     [150.0, 200.0] // Outlier
//! ];
//!
//! let mut scaler = StandardScaler::new();
//! let x_scaled = scaler.fit_transform(&x).unwrap();
//!
//! let mut dbscan = DBSCAN::new(1.0, 3);
//! let labels = dbscan.fit_predict(&x_scaled).unwrap();
//! assert_eq!(labels[4], -1); // The outlier is flagged as noise
//!
//! let metrics = evaluate_clustering(&x_scaled, &labels);
//! assert_eq!(metrics.n_clusters, 1);
//! assert_eq!(metrics.n_noise, 1);
//! ```

pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod cluster;
pub mod config;
pub mod dataset;
mod error;
pub mod evaluation;
pub mod export;
pub mod neighbors;
pub mod optimize;
pub mod preprocessing;

pub use cluster::{DBSCAN, LabelSummary};
pub use config::AnalysisConfig;
pub use dataset::VitalsTable;
pub use error::{Error, Result};
pub use preprocessing::{FeatureSet, StandardScaler};

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;

/// Cluster assignments, one per retained record. `-1` denotes noise.
pub type Labels = Array1<i32>;
