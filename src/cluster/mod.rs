//! Density-based clustering for anomaly detection.
//!
//! [`DBSCAN`] assigns every record either to a density cluster (label `>= 0`)
//! or to noise (label `-1`); noise points are the anomalies the pipeline is
//! after. Cluster ids carry no meaning across runs.
//!
//! # Examples
//!
//! ```rust
//! use vitalscan::cluster::{DBSCAN, summarize_labels};
//! use ndarray::array;
//!
//! let x = array![
//!     [1.0, 1.0],
//!     [1.2, 1.1],
//!     [1.1, 1.2],
//!     [8.0, 8.0],
//!     [8.1, 8.1],
//!     [8.2, 7.9],
//!     [15.0, 1.0] // Outlier
//! ];
//!
//! let mut dbscan = DBSCAN::new(1.0, 2); // eps=1.0, min_samples=2
//! let labels = dbscan.fit_predict(&x).unwrap();
//!
//! let summary = summarize_labels(&labels);
//! assert_eq!(summary.n_clusters, 2);
//! assert_eq!(summary.n_noise, 1);
//! ```

mod dbscan;

pub use dbscan::{DBSCAN, LabelSummary, Metric, identify_anomalies, summarize_labels};
