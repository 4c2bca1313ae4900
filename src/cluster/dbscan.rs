use std::collections::VecDeque;

use log::info;

use crate::neighbors::euclidean;
use crate::{Error, Labels, Matrix, Result};

/// Distance metric used for the neighborhood query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Metric {
    #[default]
    Euclidean,
    Manhattan,
}

/// Density-based clustering. Points in no cluster are labeled `-1`.
///
/// Two points are neighbors when their distance is at most `eps`; a point
/// with at least `min_samples` neighbors (itself included) is a core point,
/// and a cluster is a maximal set of density-reachable core points plus
/// their border points. Deterministic for identical inputs and metric.
#[derive(Clone, Debug)]
pub struct DBSCAN {
    pub labels: Option<Labels>,
    pub core_sample_indices: Option<Vec<usize>>,
    eps: f64,
    min_samples: usize,
    metric: Metric,
}

impl DBSCAN {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        if eps <= 0.0 {
            panic!("eps must be > 0, got {}", eps);
        }
        if min_samples == 0 {
            panic!("min_samples must be > 0, got {}", min_samples);
        }

        Self {
            labels: None,
            core_sample_indices: None,
            eps,
            min_samples,
            metric: Metric::Euclidean,
        }
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(Error::invalid(
                "input matrix must have at least one sample and one feature",
            ));
        }

        let n_samples = x.nrows();

        // Neighborhood lists include the point itself, so min_samples counts it.
        let neighborhoods: Vec<Vec<usize>> =
            (0..n_samples).map(|i| self.region_query(x, i)).collect();
        let is_core: Vec<bool> = neighborhoods
            .iter()
            .map(|n| n.len() >= self.min_samples)
            .collect();

        let mut labels = Labels::from_elem(n_samples, -1);
        let mut assigned = vec![false; n_samples];
        let mut current_cluster = 0i32;

        for i in 0..n_samples {
            if assigned[i] || !is_core[i] {
                continue;
            }

            // Grow a new cluster outward from this core point. Border points
            // are claimed by the first cluster that reaches them and are not
            // expanded further.
            assigned[i] = true;
            labels[i] = current_cluster;
            let mut queue = VecDeque::from([i]);

            while let Some(point) = queue.pop_front() {
                for &neighbor in &neighborhoods[point] {
                    if !assigned[neighbor] {
                        assigned[neighbor] = true;
                        labels[neighbor] = current_cluster;
                        if is_core[neighbor] {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }

            current_cluster += 1;
        }

        let core_samples: Vec<usize> = (0..n_samples).filter(|&i| is_core[i]).collect();
        let summary = summarize_labels(&labels);
        info!(
            "dbscan done (eps={:.4}, min_samples={}): {} clusters, {} normal ({:.2}%), {} anomalies ({:.2}%)",
            self.eps,
            self.min_samples,
            summary.n_clusters,
            summary.n_normal,
            100.0 * summary.n_normal as f64 / n_samples as f64,
            summary.n_noise,
            100.0 * summary.n_noise as f64 / n_samples as f64,
        );

        self.labels = Some(labels);
        self.core_sample_indices = Some(core_samples);

        Ok(())
    }

    pub fn fit_predict(&mut self, x: &Matrix) -> Result<Labels> {
        self.fit(x)?;
        Ok(self.labels.clone().expect("labels set by fit"))
    }

    pub fn n_clusters(&self) -> Option<usize> {
        self.labels.as_ref().map(|l| summarize_labels(l).n_clusters)
    }

    pub fn n_noise_points(&self) -> Option<usize> {
        self.labels.as_ref().map(|l| summarize_labels(l).n_noise)
    }

    pub fn is_core_sample(&self, sample_idx: usize) -> Option<bool> {
        self.core_sample_indices
            .as_ref()
            .map(|core| core.contains(&sample_idx))
    }

    fn region_query(&self, x: &Matrix, point_idx: usize) -> Vec<usize> {
        let point = x.row(point_idx);
        (0..x.nrows())
            .filter(|&i| self.distance(&point, &x.row(i)) <= self.eps)
            .collect()
    }

    fn distance(&self, a: &ndarray::ArrayView1<f64>, b: &ndarray::ArrayView1<f64>) -> f64 {
        match self.metric {
            Metric::Euclidean => euclidean(a, b),
            Metric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// Counts derived from a label vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LabelSummary {
    /// Distinct clusters, noise excluded.
    pub n_clusters: usize,
    pub n_noise: usize,
    pub n_normal: usize,
}

pub fn summarize_labels(labels: &Labels) -> LabelSummary {
    let mut clusters: Vec<i32> = labels.iter().copied().filter(|&l| l >= 0).collect();
    clusters.sort_unstable();
    clusters.dedup();

    let n_noise = labels.iter().filter(|&&l| l == -1).count();
    LabelSummary {
        n_clusters: clusters.len(),
        n_noise,
        n_normal: labels.len() - n_noise,
    }
}

/// Returns the identifiers labeled as noise.
pub fn identify_anomalies(labels: &Labels, ids: &[String]) -> Result<Vec<String>> {
    if labels.len() != ids.len() {
        return Err(Error::invalid(format!(
            "{} labels but {} identifiers",
            labels.len(),
            ids.len()
        )));
    }

    let anomalies: Vec<String> = labels
        .iter()
        .zip(ids.iter())
        .filter(|&(&label, _)| label == -1)
        .map(|(_, id)| id.clone())
        .collect();

    info!("anomalies identified: {} patients", anomalies.len());
    Ok(anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dbscan_basic() {
        // Two distinct clusters and one outlier.
        let x = array![
            [1.0, 1.0],
            [1.2, 1.1],
            [1.1, 1.2],
            [8.0, 8.0],
            [8.1, 8.1],
            [8.2, 7.9],
            [15.0, 1.0]
        ];

        let mut dbscan = DBSCAN::new(1.0, 2);
        let labels = dbscan.fit_predict(&x).unwrap();

        assert_eq!(labels.len(), x.nrows());
        assert_eq!(dbscan.n_clusters(), Some(2));
        assert_eq!(labels[6], -1);
        assert!(!dbscan.core_sample_indices.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_dbscan_all_noise() {
        let x = array![
            [0.0, 0.0],
            [10.0, 10.0],
            [20.0, 20.0],
            [30.0, 30.0]
        ];

        let mut dbscan = DBSCAN::new(1.0, 2);
        let labels = dbscan.fit_predict(&x).unwrap();

        assert_eq!(dbscan.n_noise_points(), Some(x.nrows()));
        assert!(labels.iter().all(|&l| l == -1));
    }

    #[test]
    fn test_dbscan_single_cluster() {
        let x = array![
            [1.0, 1.0],
            [1.1, 1.0],
            [1.0, 1.1],
            [1.1, 1.1],
            [1.2, 1.0],
            [1.0, 1.2]
        ];

        let mut dbscan = DBSCAN::new(0.5, 2);
        let labels = dbscan.fit_predict(&x).unwrap();

        assert_eq!(dbscan.n_clusters(), Some(1));
        for &label in labels.iter() {
            assert_eq!(label, 0);
        }
    }

    #[test]
    fn test_dbscan_deterministic() {
        let x = array![
            [1.0, 1.0],
            [1.2, 1.1],
            [5.0, 5.0],
            [5.1, 5.2],
            [9.0, 0.0]
        ];

        let first = DBSCAN::new(0.7, 2).fit_predict(&x).unwrap();
        let second = DBSCAN::new(0.7, 2).fit_predict(&x).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_dbscan_manhattan_metric() {
        let x = array![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0]
        ];

        let mut dbscan = DBSCAN::new(1.5, 2).metric(Metric::Manhattan);
        dbscan.fit(&x).unwrap();
        assert_eq!(dbscan.n_clusters(), Some(1));
    }

    #[test]
    fn test_dbscan_border_point_joins_cluster() {
        // The last point reaches only one core point, so it joins the dense
        // cluster as a border point instead of becoming noise.
        let x = array![[0.0], [0.5], [1.0], [1.5], [2.4]];

        let mut dbscan = DBSCAN::new(1.0, 3);
        let labels = dbscan.fit_predict(&x).unwrap();

        assert_eq!(labels[4], 0);
        assert_eq!(dbscan.is_core_sample(4), Some(false));
    }

    #[test]
    fn test_dbscan_invalid_eps() {
        std::panic::catch_unwind(|| {
            DBSCAN::new(-1.0, 2);
        })
        .expect_err("Should panic on negative eps");

        std::panic::catch_unwind(|| {
            DBSCAN::new(0.0, 2);
        })
        .expect_err("Should panic on zero eps");
    }

    #[test]
    fn test_dbscan_invalid_min_samples() {
        std::panic::catch_unwind(|| {
            DBSCAN::new(1.0, 0);
        })
        .expect_err("Should panic on zero min_samples");
    }

    #[test]
    fn test_summarize_labels() {
        let labels = Labels::from(vec![0, 0, 1, -1, 1, -1]);
        let summary = summarize_labels(&labels);
        assert_eq!(summary.n_clusters, 2);
        assert_eq!(summary.n_noise, 2);
        assert_eq!(summary.n_normal, 4);
    }

    #[test]
    fn test_identify_anomalies() {
        let labels = Labels::from(vec![0, -1, 0, -1]);
        let ids: Vec<String> = ["p1", "p2", "p3", "p4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let anomalies = identify_anomalies(&labels, &ids).unwrap();
        assert_eq!(anomalies, vec!["p2", "p4"]);
    }

    #[test]
    fn test_identify_anomalies_length_mismatch() {
        let labels = Labels::from(vec![0, -1]);
        let ids = vec!["p1".to_string()];
        assert!(identify_anomalies(&labels, &ids).is_err());
    }
}
