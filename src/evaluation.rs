//! Unsupervised clustering-quality metrics and their interpretation.

use log::{info, warn};
use ndarray::Axis;

use crate::neighbors::euclidean;
use crate::{Error, Labels, Matrix, Result, Vector};

/// Summary of a completed clustering. Quality scores are `None` whenever
/// fewer than 2 clusters exist or the computation fails.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusteringMetrics {
    pub n_clusters: usize,
    pub n_noise: usize,
    pub n_clustered: usize,
    pub noise_ratio: f64,
    pub silhouette: Option<f64>,
    pub calinski_harabasz: Option<f64>,
    pub davies_bouldin: Option<f64>,
}

/// Qualitative reading of [`ClusteringMetrics`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricInterpretation {
    pub silhouette: String,
    pub davies_bouldin: String,
    pub noise: String,
}

/// Computes all metrics for a label vector, noise restricted out.
///
/// A failing score computation is downgraded to `None` with a warning; it
/// never aborts the pipeline.
pub fn evaluate_clustering(x: &Matrix, labels: &Labels) -> ClusteringMetrics {
    info!("evaluating clustering quality");

    let summary = crate::cluster::summarize_labels(labels);
    let n_samples = labels.len();

    let mut metrics = ClusteringMetrics {
        n_clusters: summary.n_clusters,
        n_noise: summary.n_noise,
        n_clustered: summary.n_normal,
        noise_ratio: if n_samples > 0 {
            summary.n_noise as f64 / n_samples as f64
        } else {
            0.0
        },
        silhouette: None,
        calinski_harabasz: None,
        davies_bouldin: None,
    };

    if summary.n_clusters < 2 || summary.n_normal < 2 {
        warn!("fewer than 2 clusters, quality scores are undefined");
        return metrics;
    }

    let (xc, lc) = non_noise_subset(x, labels);

    metrics.silhouette = score_or_warn("silhouette", silhouette_score(&xc, &lc));
    metrics.calinski_harabasz =
        score_or_warn("calinski-harabasz", calinski_harabasz_score(&xc, &lc));
    metrics.davies_bouldin = score_or_warn("davies-bouldin", davies_bouldin_score(&xc, &lc));

    metrics
}

fn score_or_warn(name: &str, result: Result<f64>) -> Option<f64> {
    match result {
        Ok(score) => {
            info!("{name} score: {score:.4}");
            Some(score)
        }
        Err(e) => {
            warn!("could not compute {name} score: {e}");
            None
        }
    }
}

/// Rows and labels of the non-noise points.
pub fn non_noise_subset(x: &Matrix, labels: &Labels) -> (Matrix, Labels) {
    let keep: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|&(_, &l)| l != -1)
        .map(|(i, _)| i)
        .collect();

    let subset = x.select(Axis(0), &keep);
    let sub_labels = Labels::from(keep.iter().map(|&i| labels[i]).collect::<Vec<i32>>());
    (subset, sub_labels)
}

/// Mean silhouette coefficient over all points.
///
/// For each point, `(b - a) / max(a, b)` where `a` is the mean distance to
/// its own cluster and `b` the mean distance to the nearest other cluster.
/// Singleton clusters contribute 0.
pub fn silhouette_score(x: &Matrix, labels: &Labels) -> Result<f64> {
    let clusters = cluster_members(x, labels)?;
    if clusters.len() < 2 {
        return Err(Error::invalid("silhouette requires at least 2 clusters"));
    }

    let n = x.nrows();
    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        let own_members = &clusters
            .iter()
            .find(|(label, _)| *label == own)
            .expect("own cluster present")
            .1;

        let s = if own_members.len() == 1 {
            0.0
        } else {
            let a = mean_distance(x, i, own_members, true);
            let b = clusters
                .iter()
                .filter(|(label, _)| *label != own)
                .map(|(_, members)| mean_distance(x, i, members, false))
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 { (b - a) / denom } else { 0.0 }
        };
        total += s;
    }

    Ok(total / n as f64)
}

/// Ratio of between-cluster to within-cluster dispersion
/// (higher is better).
pub fn calinski_harabasz_score(x: &Matrix, labels: &Labels) -> Result<f64> {
    let clusters = cluster_members(x, labels)?;
    let k = clusters.len();
    if k < 2 {
        return Err(Error::invalid(
            "calinski-harabasz requires at least 2 clusters",
        ));
    }

    let n = x.nrows();
    let overall_mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| Error::invalid("empty matrix"))?;

    let mut extra = 0.0;
    let mut intra = 0.0;
    for (_, members) in &clusters {
        let centroid = centroid_of(x, members);
        let diff = &centroid - &overall_mean;
        extra += members.len() as f64 * diff.dot(&diff);
        for &i in members {
            let d = &x.row(i).to_owned() - &centroid;
            intra += d.dot(&d);
        }
    }

    if intra == 0.0 {
        return Ok(1.0);
    }
    Ok(extra * (n - k) as f64 / (intra * (k - 1) as f64))
}

/// Mean worst-case similarity between clusters (lower is better).
pub fn davies_bouldin_score(x: &Matrix, labels: &Labels) -> Result<f64> {
    let clusters = cluster_members(x, labels)?;
    let k = clusters.len();
    if k < 2 {
        return Err(Error::invalid("davies-bouldin requires at least 2 clusters"));
    }

    let centroids: Vec<Vector> = clusters
        .iter()
        .map(|(_, members)| centroid_of(x, members))
        .collect();
    let scatter: Vec<f64> = clusters
        .iter()
        .zip(centroids.iter())
        .map(|((_, members), centroid)| {
            members
                .iter()
                .map(|&i| euclidean(&x.row(i), &centroid.view()))
                .sum::<f64>()
                / members.len() as f64
        })
        .collect();

    let mut total = 0.0;
    for i in 0..k {
        let mut worst = 0.0f64;
        for j in 0..k {
            if i == j {
                continue;
            }
            let separation = euclidean(&centroids[i].view(), &centroids[j].view());
            worst = worst.max((scatter[i] + scatter[j]) / separation);
        }
        total += worst;
    }

    let score = total / k as f64;
    if !score.is_finite() {
        return Err(Error::invalid("coincident cluster centroids"));
    }
    Ok(score)
}

/// Maps numeric scores onto qualitative labels for reporting.
pub fn interpret_metrics(metrics: &ClusteringMetrics) -> MetricInterpretation {
    let silhouette = match metrics.silhouette {
        Some(s) if s > 0.7 => "Excellent clustering (silhouette > 0.7)",
        Some(s) if s > 0.5 => "Good clustering (silhouette > 0.5)",
        Some(s) if s > 0.25 => "Acceptable clustering (silhouette > 0.25)",
        Some(_) => "Weak clustering (silhouette < 0.25)",
        None => "Not computable (too few clusters)",
    };

    let davies_bouldin = match metrics.davies_bouldin {
        Some(db) if db < 0.5 => "Excellent cluster separation (DB < 0.5)",
        Some(db) if db < 1.0 => "Good separation (DB < 1.0)",
        Some(_) => "Moderate separation (DB >= 1.0)",
        None => "Not computable",
    };

    let noise = if metrics.noise_ratio < 0.1 {
        "Few anomalies detected (< 10%)"
    } else if metrics.noise_ratio < 0.3 {
        "Moderate proportion of anomalies (10-30%)"
    } else {
        "Many anomalies detected (> 30%)"
    };

    MetricInterpretation {
        silhouette: silhouette.to_string(),
        davies_bouldin: davies_bouldin.to_string(),
        noise: noise.to_string(),
    }
}

/// Groups row indices by label, sorted by label for determinism.
fn cluster_members(x: &Matrix, labels: &Labels) -> Result<Vec<(i32, Vec<usize>)>> {
    if x.nrows() != labels.len() {
        return Err(Error::invalid(format!(
            "{} rows but {} labels",
            x.nrows(),
            labels.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(Error::invalid("empty matrix"));
    }

    let mut unique: Vec<i32> = labels.to_vec();
    unique.sort_unstable();
    unique.dedup();

    Ok(unique
        .into_iter()
        .map(|label| {
            let members = labels
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == label)
                .map(|(i, _)| i)
                .collect();
            (label, members)
        })
        .collect())
}

fn centroid_of(x: &Matrix, members: &[usize]) -> Vector {
    let mut centroid = Vector::zeros(x.ncols());
    for &i in members {
        centroid += &x.row(i);
    }
    centroid / members.len() as f64
}

fn mean_distance(x: &Matrix, from: usize, members: &[usize], exclude_self: bool) -> f64 {
    let mut count = 0usize;
    let mut sum = 0.0;
    for &i in members {
        if exclude_self && i == from {
            continue;
        }
        sum += euclidean(&x.row(from), &x.row(i));
        count += 1;
    }
    sum / count as f64
}
