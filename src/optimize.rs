//! Exhaustive grid search over DBSCAN parameters.

use std::str::FromStr;

use log::info;

use crate::cluster::{DBSCAN, summarize_labels};
use crate::evaluation::{non_noise_subset, silhouette_score};
use crate::neighbors::{k_distance_curve, suggest_eps};
use crate::{Error, Matrix, Result};

/// Scoring criterion for a (eps, min_samples) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Objective {
    /// Silhouette on non-noise points; pairs with fewer than 2 clusters
    /// never win.
    #[default]
    Silhouette,
    /// Cluster count minus noise ratio: reward structure, penalize noise.
    Clusters,
}

impl FromStr for Objective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "silhouette" => Ok(Objective::Silhouette),
            "clusters" => Ok(Objective::Clusters),
            other => Err(Error::invalid(format!(
                "unknown objective {other:?}, expected \"silhouette\" or \"clusters\""
            ))),
        }
    }
}

/// Explicit eps sweep: `min` inclusive, `max` exclusive, fixed `step`.
#[derive(Clone, Copy, Debug)]
pub struct EpsRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl EpsRange {
    pub fn values(&self) -> Result<Vec<f64>> {
        if self.step <= 0.0 {
            return Err(Error::invalid(format!(
                "eps step must be > 0, got {}",
                self.step
            )));
        }
        if self.max < self.min {
            return Err(Error::invalid(format!(
                "eps range is inverted: min={}, max={}",
                self.min, self.max
            )));
        }

        let count = ((self.max - self.min) / self.step).ceil() as usize;
        let values: Vec<f64> = (0..count).map(|i| self.min + i as f64 * self.step).collect();
        if values.is_empty() {
            return Err(Error::invalid("eps range contains no values"));
        }
        Ok(values)
    }
}

/// One evaluated grid cell. `score` is `-1` for pairs the silhouette
/// objective could not score.
#[derive(Clone, Debug)]
pub struct GridPoint {
    pub eps: f64,
    pub min_samples: usize,
    pub n_clusters: usize,
    pub n_noise: usize,
    pub score: f64,
}

/// Best parameters plus every evaluated cell for inspection.
#[derive(Clone, Debug)]
pub struct OptimizationOutcome {
    pub best: GridPoint,
    pub results: Vec<GridPoint>,
}

/// Default cap on points used when deriving the eps range from the
/// k-distance curve.
const DEFAULT_MAX_SAMPLES: usize = 1000;

/// Exhaustively evaluates every (eps, min_samples) pair and returns the
/// best-scoring one.
///
/// When `eps_range` is `None` the sweep covers the 10th to 90th percentile
/// of a k=5 k-distance curve in 20 steps; `min_samples_range` defaults to
/// 3..=10. Pairs yielding zero clusters, or more clusters than half the
/// sample count, are degenerate and skipped. The sweep order is eps
/// ascending then min_samples ascending, and only a strictly better score
/// replaces the current best, so ties go to the first maximum encountered.
pub fn optimize_parameters(
    x: &Matrix,
    eps_range: Option<EpsRange>,
    min_samples_range: Option<(usize, usize)>,
    objective: Objective,
) -> Result<OptimizationOutcome> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(Error::invalid(
            "input matrix must have at least one sample and one feature",
        ));
    }

    let mut eps_values = match eps_range {
        Some(range) => range.values()?,
        None => derive_eps_values(x)?,
    };
    eps_values.retain(|&eps| eps > 0.0);
    if eps_values.is_empty() {
        return Err(Error::invalid("eps range contains no positive values"));
    }

    let (ms_min, ms_max) = min_samples_range.unwrap_or((3, 10));
    if ms_min == 0 || ms_max < ms_min {
        return Err(Error::invalid(format!(
            "invalid min_samples range: {ms_min}..={ms_max}"
        )));
    }

    info!(
        "grid search over {} eps values x {} min_samples values ({:?} objective)",
        eps_values.len(),
        ms_max - ms_min + 1,
        objective
    );

    let n = x.nrows();
    let mut results = Vec::new();
    let mut best: Option<GridPoint> = None;
    let mut best_score = f64::NEG_INFINITY;

    for &eps in &eps_values {
        for min_samples in ms_min..=ms_max {
            let labels = DBSCAN::new(eps, min_samples).fit_predict(x)?;
            let summary = summarize_labels(&labels);

            // Degenerate extremes are not worth scoring.
            if summary.n_clusters == 0 || summary.n_clusters > n / 2 {
                continue;
            }

            let qualifying = match objective {
                Objective::Silhouette => {
                    if summary.n_clusters >= 2 && summary.n_normal > 1 {
                        let (xc, lc) = non_noise_subset(x, &labels);
                        silhouette_score(&xc, &lc).ok()
                    } else {
                        None
                    }
                }
                Objective::Clusters => {
                    Some(summary.n_clusters as f64 - summary.n_noise as f64 / n as f64)
                }
            };

            let point = GridPoint {
                eps,
                min_samples,
                n_clusters: summary.n_clusters,
                n_noise: summary.n_noise,
                score: qualifying.unwrap_or(-1.0),
            };

            if let Some(score) = qualifying {
                if score > best_score {
                    best_score = score;
                    best = Some(point.clone());
                }
            }
            results.push(point);
        }
    }

    let best = best.ok_or(Error::NoViableParameters)?;
    info!(
        "best parameters: eps={:.4}, min_samples={}, score={:.4}, clusters={}, anomalies={}",
        best.eps, best.min_samples, best.score, best.n_clusters, best.n_noise
    );

    Ok(OptimizationOutcome { best, results })
}

/// Derives the default eps sweep from the k-distance curve: 10th to 90th
/// percentile split into 20 steps.
fn derive_eps_values(x: &Matrix) -> Result<Vec<f64>> {
    let curve = k_distance_curve(x, 5, DEFAULT_MAX_SAMPLES)?;
    let eps_min = suggest_eps(&curve, 10.0)?;
    let eps_max = suggest_eps(&curve, 90.0)?;
    let step = (eps_max - eps_min) / 20.0;

    info!("derived eps range: {eps_min:.4} to {eps_max:.4}");

    if step > 0.0 {
        EpsRange {
            min: eps_min,
            max: eps_max,
            step,
        }
        .values()
    } else {
        // Degenerate curve (all k-distances equal): single candidate.
        Ok(vec![eps_min])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Labels;
    use ndarray::array;

    fn blobs_with_outliers() -> Matrix {
        array![
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, 0.2],
            [0.2, 0.2],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
            [5.2, 5.1],
            [20.0, 0.0],
            [0.0, 20.0]
        ]
    }

    #[test]
    fn test_eps_range_values() {
        let values = EpsRange {
            min: 0.1,
            max: 0.5,
            step: 0.1,
        }
        .values()
        .unwrap();
        assert_eq!(values.len(), 4);
        assert!((values[0] - 0.1).abs() < 1e-12);
        assert!((values[3] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_eps_range_invalid() {
        assert!(
            EpsRange {
                min: 0.1,
                max: 0.5,
                step: 0.0
            }
            .values()
            .is_err()
        );
        assert!(
            EpsRange {
                min: 0.5,
                max: 0.1,
                step: 0.1
            }
            .values()
            .is_err()
        );
    }

    #[test]
    fn test_objective_from_str() {
        assert_eq!(
            "silhouette".parse::<Objective>().unwrap(),
            Objective::Silhouette
        );
        assert_eq!("clusters".parse::<Objective>().unwrap(), Objective::Clusters);
        assert!("banana".parse::<Objective>().is_err());
    }

    #[test]
    fn test_optimizer_finds_two_blobs() {
        let x = blobs_with_outliers();
        let outcome = optimize_parameters(
            &x,
            Some(EpsRange {
                min: 0.3,
                max: 1.5,
                step: 0.3,
            }),
            Some((2, 4)),
            Objective::Silhouette,
        )
        .unwrap();

        assert_eq!(outcome.best.n_clusters, 2);
        assert!(outcome.best.score > 0.8);
        assert!(!outcome.results.is_empty());
    }

    #[test]
    fn test_optimizer_never_selects_degenerate_pairs() {
        let x = blobs_with_outliers();
        let n = x.nrows();
        let outcome = optimize_parameters(
            &x,
            Some(EpsRange {
                min: 0.1,
                max: 2.0,
                step: 0.1,
            }),
            Some((2, 6)),
            Objective::Clusters,
        )
        .unwrap();

        for point in &outcome.results {
            assert!(point.n_clusters >= 1);
            assert!(point.n_clusters <= n / 2);
        }
        assert!(outcome.best.n_clusters >= 1);
    }

    #[test]
    fn test_optimizer_no_viable_parameters() {
        // Every point isolated: eps far too small for any cluster.
        let x = array![[0.0], [100.0], [200.0], [300.0]];
        let err = optimize_parameters(
            &x,
            Some(EpsRange {
                min: 0.1,
                max: 0.3,
                step: 0.1,
            }),
            Some((2, 3)),
            Objective::Silhouette,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoViableParameters));
    }

    #[test]
    fn test_optimizer_tie_break_is_first_encountered() {
        // Clusters objective on well-separated blobs: several (eps,
        // min_samples) pairs produce identical scores; the first in sweep
        // order must win.
        let x = blobs_with_outliers();
        let outcome = optimize_parameters(
            &x,
            Some(EpsRange {
                min: 0.4,
                max: 0.7,
                step: 0.1,
            }),
            Some((2, 3)),
            Objective::Clusters,
        )
        .unwrap();

        let best_score = outcome.best.score;
        let first_with_best = outcome
            .results
            .iter()
            .find(|p| p.score == best_score)
            .unwrap();
        assert_eq!(first_with_best.eps, outcome.best.eps);
        assert_eq!(first_with_best.min_samples, outcome.best.min_samples);
    }

    #[test]
    fn test_optimizer_derived_range() {
        let x = blobs_with_outliers();
        let outcome = optimize_parameters(&x, None, None, Objective::Clusters).unwrap();
        assert!(outcome.best.n_clusters >= 1);
    }

    #[test]
    fn test_grid_scores_follow_labels() {
        // Sanity check the clusters objective arithmetic on a known split.
        let labels = Labels::from(vec![0, 0, 0, 0, 1, 1, 1, 1, -1, -1]);
        let summary = summarize_labels(&labels);
        let score = summary.n_clusters as f64 - summary.n_noise as f64 / labels.len() as f64;
        assert!((score - 1.8).abs() < 1e-10);
    }
}
