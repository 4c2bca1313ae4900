//! k-th nearest neighbor distances, used to size the DBSCAN radius.

use log::info;
use ndarray::Axis;
use rand::Rng;
use rand::seq::index::sample;

use crate::{Error, Matrix, Result, Vector};

/// Computes every point's Euclidean distance to its k-th nearest neighbor
/// (excluding itself), sorted in descending order.
///
/// Datasets larger than `max_samples` are uniformly subsampled without
/// replacement; pass `0` to disable subsampling. Points in dense regions
/// have small k-th-neighbor distances, so a percentile of this curve makes
/// a reasonable `eps` (see [`suggest_eps`]).
pub fn k_distance_curve(x: &Matrix, k: usize, max_samples: usize) -> Result<Vector> {
    k_distance_curve_with_rng(x, k, max_samples, &mut rand::thread_rng())
}

/// Same as [`k_distance_curve`] with an explicit random source, so callers
/// can make the subsampling deterministic.
pub fn k_distance_curve_with_rng<R: Rng + ?Sized>(
    x: &Matrix,
    k: usize,
    max_samples: usize,
    rng: &mut R,
) -> Result<Vector> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(Error::invalid(
            "input matrix must have at least one sample and one feature",
        ));
    }
    if k == 0 {
        return Err(Error::invalid("k must be >= 1"));
    }

    let points = if max_samples > 0 && x.nrows() > max_samples {
        info!("subsampling to {max_samples} points for the k-distance curve");
        let indices = sample(rng, x.nrows(), max_samples).into_vec();
        x.select(Axis(0), &indices)
    } else {
        x.to_owned()
    };

    let n = points.nrows();
    if k >= n {
        return Err(Error::invalid(format!(
            "k={k} requires more than {n} points after subsampling"
        )));
    }

    let mut k_distances = Vec::with_capacity(n);
    for i in 0..n {
        let mut dists: Vec<f64> = (0..n)
            .filter(|&j| j != i)
            .map(|j| euclidean(&points.row(i), &points.row(j)))
            .collect();
        dists.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
        k_distances.push(dists[k - 1]);
    }

    k_distances.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap());
    let curve = Vector::from(k_distances);

    info!(
        "k-distance curve (k={k}): min={:.4}, max={:.4}",
        curve[curve.len() - 1],
        curve[0]
    );

    Ok(curve)
}

/// Suggests an `eps` value as a percentile of the k-distance curve.
///
/// The default pipeline uses the 50th percentile (the median). Lower
/// percentiles shrink the radius and flag more points as anomalies.
pub fn suggest_eps(k_distances: &Vector, percentile: f64) -> Result<f64> {
    if k_distances.is_empty() {
        return Err(Error::invalid("k-distance curve is empty"));
    }
    if !(0.0..=100.0).contains(&percentile) {
        return Err(Error::invalid(format!(
            "percentile must be in [0, 100], got {percentile}"
        )));
    }

    let mut sorted: Vec<f64> = k_distances.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());

    let rank = percentile / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let eps = sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo]);

    info!("suggested eps (percentile {percentile}): {eps:.4}");
    Ok(eps)
}

pub(crate) fn euclidean(a: &ndarray::ArrayView1<f64>, b: &ndarray::ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_curve_sorted_descending_with_full_length() {
        let x = array![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [10.0, 10.0],
            [11.0, 10.0]
        ];
        let curve = k_distance_curve(&x, 2, 0).unwrap();

        assert_eq!(curve.len(), x.nrows());
        for w in curve.to_vec().windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn test_kth_distance_excludes_self() {
        // Two points at distance 3: the 1st neighbor of each is the other.
        let x = array![[0.0], [3.0]];
        let curve = k_distance_curve(&x, 1, 0).unwrap();
        assert!((curve[0] - 3.0).abs() < 1e-10);
        assert!((curve[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_subsampling_caps_length() {
        let x = Matrix::zeros((50, 3));
        let mut rng = StdRng::seed_from_u64(7);
        let curve = k_distance_curve_with_rng(&x, 2, 10, &mut rng).unwrap();
        assert_eq!(curve.len(), 10);
    }

    #[test]
    fn test_subsampling_deterministic_with_seed() {
        let mut values = Vec::new();
        for i in 0..40 {
            values.push([i as f64, (i * i) as f64 % 13.0]);
        }
        let x = Matrix::from_shape_vec((40, 2), values.concat()).unwrap();

        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        let a = k_distance_curve_with_rng(&x, 3, 15, &mut rng_a).unwrap();
        let b = k_distance_curve_with_rng(&x, 3, 15, &mut rng_b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_k_too_large() {
        let x = array![[0.0], [1.0]];
        assert!(k_distance_curve(&x, 2, 0).is_err());
    }

    #[test]
    fn test_suggest_eps_median() {
        let curve = Vector::from(vec![5.0, 4.0, 3.0, 2.0, 1.0]);
        let eps = suggest_eps(&curve, 50.0).unwrap();
        assert!((eps - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_suggest_eps_interpolates() {
        let curve = Vector::from(vec![4.0, 3.0, 2.0, 1.0]);
        let eps = suggest_eps(&curve, 50.0).unwrap();
        assert!((eps - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_suggest_eps_bounds() {
        let curve = Vector::from(vec![2.0, 1.0]);
        assert!(suggest_eps(&curve, -1.0).is_err());
        assert!(suggest_eps(&curve, 101.0).is_err());
        assert!((suggest_eps(&curve, 0.0).unwrap() - 1.0).abs() < 1e-10);
        assert!((suggest_eps(&curve, 100.0).unwrap() - 2.0).abs() < 1e-10);
    }
}
