use ndarray::Array2;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Normal;
use rand::SeedableRng;
use rand::rngs::StdRng;

use vitalscan::Matrix;
use vitalscan::optimize::{EpsRange, Objective, optimize_parameters};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== DBSCAN Parameter Grid Search ===\n");

    let x = three_blobs_with_noise();
    println!(
        "Dataset: {} samples, {} features (3 planted groups + scattered noise)\n",
        x.nrows(),
        x.ncols()
    );

    for objective in [Objective::Silhouette, Objective::Clusters] {
        println!("=== Objective: {objective:?} ===");

        let outcome = optimize_parameters(
            &x,
            Some(EpsRange {
                min: 0.2,
                max: 2.0,
                step: 0.2,
            }),
            Some((2, 6)),
            objective,
        )?;

        println!(
            "Evaluated {} parameter pairs (degenerate pairs skipped)",
            outcome.results.len()
        );
        println!(
            "Best: eps={:.2}, min_samples={}, score={:.4} ({} clusters, {} anomalies)",
            outcome.best.eps,
            outcome.best.min_samples,
            outcome.best.score,
            outcome.best.n_clusters,
            outcome.best.n_noise
        );

        let mut top: Vec<_> = outcome.results.iter().filter(|p| p.score > -1.0).collect();
        top.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        println!("Top candidates:");
        for point in top.iter().take(5) {
            println!(
                "  eps={:.2}, min_samples={}: score={:.4}, clusters={}, noise={}",
                point.eps, point.min_samples, point.score, point.n_clusters, point.n_noise
            );
        }
        println!();
    }

    println!("=== Derived Range ===");
    println!("Without an explicit range the sweep covers the 10th-90th");
    println!("percentile of the k=5 k-distance curve in 20 steps.");
    let outcome = optimize_parameters(&x, None, None, Objective::Silhouette)?;
    println!(
        "Best: eps={:.4}, min_samples={}, score={:.4}",
        outcome.best.eps, outcome.best.min_samples, outcome.best.score
    );

    Ok(())
}

fn three_blobs_with_noise() -> Matrix {
    let mut rng = StdRng::seed_from_u64(7);
    let blob = |cx: f64, cy: f64, rng: &mut StdRng| -> Array2<f64> {
        let offsets = Array2::random_using((20, 2), Normal::new(0.0, 0.15).unwrap(), rng);
        offsets + &ndarray::array![[cx, cy]]
    };

    let a = blob(0.0, 0.0, &mut rng);
    let b = blob(4.0, 4.0, &mut rng);
    let c = blob(0.0, 4.0, &mut rng);
    let noise = ndarray::array![[2.0, 2.0], [8.0, 0.0], [-3.0, 7.0]];

    let mut rows = Vec::new();
    for source in [&a, &b, &c, &noise] {
        for row in source.rows() {
            rows.push([row[0], row[1]]);
        }
    }
    Matrix::from_shape_vec((rows.len(), 2), rows.concat()).unwrap()
}
