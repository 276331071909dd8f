mod commons;

use clap::Parser;
use faer::Mat;
use std::time::Instant;
use thousands::*;

use toy_ml_rs::knn::WeightedKnn;
use toy_ml_rs::synthetic::*;
use toy_ml_rs::utils::*;

use commons::*;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    // scenario
    const N_PER_BLOB: usize = 40;
    const STD: f64 = 1.0;
    const N_NOISE: usize = 10;
    const NOISE_STD: f64 = 0.45;
    const K_VALUES: [usize; 3] = [1, 6, 16];
    let blob_centres = vec![vec![-1.2, -0.8], vec![1.2, 0.8]];

    let n_per_blob = cli.n_per_blob.unwrap_or(N_PER_BLOB);
    let blob_std = cli.std.unwrap_or(STD);

    print_data_summary(
        "two overlapping blobs plus label noise",
        blob_centres.len() * n_per_blob + N_NOISE,
        2,
    );

    let (blobs, blob_labels): (Mat<f64>, Vec<usize>) =
        generate_gaussian_blobs(&blob_centres, n_per_blob, blob_std, cli.seed);
    let (noise, noise_labels): (Mat<f64>, Vec<usize>) =
        generate_labelled_noise(N_NOISE, &[0.0, 0.0], NOISE_STD, cli.seed + 1);

    let train = vstack(blobs.as_ref(), noise.as_ref());
    let labels: Vec<usize> = blob_labels.into_iter().chain(noise_labels).collect();
    let (train_flat, n_train, dim) = matrix_to_flat(train.as_ref());

    let knn = match WeightedKnn::new(train_flat.clone(), dim, &labels) {
        Ok(knn) => knn,
        Err(e) => {
            eprintln!("invalid training data: {}", e);
            std::process::exit(1);
        }
    };

    // evaluation grid over the padded data range
    let bounds = bounding_box(&train_flat, dim);
    let x1_values = linspace(bounds[0].0 - 0.5, bounds[0].1 + 0.5, cli.grid_res);
    let x2_values = linspace(bounds[1].0 - 0.5, bounds[1].1 + 0.5, cli.grid_res);
    let grid = grid_2d(&x1_values, &x2_values);
    let n_grid = grid.len() / dim;

    println!(
        "Evaluating {} grid points per k (lambda = {})...",
        n_grid.separate_with_underscores(),
        cli.lambda
    );

    let mut rows = Vec::with_capacity(K_VALUES.len());
    for k in K_VALUES {
        if k > n_train {
            eprintln!("skipping k = {}: only {} training points", k, n_train);
            continue;
        }

        let start = Instant::now();
        let proba = match knn.predict_proba(&grid, k, cli.lambda) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("kNN failed for k = {}: {}", k, e);
                std::process::exit(1);
            }
        };
        let query_time = start.elapsed().as_secs_f64() * 1000.0;

        let class_1_share = proba.iter().filter(|&&p| p >= 0.5).count() as f64 / n_grid as f64;

        let train_pred = match knn.predict(&train_flat, k, cli.lambda) {
            Ok(pred) => pred,
            Err(e) => {
                eprintln!("kNN failed for k = {}: {}", k, e);
                std::process::exit(1);
            }
        };
        let train_acc = accuracy(&train_pred, &labels);

        rows.push((format!("k = {}", k), vec![class_1_share, train_acc, query_time]));
    }

    print_header("Distance-weighted kNN");
    print_table(&["Neighbours", "Class-1 area", "Train acc", "Query (ms)"], &rows);
}
