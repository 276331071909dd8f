mod commons;

use clap::Parser;
use faer::Mat;
use std::time::Instant;
use thousands::*;

use toy_ml_rs::k_means::KMeansParams;
use toy_ml_rs::synthetic::generate_gaussian_blobs;
use toy_ml_rs::utils::*;
use toy_ml_rs::*;

use commons::*;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    // scenario
    const K: usize = 3;
    const N_PER_BLOB: usize = 80;
    const STD: f64 = 0.7;
    let blob_centres = vec![vec![-2.0, -1.0], vec![2.0, 1.2], vec![-0.2, 2.4]];

    let n_per_blob = cli.n_per_blob.unwrap_or(N_PER_BLOB);
    let blob_std = cli.std.unwrap_or(STD);

    print_data_summary("three Gaussian blobs", blob_centres.len() * n_per_blob, 2);

    let (data, blobs): (Mat<f64>, Vec<usize>) =
        generate_gaussian_blobs(&blob_centres, n_per_blob, blob_std, cli.seed);

    let params = KMeansParams::new(K)
        .with_max_iters(cli.max_iters)
        .with_seed(cli.seed)
        .with_refresh_labels(cli.refresh_labels);

    println!("Running k-means (k = {}, max_iters = {})...", K, cli.max_iters);
    let start = Instant::now();
    let fit = match cluster_with_params(data.as_ref(), &params) {
        Ok(fit) => fit,
        Err(e) => {
            eprintln!("k-means failed: {}", e);
            std::process::exit(1);
        }
    };
    let fit_time = start.elapsed().as_secs_f64() * 1000.0;

    print_header("k-means on three blobs");
    println!(
        "Iterations: {} ({})",
        fit.n_iter,
        if fit.converged {
            "converged"
        } else {
            "budget exhausted"
        }
    );
    println!("Fit time:   {:.3} ms", fit_time);
    println!("Inertia:    {:.4}", fit.inertia);
    println!(
        "Re-seeded:  {} empty clusters",
        fit.history
            .iter()
            .map(|t| t.n_reseeded)
            .sum::<usize>()
            .separate_with_underscores()
    );
    println!("Purity:     {:.4}", cluster_purity(&fit.labels, &blobs));
    println!();

    let sizes = fit.cluster_sizes();
    let majority = majority_class_per_cluster(&fit.labels, &blobs, K);
    let rows: Vec<(String, Vec<f64>)> = (0..K)
        .map(|j| {
            let label = match majority[j] {
                Some(b) => format!("cluster {} (b{})", j, b),
                None => format!("cluster {}", j),
            };
            let c = fit.centre(j);
            (label, vec![c[0], c[1], sizes[j] as f64])
        })
        .collect();
    print_table(&["Cluster", "x1", "x2", "Size"], &rows);

    print_cluster_summary(&sizes);

    println!("\nInertia per iteration:");
    for (i, trace) in fit.history.iter().enumerate() {
        println!("  {:>3}: {:>12.4}", i + 1, trace.inertia);
    }
}
