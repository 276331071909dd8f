mod commons;

use clap::Parser;
use faer::Mat;
use std::time::Instant;

use toy_ml_rs::logistic::LogRegParams;
use toy_ml_rs::synthetic::generate_gaussian_blobs;
use toy_ml_rs::utils::*;
use toy_ml_rs::*;

use commons::*;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    // scenario
    const N_PER_BLOB: usize = 80;
    const STD: f64 = 0.7;
    let blob_centres = vec![vec![-1.6, -1.0], vec![1.6, 1.0]];

    let n_per_blob = cli.n_per_blob.unwrap_or(N_PER_BLOB);
    let blob_std = cli.std.unwrap_or(STD);

    print_data_summary("two labelled blobs", blob_centres.len() * n_per_blob, 2);

    // the blob index doubles as the class label
    let (data, labels): (Mat<f64>, Vec<usize>) =
        generate_gaussian_blobs(&blob_centres, n_per_blob, blob_std, cli.seed);

    let params = LogRegParams::default().with_gtol(cli.gtol);

    println!("Fitting logistic regression (BFGS, gtol = {:e})...", cli.gtol);
    let start = Instant::now();
    let fit = match fit_logistic_regression(data.as_ref(), &labels, &params) {
        Ok(fit) => fit,
        Err(e) => {
            eprintln!("logistic regression failed: {}", e);
            std::process::exit(1);
        }
    };
    let fit_time = start.elapsed().as_secs_f64() * 1000.0;

    let (flat, _, _) = matrix_to_flat(data.as_ref());
    let train_acc = match fit.accuracy(&flat, &labels) {
        Ok(acc) => acc,
        Err(e) => {
            eprintln!("prediction failed: {}", e);
            std::process::exit(1);
        }
    };

    print_header("Logistic regression on two blobs");
    println!(
        "Iterations: {} ({})",
        fit.n_iter,
        if fit.converged {
            "converged"
        } else {
            "not converged"
        }
    );
    println!("Fit time:   {:.3} ms", fit_time);
    println!("Loss:       {:.4}", fit.loss);
    println!("Accuracy:   {:.4}", train_acc);
    println!();

    let rows = vec![
        ("w0 (bias)".to_string(), vec![fit.weights[0]]),
        ("w1".to_string(), vec![fit.weights[1]]),
        ("w2".to_string(), vec![fit.weights[2]]),
    ];
    print_table(&["Weight", "Value"], &rows);

    // decision boundary across the data range
    let bounds = bounding_box(&flat, 2);
    let (x1_min, x1_max) = bounds[0];
    println!("\nDecision boundary:");
    match fit.boundary_x2(x1_min) {
        Some(_) => {
            for x1 in linspace(x1_min - 0.5, x1_max + 0.5, 5) {
                if let Some(x2) = fit.boundary_x2(x1) {
                    println!("  x1 = {:>8.3} -> x2 = {:>8.3}", x1, x2);
                }
            }
        }
        None => match fit.vertical_boundary_x1() {
            Some(x1) => println!("  vertical at x1 = {:.3}", x1),
            None => println!("  no boundary within the plane"),
        },
    }
}
