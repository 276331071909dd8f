#![allow(dead_code)]

use clap::Parser;
use thousands::*;
use tracing_subscriber::EnvFilter;

////////////
// Consts //
////////////

pub const DEFAULT_SEED: u64 = 0;
pub const DEFAULT_MAX_ITERS: usize = 50;
pub const DEFAULT_LAMBDA: f64 = 3.0;
pub const DEFAULT_GTOL: f64 = 1e-5;
pub const DEFAULT_GRID_RES: usize = 300;
pub const DEFAULT_LOG: &str = "info";

////////////
// Parser //
////////////

/// Parsing structure
///
/// Options a demo does not use are ignored. Unset `Option`s fall back to
/// the demo's own scenario.
///
/// ### Fields
///
/// * `seed` - Random seed for the data and the algorithms
/// * `n_per_blob` - Number of samples per blob
/// * `std` - Standard deviation within each blob
/// * `max_iters` - Iteration budget of k-means
/// * `refresh_labels` - Re-assign labels against the final k-means centres
/// * `gtol` - Gradient tolerance of the logistic regression optimiser
/// * `lambda` - Distance decay of the weighted kNN
/// * `grid_res` - Points per axis of the evaluation grid
/// * `log` - Default tracing filter if `RUST_LOG` is not set
#[derive(Parser)]
pub struct Cli {
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    #[arg(long)]
    pub n_per_blob: Option<usize>,

    #[arg(long)]
    pub std: Option<f64>,

    #[arg(long, default_value_t = DEFAULT_MAX_ITERS)]
    pub max_iters: usize,

    #[arg(long)]
    pub refresh_labels: bool,

    #[arg(long, default_value_t = DEFAULT_GTOL)]
    pub gtol: f64,

    #[arg(long, default_value_t = DEFAULT_LAMBDA)]
    pub lambda: f64,

    #[arg(long, default_value_t = DEFAULT_GRID_RES)]
    pub grid_res: usize,

    #[arg(long, default_value = DEFAULT_LOG)]
    pub log: String,
}

/////////////
// Tracing //
/////////////

/// Install a formatting subscriber
///
/// `RUST_LOG` wins over the `default_filter` passed on the command line.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

////////////
// Prints //
////////////

/// Print a section header
pub fn print_header(title: &str) {
    println!("\n{:=>72}", "");
    println!("{}", title);
    println!("{:=>72}", "");
}

/// Print the data set description
///
/// ### Params
///
/// * `name` - What the data represents
/// * `n_samples` - Number of samples
/// * `dim` - Number of features
pub fn print_data_summary(name: &str, n_samples: usize, dim: usize) {
    println!("-----------------------------");
    println!(
        "Generating {}: {} samples, {} dimensions",
        name,
        n_samples.separate_with_underscores(),
        dim
    );
    println!("-----------------------------");
}

/// Print summary statistics of cluster sizes
///
/// ### Params
///
/// * `sizes` - Number of points per cluster
pub fn print_cluster_summary(sizes: &[usize]) {
    if sizes.is_empty() {
        return;
    }

    let mut counts = sizes.to_vec();
    counts.sort_unstable();

    let k = counts.len();
    let n: usize = counts.iter().sum();
    let min = counts[0];
    let max = counts[k - 1];
    let median = counts[k / 2];
    let mean = n as f64 / k as f64;

    println!("Cluster size distribution:");
    println!("  Min:    {}", min.separate_with_underscores());
    println!("  Median: {}", median.separate_with_underscores());
    println!("  Max:    {}", max.separate_with_underscores());
    println!("  Mean:   {:.1}", mean);
    println!("  Imbalance ratio: {:.2}", max as f64 / mean);
}

/// Print a small table of labelled rows of floats
///
/// ### Params
///
/// * `columns` - Column headers, the first one names the row label
/// * `rows` - `(label, values)` pairs
pub fn print_table(columns: &[&str], rows: &[(String, Vec<f64>)]) {
    let width = 16 * columns.len();
    let header: String = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == 0 {
                format!("{:<16}", c)
            } else {
                format!("{:>16}", c)
            }
        })
        .collect();

    println!("{}", header);
    println!("{:->width$}", "", width = width);
    for (label, values) in rows {
        let line: String = values.iter().map(|v| format!("{:>16.4}", v)).collect();
        println!("{:<16}{}", label, line);
    }
    println!("{:->width$}", "", width = width);
}
