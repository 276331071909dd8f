#![allow(clippy::needless_range_loop)] // I want these loops!

pub mod error;
pub mod k_means;
pub mod knn;
pub mod logistic;
pub mod synthetic;
pub mod utils;

use faer::MatRef;

use crate::error::*;
use crate::k_means::*;
use crate::knn::*;
use crate::logistic::*;
use crate::utils::*;

/////////////
// k-means //
/////////////

/// Cluster the rows of a matrix with k-means
///
/// ### Params
///
/// * `mat` - The data matrix. Rows represent the samples, columns represent
///   the dimensions.
/// * `k` - Number of clusters. Needs `1 <= k <= mat.nrows()`.
/// * `max_iters` - Maximum number of Lloyd iterations (`>= 1`)
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// The `KMeansFit` with labels, centres and inertia
pub fn cluster<T>(mat: MatRef<T>, k: usize, max_iters: usize, seed: u64) -> Result<KMeansFit<T>>
where
    T: ToyMlFloat,
{
    let params = KMeansParams::new(k)
        .with_max_iters(max_iters)
        .with_seed(seed);
    cluster_with_params(mat, &params)
}

/// Cluster the rows of a matrix with fully specified parameters
///
/// ### Params
///
/// * `mat` - The data matrix. Rows represent the samples, columns represent
///   the dimensions.
/// * `params` - The `KMeansParams` of the run
///
/// ### Returns
///
/// The `KMeansFit` with labels, centres and inertia
pub fn cluster_with_params<T>(mat: MatRef<T>, params: &KMeansParams) -> Result<KMeansFit<T>>
where
    T: ToyMlFloat,
{
    let (vectors_flat, _, dim) = matrix_to_flat(mat);
    KMeans::new(params.clone()).fit(&vectors_flat, dim)
}

/////////////////////////
// Logistic regression //
/////////////////////////

/// Train a binary logistic regression on the rows of a matrix
///
/// ### Params
///
/// * `mat` - The data matrix, samples x features
/// * `labels` - Class per row, `0` or `1`
/// * `params` - Optimiser parameters
///
/// ### Returns
///
/// The `LogRegFit`
pub fn fit_logistic_regression<T>(
    mat: MatRef<T>,
    labels: &[usize],
    params: &LogRegParams,
) -> Result<LogRegFit<T>>
where
    T: ToyMlFloat,
{
    let (vectors_flat, _, dim) = matrix_to_flat(mat);
    fit_logistic_flat(&vectors_flat, dim, labels, params)
}

/////////
// kNN //
/////////

/// Distance-weighted kNN class-1 probabilities
///
/// ### Params
///
/// * `train` - Training matrix, samples x features
/// * `labels` - Class per training row, `0` or `1`
/// * `query` - Query matrix with the same number of columns
/// * `k` - Number of neighbours
/// * `lambda` - Decay of the weight with squared distance
///
/// ### Returns
///
/// `p(y = 1 | x)` per query row
pub fn knn_proba_weighted<T>(
    train: MatRef<T>,
    labels: &[usize],
    query: MatRef<T>,
    k: usize,
    lambda: T,
) -> Result<Vec<T>>
where
    T: ToyMlFloat,
{
    if train.ncols() != query.ncols() {
        return Err(ToyMlError::QueryDimensionMismatch {
            train: train.ncols(),
            query: query.ncols(),
        });
    }

    let (train_flat, _, dim) = matrix_to_flat(train);
    let (query_flat, _, _) = matrix_to_flat(query);
    WeightedKnn::new(train_flat, dim, labels)?.predict_proba(&query_flat, k, lambda)
}

///////////
// Tests //
///////////

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::synthetic::*;
    use approx::assert_relative_eq;
    use faer::Mat;

    #[test]
    fn test_cluster_three_blobs() {
        let centres = vec![vec![-2.0, -1.0], vec![2.0, 1.2], vec![-0.2, 2.4]];
        let (data, blobs) = generate_gaussian_blobs::<f64>(&centres, 80, 0.7, 0);

        // Lloyd can settle in a local optimum, keep the best of a few seeds
        let best = (0..5)
            .map(|seed| cluster(data.as_ref(), 3, 50, seed).unwrap())
            .min_by(|a, b| a.inertia.partial_cmp(&b.inertia).unwrap())
            .unwrap();

        assert_eq!(best.labels.len(), 240);
        assert_eq!(best.k, 3);
        assert!(cluster_purity(&best.labels, &blobs) > 0.85);
        assert!(best.cluster_sizes().iter().all(|&s| s > 0));
    }

    #[test]
    fn test_cluster_matches_flat_engine() {
        let centres = vec![vec![0.0, 0.0], vec![5.0, 5.0]];
        let (data, _) = generate_gaussian_blobs::<f64>(&centres, 30, 1.0, 3);
        let (flat, _, dim) = matrix_to_flat(data.as_ref());

        let from_mat = cluster(data.as_ref(), 2, 20, 8).unwrap();
        let from_flat = cluster_flat(&flat, dim, 2, 20, 8).unwrap();

        assert_eq!(from_mat.labels, from_flat.labels);
        assert_eq!(from_mat.centres, from_flat.centres);
    }

    #[test]
    fn test_cluster_invalid_k_reports_no_result() {
        let data = Mat::from_fn(4, 2, |i, j| (i + j) as f64);

        assert_eq!(
            cluster(data.as_ref(), 0, 10, 0).unwrap_err(),
            ToyMlError::InvalidClusterCount { k: 0, n_points: 4 }
        );
        assert_eq!(
            cluster(data.as_ref(), 5, 10, 0).unwrap_err(),
            ToyMlError::InvalidClusterCount { k: 5, n_points: 4 }
        );
    }

    #[test]
    fn test_cluster_with_refreshed_labels() {
        let centres = vec![vec![-2.0, -1.0], vec![2.0, 1.2]];
        let (data, _) = generate_gaussian_blobs::<f64>(&centres, 40, 0.5, 1);
        let params = KMeansParams::new(2)
            .with_max_iters(50)
            .with_seed(2)
            .with_refresh_labels(true);

        let fit = cluster_with_params(data.as_ref(), &params).unwrap();
        let (flat, _, dim) = matrix_to_flat(data.as_ref());

        assert_eq!(fit.predict(&flat).unwrap(), fit.labels);
        assert_relative_eq!(
            fit.inertia,
            compute_inertia(&flat, dim, &fit.labels, &fit.centres),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_logistic_regression_pipeline() {
        let centres = vec![vec![-1.6, -1.0], vec![1.6, 1.0]];
        let (data, labels) = generate_gaussian_blobs::<f64>(&centres, 80, 0.7, 0);

        let fit = fit_logistic_regression(data.as_ref(), &labels, &LogRegParams::default()).unwrap();
        let (flat, _, _) = matrix_to_flat(data.as_ref());
        let pred = fit.predict(&flat).unwrap();

        assert_eq!(fit.weights.len(), 3);
        assert!(accuracy(&pred, &labels) > 0.95);

        // the origin sits between the blobs, so the boundary passes near it
        let x2 = fit.boundary_x2(0.0).unwrap();
        assert!(x2.abs() < 1.0);
    }

    #[test]
    fn test_knn_pipeline() {
        let centres = vec![vec![-1.2, -0.8], vec![1.2, 0.8]];
        let (blobs, blob_labels) = generate_gaussian_blobs::<f64>(&centres, 40, 1.0, 0);
        let (noise, noise_labels) = generate_labelled_noise::<f64>(10, &[0.0, 0.0], 0.45, 1);
        let train = vstack(blobs.as_ref(), noise.as_ref());
        let labels: Vec<usize> = blob_labels.into_iter().chain(noise_labels).collect();

        let query = Mat::from_fn(2, 2, |i, _| if i == 0 { -3.0 } else { 3.0 });
        let p = knn_proba_weighted(train.as_ref(), &labels, query.as_ref(), 6, 3.0).unwrap();

        assert_eq!(p.len(), 2);
        assert!(p[0] < 0.5);
        assert!(p[1] > 0.5);
        assert!(p.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }

    #[test]
    fn test_knn_query_dimension_mismatch() {
        let train = Mat::from_fn(3, 2, |i, j| (i * j) as f64);
        let query = Mat::from_fn(1, 3, |_, _| 0.0);

        assert_eq!(
            knn_proba_weighted(train.as_ref(), &[0, 1, 0], query.as_ref(), 1, 1.0).unwrap_err(),
            ToyMlError::QueryDimensionMismatch { train: 2, query: 3 }
        );
    }
}
