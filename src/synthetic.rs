use faer::traits::ComplexField;
use faer::{Mat, MatRef};
use num_traits::{Float, FromPrimitive};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::utils::cast;

/// Generate isotropic Gaussian blobs
///
/// Draws `n_per_blob` points around every centre with the same standard
/// deviation in every dimension. Rows are stacked blob by blob, i.e. rows
/// `b * n_per_blob..(b + 1) * n_per_blob` belong to blob `b`.
///
/// ### Params
///
/// * `centres` - Generating mean of each blob. All need the same length.
/// * `n_per_blob` - Number of samples per blob
/// * `std` - Standard deviation within each blob
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// Tuple of `(data, blob_index)` with data of shape
/// `(centres.len() * n_per_blob, dim)`
pub fn generate_gaussian_blobs<T>(
    centres: &[Vec<f64>],
    n_per_blob: usize,
    std: f64,
    seed: u64,
) -> (Mat<T>, Vec<usize>)
where
    T: Float + FromPrimitive + ComplexField,
{
    assert!(std.is_finite() && std >= 0.0, "std must be finite and >= 0");
    let dim = centres.first().map_or(0, |c| c.len());
    assert!(
        centres.iter().all(|c| c.len() == dim),
        "All centres need to have the same dimensionality"
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let n_samples = centres.len() * n_per_blob;
    let mut data = Mat::<T>::zeros(n_samples, dim);
    let mut blob_index = Vec::with_capacity(n_samples);

    for (b, centre) in centres.iter().enumerate() {
        for r in 0..n_per_blob {
            let i = b * n_per_blob + r;
            for (j, &mu) in centre.iter().enumerate() {
                let z: f64 = rng.sample(StandardNormal);
                data[(i, j)] = cast(mu + z * std);
            }
            blob_index.push(b);
        }
    }

    (data, blob_index)
}

/// Generate noisy points with random binary labels
///
/// Scatters points around a single centre and tags each one with a label
/// drawn uniformly from `{0, 1}`. Used to put label noise near a decision
/// boundary.
///
/// ### Params
///
/// * `n` - Number of samples
/// * `centre` - Mean of the cloud
/// * `std` - Standard deviation of the cloud
/// * `seed` - Random seed for reproducibility
///
/// ### Returns
///
/// Tuple of `(data, labels)`
pub fn generate_labelled_noise<T>(
    n: usize,
    centre: &[f64],
    std: f64,
    seed: u64,
) -> (Mat<T>, Vec<usize>)
where
    T: Float + FromPrimitive + ComplexField,
{
    assert!(std.is_finite() && std >= 0.0, "std must be finite and >= 0");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Mat::<T>::zeros(n, centre.len());

    for i in 0..n {
        for (j, &mu) in centre.iter().enumerate() {
            let z: f64 = rng.sample(StandardNormal);
            data[(i, j)] = cast(mu + z * std);
        }
    }
    let labels = (0..n).map(|_| rng.random_range(0..2)).collect();

    (data, labels)
}

/// Stack two matrices on top of each other
///
/// ### Params
///
/// * `top` - Rows that come first
/// * `bottom` - Rows appended after `top`
///
/// ### Returns
///
/// Matrix of shape `(top.nrows() + bottom.nrows(), dim)`
pub fn vstack<T>(top: MatRef<T>, bottom: MatRef<T>) -> Mat<T>
where
    T: Float + ComplexField,
{
    assert!(
        top.ncols() == bottom.ncols(),
        "Matrices need the same number of columns!"
    );

    let n_top = top.nrows();
    let mut stacked = Mat::<T>::zeros(n_top + bottom.nrows(), top.ncols());
    for i in 0..top.nrows() {
        for j in 0..top.ncols() {
            stacked[(i, j)] = top[(i, j)];
        }
    }
    for i in 0..bottom.nrows() {
        for j in 0..bottom.ncols() {
            stacked[(n_top + i, j)] = bottom[(i, j)];
        }
    }
    stacked
}

///////////
// Tests //
///////////
