pub mod dist;
pub mod metrics;
pub mod traits;

use faer::MatRef;
use num_traits::{Float, FromPrimitive};

pub use dist::*;
pub use metrics::*;
pub use traits::*;

/////////////
// Helpers //
/////////////

/// Convert an `f64` constant into the working float type
///
/// Values that cannot be represented come back as NaN.
#[inline(always)]
pub fn cast<T>(x: f64) -> T
where
    T: Float + FromPrimitive,
{
    T::from_f64(x).unwrap_or_else(T::nan)
}

/// Flatten a matrix into a row-major buffer
///
/// ### Params
///
/// * `mat` - The data matrix. Rows represent the samples, columns the
///   dimensions.
///
/// ### Returns
///
/// Tuple of `(vectors_flat, n, dim)`
pub fn matrix_to_flat<T>(mat: MatRef<T>) -> (Vec<T>, usize, usize)
where
    T: Float,
{
    let n = mat.nrows();
    let dim = mat.ncols();

    let mut vectors_flat = Vec::with_capacity(n * dim);
    for i in 0..n {
        vectors_flat.extend(mat.row(i).iter().cloned());
    }

    (vectors_flat, n, dim)
}

/// Evenly spaced values over a closed interval
///
/// ### Params
///
/// * `start` - First value
/// * `stop` - Last value (inclusive)
/// * `num` - Number of values
///
/// ### Returns
///
/// `num` values from `start` to `stop`. A single value returns `[start]`.
pub fn linspace<T>(start: T, stop: T, num: usize) -> Vec<T>
where
    T: Float + FromPrimitive,
{
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / cast((num - 1) as f64);
            (0..num)
                .map(|i| {
                    if i == num - 1 {
                        stop
                    } else {
                        start + step * cast(i as f64)
                    }
                })
                .collect()
        }
    }
}

/// Rectangular 2-D evaluation grid
///
/// Points are laid out row by row: `x2` is the slow axis, `x1` the fast one,
/// so point `r * x1_values.len() + c` is `(x1_values[c], x2_values[r])`.
///
/// ### Params
///
/// * `x1_values` - Values along the first axis
/// * `x2_values` - Values along the second axis
///
/// ### Returns
///
/// Flattened grid points (`x1_values.len() * x2_values.len() * 2` elements)
pub fn grid_2d<T>(x1_values: &[T], x2_values: &[T]) -> Vec<T>
where
    T: Float,
{
    let mut grid = Vec::with_capacity(x1_values.len() * x2_values.len() * 2);
    for &x2 in x2_values {
        for &x1 in x1_values {
            grid.push(x1);
            grid.push(x2);
        }
    }
    grid
}

/// Per-dimension minimum and maximum of a flat point buffer
///
/// ### Params
///
/// * `data` - Flattened points
/// * `dim` - Embedding dimensions
///
/// ### Returns
///
/// Vector of `(min, max)` per dimension. Infinite bounds for empty data.
pub fn bounding_box<T>(data: &[T], dim: usize) -> Vec<(T, T)>
where
    T: Float,
{
    let mut bounds = vec![(T::infinity(), T::neg_infinity()); dim];
    for vec in data.chunks_exact(dim) {
        for (b, &x) in bounds.iter_mut().zip(vec.iter()) {
            b.0 = b.0.min(x);
            b.1 = b.1.max(x);
        }
    }
    bounds
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use faer::Mat;

    #[test]
    fn test_matrix_to_flat() {
        let mat = Mat::from_fn(3, 2, |i, j| (i * 10 + j) as f64);
        let (flat, n, dim) = matrix_to_flat(mat.as_ref());

        assert_eq!(n, 3);
        assert_eq!(dim, 2);
        assert_eq!(flat, vec![0.0, 1.0, 10.0, 11.0, 20.0, 21.0]);
    }

    #[test]
    fn test_linspace() {
        let vals = linspace(-1.0_f64, 1.0, 5);
        assert_eq!(vals.len(), 5);
        assert_relative_eq!(vals[0], -1.0);
        assert_relative_eq!(vals[1], -0.5);
        assert_relative_eq!(vals[2], 0.0);
        assert_relative_eq!(vals[4], 1.0);

        assert!(linspace(0.0_f64, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0_f64, 7.0, 1), vec![3.0]);
    }

    #[test]
    fn test_grid_2d_layout() {
        let grid = grid_2d(&[0.0_f64, 1.0, 2.0], &[5.0, 6.0]);

        assert_eq!(grid.len(), 12);
        // row 1, column 2
        let idx = 3 + 2;
        assert_eq!(&grid[idx * 2..idx * 2 + 2], &[2.0, 6.0]);
    }

    #[test]
    fn test_bounding_box() {
        let data = vec![1.0_f64, -2.0, 3.0, 4.0, -1.0, 0.5];
        let bounds = bounding_box(&data, 2);

        assert_eq!(bounds, vec![(-1.0, 3.0), (-2.0, 4.0)]);
    }
}
