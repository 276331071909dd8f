use rayon::prelude::*;
use std::cmp::Ordering;

use crate::error::{Result, ToyMlError};
use crate::logistic::check_binary_labels;
use crate::utils::*;

///////////////////////////
// Distance-weighted kNN //
///////////////////////////

/// Keeps the probability finite when every weight underflows to zero
const WEIGHT_EPS: f64 = 1e-12;

/// Distance-weighted k-nearest-neighbour classifier for binary labels
///
/// Every query looks up its `k` nearest training points by Euclidean
/// distance and averages their labels with weights `exp(-lambda * d²)`.
///
/// ### Fields
///
/// * `vectors_flat` - Training samples, flattened for cache locality
/// * `labels` - Training labels as floats (`0` or `1`)
/// * `dim` - Number of features
/// * `n` - Number of training samples
pub struct WeightedKnn<T> {
    vectors_flat: Vec<T>,
    labels: Vec<T>,
    dim: usize,
    n: usize,
}

impl<T> WeightedKnn<T>
where
    T: ToyMlFloat,
{
    /// Store the training set
    ///
    /// ### Params
    ///
    /// * `vectors_flat` - Training samples (flattened, `n * dim`)
    /// * `dim` - Number of features
    /// * `labels` - Class per sample, `0` or `1`
    ///
    /// ### Returns
    ///
    /// The classifier or an error for malformed input
    pub fn new(vectors_flat: Vec<T>, dim: usize, labels: &[usize]) -> Result<Self> {
        let n = check_binary_labels(&vectors_flat, dim, labels)?;
        if n == 0 {
            return Err(ToyMlError::EmptyData);
        }

        Ok(Self {
            vectors_flat,
            labels: labels
                .iter()
                .map(|&l| if l == 1 { T::one() } else { T::zero() })
                .collect(),
            dim,
            n,
        })
    }

    /// Number of training samples
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of features
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Class-1 probability of a single query
    fn query_proba(&self, query_vec: &[T], k: usize, lambda: T) -> T {
        let mut dists: Vec<(T, usize)> = self
            .vectors_flat
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(idx, vec)| (squared_euclidean(query_vec, vec), idx))
            .collect();

        if k < self.n {
            dists.select_nth_unstable_by(k - 1, |a, b| {
                a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal)
            });
        }

        let (weighted, total) = dists[..k]
            .iter()
            .fold((T::zero(), T::zero()), |(wv, ws), &(d2, idx)| {
                let weight = (-lambda * d2).exp();
                (wv + weight * self.labels[idx], ws + weight)
            });

        weighted / (total + cast(WEIGHT_EPS))
    }

    /// Class-1 probabilities for a batch of queries
    ///
    /// Queries are independent and evaluated in parallel.
    ///
    /// ### Params
    ///
    /// * `query` - Query samples (flattened, `n_query * dim`)
    /// * `k` - Number of neighbours, `1 <= k <= n`
    /// * `lambda` - Decay of the weight with squared distance
    ///
    /// ### Returns
    ///
    /// `p(y = 1 | x)` per query
    pub fn predict_proba(&self, query: &[T], k: usize, lambda: T) -> Result<Vec<T>> {
        if k < 1 || k > self.n {
            return Err(ToyMlError::InvalidNeighbourCount { k, n_train: self.n });
        }
        if query.len() % self.dim != 0 {
            return Err(ToyMlError::DimensionMismatch {
                dim: self.dim,
                len: query.len(),
            });
        }

        Ok(query
            .par_chunks_exact(self.dim)
            .map(|query_vec| self.query_proba(query_vec, k, lambda))
            .collect())
    }

    /// Predicted class, 1 where the probability is at least one half
    pub fn predict(&self, query: &[T], k: usize, lambda: T) -> Result<Vec<usize>> {
        let half: T = cast(0.5);
        Ok(self
            .predict_proba(query, k, lambda)?
            .into_iter()
            .map(|p| usize::from(p >= half))
            .collect())
    }
}

/// Distance-weighted kNN probability in one call
///
/// ### Params
///
/// * `train` - Training samples (flattened, `n * dim`)
/// * `dim` - Number of features
/// * `labels` - Class per training sample, `0` or `1`
/// * `query` - Query samples (flattened)
/// * `k` - Number of neighbours
/// * `lambda` - Decay of the weight with squared distance
///
/// ### Returns
///
/// `p(y = 1 | x)` per query
pub fn knn_proba_weighted_flat<T>(
    train: &[T],
    dim: usize,
    labels: &[usize],
    query: &[T],
    k: usize,
    lambda: T,
) -> Result<Vec<T>>
where
    T: ToyMlFloat,
{
    WeightedKnn::new(train.to_vec(), dim, labels)?.predict_proba(query, k, lambda)
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_data() -> (Vec<f64>, Vec<usize>) {
        // 1-D: class 0 on the left, class 1 on the right
        (vec![-3.0, -2.0, -1.0, 1.0, 2.0, 3.0], vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_k1_returns_nearest_label() {
        let (train, labels) = line_data();
        let p = knn_proba_weighted_flat(&train, 1, &labels, &[-2.1, 2.6, 0.9], 1, 3.0).unwrap();

        assert_relative_eq!(p[0], 0.0);
        assert_relative_eq!(p[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(p[2], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_weights_by_distance() {
        let train = vec![0.0, 1.0];
        let labels = vec![0, 1];
        let lambda = 0.5;
        let p = knn_proba_weighted_flat(&train, 1, &labels, &[0.25], 2, lambda).unwrap();

        let w0 = (-lambda * 0.25_f64 * 0.25).exp();
        let w1 = (-lambda * 0.75_f64 * 0.75).exp();
        assert_relative_eq!(p[0], w1 / (w0 + w1 + 1e-12), epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_query_is_even() {
        let (train, labels) = line_data();
        let p = knn_proba_weighted_flat(&train, 1, &labels, &[0.0], 6, 3.0).unwrap();
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_far_query_underflow_stays_finite() {
        let (train, labels) = line_data();
        let p = knn_proba_weighted_flat(&train, 1, &labels, &[1e6], 3, 3.0).unwrap();

        assert!(p[0].is_finite());
        assert_eq!(p[0], 0.0);
    }

    #[test]
    fn test_predict_classes() {
        let (train, labels) = line_data();
        let knn = WeightedKnn::new(train, 1, &labels).unwrap();

        assert_eq!(knn.n(), 6);
        assert_eq!(knn.predict(&[-5.0, 5.0, -0.5, 0.5], 3, 3.0).unwrap(), vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_invalid_k() {
        let (train, labels) = line_data();
        let knn = WeightedKnn::new(train, 1, &labels).unwrap();

        assert_eq!(
            knn.predict_proba(&[0.0], 0, 3.0).unwrap_err(),
            ToyMlError::InvalidNeighbourCount { k: 0, n_train: 6 }
        );
        assert_eq!(
            knn.predict_proba(&[0.0], 7, 3.0).unwrap_err(),
            ToyMlError::InvalidNeighbourCount { k: 7, n_train: 6 }
        );
    }

    #[test]
    fn test_invalid_inputs() {
        let train = vec![0.0, 0.0, 1.0, 1.0];

        assert!(matches!(
            WeightedKnn::new(train.clone(), 2, &[0]),
            Err(ToyMlError::LabelCountMismatch { .. })
        ));
        assert!(matches!(
            WeightedKnn::new(train.clone(), 2, &[0, 3]),
            Err(ToyMlError::NonBinaryLabel(3))
        ));

        let knn = WeightedKnn::new(train, 2, &[0, 1]).unwrap();
        assert!(matches!(
            knn.predict_proba(&[0.0, 1.0, 2.0], 1, 1.0),
            Err(ToyMlError::DimensionMismatch { dim: 2, len: 3 })
        ));
    }

    #[test]
    fn test_larger_k_smooths() {
        // an isolated class-1 point inside class 0 territory
        let train = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
        let labels = vec![0, 0, 1, 0, 0];

        let p1 = knn_proba_weighted_flat(&train, 1, &labels, &[0.0], 1, 0.5).unwrap();
        let p5 = knn_proba_weighted_flat(&train, 1, &labels, &[0.0], 5, 0.5).unwrap();

        assert!(p1[0] > 0.99);
        assert!(p5[0] < p1[0]);
    }
}
