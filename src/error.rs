use thiserror::Error;

/// Errors produced when a learner is handed an invalid configuration or
/// malformed input. Every check runs before any work is done, so an error
/// never comes with a partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToyMlError {
    #[error("invalid cluster count k = {k}: must satisfy 1 <= k <= {n_points} (number of points)")]
    InvalidClusterCount { k: usize, n_points: usize },

    #[error("invalid iteration budget {0}: must be >= 1")]
    InvalidIterations(usize),

    #[error("invalid tolerance {name} = {value}: must be finite and >= 0")]
    InvalidTolerance { name: &'static str, value: f64 },

    #[error("invalid dimensions: expected a multiple of {dim}, got {len} values")]
    DimensionMismatch { dim: usize, len: usize },

    #[error("query dimension {query} does not match training dimension {train}")]
    QueryDimensionMismatch { train: usize, query: usize },

    #[error("invalid neighbour count k = {k}: must satisfy 1 <= k <= {n_train} (training points)")]
    InvalidNeighbourCount { k: usize, n_train: usize },

    #[error("got {labels} labels for {samples} samples")]
    LabelCountMismatch { labels: usize, samples: usize },

    #[error("labels must be 0 or 1, found {0}")]
    NonBinaryLabel(usize),

    #[error("cannot fit on an empty dataset")]
    EmptyData,
}

/// Result alias used by all fallible operations in the crate.
pub type Result<T> = std::result::Result<T, ToyMlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_parameters() {
        let err = ToyMlError::InvalidClusterCount { k: 7, n_points: 3 };
        let msg = err.to_string();
        assert!(msg.contains("k = 7"));
        assert!(msg.contains("<= 3"));

        let err = ToyMlError::InvalidIterations(0);
        assert_eq!(err.to_string(), "invalid iteration budget 0: must be >= 1");

        let err = ToyMlError::InvalidTolerance {
            name: "rtol",
            value: -1.0,
        };
        assert_eq!(
            err.to_string(),
            "invalid tolerance rtol = -1: must be finite and >= 0"
        );
    }
}
