use num_traits::Float;

///////////////
// Functions //
///////////////

/// Squared Euclidean distance between two arbitrary vectors
///
/// ### Params
///
/// * `a` - Slice of vector one
/// * `b` - Slice of vector two
///
/// ### Returns
///
/// Squared euclidean distance
#[inline(always)]
pub fn squared_euclidean<T>(a: &[T], b: &[T]) -> T
where
    T: Float,
{
    assert!(a.len() == b.len(), "Vectors a and b need to have same len!");

    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff = x - y;
            diff * diff
        })
        .fold(T::zero(), |acc, x| acc + x)
}

/// Index and squared distance of the nearest centre
///
/// Scans the centres in order and keeps the first minimum, so ties resolve
/// to the lowest centre index.
///
/// ### Params
///
/// * `vec` - Query vector
/// * `centres` - Centres (flattened, `k * dim` elements)
/// * `dim` - Embedding dimensions
///
/// ### Returns
///
/// Tuple of `(centre_index, squared_distance)`
#[inline]
pub fn nearest_centre<T>(vec: &[T], centres: &[T], dim: usize) -> (usize, T)
where
    T: Float,
{
    let mut best_idx = 0;
    let mut best_dist = T::infinity();

    for (c, cent) in centres.chunks_exact(dim).enumerate() {
        let dist = squared_euclidean(vec, cent);
        if dist < best_dist {
            best_dist = dist;
            best_idx = c;
        }
    }

    (best_idx, best_dist)
}

///////////
// Tests //
///////////
