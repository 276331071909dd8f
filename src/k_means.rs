use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::{Result, ToyMlError};
use crate::utils::*;

////////////////////////
// k-means clustering //
////////////////////////

/// Default relative tolerance of the convergence check
pub const DEFAULT_RTOL: f64 = 1e-5;
/// Default absolute tolerance of the convergence check
pub const DEFAULT_ATOL: f64 = 1e-8;
/// Default cluster count
pub const DEFAULT_K: usize = 3;
/// Default iteration budget
pub const DEFAULT_MAX_ITERS: usize = 30;

////////////
// Params //
////////////

/// Parameters of a k-means run
///
/// ### Fields
///
/// * `k` - Number of clusters. Needs `1 <= k <= n`.
/// * `max_iters` - Maximum number of Lloyd iterations. Needs to be `>= 1`.
/// * `seed` - Seed of the random stream used for seeding and re-seeding
/// * `rtol` - Relative tolerance of the convergence check
/// * `atol` - Absolute tolerance of the convergence check
/// * `refresh_labels` - Re-assign the points against the final centres
///   before computing the inertia. When `false` the labels of the last
///   assignment step are returned as they are, which after convergence were
///   computed against the previous centres.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansParams {
    pub k: usize,
    pub max_iters: usize,
    pub seed: u64,
    pub rtol: f64,
    pub atol: f64,
    pub refresh_labels: bool,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            max_iters: DEFAULT_MAX_ITERS,
            seed: 0,
            rtol: DEFAULT_RTOL,
            atol: DEFAULT_ATOL,
            refresh_labels: false,
        }
    }
}

impl KMeansParams {
    /// Default parameters for `k` clusters
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_tolerance(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn with_refresh_labels(mut self, refresh_labels: bool) -> Self {
        self.refresh_labels = refresh_labels;
        self
    }

    /// Check the parameters against a dataset of `n` points
    ///
    /// ### Params
    ///
    /// * `n` - Number of points
    ///
    /// ### Returns
    ///
    /// `Ok(())` or the first violated constraint
    pub fn validate(&self, n: usize) -> Result<()> {
        if self.k < 1 || self.k > n {
            return Err(ToyMlError::InvalidClusterCount {
                k: self.k,
                n_points: n,
            });
        }
        if self.max_iters < 1 {
            return Err(ToyMlError::InvalidIterations(self.max_iters));
        }
        check_tolerance("rtol", self.rtol)?;
        check_tolerance("atol", self.atol)?;
        Ok(())
    }
}

/////////////
// Results //
/////////////

/// What happened in one Lloyd iteration
///
/// ### Fields
///
/// * `inertia` - Sum of squared distances of the points to the centres they
///   were assigned to at the start of the iteration
/// * `n_reseeded` - Number of empty clusters re-seeded in the update step
#[derive(Clone, Debug, PartialEq)]
pub struct IterationTrace<T> {
    pub inertia: T,
    pub n_reseeded: usize,
}

/// Outcome of a single assignment + update step
///
/// ### Fields
///
/// * `labels` - Assignment against the input centres
/// * `assignment_inertia` - Inertia of that assignment
/// * `centres` - Updated centres (flattened, `k * dim`)
/// * `n_reseeded` - Number of empty clusters that were re-seeded
#[derive(Clone, Debug)]
pub struct LloydStep<T> {
    pub labels: Vec<usize>,
    pub assignment_inertia: T,
    pub centres: Vec<T>,
    pub n_reseeded: usize,
}

/// A fitted k-means model
///
/// ### Fields
///
/// * `labels` - Cluster index per point
/// * `centres` - Cluster centres (flattened, `k * dim`)
/// * `inertia` - Sum of squared distances of points to their centre
/// * `k` - Number of clusters
/// * `dim` - Embedding dimensions
/// * `n_iter` - Number of Lloyd iterations that ran
/// * `converged` - Whether the run stopped because the centres settled
/// * `history` - One trace entry per iteration
#[derive(Clone, Debug)]
pub struct KMeansFit<T> {
    pub labels: Vec<usize>,
    pub centres: Vec<T>,
    pub inertia: T,
    pub k: usize,
    pub dim: usize,
    pub n_iter: usize,
    pub converged: bool,
    pub history: Vec<IterationTrace<T>>,
}

impl<T> KMeansFit<T>
where
    T: ToyMlFloat,
{
    /// Return the centre of cluster `j`
    pub fn centre(&self, j: usize) -> &[T] {
        &self.centres[j * self.dim..(j + 1) * self.dim]
    }

    /// Number of points per cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        cluster_sizes(&self.labels, self.k)
    }

    /// Assign new points to their nearest centre
    ///
    /// ### Params
    ///
    /// * `data` - Points (flattened, `n * dim`)
    ///
    /// ### Returns
    ///
    /// Cluster index per point
    pub fn predict(&self, data: &[T]) -> Result<Vec<usize>> {
        check_flat_dims(data, self.dim)?;
        Ok(assign_labels(data, self.dim, &self.centres).0)
    }
}

/////////////
// Helpers //
/////////////

/// Validate a flat buffer against its dimensionality
///
/// ### Returns
///
/// Number of points
pub(crate) fn check_flat_dims<T>(data: &[T], dim: usize) -> Result<usize> {
    if dim == 0 || data.len() % dim != 0 {
        return Err(ToyMlError::DimensionMismatch {
            dim,
            len: data.len(),
        });
    }
    Ok(data.len() / dim)
}

/// Reject negative, infinite or NaN tolerances
pub(crate) fn check_tolerance(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ToyMlError::InvalidTolerance { name, value });
    }
    Ok(())
}

/// Random centre initialisation
///
/// Draws `k` distinct point indices uniformly without replacement and copies
/// those points.
///
/// ### Params
///
/// * `data` - Points (flattened)
/// * `dim` - Embedding dimensions
/// * `n` - Number of points
/// * `k` - Number of centres; `k <= n`
/// * `rng` - Random stream of the run
///
/// ### Returns
///
/// Initial centres (`k * dim` elements)
pub fn init_centres<T>(data: &[T], dim: usize, n: usize, k: usize, rng: &mut StdRng) -> Vec<T>
where
    T: ToyMlFloat,
{
    let mut centres = Vec::with_capacity(k * dim);
    for idx in sample(rng, n, k).iter() {
        centres.extend_from_slice(&data[idx * dim..(idx + 1) * dim]);
    }
    centres
}

/// Assign every point to its nearest centre
///
/// ### Params
///
/// * `data` - Points (flattened)
/// * `dim` - Embedding dimensions
/// * `centres` - Centres (flattened)
///
/// ### Returns
///
/// Tuple of `(labels, inertia)`, the inertia being that of this assignment
pub fn assign_labels<T>(data: &[T], dim: usize, centres: &[T]) -> (Vec<usize>, T)
where
    T: ToyMlFloat,
{
    let mut inertia = T::zero();
    let labels = data
        .chunks_exact(dim)
        .map(|vec| {
            let (best, dist) = nearest_centre(vec, centres, dim);
            inertia = inertia + dist;
            best
        })
        .collect();

    (labels, inertia)
}

/// Recompute the centres from an assignment
///
/// Each centre becomes the coordinate-wise mean of its points. A centre
/// without points is re-seeded with a point drawn uniformly from the data.
/// Clusters are visited in index order so the random stream is consumed
/// deterministically.
///
/// ### Params
///
/// * `data` - Points (flattened)
/// * `dim` - Embedding dimensions
/// * `labels` - Cluster index per point
/// * `k` - Number of clusters
/// * `rng` - Random stream of the run
///
/// ### Returns
///
/// Tuple of `(new_centres, n_reseeded)`
pub fn update_centres<T>(
    data: &[T],
    dim: usize,
    labels: &[usize],
    k: usize,
    rng: &mut StdRng,
) -> (Vec<T>, usize)
where
    T: ToyMlFloat,
{
    let n = labels.len();
    let mut sums = vec![T::zero(); k * dim];
    let mut counts = vec![T::zero(); k];
    let mut occupied = vec![false; k];

    for (vec, &cluster) in data.chunks_exact(dim).zip(labels.iter()) {
        counts[cluster] = counts[cluster] + T::one();
        occupied[cluster] = true;
        for d in 0..dim {
            sums[cluster * dim + d] = sums[cluster * dim + d] + vec[d];
        }
    }

    let mut n_reseeded = 0;
    for c in 0..k {
        if occupied[c] {
            for d in 0..dim {
                sums[c * dim + d] = sums[c * dim + d] / counts[c];
            }
        } else {
            let idx = rng.random_range(0..n);
            sums[c * dim..(c + 1) * dim].copy_from_slice(&data[idx * dim..(idx + 1) * dim]);
            n_reseeded += 1;
        }
    }

    (sums, n_reseeded)
}

/// Check whether two centre snapshots are numerically indistinguishable
///
/// Every coordinate needs `|new - old| <= atol + rtol * |old|`.
///
/// ### Params
///
/// * `new` - Updated centres
/// * `old` - Previous centres
/// * `rtol` - Relative tolerance
/// * `atol` - Absolute tolerance
///
/// ### Returns
///
/// `true` if the centres have settled
pub fn centres_converged<T>(new: &[T], old: &[T], rtol: T, atol: T) -> bool
where
    T: ToyMlFloat,
{
    new.len() == old.len()
        && new
            .iter()
            .zip(old.iter())
            .all(|(&a, &b)| (a - b).abs() <= atol + rtol * b.abs())
}

/// Sum of squared distances of points to their assigned centre
///
/// ### Params
///
/// * `data` - Points (flattened)
/// * `dim` - Embedding dimensions
/// * `labels` - Cluster index per point
/// * `centres` - Centres (flattened)
///
/// ### Returns
///
/// The inertia
pub fn compute_inertia<T>(data: &[T], dim: usize, labels: &[usize], centres: &[T]) -> T
where
    T: ToyMlFloat,
{
    data.chunks_exact(dim)
        .zip(labels.iter())
        .map(|(vec, &c)| squared_euclidean(vec, &centres[c * dim..(c + 1) * dim]))
        .fold(T::zero(), |acc, x| acc + x)
}

/// One Lloyd iteration from an immutable centre snapshot
///
/// ### Params
///
/// * `data` - Points (flattened)
/// * `dim` - Embedding dimensions
/// * `centres` - Current centres (flattened)
/// * `k` - Number of clusters
/// * `rng` - Random stream of the run, only drawn from for re-seeding
///
/// ### Returns
///
/// The `LloydStep` with the assignment and the new snapshot
pub fn lloyd_step<T>(
    data: &[T],
    dim: usize,
    centres: &[T],
    k: usize,
    rng: &mut StdRng,
) -> LloydStep<T>
where
    T: ToyMlFloat,
{
    let (labels, assignment_inertia) = assign_labels(data, dim, centres);
    let (new_centres, n_reseeded) = update_centres(data, dim, &labels, k, rng);

    LloydStep {
        labels,
        assignment_inertia,
        centres: new_centres,
        n_reseeded,
    }
}

//////////
// Main //
//////////

/// k-means clustering engine
///
/// Plain Lloyd iterations from a random initialisation with empty cluster
/// re-seeding. Single threaded; for a fixed seed every run is bit-identical.
#[derive(Clone, Debug, Default)]
pub struct KMeans {
    params: KMeansParams,
}

impl KMeans {
    pub fn new(params: KMeansParams) -> Self {
        Self { params }
    }

    /// Fit the model
    ///
    /// ### Params
    ///
    /// * `data` - Points (flattened, `n * dim`)
    /// * `dim` - Embedding dimensions
    ///
    /// ### Returns
    ///
    /// The fitted `KMeansFit` or an error if the configuration does not fit
    /// the data
    pub fn fit<T>(&self, data: &[T], dim: usize) -> Result<KMeansFit<T>>
    where
        T: ToyMlFloat,
    {
        let n = check_flat_dims(data, dim)?;
        self.params.validate(n)?;

        let KMeansParams {
            k,
            max_iters,
            seed,
            refresh_labels,
            ..
        } = self.params;
        let rtol: T = cast(self.params.rtol);
        let atol: T = cast(self.params.atol);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut centres = init_centres(data, dim, n, k, &mut rng);
        let mut labels = Vec::new();
        let mut history = Vec::with_capacity(max_iters);
        let mut converged = false;

        debug!(n, dim, k, max_iters, seed, "starting k-means");

        for iter in 0..max_iters {
            let step = lloyd_step(data, dim, &centres, k, &mut rng);

            debug!(
                iteration = iter + 1,
                inertia = ?step.assignment_inertia,
                n_reseeded = step.n_reseeded,
                "lloyd iteration"
            );
            history.push(IterationTrace {
                inertia: step.assignment_inertia,
                n_reseeded: step.n_reseeded,
            });

            let settled = centres_converged(&step.centres, &centres, rtol, atol);
            labels = step.labels;
            centres = step.centres;

            if settled {
                converged = true;
                break;
            }
        }

        if refresh_labels {
            labels = assign_labels(data, dim, &centres).0;
        }
        let inertia = compute_inertia(data, dim, &labels, &centres);
        let n_iter = history.len();

        if converged {
            info!(n_iter, inertia = ?inertia, "k-means converged");
        } else {
            warn!(
                max_iters,
                inertia = ?inertia,
                "k-means stopped at the iteration budget before converging"
            );
        }

        Ok(KMeansFit {
            labels,
            centres,
            inertia,
            k,
            dim,
            n_iter,
            converged,
            history,
        })
    }
}

/// Cluster a flat point buffer with default tolerances
///
/// ### Params
///
/// * `data` - Points (flattened, `n * dim`)
/// * `dim` - Embedding dimensions
/// * `k` - Number of clusters
/// * `max_iters` - Maximum number of iterations
/// * `seed` - Seed for reproducibility
///
/// ### Returns
///
/// The fitted `KMeansFit`
pub fn cluster_flat<T>(
    data: &[T],
    dim: usize,
    k: usize,
    max_iters: usize,
    seed: u64,
) -> Result<KMeansFit<T>>
where
    T: ToyMlFloat,
{
    let params = KMeansParams::new(k)
        .with_max_iters(max_iters)
        .with_seed(seed);
    KMeans::new(params).fit(data, dim)
}

///////////
// Tests //
///////////
