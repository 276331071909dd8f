use tracing::{debug, info, warn};

use crate::error::{Result, ToyMlError};
use crate::k_means::{check_flat_dims, check_tolerance};
use crate::utils::*;

/////////////////////////
// Logistic regression //
/////////////////////////

/// Default gradient tolerance (max-norm) of the optimiser
pub const DEFAULT_GTOL: f64 = 1e-5;
/// Sufficient decrease constant of the backtracking line search
pub const DEFAULT_ARMIJO_C1: f64 = 1e-4;
/// Maximum number of step halvings per line search
pub const DEFAULT_MAX_HALVINGS: usize = 60;
/// Curvature pairs below this are not used to update the inverse Hessian
const CURVATURE_EPS: f64 = 1e-10;
/// Below this `|w2|` the decision boundary is treated as vertical
const BOUNDARY_EPS: f64 = 1e-12;

/// Parameters of the BFGS optimiser
///
/// ### Fields
///
/// * `max_iters` - Maximum number of BFGS iterations. Defaults to
///   `200 * n_weights` if `None`.
/// * `gtol` - Stop once the largest gradient component is below this
/// * `armijo_c1` - Sufficient decrease constant of the line search
/// * `max_halvings` - Maximum step halvings in the line search
#[derive(Clone, Debug, PartialEq)]
pub struct LogRegParams {
    pub max_iters: Option<usize>,
    pub gtol: f64,
    pub armijo_c1: f64,
    pub max_halvings: usize,
}

impl Default for LogRegParams {
    fn default() -> Self {
        Self {
            max_iters: None,
            gtol: DEFAULT_GTOL,
            armijo_c1: DEFAULT_ARMIJO_C1,
            max_halvings: DEFAULT_MAX_HALVINGS,
        }
    }
}

impl LogRegParams {
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = Some(max_iters);
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }
}

/// A fitted binary logistic regression
///
/// ### Fields
///
/// * `weights` - `[w0, w1, .., wd]` with the bias first
/// * `loss` - Negative log-likelihood at the final weights
/// * `n_iter` - Number of BFGS iterations
/// * `converged` - Whether the gradient tolerance was reached
#[derive(Clone, Debug)]
pub struct LogRegFit<T> {
    pub weights: Vec<T>,
    pub loss: T,
    pub n_iter: usize,
    pub converged: bool,
}

impl<T> LogRegFit<T>
where
    T: ToyMlFloat,
{
    /// Number of input features
    pub fn dim(&self) -> usize {
        self.weights.len() - 1
    }

    /// Linear score `w0 + w·x` of one sample
    #[inline]
    fn score(&self, vec: &[T]) -> T {
        vec.iter()
            .zip(self.weights[1..].iter())
            .fold(self.weights[0], |acc, (&x, &w)| acc + x * w)
    }

    /// Probability of class 1
    ///
    /// ### Params
    ///
    /// * `data` - Samples (flattened, `n * dim`)
    ///
    /// ### Returns
    ///
    /// `p(y = 1 | x)` per sample
    pub fn predict_proba(&self, data: &[T]) -> Result<Vec<T>> {
        check_flat_dims(data, self.dim())?;
        Ok(data
            .chunks_exact(self.dim())
            .map(|vec| sigmoid(self.score(vec)))
            .collect())
    }

    /// Predicted class, 1 where `p(y = 1 | x) >= 0.5`
    pub fn predict(&self, data: &[T]) -> Result<Vec<usize>> {
        let half: T = cast(0.5);
        Ok(self
            .predict_proba(data)?
            .into_iter()
            .map(|p| usize::from(p >= half))
            .collect())
    }

    /// Fraction of samples whose predicted class matches `labels`
    pub fn accuracy(&self, data: &[T], labels: &[usize]) -> Result<f64> {
        let pred = self.predict(data)?;
        if pred.len() != labels.len() {
            return Err(ToyMlError::LabelCountMismatch {
                labels: labels.len(),
                samples: pred.len(),
            });
        }
        Ok(accuracy(&pred, labels))
    }

    /// Decision boundary of a two-feature model
    ///
    /// Solves `w0 + w1 * x1 + w2 * x2 = 0` for `x2`.
    ///
    /// ### Params
    ///
    /// * `x1` - Value of the first feature
    ///
    /// ### Returns
    ///
    /// `x2` on the boundary, `None` if the model does not have exactly two
    /// features or the boundary is vertical
    pub fn boundary_x2(&self, x1: T) -> Option<T> {
        if self.dim() != 2 || self.weights[2].abs() <= cast(BOUNDARY_EPS) {
            return None;
        }
        Some(-(self.weights[0] + self.weights[1] * x1) / self.weights[2])
    }

    /// Location of a vertical decision boundary, `x1 = -w0 / w1`
    pub fn vertical_boundary_x1(&self) -> Option<T> {
        if self.dim() != 2 || self.weights[1].abs() <= cast(BOUNDARY_EPS) {
            return None;
        }
        Some(-self.weights[0] / self.weights[1])
    }
}

/////////////
// Helpers //
/////////////

/// Logistic function without overflow for large `|z|`
#[inline]
pub fn sigmoid<T>(z: T) -> T
where
    T: ToyMlFloat,
{
    if z >= T::zero() {
        T::one() / (T::one() + (-z).exp())
    } else {
        let e = z.exp();
        e / (T::one() + e)
    }
}

/// `log(1 + exp(z))`, i.e. `logaddexp(0, z)`, without overflow
#[inline]
pub fn log1p_exp<T>(z: T) -> T
where
    T: ToyMlFloat,
{
    z.max(T::zero()) + (-z.abs()).exp().ln_1p()
}

#[inline]
fn dot<T>(a: &[T], b: &[T]) -> T
where
    T: ToyMlFloat,
{
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Prepend a constant 1 column to the samples
///
/// ### Params
///
/// * `data` - Samples (flattened, `n * dim`)
/// * `dim` - Number of features
///
/// ### Returns
///
/// Design matrix (flattened, `n * (dim + 1)`)
pub fn with_bias<T>(data: &[T], dim: usize) -> Vec<T>
where
    T: ToyMlFloat,
{
    let n = data.len() / dim;
    let mut xb = Vec::with_capacity(n * (dim + 1));
    for vec in data.chunks_exact(dim) {
        xb.push(T::one());
        xb.extend_from_slice(vec);
    }
    xb
}

/// Negative log-likelihood and its gradient
///
/// `loss = sum(log(1 + exp(z)) - y * z)` and `grad = Xbᵀ (σ(z) - y)` with
/// `z = Xb w`.
///
/// ### Params
///
/// * `xb` - Design matrix with bias column (flattened)
/// * `y` - Targets in `{0, 1}`
/// * `w` - Weights, bias first
///
/// ### Returns
///
/// Tuple of `(loss, gradient)`
pub fn loss_and_grad<T>(xb: &[T], y: &[T], w: &[T]) -> (T, Vec<T>)
where
    T: ToyMlFloat,
{
    let p_dim = w.len();
    let mut loss = T::zero();
    let mut grad = vec![T::zero(); p_dim];

    for (row, &target) in xb.chunks_exact(p_dim).zip(y.iter()) {
        let z = dot(row, w);
        loss = loss + log1p_exp(z) - target * z;
        let residual = sigmoid(z) - target;
        for (g, &x) in grad.iter_mut().zip(row.iter()) {
            *g = *g + residual * x;
        }
    }

    (loss, grad)
}

fn max_abs<T>(v: &[T]) -> T
where
    T: ToyMlFloat,
{
    v.iter().fold(T::zero(), |acc, &x| acc.max(x.abs()))
}

fn identity<T>(p_dim: usize) -> Vec<T>
where
    T: ToyMlFloat,
{
    let mut h = vec![T::zero(); p_dim * p_dim];
    for i in 0..p_dim {
        h[i * p_dim + i] = T::one();
    }
    h
}

fn mat_vec<T>(m: &[T], v: &[T]) -> Vec<T>
where
    T: ToyMlFloat,
{
    m.chunks_exact(v.len()).map(|row| dot(row, v)).collect()
}

/// Check sample and label counts and that all labels are binary
///
/// ### Returns
///
/// Number of samples
pub(crate) fn check_binary_labels<T>(data: &[T], dim: usize, labels: &[usize]) -> Result<usize> {
    let n = check_flat_dims(data, dim)?;
    if labels.len() != n {
        return Err(ToyMlError::LabelCountMismatch {
            labels: labels.len(),
            samples: n,
        });
    }
    if let Some(&bad) = labels.iter().find(|&&l| l > 1) {
        return Err(ToyMlError::NonBinaryLabel(bad));
    }
    Ok(n)
}

//////////
// Main //
//////////

/// Fit a binary logistic regression with BFGS
///
/// Starts from all-zero weights and an identity inverse Hessian. Each step
/// backtracks from a unit step until the Armijo condition holds.
///
/// ### Params
///
/// * `data` - Samples (flattened, `n * dim`)
/// * `dim` - Number of features
/// * `labels` - Class per sample, `0` or `1`
/// * `params` - Optimiser parameters
///
/// ### Returns
///
/// The fitted `LogRegFit`
pub fn fit_logistic_flat<T>(
    data: &[T],
    dim: usize,
    labels: &[usize],
    params: &LogRegParams,
) -> Result<LogRegFit<T>>
where
    T: ToyMlFloat,
{
    let n = check_binary_labels(data, dim, labels)?;
    if n == 0 {
        return Err(ToyMlError::EmptyData);
    }
    check_tolerance("gtol", params.gtol)?;

    let xb = with_bias(data, dim);
    let y: Vec<T> = labels
        .iter()
        .map(|&l| if l == 1 { T::one() } else { T::zero() })
        .collect();

    let p_dim = dim + 1;
    let max_iters = params.max_iters.unwrap_or(200 * p_dim);
    let gtol: T = cast(params.gtol);
    let c1: T = cast(params.armijo_c1);
    let half: T = cast(0.5);

    let mut w = vec![T::zero(); p_dim];
    let (mut loss, mut grad) = loss_and_grad(&xb, &y, &w);
    let mut h_inv = identity::<T>(p_dim);
    let mut n_iter = 0;
    let mut converged = max_abs(&grad) <= gtol;

    while !converged && n_iter < max_iters {
        let mut direction: Vec<T> = mat_vec(&h_inv, &grad).into_iter().map(|x| -x).collect();
        let mut slope = dot(&grad, &direction);

        // lost positive definiteness; fall back to steepest descent
        if slope >= T::zero() {
            h_inv = identity(p_dim);
            direction = grad.iter().map(|&g| -g).collect();
            slope = -dot(&grad, &grad);
        }

        let mut alpha = T::one();
        let mut accepted = None;
        for _ in 0..params.max_halvings {
            let w_new: Vec<T> = w
                .iter()
                .zip(direction.iter())
                .map(|(&wi, &di)| wi + alpha * di)
                .collect();
            let (loss_new, grad_new) = loss_and_grad(&xb, &y, &w_new);
            if loss_new <= loss + c1 * alpha * slope {
                accepted = Some((w_new, loss_new, grad_new));
                break;
            }
            alpha = alpha * half;
        }

        let Some((w_new, loss_new, grad_new)) = accepted else {
            warn!(n_iter, loss = ?loss, "line search failed to decrease the loss");
            break;
        };

        let s: Vec<T> = w_new.iter().zip(w.iter()).map(|(&a, &b)| a - b).collect();
        let yk: Vec<T> = grad_new
            .iter()
            .zip(grad.iter())
            .map(|(&a, &b)| a - b)
            .collect();
        let sy = dot(&s, &yk);

        if sy > cast(CURVATURE_EPS) {
            let rho = T::one() / sy;
            let hy = mat_vec(&h_inv, &yk);
            let yhy = dot(&yk, &hy);
            let ss_coef = rho * rho * yhy + rho;
            for i in 0..p_dim {
                for j in 0..p_dim {
                    h_inv[i * p_dim + j] = h_inv[i * p_dim + j]
                        - rho * (hy[i] * s[j] + s[i] * hy[j])
                        + ss_coef * s[i] * s[j];
                }
            }
        }

        w = w_new;
        loss = loss_new;
        grad = grad_new;
        n_iter += 1;
        converged = max_abs(&grad) <= gtol;

        debug!(iteration = n_iter, loss = ?loss, step = ?alpha, "bfgs iteration");
    }

    if converged {
        info!(n_iter, loss = ?loss, "logistic regression converged");
    } else {
        warn!(n_iter, loss = ?loss, "logistic regression stopped before reaching gtol");
    }

    Ok(LogRegFit {
        weights: w,
        loss,
        n_iter,
        converged,
    })
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::generate_gaussian_blobs;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_is_stable() {
        assert_relative_eq!(sigmoid(0.0_f64), 0.5);
        assert_relative_eq!(sigmoid(1000.0_f64), 1.0);
        assert_eq!(sigmoid(-1000.0_f64), 0.0);
        assert_relative_eq!(sigmoid(2.0_f64) + sigmoid(-2.0_f64), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_log1p_exp() {
        assert_relative_eq!(log1p_exp(0.0_f64), 2.0_f64.ln(), epsilon = 1e-15);
        assert_relative_eq!(log1p_exp(1000.0_f64), 1000.0);
        assert!(log1p_exp(-1000.0_f64) >= 0.0);
        assert!(log1p_exp(-1000.0_f64) < 1e-300);
        assert_relative_eq!(log1p_exp(1.5_f64), (1.0 + 1.5_f64.exp()).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let data = vec![0.5, -1.0, 1.5, 0.3, -0.7, 2.0, 0.1, 0.1];
        let labels = [1.0, 0.0, 1.0, 0.0];
        let xb = with_bias(&data, 2);
        let w = vec![0.2, -0.4, 0.7];

        let (_, grad) = loss_and_grad(&xb, &labels, &w);
        let eps = 1e-6;
        for i in 0..3 {
            let mut w_plus = w.clone();
            let mut w_minus = w.clone();
            w_plus[i] += eps;
            w_minus[i] -= eps;
            let (lp, _) = loss_and_grad(&xb, &labels, &w_plus);
            let (lm, _) = loss_and_grad(&xb, &labels, &w_minus);
            assert_relative_eq!(grad[i], (lp - lm) / (2.0 * eps), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_bias_only_recovers_logit_of_base_rate() {
        // single constant feature: only the bias can move and its optimum is
        // logit(3/4) = ln 3
        let data = vec![0.0; 4];
        let labels = vec![1, 1, 1, 0];
        let fit = fit_logistic_flat(&data, 1, &labels, &LogRegParams::default()).unwrap();

        assert!(fit.converged);
        assert_relative_eq!(fit.weights[0], 3.0_f64.ln(), epsilon = 1e-4);
        assert_relative_eq!(fit.weights[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_two_blobs() {
        let centres = vec![vec![-1.6, -1.0], vec![1.6, 1.0]];
        let (mat, labels) = generate_gaussian_blobs::<f64>(&centres, 80, 0.7, 0);
        let (data, _, dim) = matrix_to_flat(mat.as_ref());

        let fit = fit_logistic_flat(&data, dim, &labels, &LogRegParams::default()).unwrap();
        let pred = fit.predict(&data).unwrap();

        assert!(accuracy(&pred, &labels) > 0.95);
        assert!(fit.weights[1] > 0.0);
        assert!(fit.weights[2] > 0.0);
        assert!(fit.loss.is_finite());

        // the loss at the fit beats the starting point
        let (loss0, _) = loss_and_grad(&with_bias(&data, dim), &labels_as_float(&labels), &[0.0; 3]);
        assert!(fit.loss < loss0);
    }

    fn labels_as_float(labels: &[usize]) -> Vec<f64> {
        labels.iter().map(|&l| l as f64).collect()
    }

    #[test]
    fn test_rejects_bad_labels() {
        let data = vec![0.0, 1.0, 2.0, 3.0];
        let params = LogRegParams::default();

        assert_eq!(
            fit_logistic_flat(&data, 2, &[0], &params).unwrap_err(),
            ToyMlError::LabelCountMismatch {
                labels: 1,
                samples: 2
            }
        );
        assert_eq!(
            fit_logistic_flat(&data, 2, &[0, 2], &params).unwrap_err(),
            ToyMlError::NonBinaryLabel(2)
        );
        assert_eq!(
            fit_logistic_flat::<f64>(&[], 2, &[], &params).unwrap_err(),
            ToyMlError::EmptyData
        );
    }

    #[test]
    fn test_gtol_controls_stopping() {
        let centres = vec![vec![-1.6, -1.0], vec![1.6, 1.0]];
        let (mat, labels) = generate_gaussian_blobs::<f64>(&centres, 40, 0.7, 3);
        let (data, _, dim) = matrix_to_flat(mat.as_ref());

        let loose = LogRegParams::default().with_gtol(1e3);
        let fit = fit_logistic_flat(&data, dim, &labels, &loose).unwrap();
        // the gradient at w = 0 is already below the tolerance
        assert!(fit.converged);
        assert_eq!(fit.n_iter, 0);
        assert!(fit.weights.iter().all(|&w| w == 0.0));

        for gtol in [-1.0, f64::NAN, f64::INFINITY] {
            let params = LogRegParams::default().with_gtol(gtol);
            assert!(matches!(
                fit_logistic_flat(&data, dim, &labels, &params),
                Err(ToyMlError::InvalidTolerance { name: "gtol", .. })
            ));
        }
    }

    #[test]
    fn test_boundary_and_predict() {
        let fit = LogRegFit {
            weights: vec![1.0_f64, 2.0, 4.0],
            loss: 0.0,
            n_iter: 0,
            converged: true,
        };

        assert_relative_eq!(fit.boundary_x2(1.0).unwrap(), -0.75);
        // on the boundary the probability is exactly one half
        let p = fit.predict_proba(&[1.0, -0.75]).unwrap();
        assert_relative_eq!(p[0], 0.5, epsilon = 1e-12);

        assert_eq!(fit.predict(&[5.0, 5.0, -5.0, -5.0]).unwrap(), vec![1, 0]);
        assert!(fit.predict(&[1.0, 2.0, 3.0]).is_err());
        assert_relative_eq!(fit.accuracy(&[5.0, 5.0, -5.0, -5.0], &[1, 1]).unwrap(), 0.5);
        assert!(fit.accuracy(&[5.0, 5.0], &[1, 0]).is_err());

        let vertical = LogRegFit {
            weights: vec![1.0_f64, 2.0, 0.0],
            loss: 0.0,
            n_iter: 0,
            converged: true,
        };
        assert!(vertical.boundary_x2(0.0).is_none());
        assert_relative_eq!(vertical.vertical_boundary_x1().unwrap(), -0.5);
    }
}
