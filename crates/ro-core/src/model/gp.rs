//! Online Gaussian-process surrogate with a sliding observation window.
//!
//! Two layers:
//!
//! - [`MaternGp`] — exact GP regression under a Matérn ν = 3/2 kernel with
//!   observation noise, y-normalisation, and marginal-likelihood
//!   hyperparameter refitting. Sits behind the [`GaussianProcess`] trait
//!   so another numeric backend can be substituted.
//! - [`SlidingWindowGp`] — the surrogate proper: a bounded ring of the W
//!   most-recent `(x, y)` pairs with cached per-column standardisation
//!   statistics, delegating the actual regression to the inner model.
//!
//! The predictive mean is reported on the original y scale. The predictive
//! stddev is reported on the normalised scale; the confidence bounds built
//! on top of it (UCB selection, LCB safety filtering) depend on that
//! scale staying commensurate with the observation noise.

use rand::{Rng, SeedableRng};
use ro_math::{cho_solve, cholesky, log_diag_sum, solve_lower, ColumnStats, LinalgError, Matern32};
use std::collections::VecDeque;
use thiserror::Error;

/// Default sliding window length W.
pub const DEFAULT_WINDOW_SIZE: usize = 30;

/// Errors from GP fitting and prediction.
#[derive(Debug, Error)]
pub enum GpError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("empty training set")]
    EmptyTrainingSet,

    #[error("model not fitted")]
    NotFitted,

    #[error("linear algebra failure: {0}")]
    Linalg(#[from] LinalgError),

    #[error("marginal-likelihood optimisation diverged: no admissible length-scale")]
    FitDiverged,
}

/// Posterior mean and stddev at a batch of inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Abstraction over the kernel-math backend.
pub trait GaussianProcess {
    /// Fit against the full current training set, refitting hyperparameters.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), GpError>;

    /// Posterior mean and stddev at the given inputs.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Prediction, GpError>;

    /// Prior marginal stddev of the kernel, used before any data arrives.
    fn prior_std(&self) -> f64;

    /// Drop all fitted state.
    fn reset(&mut self);
}

/// Hyperparameters for [`MaternGp`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaternHyperparams {
    /// Initial length-scale, also the first optimiser start point.
    pub length_scale: f64,
    /// Bounds on the length-scale during optimisation.
    pub length_scale_bounds: (f64, f64),
    /// Observation-noise variance added to the kernel diagonal.
    pub noise: f64,
    /// Random restarts for the marginal-likelihood maximisation.
    pub n_restarts: usize,
    /// Seed for restart draws, so refitting the same window is reproducible.
    pub restart_seed: u64,
}

impl Default for MaternHyperparams {
    fn default() -> Self {
        MaternHyperparams {
            length_scale: 1.0,
            length_scale_bounds: (1e-5, 1e5),
            noise: 1e-2,
            n_restarts: 5,
            restart_seed: 0x5eed_cafe,
        }
    }
}

#[derive(Debug, Clone)]
struct FittedState {
    x: Vec<Vec<f64>>,
    chol: Vec<f64>,
    /// (K + noise·I)⁻¹ · y_normalised
    weights: Vec<f64>,
    y_mean: f64,
    y_std: f64,
}

/// Exact GP regression with a Matérn ν = 3/2 kernel.
#[derive(Debug, Clone)]
pub struct MaternGp {
    params: MaternHyperparams,
    kernel: Matern32,
    state: Option<FittedState>,
}

impl Default for MaternGp {
    fn default() -> Self {
        MaternGp::new(MaternHyperparams::default())
    }
}

impl MaternGp {
    pub fn new(params: MaternHyperparams) -> Self {
        MaternGp {
            kernel: Matern32::new(params.length_scale),
            params,
            state: None,
        }
    }

    /// Fitted length-scale after the most recent [`GaussianProcess::fit`].
    pub fn length_scale(&self) -> f64 {
        self.kernel.length_scale
    }

    /// Log marginal likelihood of `y_norm` under the given length-scale, or
    /// `None` when the kernel matrix is not positive definite there.
    fn log_marginal_likelihood(&self, x: &[Vec<f64>], y_norm: &[f64], ell: f64) -> Option<f64> {
        let n = x.len();
        let kernel = Matern32::new(ell);
        let mut k = kernel.matrix(x);
        for i in 0..n {
            k[i * n + i] += self.params.noise;
        }
        let chol = cholesky(&k, n).ok()?;
        let weights = cho_solve(&chol, n, y_norm).ok()?;
        let data_fit: f64 = y_norm.iter().zip(weights.iter()).map(|(a, b)| a * b).sum();
        let lml = -0.5 * data_fit
            - log_diag_sum(&chol, n)
            - 0.5 * n as f64 * (2.0 * std::f64::consts::PI).ln();
        lml.is_finite().then_some(lml)
    }

    /// Maximise the log marginal likelihood over log₁₀ length-scale with
    /// seeded random restarts and a bounded step-halving hill climb.
    fn optimise_length_scale(&self, x: &[Vec<f64>], y_norm: &[f64]) -> Result<f64, GpError> {
        let (lo, hi) = self.params.length_scale_bounds;
        let (log_lo, log_hi) = (lo.log10(), hi.log10());
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.params.restart_seed);

        let mut starts = Vec::with_capacity(self.params.n_restarts + 1);
        starts.push(self.params.length_scale.log10().clamp(log_lo, log_hi));
        for _ in 0..self.params.n_restarts {
            starts.push(log_lo + (log_hi - log_lo) * rng.random::<f64>());
        }

        let eval = |log_ell: f64| self.log_marginal_likelihood(x, y_norm, 10f64.powf(log_ell));

        let mut best: Option<(f64, f64)> = None;
        for start in starts {
            let mut here = start;
            let mut here_lml = match eval(here) {
                Some(v) => v,
                None => continue,
            };
            let mut step = 0.5;
            while step > 1e-3 {
                let mut moved = false;
                for cand in [here + step, here - step] {
                    let cand = cand.clamp(log_lo, log_hi);
                    if let Some(v) = eval(cand) {
                        if v > here_lml {
                            here = cand;
                            here_lml = v;
                            moved = true;
                        }
                    }
                }
                if !moved {
                    step *= 0.5;
                }
            }
            if best.map_or(true, |(b, _)| here_lml > b) {
                best = Some((here_lml, here));
            }
        }

        best.map(|(_, log_ell)| 10f64.powf(log_ell))
            .ok_or(GpError::FitDiverged)
    }
}

impl GaussianProcess for MaternGp {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), GpError> {
        if x.is_empty() {
            return Err(GpError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(GpError::DimensionMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }

        let (y_mean, y_std) = ro_math::scalar_stats(y);
        let y_norm: Vec<f64> = y.iter().map(|v| (v - y_mean) / y_std).collect();

        let ell = self.optimise_length_scale(x, &y_norm)?;
        self.kernel = Matern32::new(ell);

        let n = x.len();
        let mut k = self.kernel.matrix(x);
        for i in 0..n {
            k[i * n + i] += self.params.noise;
        }
        let chol = cholesky(&k, n)?;
        let weights = cho_solve(&chol, n, &y_norm)?;

        self.state = Some(FittedState {
            x: x.to_vec(),
            chol,
            weights,
            y_mean,
            y_std,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Prediction, GpError> {
        let state = self.state.as_ref().ok_or(GpError::NotFitted)?;
        let n = state.x.len();
        let mut mean = Vec::with_capacity(x.len());
        let mut std = Vec::with_capacity(x.len());
        for row in x {
            let k_star: Vec<f64> = state.x.iter().map(|t| self.kernel.eval(row, t)).collect();
            let mu_norm: f64 = k_star
                .iter()
                .zip(state.weights.iter())
                .map(|(a, b)| a * b)
                .sum();
            mean.push(mu_norm * state.y_std + state.y_mean);

            let v = solve_lower(&state.chol, n, &k_star)?;
            let var = (self.kernel.diag() - v.iter().map(|x| x * x).sum::<f64>()).max(0.0);
            std.push(var.sqrt());
        }
        Ok(Prediction { mean, std })
    }

    fn prior_std(&self) -> f64 {
        self.kernel.diag().sqrt()
    }

    fn reset(&mut self) {
        self.state = None;
        self.kernel = Matern32::new(self.params.length_scale);
    }
}

/// GP surrogate with a bounded sliding observation window and per-column
/// input standardisation.
pub struct SlidingWindowGp {
    window: VecDeque<(Vec<f64>, f64)>,
    window_size: usize,
    stats: Option<ColumnStats>,
    regressor: Box<dyn GaussianProcess>,
}

impl SlidingWindowGp {
    /// Surrogate over the default Matérn backend.
    pub fn new(window_size: usize) -> Self {
        Self::with_regressor(window_size, Box::new(MaternGp::default()))
    }

    /// Surrogate over a caller-supplied regression backend.
    pub fn with_regressor(window_size: usize, regressor: Box<dyn GaussianProcess>) -> Self {
        SlidingWindowGp {
            window: VecDeque::with_capacity(window_size),
            window_size,
            stats: None,
            regressor,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Append observations, truncate the window to the most recent W
    /// entries, recompute the column statistics, and refit the regressor.
    ///
    /// A single call supplying more rows than the window holds keeps only
    /// the tail.
    pub fn update(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), GpError> {
        if x.len() != y.len() {
            return Err(GpError::DimensionMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        if x.is_empty() {
            return Err(GpError::EmptyTrainingSet);
        }
        let dim = self
            .window
            .front()
            .map_or(x[0].len(), |(row, _)| row.len());
        for row in x {
            if row.len() != dim {
                return Err(GpError::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
        }

        for (row, target) in x.iter().zip(y.iter()) {
            if self.window.len() == self.window_size {
                self.window.pop_front();
            }
            self.window.push_back((row.clone(), *target));
        }

        let rows: Vec<Vec<f64>> = self.window.iter().map(|(r, _)| r.clone()).collect();
        let targets: Vec<f64> = self.window.iter().map(|(_, t)| *t).collect();
        let stats = ColumnStats::fit(&rows).ok_or(GpError::EmptyTrainingSet)?;
        let rows_std = stats.apply_all(&rows);
        self.regressor.fit(&rows_std, &targets)?;
        self.stats = Some(stats);
        Ok(())
    }

    /// Posterior mean and stddev at the given inputs.
    ///
    /// With an empty window this is the prior: zero mean and the kernel's
    /// marginal stddev at every input.
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Prediction, GpError> {
        if self.window.is_empty() {
            return Ok(Prediction {
                mean: vec![0.0; x.len()],
                std: vec![self.regressor.prior_std(); x.len()],
            });
        }
        let stats = self.stats.as_ref().ok_or(GpError::NotFitted)?;
        let x_std = stats.apply_all(x);
        self.regressor.predict(&x_std)
    }

    /// Empty the window. Column statistics become undefined and prediction
    /// re-enters the prior branch.
    pub fn reset(&mut self) {
        self.window.clear();
        self.stats = None;
        self.regressor.reset();
    }
}

impl std::fmt::Debug for SlidingWindowGp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindowGp")
            .field("window_len", &self.window.len())
            .field("window_size", &self.window_size)
            .finish()
    }
}
