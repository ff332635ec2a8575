use std::sync::Arc;

use anyhow::bail;
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2};

use crate::utils::{frobenius_norm, infinity_norm, singular_value_shrink, soft_threshold};

// Trait for SVD implementations
pub trait SVDImplementation: Send + Sync {
    /// Thin SVD `matrix = u * diag(s) * vt` with `u` of shape m x k,
    /// `s` of length k = min(m, n) in decreasing order, and `vt` of shape k x n.
    fn compute(
        &self,
        matrix: ArrayView2<f64>,
    ) -> anyhow::Result<(Array2<f64>, Array1<f64>, Array2<f64>)>;
}

pub struct DenseSVD;

impl SVDImplementation for DenseSVD {
    fn compute(
        &self,
        matrix: ArrayView2<f64>,
    ) -> anyhow::Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
        let svd = crate::svd::dense::SVD::new(matrix)?;
        Ok(svd.into_parts())
    }
}

#[cfg(feature = "faer")]
pub struct FaerSVD;

#[cfg(feature = "faer")]
impl SVDImplementation for FaerSVD {
    fn compute(
        &self,
        matrix: ArrayView2<f64>,
    ) -> anyhow::Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
        let svd = crate::svd::faer::SVD::new(&matrix);
        Ok(svd.into_parts())
    }
}

#[cfg(feature = "lapack")]
pub struct LapackSVD;

#[cfg(feature = "lapack")]
impl SVDImplementation for LapackSVD {
    fn compute(
        &self,
        matrix: ArrayView2<f64>,
    ) -> anyhow::Result<(Array2<f64>, Array1<f64>, Array2<f64>)> {
        let svd = crate::svd::lapack::SVD::new(matrix)?;
        Ok(svd.into_parts())
    }
}

/// Per-iteration diagnostics, handed to the progress sink of
/// [`RobustPca::decompose_with_progress`]. Observational only.
#[derive(Debug, Clone, Copy)]
pub struct IterationProgress {
    pub iteration: usize,
    pub relative_error: f64,
    pub mu: f64,
}

/// Result of a principal component pursuit decomposition.
///
/// `low_rank + sparse` approximates the observation matrix. `converged`
/// distinguishes a run that met the tolerance from one that ran out of
/// iterations; the matrices are the best available estimate either way.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub low_rank: Array2<f64>,
    pub sparse: Array2<f64>,
    pub iterations: usize,
    pub relative_error: f64,
    pub converged: bool,
}

pub struct RobustPcaBuilder<S: SVDImplementation> {
    sparsity_factor: f64,
    max_iter: usize,
    mu: Option<f64>,
    mu_upper_bound: Option<f64>,
    rho: f64,
    tol: f64,
    verbose: bool,
    svd_implementation: Arc<S>,
}

impl<S: SVDImplementation> RobustPcaBuilder<S> {
    /// `sparsity_factor` weights the sparse term of the convex objective and
    /// is always caller-supplied; `1 / sqrt(max(m, n))` is the canonical
    /// choice for an m x n observation matrix.
    pub fn new(svd_implementation: S, sparsity_factor: f64) -> Self {
        RobustPcaBuilder {
            sparsity_factor,
            max_iter: 1000,
            mu: None,
            mu_upper_bound: None,
            rho: 1.5,
            tol: 1e-7,
            verbose: true,
            svd_implementation: Arc::new(svd_implementation),
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Initial penalty parameter. Defaults to `1.25 / spectral_norm(observations)`.
    pub fn mu(mut self, mu: f64) -> Self {
        self.mu = Some(mu);
        self
    }

    /// Cap on the penalty parameter. Defaults to `mu * 1e7`.
    pub fn mu_upper_bound(mut self, mu_upper_bound: f64) -> Self {
        self.mu_upper_bound = Some(mu_upper_bound);
        self
    }

    /// Multiplicative growth rate of the penalty parameter, > 1.
    pub fn rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    /// Convergence threshold on the relative Frobenius residual.
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// If true, per-iteration diagnostics are logged at info level instead
    /// of debug level. Never affects the numerics.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn build(self) -> RobustPca<S> {
        RobustPca {
            sparsity_factor: self.sparsity_factor,
            max_iter: self.max_iter,
            mu: self.mu,
            mu_upper_bound: self.mu_upper_bound,
            rho: self.rho,
            tol: self.tol,
            verbose: self.verbose,
            svd_implementation: self.svd_implementation,
        }
    }
}

/// Robust PCA solver: recovers a low-rank and a sparse component from their
/// sum via the principal component pursuit relaxation, solved with the
/// inexact augmented Lagrange multiplier method.
///
/// Each iteration shrinks the singular values of `D - E + Y/mu` (the proximal
/// step of the nuclear norm), soft-thresholds `D - A + Y/mu` elementwise (the
/// proximal step of the l1 norm), then updates the dual variable `Y` along
/// the residual `D - A - E` while growing the penalty `mu` by `rho` up to
/// `mu_upper_bound`. The loop stops when the relative Frobenius residual
/// drops below `tol` or after `max_iter` passes.
pub struct RobustPca<S: SVDImplementation> {
    sparsity_factor: f64,
    max_iter: usize,
    mu: Option<f64>,
    mu_upper_bound: Option<f64>,
    rho: f64,
    tol: f64,
    verbose: bool,
    svd_implementation: Arc<S>,
}

impl<S: SVDImplementation> RobustPca<S> {
    pub fn decompose(&self, observations: ArrayView2<f64>) -> anyhow::Result<Decomposition> {
        self.decompose_with_progress(observations, |_| {})
    }

    /// Same as [`decompose`](Self::decompose), invoking `progress` once per
    /// iteration with the iteration index, relative error, and current `mu`.
    pub fn decompose_with_progress<F>(
        &self,
        observations: ArrayView2<f64>,
        mut progress: F,
    ) -> anyhow::Result<Decomposition>
    where
        F: FnMut(&IterationProgress),
    {
        self.validate_parameters()?;

        let (m, n) = observations.dim();
        if m == 0 || n == 0 {
            bail!(
                "observation matrix must have at least one row and one column, got {}x{}",
                m,
                n
            );
        }

        let norm_fro_obs = frobenius_norm(&observations);
        if norm_fro_obs == 0.0 {
            // The all-zero matrix decomposes exactly; returning early keeps
            // the relative-error denominator nonzero.
            return Ok(Decomposition {
                low_rank: Array2::zeros((m, n)),
                sparse: Array2::zeros((m, n)),
                iterations: 0,
                relative_error: 0.0,
                converged: true,
            });
        }

        // Resolve the penalty schedule once, before the loop.
        let spectral_norm_obs = self.spectral_norm(observations)?;
        let mut mu = match self.mu {
            Some(value) => value,
            None => 1.25 / spectral_norm_obs,
        };
        let mu_upper_bound = self.mu_upper_bound.unwrap_or(mu * 1.0e7);
        if mu_upper_bound < mu {
            bail!(
                "mu_upper_bound ({}) must not be smaller than mu ({})",
                mu_upper_bound,
                mu
            );
        }

        // Y0 = D / max(||D||_2, ||D||_inf / sparsity_factor) keeps the
        // initial dual feasible.
        let dual_scale = spectral_norm_obs.max(infinity_norm(&observations) / self.sparsity_factor);
        let mut dual = observations.mapv(|value| value / dual_scale);
        let mut sparse = Array2::<f64>::zeros((m, n));

        for iteration in 1..=self.max_iter {
            // singular value thresholding of D - E + Y/mu
            let mut working = &observations - &sparse;
            working.scaled_add(1.0 / mu, &dual);
            let (u, s, vt) = self.svd_implementation.compute(working.view())?;
            let low_rank = singular_value_shrink(&u, &s, &vt, 1.0 / mu);

            // elementwise soft thresholding of D - A + Y/mu
            let mut shrink_target = &observations - &low_rank;
            shrink_target.scaled_add(1.0 / mu, &dual);
            let threshold = self.sparsity_factor / mu;
            shrink_target.par_mapv_inplace(move |value| soft_threshold(value, threshold));
            sparse = shrink_target;

            let mut residual = &observations - &low_rank;
            residual -= &sparse;
            let relative_error = frobenius_norm(&residual.view()) / norm_fro_obs;

            progress(&IterationProgress {
                iteration,
                relative_error,
                mu,
            });
            if self.verbose {
                info!("iter {:<4} | err {:<25e} | mu {:<25e}", iteration, relative_error, mu);
            } else {
                debug!("iter {:<4} | err {:<25e} | mu {:<25e}", iteration, relative_error, mu);
            }

            // Convergence wins the tie when both predicates hold at once.
            let converged = relative_error < self.tol;
            let budget_exhausted = iteration == self.max_iter;
            if converged || budget_exhausted {
                let reason = if converged {
                    "error below tolerance"
                } else {
                    "maximum iterations reached"
                };
                if self.verbose {
                    info!("finished after {} iterations: {}", iteration, reason);
                } else {
                    debug!("finished after {} iterations: {}", iteration, reason);
                }
                return Ok(Decomposition {
                    low_rank,
                    sparse,
                    iterations: iteration,
                    relative_error,
                    converged,
                });
            }

            dual.scaled_add(mu, &residual);
            mu = (mu * self.rho).min(mu_upper_bound);
        }

        // max_iter >= 1, so the loop always returns
        unreachable!("iteration loop exits via converged or budget_exhausted")
    }

    fn validate_parameters(&self) -> anyhow::Result<()> {
        if self.sparsity_factor <= 0.0 {
            bail!("sparsity_factor must be positive, got {}", self.sparsity_factor);
        }
        if self.max_iter < 1 {
            bail!("max_iter must be at least 1, got {}", self.max_iter);
        }
        if self.rho <= 1.0 {
            bail!("rho must be greater than 1, got {}", self.rho);
        }
        if self.tol <= 0.0 {
            bail!("tol must be positive, got {}", self.tol);
        }
        if let Some(mu) = self.mu {
            if mu <= 0.0 {
                bail!("mu must be positive, got {}", mu);
            }
        }
        if let Some(mu_upper_bound) = self.mu_upper_bound {
            if mu_upper_bound <= 0.0 {
                bail!("mu_upper_bound must be positive, got {}", mu_upper_bound);
            }
        }
        Ok(())
    }

    fn spectral_norm(&self, matrix: ArrayView2<f64>) -> anyhow::Result<f64> {
        let (_, singular_values, _) = self.svd_implementation.compute(matrix)?;
        Ok(singular_values.iter().fold(0.0f64, |acc, &value| acc.max(value)))
    }
}
