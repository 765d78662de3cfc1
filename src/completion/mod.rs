//! # Low-rank matrix completion
//!
//! Iterative hard imputation: missing cells start at their column means, then
//! each pass replaces them with the matching cells of a rank-`M` SVD
//! approximation of the current estimate. Observed cells are never touched.
//!
//! The loop stops once the relative improvement in the fit over observed
//! cells,
//!
//! ```text
//! relative_error = (mss_previous - mss) / mss0
//! ```
//!
//! drops to the tolerance, where `mss` is the mean squared difference between
//! the observed values and the rank-`M` approximation and `mss0` the mean
//! squared observed value. Runs are capped at `max_iterations` passes.
//!
//! ## Example
//!
//! ```
//! use ndarray::array;
//! use single_impute::complete;
//!
//! let x = array![
//!     [1.0, 2.0, f64::NAN],
//!     [2.0, 4.1, 6.0],
//!     [3.0, f64::NAN, 9.2],
//!     [4.0, 8.0, 11.9],
//! ];
//! let completion = complete(x.view(), 1, 1e-7, 1000).unwrap();
//! assert!(completion.completed().iter().all(|v| v.is_finite()));
//! assert_eq!(completion.completed()[[1, 1]], 4.1);
//! ```

use log::{debug, info, warn};
use ndarray::{Array2, ArrayView2};

use crate::error::{CompletionError, Result};
use crate::mask::MissingMask;
use crate::svd::{NalgebraSVD, SvdBackend};

pub const DEFAULT_TOLERANCE: f64 = 1e-7;
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

// Imputed cells moving less than this (relative to the largest magnitude in
// the estimate) count as stationary.
const FIXED_POINT_RTOL: f64 = 1e-10;

/// One pass of the completion loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    /// 1-based pass index.
    pub iteration: usize,
    /// Mean squared error of the rank-`M` approximation on observed cells.
    pub mss: f64,
    /// Improvement in `mss` over the previous pass, scaled by `mss0`.
    pub relative_error: f64,
}

/// Why the completion loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Relative error fell into `[0, tolerance]`.
    Converged,
    /// Relative error went negative: the fit got worse on the last pass.
    ErrorIncreased,
    /// The imputed cells did not move, so further passes cannot change the
    /// estimate. Happens with full-rank approximations and with inputs that
    /// have nothing to impute.
    FixedPoint,
    /// The iteration cap was hit. Only seen on the partial result carried by
    /// [`CompletionError::Convergence`].
    IterationLimit,
}

/// Completed matrix plus the per-pass trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    completed: Array2<f64>,
    trace: Vec<IterationRecord>,
    termination: Termination,
}

impl Completion {
    pub fn completed(&self) -> &Array2<f64> {
        &self.completed
    }

    pub fn trace(&self) -> &[IterationRecord] {
        &self.trace
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn iterations(&self) -> usize {
        self.trace.len()
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.trace.last()
    }

    pub fn into_parts(self) -> (Array2<f64>, Vec<IterationRecord>) {
        (self.completed, self.trace)
    }
}

pub struct LowRankImputerBuilder<S: SvdBackend = NalgebraSVD> {
    rank: usize,
    tolerance: f64,
    max_iterations: usize,
    svd_backend: S,
}

impl Default for LowRankImputerBuilder<NalgebraSVD> {
    fn default() -> Self {
        LowRankImputerBuilder {
            rank: 1,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            svd_backend: NalgebraSVD::default(),
        }
    }
}

impl LowRankImputerBuilder<NalgebraSVD> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SvdBackend> LowRankImputerBuilder<S> {
    pub fn rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Swaps the SVD routine used for the low-rank step.
    pub fn svd_backend<T: SvdBackend>(self, svd_backend: T) -> LowRankImputerBuilder<T> {
        LowRankImputerBuilder {
            rank: self.rank,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            svd_backend,
        }
    }

    pub fn build(self) -> LowRankImputer<S> {
        LowRankImputer {
            rank: self.rank,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            svd_backend: self.svd_backend,
        }
    }
}

/// Rank-restricted iterative imputer.
///
/// Parameters are checked when a matrix is completed, since the valid rank
/// range depends on its shape. The imputer holds no per-run state and can be
/// shared between threads.
pub struct LowRankImputer<S: SvdBackend = NalgebraSVD> {
    rank: usize,
    tolerance: f64,
    max_iterations: usize,
    svd_backend: S,
}

impl<S: SvdBackend> LowRankImputer<S> {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Completes a matrix whose missing cells are NaN.
    pub fn complete(&self, observed: ArrayView2<f64>) -> Result<Completion> {
        let mask = MissingMask::from_nan(observed);
        self.run(observed, &mask)
    }

    /// Completes `values` with missing cells given by `mask`. Values under
    /// the mask are ignored and may hold anything, NaN included.
    pub fn complete_masked(
        &self,
        values: ArrayView2<f64>,
        mask: &MissingMask,
    ) -> Result<Completion> {
        if mask.shape() != values.dim() {
            return Err(CompletionError::invalid_parameter(format!(
                "mask shape {:?} does not match matrix shape {:?}",
                mask.shape(),
                values.dim()
            )));
        }
        self.run(values, mask)
    }

    fn validate(&self, observed: ArrayView2<f64>, mask: &MissingMask) -> Result<()> {
        let (n, p) = observed.dim();
        if n == 0 || p == 0 {
            return Err(CompletionError::invalid_parameter(format!(
                "matrix must have at least one row and one column, got {}x{}",
                n, p
            )));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(CompletionError::invalid_parameter(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(CompletionError::invalid_parameter(
                "max_iterations must be at least 1",
            ));
        }

        let max_rank = n.min(p);
        if self.rank == 0 || self.rank > max_rank {
            return Err(CompletionError::InvalidRank {
                rank: self.rank,
                max_rank,
            });
        }

        if let Some(((i, j), v)) = observed
            .indexed_iter()
            .find(|((i, j), v)| !mask.is_missing(*i, *j) && !v.is_finite())
        {
            return Err(CompletionError::invalid_parameter(format!(
                "observed value at ({}, {}) is not finite: {}",
                i, j, v
            )));
        }

        if let Some(column) = (0..p).find(|&j| mask.observed_in_column(j) == 0) {
            return Err(CompletionError::InsufficientData { column });
        }

        Ok(())
    }

    fn run(&self, observed: ArrayView2<f64>, mask: &MissingMask) -> Result<Completion> {
        self.validate(observed, mask)?;

        let means = mask.column_means(observed)?;
        let mut estimate = observed.to_owned();
        mask.fill_with_column_means(&mut estimate, &means);

        let mss0 = mask.observed_mean_square(observed);
        let mut mss_old = mask.observed_mean_square(estimate.view());
        let scale = if mss0 > 0.0 { mss0 } else { 1.0 };

        debug!(
            "Completing {}x{} matrix with {} missing cells at rank {} (mss0 = {:e})",
            observed.nrows(),
            observed.ncols(),
            mask.n_missing(),
            self.rank,
            mss0
        );

        let mut trace = Vec::new();
        let mut relative_error = f64::INFINITY;

        for iteration in 1..=self.max_iterations {
            let approx = self
                .svd_backend
                .decompose(estimate.view())
                .map_err(|e| CompletionError::decomposition(format!("{:#}", e)))?
                .truncated(self.rank);

            let max_change = mask.fill_missing(&mut estimate, approx.view());
            let mss = mask.observed_mean_squared_error(observed, approx.view());
            relative_error = (mss_old - mss) / scale;
            mss_old = mss;

            if !relative_error.is_finite() {
                return Err(CompletionError::decomposition(format!(
                    "non-finite error metric at iteration {} (mss = {})",
                    iteration, mss
                )));
            }

            trace.push(IterationRecord {
                iteration,
                mss,
                relative_error,
            });
            debug!(
                "Iteration {}: mss = {:e}, relative error = {:e}",
                iteration, mss, relative_error
            );

            let magnitude = estimate.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
            let termination = if (0.0..=self.tolerance).contains(&relative_error) {
                Some(Termination::Converged)
            } else if relative_error < 0.0 {
                warn!(
                    "Fit worsened at iteration {} (relative error {:e}); stopping",
                    iteration, relative_error
                );
                Some(Termination::ErrorIncreased)
            } else if max_change <= FIXED_POINT_RTOL * magnitude {
                Some(Termination::FixedPoint)
            } else {
                None
            };

            if let Some(termination) = termination {
                info!(
                    "Completion stopped after {} iterations ({:?}, mss = {:e})",
                    iteration, termination, mss
                );
                return Ok(Completion {
                    completed: estimate,
                    trace,
                    termination,
                });
            }
        }

        warn!(
            "Completion hit the iteration cap of {} (last relative error {:e})",
            self.max_iterations, relative_error
        );
        Err(CompletionError::Convergence {
            iterations: self.max_iterations,
            last_relative_error: relative_error,
            partial: Box::new(Completion {
                completed: estimate,
                trace,
                termination: Termination::IterationLimit,
            }),
        })
    }
}

/// Completes a NaN-marked matrix with the default nalgebra SVD backend.
pub fn complete(
    observed: ArrayView2<f64>,
    rank: usize,
    tolerance: f64,
    max_iterations: usize,
) -> Result<Completion> {
    LowRankImputerBuilder::new()
        .rank(rank)
        .tolerance(tolerance)
        .max_iterations(max_iterations)
        .build()
        .complete(observed)
}
