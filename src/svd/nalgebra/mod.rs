use anyhow::anyhow;
use nalgebra::SVD;
use ndarray::{Array1, ArrayView2};
use nshare::{IntoNalgebra, IntoNdarray2};

use super::{Decomposition, SvdBackend, RESIDUAL_RTOL};

/// Pure-Rust SVD backed by nalgebra's bidiagonal QR iteration.
///
/// The defaults match `nalgebra::SVD::new`. Every decomposition is checked
/// against the input before it is returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NalgebraSVD {
    eps: f64,
    max_iterations: usize,
}

impl NalgebraSVD {
    /// `eps` is the off-diagonal convergence threshold handed to nalgebra.
    /// Values tighter than nalgebra's own `5 * f64::EPSILON` can stop the QR
    /// sweeps on a wrong bidiagonal for rank-deficient input.
    /// `max_iterations` bounds the implicit-shift sweeps; `0` lets them run
    /// until the bidiagonal converges.
    pub fn new(eps: f64, max_iterations: usize) -> Self {
        NalgebraSVD {
            eps,
            max_iterations,
        }
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
}

impl Default for NalgebraSVD {
    fn default() -> Self {
        Self::new(5.0 * f64::EPSILON, 0)
    }
}

impl SvdBackend for NalgebraSVD {
    fn decompose(&self, x: ArrayView2<f64>) -> anyhow::Result<Decomposition> {
        let matrix = x.as_standard_layout().into_owned().into_nalgebra();

        let svd = SVD::try_new(matrix, true, true, self.eps, self.max_iterations).ok_or_else(
            || {
                anyhow!(
                    "nalgebra SVD did not converge within {} iterations",
                    self.max_iterations
                )
            },
        )?;

        let u = svd
            .u
            .ok_or_else(|| anyhow!("nalgebra SVD returned no left singular vectors"))?;
        let vt = svd
            .v_t
            .ok_or_else(|| anyhow!("nalgebra SVD returned no right singular vectors"))?;
        let s = Array1::from(svd.singular_values.as_slice().to_vec());

        let decomposition = Decomposition::new(
            u.into_ndarray2().into_owned(),
            s,
            vt.into_ndarray2().into_owned(),
        )?;
        decomposition.check_residual(x, RESIDUAL_RTOL)?;
        Ok(decomposition)
    }
}
