use std::cmp::Ordering;

use anyhow::bail;
use ndarray::{s, Array1, Array2, ArrayView2, Axis};

#[cfg(feature = "faer")]
pub mod faer;
#[cfg(feature = "lapack")]
pub mod lapack;
pub mod nalgebra;

#[cfg(feature = "faer")]
pub use self::faer::FaerSVD;
#[cfg(feature = "lapack")]
pub use self::lapack::LapackSVD;
pub use self::nalgebra::NalgebraSVD;

// Backends reject factors whose product strays further than this from the
// input, relative to its largest magnitude.
pub(crate) const RESIDUAL_RTOL: f64 = 1e-8;

/// A singular value decomposition routine.
///
/// Implementations decompose the matrix exactly as given. They must not
/// center or rescale the input.
pub trait SvdBackend: Send + Sync {
    fn decompose(&self, x: ArrayView2<f64>) -> anyhow::Result<Decomposition>;
}

/// Thin SVD factors `x = u * diag(s) * vt` with `k = min(n, p)` triplets,
/// ordered by descending singular value.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    u: Array2<f64>,
    s: Array1<f64>,
    vt: Array2<f64>,
}

impl Decomposition {
    /// Validates the factor shapes and sorts the triplets so that the
    /// singular values are descending. Ties keep their backend order.
    pub fn new(u: Array2<f64>, s: Array1<f64>, vt: Array2<f64>) -> anyhow::Result<Self> {
        let k = s.len();
        if u.ncols() != k || vt.nrows() != k {
            bail!(
                "SVD factor shapes do not agree: u is {:?}, s has {} values, vt is {:?}",
                u.dim(),
                k,
                vt.dim()
            );
        }
        if let Some(bad) = s.iter().find(|&&v| !(v >= 0.0 && v.is_finite())) {
            bail!("SVD produced an invalid singular value: {}", bad);
        }

        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| s[b].partial_cmp(&s[a]).unwrap_or(Ordering::Equal));
        if order.iter().enumerate().all(|(i, &o)| i == o) {
            return Ok(Decomposition { u, s, vt });
        }

        Ok(Decomposition {
            u: u.select(Axis(1), &order),
            s: s.select(Axis(0), &order),
            vt: vt.select(Axis(0), &order),
        })
    }

    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    pub fn s(&self) -> &Array1<f64> {
        &self.s
    }

    pub fn vt(&self) -> &Array2<f64> {
        &self.vt
    }

    /// Number of singular triplets held.
    pub fn rank(&self) -> usize {
        self.s.len()
    }

    /// Rank-`m` approximation `u[:, :m] * diag(s[:m]) * vt[:m, :]`.
    /// `m` larger than the number of triplets is clamped.
    pub fn truncated(&self, m: usize) -> Array2<f64> {
        let m = m.min(self.rank());
        let mut scaled = self.u.slice(s![.., ..m]).to_owned();
        for (mut col, &sv) in scaled.columns_mut().into_iter().zip(self.s.iter()) {
            col *= sv;
        }
        scaled.dot(&self.vt.slice(s![..m, ..]))
    }

    // Reconstruct the original matrix
    pub fn reconstruct(&self) -> Array2<f64> {
        self.truncated(self.rank())
    }

    /// Fails unless `u * diag(s) * vt` reproduces `x` to within `rtol` times
    /// the largest magnitude in `x`.
    pub fn check_residual(&self, x: ArrayView2<f64>, rtol: f64) -> anyhow::Result<()> {
        if self.u.nrows() != x.nrows() || self.vt.ncols() != x.ncols() {
            bail!(
                "SVD factors reconstruct a {}x{} matrix, input is {:?}",
                self.u.nrows(),
                self.vt.ncols(),
                x.dim()
            );
        }

        let scale = x.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        let residual = self
            .reconstruct()
            .iter()
            .zip(x.iter())
            .fold(0.0f64, |acc, (r, v)| acc.max((r - v).abs()));

        if !(residual <= rtol * scale) {
            bail!(
                "SVD factors do not reproduce the input: max residual {:e} (scale {:e})",
                residual,
                scale
            );
        }
        Ok(())
    }
}
