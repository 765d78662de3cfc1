use faer_ext::*;
use ndarray::{Array1, ArrayView2};

use super::{Decomposition, SvdBackend, RESIDUAL_RTOL};

/// SVD computed by faer's thin decomposition.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaerSVD;

impl SvdBackend for FaerSVD {
    fn decompose(&self, x: ArrayView2<f64>) -> anyhow::Result<Decomposition> {
        let faer_mat = x.into_faer();
        let svd = faer_mat.thin_svd();
        let u = svd.u().into_ndarray().to_owned();
        let s: Array1<f64> = Array1::from_iter(svd.s_diagonal().iter().cloned());
        // faer hands back V, not its transpose
        let vt = svd.v().transpose().into_ndarray().to_owned();

        let decomposition = Decomposition::new(u, s, vt)?;
        decomposition.check_residual(x, RESIDUAL_RTOL)?;
        Ok(decomposition)
    }
}
