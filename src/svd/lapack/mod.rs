use anyhow::anyhow;
use ndarray::{s, Array1, ArrayView2};
use nshare::{IntoNalgebra, IntoNdarray2};

use super::{Decomposition, SvdBackend, RESIDUAL_RTOL};

/// SVD through LAPACK's `gesdd` via nalgebra-lapack.
#[derive(Debug, Clone, Copy, Default)]
pub struct LapackSVD;

impl SvdBackend for LapackSVD {
    fn decompose(&self, x: ArrayView2<f64>) -> anyhow::Result<Decomposition> {
        let matrix = x.as_standard_layout().into_owned().into_nalgebra();

        let svd = nalgebra_lapack::SVD::new(matrix)
            .ok_or_else(|| anyhow!("LAPACK SVD did not converge"))?;

        // LAPACK returns square u and vt; keep the thin part.
        let k = svd.singular_values.len();
        let u_full = svd.u.into_ndarray2().into_owned();
        let vt_full = svd.vt.into_ndarray2().into_owned();
        let s = Array1::from(svd.singular_values.as_slice().to_vec());

        let decomposition = Decomposition::new(
            u_full.slice(s![.., ..k]).to_owned(),
            s,
            vt_full.slice(s![..k, ..]).to_owned(),
        )?;
        decomposition.check_residual(x, RESIDUAL_RTOL)?;
        Ok(decomposition)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_simple_svd() {
        let a = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let svd = LapackSVD.decompose(a.view()).unwrap();

        assert_eq!(svd.u().shape(), &[3, 2]);
        assert_eq!(svd.vt().shape(), &[2, 2]);
        assert_abs_diff_eq!(svd.reconstruct(), a, epsilon = 1e-10);
    }
}
