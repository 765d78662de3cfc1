//! Helpers for judging an imputation against known values: hide a few
//! entries, complete, then compare what came back with what was hidden.

use anyhow::{anyhow, bail};
use ndarray::{Array2, ArrayView2};
use rand::distr::{Distribution, Uniform};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::mask::MissingMask;

/// Hides one entry in each of `n_omit` distinct rows, chosen uniformly, with
/// the column drawn uniformly per row. Hidden cells are set to NaN.
///
/// The same seed always hides the same cells.
pub fn mask_random_entries(
    x: ArrayView2<f64>,
    n_omit: usize,
    seed: u64,
) -> anyhow::Result<(Array2<f64>, MissingMask)> {
    let (n_rows, n_cols) = x.dim();
    if n_omit > n_rows {
        bail!(
            "Cannot hide entries in {} distinct rows of a matrix with {} rows",
            n_omit,
            n_rows
        );
    }
    if n_cols == 0 {
        bail!("Cannot hide entries in a matrix without columns");
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rows = rand::seq::index::sample(&mut rng, n_rows, n_omit).into_vec();
    let col_dist =
        Uniform::try_from(0..n_cols).map_err(|e| anyhow!("Invalid column range: {}", e))?;

    let mut masked = x.to_owned();
    let mut mask = Array2::from_elem((n_rows, n_cols), false);
    for row in rows {
        let col = col_dist.sample(&mut rng);
        masked[[row, col]] = f64::NAN;
        mask[[row, col]] = true;
    }

    let mask = MissingMask::from_array(mask, (n_rows, n_cols))?;
    Ok((masked, mask))
}

/// Pearson correlation between `truth` and `completed` over the missing
/// cells of `mask`. Returns 0 when either side has no spread.
pub fn imputation_correlation(
    truth: ArrayView2<f64>,
    completed: ArrayView2<f64>,
    mask: &MissingMask,
) -> anyhow::Result<f64> {
    let (a, b) = masked_pairs(truth, completed, mask)?;
    if a.len() < 2 {
        bail!(
            "Correlation needs at least two missing cells, got {}",
            a.len()
        );
    }

    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denominator = (var_a * var_b).sqrt();
    if denominator > f64::EPSILON {
        Ok(cov / denominator)
    } else {
        Ok(0.0)
    }
}

/// Root mean squared error between `truth` and `completed` over the missing
/// cells of `mask`.
pub fn imputation_rmse(
    truth: ArrayView2<f64>,
    completed: ArrayView2<f64>,
    mask: &MissingMask,
) -> anyhow::Result<f64> {
    let (a, b) = masked_pairs(truth, completed, mask)?;
    if a.is_empty() {
        bail!("The mask has no missing cells to score");
    }
    let sse: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    Ok((sse / a.len() as f64).sqrt())
}

fn masked_pairs(
    truth: ArrayView2<f64>,
    completed: ArrayView2<f64>,
    mask: &MissingMask,
) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    if truth.dim() != completed.dim() || truth.dim() != mask.shape() {
        bail!(
            "Shape mismatch: truth {:?}, completed {:?}, mask {:?}",
            truth.dim(),
            completed.dim(),
            mask.shape()
        );
    }
    Ok(mask
        .missing_positions()
        .map(|(i, j)| (truth[[i, j]], completed[[i, j]]))
        .unzip())
}
