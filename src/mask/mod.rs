use ndarray::{Array1, Array2, ArrayView2};

use crate::error::{CompletionError, Result};

/// Boolean mask of unknown entries, `true` where a value is missing.
///
/// Built once per run, either from NaN sentinels or from an explicit mask,
/// and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingMask {
    mask: Array2<bool>,
    n_missing: usize,
}

impl MissingMask {
    /// Marks every NaN in `x` as missing.
    pub fn from_nan(x: ArrayView2<f64>) -> Self {
        Self::from_mask(x.mapv(f64::is_nan))
    }

    /// Wraps an explicit mask, which must have the given shape.
    pub fn from_array(mask: Array2<bool>, shape: (usize, usize)) -> Result<Self> {
        if mask.dim() != shape {
            return Err(CompletionError::invalid_parameter(format!(
                "mask shape {:?} does not match matrix shape {:?}",
                mask.dim(),
                shape
            )));
        }
        Ok(Self::from_mask(mask))
    }

    fn from_mask(mask: Array2<bool>) -> Self {
        let n_missing = mask.iter().filter(|&&m| m).count();
        MissingMask { mask, n_missing }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    pub fn as_array(&self) -> ArrayView2<'_, bool> {
        self.mask.view()
    }

    pub fn n_missing(&self) -> usize {
        self.n_missing
    }

    pub fn n_observed(&self) -> usize {
        self.mask.len() - self.n_missing
    }

    pub fn has_missing(&self) -> bool {
        self.n_missing > 0
    }

    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.mask[[row, col]]
    }

    /// Missing `(row, column)` positions in row-major order.
    pub fn missing_positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.mask
            .indexed_iter()
            .filter(|(_, &missing)| missing)
            .map(|(idx, _)| idx)
    }

    pub fn observed_in_column(&self, col: usize) -> usize {
        self.mask.column(col).iter().filter(|&&m| !m).count()
    }

    /// Mean of each column over its observed entries.
    pub fn column_means(&self, values: ArrayView2<f64>) -> Result<Array1<f64>> {
        self.check_shape(values)?;

        let mut means = Array1::zeros(values.ncols());
        for (j, (mask_col, value_col)) in self
            .mask
            .columns()
            .into_iter()
            .zip(values.columns())
            .enumerate()
        {
            let (sum, count) = mask_col
                .iter()
                .zip(value_col.iter())
                .filter(|(&missing, _)| !missing)
                .fold((0.0, 0usize), |(sum, count), (_, &v)| (sum + v, count + 1));

            if count == 0 {
                return Err(CompletionError::InsufficientData { column: j });
            }
            means[j] = sum / count as f64;
        }
        Ok(means)
    }

    /// Overwrites every missing cell of `values` with its column's entry in
    /// `means`.
    pub fn fill_with_column_means(&self, values: &mut Array2<f64>, means: &Array1<f64>) {
        for ((_, j), v) in values
            .indexed_iter_mut()
            .filter(|((i, j), _)| self.mask[[*i, *j]])
        {
            *v = means[j];
        }
    }

    /// Copies `source` into the missing cells of `values`, leaving observed
    /// cells untouched. Returns the largest absolute change made.
    pub fn fill_missing(&self, values: &mut Array2<f64>, source: ArrayView2<f64>) -> f64 {
        let mut max_change = 0.0f64;
        for ((v, &s), &missing) in values.iter_mut().zip(source.iter()).zip(self.mask.iter()) {
            if missing {
                max_change = max_change.max((s - *v).abs());
                *v = s;
            }
        }
        max_change
    }

    /// Mean of `values²` over observed positions.
    pub fn observed_mean_square(&self, values: ArrayView2<f64>) -> f64 {
        self.observed_mean(values.iter().map(|v| v * v))
    }

    /// Mean of `(a - b)²` over observed positions.
    pub fn observed_mean_squared_error(&self, a: ArrayView2<f64>, b: ArrayView2<f64>) -> f64 {
        self.observed_mean(a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)))
    }

    fn observed_mean(&self, squares: impl Iterator<Item = f64>) -> f64 {
        let n_observed = self.n_observed();
        if n_observed == 0 {
            return 0.0;
        }
        let total: f64 = squares
            .zip(self.mask.iter())
            .filter(|(_, &missing)| !missing)
            .map(|(sq, _)| sq)
            .sum();
        total / n_observed as f64
    }

    fn check_shape(&self, values: ArrayView2<f64>) -> Result<()> {
        if values.dim() != self.shape() {
            return Err(CompletionError::invalid_parameter(format!(
                "matrix shape {:?} does not match mask shape {:?}",
                values.dim(),
                self.shape()
            )));
        }
        Ok(())
    }
}
