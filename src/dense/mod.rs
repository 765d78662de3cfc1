use anyhow::bail;
use ndarray::{Array1, Array2};

/// Per-column centre and scale applied by [`Standardize::standardize_columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub means: Array1<f64>,
    /// Divisor applied to each column. Columns without spread keep `1.0`.
    pub scales: Array1<f64>,
}

pub trait Standardize {
    /// Centres every column on the mean of its finite entries and divides it
    /// by their standard deviation (`ddof` delta degrees of freedom). NaN
    /// entries are skipped and stay NaN.
    fn standardize_columns(&mut self, ddof: f64) -> anyhow::Result<ColumnStats>;

    /// Undoes [`Standardize::standardize_columns`].
    fn unstandardize_columns(&mut self, stats: &ColumnStats) -> anyhow::Result<()>;
}

impl Standardize for Array2<f64> {
    fn standardize_columns(&mut self, ddof: f64) -> anyhow::Result<ColumnStats> {
        if !(ddof >= 0.0) {
            bail!("ddof must be non-negative, got {}", ddof);
        }

        let n_cols = self.ncols();
        let mut means = Array1::zeros(n_cols);
        let mut scales = Array1::ones(n_cols);

        for (j, mut col) in self.columns_mut().into_iter().enumerate() {
            let (sum, count) = col
                .iter()
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));

            if (count as f64) <= ddof {
                bail!(
                    "Column {} has {} finite values, not enough for ddof = {}",
                    j,
                    count,
                    ddof
                );
            }

            let mean = sum / count as f64;
            let ss: f64 = col
                .iter()
                .filter(|v| v.is_finite())
                .map(|&v| (v - mean) * (v - mean))
                .sum();
            let std_dev = (ss / (count as f64 - ddof)).sqrt();
            let scale = if std_dev > f64::EPSILON { std_dev } else { 1.0 };

            col.mapv_inplace(|v| (v - mean) / scale);
            means[j] = mean;
            scales[j] = scale;
        }

        Ok(ColumnStats { means, scales })
    }

    fn unstandardize_columns(&mut self, stats: &ColumnStats) -> anyhow::Result<()> {
        if stats.means.len() != self.ncols() || stats.scales.len() != self.ncols() {
            bail!(
                "Length of column statistics ({}, {}) does not match number of columns ({})",
                stats.means.len(),
                stats.scales.len(),
                self.ncols()
            );
        }

        for ((mut col, &mean), &scale) in self
            .columns_mut()
            .into_iter()
            .zip(stats.means.iter())
            .zip(stats.scales.iter())
        {
            col.mapv_inplace(|v| v * scale + mean);
        }
        Ok(())
    }
}
