// Z-score standardization fitted on the training matrix.
//
// Raw features live on very different scales (character counts in the
// hundreds, ratios in [0, 1]); EM with full covariances behaves far better on
// standardized columns. Zero-variance columns keep unit scale so they map to
// a constant 0 instead of dividing by zero.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit column means and (population) standard deviations.
    ///
    /// `x` must have at least one row.
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let mut scale = Array1::<f64>::zeros(x.ncols());
        for (j, col) in x.axis_iter(Axis(1)).enumerate() {
            let var = col.iter().map(|v| (v - mean[j]).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            scale[j] = if sd > f64::EPSILON { sd } else { 1.0 };
        }
        Self { mean, scale }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        (&row - &self.mean) / &self.scale
    }

    /// Map a standardized row back to raw feature space.
    pub fn inverse_row(&self, row: ArrayView1<f64>) -> Array1<f64> {
        &row * &self.scale + &self.mean
    }
}
