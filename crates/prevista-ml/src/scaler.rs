use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Per-column standardisation with population statistics.
///
/// Constant columns keep a unit scale so they map to zero instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self, ModelError> {
        if x.nrows() == 0 {
            return Err(ModelError::InsufficientRows {
                needed: 1,
                available: 0,
            });
        }

        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        for column in x.axis_iter(Axis(1)) {
            let m = column.mean().unwrap_or(0.0);
            let variance = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / column.len() as f64;
            let std = variance.sqrt();
            mean.push(m);
            scale.push(if std > f64::EPSILON * m.abs().max(1.0) { std } else { 1.0 });
        }
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ModelError> {
        if x.ncols() != self.mean.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.mean.len(),
                found: x.ncols(),
            });
        }

        let mut out = x.to_owned();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.mean[j], self.scale[j]);
            column.mapv_inplace(|v| (v - m) / s);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn standardises_each_column() {
        let x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        let scaler = StandardScaler::fit(x.view()).expect("fit");
        assert_eq!(scaler.mean, vec![3.0, 10.0]);
        assert!((scaler.scale[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(scaler.scale[1], 1.0);

        let z = scaler.transform(x.view()).expect("transform");
        assert!((z[[0, 0]] + z[[2, 0]]).abs() < 1e-12);
        assert_eq!(z.column(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_wrong_width() {
        let scaler = StandardScaler::fit(array![[1.0, 2.0]].view()).expect("fit");
        let err = scaler.transform(array![[1.0]].view()).expect_err("width");
        assert!(matches!(err, ModelError::ShapeMismatch { expected: 2, found: 1 }));
    }
}
