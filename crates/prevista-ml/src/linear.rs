use linfa::traits::Fit;
use linfa::Dataset;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Ordinary least squares, fitted with `linfa-linear` and kept as plain
/// coefficients so it serialises with the rest of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<Self, ModelError> {
        let dataset = Dataset::new(x.to_owned(), y.to_owned());
        let fitted = linfa_linear::LinearRegression::new()
            .fit(&dataset)
            .map_err(|e| ModelError::Fit {
                algorithm: "LinearRegression",
                message: e.to_string(),
            })?;

        Ok(Self {
            coefficients: fitted.params().to_vec(),
            intercept: fitted.intercept(),
        })
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        if x.ncols() != self.coefficients.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.coefficients.len(),
                found: x.ncols(),
            });
        }
        let weights = ArrayView1::from(self.coefficients.as_slice());
        Ok(x.dot(&weights) + self.intercept)
    }
}
