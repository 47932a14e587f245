use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::tree::{DecisionTree, TreeParams};
use crate::ModelError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
        }
    }
}

/// Least-squares gradient boosting: each shallow tree fits the residuals of
/// the ensemble so far, starting from the target mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoosting {
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        params: BoostingParams,
    ) -> Result<Self, ModelError> {
        let init = y.mean().ok_or(ModelError::InsufficientRows {
            needed: 1,
            available: 0,
        })?;

        let tree_params = TreeParams::with_max_depth(params.max_depth);
        let mut fitted = Array1::from_elem(y.len(), init);
        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let residual = &y - &fitted;
            let tree = DecisionTree::fit(x, residual.view(), tree_params)?;
            fitted.scaled_add(params.learning_rate, &tree.predict(x));
            trees.push(tree);
        }

        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let mut out = Array1::from_elem(x.nrows(), self.init);
        for tree in &self.trees {
            out.scaled_add(self.learning_rate, &tree.predict(x));
        }
        out
    }
}
