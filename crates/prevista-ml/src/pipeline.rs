use std::fmt::{Display, Formatter};

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::boosting::{BoostingParams, GradientBoosting};
use crate::features::FeatureTable;
use crate::forest::{RandomForest, DEFAULT_TREES};
use crate::linear::LinearModel;
use crate::scaler::StandardScaler;
use crate::tree::{DecisionTree, TreeParams};
use crate::ModelError;

/// Regressor families, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    LinearRegression,
    DecisionTree,
    RandomForest,
    GradientBoosting,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::LinearRegression,
        Algorithm::DecisionTree,
        Algorithm::RandomForest,
        Algorithm::GradientBoosting,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::LinearRegression => "LinearRegression",
            Self::DecisionTree => "DecisionTree",
            Self::RandomForest => "RandomForest",
            Self::GradientBoosting => "GradientBoosting",
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearModel),
    Tree(DecisionTree),
    Forest(RandomForest),
    Boosting(GradientBoosting),
}

impl Regressor {
    pub fn fit(
        algorithm: Algorithm,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        seed: u64,
    ) -> Result<Self, ModelError> {
        Ok(match algorithm {
            Algorithm::LinearRegression => Self::Linear(LinearModel::fit(x, y)?),
            Algorithm::DecisionTree => Self::Tree(DecisionTree::fit(x, y, TreeParams::default())?),
            Algorithm::RandomForest => Self::Forest(RandomForest::fit(x, y, DEFAULT_TREES, seed)?),
            Algorithm::GradientBoosting => {
                Self::Boosting(GradientBoosting::fit(x, y, BoostingParams::default())?)
            }
        })
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        match self {
            Self::Linear(model) => model.predict(x),
            Self::Tree(model) => Ok(model.predict(x)),
            Self::Forest(model) => Ok(model.predict(x)),
            Self::Boosting(model) => Ok(model.predict(x)),
        }
    }
}

/// Scaler plus regressor, bound to the feature columns it was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPipeline {
    pub algorithm: Algorithm,
    pub n_lags: usize,
    /// Column names in the order the scaler saw them.
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub regressor: Regressor,
}

impl ForecastPipeline {
    pub fn fit(
        algorithm: Algorithm,
        train: &FeatureTable,
        n_lags: usize,
        seed: u64,
    ) -> Result<Self, ModelError> {
        let target = train.target()?;
        let scaler = StandardScaler::fit(train.features.view())?;
        let scaled = scaler.transform(train.features.view())?;
        let regressor = Regressor::fit(algorithm, scaled.view(), target.view(), seed)?;

        Ok(Self {
            algorithm,
            n_lags,
            feature_names: train.columns.clone(),
            scaler,
            regressor,
        })
    }

    /// Predict every row of `table`, picking columns by name.
    pub fn predict(&self, table: &FeatureTable) -> Result<Array1<f64>, ModelError> {
        let x = table.select(&self.feature_names)?;
        let scaled = self.scaler.transform(x.view())?;
        self.regressor.predict(scaled.view())
    }

    /// Prediction for the most recent row of `table`.
    pub fn predict_latest(&self, table: &FeatureTable) -> Result<f64, ModelError> {
        if table.is_empty() {
            return Err(ModelError::InsufficientRows {
                needed: 1,
                available: 0,
            });
        }
        let latest = table.slice_rows(table.len() - 1..table.len());
        let predictions = self.predict(&latest)?;
        predictions.first().copied().ok_or(ModelError::ShapeMismatch {
            expected: 1,
            found: 0,
        })
    }
}
