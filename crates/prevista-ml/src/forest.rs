use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::tree::{DecisionTree, TreeParams};
use crate::ModelError;

pub const DEFAULT_TREES: usize = 100;

/// Bagged regression trees averaged at prediction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Grow `n_trees` unpruned trees on bootstrap samples.
    ///
    /// Per-tree seeds are drawn up front from `seed`, so the forest is the
    /// same whatever order rayon schedules the trees in.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        n_trees: usize,
        seed: u64,
    ) -> Result<Self, ModelError> {
        let n = x.nrows();
        if n == 0 || n_trees == 0 {
            return Err(ModelError::InsufficientRows {
                needed: 1,
                available: n,
            });
        }

        let mut master = StdRng::seed_from_u64(seed);
        let seeds: Vec<u64> = (0..n_trees).map(|_| master.gen()).collect();

        let trees = seeds
            .par_iter()
            .map(|&tree_seed| {
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit_rows(x, y, sample, TreeParams::default())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { trees })
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let mut total: Array1<f64> = Array1::zeros(x.nrows());
        for tree in &self.trees {
            total += &tree.predict(x);
        }
        total / self.trees.len() as f64
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
