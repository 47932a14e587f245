//! CART regression tree with squared-error splits.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl TreeParams {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct Pending {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl DecisionTree {
    /// Fit on every row of `x`.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        params: TreeParams,
    ) -> Result<Self, ModelError> {
        let rows: Vec<usize> = (0..x.nrows()).collect();
        Self::fit_rows(x, y, rows, params)
    }

    /// Fit on the given row indices; repeats are allowed (bootstrap samples).
    pub fn fit_rows(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        rows: Vec<usize>,
        params: TreeParams,
    ) -> Result<Self, ModelError> {
        if x.nrows() != y.len() {
            return Err(ModelError::ShapeMismatch {
                expected: x.nrows(),
                found: y.len(),
            });
        }
        if rows.is_empty() {
            return Err(ModelError::InsufficientRows {
                needed: 1,
                available: 0,
            });
        }

        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut stack = vec![Pending {
            node: 0,
            rows,
            depth: 0,
        }];

        while let Some(Pending { node, rows, depth }) = stack.pop() {
            let n = rows.len() as f64;
            let sum: f64 = rows.iter().map(|&r| y[r]).sum();
            let mean = sum / n;
            nodes[node] = Node::Leaf { value: mean };

            let depth_left = params.max_depth.map_or(true, |max| depth < max);
            if !depth_left || rows.len() < params.min_samples_split.max(2) {
                continue;
            }
            let sse: f64 = rows.iter().map(|&r| (y[r] - mean).powi(2)).sum();
            if sse <= f64::EPSILON * n * mean.abs().max(1.0) {
                continue;
            }

            let Some(best) = best_split(x, y, &rows, sum, params.min_samples_leaf.max(1)) else {
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&r| x[[r, best.feature]] <= best.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[node] = Node::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
            };
            stack.push(Pending {
                node: right,
                rows: right_rows,
                depth: depth + 1,
            });
            stack.push(Pending {
                node: left,
                rows: left_rows,
                depth: depth + 1,
            });
        }

        Ok(Self { nodes })
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Split maximising `sum_l^2 / n_l + sum_r^2 / n_r`, which minimises the
/// children's squared error. Ties keep the lowest feature index and threshold.
fn best_split(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    rows: &[usize],
    total: f64,
    min_leaf: usize,
) -> Option<BestSplit> {
    let n = rows.len();
    let parent_score = total * total / n as f64;
    let mut best: Option<BestSplit> = None;
    let mut best_score = parent_score + 1e-10 * parent_score.abs().max(1.0);

    let mut order = rows.to_vec();
    for feature in 0..x.ncols() {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            left_sum += y[order[k]];
            let current = x[[order[k], feature]];
            let next = x[[order[k + 1], feature]];
            if next <= current {
                continue;
            }

            let n_left = k + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            if score > best_score {
                best_score = score;
                best = Some(BestSplit {
                    feature,
                    threshold: current + (next - current) / 2.0,
                    score,
                });
            }
        }
    }

    best.filter(|b| b.score.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn separates_a_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        let tree = DecisionTree::fit(x.view(), y.view(), TreeParams::default()).expect("fit");

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(array![2.5].view()), 5.0);
        assert_eq!(tree.predict_row(array![6.5].view()), 5.0);
        assert_eq!(tree.predict_row(array![6.6].view()), 20.0);
    }

    #[test]
    fn unbounded_tree_memorises_distinct_rows() {
        let x = array![[0.0, 3.0], [1.0, 1.0], [2.0, 4.0], [3.0, 1.5], [4.0, 9.0]];
        let y = array![3.0, -1.0, 4.0, 1.0, 5.0];
        let tree = DecisionTree::fit(x.view(), y.view(), TreeParams::default()).expect("fit");
        assert_eq!(tree.predict(x.view()), y);
    }

    #[test]
    fn max_depth_limits_growth() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]];
        let y = array![0.0, 1.0, 4.0, 9.0, 16.0, 25.0, 36.0, 49.0];
        let tree = DecisionTree::fit(x.view(), y.view(), TreeParams::with_max_depth(2)).expect("fit");
        assert!(tree.depth() <= 2);
        assert!(tree.node_count() <= 7);
    }

    #[test]
    fn constant_target_is_a_single_leaf() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![7.0, 7.0, 7.0];
        let tree = DecisionTree::fit(x.view(), y.view(), TreeParams::default()).expect("fit");
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_row(array![100.0].view()), 7.0);
    }

    #[test]
    fn bootstrap_rows_may_repeat() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![1.0, 2.0, 3.0];
        let tree =
            DecisionTree::fit_rows(x.view(), y.view(), vec![2, 2, 2], TreeParams::default()).expect("fit");
        assert_eq!(tree.predict_row(array![0.0].view()), 3.0);
    }
}
