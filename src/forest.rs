//! Bootstrap-aggregated CART regression trees.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Unlimited when `None`.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn fit<R: AsRef<[f64]>>(
        rows: &[R],
        labels: &[f64],
        indices: Vec<usize>,
        params: &ForestParams,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(rows, labels, indices, 0, params);
        tree
    }

    fn grow<R: AsRef<[f64]>>(
        &mut self,
        rows: &[R],
        labels: &[f64],
        indices: Vec<usize>,
        depth: usize,
        params: &ForestParams,
    ) -> usize {
        let value = indices.iter().map(|&i| labels[i]).sum::<f64>() / indices.len() as f64;
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf { value });

        let depth_ok = params.max_depth.map_or(true, |max| depth < max);
        if indices.len() < params.min_samples_split.max(2) || !depth_ok {
            return slot;
        }

        let Some(split) = best_split(rows, labels, &indices, params.min_samples_leaf.max(1)) else {
            return slot;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| rows[i].as_ref()[split.feature] <= split.threshold);

        let left = self.grow(rows, labels, left_idx, depth + 1, params);
        let right = self.grow(rows, labels, right_idx, depth + 1, params);
        self.nodes[slot] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        slot
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Best variance-reducing split over all features, or `None` if no split reduces
/// the squared error.
///
/// Minimizing the children's summed squared error is the same as maximizing
/// `sum_l^2 / n_l + sum_r^2 / n_r`, which only needs running sums.
fn best_split<R: AsRef<[f64]>>(
    rows: &[R],
    labels: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = indices.len();
    let total: f64 = indices.iter().map(|&i| labels[i]).sum();
    let parent_score = total * total / n as f64;
    let n_features = rows[indices[0]].as_ref().len();

    let mut best: Option<SplitCandidate> = None;
    let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

    for feature in 0..n_features {
        column.clear();
        column.extend(indices.iter().map(|&i| (rows[i].as_ref()[feature], labels[i])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += column[k - 1].1;
            if column[k - 1].0 == column[k].0 || k < min_leaf || n - k < min_leaf {
                continue;
            }
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
            if score <= parent_score + 1e-9 {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                let (lo, hi) = (column[k - 1].0, column[k].0);
                let mid = (lo + hi) / 2.0;
                // adjacent floats can round the midpoint up to `hi`
                let threshold = if mid < hi { mid } else { lo };
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    score,
                });
            }
        }
    }

    best
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn fit<R: AsRef<[f64]>>(rows: &[R], labels: &[f64], params: &ForestParams) -> Result<Self> {
        if rows.is_empty() {
            return Err(PredictorError::Forest("no training rows".into()));
        }
        if rows.len() != labels.len() {
            return Err(PredictorError::Forest(format!(
                "row/label length mismatch: {} rows, {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(PredictorError::Forest("n_trees must be at least 1".into()));
        }
        let n_features = rows[0].as_ref().len();
        if n_features == 0 || rows.iter().any(|r| r.as_ref().len() != n_features) {
            return Err(PredictorError::Forest("rows must share a non-zero width".into()));
        }
        if labels.iter().any(|y| !y.is_finite()) {
            return Err(PredictorError::Forest("labels must be finite".into()));
        }

        let n = rows.len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::fit(rows, labels, sample, params)
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "fitted forest: trees={} rows={} features={} max_depth={}",
            trees.len(),
            n,
            n_features,
            trees.iter().map(RegressionTree::depth).max().unwrap_or(0)
        );

        Ok(Self { trees, n_features })
    }

    /// Mean of the per-tree predictions.
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(PredictorError::Forest(format!(
                "feature length mismatch: got {}, expected {}",
                row.len(),
                self.n_features
            )));
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<[f64; 2]>, Vec<f64>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let x = i as f64;
            rows.push([x, (i % 3) as f64]);
            labels.push(if x < 20.0 { 10.0 } else { 30.0 });
        }
        (rows, labels)
    }

    #[test]
    fn test_constant_labels_predict_constant() {
        let rows = vec![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let labels = vec![45.0, 45.0, 45.0];
        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default()).unwrap();
        assert_eq!(forest.predict(&[9.0, 9.0]).unwrap(), 45.0);
        assert_eq!(forest.n_trees(), 100);
    }

    #[test]
    fn test_learns_step_function() {
        let (rows, labels) = step_data();
        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default()).unwrap();
        let low = forest.predict(&[5.0, 0.0]).unwrap();
        let high = forest.predict(&[35.0, 0.0]).unwrap();
        println!("✓ step forest: low={:.2} high={:.2}", low, high);
        assert!((low - 10.0).abs() < 1.0, "low side {}", low);
        assert!((high - 30.0).abs() < 1.0, "high side {}", high);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let (rows, labels) = step_data();
        let params = ForestParams { n_trees: 10, seed: 7, ..Default::default() };
        let a = RandomForest::fit(&rows, &labels, &params).unwrap();
        let b = RandomForest::fit(&rows, &labels, &params).unwrap();
        for x in [0.0, 19.5, 20.0, 39.0] {
            assert_eq!(a.predict(&[x, 1.0]).unwrap(), b.predict(&[x, 1.0]).unwrap());
        }
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let (rows, labels) = step_data();
        let params = ForestParams { n_trees: 3, max_depth: Some(0), ..Default::default() };
        let forest = RandomForest::fit(&rows, &labels, &params).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() == 0));
    }

    #[test]
    fn test_rejects_bad_input() {
        let empty: Vec<[f64; 2]> = Vec::new();
        assert!(RandomForest::fit(&empty, &[], &ForestParams::default()).is_err());
        assert!(RandomForest::fit(&[[1.0]], &[1.0, 2.0], &ForestParams::default()).is_err());
        let params = ForestParams { n_trees: 0, ..Default::default() };
        assert!(RandomForest::fit(&[[1.0]], &[1.0], &params).is_err());

        let forest = RandomForest::fit(&[[1.0, 2.0]], &[3.0], &ForestParams::default()).unwrap();
        assert!(matches!(forest.predict(&[1.0]), Err(PredictorError::Forest(_))));
    }
}
