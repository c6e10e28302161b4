use crate::error::{AppError, Result};
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Minimum impurity decrease for a split to be worth keeping.
const MIN_GAIN: f64 = 1e-12;

/// Hyperparameters of the bagged tree ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of bagged trees
    pub n_trees: usize,

    /// Maximum tree depth
    pub max_depth: usize,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Base seed; per-tree seeds are derived from it
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 10,
            min_samples_split: 5,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A node in a decision tree.
///
/// Child indices are local to the owning tree (0 = root).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    /// Internal split node: go left if `feature <= threshold`
    Split {
        feature: usize,
        threshold: f64,
        left: u32,
        right: u32,
    },
    /// Leaf node holding the positive-class fraction of its samples
    Leaf { prob: f64 },
}

/// One CART tree trained on a bootstrap sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Positive-class probability for one encoded row.
    pub fn predict_prob(&self, row: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            match self.nodes[node] {
                Node::Leaf { prob } => return prob,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[feature] <= threshold {
                        left as usize
                    } else {
                        right as usize
                    };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Gini impurity of a node with `pos` positives out of `n` samples.
fn gini(pos: f64, n: f64) -> f64 {
    let p = pos / n;
    2.0 * p * (1.0 - p)
}

/// Single-tree construction state.
struct TreeBuilder<'a, 'p> {
    x: ArrayView2<'a, f64>,
    y: &'a [u8],
    params: &'p ForestParams,
    n_candidates: usize,
    n_root: f64,
    nodes: Vec<Node>,
    /// Raw impurity-decrease attribution per feature for this tree
    importances: Vec<f64>,
}

impl<'a, 'p> TreeBuilder<'a, 'p> {
    fn new(x: ArrayView2<'a, f64>, y: &'a [u8], params: &'p ForestParams, n_root: usize) -> Self {
        let n_features = x.ncols();
        // sqrt feature subsampling per split, matching the reference ensemble
        let n_candidates = ((n_features as f64).sqrt() as usize).max(1);

        Self {
            x,
            y,
            params,
            n_candidates,
            n_root: n_root as f64,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        }
    }

    fn leaf(&mut self, pos: usize, n: usize) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(Node::Leaf {
            prob: pos as f64 / n as f64,
        });
        id
    }

    /// Grow a subtree over `indices` (bootstrap row indices, duplicates
    /// allowed) and return its node id.
    fn grow(&mut self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> u32 {
        let n = indices.len();
        let pos = indices.iter().filter(|&&i| self.y[i] == 1).count();

        if depth >= self.params.max_depth
            || n < self.params.min_samples_split
            || pos == 0
            || pos == n
        {
            return self.leaf(pos, n);
        }

        let Some((feature, threshold, decrease)) = self.best_split(&indices, pos, rng) else {
            return self.leaf(pos, n);
        };

        self.importances[feature] += (n as f64 / self.n_root) * decrease;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[[i, feature]] <= threshold);

        let id = self.nodes.len() as u32;
        self.nodes.push(Node::Split {
            feature,
            threshold,
            left: 0,
            right: 0,
        });

        let left = self.grow(left_rows, depth + 1, rng);
        let right = self.grow(right_rows, depth + 1, rng);

        match &mut self.nodes[id as usize] {
            Node::Split {
                left: l, right: r, ..
            } => {
                *l = left;
                *r = right;
            }
            Node::Leaf { .. } => unreachable!("patched node must be a split"),
        }

        id
    }

    /// Best (feature, threshold) over a random feature subset, by Gini
    /// impurity decrease. `None` when no split improves on the parent.
    fn best_split(
        &self,
        indices: &[usize],
        pos: usize,
        rng: &mut StdRng,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len() as f64;
        let parent_gini = gini(pos as f64, n);

        let candidates =
            rand::seq::index::sample(rng, self.x.ncols(), self.n_candidates).into_vec();

        let mut best: Option<(usize, f64, f64)> = None;
        let mut column: Vec<(f64, u8)> = Vec::with_capacity(indices.len());

        for feature in candidates {
            column.clear();
            column.extend(
                indices
                    .iter()
                    .map(|&i| (self.x[[i, feature]], self.y[i])),
            );
            column.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_n = 0.0;
            let mut left_pos = 0.0;

            for s in 1..column.len() {
                left_n += 1.0;
                left_pos += f64::from(column[s - 1].1);

                // Only between distinct values is a threshold meaningful
                if column[s].0 <= column[s - 1].0 {
                    continue;
                }

                let right_n = n - left_n;
                let right_pos = pos as f64 - left_pos;

                let decrease = parent_gini
                    - (left_n / n) * gini(left_pos, left_n)
                    - (right_n / n) * gini(right_pos, right_n);

                if decrease > MIN_GAIN
                    && best.map_or(true, |(_, _, best_decrease)| decrease > best_decrease)
                {
                    let threshold = (column[s - 1].0 + column[s].0) / 2.0;
                    best = Some((feature, threshold, decrease));
                }
            }
        }

        best
    }
}

/// Bagged ensemble of CART decision trees.
///
/// Probabilities are the mean of per-tree leaf class fractions; feature
/// importances are normalized mean impurity decrease per encoded column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
    params: ForestParams,
    n_features: usize,
}

impl Forest {
    /// Fit the ensemble on an encoded `(n_rows, n_features)` matrix and
    /// binary labels.
    ///
    /// Trees are fitted in parallel; each tree derives its own rng seed from
    /// the base seed, so the result is independent of scheduling.
    pub fn fit<'a>(x: ArrayView2<'a, f64>, y: &'a [u8], params: ForestParams) -> Result<Self> {
        let n_rows = x.nrows();
        let n_features = x.ncols();

        if n_rows == 0 || n_features == 0 {
            return Err(AppError::Internal(
                "cannot fit ensemble on an empty matrix".to_string(),
            ));
        }
        if n_rows != y.len() {
            return Err(AppError::Internal(format!(
                "feature matrix has {n_rows} rows but {} labels were given",
                y.len()
            )));
        }

        let fitted: Vec<(DecisionTree, Vec<f64>)> = (0..params.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(
                    params
                        .seed
                        .wrapping_add((tree_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
                );

                let bootstrap: Vec<usize> =
                    (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();

                let mut builder = TreeBuilder::new(x, y, &params, bootstrap.len());
                builder.grow(bootstrap, 0, &mut rng);

                // Normalize per tree before averaging across the ensemble
                let total: f64 = builder.importances.iter().sum();
                if total > 0.0 {
                    for value in &mut builder.importances {
                        *value /= total;
                    }
                }

                (DecisionTree { nodes: builder.nodes }, builder.importances)
            })
            .collect();

        let mut feature_importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(params.n_trees);
        for (tree, importances) in fitted {
            for (acc, value) in feature_importances.iter_mut().zip(importances) {
                *acc += value;
            }
            trees.push(tree);
        }

        let total: f64 = feature_importances.iter().sum();
        if total > 0.0 {
            for value in &mut feature_importances {
                *value /= total;
            }
        }

        Ok(Self {
            trees,
            feature_importances,
            params,
            n_features,
        })
    }

    /// Mean positive-class probability across all trees for one row.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_prob(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Positive-class probabilities for every row of an encoded matrix.
    pub fn predict_proba_matrix(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| self.predict_proba(&row.to_vec()))
            .collect()
    }

    /// Normalized impurity-decrease attribution per encoded column.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn test_params() -> ForestParams {
        // Smaller ensemble keeps unit tests fast
        ForestParams {
            n_trees: 25,
            max_depth: 6,
            min_samples_split: 2,
            seed: 7,
        }
    }

    /// Two clouds separable on feature 0; feature 1 is noise.
    fn separable_data(n: usize) -> (Array2<f64>, Vec<u8>) {
        let mut x = Array2::zeros((n, 2));
        let mut y = Vec::with_capacity(n);

        for i in 0..n {
            let positive = i % 2 == 0;
            x[[i, 0]] = if positive { 2.0 + (i % 5) as f64 * 0.1 } else { -2.0 - (i % 5) as f64 * 0.1 };
            x[[i, 1]] = (i % 7) as f64;
            y.push(positive as u8);
        }

        (x, y)
    }

    #[test]
    fn test_learns_separable_data() {
        let (x, y) = separable_data(60);
        let forest = Forest::fit(x.view(), &y, test_params()).unwrap();

        assert!(forest.predict_proba(&[3.0, 1.0]) > 0.8);
        assert!(forest.predict_proba(&[-3.0, 1.0]) < 0.2);
    }

    #[test]
    fn test_deterministic_given_seed() {
        let (x, y) = separable_data(60);

        let first = Forest::fit(x.view(), &y, test_params()).unwrap();
        let second = Forest::fit(x.view(), &y, test_params()).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.predict_proba(&[0.4, 3.0]),
            second.predict_proba(&[0.4, 3.0])
        );
    }

    #[test]
    fn test_seed_changes_ensemble() {
        let (x, y) = separable_data(60);

        let first = Forest::fit(x.view(), &y, test_params()).unwrap();
        let second = Forest::fit(x.view(), &y, test_params().with_seed(8)).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_importances_normalized_and_ranked() {
        let (x, y) = separable_data(60);
        let forest = Forest::fit(x.view(), &y, test_params()).unwrap();

        let total: f64 = forest.feature_importances().iter().sum();
        assert!((total - 1.0).abs() < 1e-6);

        // The separating feature dominates the noise feature
        assert!(forest.feature_importances()[0] > forest.feature_importances()[1]);
    }

    #[test]
    fn test_pure_labels_give_constant_probability() {
        let (x, _) = separable_data(20);
        let y = vec![1u8; 20];

        let forest = Forest::fit(x.view(), &y, test_params()).unwrap();
        assert_eq!(forest.predict_proba(&[0.0, 0.0]), 1.0);
    }

    #[test]
    fn test_probability_bounds() {
        let (x, y) = separable_data(40);
        let forest = Forest::fit(x.view(), &y, test_params()).unwrap();

        for row in x.rows() {
            let p = forest.predict_proba(row.as_slice().unwrap());
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_rejects_mismatched_labels() {
        let (x, _) = separable_data(10);
        assert!(Forest::fit(x.view(), &[1, 0], test_params()).is_err());
    }
}
