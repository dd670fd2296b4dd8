use ndarray::{Array1, Axis};
use ndarray_rand::{RandomExt, SamplingStrategy};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::{check_n_features, check_training_data, not_fitted, Classifier, DecisionTree};
use crate::error::Result;
use crate::Matrix;

const NAME: &str = "Random Forest";

/// Bagged ensemble of [`DecisionTree`]s.
///
/// Every tree is grown on a bootstrap sample of the training rows and
/// considers `floor(log2(n_features)) + 1` random features per split unless
/// `max_features` is set. Probabilities are the mean of the tree
/// probabilities.
#[derive(Clone, Debug)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_trees: usize,
    max_depth: Option<usize>,
    max_features: Option<usize>,
    seed: u64,
    n_features: usize,
    n_classes: usize,
}

impl RandomForest {
    pub fn new() -> Self {
        Self {
            trees: Vec::new(),
            n_trees: 100,
            max_depth: None,
            max_features: None,
            seed: 1,
            n_features: 0,
            n_classes: 0,
        }
    }

    pub fn n_trees(mut self, n_trees: usize) -> Self {
        if n_trees == 0 {
            panic!("n_trees must be > 0, got {}", n_trees);
        }
        self.n_trees = n_trees;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    fn features_per_split(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or_else(|| (n_features as f64).log2().floor() as usize + 1)
            .clamp(1, n_features.max(1))
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_data(NAME, x, y, n_classes)?;
        let n_samples = x.nrows();
        let max_features = self.features_per_split(x.ncols());
        let mut rng = StdRng::seed_from_u64(self.seed);
        let all_rows: Array1<usize> = (0..n_samples).collect();

        let mut trees = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            let bootstrap = all_rows.sample_axis_using(
                Axis(0),
                n_samples,
                SamplingStrategy::WithReplacement,
                &mut rng,
            );
            let rows = bootstrap.to_vec();
            let sample_x = x.select(Axis(0), &rows);
            let sample_y: Vec<usize> = rows.iter().map(|&r| y[r]).collect();

            let mut tree = DecisionTree::new()
                .min_samples_leaf(1)
                .max_features(max_features)
                .seed(rng.next_u64());
            if let Some(depth) = self.max_depth {
                tree = tree.max_depth(depth);
            }
            tree.fit(&sample_x, &sample_y, n_classes)?;
            trees.push(tree);
        }

        log::debug!(
            "{}: grew {} trees with {} features per split",
            NAME,
            trees.len(),
            max_features
        );
        self.trees = trees;
        self.n_features = x.ncols();
        self.n_classes = n_classes;
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Matrix> {
        if self.trees.is_empty() {
            return Err(not_fitted(NAME));
        }
        check_n_features(NAME, x, self.n_features)?;

        let mut proba = Matrix::zeros((x.nrows(), self.n_classes));
        for tree in &self.trees {
            proba += &tree.predict_proba(x)?;
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn overlapping() -> (Matrix, Vec<usize>) {
        let x = array![
            [0.0, 1.0],
            [0.5, 0.2],
            [1.0, 0.8],
            [1.5, 0.1],
            [2.5, 0.9],
            [3.0, 0.3],
            [3.5, 0.7],
            [4.0, 0.4]
        ];
        (x, vec![0, 0, 0, 1, 0, 1, 1, 1])
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = overlapping();
        let mut a = RandomForest::new().n_trees(20).seed(7);
        let mut b = RandomForest::new().n_trees(20).seed(7);
        a.fit(&x, &y, 2).unwrap();
        b.fit(&x, &y, 2).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_grows_requested_number_of_trees() {
        let (x, y) = overlapping();
        let mut forest = RandomForest::new().n_trees(15);
        forest.fit(&x, &y, 2).unwrap();
        assert_eq!(forest.trees().len(), 15);
    }

    #[test]
    fn test_probabilities_are_tree_averages() {
        let (x, y) = overlapping();
        let mut forest = RandomForest::new().n_trees(10).seed(3);
        forest.fit(&x, &y, 2).unwrap();

        let query = array![[2.0, 0.5]];
        let mut expected = Matrix::zeros((1, 2));
        for tree in forest.trees() {
            expected += &tree.predict_proba(&query).unwrap();
        }
        expected /= 10.0;
        let proba = forest.predict_proba(&query).unwrap();
        assert!((proba[[0, 0]] - expected[[0, 0]]).abs() < 1e-12);
        assert!((proba.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_features_per_split() {
        let forest = RandomForest::new();
        assert_eq!(forest.features_per_split(1), 1);
        assert_eq!(forest.features_per_split(2), 2);
        assert_eq!(forest.features_per_split(8), 4);
        assert_eq!(RandomForest::new().max_features(9).features_per_split(2), 2);
    }

    #[test]
    fn test_zero_trees_panics() {
        std::panic::catch_unwind(|| {
            RandomForest::new().n_trees(0);
        })
        .expect_err("Should panic on zero trees");
    }
}
