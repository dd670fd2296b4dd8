use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use super::{check_n_features, check_training_data, not_fitted, Classifier};
use crate::error::Result;
use crate::{Matrix, Vector};

const NAME: &str = "J48 (Decision Tree)";

#[derive(Clone, Debug)]
enum Node {
    Leaf {
        distribution: Vector,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Binary CART tree on Gini impurity.
///
/// Leaves predict the class frequencies of their training rows. With
/// `max_features` set, every split considers a random subset of features.
#[derive(Clone, Debug)]
pub struct DecisionTree {
    root: Option<Node>,
    n_features: usize,
    n_classes: usize,
    max_depth: Option<usize>,
    min_samples_leaf: usize,
    max_features: Option<usize>,
    seed: u64,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            n_features: 0,
            n_classes: 0,
            max_depth: None,
            min_samples_leaf: 2,
            max_features: None,
            seed: 0,
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        if min_samples_leaf == 0 {
            panic!("min_samples_leaf must be > 0, got {}", min_samples_leaf);
        }
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn depth(&self) -> Option<usize> {
        fn depth_of(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        self.root.as_ref().map(depth_of)
    }

    fn build(
        &self,
        x: &Matrix,
        y: &[usize],
        n_classes: usize,
        rows: &[usize],
        depth: usize,
        rng: &mut StdRng,
    ) -> Node {
        let counts = class_counts(y, rows, n_classes);
        let distribution = normalized(&counts, rows.len());

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_deep = self.max_depth.is_some_and(|d| depth >= d);
        if pure || too_deep || rows.len() < 2 * self.min_samples_leaf {
            return Node::Leaf { distribution };
        }

        let parent = gini(&counts, rows.len());
        let best = match self.best_split(x, y, n_classes, rows, rng) {
            Some(best) if best.impurity < parent - 1e-12 => best,
            _ => return Node::Leaf { distribution },
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| x[[r, best.feature]] <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(x, y, n_classes, &left_rows, depth + 1, rng)),
            right: Box::new(self.build(x, y, n_classes, &right_rows, depth + 1, rng)),
        }
    }

    fn best_split(
        &self,
        x: &Matrix,
        y: &[usize],
        n_classes: usize,
        rows: &[usize],
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n_features = x.ncols();
        let features: Vec<usize> = match self.max_features {
            Some(m) if m < n_features => index::sample(rng, n_features, m).into_vec(),
            _ => (0..n_features).collect(),
        };

        let n = rows.len();
        let mut best: Option<BestSplit> = None;

        for feature in features {
            let mut sorted = rows.to_vec();
            sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left = vec![0usize; n_classes];
            let mut right = class_counts(y, &sorted, n_classes);

            for split in 1..n {
                let moved = sorted[split - 1];
                left[y[moved]] += 1;
                right[y[moved]] -= 1;

                let lo = x[[moved, feature]];
                let hi = x[[sorted[split], feature]];
                if lo == hi || split < self.min_samples_leaf || n - split < self.min_samples_leaf {
                    continue;
                }

                let impurity = (split as f64 * gini(&left, split)
                    + (n - split) as f64 * gini(&right, n - split))
                    / n as f64;
                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    best = Some(BestSplit {
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                        impurity,
                    });
                }
            }
        }

        best
    }

    fn leaf_for<'a>(mut node: &'a Node, row: ndarray::ArrayView1<f64>) -> &'a Vector {
        loop {
            match node {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_data(NAME, x, y, n_classes)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let rows: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build(x, y, n_classes, &rows, 0, &mut rng));
        self.n_features = x.ncols();
        self.n_classes = n_classes;
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Matrix> {
        let root = self.root.as_ref().ok_or_else(|| not_fitted(NAME))?;
        check_n_features(NAME, x, self.n_features)?;

        let mut proba = Matrix::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            proba.row_mut(i).assign(Self::leaf_for(root, row));
        }
        Ok(proba)
    }
}

fn class_counts(y: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &r in rows {
        counts[y[r]] += 1;
    }
    counts
}

fn normalized(counts: &[usize], total: usize) -> Vector {
    counts.iter().map(|&c| c as f64 / total as f64).collect()
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_single_split_on_threshold() {
        let x = array![[1.0], [2.0], [3.0], [7.0], [8.0], [9.0]];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();

        assert_eq!(tree.depth(), Some(1));
        assert_eq!(tree.predict(&array![[4.9], [5.1]]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_picks_informative_feature() {
        let x = array![[5.0, 0.0], [1.0, 0.1], [4.0, 0.2], [2.0, 1.0], [3.0, 1.1], [6.0, 1.2]];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();
        assert_eq!(tree.depth(), Some(1));
        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]];
        let y = vec![0, 1, 0, 1, 0, 1, 0, 1];
        let mut tree = DecisionTree::new().max_depth(1).min_samples_leaf(1);
        tree.fit(&x, &y, 2).unwrap();
        assert!(tree.depth().unwrap() <= 1);
    }

    #[test]
    fn test_leaf_distribution_is_class_frequency() {
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let y = vec![0, 1, 1, 1];
        let mut tree = DecisionTree::new();
        tree.fit(&x, &y, 2).unwrap();
        let proba = tree.predict_proba(&array![[1.0]]).unwrap();
        assert!((proba[[0, 1]] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = vec![1, 0, 0, 0];
        let mut tree = DecisionTree::new().min_samples_leaf(2);
        tree.fit(&x, &y, 2).unwrap();
        // the lone class-1 row cannot be isolated
        assert_eq!(tree.predict(&array![[0.0]]).unwrap(), vec![0]);
    }
}
