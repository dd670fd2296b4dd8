//! Pluggable classification strategies.
//!
//! The evaluation pipeline only talks to the [`Classifier`] trait; concrete
//! strategies are picked by name through the [`ClassifierKind`] registry:
//! - `RandomForest`: bagged decision trees with random feature subsets
//! - `DecisionTree`: CART tree with Gini splits
//! - `LogisticRegression`: gradient-descent logistic model (one-vs-rest)
//! - `SVC`: SMO-trained support vector machine (one-vs-rest)
//! - `GaussianNB`: Gaussian naive Bayes
//! - `KNeighbors`: k-nearest-neighbour voting
//!
//! # Examples
//!
//! ```rust
//! use classeval::{Classifier, ClassifierKind};
//! use ndarray::array;
//!
//! let x = array![[1.0], [2.0], [8.0], [9.0]];
//! let y = vec![0, 0, 1, 1];
//!
//! let mut model = ClassifierKind::from_name("Naive Bayes").unwrap().build(1);
//! model.fit(&x, &y, 2).unwrap();
//! let proba = model.predict_proba(&x).unwrap();
//! assert_eq!(proba.shape(), &[4, 2]);
//! assert_eq!(model.predict(&x).unwrap(), vec![0, 0, 1, 1]);
//! ```

mod decision_tree;
mod knn;
mod logistic_regression;
mod naive_bayes;
mod one_vs_rest;
mod random_forest;
mod svm;

use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayView1, Axis};

use crate::error::{EvalError, Result};
use crate::Matrix;

pub use decision_tree::DecisionTree;
pub use knn::KNeighbors;
pub use logistic_regression::LogisticRegression;
pub use naive_bayes::GaussianNB;
pub use one_vs_rest::{BinaryModel, OneVsRest};
pub use random_forest::RandomForest;
pub use svm::{Kernel, SVC};

/// A trainable classifier over numeric features and class indices.
///
/// `y[i]` is a class index in `0..n_classes`. Classes with no training rows
/// are allowed and get probability 0.
pub trait Classifier: Send + fmt::Debug {
    fn name(&self) -> &str;

    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<()>;

    /// One row per sample, one column per class; every row sums to 1.
    fn predict_proba(&self, x: &Matrix) -> Result<Matrix>;

    /// Most probable class per sample, lowest index on ties.
    fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.axis_iter(Axis(0)).map(argmax).collect())
    }
}

/// The closed set of strategies selectable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassifierKind {
    RandomForest,
    DecisionTree,
    LogisticRegression,
    Svm,
    NaiveBayes,
    KNearestNeighbors,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 6] = [
        ClassifierKind::RandomForest,
        ClassifierKind::DecisionTree,
        ClassifierKind::LogisticRegression,
        ClassifierKind::Svm,
        ClassifierKind::NaiveBayes,
        ClassifierKind::KNearestNeighbors,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ClassifierKind::RandomForest => "Random Forest",
            ClassifierKind::DecisionTree => "J48 (Decision Tree)",
            ClassifierKind::LogisticRegression => "Logistic Regression",
            ClassifierKind::Svm => "SMO (SVM)",
            ClassifierKind::NaiveBayes => "Naive Bayes",
            ClassifierKind::KNearestNeighbors => "IBk (k-NN)",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ClassifierKind::RandomForest => &["random-forest", "randomforest", "rf"],
            ClassifierKind::DecisionTree => &["decision-tree", "j48", "tree"],
            ClassifierKind::LogisticRegression => &["logistic-regression", "logistic"],
            ClassifierKind::Svm => &["svm", "smo"],
            ClassifierKind::NaiveBayes => &["naive-bayes", "naivebayes", "nb"],
            ClassifierKind::KNearestNeighbors => &["knn", "k-nn", "ibk"],
        }
    }

    /// Case-insensitive lookup by display name or alias.
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| {
                kind.display_name().eq_ignore_ascii_case(wanted)
                    || kind.aliases().iter().any(|a| a.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| EvalError::UnknownClassifier(name.to_string()))
    }

    /// A fresh, unfitted instance. `seed` drives strategies that randomise.
    pub fn build(&self, seed: u64) -> Box<dyn Classifier> {
        match self {
            ClassifierKind::RandomForest => Box::new(RandomForest::new().seed(seed)),
            ClassifierKind::DecisionTree => Box::new(DecisionTree::new()),
            ClassifierKind::LogisticRegression => {
                Box::new(OneVsRest::new(LogisticRegression::new()))
            }
            ClassifierKind::Svm => Box::new(OneVsRest::new(SVC::new())),
            ClassifierKind::NaiveBayes => Box::new(GaussianNB::new()),
            ClassifierKind::KNearestNeighbors => Box::new(KNeighbors::new(1)),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ClassifierKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Index of the largest value, first one on ties.
pub fn argmax(row: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &value) in row.iter().enumerate() {
        if value > row[best] {
            best = i;
        }
    }
    best
}

/// Scales every row to sum to 1; all-zero rows become uniform.
pub(crate) fn normalize_rows(proba: &mut Matrix) {
    let n_classes = proba.ncols();
    for mut row in proba.axis_iter_mut(Axis(0)) {
        let sum: f64 = row.sum();
        if sum > 0.0 && sum.is_finite() {
            row /= sum;
        } else {
            row.fill(1.0 / n_classes as f64);
        }
    }
}

pub(crate) fn check_training_data(
    name: &str,
    x: &Matrix,
    y: &[usize],
    n_classes: usize,
) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(EvalError::training(name, "Number of samples in X and y must match"));
    }
    if x.nrows() == 0 {
        return Err(EvalError::training(name, "X must have at least one sample"));
    }
    if let Some(&label) = y.iter().find(|&&label| label >= n_classes) {
        return Err(EvalError::training(
            name,
            format!("class index {label} is outside 0..{n_classes}"),
        ));
    }
    Ok(())
}

pub(crate) fn check_n_features(name: &str, x: &Matrix, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(EvalError::training(
            name,
            format!(
                "Number of features in X ({}) doesn't match training data ({})",
                x.ncols(),
                expected
            ),
        ));
    }
    Ok(())
}

pub(crate) fn not_fitted(name: &str) -> EvalError {
    EvalError::training(name, "Model not fitted. Call fit() first.")
}
