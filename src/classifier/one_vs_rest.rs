use std::fmt;

use super::{check_n_features, check_training_data, normalize_rows, not_fitted, Classifier};
use crate::error::Result;
use crate::preprocessing::StandardScaler;
use crate::{Matrix, Vector};

/// A two-class model that scores the probability of the positive side.
pub trait BinaryModel: Clone + Send + fmt::Debug {
    fn name(&self) -> &str;

    /// `positive[i]` tells whether sample `i` belongs to the positive class.
    /// Both sides are guaranteed non-empty.
    fn fit_binary(&mut self, x: &Matrix, positive: &[bool]) -> Result<()>;

    /// P(positive) per sample.
    fn positive_proba(&self, x: &Matrix) -> Result<Vector>;
}

#[derive(Clone, Debug)]
enum Member<M> {
    Fitted(M),
    /// Training rows were all on one side.
    Constant(f64),
}

/// Lifts a [`BinaryModel`] to any number of classes.
///
/// Features are standardized before they reach the binary models. Two
/// classes use a single model for class 1; more classes use one model per
/// class with normalized scores.
#[derive(Clone, Debug)]
pub struct OneVsRest<M> {
    template: M,
    scaler: StandardScaler,
    members: Vec<Member<M>>,
    n_classes: usize,
    n_features: usize,
}

impl<M: BinaryModel> OneVsRest<M> {
    pub fn new(template: M) -> Self {
        Self {
            template,
            scaler: StandardScaler::new(),
            members: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    fn fit_member(&self, x: &Matrix, positive: &[bool]) -> Result<Member<M>> {
        let n_positive = positive.iter().filter(|&&p| p).count();
        if n_positive == 0 {
            return Ok(Member::Constant(0.0));
        }
        if n_positive == positive.len() {
            return Ok(Member::Constant(1.0));
        }
        let mut model = self.template.clone();
        model.fit_binary(x, positive)?;
        Ok(Member::Fitted(model))
    }
}

impl<M: BinaryModel> Classifier for OneVsRest<M> {
    fn name(&self) -> &str {
        self.template.name()
    }

    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_data(self.name(), x, y, n_classes)?;
        let x = self.scaler.fit_transform(x)?;

        let targets: Vec<usize> = if n_classes == 2 {
            vec![1]
        } else {
            (0..n_classes).collect()
        };

        let mut members = Vec::with_capacity(targets.len());
        for class in targets {
            let positive: Vec<bool> = y.iter().map(|&label| label == class).collect();
            members.push(self.fit_member(&x, &positive)?);
        }

        self.members = members;
        self.n_classes = n_classes;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Matrix> {
        if self.members.is_empty() {
            return Err(not_fitted(self.name()));
        }
        check_n_features(self.name(), x, self.n_features)?;
        let x = self.scaler.transform(x)?;

        let mut scores = Vec::with_capacity(self.members.len());
        for member in &self.members {
            scores.push(match member {
                Member::Fitted(model) => model.positive_proba(&x)?,
                Member::Constant(p) => Vector::from_elem(x.nrows(), *p),
            });
        }

        let mut proba = Matrix::zeros((x.nrows(), self.n_classes));
        if self.n_classes == 2 {
            proba.column_mut(1).assign(&scores[0]);
            proba.column_mut(0).assign(&scores[0].mapv(|p| 1.0 - p));
        } else {
            for (class, score) in scores.iter().enumerate() {
                proba.column_mut(class).assign(score);
            }
            normalize_rows(&mut proba);
        }
        Ok(proba)
    }
}
