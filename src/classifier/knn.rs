use super::{check_n_features, check_training_data, not_fitted, Classifier};
use crate::error::Result;
use crate::preprocessing::StandardScaler;
use crate::Matrix;

const NAME: &str = "IBk (k-NN)";

/// Instance-based learner: votes among the `k` nearest training rows.
///
/// Distances are Euclidean on standardized features; equal distances are
/// resolved in favour of the earlier training row.
#[derive(Clone, Debug)]
pub struct KNeighbors {
    k: usize,
    scaler: StandardScaler,
    train_x: Option<Matrix>,
    train_y: Vec<usize>,
    n_classes: usize,
}

impl KNeighbors {
    pub fn new(k: usize) -> Self {
        if k == 0 {
            panic!("k must be > 0, got {}", k);
        }
        Self {
            k,
            scaler: StandardScaler::new(),
            train_x: None,
            train_y: Vec::new(),
            n_classes: 0,
        }
    }

    fn nearest(&self, train_x: &Matrix, row: ndarray::ArrayView1<f64>) -> Vec<usize> {
        let mut distances: Vec<(usize, f64)> = train_x
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, other)| {
                let d: f64 = row
                    .iter()
                    .zip(other.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (i, d)
            })
            .collect();
        distances.sort_by(|a, b| a.1.total_cmp(&b.1));
        distances.into_iter().take(self.k).map(|(i, _)| i).collect()
    }
}

impl Classifier for KNeighbors {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_data(NAME, x, y, n_classes)?;
        self.train_x = Some(self.scaler.fit_transform(x)?);
        self.train_y = y.to_vec();
        self.n_classes = n_classes;
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Matrix> {
        let train_x = self.train_x.as_ref().ok_or_else(|| not_fitted(NAME))?;
        check_n_features(NAME, x, train_x.ncols())?;
        let x = self.scaler.transform(x)?;

        let mut proba = Matrix::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let neighbours = self.nearest(train_x, row);
            let weight = 1.0 / neighbours.len() as f64;
            for j in neighbours {
                proba[[i, self.train_y[j]]] += weight;
            }
        }
        Ok(proba)
    }
}
