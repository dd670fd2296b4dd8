use super::{check_n_features, check_training_data, not_fitted, Classifier};
use crate::error::Result;
use crate::{Matrix, Vector};

const NAME: &str = "Naive Bayes";

/// Gaussian naive Bayes: independent normal likelihood per feature and class.
#[derive(Clone, Debug)]
pub struct GaussianNB {
    pub class_prior: Option<Vector>,
    pub theta: Option<Matrix>,
    pub var: Option<Matrix>,
    var_smoothing: f64,
}

impl GaussianNB {
    pub fn new() -> Self {
        Self {
            class_prior: None,
            theta: None,
            var: None,
            var_smoothing: 1e-9,
        }
    }

    /// Fraction of the largest feature variance added to every variance.
    pub fn var_smoothing(mut self, var_smoothing: f64) -> Self {
        self.var_smoothing = var_smoothing;
        self
    }

    fn joint_log_likelihood(&self, x: &Matrix) -> Result<Matrix> {
        let prior = self.class_prior.as_ref().ok_or_else(|| not_fitted(NAME))?;
        let theta = self.theta.as_ref().ok_or_else(|| not_fitted(NAME))?;
        let var = self.var.as_ref().ok_or_else(|| not_fitted(NAME))?;
        check_n_features(NAME, x, theta.ncols())?;

        let mut jll = Matrix::from_elem((x.nrows(), prior.len()), f64::NEG_INFINITY);
        for (class, &p) in prior.iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            let mean = theta.row(class);
            let variance = var.row(class);
            let norm: f64 = variance
                .iter()
                .map(|v| (2.0 * std::f64::consts::PI * v).ln())
                .sum::<f64>()
                * 0.5;
            for (i, row) in x.rows().into_iter().enumerate() {
                let quad: f64 = row
                    .iter()
                    .zip(mean.iter().zip(variance.iter()))
                    .map(|(value, (m, v))| (value - m) * (value - m) / v)
                    .sum();
                jll[[i, class]] = p.ln() - norm - 0.5 * quad;
            }
        }
        Ok(jll)
    }
}

impl Default for GaussianNB {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for GaussianNB {
    fn name(&self) -> &str {
        NAME
    }

    fn fit(&mut self, x: &Matrix, y: &[usize], n_classes: usize) -> Result<()> {
        check_training_data(NAME, x, y, n_classes)?;
        let n_features = x.ncols();

        let mut counts = vec![0usize; n_classes];
        let mut theta = Matrix::zeros((n_classes, n_features));
        for (row, &label) in x.rows().into_iter().zip(y) {
            counts[label] += 1;
            let mut mean = theta.row_mut(label);
            mean += &row;
        }
        for (class, &count) in counts.iter().enumerate() {
            if count > 0 {
                theta.row_mut(class).mapv_inplace(|s| s / count as f64);
            }
        }

        let mut var = Matrix::zeros((n_classes, n_features));
        for (row, &label) in x.rows().into_iter().zip(y) {
            for j in 0..n_features {
                let d = row[j] - theta[[label, j]];
                var[[label, j]] += d * d;
            }
        }
        for (class, &count) in counts.iter().enumerate() {
            if count > 0 {
                var.row_mut(class).mapv_inplace(|s| s / count as f64);
            }
        }

        let overall_max = x
            .columns()
            .into_iter()
            .map(|c| c.var(0.0))
            .fold(0.0_f64, f64::max);
        let epsilon = if overall_max > 0.0 {
            self.var_smoothing * overall_max
        } else {
            self.var_smoothing
        };
        var.mapv_inplace(|v| v + epsilon);

        let total = y.len() as f64;
        self.class_prior = Some(counts.iter().map(|&c| c as f64 / total).collect());
        self.theta = Some(theta);
        self.var = Some(var);
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Matrix> {
        let mut proba = self.joint_log_likelihood(x)?;
        for mut row in proba.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row /= sum;
        }
        Ok(proba)
    }
}
