use super::{check_n_features, not_fitted, BinaryModel};
use crate::error::{EvalError, Result};
use crate::{Matrix, Vector};

const NAME: &str = "Logistic Regression";

#[derive(Clone, Debug)]
pub struct LogisticRegression {
    pub coefficients: Option<Vector>,
    pub intercept: Option<f64>,
    fit_intercept: bool,
    learning_rate: f64,
    max_iterations: usize,
    tolerance: f64,
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            learning_rate: 0.1,
            max_iterations: 1000,
            tolerance: 1e-6,
        }
    }

    pub fn with_params(learning_rate: f64, max_iterations: usize, fit_intercept: bool) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept,
            learning_rate,
            max_iterations,
            tolerance: 1e-6,
        }
    }

    /// Fits on 0/1 targets.
    pub fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(EvalError::training(NAME, "Number of samples in X and y must match"));
        }

        self.validate_labels(y)?;

        let (coeffs, intercept) = if self.fit_intercept {
            self.fit_with_intercept(x, y)?
        } else {
            (self.gradient_descent(x, y)?, 0.0)
        };

        self.coefficients = Some(coeffs);
        self.intercept = Some(intercept);
        Ok(())
    }

    /// P(y = 1) per sample.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Vector> {
        let coeffs = self.coefficients.as_ref().ok_or_else(|| not_fitted(NAME))?;
        let intercept = self.intercept.unwrap_or(0.0);

        check_n_features(NAME, x, coeffs.len())?;

        let linear_combination = x.dot(coeffs) + intercept;
        Ok(linear_combination.mapv(Self::sigmoid))
    }

    fn sigmoid(z: f64) -> f64 {
        if z > 500.0 {
            1.0
        } else if z < -500.0 {
            0.0
        } else {
            1.0 / (1.0 + (-z).exp())
        }
    }

    fn validate_labels(&self, y: &Vector) -> Result<()> {
        if y.iter().any(|&label| label != 0.0 && label != 1.0) {
            return Err(EvalError::training(
                NAME,
                "Labels must be 0 or 1 for binary classification",
            ));
        }
        Ok(())
    }

    fn fit_with_intercept(&self, x: &Matrix, y: &Vector) -> Result<(Vector, f64)> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let mut x_with_intercept = Matrix::ones((n_samples, n_features + 1));
        x_with_intercept.slice_mut(ndarray::s![.., 1..]).assign(x);

        let weights = self.gradient_descent(&x_with_intercept, y)?;

        let intercept = weights[0];
        let coeffs = weights.slice(ndarray::s![1..]).to_owned();

        Ok((coeffs, intercept))
    }

    fn gradient_descent(&self, x: &Matrix, y: &Vector) -> Result<Vector> {
        let n_samples = x.nrows() as f64;
        let mut weights = Vector::zeros(x.ncols());

        let mut prev_cost = f64::INFINITY;
        let mut no_improvement_count = 0;

        for _ in 0..self.max_iterations {
            let predictions = x.dot(&weights).mapv(Self::sigmoid);
            let cost = self.logistic_loss(y, &predictions);

            if !cost.is_finite() {
                return Err(EvalError::training(NAME, "Gradient descent diverged"));
            }

            if (prev_cost - cost).abs() < self.tolerance {
                no_improvement_count += 1;
                if no_improvement_count > 10 {
                    break;
                }
            } else {
                no_improvement_count = 0;
            }

            let error = &predictions - y;
            let gradient = x.t().dot(&error) / n_samples;
            weights = &weights - &gradient * self.learning_rate;

            prev_cost = cost;
        }

        Ok(weights)
    }

    fn logistic_loss(&self, y_true: &Vector, y_pred: &Vector) -> f64 {
        let epsilon = 1e-15;
        let loss = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(&y, &p)| {
                let p = p.clamp(epsilon, 1.0 - epsilon);
                -y * p.ln() - (1.0 - y) * (1.0 - p).ln()
            })
            .sum::<f64>();

        loss / y_true.len() as f64
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryModel for LogisticRegression {
    fn name(&self) -> &str {
        NAME
    }

    fn fit_binary(&mut self, x: &Matrix, positive: &[bool]) -> Result<()> {
        let y: Vector = positive.iter().map(|&p| if p { 1.0 } else { 0.0 }).collect();
        self.fit(x, &y)
    }

    fn positive_proba(&self, x: &Matrix) -> Result<Vector> {
        self.predict_proba(x)
    }
}
