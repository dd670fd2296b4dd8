use ndarray::ArrayView1;

use super::{check_n_features, not_fitted, BinaryModel};
use crate::error::{EvalError, Result};
use crate::{Matrix, Vector};

const NAME: &str = "SMO (SVM)";

/// Support vector classifier trained with sequential minimal optimization.
///
/// Decision function: `f(x) = sum_i alpha_i y_i K(sv_i, x) + b`, labels in {-1, +1}.
#[derive(Clone, Debug)]
pub struct SVC {
    pub support_vectors: Option<Matrix>,
    pub dual_coefficients: Option<Vector>,
    pub intercept: Option<f64>,
    c: f64,
    kernel: Kernel,
    gamma: f64,
    degree: usize,
    coef0: f64,
    tolerance: f64,
    max_passes: usize,
    max_iter: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kernel {
    Linear,
    Polynomial,
    Rbf,
    Sigmoid,
}

impl SVC {
    pub fn new() -> Self {
        Self {
            support_vectors: None,
            dual_coefficients: None,
            intercept: None,
            c: 1.0,
            kernel: Kernel::Linear,
            gamma: 1.0,
            degree: 3,
            coef0: 0.0,
            tolerance: 1e-3,
            max_passes: 5,
            max_iter: 1000,
        }
    }

    pub fn c(mut self, c: f64) -> Self {
        if c <= 0.0 {
            panic!("C must be positive, got {}", c);
        }
        self.c = c;
        self
    }

    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn gamma(mut self, gamma: f64) -> Self {
        if gamma <= 0.0 {
            panic!("gamma must be positive, got {}", gamma);
        }
        self.gamma = gamma;
        self
    }

    pub fn degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn coef0(mut self, coef0: f64) -> Self {
        self.coef0 = coef0;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Fits on labels in {-1, +1}; both must be present.
    pub fn fit(&mut self, x: &Matrix, y: &Vector) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(EvalError::training(NAME, "Number of samples in X and y must match"));
        }
        if x.nrows() == 0 {
            return Err(EvalError::training(NAME, "X must have at least one sample"));
        }

        self.validate_labels(y)?;

        let (alphas, b) = self.smo(x, y);

        let support: Vec<usize> = alphas
            .iter()
            .enumerate()
            .filter(|&(_, &alpha)| alpha > 1e-8)
            .map(|(i, _)| i)
            .collect();

        let mut support_vectors = Matrix::zeros((support.len(), x.ncols()));
        let mut dual_coeffs = Vector::zeros(support.len());
        for (sv, &i) in support.iter().enumerate() {
            support_vectors.row_mut(sv).assign(&x.row(i));
            dual_coeffs[sv] = alphas[i] * y[i];
        }

        self.support_vectors = Some(support_vectors);
        self.dual_coefficients = Some(dual_coeffs);
        self.intercept = Some(b);

        Ok(())
    }

    pub fn decision_function(&self, x: &Matrix) -> Result<Vector> {
        let support_vectors = self.support_vectors.as_ref().ok_or_else(|| not_fitted(NAME))?;
        let dual_coeffs = self.dual_coefficients.as_ref().ok_or_else(|| not_fitted(NAME))?;
        let intercept = self.intercept.unwrap_or(0.0);

        check_n_features(NAME, x, support_vectors.ncols())?;

        let scores: Vector = x
            .rows()
            .into_iter()
            .map(|row| {
                support_vectors
                    .rows()
                    .into_iter()
                    .zip(dual_coeffs.iter())
                    .map(|(sv, &coef)| coef * self.kernel_function(row, sv))
                    .sum::<f64>()
                    + intercept
            })
            .collect();

        Ok(scores)
    }

    /// Logistic squashing of the decision value; 0.5 on the boundary.
    pub fn predict_proba(&self, x: &Matrix) -> Result<Vector> {
        let scores = self.decision_function(x)?;
        Ok(scores.mapv(|s| 1.0 / (1.0 + (-s).exp())))
    }

    pub fn n_support_vectors(&self) -> Option<usize> {
        self.support_vectors.as_ref().map(|sv| sv.nrows())
    }

    fn validate_labels(&self, y: &Vector) -> Result<()> {
        if y.iter().any(|&v| v != 1.0 && v != -1.0) {
            return Err(EvalError::training(NAME, "Labels must be -1 and +1 for binary SVM"));
        }
        let has_positive = y.iter().any(|&v| v == 1.0);
        let has_negative = y.iter().any(|&v| v == -1.0);
        if !has_positive || !has_negative {
            return Err(EvalError::training(NAME, "SVM requires exactly 2 classes"));
        }
        Ok(())
    }

    fn kernel_function(&self, x1: ArrayView1<f64>, x2: ArrayView1<f64>) -> f64 {
        match self.kernel {
            Kernel::Linear => x1.dot(&x2),
            Kernel::Polynomial => {
                (self.gamma * x1.dot(&x2) + self.coef0).powi(self.degree as i32)
            }
            Kernel::Rbf => {
                let norm_squared: f64 = x1
                    .iter()
                    .zip(x2.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (-self.gamma * norm_squared).exp()
            }
            Kernel::Sigmoid => (self.gamma * x1.dot(&x2) + self.coef0).tanh(),
        }
    }

    fn kernel_matrix(&self, x: &Matrix) -> Matrix {
        let n = x.nrows();
        let mut k = Matrix::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let value = self.kernel_function(x.row(i), x.row(j));
                k[[i, j]] = value;
                k[[j, i]] = value;
            }
        }
        k
    }

    /// Returns the dual coefficients and the bias.
    fn smo(&self, x: &Matrix, y: &Vector) -> (Vector, f64) {
        let n = x.nrows();
        let k = self.kernel_matrix(x);
        let mut alphas = Vector::zeros(n);
        let mut b = 0.0;
        // errors[i] = f(x_i) - y_i, with f = 0 before any step
        let mut errors = y.mapv(|v| -v);

        let mut passes = 0;
        let mut iterations = 0;
        while passes < self.max_passes && iterations < self.max_iter {
            let mut num_changed = 0;

            for i in 0..n {
                let r_i = errors[i] * y[i];
                let violates = (r_i < -self.tolerance && alphas[i] < self.c)
                    || (r_i > self.tolerance && alphas[i] > 0.0);
                if !violates {
                    continue;
                }

                let first_choice = self.select_second_alpha(i, &errors);
                let mut stepped = first_choice
                    .is_some_and(|j| self.take_step(i, j, &k, y, &mut alphas, &mut b, &mut errors));
                // Fall back to scanning the other samples in order.
                let mut offset = 1;
                while !stepped && offset < n {
                    let j = (i + offset) % n;
                    if Some(j) != first_choice {
                        stepped = self.take_step(i, j, &k, y, &mut alphas, &mut b, &mut errors);
                    }
                    offset += 1;
                }
                if stepped {
                    num_changed += 1;
                }
            }

            iterations += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        (alphas, b)
    }

    fn select_second_alpha(&self, i: usize, errors: &Vector) -> Option<usize> {
        let error_i = errors[i];
        let mut best_j = None;
        let mut max_step = 0.0;

        for (j, &error_j) in errors.iter().enumerate() {
            if j != i {
                let step = (error_i - error_j).abs();
                if step > max_step {
                    max_step = step;
                    best_j = Some(j);
                }
            }
        }

        best_j
    }

    #[allow(clippy::too_many_arguments)]
    fn take_step(
        &self,
        i: usize,
        j: usize,
        k: &Matrix,
        y: &Vector,
        alphas: &mut Vector,
        b: &mut f64,
        errors: &mut Vector,
    ) -> bool {
        if i == j {
            return false;
        }

        let alpha_i_old = alphas[i];
        let alpha_j_old = alphas[j];
        let (y_i, y_j) = (y[i], y[j]);
        let (error_i, error_j) = (errors[i], errors[j]);

        let (l, h) = if y_i != y_j {
            (
                (0.0_f64).max(alpha_j_old - alpha_i_old),
                self.c.min(self.c + alpha_j_old - alpha_i_old),
            )
        } else {
            (
                (0.0_f64).max(alpha_i_old + alpha_j_old - self.c),
                self.c.min(alpha_i_old + alpha_j_old),
            )
        };

        if h - l < 1e-8 {
            return false;
        }

        let (k_ii, k_ij, k_jj) = (k[[i, i]], k[[i, j]], k[[j, j]]);
        let eta = k_ii + k_jj - 2.0 * k_ij;
        if eta <= 0.0 {
            return false;
        }

        let alpha_j_new = (alpha_j_old + y_j * (error_i - error_j) / eta).clamp(l, h);
        if (alpha_j_new - alpha_j_old).abs() < 1e-8 {
            return false;
        }
        let alpha_i_new = alpha_i_old + y_i * y_j * (alpha_j_old - alpha_j_new);

        let delta_i = y_i * (alpha_i_new - alpha_i_old);
        let delta_j = y_j * (alpha_j_new - alpha_j_old);

        let b1 = *b - error_i - delta_i * k_ii - delta_j * k_ij;
        let b2 = *b - error_j - delta_i * k_ij - delta_j * k_jj;
        let b_new = if alpha_i_new > 0.0 && alpha_i_new < self.c {
            b1
        } else if alpha_j_new > 0.0 && alpha_j_new < self.c {
            b2
        } else {
            (b1 + b2) / 2.0
        };

        for m in 0..errors.len() {
            errors[m] += delta_i * k[[i, m]] + delta_j * k[[j, m]] + (b_new - *b);
        }

        alphas[i] = alpha_i_new;
        alphas[j] = alpha_j_new;
        *b = b_new;

        true
    }
}

impl Default for SVC {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryModel for SVC {
    fn name(&self) -> &str {
        NAME
    }

    fn fit_binary(&mut self, x: &Matrix, positive: &[bool]) -> Result<()> {
        let y: Vector = positive.iter().map(|&p| if p { 1.0 } else { -1.0 }).collect();
        self.fit(x, &y)
    }

    fn positive_proba(&self, x: &Matrix) -> Result<Vector> {
        self.predict_proba(x)
    }
}
