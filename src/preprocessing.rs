use ndarray::Axis;

use crate::error::{EvalError, Result};
use crate::{Matrix, Vector};

const NAME: &str = "StandardScaler";

/// Per-column standardization to zero mean and unit variance.
///
/// Columns with zero spread are only centred.
#[derive(Clone, Debug, Default)]
pub struct StandardScaler {
    mean: Option<Vector>,
    std: Option<Vector>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
        }
    }

    pub fn fit(&mut self, data: &Matrix) -> Result<()> {
        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| EvalError::training(NAME, "cannot fit on an empty matrix"))?;
        let std = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 && s.is_finite() { s } else { 1.0 });

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    pub fn transform(&self, data: &Matrix) -> Result<Matrix> {
        let mean = self.mean.as_ref()
            .ok_or_else(|| EvalError::training(NAME, "Scaler not fitted. Call fit() first."))?;
        let std = self.std.as_ref()
            .ok_or_else(|| EvalError::training(NAME, "Scaler not fitted. Call fit() first."))?;

        if data.ncols() != mean.len() {
            return Err(EvalError::training(
                NAME,
                format!(
                    "Number of features in X ({}) doesn't match training data ({})",
                    data.ncols(),
                    mean.len()
                ),
            ));
        }

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            row -= mean;
            row /= std;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, data: &Matrix) -> Result<Matrix> {
        self.fit(data)?;
        self.transform(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let data = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let mut scaler = StandardScaler::new();

        let scaled = scaler.fit_transform(&data).unwrap();
        assert_eq!(scaled.shape(), data.shape());
        let means = scaled.mean_axis(Axis(0)).unwrap();
        assert!(means.iter().all(|m| m.abs() < 1e-10));
    }

    #[test]
    fn test_constant_column_is_centred_only() {
        let data = array![[7.0, 1.0], [7.0, 3.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();
        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_transform_without_fit() {
        let scaler = StandardScaler::new();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_transform_dimension_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }
}
