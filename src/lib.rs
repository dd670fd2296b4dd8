pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod balance;
pub mod classifier;
pub mod config;
pub mod cross_validation;
pub mod dataset;
pub mod error;
pub mod features;
pub mod metrics;
pub mod pipeline;
pub mod preprocessing;
pub mod projection;
pub mod report;
pub mod roc;

pub use balance::{BalancedTable, ClassBalancer};
pub use classifier::{Classifier, ClassifierKind};
pub use config::{EvaluationConfig, OutputFormat};
pub use cross_validation::{CancelToken, CrossValidation, CrossValidator, KFold};
pub use dataset::{Column, ColumnData, ColumnKind, Dataset, LoadOptions};
pub use error::{EvalError, Result};
pub use metrics::{ClassMetrics, ConfusionMatrix};
pub use pipeline::{
    run_evaluation, run_evaluation_with, run_evaluation_with_cancel, EvaluationRequest,
    EvaluationResult, EvaluationWarning,
};
pub use projection::{project, LabeledTable, MissingValuePolicy};
pub use roc::{RocCurve, RocPoint};

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_types_work() {
        let vec = Vector::zeros(5);
        let mat = Matrix::zeros((3, 4));
        assert_eq!(vec.len(), 5);
        assert_eq!(mat.shape(), &[3, 4]);
    }
}
