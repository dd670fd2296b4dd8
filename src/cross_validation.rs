use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::classifier::{Classifier, ClassifierKind};
use crate::error::{EvalError, Result};
use crate::metrics::{accuracy_score, ConfusionMatrix};
use crate::projection::LabeledTable;

/// Seeded k-fold partition of row indices.
#[derive(Clone, Debug)]
pub struct KFold {
    n_splits: usize,
    seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits, seed: 1 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Shuffles `0..n_rows` and cuts it into `n_splits` contiguous test folds.
    ///
    /// Fold sizes differ by at most one; the first `n_rows % n_splits` folds
    /// take the extra rows.
    pub fn split(&self, n_rows: usize) -> Result<Vec<Vec<usize>>> {
        if self.n_splits < 2 || self.n_splits > n_rows {
            return Err(EvalError::InvalidFoldCount {
                folds: self.n_splits,
                rows: n_rows,
            });
        }

        let mut order: Vec<usize> = (0..n_rows).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);

        let base = n_rows / self.n_splits;
        let extra = n_rows % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            folds.push(order[start..start + size].to_vec());
            start += size;
        }
        Ok(folds)
    }
}

/// Cooperative cancellation flag shared between a caller and a running
/// evaluation. Checked between folds only.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(EvalError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FoldMetrics {
    pub fold: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub accuracy: f64,
}

/// A held-out prediction for one table row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub row: usize,
    pub fold: usize,
    pub actual: usize,
    pub predicted: usize,
    pub probabilities: Vec<f64>,
}

#[derive(Debug)]
pub struct CrossValidation {
    pub confusion: ConfusionMatrix,
    pub folds: Vec<FoldMetrics>,
    /// Held-out predictions in fold order.
    pub out_of_fold: Vec<Prediction>,
    /// Fitted on every row of the table after the folds ran.
    pub model: Box<dyn Classifier>,
}

#[derive(Clone, Debug)]
pub struct CrossValidator {
    folds: usize,
    seed: u64,
    cancel: CancelToken,
}

impl CrossValidator {
    pub fn new(folds: usize, seed: u64) -> Self {
        Self {
            folds,
            seed,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Cross-validates a registered strategy; every fold gets a fresh
    /// instance seeded with the validator's seed.
    pub fn evaluate(&self, table: &LabeledTable, kind: ClassifierKind) -> Result<CrossValidation> {
        let seed = self.seed;
        self.evaluate_with(table, || kind.build(seed))
    }

    /// Cross-validates classifiers produced by `factory`, which is called
    /// once per fold and once more for the final model.
    pub fn evaluate_with<F>(&self, table: &LabeledTable, factory: F) -> Result<CrossValidation>
    where
        F: Fn() -> Box<dyn Classifier>,
    {
        let n_classes = table.n_classes();
        let folds = KFold::new(self.folds).with_seed(self.seed).split(table.n_rows())?;

        let mut confusion = ConfusionMatrix::new(table.classes.clone());
        let mut fold_metrics = Vec::with_capacity(folds.len());
        let mut out_of_fold = Vec::with_capacity(table.n_rows());
        let mut in_test = vec![false; table.n_rows()];

        for (fold, test_rows) in folds.iter().enumerate() {
            self.cancel.check()?;

            in_test.iter_mut().for_each(|t| *t = false);
            for &row in test_rows {
                in_test[row] = true;
            }
            let train_rows: Vec<usize> = (0..table.n_rows()).filter(|&r| !in_test[r]).collect();

            let train = table.select(&train_rows);
            let test = table.select(test_rows);

            let mut model = factory();
            model.fit(&train.features, &train.labels, n_classes)?;
            let proba = model.predict_proba(&test.features)?;
            let predicted = model.predict(&test.features)?;

            confusion.record_all(&test.labels, &predicted)?;
            let accuracy = accuracy_score(&test.labels, &predicted)?;
            log::debug!(
                "Fold {}/{}: trained on {} rows, tested on {}, accuracy {:.4}",
                fold + 1,
                folds.len(),
                train_rows.len(),
                test_rows.len(),
                accuracy
            );

            for (i, &row) in test_rows.iter().enumerate() {
                out_of_fold.push(Prediction {
                    row,
                    fold,
                    actual: test.labels[i],
                    predicted: predicted[i],
                    probabilities: proba.row(i).to_vec(),
                });
            }
            fold_metrics.push(FoldMetrics {
                fold,
                train_rows: train_rows.len(),
                test_rows: test_rows.len(),
                accuracy,
            });
        }

        self.cancel.check()?;
        let mut model = factory();
        model.fit(&table.features, &table.labels, n_classes)?;
        log::info!(
            "{}: {}-fold cross-validation accuracy {:.4}",
            model.name(),
            folds.len(),
            confusion.accuracy()
        );

        Ok(CrossValidation {
            confusion,
            folds: fold_metrics,
            out_of_fold,
            model,
        })
    }
}
