use ndarray::{Array1, Axis};
use ndarray_rand::{RandomExt, SamplingStrategy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{EvalError, Result};
use crate::projection::LabeledTable;

/// A [`LabeledTable`] resampled so every class has the same row count.
///
/// Rows may repeat; `source_rows` still points at the originating dataset row.
#[derive(Clone, Debug)]
pub struct BalancedTable {
    table: LabeledTable,
}

impl BalancedTable {
    pub fn table(&self) -> &LabeledTable {
        &self.table
    }

    pub fn into_inner(self) -> LabeledTable {
        self.table
    }

    pub fn n_rows(&self) -> usize {
        self.table.n_rows()
    }
}

/// Uniform class-bias resampling with replacement.
#[derive(Clone, Debug)]
pub struct ClassBalancer {
    seed: u64,
}

impl ClassBalancer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Draws `round(n_rows / n_classes)` rows per class, uniformly and with
    /// replacement from that class's rows, then shuffles the result.
    ///
    /// Fails with [`EvalError::EmptyClass`] if any label value has no rows.
    pub fn balance(&self, table: &LabeledTable) -> Result<BalancedTable> {
        let counts = table.class_counts();
        if let Some(empty) = counts.iter().position(|&n| n == 0) {
            return Err(EvalError::EmptyClass {
                label: table.classes[empty].clone(),
            });
        }
        if counts.is_empty() {
            return Err(EvalError::InvalidFeatureSelection(
                "the projected table has no rows".to_string(),
            ));
        }

        let target = (table.n_rows() as f64 / counts.len() as f64).round() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut rows = Vec::with_capacity(target * counts.len());
        for class in 0..counts.len() {
            let members: Array1<usize> = table
                .labels
                .iter()
                .enumerate()
                .filter(|&(_, &label)| label == class)
                .map(|(row, _)| row)
                .collect();
            let drawn = members.sample_axis_using(
                Axis(0),
                target,
                SamplingStrategy::WithReplacement,
                &mut rng,
            );
            rows.extend(drawn.iter().copied());
        }
        rows.shuffle(&mut rng);

        let balanced = table.select(&rows);
        log::info!(
            "Class counts before balancing: {:?}, after: {:?}",
            named_counts(table, &counts),
            named_counts(&balanced, &balanced.class_counts())
        );

        Ok(BalancedTable { table: balanced })
    }
}

fn named_counts<'a>(table: &'a LabeledTable, counts: &[usize]) -> Vec<(&'a str, usize)> {
    table
        .classes
        .iter()
        .map(String::as_str)
        .zip(counts.iter().copied())
        .collect()
}
