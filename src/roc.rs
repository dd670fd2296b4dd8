use serde::Serialize;

use crate::classifier::Classifier;
use crate::error::{EvalError, Result};
use crate::projection::LabeledTable;

/// One operating point: (false-positive rate, true-positive rate).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RocPoint {
    pub false_positive_rate: f64,
    pub true_positive_rate: f64,
}

impl RocPoint {
    pub fn new(false_positive_rate: f64, true_positive_rate: f64) -> Self {
        Self {
            false_positive_rate,
            true_positive_rate,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RocCurve {
    pub positive_label: String,
    pub negative_label: String,
    pub points: Vec<RocPoint>,
}

impl RocCurve {
    /// Scores every row of `table` with `model` and builds the curve of the
    /// positive label against the negative one.
    ///
    /// The label domain must have exactly two values and both labels must
    /// belong to it. Rows outside the two labels cannot exist in a binary
    /// table, so every row is scored.
    pub fn build(
        model: &dyn Classifier,
        table: &LabeledTable,
        positive: &str,
        negative: &str,
    ) -> Result<Self> {
        let (positive_idx, _) = validate_labels(table, positive, negative)?;

        let proba = model.predict_proba(&table.features)?;
        let scored: Vec<(bool, f64)> = table
            .labels
            .iter()
            .zip(proba.column(positive_idx))
            .map(|(&label, &p)| (label == positive_idx, p))
            .collect();

        Ok(Self {
            positive_label: positive.to_string(),
            negative_label: negative.to_string(),
            points: roc_points(&scored)?,
        })
    }

    /// Area under the curve by the trapezoidal rule.
    pub fn auc(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| {
                let width = w[1].false_positive_rate - w[0].false_positive_rate;
                width * (w[0].true_positive_rate + w[1].true_positive_rate) / 2.0
            })
            .sum()
    }
}

/// Checks a positive/negative pair against a binary table and returns their
/// class indices.
pub fn validate_labels(
    table: &LabeledTable,
    positive: &str,
    negative: &str,
) -> Result<(usize, usize)> {
    if table.n_classes() != 2 {
        return Err(EvalError::NotBinaryClassification {
            classes: table.n_classes(),
        });
    }
    let index = |label: &str| {
        table
            .class_index(label)
            .ok_or_else(|| EvalError::UnknownLabelValue {
                label: label.to_string(),
            })
    };
    let positive_idx = index(positive)?;
    let negative_idx = index(negative)?;
    if positive_idx == negative_idx {
        return Err(EvalError::Config(format!(
            "positive and negative label are both '{positive}'"
        )));
    }
    Ok((positive_idx, negative_idx))
}

/// Walks `(is_positive, probability)` pairs from the highest probability
/// down and emits `(FP / N, TP / P)` after each group of equal
/// probabilities.
///
/// The curve starts at (0, 0) and ends at (1, 1). Sorting is stable, so equal
/// probabilities keep their input order.
pub fn roc_points(scored: &[(bool, f64)]) -> Result<Vec<RocPoint>> {
    let positives = scored.iter().filter(|(p, _)| *p).count();
    let negatives = scored.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(EvalError::DegenerateRocInput {
            positives,
            negatives,
        });
    }

    let mut sorted = scored.to_vec();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let p = positives as f64;
    let n = negatives as f64;
    let mut points = vec![RocPoint::new(0.0, 0.0)];
    let (mut tp, mut fp) = (0usize, 0usize);

    for (i, &(is_positive, probability)) in sorted.iter().enumerate() {
        if is_positive {
            tp += 1;
        } else {
            fp += 1;
        }
        let group_ends = sorted
            .get(i + 1)
            .is_none_or(|next| next.1.total_cmp(&probability).is_ne());
        if group_ends {
            points.push(RocPoint::new(fp as f64 / n, tp as f64 / p));
        }
    }

    if points.last() != Some(&RocPoint::new(1.0, 1.0)) {
        points.push(RocPoint::new(1.0, 1.0));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Matrix;
    use ndarray::array;

    fn as_pairs(points: &[RocPoint]) -> Vec<(f64, f64)> {
        points
            .iter()
            .map(|p| (p.false_positive_rate, p.true_positive_rate))
            .collect()
    }

    #[test]
    fn test_perfect_separation() {
        let scored = [(true, 0.9), (true, 0.8), (false, 0.2), (false, 0.1)];
        let points = roc_points(&scored).unwrap();
        assert_eq!(
            as_pairs(&points),
            vec![(0.0, 0.0), (0.0, 0.5), (0.0, 1.0), (0.5, 1.0), (1.0, 1.0)]
        );
    }

    #[test]
    fn test_perfect_separation_with_tied_scores() {
        let scored = [(true, 1.0), (false, 0.0), (true, 1.0), (false, 0.0)];
        let points = roc_points(&scored).unwrap();
        assert_eq!(as_pairs(&points), vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
    }

    #[test]
    fn test_inverse_separation() {
        let scored = [(false, 0.9), (true, 0.1)];
        let points = roc_points(&scored).unwrap();
        assert_eq!(as_pairs(&points), vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let curve = RocCurve {
            positive_label: "A".into(),
            negative_label: "B".into(),
            points,
        };
        assert_eq!(curve.auc(), 0.0);
    }

    #[test]
    fn test_ties_form_one_threshold() {
        let scored = [(true, 0.5), (false, 0.5), (true, 0.5), (false, 0.5)];
        let points = roc_points(&scored).unwrap();
        assert_eq!(as_pairs(&points), vec![(0.0, 0.0), (1.0, 1.0)]);
    }

    #[test]
    fn test_interleaved_scores() {
        let scored = [(true, 0.9), (false, 0.7), (true, 0.6), (false, 0.3)];
        let points = roc_points(&scored).unwrap();
        assert_eq!(
            as_pairs(&points),
            vec![(0.0, 0.0), (0.0, 0.5), (0.5, 0.5), (0.5, 1.0), (1.0, 1.0)]
        );
        let curve = RocCurve {
            positive_label: "A".into(),
            negative_label: "B".into(),
            points,
        };
        assert!((curve.auc() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_points_are_monotonic_and_deterministic() {
        let scored: Vec<(bool, f64)> = (0..50)
            .map(|i| (i % 3 == 0, ((i * 37) % 11) as f64 / 10.0))
            .collect();
        let a = roc_points(&scored).unwrap();
        let b = roc_points(&scored).unwrap();
        assert_eq!(a, b);
        for w in a.windows(2) {
            assert!(w[1].false_positive_rate >= w[0].false_positive_rate);
            assert!(w[1].true_positive_rate >= w[0].true_positive_rate);
        }
        assert_eq!(a.first(), Some(&RocPoint::new(0.0, 0.0)));
        assert_eq!(a.last(), Some(&RocPoint::new(1.0, 1.0)));
    }

    #[test]
    fn test_degenerate_input() {
        match roc_points(&[(true, 0.4), (true, 0.6)]) {
            Err(EvalError::DegenerateRocInput {
                positives,
                negatives,
            }) => assert_eq!((positives, negatives), (2, 0)),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(roc_points(&[]).is_err());
    }

    #[derive(Debug)]
    struct Fixed(Matrix);

    impl Classifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fit(&mut self, _x: &Matrix, _y: &[usize], _n_classes: usize) -> Result<()> {
            Ok(())
        }

        fn predict_proba(&self, _x: &Matrix) -> Result<Matrix> {
            Ok(self.0.clone())
        }
    }

    fn binary_table() -> LabeledTable {
        LabeledTable::new(
            vec!["x".to_string()],
            array![[0.0], [1.0], [2.0]],
            vec![0, 1, 0],
            "class",
            vec!["yes".to_string(), "no".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_build_scores_the_positive_column() {
        let model = Fixed(array![[0.9, 0.1], [0.2, 0.8], [0.7, 0.3]]);
        let curve = RocCurve::build(&model, &binary_table(), "yes", "no").unwrap();
        assert_eq!(as_pairs(&curve.points), vec![(0.0, 0.0), (0.0, 0.5), (0.0, 1.0), (1.0, 1.0)]);
        assert_eq!(curve.auc(), 1.0);

        let flipped = RocCurve::build(&model, &binary_table(), "no", "yes").unwrap();
        assert_eq!(flipped.positive_label, "no");
        assert_eq!(
            as_pairs(&flipped.points),
            vec![(0.0, 0.0), (0.0, 1.0), (0.5, 1.0), (1.0, 1.0)]
        );
    }

    #[test]
    fn test_build_rejects_bad_labels() {
        let model = Fixed(array![[0.5, 0.5], [0.5, 0.5], [0.5, 0.5]]);
        let table = binary_table();
        assert!(matches!(
            RocCurve::build(&model, &table, "maybe", "no"),
            Err(EvalError::UnknownLabelValue { .. })
        ));
        assert!(matches!(
            RocCurve::build(&model, &table, "yes", "yes"),
            Err(EvalError::Config(_))
        ));

        let three = LabeledTable::new(
            vec!["x".to_string()],
            array![[0.0]],
            vec![0],
            "class",
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        )
        .unwrap();
        assert!(matches!(
            RocCurve::build(&model, &three, "a", "b"),
            Err(EvalError::NotBinaryClassification { classes: 3 })
        ));
    }
}
