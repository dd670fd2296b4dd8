use std::fmt;

use serde::Serialize;

use crate::error::{EvalError, Result};

/// Counts of (actual, predicted) label pairs over a fixed label domain.
///
/// Row index is the actual class, column index the predicted class.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Vec<Vec<usize>>,
}

/// Per-class detail as printed in the evaluation report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    pub support: usize,
}

impl ConfusionMatrix {
    pub fn new(labels: Vec<String>) -> Self {
        let n = labels.len();
        Self {
            labels,
            counts: vec![vec![0; n]; n],
        }
    }

    pub fn record(&mut self, actual: usize, predicted: usize) {
        self.counts[actual][predicted] += 1;
    }

    /// Adds every pair of `actual` and `predicted`.
    pub fn record_all(&mut self, actual: &[usize], predicted: &[usize]) -> Result<()> {
        if actual.len() != predicted.len() {
            return Err(EvalError::PredictionMismatch(format!(
                "{} actual labels but {} predictions",
                actual.len(),
                predicted.len()
            )));
        }
        let n = self.n_classes();
        for (&a, &p) in actual.iter().zip(predicted) {
            if a >= n || p >= n {
                return Err(EvalError::PredictionMismatch(format!(
                    "class index outside 0..{n} in confusion matrix"
                )));
            }
            self.record(a, p);
        }
        Ok(())
    }

    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.n_classes()).map(|c| self.counts[c][c]).sum()
    }

    pub fn incorrect(&self) -> usize {
        self.total() - self.correct()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    pub fn true_positives(&self, class: usize) -> usize {
        self.counts[class][class]
    }

    pub fn false_positives(&self, class: usize) -> usize {
        (0..self.n_classes())
            .filter(|&actual| actual != class)
            .map(|actual| self.counts[actual][class])
            .sum()
    }

    pub fn false_negatives(&self, class: usize) -> usize {
        (0..self.n_classes())
            .filter(|&predicted| predicted != class)
            .map(|predicted| self.counts[class][predicted])
            .sum()
    }

    pub fn true_negatives(&self, class: usize) -> usize {
        self.total()
            - self.true_positives(class)
            - self.false_positives(class)
            - self.false_negatives(class)
    }

    /// Rows whose actual class is `class`.
    pub fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    pub fn precision(&self, class: usize) -> f64 {
        let tp = self.true_positives(class);
        ratio(tp, tp + self.false_positives(class))
    }

    pub fn recall(&self, class: usize) -> f64 {
        let tp = self.true_positives(class);
        ratio(tp, tp + self.false_negatives(class))
    }

    /// Harmonic mean of precision and recall; 0 when both are 0.
    pub fn f_measure(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Cohen's kappa: agreement corrected for chance.
    pub fn kappa(&self) -> f64 {
        let total = self.total() as f64;
        if total == 0.0 {
            return 0.0;
        }
        let observed = self.correct() as f64 / total;
        let expected: f64 = (0..self.n_classes())
            .map(|c| {
                let predicted: usize = self.counts.iter().map(|row| row[c]).sum();
                self.support(c) as f64 * predicted as f64
            })
            .sum::<f64>()
            / (total * total);
        if (1.0 - expected).abs() < f64::EPSILON {
            if (observed - 1.0).abs() < f64::EPSILON { 1.0 } else { 0.0 }
        } else {
            (observed - expected) / (1.0 - expected)
        }
    }

    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        self.labels
            .iter()
            .enumerate()
            .map(|(c, label)| ClassMetrics {
                label: label.clone(),
                precision: self.precision(c),
                recall: self.recall(c),
                f_measure: self.f_measure(c),
                support: self.support(c),
            })
            .collect()
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Support-weighted mean of per-class metrics, labelled "Weighted Avg.".
pub fn weighted_average(metrics: &[ClassMetrics]) -> ClassMetrics {
    let support: usize = metrics.iter().map(|m| m.support).sum();
    let weighted = |value: fn(&ClassMetrics) -> f64| {
        if support == 0 {
            return 0.0;
        }
        metrics
            .iter()
            .map(|m| value(m) * m.support as f64)
            .sum::<f64>()
            / support as f64
    };
    ClassMetrics {
        label: "Weighted Avg.".to_string(),
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f_measure: weighted(|m| m.f_measure),
        support,
    }
}

/// Fraction of positions where both slices agree.
pub fn accuracy_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(EvalError::PredictionMismatch(
            "y_true and y_pred must have the same length".to_string(),
        ));
    }
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    Ok(ratio(correct, y_true.len()))
}

/// Column letter used in the matrix legend: a..z, then aa, ab, ...
fn column_tag(mut index: usize) -> String {
    let mut tag = Vec::new();
    loop {
        tag.push(b'a' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    tag.reverse();
    String::from_utf8_lossy(&tag).into_owned()
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .counts
            .iter()
            .flatten()
            .map(|c| c.to_string().len())
            .chain(std::iter::once(column_tag(self.n_classes().saturating_sub(1)).len()))
            .max()
            .unwrap_or(1);

        for c in 0..self.n_classes() {
            write!(f, " {:>width$}", column_tag(c))?;
        }
        writeln!(f, "   <-- classified as")?;
        for (actual, row) in self.counts.iter().enumerate() {
            for count in row {
                write!(f, " {:>width$}", count)?;
            }
            writeln!(f, " | {} = {}", column_tag(actual), self.labels[actual])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary() -> ConfusionMatrix {
        // actual A: 40 right, 10 wrong; actual B: 5 wrong, 45 right
        let mut cm = ConfusionMatrix::new(vec!["A".to_string(), "B".to_string()]);
        for _ in 0..40 {
            cm.record(0, 0);
        }
        for _ in 0..10 {
            cm.record(0, 1);
        }
        for _ in 0..5 {
            cm.record(1, 0);
        }
        for _ in 0..45 {
            cm.record(1, 1);
        }
        cm
    }

    #[test]
    fn test_counts_and_accuracy() {
        let cm = binary();
        assert_eq!(cm.total(), 100);
        assert_eq!(cm.correct(), 85);
        assert_eq!(cm.incorrect(), 15);
        assert!((cm.accuracy() - 0.85).abs() < 1e-10);
        assert_eq!(cm.true_positives(0), 40);
        assert_eq!(cm.false_positives(0), 5);
        assert_eq!(cm.false_negatives(0), 10);
        assert_eq!(cm.true_negatives(0), 45);
    }

    #[test]
    fn test_precision_recall_f_measure() {
        let cm = binary();
        assert!((cm.precision(0) - 40.0 / 45.0).abs() < 1e-10);
        assert!((cm.recall(0) - 0.8).abs() < 1e-10);
        let p = 40.0 / 45.0;
        let expected = 2.0 * p * 0.8 / (p + 0.8);
        assert!((cm.f_measure(0) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_kappa() {
        let cm = binary();
        // p_o = 0.85, p_e = (50*45 + 50*55) / 100^2 = 0.5
        assert!((cm.kappa() - 0.7).abs() < 1e-10);
    }

    #[test]
    fn test_zero_denominators() {
        let mut cm = ConfusionMatrix::new(vec!["A".to_string(), "B".to_string()]);
        cm.record(0, 0);
        assert_eq!(cm.precision(1), 0.0);
        assert_eq!(cm.recall(1), 0.0);
        assert_eq!(cm.f_measure(1), 0.0);
        assert_eq!(ConfusionMatrix::new(vec!["A".to_string()]).accuracy(), 0.0);
    }

    #[test]
    fn test_weighted_average() {
        let per_class = binary().class_metrics();
        let avg = weighted_average(&per_class);
        assert_eq!(avg.support, 100);
        assert!((avg.recall - 0.85).abs() < 1e-10);
    }

    #[test]
    fn test_record_all_checks_lengths() {
        let mut cm = ConfusionMatrix::new(vec!["A".to_string(), "B".to_string()]);
        assert!(matches!(
            cm.record_all(&[0, 1], &[0]),
            Err(EvalError::PredictionMismatch(_))
        ));
        assert!(matches!(
            cm.record_all(&[0, 2], &[0, 1]),
            Err(EvalError::PredictionMismatch(_))
        ));
        assert!(matches!(
            accuracy_score(&[0, 1], &[1]),
            Err(EvalError::PredictionMismatch(_))
        ));
        cm.record_all(&[0, 1, 1], &[0, 1, 0]).unwrap();
        assert_eq!(cm.get(1, 0), 1);
    }

    #[test]
    fn test_accuracy_score() {
        assert!((accuracy_score(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap() - 0.75).abs() < 1e-10);
        assert!(accuracy_score(&[0], &[0, 1]).is_err());
    }

    #[test]
    fn test_display_legend() {
        let text = binary().to_string();
        assert!(text.contains("<-- classified as"));
        assert!(text.contains("| a = A"));
        assert!(text.contains("| b = B"));
        assert_eq!(column_tag(26), "aa");
    }
}
