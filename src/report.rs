use std::fmt;

use crate::metrics::ClassMetrics;
use crate::pipeline::{EvaluationResult, EvaluationWarning};

impl EvaluationResult {
    /// Plain-text report in the layout of a classic cross-validation summary.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    fn write_text(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cm = &self.confusion_matrix;
        let total = cm.total();
        let percent = |n: usize| {
            if total == 0 {
                0.0
            } else {
                100.0 * n as f64 / total as f64
            }
        };

        writeln!(out, "=== Classifier: {} ===", self.classifier)?;
        writeln!(out, "Features: {}", self.features.join(", "))?;
        writeln!(out, "Label:    {}", self.label)?;
        writeln!(
            out,
            "Balanced class counts: {} -> {}",
            format_counts(&self.class_counts_before),
            format_counts(&self.class_counts_after)
        )?;
        writeln!(out)?;

        writeln!(out, "=== Cross-validation summary ({} folds) ===", self.folds.len())?;
        writeln!(
            out,
            "{:<34}{:>8}{:>12.4} %",
            "Correctly Classified Instances",
            cm.correct(),
            percent(cm.correct())
        )?;
        writeln!(
            out,
            "{:<34}{:>8}{:>12.4} %",
            "Incorrectly Classified Instances",
            cm.incorrect(),
            percent(cm.incorrect())
        )?;
        writeln!(out, "{:<34}{:>8.4}", "Kappa statistic", self.kappa)?;
        writeln!(out, "{:<34}{:>8}", "Total Number of Instances", total)?;
        writeln!(out)?;

        writeln!(out, "=== Detailed Accuracy By Class ===")?;
        writeln!(
            out,
            "{:>10} {:>10} {:>10} {:>8}  Class",
            "Precision", "Recall", "F-Measure", "Support"
        )?;
        for metrics in self.per_class.iter().chain(std::iter::once(&self.weighted)) {
            write_class_row(out, metrics)?;
        }
        writeln!(out)?;

        writeln!(out, "=== Confusion Matrix ===")?;
        write!(out, "{}", cm)?;
        writeln!(out)?;

        writeln!(out, "=== Per-fold accuracy ===")?;
        for fold in &self.folds {
            writeln!(
                out,
                "Fold {:>2}: {:>7.4}  ({} train / {} test)",
                fold.fold + 1,
                fold.accuracy,
                fold.train_rows,
                fold.test_rows
            )?;
        }
        writeln!(out)?;

        writeln!(out, "=== ROC ===")?;
        match &self.roc {
            Some(roc) => {
                writeln!(
                    out,
                    "Positive: {}, negative: {}",
                    roc.positive_label, roc.negative_label
                )?;
                writeln!(out, "Area under ROC: {:.4} ({} points)", roc.auc(), roc.points.len())?;
            }
            None => {
                for warning in &self.warnings {
                    match warning {
                        EvaluationWarning::NotBinary { classes } => writeln!(
                            out,
                            "Skipped: the label has {} values, ROC needs exactly 2",
                            classes
                        )?,
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f)
    }
}

fn write_class_row(out: &mut fmt::Formatter<'_>, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        out,
        "{:>10.3} {:>10.3} {:>10.3} {:>8}  {}",
        m.precision, m.recall, m.f_measure, m.support, m.label
    )
}

fn format_counts(counts: &[crate::pipeline::ClassCount]) -> String {
    counts
        .iter()
        .map(|c| format!("{}={}", c.label, c.count))
        .collect::<Vec<_>>()
        .join(" ")
}
