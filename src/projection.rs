use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::dataset::{ColumnData, Dataset};
use crate::error::{EvalError, Result};
use crate::Matrix;

/// What projection does with a row whose selected feature is missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Drop the row.
    #[default]
    Skip,
    /// Fail the projection with [`EvalError::MissingValue`].
    Reject,
}

/// Numeric feature matrix plus class codes: one or two features, one label.
#[derive(Clone, Debug)]
pub struct LabeledTable {
    pub feature_names: Vec<String>,
    pub features: Matrix,
    pub labels: Vec<usize>,
    pub label_name: String,
    /// Full label domain, including values no row carries.
    pub classes: Vec<String>,
    /// Index of each row in the source dataset.
    pub source_rows: Vec<usize>,
}

impl LabeledTable {
    pub fn new(
        feature_names: Vec<String>,
        features: Matrix,
        labels: Vec<usize>,
        label_name: &str,
        classes: Vec<String>,
    ) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(EvalError::InvalidFeatureSelection(
                "number of feature rows and labels must match".to_string(),
            ));
        }
        if features.ncols() != feature_names.len() {
            return Err(EvalError::InvalidFeatureSelection(
                "number of feature columns and feature names must match".to_string(),
            ));
        }
        if let Some(&label) = labels.iter().find(|&&l| l >= classes.len()) {
            return Err(EvalError::UnknownLabelValue {
                label: format!("#{label}"),
            });
        }
        let source_rows = (0..labels.len()).collect();
        Ok(Self {
            feature_names,
            features,
            labels,
            label_name: label_name.to_string(),
            classes,
            source_rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn class_index(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    /// Row count per class, aligned with `classes`.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// Copy of the given rows, in the given order. Indices may repeat.
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), rows),
            labels: rows.iter().map(|&r| self.labels[r]).collect(),
            label_name: self.label_name.clone(),
            classes: self.classes.clone(),
            source_rows: rows.iter().map(|&r| self.source_rows[r]).collect(),
        }
    }
}

/// Restricts `dataset` to one or two numeric features plus its label column.
///
/// Rows keep their input order. `feature2`, when given, must differ from
/// `feature1`; neither may be the label or a nominal column.
pub fn project(
    dataset: &Dataset,
    feature1: &str,
    feature2: Option<&str>,
    policy: MissingValuePolicy,
) -> Result<LabeledTable> {
    if feature2 == Some(feature1) {
        return Err(EvalError::InvalidFeatureSelection(format!(
            "feature '{feature1}' was selected twice"
        )));
    }

    let mut names = vec![feature1];
    names.extend(feature2);

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        columns.push(numeric_values(dataset, name)?);
    }

    let mut rows = Vec::with_capacity(dataset.n_rows());
    let mut skipped = 0;
    for row in 0..dataset.n_rows() {
        match columns.iter().position(|values| values[row].is_none()) {
            None => rows.push(row),
            Some(col) => match policy {
                MissingValuePolicy::Skip => skipped += 1,
                MissingValuePolicy::Reject => {
                    return Err(EvalError::MissingValue {
                        column: names[col].to_string(),
                        row,
                    });
                }
            },
        }
    }
    if skipped > 0 {
        log::warn!("Skipped {skipped} rows with missing values in {names:?}");
    }

    let mut features = Matrix::zeros((rows.len(), names.len()));
    for (i, &row) in rows.iter().enumerate() {
        for (j, values) in columns.iter().enumerate() {
            features[[i, j]] = values[row].unwrap_or_default();
        }
    }

    let labels = rows.iter().map(|&row| dataset.labels()[row]).collect();

    Ok(LabeledTable {
        feature_names: names.iter().map(|n| n.to_string()).collect(),
        features,
        labels,
        label_name: dataset.label_name().to_string(),
        classes: dataset.label_domain().to_vec(),
        source_rows: rows,
    })
}

fn numeric_values<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a [Option<f64>]> {
    if name == dataset.label_name() {
        return Err(EvalError::InvalidFeatureSelection(format!(
            "'{name}' is the label column"
        )));
    }
    let column = dataset.column(name).ok_or_else(|| {
        EvalError::InvalidFeatureSelection(format!("unknown feature '{name}'"))
    })?;
    match &column.data {
        ColumnData::Numeric(values) => Ok(values.as_slice()),
        ColumnData::Nominal { domain, codes } => {
            let message = match first_non_numeric_cell(domain, codes) {
                Some((row, value)) => format!(
                    "feature '{name}' is not numeric: row {row} holds '{value}' \
                     among otherwise numeric values"
                ),
                None if dataset.numeric_feature_names().is_empty() => format!(
                    "feature '{name}' is not numeric and the dataset has no numeric features"
                ),
                None => format!("feature '{name}' is not numeric"),
            };
            Err(EvalError::InvalidFeatureSelection(message))
        }
    }
}

/// For a nominal column whose values are mostly numbers, the first row whose
/// value is not one. `None` when fewer than half of the values parse.
fn first_non_numeric_cell<'a>(
    domain: &'a [String],
    codes: &[Option<usize>],
) -> Option<(usize, &'a str)> {
    let is_number = |value: &str| value.parse::<f64>().is_ok_and(f64::is_finite);
    let numbers = codes
        .iter()
        .flatten()
        .filter(|&&code| is_number(&domain[code]))
        .count();
    let present = codes.iter().flatten().count();
    if numbers == 0 || numbers * 2 < present {
        return None;
    }
    codes.iter().enumerate().find_map(|(row, code)| {
        let value = domain[(*code)?].as_str();
        (!is_number(value)).then_some((row, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, LoadOptions};
    use ndarray::array;

    fn birds() -> Dataset {
        let columns = vec![
            Column::numeric("wing", vec![10.0, 12.0, 9.0, 11.0]),
            Column::numeric_with_missing("mass", vec![Some(20.0), None, Some(18.0), Some(22.0)]),
            Column::nominal("habitat", &["forest", "wetland", "forest", "coast"]),
            Column::nominal("status", &["Resident", "Migratory", "Resident", "Migratory"]),
        ];
        Dataset::new(columns, "status").unwrap()
    }

    #[test]
    fn test_project_single_feature() {
        let table = project(&birds(), "wing", None, MissingValuePolicy::Skip).unwrap();
        assert_eq!(table.feature_names, vec!["wing"]);
        assert_eq!(table.features, array![[10.0], [12.0], [9.0], [11.0]]);
        assert_eq!(table.labels, vec![0, 1, 0, 1]);
        assert_eq!(table.classes, vec!["Resident", "Migratory"]);
    }

    #[test]
    fn test_project_two_features_skips_missing() {
        let table = project(&birds(), "mass", Some("wing"), MissingValuePolicy::Skip).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.features, array![[20.0, 10.0], [18.0, 9.0], [22.0, 11.0]]);
        assert_eq!(table.source_rows, vec![0, 2, 3]);
        assert_eq!(table.labels, vec![0, 0, 1]);
    }

    #[test]
    fn test_project_rejects_missing_when_asked() {
        let err = project(&birds(), "wing", Some("mass"), MissingValuePolicy::Reject).unwrap_err();
        match err {
            EvalError::MissingValue { column, row } => {
                assert_eq!(column, "mass");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_same_feature_twice_is_invalid() {
        let err = project(&birds(), "wing", Some("wing"), MissingValuePolicy::Skip).unwrap_err();
        assert!(matches!(err, EvalError::InvalidFeatureSelection(_)));
    }

    #[test]
    fn test_nominal_feature_is_invalid() {
        let err = project(&birds(), "habitat", None, MissingValuePolicy::Skip).unwrap_err();
        assert!(matches!(err, EvalError::InvalidFeatureSelection(_)));
        let err = project(&birds(), "wing", Some("habitat"), MissingValuePolicy::Skip).unwrap_err();
        assert!(matches!(err, EvalError::InvalidFeatureSelection(_)));
    }

    #[test]
    fn test_label_and_unknown_features_are_invalid() {
        let err = project(&birds(), "status", None, MissingValuePolicy::Skip).unwrap_err();
        assert!(matches!(err, EvalError::InvalidFeatureSelection(_)));
        let err = project(&birds(), "beak", None, MissingValuePolicy::Skip).unwrap_err();
        assert!(matches!(err, EvalError::InvalidFeatureSelection(_)));
    }

    #[test]
    fn test_no_numeric_features() {
        let columns = vec![
            Column::nominal("habitat", &["forest", "wetland"]),
            Column::nominal("status", &["A", "B"]),
        ];
        let dataset = Dataset::new(columns, "status").unwrap();
        let err = project(&dataset, "habitat", None, MissingValuePolicy::Skip).unwrap_err();
        assert!(err.to_string().contains("no numeric features"));
    }

    #[test]
    fn test_stray_text_in_numeric_column_names_the_cell() {
        let text = "wing,status\n10.5,A\n12.x,B\n9.1,A\n11.0,B\n";
        let dataset = Dataset::from_reader(text.as_bytes(), &LoadOptions::new("status")).unwrap();
        let err = project(&dataset, "wing", None, MissingValuePolicy::Skip).unwrap_err();
        match err {
            EvalError::InvalidFeatureSelection(message) => {
                assert!(message.contains("'wing'"), "{message}");
                assert!(message.contains("row 1"), "{message}");
                assert!(message.contains("'12.x'"), "{message}");
                assert!(!message.contains("no numeric features"), "{message}");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_mostly_text_column_is_plainly_not_numeric() {
        let err = project(&birds(), "habitat", None, MissingValuePolicy::Skip).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'habitat' is not numeric"), "{message}");
        assert!(!message.contains("row"), "{message}");
    }

    #[test]
    fn test_select_repeats_rows() {
        let table = project(&birds(), "wing", None, MissingValuePolicy::Skip).unwrap();
        let picked = table.select(&[3, 3, 0]);
        assert_eq!(picked.features, array![[11.0], [11.0], [10.0]]);
        assert_eq!(picked.labels, vec![1, 1, 0]);
        assert_eq!(picked.source_rows, vec![3, 3, 0]);
    }
}
