use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierKind;
use crate::dataset::{ColumnKind, Dataset, LoadOptions};
use crate::error::{EvalError, Result};
use crate::features::default_feature_selection;
use crate::pipeline::EvaluationRequest;
use crate::projection::MissingValuePolicy;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}', expected text or json")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        })
    }
}

/// Settings for one evaluation run, as read from a JSON file.
///
/// Every field is optional in the file; absent fields take the defaults
/// below. Command-line flags are applied on top.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    pub label_column: String,
    pub delimiter: char,
    /// Columns that must load as numbers; a stray text cell fails the load.
    pub numeric_columns: Vec<String>,
    pub feature1: Option<String>,
    pub feature2: Option<String>,
    pub classifier: String,
    pub folds: usize,
    pub seed: u64,
    pub missing_values: MissingValuePolicy,
    pub positive_label: Option<String>,
    pub negative_label: Option<String>,
    pub output: OutputFormat,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            label_column: "class".to_string(),
            delimiter: ',',
            numeric_columns: Vec::new(),
            feature1: None,
            feature2: None,
            classifier: ClassifierKind::RandomForest.display_name().to_string(),
            folds: 10,
            seed: 1,
            missing_values: MissingValuePolicy::Skip,
            positive_label: None,
            negative_label: None,
            output: OutputFormat::Text,
        }
    }
}

impl EvaluationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EvalError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| EvalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that cannot work for any dataset.
    pub fn validate(&self) -> Result<()> {
        if self.folds < 2 {
            return Err(EvalError::Config(format!(
                "folds must be at least 2, got {}",
                self.folds
            )));
        }
        if self.label_column.is_empty() {
            return Err(EvalError::Config("label_column must not be empty".to_string()));
        }
        if self.numeric_columns.contains(&self.label_column) {
            return Err(EvalError::Config(format!(
                "label column '{}' cannot be declared numeric",
                self.label_column
            )));
        }
        if !self.delimiter.is_ascii() {
            return Err(EvalError::Config(format!(
                "delimiter '{}' must be a single ASCII character",
                self.delimiter
            )));
        }
        ClassifierKind::from_name(&self.classifier)?;
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        self.numeric_columns.iter().fold(
            LoadOptions::new(&self.label_column).delimiter(self.delimiter as u8),
            |options, name| options.column_kind(name, ColumnKind::Numeric),
        )
    }

    /// Request for `dataset`; unset features fall back to the first two
    /// numeric features.
    pub fn request_for(&self, dataset: &Dataset) -> Result<EvaluationRequest> {
        let numeric = dataset.numeric_feature_names();
        let (default1, default2) = default_feature_selection(&numeric);

        let feature1 = self.feature1.clone().or(default1).ok_or_else(|| {
            EvalError::InvalidFeatureSelection("the dataset has no numeric features".to_string())
        })?;
        let feature2 = match (&self.feature1, &self.feature2) {
            (_, Some(f)) => Some(f.clone()),
            (None, None) => default2,
            (Some(_), None) => None,
        };

        Ok(EvaluationRequest {
            feature1,
            feature2,
            classifier: self.classifier.clone(),
            folds: self.folds,
            seed: self.seed,
            missing_values: self.missing_values,
            positive_label: self.positive_label.clone(),
            negative_label: self.negative_label.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    #[test]
    fn test_defaults() {
        let config = EvaluationConfig::from_json("{}").unwrap();
        assert_eq!(config, EvaluationConfig::default());
        assert_eq!(config.folds, 10);
        assert_eq!(config.classifier, "Random Forest");
        assert_eq!(config.output, OutputFormat::Text);
    }

    #[test]
    fn test_partial_file() {
        let config = EvaluationConfig::from_json(
            r#"{"label_column": "species", "folds": 5, "missing_values": "reject", "output": "json"}"#,
        )
        .unwrap();
        assert_eq!(config.label_column, "species");
        assert_eq!(config.folds, 5);
        assert_eq!(config.missing_values, MissingValuePolicy::Reject);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.seed, 1);
    }

    #[test]
    fn test_invalid_files() {
        assert!(matches!(
            EvaluationConfig::from_json(r#"{"folds": 1}"#),
            Err(EvalError::Config(_))
        ));
        assert!(matches!(
            EvaluationConfig::from_json(r#"{"colour": "red"}"#),
            Err(EvalError::Config(_))
        ));
        assert!(matches!(
            EvaluationConfig::from_json(r#"{"classifier": "Perceptron"}"#),
            Err(EvalError::UnknownClassifier(_))
        ));
    }

    #[test]
    fn test_declared_numeric_columns_reach_the_loader() {
        let config =
            EvaluationConfig::from_json(r#"{"label_column": "status", "numeric_columns": ["wing"]}"#)
                .unwrap();
        let options = config.load_options();
        assert_eq!(options.column_kinds.get("wing"), Some(&ColumnKind::Numeric));

        let text = "wing,status\n10.5,A\n12.x,B\n9.1,A\n11.0,B\n";
        let err = Dataset::from_reader(text.as_bytes(), &options).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        match err {
            EvalError::DatasetLoad(message) => {
                assert!(message.contains("line 3"), "{message}");
                assert!(message.contains("'12.x'"), "{message}");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_label_cannot_be_declared_numeric() {
        assert!(matches!(
            EvaluationConfig::from_json(r#"{"label_column": "status", "numeric_columns": ["status"]}"#),
            Err(EvalError::Config(_))
        ));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_request_falls_back_to_default_features() {
        let dataset = Dataset::new(
            vec![
                Column::numeric("a", vec![1.0, 2.0]),
                Column::numeric("b", vec![3.0, 4.0]),
                Column::nominal("class", &["x", "y"]),
            ],
            "class",
        )
        .unwrap();

        let request = EvaluationConfig::default().request_for(&dataset).unwrap();
        assert_eq!(request.feature1, "a");
        assert_eq!(request.feature2.as_deref(), Some("b"));

        let config = EvaluationConfig {
            feature1: Some("b".to_string()),
            ..EvaluationConfig::default()
        };
        let request = config.request_for(&dataset).unwrap();
        assert_eq!(request.feature1, "b");
        assert_eq!(request.feature2, None);
    }
}
