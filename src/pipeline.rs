//! One evaluation request from dataset to ROC curve.
//!
//! The pipeline borrows the dataset and owns everything it derives from it:
//! projecting, balancing and the fold models all produce fresh values, so a
//! request never alters the dataset or a later request.

use serde::Serialize;

use crate::balance::ClassBalancer;
use crate::classifier::{Classifier, ClassifierKind};
use crate::cross_validation::{CancelToken, CrossValidator, FoldMetrics};
use crate::dataset::Dataset;
use crate::error::{EvalError, Result};
use crate::metrics::{weighted_average, ClassMetrics, ConfusionMatrix};
use crate::projection::{project, LabeledTable, MissingValuePolicy};
use crate::roc::{validate_labels, RocCurve};

#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationRequest {
    pub feature1: String,
    pub feature2: Option<String>,
    pub classifier: String,
    pub folds: usize,
    pub seed: u64,
    pub missing_values: MissingValuePolicy,
    pub positive_label: Option<String>,
    pub negative_label: Option<String>,
}

impl EvaluationRequest {
    pub fn new(feature1: &str, classifier: &str) -> Self {
        Self {
            feature1: feature1.to_string(),
            feature2: None,
            classifier: classifier.to_string(),
            folds: 10,
            seed: 1,
            missing_values: MissingValuePolicy::Skip,
            positive_label: None,
            negative_label: None,
        }
    }

    pub fn feature2(mut self, feature2: &str) -> Self {
        self.feature2 = Some(feature2.to_string());
        self
    }

    pub fn folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn missing_values(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_values = policy;
        self
    }

    pub fn positive_label(mut self, label: &str) -> Self {
        self.positive_label = Some(label.to_string());
        self
    }

    pub fn negative_label(mut self, label: &str) -> Self {
        self.negative_label = Some(label.to_string());
        self
    }
}

/// Conditions that leave the evaluation usable but incomplete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationWarning {
    /// The label domain is not binary, so no ROC curve was built.
    NotBinary { classes: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub label: String,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct EvaluationResult {
    pub classifier: String,
    pub features: Vec<String>,
    pub label: String,
    pub class_counts_before: Vec<ClassCount>,
    pub class_counts_after: Vec<ClassCount>,
    pub folds: Vec<FoldMetrics>,
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub kappa: f64,
    pub per_class: Vec<ClassMetrics>,
    pub weighted: ClassMetrics,
    pub roc: Option<RocCurve>,
    pub warnings: Vec<EvaluationWarning>,
}

impl EvaluationResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

pub fn run_evaluation(dataset: &Dataset, request: &EvaluationRequest) -> Result<EvaluationResult> {
    run_evaluation_with_cancel(dataset, request, &CancelToken::new())
}

pub fn run_evaluation_with_cancel(
    dataset: &Dataset,
    request: &EvaluationRequest,
    cancel: &CancelToken,
) -> Result<EvaluationResult> {
    let kind = ClassifierKind::from_name(&request.classifier)?;
    let seed = request.seed;
    run_with(dataset, request, cancel, kind.display_name(), || kind.build(seed))
}

/// Runs the pipeline with classifiers from `factory` instead of the
/// registry. `request.classifier` is ignored.
pub fn run_evaluation_with<F>(
    dataset: &Dataset,
    request: &EvaluationRequest,
    cancel: &CancelToken,
    factory: F,
) -> Result<EvaluationResult>
where
    F: Fn() -> Box<dyn Classifier>,
{
    let name = factory().name().to_string();
    run_with(dataset, request, cancel, &name, factory)
}

fn run_with<F>(
    dataset: &Dataset,
    request: &EvaluationRequest,
    cancel: &CancelToken,
    classifier: &str,
    factory: F,
) -> Result<EvaluationResult>
where
    F: Fn() -> Box<dyn Classifier>,
{
    log::info!(
        "Evaluating {} on {} with features {:?}",
        classifier,
        dataset.label_name(),
        std::iter::once(&request.feature1)
            .chain(request.feature2.as_ref())
            .collect::<Vec<_>>()
    );

    let table = project(
        dataset,
        &request.feature1,
        request.feature2.as_deref(),
        request.missing_values,
    )?;
    let roc_labels = resolve_roc_labels(&table, request)?;

    let class_counts_before = named_counts(&table);
    let balanced = ClassBalancer::new(request.seed).balance(&table)?;
    let class_counts_after = named_counts(balanced.table());

    let cv = CrossValidator::new(request.folds, request.seed)
        .with_cancel(cancel.clone())
        .evaluate_with(balanced.table(), factory)?;

    let mut warnings = Vec::new();
    let roc = match roc_labels {
        Some((positive, negative)) => Some(RocCurve::build(
            cv.model.as_ref(),
            balanced.table(),
            &positive,
            &negative,
        )?),
        None => {
            log::warn!(
                "ROC curve skipped: label '{}' has {} values, ROC needs exactly 2",
                table.label_name,
                table.n_classes()
            );
            warnings.push(EvaluationWarning::NotBinary {
                classes: table.n_classes(),
            });
            None
        }
    };

    let per_class = cv.confusion.class_metrics();
    Ok(EvaluationResult {
        classifier: classifier.to_string(),
        features: table.feature_names.clone(),
        label: table.label_name.clone(),
        class_counts_before,
        class_counts_after,
        folds: cv.folds,
        accuracy: cv.confusion.accuracy(),
        kappa: cv.confusion.kappa(),
        weighted: weighted_average(&per_class),
        per_class,
        confusion_matrix: cv.confusion,
        roc,
        warnings,
    })
}

/// Picks the ROC labels up front so a bad label fails before any training.
///
/// `None` means the domain is not binary and the curve is skipped.
fn resolve_roc_labels(
    table: &LabeledTable,
    request: &EvaluationRequest,
) -> Result<Option<(String, String)>> {
    if table.n_classes() != 2 {
        return Ok(None);
    }
    let positive = match &request.positive_label {
        Some(label) => label.clone(),
        None => match &request.negative_label {
            Some(negative) => other_class(table, negative)?,
            None => table.classes[0].clone(),
        },
    };
    let negative = match &request.negative_label {
        Some(label) => label.clone(),
        None => other_class(table, &positive)?,
    };
    validate_labels(table, &positive, &negative)?;
    Ok(Some((positive, negative)))
}

fn other_class(table: &LabeledTable, label: &str) -> Result<String> {
    let index = table
        .class_index(label)
        .ok_or_else(|| EvalError::UnknownLabelValue {
            label: label.to_string(),
        })?;
    Ok(table.classes[1 - index].clone())
}

fn named_counts(table: &LabeledTable) -> Vec<ClassCount> {
    table
        .classes
        .iter()
        .zip(table.class_counts())
        .map(|(label, count)| ClassCount {
            label: label.clone(),
            count,
        })
        .collect()
}
