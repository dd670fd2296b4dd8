use thiserror::Error;

/// Everything that can stop a single evaluation request.
///
/// None of these leave state behind: every request builds its own derived
/// tables, so the next request starts clean.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("failed to load dataset: {0}")]
    DatasetLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid feature selection: {0}")]
    InvalidFeatureSelection(String),

    #[error("missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("label value '{label}' has no rows, it cannot be balanced")]
    EmptyClass { label: String },

    #[error("unknown classifier '{0}'")]
    UnknownClassifier(String),

    #[error("fold count {folds} must be between 2 and the number of rows ({rows})")]
    InvalidFoldCount { folds: usize, rows: usize },

    #[error("ROC needs exactly two label values, found {classes}")]
    NotBinaryClassification { classes: usize },

    #[error("label value '{label}' is not in the label domain")]
    UnknownLabelValue { label: String },

    #[error("ROC needs both classes present ({positives} positives, {negatives} negatives)")]
    DegenerateRocInput { positives: usize, negatives: usize },

    #[error("{classifier} failed: {message}")]
    Training { classifier: String, message: String },

    #[error("predictions do not line up with the labels: {0}")]
    PredictionMismatch(String),

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EvalError {
    /// Process exit code used by the command-line front end.
    pub fn exit_code(&self) -> u8 {
        match self {
            EvalError::DatasetLoad(_) | EvalError::Io(_) | EvalError::Csv(_) => 2,
            EvalError::InvalidFeatureSelection(_) | EvalError::MissingValue { .. } => 3,
            EvalError::EmptyClass { .. } => 4,
            EvalError::UnknownClassifier(_) => 5,
            EvalError::NotBinaryClassification { .. } => 6,
            _ => 1,
        }
    }

    pub(crate) fn training(classifier: &str, message: impl Into<String>) -> Self {
        EvalError::Training {
            classifier: classifier.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
