//! classeval CLI
//!
//! Loads a delimited dataset, balances the classes, cross-validates one
//! classifier on one or two numeric features and prints the evaluation.
//!
//! # Usage
//!
//! ```bash
//! classeval fish.csv --label species --feature1 length --feature2 weight
//! classeval fish.csv --label species --feature1 length --classifier "SMO (SVM)" --output json
//! classeval fish.csv --label species --numeric length --numeric weight
//! classeval fish.csv --label species --list-features
//! classeval --list-classifiers
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use classeval::config::{EvaluationConfig, OutputFormat};
use classeval::features::other_feature_options;
use classeval::projection::MissingValuePolicy;
use classeval::{run_evaluation, ClassifierKind, Dataset, EvalError};

/// Exit code for an evaluation that finished without a ROC curve.
const EXIT_NOT_BINARY: u8 = 6;

#[derive(Parser, Debug)]
#[command(name = "classeval", version, about)]
struct Args {
    /// Delimited data file with a header row
    #[arg(required_unless_present = "list_classifiers")]
    data: Option<PathBuf>,

    /// JSON settings file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the label column
    #[arg(long)]
    label: Option<String>,

    /// Field delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Column that must load as numbers (repeatable); a text cell fails the load
    #[arg(long = "numeric", value_name = "COLUMN")]
    numeric: Vec<String>,

    /// First numeric feature (defaults to the first numeric column)
    #[arg(long)]
    feature1: Option<String>,

    /// Optional second numeric feature
    #[arg(long)]
    feature2: Option<String>,

    /// Classifier display name or alias
    #[arg(long, short)]
    classifier: Option<String>,

    /// Number of cross-validation folds
    #[arg(long, short)]
    folds: Option<usize>,

    /// Seed for balancing, fold assignment and randomised classifiers
    #[arg(long, short)]
    seed: Option<u64>,

    /// Label value treated as positive in the ROC curve
    #[arg(long)]
    positive: Option<String>,

    /// Label value treated as negative in the ROC curve
    #[arg(long)]
    negative: Option<String>,

    /// Output format: text or json
    #[arg(long, short)]
    output: Option<OutputFormat>,

    /// Fail on rows with missing feature values instead of skipping them
    #[arg(long)]
    reject_missing: bool,

    /// Print the numeric features of the dataset and exit
    #[arg(long)]
    list_features: bool,

    /// Print the available classifiers and exit
    #[arg(long)]
    list_classifiers: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<EvaluationConfig> {
        let mut config = match &self.config {
            Some(path) => EvaluationConfig::from_file(path)?,
            None => EvaluationConfig::default(),
        };
        if let Some(label) = &self.label {
            config.label_column = label.clone();
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        config.numeric_columns.extend(self.numeric.iter().cloned());
        if let Some(feature1) = &self.feature1 {
            config.feature1 = Some(feature1.clone());
        }
        if let Some(feature2) = &self.feature2 {
            config.feature2 = Some(feature2.clone());
        }
        if let Some(classifier) = &self.classifier {
            config.classifier = classifier.clone();
        }
        if let Some(folds) = self.folds {
            config.folds = folds;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(positive) = &self.positive {
            config.positive_label = Some(positive.clone());
        }
        if let Some(negative) = &self.negative {
            config.negative_label = Some(negative.clone());
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if self.reject_missing {
            config.missing_values = MissingValuePolicy::Reject;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{e:#}");
            let code = e
                .downcast_ref::<EvalError>()
                .map(EvalError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<u8> {
    if args.list_classifiers {
        for kind in ClassifierKind::ALL {
            println!("{kind}");
        }
        return Ok(0);
    }

    let config = args.config()?;
    let path = args
        .data
        .as_deref()
        .context("a data file is required")?;
    let dataset = Dataset::from_path(path, &config.load_options())?;

    if args.list_features {
        let numeric = dataset.numeric_feature_names();
        for name in &numeric {
            let others = other_feature_options(name, &numeric, None);
            println!("{name}\t(pairs with: {})", others.options.join(", "));
        }
        return Ok(0);
    }

    let request = config.request_for(&dataset)?;
    let result = run_evaluation(&dataset, &request)?;

    match config.output {
        OutputFormat::Text => print!("{result}"),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&result).context("failed to render JSON")?
        ),
    }

    Ok(if result.has_warnings() { EXIT_NOT_BINARY } else { 0 })
}
