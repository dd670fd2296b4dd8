use std::io::Cursor;

use classeval::{run_evaluation, Dataset, EvaluationRequest, LoadOptions};

const CSV: &str = "\
hours,sleep,result
1.0,8,fail
2.0,7,fail
2.5,?,fail
3.0,6,fail
3.5,7,pass
4.0,5,fail
4.5,8,pass
5.0,6,pass
5.5,7,pass
6.0,5,pass
6.5,8,pass
7.0,6,pass
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("=== ROC Curve Example ===\n");

    let dataset = Dataset::from_reader(Cursor::new(CSV), &LoadOptions::new("result"))?;
    println!("Numeric features: {:?}", dataset.numeric_feature_names());
    println!("Label values: {:?}", dataset.label_domain());

    // The row with a missing sleep value is skipped during projection
    let request = EvaluationRequest::new("hours", "Logistic Regression")
        .feature2("sleep")
        .folds(4)
        .positive_label("pass");
    let result = run_evaluation(&dataset, &request)?;

    println!("\n{}", result.confusion_matrix);
    if let Some(roc) = &result.roc {
        println!("ROC for '{}' against '{}':", roc.positive_label, roc.negative_label);
        for point in &roc.points {
            println!(
                "  FPR {:.3}  TPR {:.3}",
                point.false_positive_rate, point.true_positive_rate
            );
        }
        println!("AUC: {:.3}", roc.auc());
    }

    Ok(())
}
