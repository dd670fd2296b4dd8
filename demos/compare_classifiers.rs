use classeval::{run_evaluation, ClassifierKind, Column, Dataset, EvaluationRequest};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    println!("=== Classifier Comparison Example ===\n");

    // Two overlapping clouds: 60 "common" flowers and 20 "rare" ones
    let mut petal = Vec::new();
    let mut sepal = Vec::new();
    let mut kind = Vec::new();
    for i in 0..80 {
        let t = i as f64;
        if i < 60 {
            petal.push(1.0 + (t * 0.37).sin());
            sepal.push(2.0 + (t * 0.71).cos());
            kind.push("common");
        } else {
            petal.push(2.2 + (t * 0.53).sin());
            sepal.push(3.1 + (t * 0.29).cos());
            kind.push("rare");
        }
    }
    let dataset = Dataset::new(
        vec![
            Column::numeric("petal", petal),
            Column::numeric("sepal", sepal),
            Column::nominal("kind", &kind),
        ],
        "kind",
    )?;

    println!("Class counts: {:?}", dataset.class_counts());
    println!("\n{:<22} {:>9} {:>7} {:>7}", "Classifier", "Accuracy", "Kappa", "AUC");

    for classifier in ClassifierKind::ALL {
        let request = EvaluationRequest::new("petal", classifier.display_name())
            .feature2("sepal")
            .folds(10)
            .seed(7)
            .positive_label("rare");
        let result = run_evaluation(&dataset, &request)?;
        let auc = result.roc.as_ref().map(|r| r.auc()).unwrap_or(f64::NAN);
        println!(
            "{:<22} {:>8.2}% {:>7.3} {:>7.3}",
            result.classifier,
            result.accuracy * 100.0,
            result.kappa,
            auc
        );
    }

    Ok(())
}
