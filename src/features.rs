/// Choices offered for the second feature once the first one is picked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureOptions {
    pub options: Vec<String>,
    pub selection: Option<String>,
}

/// Every numeric feature except `selected`, in dataset order.
///
/// The current second feature stays selected while it is still offered;
/// otherwise the first option is selected, or nothing when none remain.
pub fn other_feature_options(
    selected: &str,
    all_numeric: &[&str],
    current_other: Option<&str>,
) -> FeatureOptions {
    let options: Vec<String> = all_numeric
        .iter()
        .filter(|&&name| name != selected)
        .map(|name| name.to_string())
        .collect();

    let selection = current_other
        .filter(|current| options.iter().any(|o| o.as_str() == *current))
        .map(str::to_string)
        .or_else(|| options.first().cloned());

    FeatureOptions { options, selection }
}

/// First and second numeric features, as picked right after a dataset loads.
pub fn default_feature_selection(all_numeric: &[&str]) -> (Option<String>, Option<String>) {
    let first = all_numeric.first().map(|s| s.to_string());
    let second = first
        .as_deref()
        .and_then(|f| other_feature_options(f, all_numeric, None).selection);
    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMERIC: [&str; 3] = ["length", "width", "depth"];

    #[test]
    fn test_keeps_current_other_when_still_offered() {
        let opts = other_feature_options("length", &NUMERIC, Some("depth"));
        assert_eq!(opts.options, vec!["width", "depth"]);
        assert_eq!(opts.selection.as_deref(), Some("depth"));
    }

    #[test]
    fn test_falls_back_to_first_option() {
        let opts = other_feature_options("depth", &NUMERIC, Some("depth"));
        assert_eq!(opts.options, vec!["length", "width"]);
        assert_eq!(opts.selection.as_deref(), Some("length"));

        let opts = other_feature_options("width", &NUMERIC, Some("colour"));
        assert_eq!(opts.selection.as_deref(), Some("length"));
    }

    #[test]
    fn test_single_numeric_feature_leaves_nothing() {
        let opts = other_feature_options("length", &["length"], None);
        assert!(opts.options.is_empty());
        assert_eq!(opts.selection, None);
    }

    #[test]
    fn test_default_selection() {
        assert_eq!(
            default_feature_selection(&NUMERIC),
            (Some("length".to_string()), Some("width".to_string()))
        );
        assert_eq!(default_feature_selection(&["length"]), (Some("length".to_string()), None));
        assert_eq!(default_feature_selection(&[]), (None, None));
    }
}
