use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Nominal,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    /// `None` marks a missing cell. Present values are always finite.
    Numeric(Vec<Option<f64>>),
    /// `codes[i]` indexes into `domain`; `None` marks a missing cell.
    Nominal {
        domain: Vec<String>,
        codes: Vec<Option<usize>>,
    },
}

impl ColumnData {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Nominal { .. } => ColumnKind::Nominal,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Nominal { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: &str, values: Vec<f64>) -> Self {
        Self::numeric_with_missing(name, values.into_iter().map(Some).collect())
    }

    pub fn numeric_with_missing(name: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Builds a nominal column; the domain is the distinct values in order of
    /// first appearance. `""` and `"?"` are read as missing.
    pub fn nominal(name: &str, values: &[&str]) -> Self {
        let mut domain: Vec<String> = Vec::new();
        let codes = values
            .iter()
            .map(|value| {
                if is_missing(value) {
                    return None;
                }
                match domain.iter().position(|d| d == value) {
                    Some(code) => Some(code),
                    None => {
                        domain.push(value.to_string());
                        Some(domain.len() - 1)
                    }
                }
            })
            .collect();

        Self {
            name: name.to_string(),
            data: ColumnData::Nominal { domain, codes },
        }
    }

    /// Nominal column with an explicitly declared domain, which may contain
    /// values no row carries.
    pub fn nominal_with_domain(name: &str, domain: &[&str], values: &[&str]) -> Result<Self> {
        let domain: Vec<String> = domain.iter().map(|d| d.to_string()).collect();
        let codes = values
            .iter()
            .map(|value| {
                if is_missing(value) {
                    return Ok(None);
                }
                domain
                    .iter()
                    .position(|d| d == value)
                    .map(Some)
                    .ok_or_else(|| {
                        EvalError::DatasetLoad(format!(
                            "column '{name}': value '{value}' is not in the declared domain"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            data: ColumnData::Nominal { domain, codes },
        })
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }
}

/// How a delimited file is turned into a [`Dataset`].
#[derive(Clone, Debug)]
pub struct LoadOptions {
    pub label_column: String,
    pub delimiter: u8,
    /// Overrides type inference for the named columns.
    pub column_kinds: BTreeMap<String, ColumnKind>,
}

impl LoadOptions {
    pub fn new(label_column: &str) -> Self {
        Self {
            label_column: label_column.to_string(),
            delimiter: b',',
            column_kinds: BTreeMap::new(),
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn column_kind(mut self, column: &str, kind: ColumnKind) -> Self {
        self.column_kinds.insert(column.to_string(), kind);
        self
    }
}

/// Typed, column-oriented table with one designated nominal label column.
///
/// Read-only once built: the evaluation pipeline only ever borrows it.
#[derive(Clone, Debug)]
pub struct Dataset {
    columns: Vec<Column>,
    label_index: usize,
    labels: Vec<usize>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>, label_column: &str) -> Result<Self> {
        let n_rows = columns
            .first()
            .map(|c| c.data.len())
            .ok_or_else(|| EvalError::DatasetLoad("dataset has no columns".to_string()))?;

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EvalError::DatasetLoad(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
            if column.data.len() != n_rows {
                return Err(EvalError::DatasetLoad(format!(
                    "column '{}' has {} values but the dataset has {} rows",
                    column.name,
                    column.data.len(),
                    n_rows
                )));
            }
            if let ColumnData::Numeric(values) = &column.data {
                if let Some(row) = values.iter().position(|v| v.is_some_and(|x| !x.is_finite())) {
                    return Err(EvalError::DatasetLoad(format!(
                        "column '{}' has a non-finite value at row {row}",
                        column.name
                    )));
                }
            }
        }

        let label_index = columns
            .iter()
            .position(|c| c.name == label_column)
            .ok_or_else(|| {
                EvalError::DatasetLoad(format!("label column '{label_column}' not found"))
            })?;

        let labels = match &columns[label_index].data {
            ColumnData::Nominal { domain, codes } => codes
                .iter()
                .enumerate()
                .map(|(row, code)| match code {
                    Some(code) if *code < domain.len() => Ok(*code),
                    Some(code) => Err(EvalError::DatasetLoad(format!(
                        "row {row}: label code {code} is outside the label domain"
                    ))),
                    None => Err(EvalError::DatasetLoad(format!(
                        "row {row}: missing value in label column '{label_column}'"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            ColumnData::Numeric(_) => {
                return Err(EvalError::DatasetLoad(format!(
                    "label column '{label_column}' must be nominal"
                )));
            }
        };

        Ok(Self {
            columns,
            label_index,
            labels,
        })
    }

    pub fn from_path(path: &Path, options: &LoadOptions) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            EvalError::DatasetLoad(format!("cannot open {}: {e}", path.display()))
        })?;
        let dataset = Self::from_reader(file, options)?;
        log::info!(
            "Loaded dataset {}: {} rows, {} columns",
            path.display(),
            dataset.n_rows(),
            dataset.n_columns()
        );
        Ok(dataset)
    }

    /// Parses delimited text with a header row.
    ///
    /// Column types are inferred (numeric when every present cell is a finite
    /// number) unless `options.column_kinds` says otherwise. The label column is
    /// always nominal. Errors name the offending line of the input.
    pub fn from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(EvalError::DatasetLoad("header row is empty".to_string()));
        }
        if !headers.contains(&options.label_column) {
            return Err(EvalError::DatasetLoad(format!(
                "label column '{}' not found",
                options.label_column
            )));
        }
        if let Some(name) = options.column_kinds.keys().find(|name| !headers.contains(name)) {
            return Err(EvalError::DatasetLoad(format!(
                "declared column '{name}' not found"
            )));
        }
        if options.column_kinds.get(&options.label_column) == Some(&ColumnKind::Numeric) {
            return Err(EvalError::DatasetLoad(format!(
                "label column '{}' must be nominal",
                options.label_column
            )));
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        let mut lines = Vec::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            if record.len() != headers.len() {
                return Err(EvalError::DatasetLoad(format!(
                    "line {line}: expected {} fields, found {}",
                    headers.len(),
                    record.len()
                )));
            }
            for (column, field) in cells.iter_mut().zip(record.iter()) {
                column.push(field.to_string());
            }
            lines.push(line);
        }

        if lines.is_empty() {
            return Err(EvalError::DatasetLoad("no data rows".to_string()));
        }

        let mut columns = Vec::with_capacity(headers.len());
        for (name, values) in headers.iter().zip(&cells) {
            let kind = if *name == options.label_column {
                ColumnKind::Nominal
            } else {
                options
                    .column_kinds
                    .get(name)
                    .copied()
                    .unwrap_or_else(|| infer_kind(values))
            };
            columns.push(parse_column(name, values, kind, &lines)?);
        }

        // Report the input line rather than the row index for a missing label.
        if let Some(label) = columns.iter().find(|c| c.name == options.label_column) {
            if let ColumnData::Nominal { codes, .. } = &label.data {
                if let Some(row) = codes.iter().position(Option::is_none) {
                    return Err(EvalError::DatasetLoad(format!(
                        "line {}: missing value in label column '{}'",
                        lines[row], options.label_column
                    )));
                }
            }
        }

        Self::new(columns, &options.label_column)
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn label_column(&self) -> &Column {
        &self.columns[self.label_index]
    }

    pub fn label_name(&self) -> &str {
        &self.label_column().name
    }

    /// Declared label values, in code order.
    pub fn label_domain(&self) -> &[String] {
        match &self.label_column().data {
            ColumnData::Nominal { domain, .. } => domain,
            ColumnData::Numeric(_) => &[],
        }
    }

    /// Label code per row; always a valid index into [`Dataset::label_domain`].
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Numeric columns other than the label, in column order.
    pub fn numeric_feature_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, c)| *i != self.label_index && c.kind() == ColumnKind::Numeric)
            .map(|(_, c)| c.name.as_str())
            .collect()
    }

    /// Row count per label value, aligned with [`Dataset::label_domain`].
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.label_domain().len()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value == "?"
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn infer_kind(values: &[String]) -> ColumnKind {
    let mut present = values.iter().filter(|v| !is_missing(v)).peekable();
    if present.peek().is_none() {
        return ColumnKind::Nominal;
    }
    if present.all(|v| parse_number(v).is_some()) {
        ColumnKind::Numeric
    } else {
        ColumnKind::Nominal
    }
}

fn parse_column(name: &str, values: &[String], kind: ColumnKind, lines: &[u64]) -> Result<Column> {
    match kind {
        ColumnKind::Numeric => {
            let parsed = values
                .iter()
                .zip(lines)
                .map(|(value, line)| {
                    if is_missing(value) {
                        return Ok(None);
                    }
                    parse_number(value).map(Some).ok_or_else(|| {
                        EvalError::DatasetLoad(format!(
                            "line {line}: column '{name}' expects a number, found '{value}'"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Column::numeric_with_missing(name, parsed))
        }
        ColumnKind::Nominal => {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            Ok(Column::nominal(name, &refs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIRDS: &str = "\
species,wing,mass,habitat,status
a,10.5,20,forest,Resident
b,12.0,?,wetland,Migratory
c,9.1,18,forest,Resident
";

    fn load(text: &str) -> Result<Dataset> {
        Dataset::from_reader(text.as_bytes(), &LoadOptions::new("status"))
    }

    #[test]
    fn test_load_infers_column_kinds() {
        let dataset = load(BIRDS).unwrap();
        assert_eq!(dataset.n_rows(), 3);
        assert_eq!(dataset.n_columns(), 5);
        assert_eq!(dataset.column("wing").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(dataset.column("mass").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(dataset.column("habitat").unwrap().kind(), ColumnKind::Nominal);
        assert_eq!(dataset.numeric_feature_names(), vec!["wing", "mass"]);
    }

    #[test]
    fn test_missing_numeric_cell_is_none() {
        let dataset = load(BIRDS).unwrap();
        match &dataset.column("mass").unwrap().data {
            ColumnData::Numeric(values) => assert_eq!(values[1], None),
            other => panic!("unexpected column data {:?}", other),
        }
    }

    #[test]
    fn test_label_domain_in_first_appearance_order() {
        let dataset = load(BIRDS).unwrap();
        assert_eq!(dataset.label_domain(), &["Resident", "Migratory"]);
        assert_eq!(dataset.labels(), &[0, 1, 0]);
        assert_eq!(dataset.class_counts(), vec![2, 1]);
    }

    #[test]
    fn test_numeric_looking_label_stays_nominal() {
        let text = "x,y\n1.0,0\n2.0,1\n";
        let dataset = Dataset::from_reader(text.as_bytes(), &LoadOptions::new("y")).unwrap();
        assert_eq!(dataset.label_column().kind(), ColumnKind::Nominal);
        assert_eq!(dataset.numeric_feature_names(), vec!["x"]);
    }

    #[test]
    fn test_wrong_field_count_names_line() {
        let text = "x,y,status\n1,2,A\n3,B\n";
        let err = load(text).unwrap_err();
        match err {
            EvalError::DatasetLoad(message) => {
                assert!(message.contains("line 3"), "{message}");
                assert!(message.contains("expected 3 fields, found 2"), "{message}");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_declared_numeric_column_rejects_text() {
        let text = "x,status\n1,A\nten,B\n";
        let options = LoadOptions::new("status").column_kind("x", ColumnKind::Numeric);
        let err = Dataset::from_reader(text.as_bytes(), &options).unwrap_err();
        match err {
            EvalError::DatasetLoad(message) => {
                assert!(message.contains("line 3"), "{message}");
                assert!(message.contains("'ten'"), "{message}");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_declared_column_must_exist() {
        let options = LoadOptions::new("status").column_kind("wingspan", ColumnKind::Numeric);
        let err = Dataset::from_reader("x,status\n1,A\n".as_bytes(), &options).unwrap_err();
        assert!(err.to_string().contains("'wingspan'"), "{err}");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_label_column() {
        let err = Dataset::from_reader(BIRDS.as_bytes(), &LoadOptions::new("Migratory status"))
            .unwrap_err();
        assert!(matches!(err, EvalError::DatasetLoad(_)));
    }

    #[test]
    fn test_missing_label_value_names_line() {
        let text = "x,status\n1,A\n2,?\n";
        let err = load(text).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_semicolon_delimiter() {
        let text = "x;status\n1.5;A\n2.5;B\n";
        let options = LoadOptions::new("status").delimiter(b';');
        let dataset = Dataset::from_reader(text.as_bytes(), &options).unwrap();
        assert_eq!(dataset.numeric_feature_names(), vec!["x"]);
    }

    #[test]
    fn test_infinite_values_are_not_numeric() {
        let text = "x,status\ninf,A\n2,B\n";
        let dataset = load(text).unwrap();
        assert_eq!(dataset.column("x").unwrap().kind(), ColumnKind::Nominal);
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let columns = vec![
            Column::numeric("x", vec![1.0, 2.0]),
            Column::nominal("status", &["A"]),
        ];
        assert!(Dataset::new(columns, "status").is_err());
    }

    #[test]
    fn test_new_rejects_numeric_label() {
        let columns = vec![
            Column::numeric("x", vec![1.0, 2.0]),
            Column::numeric("status", vec![0.0, 1.0]),
        ];
        assert!(Dataset::new(columns, "status").is_err());
    }

    #[test]
    fn test_declared_domain_keeps_unused_values() {
        let label = Column::nominal_with_domain("status", &["A", "B", "C"], &["A", "B"]).unwrap();
        let columns = vec![Column::numeric("x", vec![1.0, 2.0]), label];
        let dataset = Dataset::new(columns, "status").unwrap();
        assert_eq!(dataset.class_counts(), vec![1, 1, 0]);
    }
}
