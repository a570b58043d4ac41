use serde::{Deserialize, Serialize};

/// Which CSV columns hold the labels. All remaining columns are features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelSelection {
    /// The last `n` columns, the usual layout of multi-label benchmark files.
    Trailing(usize),
    /// Columns listed by name, in label order.
    Named(Vec<String>),
}

impl LabelSelection {
    /// Resolves the selection against the header of a file.
    pub fn resolve<'a>(&'a self, columns: &'a [String]) -> Option<Vec<&'a str>> {
        match self {
            Self::Trailing(n) => {
                if *n == 0 || *n >= columns.len() {
                    return None;
                }
                Some(columns[columns.len() - n..].iter().map(|s| s.as_str()).collect())
            }
            Self::Named(names) => {
                if names.is_empty() || names.iter().any(|n| !columns.contains(n)) {
                    return None;
                }
                Some(names.iter().map(|s| s.as_str()).collect())
            }
        }
    }
}

/// Summary of a loaded multi-label file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub file_path: String,
    pub num_instances: usize,
    pub num_features: usize,
    pub num_labels: usize,
    pub label_names: Vec<String>,
    /// Mean number of relevant labels per instance.
    pub cardinality: f64,
    /// Cardinality divided by the number of labels.
    pub density: f64,
    /// Relevant-instance count per label.
    pub appearances: Vec<usize>,
}
