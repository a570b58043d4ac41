use super::{
    types::{DatasetMetadata, LabelSelection},
    validator::DataValidator,
};
use crate::data::dataset::MultiLabelDataset;
use crate::error::{CoevoError, Result};
use polars::prelude::*;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| CoevoError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load a CSV file and split it into features and binary labels.
    pub fn load_dataset<P: AsRef<Path>>(
        path: P,
        labels: &LabelSelection,
    ) -> Result<MultiLabelDataset> {
        let df = Self::load(&path)?;
        let dataset = Self::to_dataset(&df, labels)?;
        log::info!(
            "Loaded {} instances, {} features, {} labels from {}",
            dataset.num_instances(),
            dataset.num_features(),
            dataset.num_labels(),
            path.as_ref().display()
        );
        Ok(dataset)
    }

    pub fn to_dataset(df: &DataFrame, labels: &LabelSelection) -> Result<MultiLabelDataset> {
        DataValidator::validate_minimum_rows(df, 1)?;

        let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let label_columns = labels.resolve(&columns).ok_or_else(|| {
            CoevoError::DataLoading(format!(
                "Label selection {:?} does not match columns {:?}",
                labels, columns
            ))
        })?;
        DataValidator::validate_labels(df, &label_columns)?;

        let feature_columns: Vec<&str> = columns
            .iter()
            .map(|s| s.as_str())
            .filter(|c| !label_columns.contains(c))
            .collect();
        if feature_columns.is_empty() {
            return Err(CoevoError::DataLoading(
                "No feature columns left after removing labels".to_string(),
            ));
        }

        let height = df.height();
        let mut features = vec![Vec::with_capacity(feature_columns.len()); height];
        for name in &feature_columns {
            let values = Self::column_f64(df, name)?;
            for (row, value) in values.into_iter().enumerate() {
                features[row].push(value);
            }
        }

        let mut label_rows = vec![Vec::with_capacity(label_columns.len()); height];
        for name in &label_columns {
            let values = Self::column_f64(df, name)?;
            for (row, value) in values.into_iter().enumerate() {
                label_rows[row].push(value == 1.0);
            }
        }

        MultiLabelDataset::new(
            feature_columns.iter().map(|s| s.to_string()).collect(),
            label_columns.iter().map(|s| s.to_string()).collect(),
            features,
            label_rows,
        )
    }

    /// Create metadata for a loaded dataset
    pub fn create_metadata<P: AsRef<Path>>(
        path: P,
        dataset: &MultiLabelDataset,
    ) -> DatasetMetadata {
        let appearances = dataset.appearances();
        let total: usize = appearances.iter().sum();
        let cardinality = if dataset.num_instances() > 0 {
            total as f64 / dataset.num_instances() as f64
        } else {
            0.0
        };
        let density = if dataset.num_labels() > 0 {
            cardinality / dataset.num_labels() as f64
        } else {
            0.0
        };

        DatasetMetadata {
            file_path: path.as_ref().to_string_lossy().to_string(),
            num_instances: dataset.num_instances(),
            num_features: dataset.num_features(),
            num_labels: dataset.num_labels(),
            label_names: dataset.label_names().to_vec(),
            cardinality,
            density,
            appearances,
        }
    }

    fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        column
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| {
                    CoevoError::DataLoading(format!(
                        "Column '{}' has a missing or non-numeric value at row {}",
                        name, row
                    ))
                })
            })
            .collect()
    }
}
